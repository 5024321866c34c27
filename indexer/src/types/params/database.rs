use crate::cli::database::{DatabaseBackend, DatabaseCliArgs};

/// Validated MongoDB parameters
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub connection_url: String,
    pub database_name: String,
}

#[derive(Debug, Clone)]
pub enum DatabaseParams {
    Memory,
    MongoDb(MongoConfig),
}

impl From<DatabaseCliArgs> for DatabaseParams {
    fn from(args: DatabaseCliArgs) -> Self {
        match args.database {
            DatabaseBackend::Memory => Self::Memory,
            DatabaseBackend::Mongodb => Self::MongoDb(MongoConfig {
                connection_url: args.mongodb_connection_url,
                database_name: args.mongodb_database_name,
            }),
        }
    }
}
