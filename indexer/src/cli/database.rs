use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatabaseBackend {
    /// Keep everything in process memory. Nothing survives the run.
    Memory,
    /// Persist into MongoDB.
    Mongodb,
}

/// Parameters used to configure the store.
#[derive(Debug, Clone, Args)]
pub struct DatabaseCliArgs {
    /// Which store implementation to use.
    #[arg(env = "INDEXER_DATABASE", long, value_enum, default_value = "mongodb")]
    pub database: DatabaseBackend,

    /// The connection string to the MongoDB server.
    #[arg(env = "INDEXER_MONGODB_CONNECTION_URL", long, default_value = "mongodb://localhost:27017")]
    pub mongodb_connection_url: String,

    /// The name of the database.
    #[arg(env = "INDEXER_MONGODB_DATABASE_NAME", long, default_value = "indexer")]
    pub mongodb_database_name: String,
}
