use mongodb::bson;
use thiserror::Error;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Lookup found no row. Callers frequently treat this as "create new".
    #[error("{0} not found")]
    NotFound(String),

    #[error("Item already exists: {0}")]
    ItemAlreadyExists(String),

    #[error("Mongo error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("Bson serialization error: {0}")]
    BsonSerError(#[from] bson::ser::Error),

    #[error("Bson deserialization error: {0}")]
    BsonDeError(#[from] bson::de::Error),
}

impl DatabaseError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DatabaseError::NotFound(what.into())
    }

    /// Maps a duplicate key violation of a unique index to [`DatabaseError::ItemAlreadyExists`].
    pub fn from_write(error: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};
        let duplicate = match &*error.kind {
            ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
            ErrorKind::BulkWrite(failure) => {
                failure.write_errors.iter().flatten().any(|e| e.code == DUPLICATE_KEY_CODE)
            }
            _ => false,
        };
        if duplicate {
            return DatabaseError::ItemAlreadyExists(error.to_string());
        }
        DatabaseError::MongoError(error)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Driver and connection failures may succeed on a later attempt; everything else is a data problem.
    pub fn is_transient(&self) -> bool {
        match self {
            DatabaseError::MongoError(e) => {
                use mongodb::error::ErrorKind;
                matches!(
                    *e.kind,
                    ErrorKind::Io(_)
                        | ErrorKind::ConnectionPoolCleared { .. }
                        | ErrorKind::ServerSelection { .. }
                        | ErrorKind::DnsResolve { .. }
                ) || e.contains_label(mongodb::error::RETRYABLE_WRITE_ERROR)
            }
            _ => false,
        }
    }
}

/// Turns a `NotFound` into `None`, leaving every other failure untouched.
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, DatabaseError>;
}

impl<T> OptionalExt<T> for Result<T, DatabaseError> {
    fn optional(self) -> Result<Option<T>, DatabaseError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
