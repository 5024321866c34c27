pub mod chain;
pub mod database;

pub use chain::{ChainClient, ClientError, HttpChainClient};
pub use database::{Database, DatabaseError};
