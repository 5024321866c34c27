pub const INDEXER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Index version of a syncable whose derived facts were produced by a target restricted run only.
pub const UNVERSIONED: u64 = 0;

/// Height the live source starts from when the store holds no syncable yet.
pub const DEFAULT_FIRST_BLOCK_HEIGHT: u64 = 1;

/// Maximum number of heights a single live run processes.
pub const DEFAULT_BATCH_SIZE: u64 = 1_000;

pub const DEFAULT_TASK_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_TASK_RETRY_BASE_DELAY_MS: u64 = 250;

/// Upper bound for the exponential backoff multiplier (2^6).
pub const MAX_BACKOFF_EXPONENT: u32 = 6;

pub const DEFAULT_MAX_VALIDATOR_SEQUENCES: u64 = 1_000;
pub const DEFAULT_MISSED_M_OF_N_THRESHOLD: u64 = 50;
pub const DEFAULT_MISSED_IN_A_ROW_THRESHOLD: u64 = 10;
pub const DEFAULT_MISSED_IN_A_ROW_WINDOW: u64 = 1_000;

pub const DEFAULT_CHAIN_REQUEST_TIMEOUT_SECS: u64 = 30;
