pub const SYNCABLES_COLLECTION: &str = "syncables";
pub const REPORTS_COLLECTION: &str = "reports";
pub const BLOCK_SEQS_COLLECTION: &str = "block_sequences";
pub const VALIDATOR_SEQS_COLLECTION: &str = "validator_sequences";
pub const TRANSACTION_SEQS_COLLECTION: &str = "transaction_sequences";
pub const STAKING_SEQS_COLLECTION: &str = "staking_sequences";
pub const DELEGATION_SEQS_COLLECTION: &str = "delegation_sequences";
pub const DEBONDING_DELEGATION_SEQS_COLLECTION: &str = "debonding_delegation_sequences";
pub const ACCOUNT_AGGS_COLLECTION: &str = "account_aggregates";
pub const VALIDATOR_AGGS_COLLECTION: &str = "validator_aggregates";
pub const SYSTEM_EVENTS_COLLECTION: &str = "system_events";
