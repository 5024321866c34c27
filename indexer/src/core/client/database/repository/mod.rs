mod aggregate;
mod event;
mod report;
mod sequence;
mod syncable;

pub use aggregate::{AccountAggRepository, ValidatorAggRepository};
pub use event::SystemEventRepository;
pub use report::ReportRepository;
pub use sequence::{SequenceRepository, ValidatorSeqRepository};
pub use syncable::SyncableRepository;

#[cfg(test)]
pub use aggregate::MockValidatorAggRepository;
#[cfg(test)]
pub use report::MockReportRepository;
#[cfg(test)]
pub use syncable::MockSyncableRepository;
