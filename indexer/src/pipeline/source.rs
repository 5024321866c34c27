use tracing::{debug, info};

use crate::core::client::chain::ChainClient;
use crate::core::client::database::repository::SyncableRepository;
use crate::core::client::database::OptionalExt;
use crate::error::{IndexerError, IndexerResult};
use crate::types::report::ReportKind;
use crate::types::{Height, VersionId};

/// Inclusive range of heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightRange {
    pub start: Height,
    pub end: Height,
}

impl HeightRange {
    pub fn new(start: Height, end: Height) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        if self.end < self.start {
            return 0;
        }
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Yields the heights a run processes, one at a time and in increasing order.
///
/// The range is computed once from persisted state when the source is built; a source that cannot produce
/// any height is never built, its constructor returns the reason instead.
#[derive(Debug, Clone)]
pub struct Source {
    kind: ReportKind,
    range: HeightRange,
    current: Option<Height>,
}

impl Source {
    fn new(kind: ReportKind, range: HeightRange) -> Self {
        Self { kind, range, current: None }
    }

    /// Heights not indexed yet, up to the chain head and at most `batch_size` of them.
    ///
    /// The most recent stored height is picked up again when it was never marked processed.
    pub async fn index(
        syncables: &dyn SyncableRepository,
        chain: &dyn ChainClient,
        first_height: Height,
        batch_size: u64,
        force_single_height: bool,
    ) -> IndexerResult<Self> {
        let start = match syncables.find_most_recent().await.optional()? {
            None => first_height,
            Some(last) if !last.is_processed() => {
                info!(height = last.height, "Most recent height was left unprocessed, resuming from it");
                last.height
            }
            Some(last) => last.height + 1,
        };

        let head = chain.get_head().await?;
        let end = head.min(start.saturating_add(batch_size.max(1) - 1));
        debug!(start, end, head, batch_size, "Computed index range");

        if start > end || (start == end && !force_single_height) {
            return Err(IndexerError::NothingToProcess);
        }
        Ok(Self::new(ReportKind::Index, HeightRange::new(start, end)))
    }

    /// Heights whose index version differs from `current_version`, from the oldest to the most recent of them.
    pub async fn backfill(syncables: &dyn SyncableRepository, current_version: VersionId) -> IndexerResult<Self> {
        let Some(first) = syncables.find_first_by_different_index_version(current_version).await.optional()? else {
            return Err(IndexerError::NothingToBackfill);
        };
        let last = syncables.find_most_recent_by_different_index_version(current_version).await?;
        debug!(start = first.height, end = last.height, current_version, "Computed backfill range");

        Ok(Self::new(ReportKind::Backfill, HeightRange::new(first.height, last.height)))
    }

    /// Explicit range. A missing or zero start means 1, a missing or zero end means the most recent stored
    /// height.
    pub async fn reindex(
        syncables: &dyn SyncableRepository,
        start_height: Option<Height>,
        end_height: Option<Height>,
    ) -> IndexerResult<Self> {
        let start = start_height.filter(|h| *h > 0).unwrap_or(1);
        let end = match end_height.filter(|h| *h > 0) {
            Some(end) => end,
            None => match syncables.find_most_recent().await.optional()? {
                Some(last) => last.height,
                None => return Err(IndexerError::NothingToProcess),
            },
        };
        debug!(start, end, "Computed reindex range");

        if start > end {
            return Err(IndexerError::NothingToProcess);
        }
        Ok(Self::new(ReportKind::Reindex, HeightRange::new(start, end)))
    }

    /// Moves to the next height. Returns `false` once the whole range was handed out.
    pub fn advance(&mut self) -> bool {
        let next = match self.current {
            None => self.range.start,
            Some(current) if current < self.range.end => current + 1,
            Some(_) => return false,
        };
        self.current = Some(next);
        true
    }

    /// Height to process; the start of the range before the first [`Source::advance`].
    pub fn current(&self) -> Height {
        self.current.unwrap_or(self.range.start)
    }

    pub fn len(&self) -> u64 {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn start_height(&self) -> Height {
        self.range.start
    }

    pub fn end_height(&self) -> Height {
        self.range.end
    }

    pub fn range(&self) -> HeightRange {
        self.range
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }
}
