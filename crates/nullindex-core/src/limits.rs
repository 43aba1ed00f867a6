//! Resume-point calculator.
//!
//! Progress is derived from the store's coverage every time a walk starts:
//!
//! | store                     | start            | end                 |
//! |---------------------------|------------------|---------------------|
//! | empty                     | tip              | depth limit         |
//! | lowest height ≤ limit + 1 | tip              | highest height      |
//! | otherwise                 | lowest height    | depth limit         |
//!
//! The first row is a from-scratch backfill, the second a catch-up pass over
//! blocks produced since the last run, the third resumes an interrupted
//! backfill.
//!
//! The end boundary is exclusive: a finished backfill stores blocks down to
//! `limit + 1`, which is why the catch-up row compares against that.
//!
//! Once the tip of a catch-up window is stored, `highest` moves past the rest
//! of the window. An interrupted catch-up therefore leaves a checkpoint
//! ([`RecordStore::load_checkpoint`]) holding what is left of its window, and
//! the next catch-up walks that window instead.

use tracing::debug;

use crate::error::IndexerError;
use crate::source::ChainSource;
use crate::store::RecordStore;
use crate::types::{BlockRef, ParsingLimits};

/// Which of the three resume modes [`compute_limits`] selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Nothing indexed yet.
    FromScratch,
    /// Backfill reached the depth limit; pick up new blocks above the highest.
    CatchUp,
    /// Backfill interrupted; continue down from the lowest indexed block.
    ResumeBackfill,
}

impl std::fmt::Display for WalkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FromScratch => write!(f, "from-scratch"),
            Self::CatchUp => write!(f, "catch-up"),
            Self::ResumeBackfill => write!(f, "resume-backfill"),
        }
    }
}

/// Compute the `[start, end)` window for the next walk.
///
/// Fails with [`IndexerError::InsufficientChainHeight`] when the node's tip is
/// below `depth_limit`.
pub async fn compute_limits<C, S>(
    source: &C,
    store: &S,
    depth_limit: u64,
) -> Result<(ParsingLimits, WalkMode), IndexerError>
where
    C: ChainSource + ?Sized,
    S: RecordStore + ?Sized,
{
    // Checked first: a node below the limit cannot answer the limit's hash.
    let best_hash = source.best_block_hash().await?;
    let best_height = source.block_height(&best_hash).await?;

    if best_height < depth_limit {
        return Err(IndexerError::InsufficientChainHeight {
            best_height,
            depth_limit,
        });
    }

    let default_limit = BlockRef::new(depth_limit, source.block_hash(depth_limit).await?);

    let lowest = store.lowest_height().await?;
    let highest = store.highest_height().await?;

    let tip = BlockRef::new(best_height, best_hash);

    let (limits, mode) = match (lowest, highest) {
        (Some(lowest), Some(highest)) if lowest <= depth_limit.saturating_add(1) => {
            match store.load_checkpoint().await? {
                Some(pending) => {
                    debug!(
                        next = pending.start.height,
                        floor = pending.end.height,
                        "Resuming interrupted catch-up"
                    );
                    (pending, WalkMode::CatchUp)
                }
                None => {
                    let end = BlockRef::new(highest, source.block_hash(highest).await?);
                    (ParsingLimits { start: tip, end }, WalkMode::CatchUp)
                }
            }
        }
        (Some(lowest), Some(_)) => {
            let start = BlockRef::new(lowest, source.block_hash(lowest).await?);
            (
                ParsingLimits {
                    start,
                    end: default_limit,
                },
                WalkMode::ResumeBackfill,
            )
        }
        _ => (
            ParsingLimits {
                start: tip,
                end: default_limit,
            },
            WalkMode::FromScratch,
        ),
    };

    debug!(
        %mode,
        start = limits.start.height,
        end = limits.end.height,
        ?lowest,
        ?highest,
        best_height,
        "Computed parsing limits"
    );
    Ok((limits, mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryChain;
    use crate::store::MemoryRecordStore;
    use crate::types::NullDataRecord;

    async fn store_with_heights(heights: impl IntoIterator<Item = u64>) -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        let records: Vec<_> = heights
            .into_iter()
            .map(|h| NullDataRecord {
                data: format!("payload {h}"),
                output_index: 0,
                block_hash: MemoryChain::hash_at(h),
                tx_hash: format!("tx{h}"),
                height: h,
            })
            .collect();
        store.insert_records(&records).await.unwrap();
        store
    }

    #[tokio::test]
    async fn empty_store_walks_from_tip_to_depth_limit() {
        let chain = MemoryChain::linear(200);
        let store = MemoryRecordStore::new();

        let (limits, mode) = compute_limits(&chain, &store, 50).await.unwrap();
        assert_eq!(mode, WalkMode::FromScratch);
        assert_eq!(limits.start, BlockRef::new(200, MemoryChain::hash_at(200)));
        assert_eq!(limits.end, BlockRef::new(50, MemoryChain::hash_at(50)));
    }

    #[tokio::test]
    async fn partial_backfill_resumes_at_lowest_height() {
        let chain = MemoryChain::linear(200);
        let store = store_with_heights(100..=150).await;

        let (limits, mode) = compute_limits(&chain, &store, 50).await.unwrap();
        assert_eq!(mode, WalkMode::ResumeBackfill);
        assert_eq!(limits.start, BlockRef::new(100, MemoryChain::hash_at(100)));
        assert_eq!(limits.end, BlockRef::new(50, MemoryChain::hash_at(50)));
    }

    #[tokio::test]
    async fn finished_backfill_switches_to_catch_up() {
        let chain = MemoryChain::linear(10_000);
        let store = store_with_heights([50, 75, 120]).await;

        let (limits, mode) = compute_limits(&chain, &store, 50).await.unwrap();
        assert_eq!(mode, WalkMode::CatchUp);
        assert_eq!(limits.start, BlockRef::new(10_000, MemoryChain::hash_at(10_000)));
        assert_eq!(limits.end, BlockRef::new(120, MemoryChain::hash_at(120)));
    }

    #[tokio::test]
    async fn backfill_ending_just_above_limit_is_finished() {
        let chain = MemoryChain::linear(300);

        let store = store_with_heights([51, 200]).await;
        let (_, mode) = compute_limits(&chain, &store, 50).await.unwrap();
        assert_eq!(mode, WalkMode::CatchUp);

        let store = store_with_heights([52, 200]).await;
        let (limits, mode) = compute_limits(&chain, &store, 50).await.unwrap();
        assert_eq!(mode, WalkMode::ResumeBackfill);
        assert_eq!(limits.start.height, 52);
    }

    #[tokio::test]
    async fn catch_up_with_no_new_blocks_is_an_empty_window() {
        let chain = MemoryChain::linear(120);
        let store = store_with_heights([50, 120]).await;

        let (limits, _) = compute_limits(&chain, &store, 50).await.unwrap();
        assert_eq!(limits.start, limits.end);
        assert_eq!(limits.span(), 0);
    }

    #[tokio::test]
    async fn pending_catch_up_window_wins_over_highest_height() {
        let chain = MemoryChain::linear(45);
        let store = store_with_heights((11..=20).chain([40])).await;
        let pending = ParsingLimits {
            start: BlockRef::new(39, MemoryChain::hash_at(39)),
            end: BlockRef::new(20, MemoryChain::hash_at(20)),
        };
        store.save_checkpoint(&pending).await.unwrap();

        let (limits, mode) = compute_limits(&chain, &store, 10).await.unwrap();
        assert_eq!(mode, WalkMode::CatchUp);
        assert_eq!(limits, pending);

        store.delete_checkpoint().await.unwrap();
        let (limits, _) = compute_limits(&chain, &store, 10).await.unwrap();
        assert_eq!(limits.start.height, 45);
        assert_eq!(limits.end.height, 40);
    }

    #[tokio::test]
    async fn checkpoint_is_ignored_while_backfill_is_unfinished() {
        let chain = MemoryChain::linear(200);
        let store = store_with_heights(100..=150).await;
        store
            .save_checkpoint(&ParsingLimits {
                start: BlockRef::new(190, MemoryChain::hash_at(190)),
                end: BlockRef::new(150, MemoryChain::hash_at(150)),
            })
            .await
            .unwrap();

        let (limits, mode) = compute_limits(&chain, &store, 50).await.unwrap();
        assert_eq!(mode, WalkMode::ResumeBackfill);
        assert_eq!(limits.start.height, 100);
    }

    #[tokio::test]
    async fn coverage_below_limit_counts_as_finished_backfill() {
        let chain = MemoryChain::linear(300);
        let store = store_with_heights([40, 250]).await;

        let (limits, mode) = compute_limits(&chain, &store, 50).await.unwrap();
        assert_eq!(mode, WalkMode::CatchUp);
        assert!(limits.start.height >= limits.end.height);
        assert_eq!(limits.end.height, 250);
    }

    #[tokio::test]
    async fn tip_below_depth_limit_fails_fast() {
        let store = MemoryRecordStore::new();

        let chain = MemoryChain::linear(30);
        assert!(compute_limits(&chain, &store, 30).await.is_ok());

        let chain = MemoryChain::linear(29);
        let err = compute_limits(&chain, &store, 30).await.unwrap_err();
        assert!(matches!(
            err,
            IndexerError::InsufficientChainHeight {
                best_height: 29,
                depth_limit: 30
            }
        ));
        assert!(err.is_fatal());
    }
}
