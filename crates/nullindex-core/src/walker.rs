//! The walk engine — walks the chain backward and persists null-data records.
//!
//! One run:
//! 1. compute `[start, end)` from store coverage ([`compute_limits`])
//! 2. from `start`, for each block until `end` or a stop request:
//!    fetch → extract → insert as one batch → follow `previousblockhash`
//!
//! A batch that conflicts with existing rows was committed by an earlier run;
//! it is logged and skipped. Any other error ends the run.
//!
//! Catch-up walks keep a checkpoint of their remaining window. It is written
//! before the first insert, advanced every [`CHECKPOINT_INTERVAL`] blocks and
//! on stop, and deleted when the window is done. A saved position is never
//! ahead of what is committed, so a crash re-walks at most the blocks since
//! the last save, and those conflict harmlessly.
//!
//! Stopping is cooperative. [`Walker::request_stop`] cancels the run's token,
//! which the loop checks between blocks, so the block in flight is always
//! finished first.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::IndexerError;
use crate::extract::extract_block;
use crate::limits::{compute_limits, WalkMode};
use crate::source::ChainSource;
use crate::store::{InsertOutcome, RecordStore};
use crate::types::{BlockRef, ParsingLimits};

/// Emit an info-level progress line every this many blocks.
const PROGRESS_INTERVAL: u64 = 1_000;

/// Advance the catch-up checkpoint every this many blocks.
pub const CHECKPOINT_INTERVAL: u64 = 100;

/// Lifecycle state of a [`Walker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalkState {
    /// Never run.
    Idle,
    /// A run is in progress.
    Running,
    /// A stop was requested; the block in flight is being finished.
    Stopping,
    /// The last run ended on a stop request.
    Stopped,
    /// The last run reached its end boundary.
    Completed,
    /// The last run ended with an error.
    Failed,
}

impl WalkState {
    /// Returns `true` while a run is in progress.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Stopping)
    }
}

impl std::fmt::Display for WalkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    /// `Completed` or `Stopped`.
    pub state: WalkState,
    pub mode: WalkMode,
    pub limits: ParsingLimits,
    /// Blocks fetched and persisted (or found already persisted).
    pub blocks_processed: u64,
    /// Blocks whose batch conflicted with existing rows.
    pub blocks_skipped: u64,
    /// New records written by this run.
    pub records_inserted: u64,
    /// Hash the walk would have fetched next.
    pub last_hash: String,
}

/// Sequential backward walker over one chain source and one store.
///
/// Share it behind an `Arc` so one task can [`run`](Self::run) while another
/// calls [`stop`](Self::stop).
pub struct Walker<C, S> {
    source: Arc<C>,
    store: S,
    depth_limit: u64,
    state: watch::Sender<WalkState>,
    /// `Some` exactly while a run is in progress.
    cancel: Mutex<Option<CancellationToken>>,
}

impl<C: ChainSource, S: RecordStore> Walker<C, S> {
    pub fn new(source: Arc<C>, store: S, depth_limit: u64) -> Self {
        let (state, _) = watch::channel(WalkState::Idle);
        Self {
            source,
            store,
            depth_limit,
            state,
            cancel: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WalkState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<WalkState> {
        self.state.subscribe()
    }

    /// The configured depth limit.
    pub fn depth_limit(&self) -> u64 {
        self.depth_limit
    }

    /// The store this walker writes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Walk from the computed start to the computed end.
    ///
    /// Returns `Ok` with state `Completed` when the end boundary was reached
    /// and `Stopped` when a stop request interrupted the walk. Fails with
    /// [`IndexerError::AlreadyRunning`] if another run is in progress.
    pub async fn run(&self) -> Result<WalkOutcome, IndexerError> {
        let token = {
            let mut slot = self.cancel.lock().unwrap();
            if slot.is_some() {
                return Err(IndexerError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            *slot = Some(token.clone());
            self.state.send_replace(WalkState::Running);
            token
        };

        // Leaves `Running` even if this future is dropped mid-walk.
        let mut guard = RunGuard {
            walker: self,
            final_state: WalkState::Stopped,
        };

        let result = self.walk(&token).await;
        match &result {
            Ok(outcome) => guard.final_state = outcome.state,
            Err(e) => {
                guard.final_state = WalkState::Failed;
                error!(error = %e, fatal = e.is_fatal(), "Walk failed");
            }
        }
        result
    }

    /// Ask the current run to stop after the block in flight.
    ///
    /// Returns `false` if no run is in progress.
    pub fn request_stop(&self) -> bool {
        let slot = self.cancel.lock().unwrap();
        match slot.as_ref() {
            Some(token) => {
                token.cancel();
                self.state.send_replace(WalkState::Stopping);
                true
            }
            None => false,
        }
    }

    /// Stop the current run, wait for it to finish its block, and close the store.
    ///
    /// Returns `false` (and leaves the store open) if no run is in progress.
    pub async fn stop(&self) -> bool {
        if !self.request_stop() {
            info!("Unable to stop walker, walker is not running");
            return false;
        }
        info!("Attempting to stop walker...");

        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|state| !state.is_active()).await;

        self.store.close().await;
        debug!("Storage connection closed");
        info!("Walker has been stopped successfully");
        true
    }

    async fn walk(&self, token: &CancellationToken) -> Result<WalkOutcome, IndexerError> {
        let (limits, mode) =
            compute_limits(self.source.as_ref(), &self.store, self.depth_limit).await?;

        info!(
            %mode,
            start_height = limits.start.height,
            start_hash = %limits.start.hash,
            end_height = limits.end.height,
            end_hash = %limits.end.hash,
            "Begin parsing"
        );

        let catching_up = mode == WalkMode::CatchUp;
        if catching_up && limits.start.hash != limits.end.hash {
            self.store.save_checkpoint(&limits).await?;
        }

        let mut current = limits.start.hash.clone();
        let mut next_height = limits.start.height;
        let mut blocks_processed = 0u64;
        let mut blocks_skipped = 0u64;
        let mut records_inserted = 0u64;

        while !token.is_cancelled() && current != limits.end.hash {
            let block = self.source.block(&current).await?;
            let records = extract_block(&block);

            match self.store.insert_records(&records).await? {
                InsertOutcome::Inserted(n) => {
                    records_inserted += n as u64;
                    debug!(height = block.height, hash = %block.hash, records = n, "Parsed block");
                }
                InsertOutcome::Conflict => {
                    blocks_skipped += 1;
                    debug!(
                        height = block.height,
                        hash = %block.hash,
                        "Block has already been parsed, skipping"
                    );
                }
            }
            blocks_processed += 1;

            if blocks_processed % PROGRESS_INTERVAL == 0 {
                info!(
                    height = block.height,
                    remaining = block.height.saturating_sub(limits.end.height),
                    blocks_processed,
                    records_inserted,
                    "Walk progress"
                );
            }

            next_height = block.height.saturating_sub(1);
            current = block
                .previous_block_hash
                .ok_or(IndexerError::BrokenChain { hash: block.hash })?;

            if catching_up && blocks_processed % CHECKPOINT_INTERVAL == 0 {
                self.store.save_checkpoint(&remaining(next_height, &current, &limits)).await?;
            }
        }

        let state = if current == limits.end.hash {
            if catching_up {
                self.store.delete_checkpoint().await?;
            }
            info!(
                last_hash = %current,
                limit_height = limits.end.height,
                blocks_processed,
                records_inserted,
                "Parsing completed, reached limit height"
            );
            WalkState::Completed
        } else {
            if catching_up {
                self.store.save_checkpoint(&remaining(next_height, &current, &limits)).await?;
            }
            info!(
                last_hash = %current,
                blocks_processed,
                records_inserted,
                "Parsing stopped on request"
            );
            WalkState::Stopped
        };

        Ok(WalkOutcome {
            state,
            mode,
            limits,
            blocks_processed,
            blocks_skipped,
            records_inserted,
            last_hash: current,
        })
    }
}

/// What is left of `limits` when the walk would fetch `next_hash` next.
fn remaining(next_height: u64, next_hash: &str, limits: &ParsingLimits) -> ParsingLimits {
    ParsingLimits {
        start: BlockRef::new(next_height, next_hash),
        end: limits.end.clone(),
    }
}

/// Clears the run's token and publishes the final state on drop.
struct RunGuard<'a, C, S> {
    walker: &'a Walker<C, S>,
    final_state: WalkState,
}

impl<C, S> Drop for RunGuard<'_, C, S> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.walker.cancel.lock() {
            slot.take();
            self.walker.state.send_replace(self.final_state);
        }
    }
}
