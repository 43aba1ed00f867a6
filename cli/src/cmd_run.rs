//! `nullindex run`: walk the chain once and persist what it finds.

use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use nullindex_core::{ChainSource, IndexerError, RecordStore, WalkOutcome, WalkState, Walker};
use nullindex_rpc::{BitcoindClient, HttpTransport};

use crate::config::{DatabaseArgs, NodeArgs};
use crate::shutdown::shutdown_signal;
use crate::store::AnyStore;

pub async fn run(node: &NodeArgs, db: &DatabaseArgs) -> Result<()> {
    let target = db.target()?;
    let depth_limit = node.depth_limit();
    let rpc_url = node.rpc_url();

    let transport = HttpTransport::new(&rpc_url, node.transport_config()?)?;
    let client = BitcoindClient::new(transport);

    let chain = client
        .blockchain_info()
        .await
        .with_context(|| format!("failed to reach bitcoind at {rpc_url}"))?;
    if !node.network.matches_chain(&chain.chain) {
        bail!(
            "bitcoind at {rpc_url} is on chain '{}' but NETWORK is {}",
            chain.chain,
            node.network
        );
    }
    if chain.initial_block_download {
        warn!(blocks = chain.blocks, headers = chain.headers, "bitcoind is still in initial block download");
    }
    info!(
        network = %node.network,
        chain = %chain.chain,
        blocks = chain.blocks,
        depth_limit,
        "Connected to bitcoind"
    );

    let store = AnyStore::connect(&target).await?;
    info!(backend = store.backend(), url = %target.redacted(), "Storage initialized");

    let walker = Walker::new(Arc::new(client), store, depth_limit);
    let result = walk_until(&walker, shutdown_signal()).await;
    walker.store().close().await;

    let Some(result) = result else {
        info!("Exiting before the walk started");
        return Ok(());
    };
    let outcome = result.context("walk failed")?;
    match outcome.state {
        WalkState::Completed => info!(
            mode = %outcome.mode,
            blocks = outcome.blocks_processed,
            records = outcome.records_inserted,
            skipped = outcome.blocks_skipped,
            "Run complete"
        ),
        _ => info!(
            last_hash = %outcome.last_hash,
            blocks = outcome.blocks_processed,
            records = outcome.records_inserted,
            "Run interrupted, the next run resumes from storage"
        ),
    }
    Ok(())
}

/// Run `walker` once, stopping it after the block in flight when `signal`
/// fires.
///
/// Returns `None` when the signal finds no run in progress: the walk has not
/// started yet, so the command ends without waiting for it.
async fn walk_until<C, S>(
    walker: &Walker<C, S>,
    signal: impl Future<Output = ()>,
) -> Option<Result<WalkOutcome, IndexerError>>
where
    C: ChainSource,
    S: RecordStore,
{
    let run = walker.run();
    tokio::pin!(run);
    let stopper = async {
        signal.await;
        info!("Shutdown signal received");
        walker.stop().await
    };
    tokio::pin!(stopper);
    let mut stop_pending = true;

    loop {
        tokio::select! {
            biased;
            stopped = &mut stopper, if stop_pending => {
                if !stopped {
                    return None;
                }
                stop_pending = false;
            }
            result = &mut run => return Some(result),
        }
    }
}
