//! `nullindex serve`: the read-only search API.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use nullindex_core::{RecordSearch, RecordStore};

use crate::config::{DatabaseArgs, ServeArgs};
use crate::shutdown::shutdown_signal;
use crate::store::AnyStore;

pub async fn serve(db: &DatabaseArgs, args: &ServeArgs) -> Result<()> {
    let target = db.target()?;
    let store = AnyStore::connect(&target).await?;
    info!(backend = store.backend(), url = %target.redacted(), "Storage initialized");

    let config = args.api_config();
    let search: Arc<dyn RecordSearch> = Arc::new(store.clone());
    let result = nullindex_api::serve(search, config.clone(), shutdown_signal())
        .await
        .with_context(|| format!("search API on {} failed", config.bind));

    store.close().await;
    info!("Search API stopped");
    result
}
