// Trait seams for the ingest pipeline's dependencies.
//
// SourceFetcher — where raw posts come from (Twitter API, offline samples).
// ReportSink — where normalized reports go (Postgres in production).
// UpdatePublisher — who gets told about a fresh batch (the WebSocket registry).
//
// These enable deterministic pipeline tests with in-memory mocks:
// no network, no database.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use lovebug_common::{LovebugError, Report};
use lovebug_store::ReportWriter;

use crate::fetchers::RawPost;

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch up to `limit` recent posts matching one search keyword.
    async fn fetch_posts(&self, keyword: &str, limit: u32) -> Result<Vec<RawPost>>;
}

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Idempotent upsert keyed by the report's post id.
    async fn upsert(&self, report: &Report) -> Result<()>;
}

#[async_trait]
impl ReportSink for ReportWriter {
    async fn upsert(&self, report: &Report) -> Result<()> {
        self.upsert_report(report)
            .await
            .map_err(|e| LovebugError::Persistence(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
pub trait UpdatePublisher: Send + Sync {
    /// Push one batch to all live clients. Returns how many received it.
    async fn publish(&self, reports: &[Report]) -> usize;
}

// Arc<P> blanket — lets a publisher be shared (the web server holds the
// registry while the pipeline holds a handle into it).
#[async_trait]
impl<P: UpdatePublisher + ?Sized> UpdatePublisher for Arc<P> {
    async fn publish(&self, reports: &[Report]) -> usize {
        (**self).publish(reports).await
    }
}
