use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use lovebug_common::{LovebugError, Platform, Report};

use crate::analysis::{
    analyze_text, classify_severity, extract_keywords, extract_location, LOVEBUG_KEYWORDS,
};
use crate::fetchers::RawPost;
use crate::traits::{ReportSink, SourceFetcher, UpdatePublisher};

/// Stats from one scheduled ingest run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub posts_fetched: u32,
    pub keywords_failed: u32,
    pub duplicates_skipped: u32,
    pub reports_extracted: u32,
    pub extraction_failures: u32,
    pub reports_persisted: u32,
    pub persist_failures: u32,
    pub clients_notified: usize,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Ingest Run Complete ===")?;
        writeln!(f, "Posts fetched:       {}", self.posts_fetched)?;
        writeln!(f, "Keywords failed:     {}", self.keywords_failed)?;
        writeln!(f, "Duplicates skipped:  {}", self.duplicates_skipped)?;
        writeln!(f, "Reports extracted:   {}", self.reports_extracted)?;
        writeln!(f, "Extraction failures: {}", self.extraction_failures)?;
        writeln!(f, "Reports persisted:   {}", self.reports_persisted)?;
        writeln!(f, "Persist failures:    {}", self.persist_failures)?;
        writeln!(f, "Clients notified:    {}", self.clients_notified)?;
        Ok(())
    }
}

/// One normalized report from one raw post. Fails only when there is no
/// text content to analyze; the caller drops the post and continues.
pub fn extract_report(raw: &RawPost) -> Result<Report, LovebugError> {
    let text = raw.text.trim();
    if text.is_empty() {
        return Err(LovebugError::Extraction(format!(
            "post {} has no text content",
            raw.id
        )));
    }

    let analysis = analyze_text(text);
    let location = extract_location(text);
    let severity = classify_severity(text, &analysis);
    let keywords = extract_keywords(text);

    Ok(Report {
        id: None,
        post_id: raw.id.clone(),
        platform: Platform::Twitter,
        content: raw.text.clone(),
        location,
        severity,
        confidence: analysis.confidence,
        sentiment: analysis.sentiment,
        keywords,
        image_urls: raw.image_urls.clone(),
        author: raw.author.clone(),
        created_at: raw.created_at,
        updated_at: Utc::now(),
    })
}

/// Scheduled ingest pipeline: fetch → extract → persist → publish.
///
/// Every failure below the level of the whole run is contained where it
/// occurs: a failed keyword is skipped, a failed post is dropped, a failed
/// upsert leaves the rest of the batch alone. The batch that survives
/// persistence is published as one envelope, or not at all when empty.
pub struct IngestPipeline {
    fetcher: Box<dyn SourceFetcher>,
    sink: Box<dyn ReportSink>,
    publisher: Box<dyn UpdatePublisher>,
    keywords: Vec<String>,
    per_keyword_limit: u32,
}

impl IngestPipeline {
    pub fn new(
        fetcher: Box<dyn SourceFetcher>,
        sink: Box<dyn ReportSink>,
        publisher: Box<dyn UpdatePublisher>,
        per_keyword_limit: u32,
    ) -> Self {
        Self {
            fetcher,
            sink,
            publisher,
            keywords: LOVEBUG_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            per_keyword_limit,
        }
    }

    /// Override the search keywords (tests, alternate deployments).
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Run one full ingest cycle.
    pub async fn run(&self) -> Result<RunStats> {
        let mut stats = RunStats::default();

        // FETCHING — keyword failures skip that keyword only.
        let mut batch: Vec<RawPost> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for keyword in &self.keywords {
            match self.fetcher.fetch_posts(keyword, self.per_keyword_limit).await {
                Ok(posts) => {
                    for post in posts {
                        if seen.insert(post.id.clone()) {
                            batch.push(post);
                        } else {
                            stats.duplicates_skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    let err = LovebugError::Fetch {
                        keyword: keyword.clone(),
                        message: e.to_string(),
                    };
                    warn!(error = %err, "Skipping keyword");
                    stats.keywords_failed += 1;
                }
            }
        }
        stats.posts_fetched = batch.len() as u32;

        // EXTRACTING — a post that cannot be extracted is dropped.
        let mut reports = Vec::new();
        for raw in &batch {
            match extract_report(raw) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(post_id = %raw.id, error = %e, "Extraction failed, dropping post");
                    stats.extraction_failures += 1;
                }
            }
        }
        stats.reports_extracted = reports.len() as u32;

        // PERSISTING — an upsert failure never rolls back earlier upserts.
        let mut accepted = Vec::new();
        for report in reports {
            match self.sink.upsert(&report).await {
                Ok(()) => {
                    stats.reports_persisted += 1;
                    accepted.push(report);
                }
                Err(e) => {
                    warn!(post_id = %report.post_id, error = %e, "Upsert failed, continuing batch");
                    stats.persist_failures += 1;
                }
            }
        }

        // PUBLISHING — exactly one envelope for the whole batch, and none
        // at all for an empty run.
        if !accepted.is_empty() {
            stats.clients_notified = self.publisher.publish(&accepted).await;
            info!(
                reports = accepted.len(),
                clients = stats.clients_notified,
                "Published update batch"
            );
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn raw(id: &str, text: &str) -> RawPost {
        RawPost {
            id: id.to_string(),
            text: text.to_string(),
            author: Some("tester".to_string()),
            created_at: Utc::now(),
            image_urls: Vec::new(),
        }
    }

    /// Fetcher serving canned posts per keyword; unknown keywords fail.
    struct MockFetcher {
        by_keyword: HashMap<String, Vec<RawPost>>,
    }

    #[async_trait]
    impl SourceFetcher for MockFetcher {
        async fn fetch_posts(&self, keyword: &str, _limit: u32) -> Result<Vec<RawPost>> {
            match self.by_keyword.get(keyword) {
                Some(posts) => Ok(posts.clone()),
                None => anyhow::bail!("source unreachable"),
            }
        }
    }

    /// Sink recording upserts keyed by post id, emulating idempotence.
    #[derive(Default)]
    struct RecordingSink {
        rows: Mutex<Vec<Report>>,
        fail_post_ids: Vec<String>,
    }

    #[async_trait]
    impl ReportSink for Arc<RecordingSink> {
        async fn upsert(&self, report: &Report) -> Result<()> {
            if self.fail_post_ids.contains(&report.post_id) {
                anyhow::bail!("constraint violation");
            }
            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows.iter_mut().find(|r| r.post_id == report.post_id) {
                *existing = report.clone();
            } else {
                rows.push(report.clone());
            }
            Ok(())
        }
    }

    /// Publisher recording each published batch.
    #[derive(Default)]
    struct RecordingPublisher {
        batches: Mutex<Vec<Vec<Report>>>,
    }

    #[async_trait]
    impl UpdatePublisher for RecordingPublisher {
        async fn publish(&self, reports: &[Report]) -> usize {
            self.batches.lock().unwrap().push(reports.to_vec());
            reports.len()
        }
    }

    fn pipeline_with(
        by_keyword: HashMap<String, Vec<RawPost>>,
        sink: &Arc<RecordingSink>,
        publisher: &Arc<RecordingPublisher>,
        keywords: &[&str],
    ) -> IngestPipeline {
        IngestPipeline::new(
            Box::new(MockFetcher { by_keyword }),
            Box::new(sink.clone()),
            Box::new(publisher.clone()),
            10,
        )
        .with_keywords(keywords.iter().map(|k| k.to_string()).collect())
    }

    #[tokio::test]
    async fn failed_extraction_drops_only_that_post() {
        let sink = Arc::new(RecordingSink::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let posts = vec![
            raw("p1", "강남역에서 러브버그 많아요"),
            raw("p2", "   "),
            raw("p3", "홍대 근처 벌레 지옥"),
        ];
        let mut by_keyword = HashMap::new();
        by_keyword.insert("러브버그".to_string(), posts);

        let pipeline = pipeline_with(by_keyword, &sink, &publisher, &["러브버그"]);
        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.posts_fetched, 3);
        assert_eq!(stats.extraction_failures, 1);
        assert_eq!(stats.reports_persisted, 2);
        assert_eq!(sink.rows.lock().unwrap().len(), 2);

        let batches = publisher.batches.lock().unwrap();
        assert_eq!(batches.len(), 1, "one envelope per run");
        assert_eq!(batches[0].len(), 2);
    }

    #[tokio::test]
    async fn empty_run_publishes_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let mut by_keyword = HashMap::new();
        by_keyword.insert("러브버그".to_string(), Vec::new());

        let pipeline = pipeline_with(by_keyword, &sink, &publisher, &["러브버그"]);
        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.posts_fetched, 0);
        assert_eq!(stats.clients_notified, 0);
        assert!(publisher.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_keyword_does_not_abort_run() {
        let sink = Arc::new(RecordingSink::default());
        let publisher = Arc::new(RecordingPublisher::default());

        // Only one of two keywords is served; the other fails.
        let mut by_keyword = HashMap::new();
        by_keyword.insert(
            "러브버그".to_string(),
            vec![raw("p1", "잠실역에서 벌레 많아요")],
        );

        let pipeline = pipeline_with(by_keyword, &sink, &publisher, &["빨간벌레", "러브버그"]);
        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.keywords_failed, 1);
        assert_eq!(stats.reports_persisted, 1);
        assert_eq!(sink.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_upsert_keeps_rest_of_batch() {
        let sink = Arc::new(RecordingSink {
            rows: Mutex::new(Vec::new()),
            fail_post_ids: vec!["p2".to_string()],
        });
        let publisher = Arc::new(RecordingPublisher::default());

        let posts = vec![
            raw("p1", "강남역에서 러브버그"),
            raw("p2", "홍대 벌레 많아"),
            raw("p3", "신촌역에서 파리 떼"),
        ];
        let mut by_keyword = HashMap::new();
        by_keyword.insert("러브버그".to_string(), posts);

        let pipeline = pipeline_with(by_keyword, &sink, &publisher, &["러브버그"]);
        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.reports_persisted, 2);
        assert_eq!(stats.persist_failures, 1);

        // The published batch carries only what was accepted.
        let batches = publisher.batches.lock().unwrap();
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0].iter().all(|r| r.post_id != "p2"));
    }

    #[tokio::test]
    async fn duplicate_posts_across_keywords_collapse() {
        let sink = Arc::new(RecordingSink::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let shared = raw("p1", "강남역에서 러브버그");
        let mut by_keyword = HashMap::new();
        by_keyword.insert("러브버그".to_string(), vec![shared.clone()]);
        by_keyword.insert("빨간벌레".to_string(), vec![shared]);

        let pipeline = pipeline_with(by_keyword, &sink, &publisher, &["러브버그", "빨간벌레"]);
        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.duplicates_skipped, 1);
        assert_eq!(stats.reports_persisted, 1);
        assert_eq!(sink.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reingesting_a_post_updates_in_place() {
        let sink = Arc::new(RecordingSink::default());
        let first = extract_report(&raw("p1", "강남역에서 러브버그 좀 있네요")).unwrap();
        let second = extract_report(&raw("p1", "강남역에서 러브버그 지옥입니다")).unwrap();

        sink.upsert(&first).await.unwrap();
        sink.upsert(&second).await.unwrap();

        let rows = sink.rows.lock().unwrap();
        assert_eq!(rows.len(), 1, "same post id never duplicates");
        assert_eq!(rows[0].content, "강남역에서 러브버그 지옥입니다");
        assert_eq!(rows[0].severity, lovebug_common::Severity::Critical);
    }

    #[test]
    fn extraction_populates_all_signals() {
        let report = extract_report(&raw("p1", "지금 강남역에서 러브버그 떼거리 봤어요")).unwrap();
        assert_eq!(report.post_id, "p1");
        assert_eq!(report.severity, lovebug_common::Severity::Critical);
        assert!(report.location.is_some());
        assert!(report.confidence > 0.8);
        assert!(report.keywords.iter().any(|k| k == "러브버그"));
    }
}
