use chrono::Utc;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::Semaphore,
    task::JoinSet,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{Source, SourceRef},
    extractor::extract_article,
    fetcher::{FeedError, FeedFetcher, RawEntry},
    ingest::IngestError,
    repositories::{ArticleStore, SourceStore, StoreError, TagStore, bounded, slugify},
};

/// Ingestion limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    pub feed_timeout: Duration,
    pub store_timeout: Duration,
    pub concurrency: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            feed_timeout: Duration::from_secs(30),
            store_timeout: Duration::from_secs(10),
            concurrency: 4,
        }
    }
}

/// Per-source entry counters. `failed` includes entries without a link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub entries: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceStatus {
    Completed(SourceReport),
    Failed(String),
    /// Not started before the deadline passed or the run was cancelled.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source_id: Uuid,
    pub source_name: String,
    pub status: SourceStatus,
}

/// Result of one pass over the active sources, in source listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub sources: Vec<SourceOutcome>,
}

impl IngestOutcome {
    pub fn inserted(&self) -> usize {
        self.reports().map(|r| r.inserted).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.reports().map(|r| r.duplicates).sum()
    }

    pub fn failures(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.status, SourceStatus::Failed(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.status == SourceStatus::Skipped)
            .count()
    }

    fn reports(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter_map(|s| match &s.status {
            SourceStatus::Completed(report) => Some(report),
            _ => None,
        })
    }
}

/// Pulls every active source and stores the entries it has not seen yet.
#[derive(Clone)]
pub struct Ingestor {
    sources: Arc<dyn SourceStore>,
    articles: Arc<dyn ArticleStore>,
    tags: Arc<dyn TagStore>,
    fetcher: Arc<dyn FeedFetcher>,
    settings: IngestSettings,
}

impl Ingestor {
    pub fn new(
        sources: Arc<dyn SourceStore>,
        articles: Arc<dyn ArticleStore>,
        tags: Arc<dyn TagStore>,
        fetcher: Arc<dyn FeedFetcher>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            sources,
            articles,
            tags,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> IngestSettings {
        self.settings
    }

    pub async fn ingest_all(&self, deadline: Instant) -> Result<IngestOutcome, IngestError> {
        self.ingest_all_with_cancel(deadline, CancellationToken::new())
            .await
    }

    /// Ingest all active sources with bounded parallelism.
    ///
    /// Only a failure to list sources is returned as an error. Sources that
    /// have not started when `deadline` passes or `token` fires are reported
    /// as skipped; running ones finish under their own fetch timeout.
    #[instrument(skip_all)]
    pub async fn ingest_all_with_cancel(
        &self,
        deadline: Instant,
        token: CancellationToken,
    ) -> Result<IngestOutcome, IngestError> {
        let sources = bounded(self.settings.store_timeout, self.sources.list_active()).await?;
        info!(
            "Starting ingest run over {} sources, concurrency {}",
            sources.len(),
            self.settings.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut outcomes: Vec<SourceOutcome> = sources
            .iter()
            .map(|s| SourceOutcome {
                source_id: s.id,
                source_name: s.name.clone(),
                status: SourceStatus::Skipped,
            })
            .collect();
        let mut running = JoinSet::new();
        let mut slots = HashMap::new();

        for (index, source) in sources.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                _ = sleep_until(deadline) => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                debug!(source = %source.name, "not started before stop");
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || token.is_cancelled() {
                continue;
            }
            let fetch_timeout = self.settings.feed_timeout.min(remaining);

            let this = self.clone();
            let span = info_span!("source", source = %source.name, source_id = %source.id);
            let handle = running.spawn(
                async move {
                    let _permit = permit;
                    match this.ingest_source(&source, fetch_timeout).await {
                        Ok(report) => SourceStatus::Completed(report),
                        Err(e) => {
                            warn!(retriable = e.is_retriable(), "Source ingest failed: {}", e);
                            SourceStatus::Failed(e.to_string())
                        }
                    }
                }
                .instrument(span),
            );
            slots.insert(handle.id(), index);
        }

        while let Some(joined) = running.join_next_with_id().await {
            match joined {
                Ok((id, status)) => {
                    if let Some(&index) = slots.get(&id) {
                        outcomes[index].status = status;
                    }
                }
                Err(e) => {
                    error!("Source task did not complete: {}", e);
                    if let Some(&index) = slots.get(&e.id()) {
                        outcomes[index].status = SourceStatus::Failed(e.to_string());
                    }
                }
            }
        }

        let outcome = IngestOutcome { sources: outcomes };
        info!(
            inserted = outcome.inserted(),
            duplicates = outcome.duplicates(),
            failures = outcome.failures(),
            skipped = outcome.skipped(),
            "Ingest run finished"
        );
        Ok(outcome)
    }

    /// Fetch one source with the configured feed timeout.
    pub async fn ingest_one(&self, source: &Source) -> Result<SourceReport, IngestError> {
        self.ingest_source(source, self.settings.feed_timeout).await
    }

    async fn ingest_source(
        &self,
        source: &Source,
        fetch_timeout: Duration,
    ) -> Result<SourceReport, IngestError> {
        let fetched = match tokio::time::timeout(
            fetch_timeout,
            self.fetcher.fetch_and_parse(&source.url, fetch_timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FeedError::RequestTimeout),
        };

        let result = match fetched {
            Ok(entries) => Ok(self.store_entries(&source.source_ref(), entries).await),
            Err(e) => Err(IngestError::from(e)),
        };

        // Recorded whether or not the feed could be read.
        if let Err(e) = bounded(
            self.settings.store_timeout,
            self.sources.mark_fetched(source.id, Utc::now()),
        )
        .await
        {
            warn!("Failed to record fetch time: {}", e);
        }

        if let Ok(report) = &result {
            info!(
                entries = report.entries,
                inserted = report.inserted,
                duplicates = report.duplicates,
                failed = report.failed,
                "Source ingested"
            );
        }
        result
    }

    async fn store_entries(&self, source: &SourceRef, entries: Vec<RawEntry>) -> SourceReport {
        let mut report = SourceReport {
            entries: entries.len(),
            ..SourceReport::default()
        };

        for entry in &entries {
            if entry.link.trim().is_empty() {
                debug!(title = %entry.title, "entry has no link");
                report.failed += 1;
                continue;
            }
            match self.store_entry(source, entry).await {
                Ok(true) => report.inserted += 1,
                Ok(false) => report.duplicates += 1,
                Err(e) => {
                    warn!(url = %entry.link, "Failed to store entry: {}", e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Returns whether a new article was created.
    async fn store_entry(&self, source: &SourceRef, entry: &RawEntry) -> Result<bool, StoreError> {
        let limit = self.settings.store_timeout;
        if bounded(limit, self.articles.exists_by_url(entry.link.trim())).await? {
            return Ok(false);
        }

        let article = extract_article(entry, source);
        let stored = bounded(limit, self.articles.insert_if_absent(&article)).await?;
        if !stored.inserted {
            return Ok(false);
        }

        self.tag_from_categories(stored.id, &article.categories)
            .await;
        Ok(true)
    }

    async fn tag_from_categories(&self, article_id: Uuid, categories: &[String]) {
        let mut slugs: Vec<String> = categories
            .iter()
            .map(|c| slugify(c))
            .filter(|s| !s.is_empty())
            .collect();
        slugs.sort();
        slugs.dedup();
        if slugs.is_empty() {
            return;
        }

        let limit = self.settings.store_timeout;
        let tags = match bounded(limit, self.tags.find_by_slugs(&slugs)).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(%article_id, "Tag lookup failed: {}", e);
                return;
            }
        };
        if tags.is_empty() {
            return;
        }

        let ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        if let Err(e) = bounded(limit, self.articles.associate_tags(article_id, &ids)).await {
            warn!(%article_id, "Tag association failed: {}", e);
        }
    }
}
