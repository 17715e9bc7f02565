// src/pipeline/run.rs

//! One monitoring pass.
//!
//! `FETCH → EXTRACT → FINGERPRINT → LOAD_PRIOR → {FIRST_RUN | UNCHANGED |
//! CHANGED_MINOR | CHANGED} → PERSIST`. Only a failed fetch (or a failed
//! write of the new state) ends the run with an error. Persistence comes
//! last and is unconditional once reached, so a delivery failure never
//! blocks the state from advancing.

use std::fmt;

use chrono::Local;
use url::Url;

use crate::error::Result;
use crate::models::{Config, Record, Snapshot};
use crate::pipeline::{ChangeSet, calculate_diff, fingerprint};
use crate::services::{DeliveryReport, Notification, Notifier, RecordExtractor};
use crate::storage::{SnapshotStore, StateLoad};
use crate::utils::http::PageSource;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No prior state: snapshot stored, nothing sent
    FirstRun,
    /// Digest matches the stored one: nothing written
    Unchanged,
    /// Digest moved but no record appeared or disappeared
    ChangedMinor,
    /// Records were added or removed: notified and stored
    Changed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::FirstRun => "first run",
            RunStatus::Unchanged => "unchanged",
            RunStatus::ChangedMinor => "changed (minor)",
            RunStatus::Changed => "changed",
        };
        f.write_str(s)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub record_count: usize,
    pub changes: ChangeSet,
    /// Present only when a notification was dispatched
    pub delivery: Option<DeliveryReport>,
}

/// Records extracted from the live page, with their digest.
#[derive(Debug, Clone)]
pub struct Preview {
    pub records: Vec<Record>,
    pub hash: String,
}

/// Sequences fetch, extract, compare, notify and persist.
pub struct Monitor {
    config: Config,
    source: Box<dyn PageSource>,
    store: Box<dyn SnapshotStore>,
    notifier: Notifier,
    extractor: RecordExtractor,
}

impl Monitor {
    pub fn new(
        config: Config,
        source: Box<dyn PageSource>,
        store: Box<dyn SnapshotStore>,
        notifier: Notifier,
    ) -> Result<Self> {
        let base = Url::parse(&config.monitor.url)?;
        let extractor = RecordExtractor::new(&config.extract)?.with_base_url(base);

        Ok(Self {
            config,
            source,
            store,
            notifier,
            extractor,
        })
    }

    /// Fetch and extract the live page without touching stored state.
    pub async fn preview(&self) -> Result<Preview> {
        let url = &self.config.monitor.url;
        let html = self.source.fetch(url).await?;

        let records = self.extractor.extract(&html);
        log::info!("{} records extracted", records.len());

        let hash = fingerprint(&records)?;
        Ok(Preview { records, hash })
    }

    /// Run one full monitoring pass.
    pub async fn run(&self) -> Result<RunReport> {
        let Preview { records, hash } = self.preview().await?;
        let record_count = records.len();

        let previous = match self.store.load().await {
            StateLoad::Found(snapshot) => snapshot,
            StateLoad::Missing => {
                log::info!("No previous state at {}", self.store.location());
                return self.finish_first_run(records, hash).await;
            }
            StateLoad::Corrupt(reason) => {
                log::warn!("Ignoring unreadable state ({}); treating as first run", reason);
                return self.finish_first_run(records, hash).await;
            }
        };

        if previous.hash == hash {
            log::info!("No changes");
            return Ok(RunReport {
                status: RunStatus::Unchanged,
                record_count,
                changes: ChangeSet::default(),
                delivery: None,
            });
        }

        log::info!("Content digest changed");
        let changes = calculate_diff(&records, &previous.records);
        let snapshot = Snapshot::new(records, hash);

        if !changes.has_changes() {
            log::info!("Minor changes only; refreshing state");
            self.store.save(&snapshot).await?;
            return Ok(RunReport {
                status: RunStatus::ChangedMinor,
                record_count,
                changes,
                delivery: None,
            });
        }

        log::info!(
            "{} added, {} removed",
            changes.added.len(),
            changes.removed.len()
        );
        for line in changes.summary_lines(&self.config.messages.untitled) {
            log::info!("{}", line);
        }

        let notification = Notification::compose(
            &changes,
            &self.config.monitor.url,
            snapshot.timestamp.with_timezone(&Local),
            &self.config.messages,
        );
        let delivery = self.notifier.dispatch(&notification).await;

        self.store.save(&snapshot).await?;

        Ok(RunReport {
            status: RunStatus::Changed,
            record_count,
            changes,
            delivery: Some(delivery),
        })
    }

    async fn finish_first_run(&self, records: Vec<Record>, hash: String) -> Result<RunReport> {
        let record_count = records.len();
        self.store.save(&Snapshot::new(records, hash)).await?;
        log::info!("First run; state saved to {}", self.store.location());

        Ok(RunReport {
            status: RunStatus::FirstRun,
            record_count,
            changes: ChangeSet::default(),
            delivery: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::models::RecordKind;
    use crate::services::notifier::tests::RecordingChannel;
    use crate::storage::LocalStorage;

    /// Serves whatever markup the test last put in.
    #[derive(Clone, Default)]
    struct FakeSource {
        page: Arc<Mutex<Option<String>>>,
    }

    impl FakeSource {
        fn serve(&self, html: &str) {
            *self.page.lock().unwrap() = Some(html.to_string());
        }

        fn go_down(&self) {
            *self.page.lock().unwrap() = None;
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.page
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::fetch(url, "connection refused"))
        }
    }

    struct Harness {
        _tmp: TempDir,
        source: FakeSource,
        state: LocalStorage,
        sent: Arc<Mutex<Vec<Notification>>>,
        monitor: Monitor,
    }

    fn harness(fail_delivery: bool) -> Harness {
        let tmp = TempDir::new().unwrap();
        let state = LocalStorage::new(tmp.path().join("state.json"));
        let source = FakeSource::default();
        let (channel, sent) = RecordingChannel::new("fake", fail_delivery);

        let mut config = Config::default();
        config.monitor.url = "https://example.com/calls".to_string();

        let monitor = Monitor::new(
            config,
            Box::new(source.clone()),
            Box::new(state.clone()),
            Notifier::new().with_channel(Box::new(channel)),
        )
        .unwrap();

        Harness {
            _tmp: tmp,
            source,
            state,
            sent,
            monitor,
        }
    }

    fn listing(titles: &[&str]) -> String {
        let items: String = titles
            .iter()
            .map(|t| format!(r#"<article><h2>{t}</h2><p>Details</p></article>"#))
            .collect();
        format!("<html><body><main>{items}</main></body></html>")
    }

    fn stored(h: &Harness) -> Snapshot {
        let raw = std::fs::read_to_string(h.state.path()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_first_run_saves_without_notifying() {
        let h = harness(false);
        h.source.serve(&listing(&["Conv A", "Conv B"]));

        let report = h.monitor.run().await.unwrap();

        assert_eq!(report.status, RunStatus::FirstRun);
        assert_eq!(report.record_count, 2);
        assert!(h.sent.lock().unwrap().is_empty());
        assert_eq!(stored(&h).len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_run_is_idempotent() {
        let h = harness(false);
        h.source.serve(&listing(&["Conv A", "Conv B"]));

        h.monitor.run().await.unwrap();
        let first = stored(&h);

        let report = h.monitor.run().await.unwrap();

        assert_eq!(report.status, RunStatus::Unchanged);
        assert!(h.sent.lock().unwrap().is_empty());
        assert_eq!(stored(&h), first);
    }

    #[tokio::test]
    async fn test_added_record_notifies_then_persists() {
        let h = harness(false);
        h.source.serve(&listing(&["Conv A", "Conv X"]));
        h.monitor.run().await.unwrap();

        h.source.serve(&listing(&["Conv A", "Conv B"]));
        let report = h.monitor.run().await.unwrap();

        assert_eq!(report.status, RunStatus::Changed);
        assert_eq!(report.changes.added[0].title(), Some("Conv B"));
        assert_eq!(report.changes.removed[0].title(), Some("Conv X"));
        assert_eq!(report.delivery.unwrap().delivered, vec!["fake"]);

        let sent = h.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html.contains("• Conv B"));
        assert!(sent[0].plain.contains("https://example.com/calls"));

        let titles: Vec<_> = stored(&h)
            .records
            .iter()
            .filter_map(|r| r.title.clone())
            .collect();
        assert_eq!(titles, vec!["Conv A", "Conv B"]);
    }

    #[tokio::test]
    async fn test_removed_record_is_reported() {
        let h = harness(false);
        h.source.serve(&listing(&["Conv A", "Conv B"]));
        h.monitor.run().await.unwrap();

        h.source.serve(&listing(&["Conv B", "Conv C"]));
        h.monitor.run().await.unwrap();

        let sent = h.sent.lock().unwrap();
        let html = &sent[0].html;
        assert!(html.find("Conv A").unwrap() > html.find("Removed (1)").unwrap());
    }

    #[tokio::test]
    async fn test_minor_change_persists_without_notifying() {
        let h = harness(false);
        h.source.serve(&listing(&["Conv A", "Conv B"]));
        h.monitor.run().await.unwrap();
        let before = stored(&h);

        // Same titles, different body text.
        let html = listing(&["Conv A", "Conv B"]).replace("Details", "Updated details");
        h.source.serve(&html);
        let report = h.monitor.run().await.unwrap();

        assert_eq!(report.status, RunStatus::ChangedMinor);
        assert!(h.sent.lock().unwrap().is_empty());
        assert_ne!(stored(&h).hash, before.hash);

        // The refreshed state is not re-detected.
        let report = h.monitor.run().await.unwrap();
        assert_eq!(report.status, RunStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_failed_delivery_still_persists() {
        let h = harness(true);
        h.source.serve(&listing(&["Conv A", "Conv B"]));
        h.monitor.run().await.unwrap();

        h.source.serve(&listing(&["Conv A", "Conv B", "Conv C"]));
        let report = h.monitor.run().await.unwrap();

        assert_eq!(report.status, RunStatus::Changed);
        assert_eq!(report.delivery.unwrap().failed.len(), 1);
        assert_eq!(stored(&h).len(), 3);

        let report = h.monitor.run().await.unwrap();
        assert_eq!(report.status, RunStatus::Unchanged);
        assert_eq!(h.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_persists_nothing() {
        let h = harness(false);
        h.source.go_down();

        let err = h.monitor.run().await.unwrap_err();

        assert!(err.is_fetch());
        assert!(!h.state.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_state_treated_as_first_run() {
        let h = harness(false);
        std::fs::write(h.state.path(), "garbage").unwrap();
        h.source.serve(&listing(&["Conv A", "Conv B"]));

        let report = h.monitor.run().await.unwrap();

        assert_eq!(report.status, RunStatus::FirstRun);
        assert!(h.sent.lock().unwrap().is_empty());
        assert_eq!(stored(&h).len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_page_never_reported_item_by_item() {
        let h = harness(false);
        h.source
            .serve("<html><body><main><p>No open calls</p></main></body></html>");
        h.monitor.run().await.unwrap();
        assert_eq!(stored(&h).records[0].kind, RecordKind::GeneralContent);

        h.source
            .serve("<html><body><main><p>Still no open calls</p></main></body></html>");
        let report = h.monitor.run().await.unwrap();

        assert_eq!(report.status, RunStatus::ChangedMinor);
        assert!(h.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_monitor_url_rejected() {
        let mut config = Config::default();
        config.monitor.url = "not a url".to_string();

        let result = Monitor::new(
            config,
            Box::new(FakeSource::default()),
            Box::new(LocalStorage::new("unused.json")),
            Notifier::new(),
        );

        assert!(matches!(result, Err(AppError::Url(_))));
    }

    #[tokio::test]
    async fn test_preview_does_not_persist() {
        let h = harness(false);
        h.source.serve(&listing(&["Conv A", "Conv B"]));

        let preview = h.monitor.preview().await.unwrap();

        assert_eq!(preview.records.len(), 2);
        assert_eq!(preview.hash, fingerprint(&preview.records).unwrap());
        assert!(!h.state.path().exists());
    }
}
