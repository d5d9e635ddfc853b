//! The fetch → extract → diff → notify → save cycle and the loop that
//! repeats it.

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::diff::find_new_events;
use crate::notifier::{Notifier, NotifyError};
use crate::parser::{ExtractRules, extract_events};
use crate::scraper::{FetchError, PageSource};
use crate::store::{EventStore, StoreError};
use crate::types::Event;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Failed to save events: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub enum SkipReason {
    FetchFailed(FetchError),
    NoEvents,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed(e) => write!(f, "error fetching events: {}", e),
            SkipReason::NoEvents => write!(f, "no events fetched"),
        }
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing was notified or saved; the previous snapshot is untouched.
    Skipped(SkipReason),
    Completed {
        total: usize,
        new_events: Vec<Event>,
        /// `None` when there was nothing to notify.
        notified: Option<bool>,
    },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Completed { .. })
    }
}

/// Receives cycle-level progress from the tracker.
pub trait CycleObserver: Send + Sync {
    fn cycle_started(&self) {}
    fn cycle_skipped(&self, _reason: &SkipReason) {}
    fn new_events_found(&self, _events: &[Event]) {}
    fn no_new_events(&self) {}
    fn notification_finished(&self, _result: &Result<(), NotifyError>) {}
    fn snapshot_saved(&self, _count: usize) {}
    fn cycle_failed(&self, _error: &TrackerError) {}
}

/// Reports cycle progress through the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl CycleObserver for LogObserver {
    fn cycle_started(&self) {
        log::info!("Checking for new events...");
    }

    fn cycle_skipped(&self, reason: &SkipReason) {
        log::warn!("Skipping this check: {}", reason);
    }

    fn new_events_found(&self, events: &[Event]) {
        log::info!("Found {} new event(s)!", events.len());
        for event in events {
            log::info!("  - {}", event.title);
        }
    }

    fn no_new_events(&self) {
        log::info!("No new events found");
    }

    fn notification_finished(&self, result: &Result<(), NotifyError>) {
        if let Err(e) = result {
            log::error!("Notification failed: {}", e);
        }
    }

    fn snapshot_saved(&self, count: usize) {
        log::debug!("Snapshot now holds {} events", count);
    }

    fn cycle_failed(&self, error: &TrackerError) {
        log::error!("Check failed: {}", error);
    }
}

pub struct Tracker {
    url: String,
    source: Arc<dyn PageSource>,
    notifier: Arc<dyn Notifier>,
    store: EventStore,
    rules: ExtractRules,
    observer: Arc<dyn CycleObserver>,
}

impl Tracker {
    pub fn new(
        url: impl Into<String>,
        source: Arc<dyn PageSource>,
        notifier: Arc<dyn Notifier>,
        store: EventStore,
    ) -> Self {
        Self {
            url: url.into(),
            source,
            notifier,
            store,
            rules: ExtractRules::default(),
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_rules(mut self, rules: ExtractRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs one cycle. Only a failed snapshot write is an error; fetch and
    /// extraction problems skip the cycle, delivery problems are reported and
    /// the snapshot is saved anyway.
    pub async fn check_for_new_events(&self) -> Result<CycleOutcome, TrackerError> {
        self.observer.cycle_started();

        let html = match self.source.fetch(&self.url).await {
            Ok(html) => html,
            Err(e) => return Ok(self.skip(SkipReason::FetchFailed(e))),
        };

        let current = extract_events(&html, &self.url, &self.rules);
        if current.is_empty() {
            return Ok(self.skip(SkipReason::NoEvents));
        }

        let previous = self.store.load().await;
        let new_events = find_new_events(&current, &previous);

        let notified = if new_events.is_empty() {
            self.observer.no_new_events();
            None
        } else {
            self.observer.new_events_found(&new_events);
            let result = self.notifier.notify(&new_events).await;
            self.observer.notification_finished(&result);
            Some(result.is_ok())
        };

        self.store.save(&current).await?;
        self.observer.snapshot_saved(current.len());

        Ok(CycleOutcome::Completed {
            total: current.len(),
            new_events,
            notified,
        })
    }

    /// One cycle for cron-style invocation; `true` when it completed.
    pub async fn run_once(&self) -> bool {
        match self.check_for_new_events().await {
            Ok(outcome) => outcome.is_success(),
            Err(e) => {
                self.observer.cycle_failed(&e);
                false
            }
        }
    }

    /// Repeats the cycle every `interval` until `shutdown` is cancelled. A
    /// running cycle always finishes; cancellation cuts the wait short.
    pub async fn run_continuous(&self, interval: Duration, shutdown: CancellationToken) {
        log::info!(
            "Starting continuous monitoring (checking every {} minutes)",
            interval.as_secs() / 60
        );

        loop {
            self.run_once().await;

            if shutdown.is_cancelled() {
                break;
            }
            log::info!("Next check in {} minutes...", interval.as_secs() / 60);

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        log::info!("Tracker stopped");
    }

    fn skip(&self, reason: SkipReason) -> CycleOutcome {
        self.observer.cycle_skipped(&reason);
        CycleOutcome::Skipped(reason)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// A second interrupt arrived while the tracker was still shutting down.
    Forced,
    ListenerFailed,
}

/// Cancels `shutdown` on the first interrupt and returns on the second, so a
/// caller can force an exit when a check hangs.
pub async fn watch_interrupts<F, Fut>(mut next_signal: F, shutdown: CancellationToken) -> InterruptOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        log::error!("Unable to listen for interrupt signal: {}", e);
        return InterruptOutcome::ListenerFailed;
    }
    log::info!("Interrupt received, stopping after the current check (interrupt again to quit now)");
    shutdown.cancel();

    match next_signal().await {
        Ok(()) => {
            log::warn!("Second interrupt received, exiting immediately");
            InterruptOutcome::Forced
        }
        Err(e) => {
            log::error!("Unable to listen for interrupt signal: {}", e);
            InterruptOutcome::ListenerFailed
        }
    }
}
