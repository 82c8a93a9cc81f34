//! Request pacing and cancellation
//!
//! This module handles:
//! - Courtesy delays between pages, fiscal years and categories
//! - A per-host request budget (a single-permit semaphore by default)
//! - Cooperative cancellation of delays and in-flight waits

use crate::config::CrawlConfig;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

/// Cloneable cancellation flag
///
/// Cancelling wakes every pending [`CancelToken::cancelled`] future. The
/// coordinator checks it between fetches, so already aggregated records are
/// never lost.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; idempotent
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Kind of courtesy delay, smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    Page,
    FiscalYear,
    Category,
}

/// Number of delays taken, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelayCounts {
    pub page: u32,
    pub fiscal_year: u32,
    pub category: u32,
}

/// Paces outbound requests for one crawl
///
/// Delays are courtesy pauses, not retry backoff. The request budget bounds
/// in-flight requests to the source; sharing one budget between several
/// pacers keeps the per-host contract if callers run crawls side by side.
pub struct Pacer {
    page_delay: Duration,
    fiscal_year_delay: Duration,
    category_delay: Duration,
    budget: Arc<Semaphore>,
    cancel: CancelToken,
    counts: DelayCounts,
}

impl Pacer {
    /// Creates a pacer with its own single-permit request budget
    pub fn new(config: &CrawlConfig, cancel: CancelToken) -> Self {
        Self {
            page_delay: config.page_delay(),
            fiscal_year_delay: config.fiscal_year_delay(),
            category_delay: config.category_delay(),
            budget: Arc::new(Semaphore::new(1)),
            cancel,
            counts: DelayCounts::default(),
        }
    }

    /// Replaces the request budget with a shared one
    pub fn with_budget(mut self, budget: Arc<Semaphore>) -> Self {
        self.budget = budget;
        self
    }

    pub fn delay_for(&self, kind: DelayKind) -> Duration {
        match kind {
            DelayKind::Page => self.page_delay,
            DelayKind::FiscalYear => self.fiscal_year_delay,
            DelayKind::Category => self.category_delay,
        }
    }

    pub fn counts(&self) -> DelayCounts {
        self.counts
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Waits for a request slot
    ///
    /// Returns `None` if the crawl is cancelled while waiting or the budget
    /// has been closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        if self.cancel.is_cancelled() {
            return None;
        }

        tokio::select! {
            permit = self.budget.clone().acquire_owned() => permit.ok(),
            _ = self.cancel.cancelled() => None,
        }
    }

    /// Sleeps for the courtesy delay of `kind`
    ///
    /// Returns false, without finishing the wait, if the crawl is cancelled.
    pub async fn pause(&mut self, kind: DelayKind) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        let delay = self.delay_for(kind);
        match kind {
            DelayKind::Page => self.counts.page += 1,
            DelayKind::FiscalYear => self.counts.fiscal_year += 1,
            DelayKind::Category => self.counts.category += 1,
        }
        tracing::trace!("Courtesy delay {:?} ({:?})", kind, delay);

        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}
