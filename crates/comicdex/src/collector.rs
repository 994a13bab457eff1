//! 🧵 The collector: a task per comic and a single join point.
//!
//! 🎬 *[a few thousand tasks leave the starting line at once. nobody waits for a permit.]*
//! *[some come back with a comic. some come back empty-handed. all of them come back.]*
//!
//! 🧠 Knowledge graph:
//! - Fan-out: every ID in the plan gets its own tokio task. Unbounded by default;
//!   `max_in_flight` hands out semaphore permits when someone wants to be polite.
//! - The ONLY critical section in the whole pipeline is [`ComicCollection::push`].
//! - Failures are logged, recorded and dropped. Siblings never notice.
//! - [`Collector::run_all`] is the barrier. It returns only when every task has
//!   either appended or failed. Tasks are registered with the [`JoinSet`] at spawn
//!   time, so nothing can finish before we know to wait for it.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::comic::Comic;
use crate::error::FetchError;
use crate::fetcher::ComicFetcher;
use crate::progress::FetchProgress;

/// 📦 Append-only, lock-guarded pile of comics.
///
/// Clone hands out another handle to the same pile. Order is whatever order the
/// tasks won the lock in; downstream keys by `num`, never by position.
#[derive(Debug, Clone, Default)]
pub struct ComicCollection {
    comics: Arc<Mutex<Vec<Comic>>>,
}

impl ComicCollection {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            comics: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
        }
    }

    /// 🔒 The one critical section. Lock, push, release.
    pub async fn push(&self, comic: Comic) {
        self.comics.lock().await.push(comic);
    }

    /// 🔓 Hand the comics to a single owner once the writers are gone.
    ///
    /// After the join point this is the last handle and the Vec moves out for free.
    /// If a stray handle is still alive we copy instead of waiting on it.
    pub async fn into_inner(self) -> Vec<Comic> {
        match Arc::try_unwrap(self.comics) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        }
    }
}

/// 📋 What came back from the fan-out.
#[derive(Debug)]
pub struct CollectReport {
    /// 🔢 How many IDs were scheduled.
    pub requested: usize,
    /// ✅ How many comics arrived. Stays put after `comics` is handed off.
    pub fetched: usize,
    /// 🦸 Every comic that arrived, in lock order.
    pub comics: Vec<Comic>,
    /// 💀 Every fetch that didn't, one error per ID.
    pub failures: Vec<FetchError>,
    /// 🧨 Tasks that panicked or were cancelled by the runtime.
    pub aborted: usize,
}

impl CollectReport {
    pub fn succeeded(&self) -> usize {
        self.fetched
    }

    pub fn failed(&self) -> usize {
        self.failures.len() + self.aborted
    }
}

/// 🧵 Fans out one fetch per ID and waits for all of them.
#[derive(Debug)]
pub struct Collector<F> {
    fetcher: Arc<F>,
    max_in_flight: Option<usize>,
    progress: FetchProgress,
}

impl<F> Collector<F>
where
    F: ComicFetcher + 'static,
{
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            max_in_flight: None,
            progress: FetchProgress::hidden(),
        }
    }

    /// 🚦 `None` (the default) means no limit at all. `Some(0)` is treated as 1.
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_progress(mut self, progress: FetchProgress) -> Self {
        self.progress = progress;
        self
    }

    /// 🚀 Fetch every ID concurrently and block until each one has landed or failed.
    pub async fn run_all(&self, ids: &[u32]) -> CollectReport {
        info!(
            tasks = ids.len(),
            max_in_flight = ?self.max_in_flight,
            "🚀 Spawning comic fetch tasks"
        );

        let collection = ComicCollection::with_capacity(ids.len());
        let limiter = self
            .max_in_flight
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let mut tasks = JoinSet::new();

        for &id in ids {
            let fetcher = Arc::clone(&self.fetcher);
            let collection = collection.clone();
            let limiter = limiter.clone();
            let progress = self.progress.clone();

            tasks.spawn(async move {
                // -- 🚦 held until this task ends; None when unbounded
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };

                match fetcher.fetch(id).await {
                    Ok(comic) => {
                        if comic.num != id {
                            warn!(requested = id, received = comic.num, "⚠️ comic number differs from the requested ID");
                        }
                        collection.push(comic).await;
                        progress.record_success();
                        Ok(())
                    }
                    Err(err) => {
                        warn!(
                            id,
                            error = %err,
                            cause = ?std::error::Error::source(&err).map(ToString::to_string),
                            "💀 fetch failed; comic dropped"
                        );
                        progress.record_failure();
                        Err(err)
                    }
                }
            });
        }

        // -- 🧱 the join point. nothing below runs until every task has reported in.
        let mut failures = Vec::new();
        let mut aborted = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => failures.push(err),
                Err(join_err) => {
                    error!(error = %join_err, "🧨 a fetch task died before reporting back");
                    aborted += 1;
                }
            }
        }
        self.progress.finish();

        let comics = collection.into_inner().await;
        info!(
            requested = ids.len(),
            fetched = comics.len(),
            failed = failures.len(),
            aborted,
            "✅ All fetch tasks finished"
        );

        CollectReport {
            requested: ids.len(),
            fetched: comics.len(),
            comics,
            failures,
            aborted,
        }
    }
}
