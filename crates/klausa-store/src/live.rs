//! Views that refetch when their rows change.
//!
//! A [`LiveView`] owns a fetch closure. Each [`LiveView::refresh`] starts a
//! new fetch task and cancels the previous one; results are tagged with a
//! generation number and only the newest generation is ever published.
//! Consumers read the current [`LoadState`] or wait on a
//! [`watch::Receiver`].

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use klausa_core::{Contract, Table};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{ContractBackend, ContractDossier, ContractQuery, load_dossier};
use crate::error::StoreError;
use crate::feed::{Change, ChangeFeed, Interest};

pub enum LoadState<T> {
    Loading,
    Ready(Arc<T>),
    Failed(String),
}

impl<T> Clone for LoadState<T> {
    fn clone(&self) -> Self {
        match self {
            LoadState::Loading => LoadState::Loading,
            LoadState::Ready(value) => LoadState::Ready(Arc::clone(value)),
            LoadState::Failed(message) => LoadState::Failed(message.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LoadState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Loading => f.write_str("Loading"),
            LoadState::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            LoadState::Failed(message) => f.debug_tuple("Failed").field(message).finish(),
        }
    }
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn ready(&self) -> Option<&Arc<T>> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

type Fetch<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, StoreError>> + Send + Sync>;

pub struct LiveView<T> {
    label: &'static str,
    fetch: Fetch<T>,
    interest: Interest,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<LoadState<T>>>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + Sync + 'static> LiveView<T> {
    pub fn new<F, Fut>(label: &'static str, interest: Interest, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        let (state, _) = watch::channel(LoadState::Loading);
        Self {
            label,
            fetch: Arc::new(move || fetch().boxed()),
            interest,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
            in_flight: Mutex::new(None),
        }
    }

    pub fn interest(&self) -> &Interest {
        &self.interest
    }

    pub fn current(&self) -> LoadState<T> {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<LoadState<T>> {
        self.state.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a new fetch, cancelling any still in flight. Returns the new
    /// generation. Must be called from within a tokio runtime.
    ///
    /// The previous result stays visible until the new one lands. The
    /// generation bump and the handle swap happen under one lock, so the
    /// task left running is always the newest one.
    pub fn refresh(&self) -> u64 {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let fut = (self.fetch)();
        let current = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let label = self.label;

        let handle = tokio::spawn(async move {
            let next = match fut.await {
                Ok(value) => LoadState::Ready(Arc::new(value)),
                Err(e) => {
                    warn!(view = label, generation, error = %e, "fetch failed");
                    LoadState::Failed(e.to_string())
                }
            };
            if publish(&state, &current, generation, next) {
                debug!(view = label, generation, "published");
            } else {
                debug!(view = label, generation, "dropping stale fetch result");
            }
        });

        if let Some(previous) = in_flight.replace(handle) {
            previous.abort();
        }
        generation
    }

    /// Wait until the view holds a result.
    pub async fn settled(&self) -> Result<Arc<T>, String> {
        let mut rx = self.watch();
        loop {
            match &*rx.borrow_and_update() {
                LoadState::Ready(value) => return Ok(Arc::clone(value)),
                LoadState::Failed(message) => return Err(message.clone()),
                LoadState::Loading => {}
            }
            if rx.changed().await.is_err() {
                return Err("view closed".to_string());
            }
        }
    }

    /// Fetch once, then refetch on every relevant change until the feed
    /// closes. A lagged subscription also triggers a refetch.
    pub async fn run(&self, feed: &ChangeFeed) {
        let mut changes = feed.subscribe(self.interest.clone());
        self.refresh();
        while let Some(change) = changes.next().await {
            match &change {
                Change::Event(event) => {
                    debug!(view = self.label, table = %event.table, kind = ?event.kind, "change")
                }
                Change::Lagged(missed) => {
                    info!(view = self.label, missed, "change feed lagged, refetching")
                }
            }
            self.refresh();
        }
        debug!(view = self.label, "change feed closed");
    }
}

/// Store `next` unless a newer generation has started.
///
/// The check runs under the channel lock, so a newer result cannot land
/// between the check and the write.
fn publish<T>(
    state: &watch::Sender<LoadState<T>>,
    current: &AtomicU64,
    generation: u64,
    next: LoadState<T>,
) -> bool {
    state.send_if_modified(|slot| {
        if current.load(Ordering::SeqCst) != generation {
            return false;
        }
        *slot = next;
        true
    })
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        let handle = self
            .in_flight
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl LiveView<Vec<Contract>> {
    /// Contract list narrowed server-side by `query`.
    pub fn contracts(backend: Arc<dyn ContractBackend>, query: ContractQuery) -> Self {
        LiveView::new("contracts", Interest::tables([Table::Contracts]), move || {
            let backend = Arc::clone(&backend);
            let query = query.clone();
            async move { backend.list_contracts(&query).await }
        })
    }
}

impl LiveView<ContractDossier> {
    /// A contract card: the row plus its findings, notes, snapshots and analysis.
    pub fn dossier(backend: Arc<dyn ContractBackend>, contract_id: impl Into<String>) -> Self {
        let contract_id: String = contract_id.into();
        let interest = Interest::tables([
            Table::Contracts,
            Table::ContractEntities,
            Table::RiskFindings,
            Table::LegalNotes,
            Table::AiRiskAnalysis,
        ])
        .for_contract(contract_id.clone());
        LiveView::new("dossier", interest, move || {
            let backend = Arc::clone(&backend);
            let contract_id = contract_id.clone();
            async move { load_dossier(backend.as_ref(), &contract_id).await }
        })
    }
}
