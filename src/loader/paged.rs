use serde::de::DeserializeOwned;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::flight::{FlightState, RequestDecision, SettleDecision};
use super::page::{ResponseShape, page_url};
use super::{Item, ItemLoader, LoaderCallbacks};
use crate::config::HttpConfig;
use crate::error::LoaderError;
use crate::transport::{HttpTransport, PageTransport};

/// Construction parameters of a [`PagedItemLoader`]
#[derive(Debug, Clone)]
pub struct PagedLoaderBuilder {
    page_size: usize,
    max_items: Option<usize>,
    request_url: Option<String>,
    first_page_url: Option<String>,
    shape: ResponseShape,
    transport: Option<Arc<dyn PageTransport>>,
    runtime: Option<Handle>,
}

impl PagedLoaderBuilder {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            max_items: None,
            request_url: None,
            first_page_url: None,
            shape: ResponseShape::default(),
            transport: None,
            runtime: None,
        }
    }

    /// Hard cap on materialized items. `None` means unbounded.
    pub fn max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn request_url(mut self, url: impl Into<String>) -> Self {
        self.request_url = Some(url.into());
        self
    }

    /// Endpoint used for page 1 only
    pub fn first_page_url(mut self, url: impl Into<String>) -> Self {
        self.first_page_url = Some(url.into());
        self
    }

    pub fn response_shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }

    /// Defaults to an [`HttpTransport`] with default settings
    pub fn transport(mut self, transport: Arc<dyn PageTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults to the runtime `build` is called from
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build<T>(self, callbacks: LoaderCallbacks<T>) -> Result<PagedItemLoader<T>, LoaderError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let page_size = NonZeroUsize::new(self.page_size)
            .ok_or_else(|| LoaderError::misconfigured("page_size must be positive"))?;

        let max_items = match self.max_items {
            Some(max) => Some(
                NonZeroUsize::new(max)
                    .ok_or_else(|| LoaderError::misconfigured("max_items must be positive"))?,
            ),
            None => None,
        };

        let request_url = self
            .request_url
            .as_deref()
            .ok_or_else(|| LoaderError::misconfigured("request_url is required"))
            .and_then(|url| Url::parse(url).map_err(LoaderError::from))?;

        let first_page_url = self.first_page_url.as_deref().map(Url::parse).transpose()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&HttpConfig::default())?),
        };

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| LoaderError::NoRuntime)?,
        };

        let (flight, _) = watch::channel(FlightState::Idle);

        debug!(
            "Created paged loader for {} (page size {}, max items {:?})",
            request_url, page_size, max_items
        );

        Ok(PagedItemLoader {
            shared: Arc::new(Shared {
                page_size,
                max_items,
                request_url,
                first_page_url,
                shape: self.shape,
                transport,
                callbacks,
                runtime,
                cancel: CancellationToken::new(),
                flight,
                state: Mutex::new(LoaderState {
                    items: Vec::new(),
                    total_available: None,
                    flight: FlightState::Idle,
                    failed: false,
                    task: None,
                }),
            }),
        })
    }
}

/// Pulls a listing from a paginated REST endpoint, one page at a time
///
/// At most one request is in flight; triggers arriving meanwhile collapse
/// into a single follow-up. A failed page ends loading. Dropping the loader
/// cancels it.
pub struct PagedItemLoader<T = Item> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    page_size: NonZeroUsize,
    max_items: Option<NonZeroUsize>,
    request_url: Url,
    first_page_url: Option<Url>,
    shape: ResponseShape,
    transport: Arc<dyn PageTransport>,
    callbacks: LoaderCallbacks<T>,
    runtime: Handle,
    cancel: CancellationToken,
    flight: watch::Sender<FlightState>,
    state: Mutex<LoaderState<T>>,
}

struct LoaderState<T> {
    items: Vec<T>,
    total_available: Option<usize>,
    flight: FlightState,
    /// A page failed or came back short; nothing more will be fetched
    failed: bool,
    task: Option<JoinHandle<()>>,
}

/// Callbacks owed to the view once a request settled
enum Emission<T> {
    Page {
        count: Option<usize>,
        items: Vec<T>,
        raw: Option<Value>,
    },
    Failure {
        items: Option<Vec<T>>,
        error: LoaderError,
    },
}

impl<T> Shared<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, LoaderState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &LoaderState<T>) {
        self.flight.send_replace(state.flight);
    }

    /// Items still allowed in, or `None` while the total is unknown and no cap is set
    fn room_left(&self, state: &LoaderState<T>) -> Option<usize> {
        let limit = match (self.max_items.map(NonZeroUsize::get), state.total_available) {
            (Some(max), Some(total)) => Some(max.min(total)),
            (Some(max), None) => Some(max),
            (None, total) => total,
        };
        limit.map(|limit| limit.saturating_sub(state.items.len()))
    }

    fn is_exhausted(&self, state: &LoaderState<T>) -> bool {
        state.failed || self.room_left(state) == Some(0)
    }

    fn request_next(self: &Arc<Self>) {
        let mut state = self.lock_state();
        self.advance(&mut state);
        self.publish(&state);
    }

    fn advance(self: &Arc<Self>, state: &mut LoaderState<T>) {
        let exhausted = self.is_exhausted(state);
        match state.flight.on_request(exhausted) {
            RequestDecision::Issue => {}
            RequestDecision::Queue => {
                debug!("Request in flight, queued a follow-up page");
                return;
            }
            RequestDecision::Coalesce => {
                debug!("Follow-up page already queued");
                return;
            }
            RequestDecision::Ignore => return,
        }

        let page = state.items.len() / self.page_size.get() + 1;
        let base = match (&self.first_page_url, page) {
            (Some(first), 1) => first,
            _ => &self.request_url,
        };
        let url = page_url(base, page, self.page_size);

        info!("Requesting page {} ({})", page, url);

        let shared = Arc::clone(self);
        state.task = Some(
            self.runtime
                .spawn(async move { shared.run_request(page, url).await }),
        );
    }

    async fn run_request(self: Arc<Self>, page: usize, url: Url) {
        let _settle = SettleOnExit(Arc::clone(&self));

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Page {} request aborted", page);
                return;
            }
            outcome = self.transport.fetch_page(&url) => outcome,
        };

        if let Some(emission) = self.apply(page, outcome) {
            self.emit(emission);
        }
    }

    fn apply(&self, page: usize, outcome: Result<Value, LoaderError>) -> Option<Emission<T>> {
        let parsed = outcome.and_then(|body| {
            let response = self.shape.parse::<T>(&body)?;
            Ok((response, body))
        });

        let mut state = self.lock_state();
        if state.flight.is_cancelled() {
            return None;
        }

        let (response, body) = match parsed {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!("Page {} failed, loading stopped: {}", page, error);
                state.failed = true;
                // Page 1 never produced a list, so there is nothing to report
                let items = (page > 1).then(|| state.items.clone());
                return Some(Emission::Failure { items, error });
            }
        };

        let first = page == 1;
        let count = if first {
            let total = response.total_count.unwrap_or_else(|| {
                debug!("First page carries no total, treating it as the whole listing");
                response.results.len()
            });
            state.total_available = Some(total);
            Some(total)
        } else {
            None
        };

        let received = response.results.len();
        let mut results = response.results;
        if let Some(room) = self.room_left(&state) {
            if received > room {
                debug!("Truncating page {} from {} to {} items", page, received, room);
                results.truncate(room);
            }
        }
        state.items.extend(results);

        if received < self.page_size.get() {
            // Short or empty page: asking for the same index again would loop
            state.failed = true;
        }

        info!(
            "Page {} applied: {} items loaded of {:?}",
            page,
            state.items.len(),
            state.total_available
        );

        Some(Emission::Page {
            count,
            items: state.items.clone(),
            raw: first.then_some(body),
        })
    }

    fn emit(&self, emission: Emission<T>) {
        match emission {
            Emission::Page { count, items, raw } => {
                if let Some(count) = count {
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    self.callbacks.count(count);
                }
                if self.cancel.is_cancelled() {
                    return;
                }
                self.callbacks.load(&items);
                if let Some(raw) = raw {
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    self.callbacks.response_data(&raw);
                }
            }
            Emission::Failure { items, error } => {
                if let Some(items) = items {
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    self.callbacks.load(&items);
                }
                if self.cancel.is_cancelled() {
                    return;
                }
                self.callbacks.error(&error);
            }
        }
    }

    fn settle(self: &Arc<Self>) {
        let mut state = self.lock_state();
        state.task = None;
        match state.flight.on_settled() {
            SettleDecision::Followup => {
                debug!("Issuing queued follow-up page");
                self.advance(&mut state);
            }
            SettleDecision::Rest | SettleDecision::Discard => {}
        }
        self.publish(&state);
    }
}

/// Settles the flight when a request task ends, also on abort or a panicking callback
struct SettleOnExit<T>(Arc<Shared<T>>)
where
    T: DeserializeOwned + Clone + Send + Sync + 'static;

impl<T> Drop for SettleOnExit<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.0.settle();
    }
}

impl<T> PagedItemLoader<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn builder(page_size: usize) -> PagedLoaderBuilder {
        PagedLoaderBuilder::new(page_size)
    }

    /// Snapshot of the materialized items
    pub fn items(&self) -> Vec<T> {
        self.shared.lock_state().items.clone()
    }

    pub fn flight_state(&self) -> FlightState {
        self.shared.lock_state().flight
    }

    pub fn total_pages(&self) -> Option<usize> {
        self.total_count()
            .map(|total| total.div_ceil(self.shared.page_size.get()))
    }

    /// Resolves once no page request is in flight, including queued follow-ups
    pub async fn until_settled(&self) {
        let mut flight = self.shared.flight.subscribe();
        let _ = flight.wait_for(|state| !state.is_in_flight()).await;
    }
}

impl<T> ItemLoader for PagedItemLoader<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn load_next_page(&self) {
        self.shared.request_next();
    }

    fn cancel_all(&self) {
        let task = {
            let mut state = self.shared.lock_state();
            if state.flight.on_cancel() {
                info!("Cancelling loader with {} items loaded", state.items.len());
            }
            self.shared.cancel.cancel();
            self.shared.publish(&state);
            state.task.take()
        };
        // The aborted task settles on drop and needs the lock
        if let Some(task) = task {
            task.abort();
        }
    }

    fn loaded_count(&self) -> usize {
        self.shared.lock_state().items.len()
    }

    fn total_count(&self) -> Option<usize> {
        self.shared.lock_state().total_available
    }

    fn is_exhausted(&self) -> bool {
        let state = self.shared.lock_state();
        self.shared.is_exhausted(&state)
    }

    fn is_cancelled(&self) -> bool {
        self.shared.lock_state().flight.is_cancelled()
    }
}

impl<T> Drop for PagedItemLoader<T> {
    fn drop(&mut self) {
        let task = {
            let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.flight.on_cancel();
            self.shared.cancel.cancel();
            self.shared.flight.send_replace(state.flight);
            state.task.take()
        };
        if let Some(task) = task {
            task.abort();
        }
    }
}
