//! Incremental loading of listing items
//!
//! Two loaders share one capability set, [`ItemLoader`]: [`PagedItemLoader`]
//! pulls pages from a REST endpoint, [`StaticItemLoader`] reveals an array
//! that is already in memory. Both report progress to the view through
//! [`LoaderCallbacks`].

pub mod flight;
pub mod page;
pub mod paged;
pub mod static_list;

use serde_json::Value;

use crate::error::LoaderError;

pub use flight::FlightState;
pub use page::{PageResponse, ResponseShape, page_url};
pub use paged::{PagedItemLoader, PagedLoaderBuilder};
pub use static_list::StaticItemLoader;

/// An opaque backend record (media, user, playlist or taxonomy entry)
pub type Item = Value;

/// What listing views drive, regardless of where items come from
pub trait ItemLoader: Send + Sync {
    /// Advance by one page. Never fails; runtime problems end growth instead.
    fn load_next_page(&self);

    /// Stop for good. Idempotent; no callback fires afterwards.
    fn cancel_all(&self);

    /// Number of items materialized so far
    fn loaded_count(&self) -> usize;

    /// Total the listing reported, once known
    fn total_count(&self) -> Option<usize>;

    /// True once no further page can grow the item list
    fn is_exhausted(&self) -> bool;

    fn is_cancelled(&self) -> bool;

    /// True when another `load_next_page` could still do something
    fn can_load_more(&self) -> bool {
        !self.is_cancelled() && !self.is_exhausted()
    }
}

type CountFn = Box<dyn Fn(usize) + Send + Sync>;
type LoadFn<T> = Box<dyn Fn(&[T]) + Send + Sync>;
type ResponseDataFn = Box<dyn Fn(&Value) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&LoaderError) + Send + Sync>;

/// Callbacks a view hands to a loader
///
/// `on_count` fires at most once, before or with the first `on_load`.
/// `on_load` always receives the whole materialized list, which extends the
/// previous payload.
pub struct LoaderCallbacks<T> {
    on_count: CountFn,
    on_load: LoadFn<T>,
    on_response_data_loaded: Option<ResponseDataFn>,
    on_error: Option<ErrorFn>,
}

impl<T> LoaderCallbacks<T> {
    pub fn new<C, L>(on_count: C, on_load: L) -> Self
    where
        C: Fn(usize) + Send + Sync + 'static,
        L: Fn(&[T]) + Send + Sync + 'static,
    {
        Self {
            on_count: Box::new(on_count),
            on_load: Box::new(on_load),
            on_response_data_loaded: None,
            on_error: None,
        }
    }

    /// Receive the raw first-page body, e.g. for tag facets
    pub fn on_response_data_loaded<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_response_data_loaded = Some(Box::new(f));
        self
    }

    /// Be told when a page request failed and loading stopped
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&LoaderError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn count(&self, count: usize) {
        (self.on_count)(count);
    }

    pub(crate) fn load(&self, items: &[T]) {
        (self.on_load)(items);
    }

    pub(crate) fn response_data(&self, raw: &Value) {
        if let Some(f) = &self.on_response_data_loaded {
            f(raw);
        }
    }

    pub(crate) fn error(&self, error: &LoaderError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}

impl<T> std::fmt::Debug for LoaderCallbacks<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderCallbacks")
            .field("on_response_data_loaded", &self.on_response_data_loaded.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
