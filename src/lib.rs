//! Incremental, cancellable loading of paginated media listings.

pub mod config;
pub mod error;
pub mod listing;
pub mod loader;
pub mod transport;

pub use error::LoaderError;
pub use listing::{ListingDriver, LoadTrigger};
pub use loader::{
    Item, ItemLoader, LoaderCallbacks, PagedItemLoader, PagedLoaderBuilder, StaticItemLoader,
};
pub use transport::{HttpTransport, PageTransport};
