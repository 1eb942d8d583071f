use tracing::debug;

use crate::loader::ItemLoader;

/// Why a listing view wants more items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTrigger {
    /// The view was mounted or its parameters changed
    Mount,
    /// The end-of-list sentinel scrolled into view
    ScrollIntoView,
    /// The viewport changed and now fits this many items
    Resize { visible_items: usize },
    /// The page became visible again
    VisibilityWake,
}

/// View-side driver, written once against any [`ItemLoader`]
///
/// Maps view events to `load_next_page` calls and disposes the loader when
/// the view goes away.
pub struct ListingDriver {
    loader: Box<dyn ItemLoader>,
    wanted: usize,
}

impl ListingDriver {
    pub fn new(loader: Box<dyn ItemLoader>) -> Self {
        Self { loader, wanted: 0 }
    }

    pub fn loader(&self) -> &dyn ItemLoader {
        self.loader.as_ref()
    }

    /// True while the view is short of the items its viewport can show
    pub fn wants_more(&self) -> bool {
        self.loader.can_load_more() && self.loader.loaded_count() < self.wanted
    }

    /// Returns whether a page was requested
    pub fn handle(&mut self, trigger: LoadTrigger) -> bool {
        if !self.loader.can_load_more() {
            return false;
        }

        let load = match trigger {
            LoadTrigger::Mount | LoadTrigger::ScrollIntoView => true,
            LoadTrigger::Resize { visible_items } => {
                self.wanted = visible_items;
                self.wants_more()
            }
            LoadTrigger::VisibilityWake => self.wants_more(),
        };

        if load {
            debug!("{:?}: loading next page", trigger);
            self.loader.load_next_page();
        }
        load
    }

    /// Cancel the loader; called when the view unmounts
    pub fn dispose(&self) {
        self.loader.cancel_all();
    }
}

impl Drop for ListingDriver {
    fn drop(&mut self) {
        self.loader.cancel_all();
    }
}
