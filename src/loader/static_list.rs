use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{Item, ItemLoader, LoaderCallbacks};
use crate::error::LoaderError;

#[derive(Debug, Default)]
struct RevealState {
    revealed: usize,
    count_emitted: bool,
    cancelled: bool,
}

/// Reveals an array that is already in memory, page by page
///
/// Same contract as [`PagedItemLoader`](super::PagedItemLoader) without any
/// I/O: the count (`min(len, max_items)`) is reported on the first
/// `load_next_page`, together with the first page.
pub struct StaticItemLoader<T = Item> {
    all_items: Vec<T>,
    page_size: NonZeroUsize,
    limit: usize,
    callbacks: LoaderCallbacks<T>,
    state: Mutex<RevealState>,
}

impl<T: Send + Sync> StaticItemLoader<T> {
    pub fn new(
        all_items: Vec<T>,
        page_size: usize,
        max_items: Option<usize>,
        callbacks: LoaderCallbacks<T>,
    ) -> Result<Self, LoaderError> {
        let page_size = NonZeroUsize::new(page_size)
            .ok_or_else(|| LoaderError::misconfigured("page_size must be positive"))?;
        if max_items == Some(0) {
            return Err(LoaderError::misconfigured("max_items must be positive"));
        }

        let limit = max_items.map_or(all_items.len(), |max| max.min(all_items.len()));

        Ok(Self {
            all_items,
            page_size,
            limit,
            callbacks,
            state: Mutex::new(RevealState::default()),
        })
    }

    /// Reveal whole pages until at least `wanted` items are visible, e.g.
    /// after a resize made room for more rows.
    pub fn reveal_up_to(&self, wanted: usize) {
        let pages = wanted.div_ceil(self.page_size.get());
        self.reveal(pages.saturating_mul(self.page_size.get()));
    }

    /// The currently revealed prefix
    pub fn items(&self) -> &[T] {
        &self.all_items[..self.lock_state().revealed]
    }

    fn lock_state(&self) -> MutexGuard<'_, RevealState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reveal(&self, target: usize) {
        let (count, revealed) = {
            let mut state = self.lock_state();
            if state.cancelled {
                return;
            }

            let target = target.min(self.limit);
            let first = !state.count_emitted;
            if !first && target <= state.revealed {
                return;
            }

            state.count_emitted = true;
            state.revealed = state.revealed.max(target);
            (first.then_some(self.limit), state.revealed)
        };

        debug!("Revealing {} of {} static items", revealed, self.limit);

        if let Some(count) = count {
            self.callbacks.count(count);
        }
        if !self.is_cancelled() {
            self.callbacks.load(&self.all_items[..revealed]);
        }
    }
}

impl<T: Send + Sync> ItemLoader for StaticItemLoader<T> {
    fn load_next_page(&self) {
        let next = self.lock_state().revealed.saturating_add(self.page_size.get());
        self.reveal(next);
    }

    fn cancel_all(&self) {
        self.lock_state().cancelled = true;
    }

    fn loaded_count(&self) -> usize {
        self.lock_state().revealed
    }

    fn total_count(&self) -> Option<usize> {
        Some(self.limit)
    }

    fn is_exhausted(&self) -> bool {
        let state = self.lock_state();
        state.count_emitted && state.revealed >= self.limit
    }

    fn is_cancelled(&self) -> bool {
        self.lock_state().cancelled
    }
}
