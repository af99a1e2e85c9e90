//! Feed cursor controller

use super::cursor::{FeedCursor, FeedSnapshot};
use super::View;
use crate::article::Article;
use crate::error::{Result, SyncError};
use crate::events::ClientEvent;
use crate::mutation::LocalFlagStore;
use crate::session::SessionContext;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Article-listing collaborator
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch one page of `view` for `filter` (category or search query)
    async fn fetch_page(
        &self,
        view: View,
        page: u32,
        page_size: usize,
        filter: &str,
    ) -> Result<Vec<Article>>;
}

/// What a load operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// A page was fetched and applied
    Loaded {
        /// Page number now shown
        page: u32,
        /// Articles in the fetched page
        fetched: usize,
        /// Whether more pages may exist
        has_more: bool,
    },
    /// Nothing to do: no more pages, or a fetch was already in flight
    Skipped,
    /// The response arrived after a newer reset and was dropped
    Superseded,
    /// The view is not on screen and will reload on activation
    MarkedStale,
}

/// Owns the per-view cursors and every change made to them
///
/// Cursor state is kept behind a synchronous lock that is never held across
/// a fetch, so overlapping operations interleave only at network calls.
pub struct FeedCursorController {
    source: Arc<dyn ArticleSource>,
    session: Arc<SessionContext>,
    page_size: usize,
    cursors: Mutex<HashMap<View, FeedCursor>>,
    events: broadcast::Sender<ClientEvent>,
}

impl FeedCursorController {
    /// Create a controller with no views loaded
    pub fn new(
        source: Arc<dyn ArticleSource>,
        session: Arc<SessionContext>,
        page_size: usize,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            source,
            session,
            page_size: page_size.max(1),
            cursors: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Session this controller reads the active view from
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Render-ready copy of a view's state
    pub fn snapshot(&self, view: View) -> FeedSnapshot {
        self.cursors
            .lock()
            .get(&view)
            .map(FeedCursor::snapshot)
            .unwrap_or_else(|| FeedCursor::new(view, self.page_size).snapshot())
    }

    /// Reset `view` to page 1 with `filter` and fetch it
    ///
    /// Overlapping calls each fetch; only the most recently issued one is
    /// applied, whatever order the responses arrive in.
    pub async fn load_first_page(&self, view: View, filter: impl Into<String>) -> Result<PageOutcome> {
        let filter = filter.into().trim().to_string();
        if view == View::Search && filter.is_empty() {
            return Err(SyncError::EmptyQuery);
        }

        let generation = {
            let mut cursors = self.cursors.lock();
            let cursor = cursors
                .entry(view)
                .or_insert_with(|| FeedCursor::new(view, self.page_size));
            let generation = cursor.reset(filter.clone());
            self.publish(cursor);
            generation
        };

        debug!(%view, filter = %filter, generation, "loading first page");
        let result = self.source.fetch_page(view, 1, self.page_size, &filter).await;

        let mut cursors = self.cursors.lock();
        let Some(cursor) = cursors.get_mut(&view).filter(|c| c.generation() == generation) else {
            debug!(%view, generation, "dropping superseded first page");
            return Ok(PageOutcome::Superseded);
        };

        match result {
            Ok(items) => {
                let fetched = items.len();
                cursor.finish_first_page(items);
                info!(%view, filter = %filter, fetched, has_more = cursor.has_more(), "first page loaded");
                self.publish(cursor);
                Ok(PageOutcome::Loaded {
                    page: 1,
                    fetched,
                    has_more: cursor.has_more(),
                })
            }
            Err(e) => {
                cursor.fail_first_page();
                warn!(%view, error = %e, "first page failed");
                self.publish(cursor);
                Err(e)
            }
        }
    }

    /// Fetch and append the next page of `view`
    ///
    /// On failure the page counter returns to its value before the call and
    /// the loaded items are left untouched.
    pub async fn load_next_page(&self, view: View) -> Result<PageOutcome> {
        let (ticket, filter) = {
            let mut cursors = self.cursors.lock();
            let Some(cursor) = cursors.get_mut(&view) else {
                return Ok(PageOutcome::Skipped);
            };
            let Some(ticket) = cursor.begin_next_page() else {
                debug!(%view, busy = cursor.is_busy(), has_more = cursor.has_more(), "next page skipped");
                return Ok(PageOutcome::Skipped);
            };
            self.publish(cursor);
            (ticket, cursor.filter().to_string())
        };

        debug!(%view, page = ticket.page, "loading next page");
        let result = self
            .source
            .fetch_page(view, ticket.page, self.page_size, &filter)
            .await;

        let mut cursors = self.cursors.lock();
        let Some(cursor) = cursors
            .get_mut(&view)
            .filter(|c| c.generation() == ticket.generation)
        else {
            debug!(%view, page = ticket.page, "dropping superseded page");
            return Ok(PageOutcome::Superseded);
        };

        match result {
            Ok(items) => {
                let fetched = items.len();
                cursor.finish_next_page(items);
                debug!(%view, page = ticket.page, fetched, has_more = cursor.has_more(), "page appended");
                self.publish(cursor);
                Ok(PageOutcome::Loaded {
                    page: ticket.page,
                    fetched,
                    has_more: cursor.has_more(),
                })
            }
            Err(e) => {
                cursor.rollback_next_page(&ticket);
                warn!(%view, page = ticket.page, restored = cursor.page(), error = %e, "next page failed");
                self.publish(cursor);
                Err(e)
            }
        }
    }

    /// Change the filter of `view`; always restarts from page 1
    pub async fn set_filter(&self, view: View, filter: impl Into<String>) -> Result<PageOutcome> {
        self.load_first_page(view, filter).await
    }

    /// The top of `view` changed: reload now if visible, otherwise later
    pub async fn invalidate(&self, view: View) -> Result<PageOutcome> {
        if self.session.active_view() != view {
            self.mark_stale(view);
            return Ok(PageOutcome::MarkedStale);
        }

        let filter = self.filter_of(view);
        if view == View::Search && filter.is_empty() {
            return Ok(PageOutcome::Skipped);
        }
        self.load_first_page(view, filter).await
    }

    /// Flag `view` for reload on its next activation
    pub fn mark_stale(&self, view: View) {
        let mut cursors = self.cursors.lock();
        let cursor = cursors
            .entry(view)
            .or_insert_with(|| FeedCursor::new(view, self.page_size));
        cursor.mark_stale();
        debug!(%view, "view marked stale");
        self.publish(cursor);
    }

    /// Make `view` the active view, reloading page 1 if it is stale or was never loaded
    pub async fn activate(&self, view: View) -> Result<PageOutcome> {
        if view.requires_auth() && !self.session.is_signed_in() {
            return Err(SyncError::AuthRequired);
        }
        self.session.set_active_view(view);

        let (needs_reload, filter) = match self.cursors.lock().get(&view) {
            Some(cursor) => (
                cursor.is_stale() || (!cursor.is_loaded() && !cursor.is_busy()),
                cursor.filter().to_string(),
            ),
            None => (true, String::new()),
        };

        if !needs_reload || (view == View::Search && filter.is_empty()) {
            return Ok(PageOutcome::Skipped);
        }
        info!(%view, "activating view, reloading first page");
        self.load_first_page(view, filter).await
    }

    fn filter_of(&self, view: View) -> String {
        self.cursors
            .lock()
            .get(&view)
            .map(|c| c.filter().to_string())
            .unwrap_or_default()
    }

    fn publish(&self, cursor: &FeedCursor) {
        let _ = self.events.send(ClientEvent::FeedUpdated(cursor.snapshot()));
    }
}

impl LocalFlagStore for FeedCursorController {
    fn saved_flag(&self, entity_id: &str) -> Option<bool> {
        self.cursors
            .lock()
            .values()
            .find_map(|cursor| cursor.saved(entity_id))
    }

    fn set_saved_flag(&self, entity_id: &str, saved: bool) -> Option<bool> {
        let mut cursors = self.cursors.lock();
        let mut previous = None;
        for view in View::ALL {
            let Some(cursor) = cursors.get_mut(&view) else {
                continue;
            };
            if let Some(before) = cursor.set_saved(entity_id, saved) {
                previous.get_or_insert(before);
                self.publish(cursor);
            }
        }
        previous
    }
}
