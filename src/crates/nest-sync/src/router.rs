//! Push event routing

use crate::decoder::ChannelEvent;
use crate::error::Result;
use crate::events::ClientEvent;
use crate::feed::{FeedCursorController, PageOutcome, View};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// What routing an event caused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The feed was on screen and has been reloaded
    Refreshed(PageOutcome),
    /// The feed was off screen and will reload on activation
    MarkedStale,
}

/// Decides which view a push event affects
///
/// Push notifications only ever describe the main feed; search, saved and
/// personalized views are left alone.
pub struct EventRouter {
    feed: Arc<FeedCursorController>,
    events: broadcast::Sender<ClientEvent>,
}

impl EventRouter {
    /// Create a router notifying `feed`
    pub fn new(feed: Arc<FeedCursorController>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self { feed, events }
    }

    /// Deliver `event`; `active_view` is read by the caller at dispatch time
    pub async fn route(&self, event: &ChannelEvent, active_view: View) -> Result<RouteOutcome> {
        self.announce(event);
        self.refresh(event.kind(), active_view).await
    }

    /// Deliver a burst of queued events with a single refresh
    ///
    /// Every event is still announced. Returns `None` for an empty burst.
    pub async fn route_all(
        &self,
        events: &[ChannelEvent],
        active_view: View,
    ) -> Result<Option<RouteOutcome>> {
        let Some(last) = events.last() else {
            return Ok(None);
        };
        for event in events {
            self.announce(event);
        }
        if events.len() > 1 {
            debug!(count = events.len(), "coalescing queued push events");
        }
        self.refresh(last.kind(), active_view).await.map(Some)
    }

    fn announce(&self, event: &ChannelEvent) {
        let _ = self.events.send(ClientEvent::Announcement(event.headline()));
    }

    async fn refresh(&self, kind: &str, active_view: View) -> Result<RouteOutcome> {
        if active_view == View::Feed {
            debug!(kind, "feed on screen, refreshing");
            let outcome = self.feed.invalidate(View::Feed).await?;
            Ok(match outcome {
                PageOutcome::MarkedStale => RouteOutcome::MarkedStale,
                other => RouteOutcome::Refreshed(other),
            })
        } else {
            debug!(kind, %active_view, "feed off screen, marking stale");
            self.feed.mark_stale(View::Feed);
            Ok(RouteOutcome::MarkedStale)
        }
    }
}
