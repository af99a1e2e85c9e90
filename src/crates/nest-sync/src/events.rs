//! Notifications for the render layer

use crate::connection::ConnectionSnapshot;
use crate::error::SyncError;
use crate::feed::FeedSnapshot;

/// Everything a view needs to react to, on one broadcast stream
///
/// Subscribers receive events from the moment they subscribe; dropping the
/// receiver unsubscribes.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connection state changed (show or hide the "connection lost" banner)
    Connection(ConnectionSnapshot),

    /// The push channel gave up reconnecting
    ReconnectFailed(SyncError),

    /// A view's items, page or flags changed
    FeedUpdated(FeedSnapshot),

    /// A saved-flag change was confirmed by the server
    MutationCommitted {
        /// Article URL
        entity_id: String,
        /// Confirmed saved flag
        saved: bool,
    },

    /// A saved-flag change was rejected and undone locally
    MutationRolledBack {
        /// Article URL
        entity_id: String,
        /// Flag value after rollback
        saved: bool,
        /// Why the server rejected it
        error: SyncError,
    },

    /// Short text announcing pushed content
    Announcement(String),
}
