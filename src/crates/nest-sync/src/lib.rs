//! Real-time feed synchronization core for the News Nest client
//!
//! The crate keeps a reconnecting push channel alive and turns its frames
//! into refreshes of paginated, optimistically-mutated feed views. It does
//! no I/O of its own: the push transport, the article listing endpoint and
//! the save/unsave endpoint are reached through traits that the application
//! crate implements.
//!
//! # Modules
//!
//! - `backoff` - Exponential reconnect delay policy
//! - `connection` - Push-channel state machine and its async driver
//! - `decoder` - Raw frame to typed [`ChannelEvent`] decoding
//! - `feed` - Per-view pagination cursors and the controller that owns them
//! - `mutation` - Optimistic saved-flag updates with rollback
//! - `router` - Push event to feed invalidation routing
//! - `session` - Active view, signed-in user and credential
//! - `sync` - Wiring of all of the above into one running session

pub mod article;
pub mod backoff;
pub mod connection;
pub mod decoder;
pub mod error;
pub mod events;
pub mod feed;
pub mod mutation;
pub mod router;
pub mod session;
pub mod sync;

pub use article::{Article, ArticleSummary};
pub use backoff::BackoffPolicy;
pub use connection::{
    ChannelStream, ConnectionEvent, ConnectionMachine, ConnectionManager, ConnectionSnapshot,
    ConnectionState, FailureOutcome, InboundFrame, Transport,
};
pub use decoder::{decode, ChannelEvent, DecodeFailure};
pub use error::{Result, SyncError};
pub use events::ClientEvent;
pub use feed::{ArticleSource, FeedCursor, FeedCursorController, FeedSnapshot, PageOutcome, View};
pub use mutation::{LocalFlagStore, MutationCoordinator, MutationIntent, SaveRemote};
pub use router::{EventRouter, RouteOutcome};
pub use session::SessionContext;
pub use sync::{Collaborators, SyncOptions, SyncSession};
