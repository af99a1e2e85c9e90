//! Running sync session
//!
//! Wires the pipeline `ConnectionManager -> decode -> EventRouter ->
//! FeedCursorController` and the user-facing mutation path together.

use crate::backoff::BackoffPolicy;
use crate::connection::{
    ConnectionEvent, ConnectionManager, ConnectionSnapshot, InboundFrame, Transport,
};
use crate::decoder::decode;
use crate::error::{Result, SyncError};
use crate::events::ClientEvent;
use crate::feed::{ArticleSource, FeedCursorController, DEFAULT_PAGE_SIZE};
use crate::mutation::{MutationCoordinator, SaveRemote};
use crate::router::EventRouter;
use crate::session::SessionContext;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CLIENT_EVENT_BUFFER: usize = 256;

/// Tunables for a sync session
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Reconnect policy for the push channel
    pub backoff: BackoffPolicy,
    /// Articles per page
    pub page_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Collaborators a session talks to
pub struct Collaborators {
    /// Push-channel transport
    pub transport: Arc<dyn Transport>,
    /// Article-listing endpoint
    pub source: Arc<dyn ArticleSource>,
    /// Save/unsave endpoint
    pub remote: Arc<dyn SaveRemote>,
}

/// A signed-in (or anonymous) client session with live feed updates
pub struct SyncSession {
    session: Arc<SessionContext>,
    feed: Arc<FeedCursorController>,
    mutations: Arc<MutationCoordinator>,
    remote: Arc<dyn SaveRemote>,
    connection: ConnectionManager,
    events: broadcast::Sender<ClientEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncSession {
    /// Build the pipeline with a fresh signed-out session and start its background tasks
    ///
    /// Must be called from within a tokio runtime. The push channel stays
    /// idle until [`SyncSession::sign_in`].
    pub fn start(collaborators: Collaborators, options: SyncOptions) -> Self {
        Self::with_session(Arc::new(SessionContext::new()), collaborators, options)
    }

    /// Like [`SyncSession::start`], sharing `session` with other collaborators
    ///
    /// A credential already stored in `session` is not used until
    /// [`SyncSession::reconnect`] is called.
    pub fn with_session(
        session: Arc<SessionContext>,
        collaborators: Collaborators,
        options: SyncOptions,
    ) -> Self {
        let Collaborators {
            transport,
            source,
            remote,
        } = collaborators;

        let (events, _) = broadcast::channel(CLIENT_EVENT_BUFFER);
        let feed = Arc::new(FeedCursorController::new(
            source,
            session.clone(),
            options.page_size,
            events.clone(),
        ));
        let mutations = Arc::new(MutationCoordinator::new(feed.clone(), events.clone()));
        let router = EventRouter::new(feed.clone(), events.clone());

        let (connection, frames) = ConnectionManager::spawn(transport, options.backoff);
        let pump = tokio::spawn(pump_frames(
            frames,
            connection.watch_state(),
            router,
            session.clone(),
        ));
        let forwarder = tokio::spawn(forward_connection_events(
            connection.subscribe(),
            events.clone(),
        ));

        Self {
            session,
            feed,
            mutations,
            remote,
            connection,
            events,
            tasks: vec![pump, forwarder],
        }
    }

    /// Session context (active view, user, credential)
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Feed cursor controller
    pub fn feed(&self) -> &Arc<FeedCursorController> {
        &self.feed
    }

    /// Optimistic mutation coordinator
    pub fn mutations(&self) -> &Arc<MutationCoordinator> {
        &self.mutations
    }

    /// Push-channel manager
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Subscribe to render notifications; drop the receiver to unsubscribe
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Store the credential and open the push channel with it
    pub fn sign_in(&self, user: Option<String>, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SyncError::AuthRequired);
        }
        self.session.sign_in(user, token);
        self.connection.open(Some(token))
    }

    /// Retry the push channel with the stored credential
    pub fn reconnect(&self) -> Result<()> {
        let credential = self.session.credential();
        self.connection.open(credential.as_deref())
    }

    /// Credential revoked (logout or expiry): forget it and close the channel
    pub fn revoke_credential(&self) -> Result<()> {
        if self.session.sign_out().is_some() {
            info!("credential revoked, closing push channel");
        }
        self.connection.close()
    }

    /// Save or unsave an article, optimistically
    pub async fn set_saved(&self, entity_id: &str, desired: bool) -> Result<()> {
        if !self.session.is_signed_in() {
            return Err(SyncError::AuthRequired);
        }

        let remote = self.remote.clone();
        let id = entity_id.to_string();
        self.mutations
            .apply(entity_id, desired, move || async move {
                remote.set_saved(&id, desired).await
            })
            .await
    }

    /// Stop background tasks and close the push channel
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        self.connection.shutdown().await;
    }
}

async fn pump_frames(
    mut frames: mpsc::Receiver<InboundFrame>,
    state: watch::Receiver<ConnectionSnapshot>,
    router: EventRouter,
    session: Arc<SessionContext>,
) {
    while let Some(first) = frames.recv().await {
        // Frames that queued up while the previous refresh ran are handled
        // together: one refresh covers all of them.
        let mut batch = vec![first];
        while let Ok(frame) = frames.try_recv() {
            batch.push(frame);
        }

        let current_epoch = state.borrow().epoch;
        let mut decoded = Vec::with_capacity(batch.len());
        for frame in batch {
            if frame.epoch != current_epoch {
                debug!(frame_epoch = frame.epoch, current_epoch, "dropping frame from old connection");
                continue;
            }
            match decode(&frame.payload) {
                Ok(event) => decoded.push(event),
                Err(failure) => debug!(error = %failure, "dropping undecodable frame"),
            }
        }

        if let Err(e) = router.route_all(&decoded, session.active_view()).await {
            warn!(events = decoded.len(), error = %e, "refresh after push events failed");
        }
    }
    debug!("frame pump stopped");
}

async fn forward_connection_events(
    mut connection: broadcast::Receiver<ConnectionEvent>,
    events: broadcast::Sender<ClientEvent>,
) {
    loop {
        let event = match connection.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "connection events lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let client_event = match event {
            ConnectionEvent::StateChanged(snapshot) => ClientEvent::Connection(snapshot),
            ConnectionEvent::Fatal(error) => ClientEvent::ReconnectFailed(error),
        };
        let _ = events.send(client_event);
    }
}
