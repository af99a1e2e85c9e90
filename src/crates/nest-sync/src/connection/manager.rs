//! Async driver for the connection state machine

use super::machine::{validate_token, ConnectionMachine, ConnectionSnapshot, ConnectionState, FailureOutcome};
use super::transport::{ChannelStream, Transport};
use crate::backoff::BackoffPolicy;
use crate::error::{Result, SyncError};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const FRAME_BUFFER: usize = 256;
const EVENT_BUFFER: usize = 64;

/// Raw inbound frame, tagged with the connection epoch it arrived on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Epoch of the connection that delivered the frame
    pub epoch: u64,
    /// Payload exactly as received
    pub payload: String,
}

/// Notifications published by the connection manager
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The state machine moved
    StateChanged(ConnectionSnapshot),
    /// Reconnecting was abandoned; only an explicit `open()` retries
    Fatal(SyncError),
}

#[derive(Debug)]
enum Command {
    Open(String),
    Close,
}

/// Owns one push-channel connection at a time and keeps it alive
///
/// Frames are delivered in arrival order on the receiver returned by
/// [`ConnectionManager::spawn`]. Dropping the manager shuts the driver task
/// down and closes any open channel.
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionSnapshot>,
    events: broadcast::Sender<ConnectionEvent>,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    /// Start the driver task; must be called from within a tokio runtime
    pub fn spawn(
        transport: Arc<dyn Transport>,
        policy: BackoffPolicy,
    ) -> (Self, mpsc::Receiver<InboundFrame>) {
        let machine = ConnectionMachine::new(policy);
        let (state_tx, state_rx) = watch::channel(machine.snapshot());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let driver = Driver {
            machine,
            transport,
            stream: None,
            commands: command_rx,
            frames: frame_tx,
            state: state_tx,
            events: events.clone(),
        };
        let task = tokio::spawn(driver.run());

        let manager = Self {
            commands: command_tx,
            state: state_rx,
            events,
            task,
        };
        (manager, frame_rx)
    }

    /// Connect with the bearer `token`
    ///
    /// Fails with [`SyncError::AuthRequired`] when the token is absent or
    /// blank; nothing is attempted in that case.
    pub fn open(&self, token: Option<&str>) -> Result<()> {
        let token = validate_token(token)?;
        self.commands
            .send(Command::Open(token.to_string()))
            .map_err(|_| SyncError::ChannelClosed)
    }

    /// Close the channel and cancel any pending reconnect
    pub fn close(&self) -> Result<()> {
        self.commands
            .send(Command::Close)
            .map_err(|_| SyncError::ChannelClosed)
    }

    /// Current connection snapshot
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that always holds the latest snapshot
    pub fn watch_state(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.state.clone()
    }

    /// Subscribe to state transitions and fatal notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Stop the driver task and wait for it to close the channel
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            warn!(error = %e, "connection driver task ended abnormally");
        }
    }
}

enum Step {
    Command(Option<Command>),
    Connected(Result<Box<dyn ChannelStream>>),
    Frame(Option<Result<String>>),
    TimerFired,
}

struct Driver {
    machine: ConnectionMachine,
    transport: Arc<dyn Transport>,
    stream: Option<Box<dyn ChannelStream>>,
    commands: mpsc::UnboundedReceiver<Command>,
    frames: mpsc::Sender<InboundFrame>,
    state: watch::Sender<ConnectionSnapshot>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let step = match self.machine.state() {
                ConnectionState::Idle => Step::Command(self.commands.recv().await),
                ConnectionState::Connecting => {
                    let token = self.machine.token().unwrap_or_default().to_string();
                    tokio::select! {
                        biased;
                        cmd = self.commands.recv() => Step::Command(cmd),
                        res = self.transport.connect(&token) => Step::Connected(res),
                    }
                }
                ConnectionState::Open => match self.stream.as_mut() {
                    Some(stream) => tokio::select! {
                        biased;
                        cmd = self.commands.recv() => Step::Command(cmd),
                        frame = stream.next_frame() => Step::Frame(frame),
                    },
                    None => Step::Frame(None),
                },
                ConnectionState::Backoff => {
                    let delay = self.machine.snapshot().next_delay;
                    tokio::select! {
                        biased;
                        cmd = self.commands.recv() => Step::Command(cmd),
                        _ = tokio::time::sleep(delay) => Step::TimerFired,
                    }
                }
                ConnectionState::Closing => {
                    self.drop_stream().await;
                    self.machine.closed();
                    info!("push channel closed");
                    self.publish();
                    continue;
                }
            };

            if !self.handle(step).await {
                break;
            }
        }

        self.drop_stream().await;
        debug!("connection driver stopped");
    }

    async fn handle(&mut self, step: Step) -> bool {
        match step {
            Step::Command(None) => return false,
            Step::Command(Some(Command::Open(token))) => {
                self.drop_stream().await;
                match self.machine.open(Some(&token)) {
                    Ok(epoch) => info!(epoch, "opening push channel"),
                    Err(e) => warn!(error = %e, "push channel open rejected"),
                }
                self.publish();
            }
            Step::Command(Some(Command::Close)) => {
                if self.machine.close() {
                    info!("closing push channel");
                    self.publish();
                }
            }
            Step::Connected(Ok(stream)) => {
                self.stream = Some(stream);
                if self.machine.established() {
                    info!(epoch = self.machine.snapshot().epoch, "push channel open");
                    self.publish();
                }
            }
            Step::Connected(Err(e)) => self.on_failure(&e),
            Step::Frame(Some(Ok(payload))) => {
                let frame = InboundFrame {
                    epoch: self.machine.snapshot().epoch,
                    payload,
                };
                if self.frames.send(frame).await.is_err() {
                    debug!("frame receiver dropped; discarding frame");
                }
            }
            Step::Frame(Some(Err(e))) => {
                self.stream = None;
                self.on_failure(&e);
            }
            Step::Frame(None) => {
                self.stream = None;
                self.on_failure(&SyncError::Network("closed by server".to_string()));
            }
            Step::TimerFired => {
                if let Some(epoch) = self.machine.timer_fired() {
                    debug!(epoch, attempt = self.machine.snapshot().attempt, "reconnecting push channel");
                    self.publish();
                }
            }
        }
        true
    }

    fn on_failure(&mut self, reason: &SyncError) {
        match self.machine.failed() {
            FailureOutcome::Reconnect { attempt, delay } => {
                warn!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %reason,
                    "push channel lost, reconnect scheduled"
                );
                self.publish();
            }
            FailureOutcome::Exhausted { attempts } => {
                error!(attempts, error = %reason, "push channel reconnect budget exhausted");
                self.publish();
                let _ = self
                    .events
                    .send(ConnectionEvent::Fatal(SyncError::MaxReconnectExceeded { attempts }));
            }
            FailureOutcome::Ignored => {
                debug!(state = %self.machine.state(), error = %reason, "ignoring stale failure");
            }
        }
    }

    async fn drop_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close().await {
                debug!(error = %e, "error while closing push channel");
            }
        }
    }

    fn publish(&self) {
        let snapshot = self.machine.snapshot();
        self.state.send_replace(snapshot.clone());
        let _ = self.events.send(ConnectionEvent::StateChanged(snapshot));
    }
}
