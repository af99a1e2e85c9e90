//! Connection state machine

use crate::backoff::BackoffPolicy;
use crate::error::{Result, SyncError};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Lifecycle state of the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected and not trying to
    Idle,
    /// A connect attempt is in flight
    Connecting,
    /// Channel established, frames flowing
    Open,
    /// User-initiated shutdown in progress
    Closing,
    /// Waiting out a reconnect delay
    Backoff,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Backoff => "backoff",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the connection, published on every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSnapshot {
    /// Current state
    pub state: ConnectionState,

    /// Reconnect attempts since the last successful open
    pub attempt: u32,

    /// Delay scheduled (or to be scheduled) before the next reconnect
    pub next_delay: Duration,

    /// Connection generation, bumped on every connect attempt
    pub epoch: u64,

    /// Terminal idle state after the reconnect budget ran out
    pub exhausted: bool,
}

impl ConnectionSnapshot {
    /// Next reconnect delay in milliseconds
    pub fn next_delay_ms(&self) -> u64 {
        u64::try_from(self.next_delay.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether frames are currently flowing
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Whether a "connection lost" indicator should be visible
    pub fn is_degraded(&self) -> bool {
        self.exhausted || (self.state == ConnectionState::Backoff)
    }
}

/// Result of reporting a connection failure to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Wait `delay`, then try again as attempt number `attempt`
    Reconnect {
        /// Attempt number the next connect will be
        attempt: u32,
        /// Delay before that attempt
        delay: Duration,
    },
    /// Budget exhausted; the machine is in terminal idle
    Exhausted {
        /// Attempts made before giving up
        attempts: u32,
    },
    /// The failure does not apply to the current state
    Ignored,
}

/// Reject absent or blank bearer tokens
pub(crate) fn validate_token(token: Option<&str>) -> Result<&str> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(SyncError::AuthRequired)
}

/// Reconnect state machine for the push channel
///
/// Transitions:
///
/// ```text
/// Idle -> Connecting -> Open -> Backoff -> Connecting -> ... -> Open
///                                      \-> Idle (exhausted)
/// Connecting | Open | Backoff -> Closing -> Idle
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    policy: BackoffPolicy,
    state: ConnectionState,
    attempt: u32,
    next_delay: Duration,
    epoch: u64,
    exhausted: bool,
    token: Option<String>,
}

impl ConnectionMachine {
    /// Create an idle machine
    pub fn new(policy: BackoffPolicy) -> Self {
        let next_delay = policy.base_delay;
        Self {
            policy,
            state: ConnectionState::Idle,
            attempt: 0,
            next_delay,
            epoch: 0,
            exhausted: false,
            token: None,
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Snapshot for publishing
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            state: self.state,
            attempt: self.attempt,
            next_delay: self.next_delay,
            epoch: self.epoch,
            exhausted: self.exhausted,
        }
    }

    /// Credential used for connect attempts
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Backoff policy in use
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Start connecting with `token`, returning the new epoch
    ///
    /// Opening while already connecting or open restarts with the new
    /// credential. The attempt counter is left alone: it only resets once a
    /// connection actually opens, so an open after a close (logout then
    /// login) continues with whatever reconnect budget is left until that
    /// connection is established.
    pub fn open(&mut self, token: Option<&str>) -> Result<u64> {
        let token = validate_token(token)?;
        self.token = Some(token.to_string());
        self.exhausted = false;
        Ok(self.begin_connect())
    }

    /// The transport reported a successful connect
    pub fn established(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            return false;
        }
        self.state = ConnectionState::Open;
        self.attempt = 0;
        self.next_delay = self.policy.base_delay;
        true
    }

    /// The connect attempt failed or an open channel dropped
    pub fn failed(&mut self) -> FailureOutcome {
        if !matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            return FailureOutcome::Ignored;
        }

        if !self.policy.allows(self.attempt) {
            self.state = ConnectionState::Idle;
            self.exhausted = true;
            return FailureOutcome::Exhausted {
                attempts: self.attempt,
            };
        }

        self.attempt += 1;
        self.next_delay = self.policy.delay_for(self.attempt);
        self.state = ConnectionState::Backoff;
        FailureOutcome::Reconnect {
            attempt: self.attempt,
            delay: self.next_delay,
        }
    }

    /// The backoff delay elapsed; returns the new epoch if a reconnect starts
    pub fn timer_fired(&mut self) -> Option<u64> {
        if self.state != ConnectionState::Backoff {
            return None;
        }
        Some(self.begin_connect())
    }

    /// User-initiated close; returns false when there is nothing to close
    ///
    /// Bumps the epoch so frames still queued from the closed connection
    /// are recognised as stale.
    pub fn close(&mut self) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Backoff => {
                self.state = ConnectionState::Closing;
                self.token = None;
                self.epoch += 1;
                true
            }
            ConnectionState::Idle | ConnectionState::Closing => false,
        }
    }

    /// The channel finished closing
    pub fn closed(&mut self) {
        if self.state == ConnectionState::Closing {
            self.state = ConnectionState::Idle;
        }
    }

    fn begin_connect(&mut self) -> u64 {
        self.epoch += 1;
        self.state = ConnectionState::Connecting;
        self.epoch
    }
}
