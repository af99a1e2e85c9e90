//! Transport seam for the push channel

use crate::error::Result;
use async_trait::async_trait;

/// Establishes push-channel connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new channel authenticated with the bearer `token`
    async fn connect(&self, token: &str) -> Result<Box<dyn ChannelStream>>;
}

/// One established push-channel connection
#[async_trait]
pub trait ChannelStream: Send {
    /// Next inbound text frame
    ///
    /// `None` means the peer closed the channel; `Some(Err(_))` is a
    /// transport failure. Either ends this connection.
    async fn next_frame(&mut self) -> Option<Result<String>>;

    /// Close the channel from our side
    async fn close(&mut self) -> Result<()>;
}
