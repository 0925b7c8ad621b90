//! Delivery of raw feed messages.
//!
//! A transport hands out one connection per journey. Messages on a
//! connection may arrive duplicated or out of order; the connection closing
//! means the transport was lost and the client will reconnect.

mod channel;
mod polling;

use async_trait::async_trait;

use crate::error::Error;

pub use channel::{ChannelTransport, Connections};
pub use polling::PollingTransport;

pub type Connection = async_channel::Receiver<String>;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, journey_id: &str) -> Result<Connection, Error>;
}
