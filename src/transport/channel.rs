use async_channel::{Receiver, Sender};
use async_trait::async_trait;

use super::{Connection, Transport};
use crate::error::{transport_lost_error, Error};

/// In-process transport. Every `connect` opens a fresh channel whose sending
/// half is handed to the [`Connections`] side; dropping that sender closes
/// the connection.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    connections: Sender<(String, Sender<String>)>,
}

/// Accepting side of a [`ChannelTransport`].
#[derive(Clone, Debug)]
pub struct Connections {
    incoming: Receiver<(String, Sender<String>)>,
}

impl ChannelTransport {
    pub fn new() -> (Self, Connections) {
        let (connections, incoming) = async_channel::unbounded();

        (Self { connections }, Connections { incoming })
    }
}

impl Connections {
    /// Waits for the next connection and returns its journey id and sender.
    pub async fn accept(&self) -> Option<(String, Sender<String>)> {
        self.incoming.recv().await.ok()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&self, journey_id: &str) -> Result<Connection, Error> {
        let (tx, rx) = async_channel::unbounded();

        self.connections
            .send((journey_id.to_string(), tx))
            .await
            .map_err(|_| transport_lost_error("no acceptor for channel transport"))?;

        Ok(rx)
    }
}
