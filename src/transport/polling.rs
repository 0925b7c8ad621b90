use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;

use super::{Connection, Transport};
use crate::error::{transport_lost_error, Error};
use crate::external::Gateway;

/// Polls the gateway's position endpoint on a fixed interval.
///
/// Consecutive polls usually return the same message, which the client
/// discards as a duplicate. Any failed poll closes the connection.
#[derive(Clone, Debug)]
pub struct PollingTransport {
    gateway: Gateway,
    interval: Duration,
}

impl PollingTransport {
    pub fn new(gateway: Gateway, interval: Duration) -> Self {
        Self { gateway, interval }
    }
}

#[async_trait]
impl Transport for PollingTransport {
    #[tracing::instrument(skip(self))]
    async fn connect(&self, journey_id: &str) -> Result<Connection, Error> {
        let first = self.gateway.fetch_position(journey_id).await?;

        let (tx, rx) = async_channel::unbounded();
        tx.try_send(first)
            .map_err(|err| transport_lost_error(format!("first position not queued: {}", err)))?;

        let gateway = self.gateway.clone();
        let journey_id = journey_id.to_string();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if tx.is_closed() {
                    break;
                }

                match gateway.fetch_position(&journey_id).await {
                    Ok(body) => {
                        if tx.send(body).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("polling {} failed: {}", journey_id, err);
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}
