//! Live journey feed client.
//!
//! [`JourneyFeedClient`] keeps one subscription per journey id, pulls raw
//! messages from a [`Transport`], and folds them into a [`JourneyState`]
//! that never moves backwards short of a route change. Readers get the last
//! applied state through [`JourneyFeedClient::get_snapshot`] without
//! touching the network.

mod backoff;
mod diagnostics;
mod subscription;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::StreamExt;

use crate::{
    api::API,
    config::BackoffConfig,
    entities::{CoordinateUpdate, JourneyState, Outcome, Route, StartJourneyRequest},
    error::{
        invalid_input_error, invalid_journey_id_error, not_found_error, transport_lost_error, Error,
    },
    transport::Transport,
};

pub use backoff::Backoff;
pub use diagnostics::Diagnostics;
pub use subscription::SubscriptionHandle;

use diagnostics::Counters;
use subscription::Subscription;

/// Messages applied together when they are already queued on wake-up.
const MAX_BATCH: usize = 64;

struct Entry {
    state: JourneyState,
    subscription: Arc<Subscription>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    backoff: BackoffConfig,
    journeys: RwLock<HashMap<String, Entry>>,
    counters: Counters,
    next_id: AtomicU64,
}

#[derive(Clone)]
pub struct JourneyFeedClient {
    inner: Arc<Inner>,
}

impl JourneyFeedClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_backoff(transport, BackoffConfig::default())
    }

    pub fn with_backoff(transport: Arc<dyn Transport>, backoff: BackoffConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                backoff,
                journeys: RwLock::new(HashMap::new()),
                counters: Counters::default(),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Starts receiving updates for `journey_id`. Subscribing again to the
    /// same journey replaces the previous subscription and keeps the state
    /// applied so far.
    ///
    /// Must be called from within a tokio runtime. Callbacks may call back
    /// into the client, including unsubscribing their own handle.
    #[tracing::instrument(skip(self, on_update, on_error))]
    pub fn subscribe<U, E>(
        &self,
        journey_id: &str,
        on_update: U,
        on_error: E,
    ) -> Result<SubscriptionHandle, Error>
    where
        U: Fn(JourneyState) + Send + Sync + 'static,
        E: Fn(Error) + Send + Sync + 'static,
    {
        self.open(journey_id, |_| (), on_update, on_error)
    }

    /// Registers the subscription, runs `seed` on the journey's state under
    /// the same write, then starts delivery.
    fn open<U, E>(
        &self,
        journey_id: &str,
        seed: impl FnOnce(&mut JourneyState),
        on_update: U,
        on_error: E,
    ) -> Result<SubscriptionHandle, Error>
    where
        U: Fn(JourneyState) + Send + Sync + 'static,
        E: Fn(Error) + Send + Sync + 'static,
    {
        if journey_id.trim().is_empty() {
            return Err(invalid_journey_id_error());
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let subscription = Arc::new(Subscription::new(
            id,
            journey_id,
            Box::new(on_update),
            Box::new(on_error),
        ));

        let replaced = {
            let mut journeys = self.inner.write();
            let entry = journeys
                .entry(journey_id.to_string())
                .or_insert_with(|| Entry {
                    state: JourneyState::new(journey_id),
                    subscription: subscription.clone(),
                });

            seed(&mut entry.state);

            if entry.subscription.id == id {
                None
            } else {
                Some(std::mem::replace(&mut entry.subscription, subscription.clone()))
            }
        };

        if let Some(old) = replaced {
            tracing::info!("subscription {} replaces {}", id, old.id);
            old.close();
        }

        let task = tokio::spawn(run(self.inner.clone(), subscription.clone()));
        subscription.set_task(task);

        tracing::info!("subscribed to journey {} as {}", journey_id, id);

        Ok(subscription.handle())
    }

    /// Stops delivery for `handle` and drops the journey's state. Inert
    /// handles are ignored.
    #[tracing::instrument(skip(self))]
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let removed = {
            let mut journeys = self.inner.write();
            let live = journeys
                .get(&handle.journey_id)
                .map_or(false, |entry| entry.subscription.id == handle.id);

            if live {
                journeys
                    .remove(&handle.journey_id)
                    .map(|entry| entry.subscription)
            } else {
                None
            }
        };

        match removed {
            Some(subscription) => {
                subscription.close();
                tracing::info!("unsubscribed from journey {}", handle.journey_id);
            }
            None => tracing::debug!("handle {} already inert", handle.id),
        }
    }

    pub fn get_snapshot(&self, journey_id: &str) -> Result<JourneyState, Error> {
        self.inner
            .read()
            .get(journey_id)
            .map(|entry| entry.state.clone())
            .ok_or_else(|| not_found_error(journey_id))
    }

    /// Associates a loaded route with a subscribed journey.
    #[tracing::instrument(skip(self, route), fields(route_id = %route.id))]
    pub fn attach_route(&self, journey_id: &str, route: Route) -> Result<(), Error> {
        let mut journeys = self.inner.write();
        let entry = journeys
            .get_mut(journey_id)
            .ok_or_else(|| not_found_error(journey_id))?;

        entry.state.attach_route(Arc::new(route));

        Ok(())
    }

    /// Pushes one raw message through the same path as transport
    /// deliveries.
    #[tracing::instrument(skip(self, raw))]
    pub fn ingest(&self, raw: &str) -> Result<Outcome, Error> {
        let update = CoordinateUpdate::parse(raw).map_err(|err| {
            self.inner.counters.record_malformed();
            tracing::warn!("rejecting update: {}", err);
            err
        })?;

        let subscription = self
            .inner
            .read()
            .get(&update.journey_id)
            .map(|entry| entry.subscription.clone());

        let subscription = match subscription {
            Some(subscription) => subscription,
            None => {
                self.inner.counters.record_orphaned();
                return Err(not_found_error(&update.journey_id));
            }
        };

        self.inner
            .deliver(&subscription, &[update])
            .into_iter()
            .next()
            .ok_or_else(|| not_found_error(&subscription.journey_id))
    }

    /// Sends the start request, loads the route if one is named, and
    /// subscribes to the new journey. The requested speed and the route are
    /// in place before the first update can arrive.
    #[tracing::instrument(skip(self, api, on_update, on_error))]
    pub async fn track<U, E>(
        &self,
        api: &dyn API,
        request: StartJourneyRequest,
        on_update: U,
        on_error: E,
    ) -> Result<SubscriptionHandle, Error>
    where
        U: Fn(JourneyState) + Send + Sync + 'static,
        E: Fn(Error) + Send + Sync + 'static,
    {
        if request.journey_id.trim().is_empty() {
            return Err(invalid_journey_id_error());
        }

        if !request.speed_meters_per_second.is_finite() || request.speed_meters_per_second < 0.0 {
            return Err(invalid_input_error(format!(
                "speed_meters_per_second {} is negative",
                request.speed_meters_per_second
            )));
        }

        api.start_journey(&request).await?;

        let route = match &request.route_id {
            Some(route_id) => Some(api.find_route(route_id).await?),
            None => None,
        };

        let speed = request.speed_meters_per_second;

        self.open(
            &request.journey_id,
            move |state| {
                state.speed_meters_per_second = speed;
                if let Some(route) = route {
                    state.attach_route(Arc::new(route));
                }
            },
            on_update,
            on_error,
        )
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.inner.counters.snapshot()
    }

    pub fn journey_ids(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// Unsubscribes every journey.
    pub fn dispose(&self) {
        let entries: Vec<Entry> = self.inner.write().drain().map(|(_, entry)| entry).collect();

        for entry in entries {
            entry.subscription.close();
        }

        tracing::info!("journey feed client disposed");
    }
}

impl Inner {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.journeys.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.journeys.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn parse_for(&self, subscription: &Subscription, raw: &str) -> Option<CoordinateUpdate> {
        match CoordinateUpdate::parse(raw) {
            Ok(update) if update.journey_id == subscription.journey_id => Some(update),
            Ok(update) => {
                self.counters.record_orphaned();
                tracing::warn!(
                    "connection for {} delivered an update for {}",
                    subscription.journey_id,
                    update.journey_id
                );
                None
            }
            Err(err) => {
                self.counters.record_malformed();
                tracing::warn!("rejecting update for {}: {}", subscription.journey_id, err);
                None
            }
        }
    }

    /// Applies `updates` in order and notifies the subscriber once with the
    /// final state if anything was applied. Returns nothing when the
    /// subscription is no longer the journey's live one.
    fn deliver(&self, subscription: &Subscription, updates: &[CoordinateUpdate]) -> Vec<Outcome> {
        subscription
            .gated(|| {
                let (outcomes, changed) = {
                    let mut journeys = self.write();

                    let entry = match journeys.get_mut(&subscription.journey_id) {
                        Some(entry) if entry.subscription.id == subscription.id => entry,
                        _ => return vec![],
                    };

                    let outcomes: Vec<Outcome> =
                        updates.iter().map(|update| entry.state.apply(update)).collect();
                    let changed = outcomes
                        .iter()
                        .any(Outcome::is_applied)
                        .then(|| entry.state.clone());

                    (outcomes, changed)
                };

                for (update, outcome) in updates.iter().zip(outcomes.iter()) {
                    self.counters.record(*outcome);

                    match outcome {
                        Outcome::Applied | Outcome::Duplicate => (),
                        Outcome::RouteChanged => tracing::info!(
                            "journey {} changed route, now {} waypoints",
                            update.journey_id,
                            update.total_waypoints
                        ),
                        Outcome::Stale | Outcome::Regressed => tracing::debug!(
                            "dropped {:?} update for {} at {}",
                            outcome,
                            update.journey_id,
                            update.timestamp
                        ),
                    }
                }

                if let Some(state) = changed {
                    tracing::debug!(
                        "journey {} is {} at {}%",
                        state.journey_id,
                        state.status.name(),
                        state.progress_percentage
                    );
                    subscription.notify(state);
                }

                outcomes
            })
            .unwrap_or_default()
    }
}

/// Delivery loop of one subscription: connect, drain, reconnect with
/// backoff, until the subscription is closed.
async fn run(inner: Arc<Inner>, subscription: Arc<Subscription>) {
    let mut backoff = Backoff::new(inner.backoff);
    let mut reconnecting = false;

    while subscription.is_alive() {
        match inner.transport.connect(&subscription.journey_id).await {
            Ok(connection) => {
                if reconnecting {
                    inner.counters.record_reconnect();
                    tracing::info!("reconnected to journey {}", subscription.journey_id);
                }

                let batches = connection.ready_chunks(MAX_BATCH);
                futures::pin_mut!(batches);

                while let Some(batch) = batches.next().await {
                    backoff.reset();

                    let updates: Vec<CoordinateUpdate> = batch
                        .iter()
                        .filter_map(|raw| inner.parse_for(&subscription, raw))
                        .collect();

                    if !updates.is_empty() {
                        inner.deliver(&subscription, &updates);
                    }

                    if !subscription.is_alive() {
                        return;
                    }
                }

                tracing::warn!("connection for journey {} closed", subscription.journey_id);
                subscription.report(transport_lost_error("connection closed"));
            }
            Err(err) => {
                tracing::warn!("connecting to journey {} failed: {}", subscription.journey_id, err);
                subscription.report(transport_lost_error(err.message));
            }
        }

        reconnecting = true;

        let delay = backoff.next_delay();
        tracing::debug!("reconnecting to journey {} in {:?}", subscription.journey_id, delay);
        tokio::time::sleep(delay).await;
    }
}
