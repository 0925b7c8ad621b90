use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::{Route, StartJourneyRequest};
use crate::error::Error;

#[async_trait]
pub trait RouteAPI: Send + Sync {
    async fn find_route(&self, id: &str) -> Result<Route, Error>;
}

#[async_trait]
pub trait JourneyAPI: Send + Sync {
    async fn start_journey(&self, request: &StartJourneyRequest) -> Result<(), Error>;
}

/// Backend gateway as seen by the feed client.
pub trait API: RouteAPI + JourneyAPI {}

pub type DynAPI = Arc<dyn API>;
