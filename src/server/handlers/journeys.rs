use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};

use crate::entities::{JourneyState, StartJourneyRequest};
use crate::error::Error;
use crate::feed::{Diagnostics, JourneyFeedClient};
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    journey_id: Option<String>,
    route_id: Option<String>,
    speed_meters_per_second: f64,
}

#[derive(Serialize)]
pub struct Snapshot {
    #[serde(flatten)]
    state: JourneyState,
    remaining_distance_meters: Option<f64>,
}

impl From<JourneyState> for Snapshot {
    fn from(state: JourneyState) -> Self {
        Self {
            remaining_distance_meters: state.remaining_distance_meters(),
            state,
        }
    }
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Extension(client): Extension<JourneyFeedClient>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Snapshot>, Error> {
    let mut request = StartJourneyRequest::new(params.route_id, params.speed_meters_per_second);
    if let Some(journey_id) = params.journey_id {
        request.journey_id = journey_id;
    }

    let handle = client
        .track(
            api.as_ref(),
            request,
            |state| {
                tracing::info!(
                    "journey {} {} {}%",
                    state.journey_id,
                    state.status.name(),
                    state.progress_percentage
                )
            },
            |err| tracing::warn!("journey feed error: {}", err),
        )
        .await?;

    Ok(Snapshot::from(client.get_snapshot(handle.journey_id())?).into())
}

pub async fn find(
    Extension(client): Extension<JourneyFeedClient>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, Error> {
    let state = client.get_snapshot(&id)?;

    Ok(Snapshot::from(state).into())
}

pub async fn diagnostics(Extension(client): Extension<JourneyFeedClient>) -> Json<Diagnostics> {
    client.diagnostics().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_flattens_state() {
        let body = serde_json::to_value(Snapshot::from(JourneyState::new("J1"))).unwrap();

        assert_eq!(body["journey_id"], "J1");
        assert_eq!(body["status"], "NOT_STARTED");
        assert!(body["remaining_distance_meters"].is_null());
    }
}
