use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of the gateway's start-journey call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartJourneyRequest {
    pub journey_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    pub speed_meters_per_second: f64,
}

impl StartJourneyRequest {
    pub fn new(route_id: Option<String>, speed_meters_per_second: f64) -> Self {
        Self {
            journey_id: Uuid::new_v4().to_string(),
            route_id,
            speed_meters_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_id_is_omitted_when_absent() {
        let request = StartJourneyRequest::new(None, 13.9);
        let body = serde_json::to_value(&request).unwrap();

        assert!(body.get("route_id").is_none());
        assert_eq!(body["speed_meters_per_second"], 13.9);
        assert!(Uuid::parse_str(&request.journey_id).is_ok());
    }
}
