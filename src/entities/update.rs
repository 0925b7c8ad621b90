use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Coordinate, JourneyStatus};
use crate::error::{malformed_update_error, Error};

/// Position of an update in a journey's stream. Timestamps order updates,
/// `sequence` only breaks ties between equal timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderingKey {
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

/// One message of the live position feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateUpdate {
    pub journey_id: String,
    pub coordinate: Coordinate,
    pub progress_percentage: f64,
    pub status: JourneyStatus,
    pub current_waypoint_index: usize,
    pub total_waypoints: usize,
    pub timestamp: DateTime<Utc>,
    /// Defaults to 0 when absent.
    #[serde(default)]
    pub sequence: u64,
    /// When absent the previously reported speed is kept.
    #[serde(default)]
    pub speed_meters_per_second: Option<f64>,
}

impl CoordinateUpdate {
    /// Parses and validates a raw feed message.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let update: CoordinateUpdate = serde_json::from_str(raw)?;
        update.validate()?;

        Ok(update)
    }

    pub fn key(&self) -> OrderingKey {
        OrderingKey {
            timestamp: self.timestamp,
            sequence: self.sequence,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.journey_id.trim().is_empty() {
            return Err(malformed_update_error("empty journey_id"));
        }

        if !self.coordinate.is_valid() {
            return Err(malformed_update_error(format!(
                "coordinate out of range: {:?}",
                self.coordinate
            )));
        }

        if !(0.0..=100.0).contains(&self.progress_percentage) {
            return Err(malformed_update_error(format!(
                "progress_percentage {} outside 0..100",
                self.progress_percentage
            )));
        }

        if self.current_waypoint_index > self.total_waypoints {
            return Err(malformed_update_error(format!(
                "current_waypoint_index {} exceeds total_waypoints {}",
                self.current_waypoint_index, self.total_waypoints
            )));
        }

        match self.speed_meters_per_second {
            Some(speed) if !speed.is_finite() || speed < 0.0 => Err(malformed_update_error(
                format!("speed_meters_per_second {} is negative", speed),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn raw(overrides: serde_json::Value) -> String {
        let mut message = json!({
            "journey_id": "J1",
            "coordinate": { "latitude": 3.139, "longitude": 101.6869 },
            "progress_percentage": 42.5,
            "status": "IN_PROGRESS",
            "current_waypoint_index": 4,
            "total_waypoints": 10,
            "timestamp": "2024-05-01T08:00:00Z"
        });

        for (key, value) in overrides.as_object().unwrap() {
            message[key] = value.clone();
        }

        message.to_string()
    }

    #[test]
    fn optional_fields_take_their_defaults() {
        let update = CoordinateUpdate::parse(&raw(json!({}))).unwrap();

        assert_eq!(update.sequence, 0);
        assert_eq!(update.speed_meters_per_second, None);
        assert_eq!(update.status, JourneyStatus::InProgress);
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let err = CoordinateUpdate::parse(r#"{"journey_id":"J1"}"#).unwrap_err();

        assert_eq!(err.kind, ErrorKind::MalformedUpdate);
    }

    #[test]
    fn out_of_range_values_are_malformed() {
        for overrides in [
            json!({ "progress_percentage": 101.0 }),
            json!({ "current_waypoint_index": 11 }),
            json!({ "coordinate": { "latitude": 95.0, "longitude": 0.0 } }),
            json!({ "status": "DRIFTING" }),
            json!({ "timestamp": "yesterday" }),
            json!({ "journey_id": "  " }),
            json!({ "speed_meters_per_second": -3.0 }),
        ] {
            let err = CoordinateUpdate::parse(&raw(overrides.clone())).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedUpdate, "{}", overrides);
        }
    }

    #[test]
    fn sequence_breaks_timestamp_ties() {
        let first = CoordinateUpdate::parse(&raw(json!({ "sequence": 1 }))).unwrap();
        let second = CoordinateUpdate::parse(&raw(json!({ "sequence": 2 }))).unwrap();
        let later = CoordinateUpdate::parse(&raw(json!({ "timestamp": "2024-05-01T08:00:01Z" }))).unwrap();

        assert!(first.key() < second.key());
        assert!(second.key() < later.key());
    }
}
