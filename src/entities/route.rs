use serde::{Deserialize, Serialize};

use crate::entities::Coordinate;
use crate::error::{upstream_error, Error};

/// Route as returned by the gateway's route endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_point: Coordinate,
    pub end_point: Coordinate,
    #[serde(default)]
    pub waypoints: Vec<Coordinate>,
    pub total_distance_meters: f64,
    pub estimated_duration_seconds: f64,
    pub total_waypoints: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub description: String,
    pub waypoints: Vec<Coordinate>,
    pub total_distance_meters: f64,
    pub estimated_duration_seconds: f64,
}

impl Route {
    pub fn start(&self) -> Option<&Coordinate> {
        self.waypoints.first()
    }

    pub fn end(&self) -> Option<&Coordinate> {
        self.waypoints.last()
    }

    /// Distance along the route from `index` to the end, in meters.
    pub fn remaining_distance_from(&self, index: usize) -> f64 {
        self.waypoints
            .get(index..)
            .map_or(0.0, |rest| rest.windows(2).map(|pair| pair[0].distance_to(&pair[1])).sum())
    }
}

impl TryFrom<RouteResponse> for Route {
    type Error = Error;

    fn try_from(response: RouteResponse) -> Result<Self, Self::Error> {
        let RouteResponse {
            id,
            name,
            description,
            start_point,
            end_point,
            mut waypoints,
            total_distance_meters,
            estimated_duration_seconds,
            total_waypoints,
        } = response;

        if id.trim().is_empty() {
            tracing::warn!("gateway returned a route without id");
            return Err(upstream_error());
        }

        if !start_point.is_valid() || !end_point.is_valid() || !waypoints.iter().all(|w| w.is_valid()) {
            tracing::warn!("gateway returned route {} with invalid coordinates", id);
            return Err(upstream_error());
        }

        if waypoints.first() != Some(&start_point) {
            waypoints.insert(0, start_point);
        }

        if waypoints.last() != Some(&end_point) {
            waypoints.push(end_point);
        }

        if total_waypoints != waypoints.len() {
            tracing::debug!(
                "route {} reports {} waypoints but carries {}",
                id,
                total_waypoints,
                waypoints.len()
            );
        }

        Ok(Route {
            id,
            name,
            description,
            waypoints,
            total_distance_meters,
            estimated_duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn response(waypoints: serde_json::Value) -> RouteResponse {
        serde_json::from_value(json!({
            "id": "r-1",
            "name": "Coastal",
            "description": "along the shore",
            "start_point": { "latitude": 0.0, "longitude": 0.0 },
            "end_point": { "latitude": 0.0, "longitude": 2.0 },
            "waypoints": waypoints,
            "total_distance_meters": 222390.0,
            "estimated_duration_seconds": 7200.0,
            "total_waypoints": 3
        }))
        .unwrap()
    }

    #[test]
    fn start_and_end_frame_the_waypoints() {
        let route = Route::try_from(response(json!([{ "latitude": 0.0, "longitude": 1.0 }]))).unwrap();

        assert_eq!(route.waypoints.len(), 3);
        assert_eq!(route.start(), Some(&Coordinate::new(0.0, 0.0)));
        assert_eq!(route.end(), Some(&Coordinate::new(0.0, 2.0)));
    }

    #[test]
    fn endpoints_already_present_are_not_duplicated() {
        let route = Route::try_from(response(json!([
            { "latitude": 0.0, "longitude": 0.0 },
            { "latitude": 0.0, "longitude": 1.0 },
            { "latitude": 0.0, "longitude": 2.0 }
        ])))
        .unwrap();

        assert_eq!(route.waypoints.len(), 3);
    }

    #[test]
    fn remaining_distance_shrinks_along_the_route() {
        let route = Route::try_from(response(json!([{ "latitude": 0.0, "longitude": 1.0 }]))).unwrap();

        let full = route.remaining_distance_from(0);
        let half = route.remaining_distance_from(1);

        assert!((full - 2.0 * half).abs() < 1.0);
        assert_eq!(route.remaining_distance_from(2), 0.0);
    }

    #[test]
    fn index_past_the_end_has_nothing_left() {
        let route = Route::try_from(response(json!([]))).unwrap();

        assert_eq!(route.remaining_distance_from(5), 0.0);
        assert_eq!(route.remaining_distance_from(usize::MAX), 0.0);
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let mut bad = response(json!([]));
        bad.end_point = Coordinate::new(120.0, 0.0);

        let err = Route::try_from(bad).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Upstream);
    }
}
