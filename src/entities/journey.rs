use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Coordinate, CoordinateUpdate, OrderingKey, Route};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JourneyStatus {
    NotStarted,
    InProgress,
    Paused,
    Completed,
}

impl JourneyStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
        }
    }
}

/// What happened to an update offered to a journey.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Applied, and `total_waypoints` differed from the previous update or
    /// from the attached route.
    RouteChanged,
    /// Same ordering key as the last applied update.
    Duplicate,
    /// Ordering key below the last applied update.
    Stale,
    /// Newer, but would move progress or the waypoint index backwards.
    Regressed,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied | Self::RouteChanged)
    }
}

/// Last applied view of a journey.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JourneyState {
    pub journey_id: String,
    pub route: Option<Arc<Route>>,
    pub coordinate: Option<Coordinate>,
    pub waypoint_index: usize,
    pub total_waypoints: Option<usize>,
    pub status: JourneyStatus,
    pub speed_meters_per_second: f64,
    pub progress_percentage: f64,
    pub last_applied: Option<OrderingKey>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl JourneyState {
    pub fn new(journey_id: impl Into<String>) -> Self {
        Self {
            journey_id: journey_id.into(),
            route: None,
            coordinate: None,
            waypoint_index: 0,
            total_waypoints: None,
            status: JourneyStatus::NotStarted,
            speed_meters_per_second: 0.0,
            progress_percentage: 0.0,
            last_applied: None,
            applied_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == JourneyStatus::Completed
    }

    pub fn attach_route(&mut self, route: Arc<Route>) {
        self.route = Some(route);
    }

    pub fn remaining_distance_meters(&self) -> Option<f64> {
        self.route.as_ref().map(|route| {
            route.remaining_distance_from(self.waypoint_index.min(route.waypoints.len()))
        })
    }

    /// Offers `update` to the journey. The state only changes when the
    /// returned outcome is applied.
    pub fn apply(&mut self, update: &CoordinateUpdate) -> Outcome {
        let key = update.key();

        match self.last_applied {
            Some(last) if key == last => return Outcome::Duplicate,
            Some(last) if key < last => return Outcome::Stale,
            _ => (),
        }

        // an attached route must agree with the first update's waypoint count
        let route_changed = match (self.total_waypoints, &self.route) {
            (Some(total), _) => total != update.total_waypoints,
            (None, Some(route)) => route.waypoints.len() != update.total_waypoints,
            (None, None) => false,
        };

        let completed = update.status == JourneyStatus::Completed;
        let (progress, index) = if completed {
            (100.0, update.total_waypoints.saturating_sub(1))
        } else {
            (update.progress_percentage, update.current_waypoint_index)
        };

        if !route_changed {
            let index_regressed = !completed && index < self.waypoint_index;

            if index_regressed || progress < self.progress_percentage {
                return Outcome::Regressed;
            }
        }

        if route_changed {
            self.route = None;
        }

        self.coordinate = Some(update.coordinate);
        self.waypoint_index = index;
        self.total_waypoints = Some(update.total_waypoints);
        self.status = update.status;
        self.progress_percentage = progress;
        if let Some(speed) = update.speed_meters_per_second {
            self.speed_meters_per_second = speed;
        }
        self.last_applied = Some(key);
        self.applied_at = Some(Utc::now());

        if route_changed {
            Outcome::RouteChanged
        } else {
            Outcome::Applied
        }
    }
}
