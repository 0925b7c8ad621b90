mod coordinate;
mod journey;
mod request;
mod route;
mod update;

pub use coordinate::Coordinate;
pub use journey::{JourneyState, JourneyStatus, Outcome};
pub use request::StartJourneyRequest;
pub use route::{Route, RouteResponse};
pub use update::{CoordinateUpdate, OrderingKey};
