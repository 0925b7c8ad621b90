pub mod journeys;
pub mod routes;
