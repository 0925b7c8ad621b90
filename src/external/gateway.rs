use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::{
    api::{JourneyAPI, RouteAPI, API},
    entities::{Route, RouteResponse, StartJourneyRequest},
    error::{invalid_input_error, not_found_error, upstream_error, Error},
};

/// HTTP client for the backend API gateway.
#[derive(Clone, Debug)]
pub struct Gateway {
    client: Client,
    base_url: String,
}

impl Gateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Latest raw position message for a journey.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_position(&self, journey_id: &str) -> Result<String, Error> {
        let res = self
            .client
            .get(self.url(&format!("/journeys/{}/position", journey_id)))
            .send()
            .await?;

        let res = check_status(res, journey_id)?;

        Ok(res.text().await?)
    }
}

fn check_status(res: Response, resource: &str) -> Result<Response, Error> {
    let status_code = res.status().as_u16();

    if status_code == 404 {
        return Err(not_found_error(resource));
    } else if (400..500).contains(&status_code) {
        return Err(invalid_input_error(format!(
            "gateway rejected request for {} with {}",
            resource, status_code
        )));
    } else if !res.status().is_success() {
        return Err(upstream_error());
    }

    Ok(res)
}

#[async_trait]
impl RouteAPI for Gateway {
    #[tracing::instrument(skip(self))]
    async fn find_route(&self, id: &str) -> Result<Route, Error> {
        let res = self
            .client
            .get(self.url(&format!("/routes/{}", id)))
            .send()
            .await?;

        let data: RouteResponse = check_status(res, id)?.json().await?;

        Route::try_from(data)
    }
}

#[async_trait]
impl JourneyAPI for Gateway {
    #[tracing::instrument(skip(self))]
    async fn start_journey(&self, request: &StartJourneyRequest) -> Result<(), Error> {
        let res = self
            .client
            .post(self.url("/journeys"))
            .json(request)
            .send()
            .await?;

        check_status(res, &request.journey_id)?;

        tracing::info!("started journey {}", request.journey_id);

        Ok(())
    }
}

impl API for Gateway {}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::error::ErrorKind;

    async fn route(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
        let status = match id.as_str() {
            "missing" => StatusCode::NOT_FOUND,
            "locked" => StatusCode::FORBIDDEN,
            "down" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::OK,
        };

        if status != StatusCode::OK {
            return Err(status);
        }

        let latitude = if id == "broken" { 120.0 } else { 3.13 };

        Ok(Json(json!({
            "id": id,
            "name": "Klang Valley loop",
            "start_point": { "latitude": latitude, "longitude": 101.68 },
            "end_point": { "latitude": 3.15, "longitude": 101.71 },
            "total_distance_meters": 4200.0,
            "estimated_duration_seconds": 900.0,
            "total_waypoints": 2
        })))
    }

    fn serve() -> Gateway {
        let app = Router::new().route("/routes/:id", get(route));
        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);

        Gateway::new(format!("http://{}", addr))
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let gateway = Gateway::new("http://localhost:8080/");

        assert_eq!(gateway.url("/routes/r-1"), "http://localhost:8080/routes/r-1");
    }

    #[tokio::test]
    async fn route_is_fetched_and_framed() {
        let gateway = serve();

        let route = gateway.find_route("r-7").await.unwrap();

        assert_eq!(route.id, "r-7");
        assert_eq!(route.waypoints.len(), 2);
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let gateway = serve();

        for (id, kind) in [
            ("missing", ErrorKind::NotFound),
            ("locked", ErrorKind::InvalidInput),
            ("down", ErrorKind::Upstream),
            ("broken", ErrorKind::Upstream),
        ] {
            assert_eq!(gateway.find_route(id).await.unwrap_err().kind, kind, "{}", id);
        }
    }
}
