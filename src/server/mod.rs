mod handlers;

use std::net::SocketAddr;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::error::{unexpected_error, Error};
use crate::feed::JourneyFeedClient;
use crate::server::handlers::{journeys, routes};

pub use crate::api::DynAPI;

pub fn router(api: DynAPI, client: JourneyFeedClient) -> Router {
    Router::new()
        .route("/journeys", post(journeys::create))
        .route("/journeys/:id", get(journeys::find))
        .route("/routes/:id", get(routes::find))
        .route("/diagnostics", get(journeys::diagnostics))
        .layer(Extension(api))
        .layer(Extension(client))
}

pub async fn serve(api: DynAPI, client: JourneyFeedClient, addr: SocketAddr) -> Result<(), Error> {
    let app = router(api, client);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server stopped: {}", err);
            unexpected_error()
        })
}
