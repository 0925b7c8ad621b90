use axum::extract::{Extension, Json, Path};

use crate::server::DynAPI;
use crate::{entities::Route, error::Error};

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<Json<Route>, Error> {
    let route = api.find_route(&id).await?;

    Ok(route.into())
}
