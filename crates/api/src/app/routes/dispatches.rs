use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use ravenpost_core::DispatchId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_dispatches).post(create_dispatch))
        .route("/:id", get(get_dispatch))
}

pub async fn create_dispatch(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateDispatchRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.create_dispatch(&body.lines()).await {
        Ok(dispatch) => (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/dispatches/{}", dispatch.id))],
            Json(dispatch),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_dispatches(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_dispatches().await {
        Ok(dispatches) => (StatusCode::OK, Json(dispatches)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_dispatch(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DispatchId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.get_dispatch(id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
