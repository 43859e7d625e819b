use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use ravenpost_core::SupplyId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_supplies).post(create_supply))
        .route(
            "/:id",
            get(get_supply).put(replace_supply).delete(delete_supply),
        )
}

pub async fn list_supplies(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::SupplyQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.list_supplies(&filter).await {
        Ok(supplies) => (StatusCode::OK, Json(supplies)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SupplyId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.get_supply(id).await {
        Ok(supply) => (StatusCode::OK, Json(supply)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_supply(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::SupplyRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let input = match body.into_new_supply() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.create_supply(input).await {
        Ok(supply) => (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/supplies/{}", supply.id))],
            Json(supply),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Full replacement. Body validation runs before the existence check.
pub async fn replace_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::SupplyRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: SupplyId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let input = match body.into_new_supply() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.replace_supply(id, input).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SupplyId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.delete_supply(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
