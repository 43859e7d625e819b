use axum::http::StatusCode;

pub const LIVENESS_MESSAGE: &str = "Raven Post is operational. The birds are restless.";

pub async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
