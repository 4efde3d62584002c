use axum::response::IntoResponse;

/// Service banner; useful as a cheap liveness probe behind load balancers.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
