use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use middleware_api_auth::api_auth;
use routes::{
    analyze::analyze_dream, image::generate_image, liveness::live, readiness::ready,
    video::generate_video,
};

pub mod api_state;
pub mod error;
mod middleware_api_auth;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let public = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    // Dream endpoints, guarded when an access key is configured
    let protected = Router::new()
        .route(
            "/dreams/analyze",
            post(analyze_dream).layer(DefaultBodyLimit::max(
                app_state.studio.config().attachment_max_bytes,
            )),
        )
        .route("/dreams/image", post(generate_image))
        .route("/dreams/video", post(generate_video))
        .route_layer(from_fn_with_state(app_state.clone(), api_auth));

    public.merge(protected)
}
