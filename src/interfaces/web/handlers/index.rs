use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use super::super::AppState;

pub const CLIENT_ID_PLACEHOLDER: &str = "YOUR_CLIENT_ID_HERE";

/// Serves `index.html` from the static directory with the client id filled in.
pub async fn index_page(State(state): State<AppState>) -> Response {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(markup) => Html(markup.replace(CLIENT_ID_PLACEHOLDER, &state.client_id)).into_response(),
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("Failed to load page: {}", e) })),
            )
                .into_response()
        }
    }
}
