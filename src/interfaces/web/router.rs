use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use super::AppState;
use super::handlers::{attendance, config, index};

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub(crate) fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index::index_page))
        .route("/config/companies", get(config::get_companies))
        .route("/config/employees", get(config::get_employees))
        .route("/attendance", post(attendance::record_attendance))
        .layer(middleware::from_fn(security_headers))
        .layer(build_cors())
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; script-src 'self' https://accounts.google.com; \
             frame-src https://accounts.google.com; style-src 'self' 'unsafe-inline'",
        ),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::access::AccessGate;
    use crate::core::attendance::AttendanceService;
    use crate::core::clock::FixedClock;
    use crate::core::store::{MemoryWorkbook, Worksheet};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::StatusCode;
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    async fn state_with(store: &MemoryWorkbook, static_dir: PathBuf) -> AppState {
        let workbook = store.workbook();
        workbook.ensure_headers().await.unwrap();
        workbook
            .directory
            .append_row(
                ["17", "Ash Rahman", "Ash", "a@x.com", "ash@corp.example", "42"]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            )
            .await
            .unwrap();
        workbook
            .companies
            .append_row(vec!["Acme".to_string()])
            .await
            .unwrap();
        let clock = Arc::new(FixedClock::at(
            "2026-03-02T03:00:00Z",
            chrono_tz::Asia::Dhaka,
        ));
        let gate = AccessGate::from_config(Some(&["10.0.0.0/24".to_string()])).unwrap();
        AppState {
            service: AttendanceService::new(&workbook, gate, clock),
            static_dir,
            client_id: "client-123.apps.example".to_string(),
        }
    }

    fn app_from(state: AppState, peer: [u8; 4]) -> Router {
        build_api_router(state).layer(MockConnectInfo(SocketAddr::from((peer, 41000))))
    }

    async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let body = match body {
            Some(json) => serde_json::to_string(&json).unwrap(),
            None => String::new(),
        };
        raw_request(app, method, path, "application/json", body).await
    }

    async fn raw_request(
        app: Router,
        method: Method,
        path: &str,
        content_type: &str,
        body: String,
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));
        (status, json)
    }

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let store = MemoryWorkbook::new();
        let app = app_from(state_with(&store, PathBuf::from("missing")).await, [10, 0, 0, 5]);
        let req = Request::builder()
            .uri("/config/companies")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn config_endpoints_list_directory_and_companies() {
        let store = MemoryWorkbook::new();
        let state = state_with(&store, PathBuf::from("missing")).await;

        let (status, json) =
            json_request(app_from(state.clone(), [10, 0, 0, 5]), Method::GET, "/config/companies", None)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "companies": ["Acme"] }));

        let (status, json) =
            json_request(app_from(state, [10, 0, 0, 5]), Method::GET, "/config/employees", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["email"], "a@x.com");
        assert_eq!(json[0]["office_email"], "ash@corp.example");
        assert_eq!(json[0]["full_name"], "Ash Rahman");
        assert_eq!(json[0]["score"], 42);
    }

    #[tokio::test]
    async fn checkin_then_checkout_over_http() {
        let store = MemoryWorkbook::new();
        let state = state_with(&store, PathBuf::from("missing")).await;

        let (status, json) = json_request(
            app_from(state.clone(), [10, 0, 0, 5]),
            Method::POST,
            "/attendance",
            Some(serde_json::json!({ "email": "a@x.com", "action": "checkin" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "checked_in");
        assert_eq!(json["ip"], "10.0.0.5");
        assert_eq!(json["time"], "09:00:00 AM");
        assert_eq!(json["office_email"], "ash@corp.example");

        let (status, json) = json_request(
            app_from(state.clone(), [10, 0, 0, 5]),
            Method::POST,
            "/attendance",
            Some(serde_json::json!({
                "email": "a@x.com",
                "action": "checkout",
                "tasks": [{
                    "task_for": "Globex",
                    "task_name": "Review",
                    "task_details": "PR 12",
                    "my_role": "reviewer"
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "checked_out");

        let rows = store.ledger.snapshot().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][9], "Checked Out");
        assert_eq!(
            store.companies.snapshot().await.len(),
            3,
            "header, Acme, Globex"
        );
    }

    #[tokio::test]
    async fn error_statuses_and_bodies() {
        let store = MemoryWorkbook::new();
        let state = state_with(&store, PathBuf::from("missing")).await;

        let (status, json) = json_request(
            app_from(state.clone(), [10, 0, 0, 5]),
            Method::POST,
            "/attendance",
            Some(serde_json::json!({ "email": "a@x.com", "action": "nap" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("nap"));

        let (status, json) = json_request(
            app_from(state.clone(), [10, 0, 0, 5]),
            Method::POST,
            "/attendance",
            Some(serde_json::json!({ "email": "zed@x.com", "action": "checkin" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Email not registered");

        let (status, _) = json_request(
            app_from(state.clone(), [10, 0, 0, 5]),
            Method::POST,
            "/attendance",
            Some(serde_json::json!({ "email": "a@x.com", "action": "checkout", "tasks": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        store.ledger.set_fail_reads(true);
        let (status, json) = json_request(
            app_from(state, [10, 0, 0, 5]),
            Method::POST,
            "/attendance",
            Some(serde_json::json!({ "email": "a@x.com", "action": "checkin" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().starts_with("Failed to read"));
    }

    #[tokio::test]
    async fn outside_caller_is_forbidden_regardless_of_payload() {
        let store = MemoryWorkbook::new();
        let state = state_with(&store, PathBuf::from("missing")).await;
        for body in [
            serde_json::json!({ "email": "a@x.com", "action": "checkin" }),
            serde_json::json!({ "email": "", "action": "???" }),
        ] {
            let (status, json) = json_request(
                app_from(state.clone(), [8, 8, 8, 8]),
                Method::POST,
                "/attendance",
                Some(body),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(json["error"], "Access denied for IP: 8.8.8.8");
        }
        for (content_type, body) in [
            ("application/json", "not json"),
            ("text/plain", r#"{"email":"a@x.com","action":"checkin"}"#),
            ("application/json", r#"{"email":"a@x.com","action":"checkout","tasks":"x"}"#),
        ] {
            let (status, json) = raw_request(
                app_from(state.clone(), [8, 8, 8, 8]),
                Method::POST,
                "/attendance",
                content_type,
                body.to_string(),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", content_type, body);
            assert_eq!(json["error"], "Access denied for IP: 8.8.8.8");
        }
        assert_eq!(store.ledger.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_from_allowed_caller_is_bad_request() {
        let store = MemoryWorkbook::new();
        let state = state_with(&store, PathBuf::from("missing")).await;
        for (content_type, body) in [
            ("application/json", "not json"),
            ("text/plain", r#"{"email":"a@x.com","action":"checkin"}"#),
            ("application/json", r#"{"email":"a@x.com","action":"checkout","tasks":[{"task_for":5}]}"#),
        ] {
            let (status, json) = raw_request(
                app_from(state.clone(), [10, 0, 0, 5]),
                Method::POST,
                "/attendance",
                content_type,
                body.to_string(),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", content_type, body);
            assert!(
                json["error"]
                    .as_str()
                    .unwrap()
                    .starts_with("Invalid request body:")
            );
        }
        assert_eq!(store.ledger.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn index_injects_client_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            "<div data-client_id=\"YOUR_CLIENT_ID_HERE\"></div>",
        )
        .unwrap();
        let store = MemoryWorkbook::new();
        let app = app_from(state_with(&store, dir.path().to_path_buf()).await, [10, 0, 0, 5]);

        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("client-123.apps.example"));
        assert!(!html.contains("YOUR_CLIENT_ID_HERE"));
    }

    #[tokio::test]
    async fn index_without_markup_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryWorkbook::new();
        let app = app_from(state_with(&store, dir.path().to_path_buf()).await, [10, 0, 0, 5]);
        let (status, json) = json_request(app, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].is_string());
    }
}
