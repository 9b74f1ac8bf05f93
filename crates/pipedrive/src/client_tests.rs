use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use relay::CompanyDomain;
use serde_json::json;

use super::*;

const TOKEN: &str = "tok-123";

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

fn settings(base_url: &str, timeout: Duration) -> CrmSettings {
    CrmSettings {
        domain: CompanyDomain::new("acme").unwrap(),
        api_token: ApiToken::new(TOKEN).unwrap(),
        base_url: HttpUrl::parse(base_url).unwrap(),
        timeout,
    }
}

async fn client_for(router: Router) -> PipedriveClient {
    let base = serve(router).await;
    PipedriveClient::new(&settings(&base, Duration::from_secs(5))).unwrap()
}

async fn deal_handler(
    Path(id): Path<u64>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("api_token").map(String::as_str) != Some(TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": "unauthorized access"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"success": true, "data": {"id": id, "title": "Obra"}})),
    )
}

#[tokio::test]
async fn fetches_record_with_token_in_query() {
    let client = client_for(Router::new().route("/api/v1/deals/:id", get(deal_handler))).await;

    let record = client.fetch_record(RecordKind::Deal, 1824).await.unwrap();

    assert_eq!(record.get("id"), Some(&json!(1824)));
    assert_eq!(record.get("title"), Some(&json!("Obra")));
}

#[tokio::test]
async fn uses_collection_path_per_kind() {
    let router = Router::new().route(
        "/api/v1/organizations/:id",
        get(|Path(id): Path<u64>| async move {
            Json(json!({"success": true, "data": {"id": id, "name": "SCM"}}))
        }),
    );
    let client = client_for(router).await;

    let record = client
        .fetch_record(RecordKind::Organization, 12)
        .await
        .unwrap();

    assert_eq!(record.get("name"), Some(&json!("SCM")));
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let router = Router::new().route(
        "/api/v1/deals/:id",
        get(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "error": "Deal not found"})),
            )
        }),
    );
    let client = client_for(router).await;

    let err = client.fetch_record(RecordKind::Deal, 1).await.unwrap_err();

    match err {
        CrmError::Status {
            status,
            body,
            retry_after,
        } => {
            assert_eq!(status, 404);
            assert!(body.contains("Deal not found"));
            assert_eq!(retry_after, None);
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_exposes_retry_after() {
    let router = Router::new().route(
        "/api/v1/deals/:id",
        get(|| async {
            let mut headers = HeaderMap::new();
            headers.insert("retry-after", "2".parse().unwrap());
            (StatusCode::TOO_MANY_REQUESTS, headers, "slow down")
        }),
    );
    let client = client_for(router).await;

    let err = client.fetch_record(RecordKind::Deal, 1).await.unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
}

#[tokio::test]
async fn null_data_is_no_data() {
    let router = Router::new().route(
        "/api/v1/deals/:id",
        get(|| async { Json(json!({"success": false, "data": null, "error": "gone"})) }),
    );
    let client = client_for(router).await;

    let err = client.fetch_record(RecordKind::Deal, 1).await.unwrap_err();

    assert_eq!(
        err,
        CrmError::NoData {
            error: Some("gone".into())
        }
    );
}

#[tokio::test]
async fn timeout_is_transport_error_without_token() {
    let router = Router::new().route(
        "/api/v1/deals/:id",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"data": {"id": 1}}))
        }),
    );
    let base = serve(router).await;
    let client = PipedriveClient::new(&settings(&base, Duration::from_millis(200))).unwrap();

    let err = client.fetch_record(RecordKind::Deal, 1).await.unwrap_err();

    match err {
        CrmError::Transport { message, timed_out } => {
            assert!(timed_out);
            assert!(!message.contains(TOKEN), "token leaked: {message}");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_transport_error_without_token() {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = PipedriveClient::new(&settings(
        &format!("http://{addr}"),
        Duration::from_secs(2),
    ))
    .unwrap();

    let err = client.fetch_record(RecordKind::Deal, 1).await.unwrap_err();

    match err {
        CrmError::Transport { message, .. } => assert!(!message.contains(TOKEN)),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn debug_output_redacts_token() {
    let client = PipedriveClient::with_client(
        reqwest::Client::new(),
        &settings("https://acme.pipedrive.com", Duration::from_secs(1)),
    );
    let debug = format!("{client:?}");
    assert!(!debug.contains(TOKEN));
    assert_eq!(
        client.record_url(RecordKind::User, 7),
        "https://acme.pipedrive.com/api/v1/users/7"
    );
}
