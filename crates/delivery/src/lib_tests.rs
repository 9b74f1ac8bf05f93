use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use super::*;

type Received = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn serve(status: StatusCode, delay: Duration) -> (String, Received) {
    let received: Received = Arc::default();
    let router = Router::new()
        .route(
            "/hook",
            post(
                move |State(received): State<Received>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    received.lock().unwrap().push((content_type, body));
                    tokio::time::sleep(delay).await;
                    (status, "Accepted")
                },
            ),
        )
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    (format!("http://{addr}/hook"), received)
}

fn delivery(url: &str, timeout: Duration) -> WebhookDelivery {
    WebhookDelivery::new(&DestinationSettings {
        url: HttpUrl::parse(url).unwrap(),
        timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn posts_document_as_json() {
    let (url, received) = serve(StatusCode::OK, Duration::ZERO).await;
    let document = json!({"id": 1824, "title": "Obra", "person": {}});

    let receipt = delivery(&url, Duration::from_secs(5))
        .deliver(&document)
        .await
        .unwrap();

    assert_eq!(receipt, DeliveryReceipt { status: 200 });
    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0.as_deref(), Some("application/json"));
    assert_eq!(received[0].1, document);
}

#[tokio::test]
async fn any_2xx_is_success() {
    let (url, _) = serve(StatusCode::ACCEPTED, Duration::ZERO).await;

    let receipt = delivery(&url, Duration::from_secs(5))
        .deliver(&json!({"id": 1}))
        .await
        .unwrap();

    assert_eq!(receipt.status, 202);
}

#[tokio::test]
async fn non_2xx_is_rejected_once() {
    let (url, received) = serve(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;

    let err = delivery(&url, Duration::from_secs(5))
        .deliver(&json!({"id": 1}))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DeliveryError::Rejected {
            status: 500,
            body: "Accepted".into()
        }
    );
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn slow_destination_times_out() {
    let (url, _) = serve(StatusCode::OK, Duration::from_secs(5)).await;

    let err = delivery(&url, Duration::from_millis(200))
        .deliver(&json!({"id": 1}))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeliveryError::Transport {
            timed_out: true,
            ..
        }
    ));
}
