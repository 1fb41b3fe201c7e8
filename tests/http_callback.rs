mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use bewell_ussd::config::Config;
use bewell_ussd::server::router;
use common::{Harness, PHONE, PIN};

fn callback(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/ussd")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn callback_answers_with_plain_text() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let app = router(h.engine.clone(), &Config::default().server);

    let response = app
        .clone()
        .oneshot(callback("sessionId=ATUid_http&phoneNumber=%2B254712345678&text=&serviceCode=%2A384%2A1%23"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"), "{content_type}");
    assert!(body_text(response).await.starts_with("CON Welcome back to Be.Well, Jane."));

    let response = app
        .oneshot(callback("sessionId=ATUid_http&phoneNumber=%2B254712345678&text=1234"))
        .await
        .unwrap();
    assert_eq!(
        body_text(response).await,
        "CON Welcome to Be.Well\r\n1. Opt out of marketing messages\r\n2. Change PIN"
    );
}

#[tokio::test]
async fn engine_failures_still_answer_200_with_end() {
    let h = Harness::new();
    let app = router(h.engine.clone(), &Config::default().server);

    let response = app
        .oneshot(callback("sessionId=ATUid_bad&phoneNumber=abc&text="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "END Something went wrong. Please try again.");
}

#[tokio::test]
async fn missing_form_fields_are_rejected() {
    let h = Harness::new();
    let app = router(h.engine.clone(), &Config::default().server);

    let response = app.oneshot(callback("text=1")).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn healthz_reports_counters() {
    let h = Harness::new();
    let app = router(h.engine.clone(), &Config::default().server);
    app.clone()
        .oneshot(callback("sessionId=ATUid_hz&phoneNumber=0712345678&text="))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(json["callbacks"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn custom_callback_path_is_honoured() {
    let h = Harness::new();
    let mut server = Config::default().server;
    server.callback_path = "/gateway/at".into();
    let app = router(h.engine.clone(), &server);

    let mut request = callback("sessionId=ATUid_p&phoneNumber=0712345678&text=");
    *request.uri_mut() = "/gateway/at".parse().unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert!(body_text(response).await.starts_with("CON Welcome to Be.Well"));

    let response = app.oneshot(callback("sessionId=ATUid_p&phoneNumber=0712345678&text=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
