use std::io::Cursor;
use std::sync::Arc;

use agriguard::{
    app::build_app,
    inference::{labels::LabelSet, model::LinearClassifier, InferenceAdapter, ModelState},
    integrity,
    state::AppState,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "agriguard-test-boundary";

fn ready_state() -> AppState {
    let labels =
        LabelSet::from_json(r#"{"Tomato___Late_blight": 0, "Tomato___healthy": 1}"#).unwrap();
    // logit 0 follows red, logit 1 follows green
    let mut red = vec![0.0; 3 * 4];
    let mut green = vec![0.0; 3 * 4];
    red[..4].fill(1.0);
    green[4..8].fill(1.0);
    let classifier = LinearClassifier::new(2, vec![red, green], vec![0.0, 0.0]).unwrap();
    let adapter = InferenceAdapter::new(Arc::new(classifier), labels, 2).unwrap();
    AppState::fake().with_model(ModelState::Ready(Arc::new(adapter)))
}

fn leaf_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(32, 24, Rgb([30, 200, 40]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    let body = json!({
        "email": format!("{username}@example.com"),
        "username": username,
        "password": password,
        "full_name": "Test Farmer",
        "farm_location": "Test Farm",
    });
    send(
        app,
        Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri("/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .unwrap(),
    )
    .await
}

async fn token_for(app: &Router, username: &str) -> String {
    let (status, _) = register(app, username, "pw123").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = login(app, username, "pw123").await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_owned()
}

fn analyze_request(token: &str, image: &[u8], declared: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"leaf.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(h) = declared {
        req = req.header("X-File-Hash", h);
    }
    req.body(Body::from(body)).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn post_scan(token: &str, image_hash: &str, disease: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/scans")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "image_hash": image_hash,
                "disease_name": disease,
                "confidence": 0.95,
                "recommendation": "Use test fungicide",
            })
            .to_string(),
        ))
        .unwrap()
}

async fn scan_count(app: &Router, token: &str) -> usize {
    let (status, body) = send(app, get("/scans?limit=100", token)).await;
    assert_eq!(status, StatusCode::OK);
    body.as_array().unwrap().len()
}

#[tokio::test]
async fn register_login_and_profile() {
    let app = build_app(ready_state());
    let (status, user) = register(&app, "farmer1", "pw123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "farmer1");
    assert_eq!(user["farm_location"], "Test Farm");
    assert!(user.get("password_hash").is_none());
    assert!(user["created_at"].is_string());

    let (status, tok) = login(&app, "farmer1", "pw123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tok["token_type"], "bearer");

    let (status, me) = send(&app, get("/users/me", tok["access_token"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "farmer1");
    assert_eq!(me["id"], user["id"]);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = build_app(ready_state());
    assert_eq!(register(&app, "farmer1", "pw123").await.0, StatusCode::OK);

    let body = json!({
        "email": "someone-else@example.com",
        "username": "farmer1",
        "password": "other",
    });
    let (status, err) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "DuplicateIdentity");

    // the original password still works, the second one never registered
    assert_eq!(login(&app, "farmer1", "pw123").await.0, StatusCode::OK);
    assert_eq!(login(&app, "farmer1", "other").await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_login_is_uniform() {
    let app = build_app(ready_state());
    register(&app, "farmer1", "pw123").await;

    let (s1, b1) = login(&app, "farmer1", "wrong").await;
    let (s2, b2) = login(&app, "nobody", "pw123").await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
    assert_eq!(b1["kind"], "InvalidCredentials");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = build_app(ready_state());

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let (status, body) = send(&app, get("/scans", "garbage.token.value")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "Unauthenticated");
}

#[tokio::test]
async fn analyze_end_to_end() {
    let app = build_app(ready_state());
    let token = token_for(&app, "farmer1").await;
    assert_eq!(scan_count(&app, &token).await, 0);

    let image = leaf_png();
    let digest = integrity::hash(&image);
    let (status, body) = send(&app, analyze_request(&token, &image, Some(&digest))).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let label = body["disease_name"].as_str().unwrap();
    assert!(["Tomato___Late_blight", "Tomato___healthy"].contains(&label));
    assert_eq!(label, "Tomato___healthy");
    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert!(!body["recommendation"].as_str().unwrap().is_empty());
    assert_eq!(body["image_hash"], digest.as_str());
    assert!(body["timestamp"].is_string());

    let (_, history) = send(&app, get("/scans", &token)).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], body["id"]);
}

#[tokio::test]
async fn analyze_without_declared_hash_still_fingerprints() {
    let app = build_app(ready_state());
    let token = token_for(&app, "farmer1").await;
    let image = leaf_png();
    let (status, body) = send(&app, analyze_request(&token, &image, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image_hash"], integrity::hash(&image).as_str());
}

#[tokio::test]
async fn zero_hash_is_an_integrity_mismatch() {
    let app = build_app(ready_state());
    let token = token_for(&app, "farmer1").await;
    let before = scan_count(&app, &token).await;

    let zeros = "0".repeat(64);
    let (status, body) = send(&app, analyze_request(&token, &leaf_png(), Some(&zeros))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "IntegrityMismatch");
    assert_eq!(scan_count(&app, &token).await, before);
}

#[tokio::test]
async fn undecodable_upload_is_invalid_image() {
    let app = build_app(ready_state());
    let token = token_for(&app, "farmer1").await;
    let junk = b"this is not an image";
    let digest = integrity::hash(junk);
    let (status, body) = send(&app, analyze_request(&token, junk, Some(&digest))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidImage");
    assert_eq!(scan_count(&app, &token).await, 0);
}

#[tokio::test]
async fn analyze_refuses_without_model() {
    let app = build_app(AppState::fake());
    let token = token_for(&app, "farmer1").await;
    let (status, body) = send(&app, analyze_request(&token, &leaf_png(), None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "ModelUnavailable");
    assert_eq!(scan_count(&app, &token).await, 0);

    let (_, health) = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(health["model"], "unavailable");
}

#[tokio::test]
async fn history_is_isolated_per_user() {
    let app = build_app(ready_state());
    let alice = token_for(&app, "alice").await;
    let bob = token_for(&app, "bob").await;

    // identical content analyzed by both
    let image = leaf_png();
    assert_eq!(send(&app, analyze_request(&alice, &image, None)).await.0, StatusCode::OK);
    assert_eq!(send(&app, analyze_request(&bob, &image, None)).await.0, StatusCode::OK);
    assert_eq!(send(&app, post_scan(&bob, "dummy_hash_123", "Test Disease")).await.0, StatusCode::OK);

    let (_, alice_scans) = send(&app, get("/scans", &alice)).await;
    let (_, bob_scans) = send(&app, get("/scans", &bob)).await;
    assert_eq!(alice_scans.as_array().unwrap().len(), 1);
    assert_eq!(bob_scans.as_array().unwrap().len(), 2);

    let (_, me) = send(&app, get("/users/me", &alice)).await;
    assert!(alice_scans
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["user_id"] == me["id"]));
}

#[tokio::test]
async fn direct_scan_write_and_paging() {
    let app = build_app(ready_state());
    let token = token_for(&app, "farmer1").await;

    for i in 0..12 {
        let (status, scan) = send(&app, post_scan(&token, &format!("hash{i}"), "Test Disease")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scan["confidence"], 0.95);
        assert_eq!(scan["recommendation"], "Use test fungicide");
    }

    let (_, first_page) = send(&app, get("/scans", &token)).await;
    let first_page = first_page.as_array().unwrap();
    assert_eq!(first_page.len(), 10);
    assert_eq!(first_page[0]["image_hash"], "hash11");

    let (_, rest) = send(&app, get("/scans?skip=10&limit=10", &token)).await;
    let rest = rest.as_array().unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[1]["image_hash"], "hash0");
}

#[tokio::test]
async fn direct_scan_rejects_out_of_range_confidence() {
    let app = build_app(ready_state());
    let token = token_for(&app, "farmer1").await;
    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/scans")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"image_hash": "abc", "disease_name": "x", "confidence": 1.5}).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");
}

#[tokio::test]
async fn malformed_bodies_use_the_error_shape() {
    let app = build_app(ready_state());

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@b.co"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");
    assert!(body["detail"].as_str().unwrap().contains("username"));

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/auth/token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"farmer1","password":"pw123"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");

    let token = token_for(&app, "farmer1").await;
    let (status, body) = send(&app, get("/scans?limit=lots", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");
}

#[tokio::test]
async fn oversized_upload_names_the_limit() {
    let app = build_app(ready_state());
    let token = token_for(&app, "farmer1").await;

    // fake state caps uploads at 1 MiB
    let big = vec![0u8; 2 * 1024 * 1024];
    let (status, body) = send(&app, analyze_request(&token, &big, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");
    assert!(body["detail"].as_str().unwrap().contains("1048576 byte limit"));
    assert_eq!(scan_count(&app, &token).await, 0);
}
