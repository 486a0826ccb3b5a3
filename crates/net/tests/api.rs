use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use playzone_core::{Database, DomainEvent};
use playzone_net::{router, ApiSettings, ApiState};
use serde_json::{json, Value};
use tower::ServiceExt; // for `app.oneshot()`

fn test_state() -> ApiState {
    let db = Database::open_in_memory().unwrap();
    ApiState::new(
        db,
        ApiSettings {
            expose_reset_codes: true,
            ..ApiSettings::default()
        },
    )
}

fn test_app() -> Router {
    router(test_state(), &[])
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register a regular user and return its token
async fn register_user(app: &Router, username: &str, phone: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": format!("{}@pz.mn", username),
            "password": "secret1",
            "username": username,
            "fullName": "Bat Erdene",
            "phone": phone,
            "accountType": "user",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

/// Register a center owner on business_standard and return its token
async fn register_owner(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "owner@pz.mn",
            "password": "secret1",
            "accountType": "centerOwner",
            "centerName": "Arena",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        Method::POST,
        "/api/subscription/upgrade",
        Some(&token),
        Some(json!({ "planId": "business_standard" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    token
}

async fn create_center(app: &Router, token: &str, body: Value) -> String {
    let (status, body) = send(app, Method::POST, "/api/centers", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&test_app(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_login_profile() {
    let app = test_app();
    register_user(&app, "bat", "99112233").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "emailOrUsername": "bat", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].get("passwordHash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bat");
    assert_eq!(body["permissions"]["canViewDetails"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "emailOrUsername": "bat@pz.mn", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    let (status, _) = send(&app, Method::GET, "/api/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = test_app();
    register_user(&app, "bat", "99112233").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "bat@pz.mn",
            "password": "secret1",
            "username": "other",
            "fullName": "Other",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "x@pz.mn", "password": "123", "username": "xx1", "fullName": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unauthenticated_booking_rejected() {
    let (status, body) = send(
        &test_app(),
        Method::POST,
        "/api/bookings",
        None,
        Some(json!({
            "centerId": "11111111-1111-1111-1111-111111111111",
            "date": "2025-03-01",
            "time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_center_limit_and_upgrade_gate() {
    let app = test_app();
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "free@pz.mn",
            "password": "secret1",
            "accountType": "centerOwner",
            "centerName": "Free Hall",
        })),
    )
    .await;
    let free_owner = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/centers",
        Some(&free_owner),
        Some(json!({ "name": "Free Hall" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["upgrade"], true);

    let owner = register_owner(&app).await;
    create_center(&app, &owner, json!({ "name": "Arena" })).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/centers",
        Some(&owner),
        Some(json!({ "name": "Arena 2" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "CENTER_LIMIT");
    assert_eq!(body["maxCount"], 1);
    assert_eq!(body["extraCenterPrice"], 19900);
}

#[tokio::test]
async fn test_listing_redacts_occupancy_for_free_viewers() {
    let state = test_state();
    let mut events = state.events.subscribe();
    let app = router(state, &[]);

    let owner = register_owner(&app).await;
    let center_id = create_center(
        &app,
        &owner,
        json!({ "name": "Busy Hall", "occupancy": { "standard": 60 } }),
    )
    .await;
    assert!(matches!(
        events.recv().await.unwrap(),
        DomainEvent::CentersUpdated { .. }
    ));

    // Anonymous: occupancy hidden and its filter ignored
    let (status, body) = send(&app, Method::GET, "/api/centers?onlyGreen=true", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(body[0]["occupancy"]["standard"].is_null());

    // Owner sees occupancy, so the green filter applies
    let (_, body) = send(&app, Method::GET, "/api/centers?onlyGreen=true", Some(&owner), None).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = send(&app, Method::GET, "/api/centers?onlyOrange=true", Some(&owner), None).await;
    assert_eq!(body[0]["_id"], center_id.as_str());
    assert_eq!(body[0]["occupancy"]["standard"], 60.0);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/centers/{}/occupancy", center_id),
        Some(&owner),
        Some(json!({ "standard": 140 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_capacity_and_status_flow() {
    let app = test_app();
    let owner = register_owner(&app).await;
    let user = register_user(&app, "bat", "99112233").await;
    let center_id = create_center(
        &app,
        &owner,
        json!({ "name": "Arena", "seats": { "standard": 2 } }),
    )
    .await;

    let booking = |seats: u32| {
        json!({
            "centerId": center_id,
            "date": "2025-03-01",
            "time": "10:00",
            "duration": 2,
            "type": "standard",
            "seats": seats,
            "price": 3500,
        })
    };

    let (status, body) = send(&app, Method::POST, "/api/bookings", Some(&user), Some(booking(2))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let booking_id = body["_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::POST, "/api/bookings", Some(&user), Some(booking(1))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let status_uri = format!("/api/bookings/{}/status", booking_id);
    let (status, _) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&user),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&owner),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, _) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&owner),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/bookings/center/{}", center_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(body[0]["user"]["fullName"], "Bat Erdene");

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/bookings/center/{}", center_id),
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&app, Method::GET, "/api/bookings/my", Some(&user), None).await;
    assert_eq!(body[0]["center"]["name"], "Arena");
}

#[tokio::test]
async fn test_favorites_toggle() {
    let app = test_app();
    let owner = register_owner(&app).await;
    let user = register_user(&app, "bat", "99112233").await;
    let center_id = create_center(&app, &owner, json!({ "name": "Arena" })).await;
    let uri = format!("/api/auth/favorites/{}", center_id);

    let (_, body) = send(&app, Method::POST, &uri, Some(&user), None).await;
    assert_eq!(body["isFavorite"], true);

    let (_, body) = send(&app, Method::GET, "/api/auth/favorites", Some(&user), None).await;
    assert_eq!(body["favorites"][0]["name"], "Arena");

    let (_, body) = send(&app, Method::POST, &uri, Some(&user), None).await;
    assert_eq!(body["isFavorite"], false);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = test_app();
    let old_token = register_user(&app, "bat", "99112233").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/forgot-password",
        None,
        Some(json!({ "phone": "99112233" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = body["devCode"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/verify-reset-code",
        None,
        Some(json!({ "phone": "99112233", "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reset_token = body["resetToken"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/reset-password",
        None,
        Some(json!({ "resetToken": reset_token, "newPassword": "weak" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/reset-password",
        None,
        Some(json!({ "resetToken": reset_token, "newPassword": "NewPass123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Old sessions are gone, the new password works
    let (status, _) = send(&app, Method::GET, "/api/auth/profile", Some(&old_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "emailOrUsername": "bat", "password": "NewPass123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = test_app();
    let user = register_user(&app, "bat", "99112233").await;

    let (status, _) = send(&app, Method::GET, "/api/admin/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, "/api/bookings/cleanup/old", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_plans_catalog_is_public() {
    let (status, body) = send(&test_app(), Method::GET, "/api/subscription/plans", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plans"].as_array().unwrap().len(), 3);
    assert_eq!(body["plans"][2]["id"], "business_pro");
}

#[tokio::test]
async fn test_cancelled_owner_cannot_edit_but_can_delete() {
    let app = test_app();
    let owner = register_owner(&app).await;
    let center_id = create_center(&app, &owner, json!({ "name": "Arena" })).await;
    let uri = format!("/api/centers/{}", center_id);

    let (status, _) = send(&app, Method::POST, "/api/subscription/cancel", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&owner),
        Some(json!({ "description": "Open late" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["inactive"], true);

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_oversized_booking_is_rejected_and_service_stays_up() {
    let app = test_app();
    let owner = register_owner(&app).await;
    let user = register_user(&app, "bat", "99112233").await;
    let center_id = create_center(
        &app,
        &owner,
        json!({ "name": "Arena", "seats": { "standard": 5 } }),
    )
    .await;

    let booking = |duration: u64, seats: u64| {
        json!({
            "centerId": center_id,
            "date": "2025-03-01",
            "time": "10:00",
            "duration": duration,
            "type": "standard",
            "seats": seats,
            "price": 3500,
        })
    };

    let (status, _) = send(&app, Method::POST, "/api/bookings", Some(&user), Some(booking(1, 1))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&user),
        Some(booking(100_000_000, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&user),
        Some(booking(1, 4_294_967_295)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/api/centers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_videos_need_business_pro() {
    let app = test_app();
    let standard = register_owner(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/centers",
        Some(&standard),
        Some(json!({ "name": "Arena", "videos": ["https://cdn.pz.mn/tour.mp4"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["requiredFeature"], "video");

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "pro@pz.mn",
            "password": "secret1",
            "accountType": "centerOwner",
            "centerName": "Pro Arena",
        })),
    )
    .await;
    let pro = body["token"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/subscription/upgrade",
        Some(&pro),
        Some(json!({ "planId": "business_pro" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/centers",
        Some(&pro),
        Some(json!({ "name": "Pro Arena", "videos": ["https://cdn.pz.mn/tour.mp4"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["videos"][0], "https://cdn.pz.mn/tour.mp4");
}
