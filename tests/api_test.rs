//! HTTP surface: health, the active-schedule query and the websocket gate.

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveTime;
use gym_booking::builders::{build_service_with, InMemoryBackends};
use gym_booking::config::BookingConfig;
use gym_booking::core::{GenderBucket, TimeSlot, WeekdayName};
use gym_booking::runtime::{router, AppState, JwtVerifier};
use gym_booking::util::clock::ManualClock;
use gym_booking::util::serde::{SlotId, UserId};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

struct App {
    router: Router,
    mem: InMemoryBackends,
}

fn app() -> App {
    let clock = ManualClock::new(common::tuesday_morning());
    let mem = InMemoryBackends::new(Arc::new(clock.clone()));
    let service = build_service_with(
        &BookingConfig::with_secret(SECRET),
        mem.backends(),
        Arc::new(clock),
    )
    .unwrap();
    App {
        router: router(AppState::new(service, JwtVerifier::new(SECRET))),
        mem,
    }
}

fn token(user: UserId, role: &str, sexo: &str) -> String {
    let claims = json!({
        "id": user.to_string(),
        "rol": role,
        "sexo": sexo,
        "nombre": "Test",
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().uri(uri);
    if let Some(token) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    req.body(Body::empty()).unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_ok() {
    let res = app().router.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, json!({"ok": true, "sessions": 0}));
}

#[tokio::test]
async fn test_schedule_requires_a_valid_token() {
    let res = app()
        .router
        .oneshot(get("/api/schedule/active", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await["code"], "UNAUTHORIZED");

    let res = app()
        .router
        .oneshot(get("/api/schedule/active", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_schedule_is_for_clients_only() {
    let t = token(UserId::new(), "entrenador", "M");
    let res = app()
        .router
        .oneshot(get("/api/schedule/active", Some(&t)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(res).await["ok"], false);
}

#[tokio::test]
async fn test_schedule_lists_active_weekday_slots() {
    let App { router, mem } = app();
    let slot = TimeSlot::new(
        SlotId::new(),
        WeekdayName::Martes,
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        4,
        3,
    )
    .unwrap();
    mem.catalog.upsert(slot.clone());

    let user = UserId::new();
    mem.directory.insert(user, Some(GenderBucket::Female));
    let t = token(user, "cliente", "F");
    let res = router
        .oneshot(get("/api/schedule/active", Some(&t)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    assert_eq!(body["activeDate"], "2025-03-04");
    assert_eq!(body["cutoff"], "21:00");
    assert_eq!(body["viewerGender"], "F");
    let first = &body["slots"][0];
    assert_eq!(first["slotId"], slot.id.to_string());
    assert_eq!(first["start"], "18:00");
    assert_eq!(first["freeA"], 4);
    assert_eq!(first["freeB"], 3);
    assert_eq!(first["viewerHasReservation"], false);
}

#[tokio::test]
async fn test_websocket_rejects_before_upgrade() {
    let res = app().router.oneshot(get("/ws", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let t = token(UserId::new(), "cliente", "M");
    let res = app()
        .router
        .oneshot(get(&format!("/ws?token={t}"), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
