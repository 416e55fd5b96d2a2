use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Datelike, Duration as ChronoDuration, Utc, Weekday};
use tower::ServiceExt;

use salonbook::config::AppConfig;
use salonbook::db::{self, queries};
use salonbook::models::{Channel, NotificationStatus, Service, User};
use salonbook::services::business_calendar::CalendarCache;
use salonbook::services::notifications::orchestrator::RetryPolicy;
use salonbook::services::notifications::registry::ChannelRegistry;
use salonbook::services::notifications::NotificationChannel;
use salonbook::state::AppState;

// ── Mock channels ──

struct MockChannel {
    kind: Channel,
    succeed: bool,
    attempts: Arc<AtomicU32>,
}

impl MockChannel {
    fn boxed(kind: Channel, succeed: bool) -> (Box<dyn NotificationChannel>, Arc<AtomicU32>) {
        let attempts = Arc::new(AtomicU32::new(0));
        (
            Box::new(Self {
                kind,
                succeed,
                attempts: Arc::clone(&attempts),
            }),
            attempts,
        )
    }
}

#[async_trait]
impl NotificationChannel for MockChannel {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            Ok(())
        } else {
            anyhow::bail!("transport down")
        }
    }

    fn validate_destination(&self, destination: &str) -> bool {
        !destination.is_empty()
    }

    fn channel(&self) -> Channel {
        self.kind
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        mailgun_api_key: String::new(),
        mailgun_domain: String::new(),
        mailgun_from: "no-reply@test.local".to_string(),
        twilio_account_sid: String::new(),
        twilio_auth_token: String::new(),
        twilio_sms_number: String::new(),
        twilio_whatsapp_number: String::new(),
        max_send_attempts: 3,
        backoff_base_secs: 0,
        send_timeout_secs: 5,
        sweep_interval_secs: 300,
        reminder_interval_secs: 86_400,
        reminder_lookahead_days: 2,
        calendar_cache_ttl_secs: 60,
    }
}

struct TestHarness {
    state: Arc<AppState>,
    email_attempts: Arc<AtomicU32>,
    sms_attempts: Arc<AtomicU32>,
}

/// Email always fails, SMS always succeeds, WhatsApp is not registered.
fn test_state(email_succeeds: bool) -> TestHarness {
    let conn = db::init_db(":memory:").unwrap();

    queries::create_user(
        &conn,
        &User {
            id: "u1".to_string(),
            name: "Alice".to_string(),
            email: Some("alice@example.com".to_string()),
            phone: Some("+15551110000".to_string()),
        },
    )
    .unwrap();
    queries::create_service(
        &conn,
        &Service {
            id: "s1".to_string(),
            name: "Haircut".to_string(),
            duration_minutes: 30,
            price: 40.0,
        },
    )
    .unwrap();

    let (email, email_attempts) = MockChannel::boxed(Channel::Email, email_succeeds);
    let (sms, sms_attempts) = MockChannel::boxed(Channel::Sms, true);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        channels: ChannelRegistry::new(vec![email, sms]),
        calendar: CalendarCache::new(Duration::from_secs(60)),
        retry: RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::ZERO,
        },
    });

    TestHarness {
        state,
        email_attempts,
        sms_attempts,
    }
}

/// A date at least a week out, avoiding Sunday (seeded closed).
fn future_date() -> String {
    let mut date = Utc::now().date_naive() + ChronoDuration::days(7);
    if date.weekday() == Weekday::Sun {
        date += ChronoDuration::days(1);
    }
    date.format("%Y-%m-%d").to_string()
}

/// The nearest Sunday at least a week out.
fn future_sunday() -> String {
    let mut date = Utc::now().date_naive() + ChronoDuration::days(7);
    while date.weekday() != Weekday::Sun {
        date += ChronoDuration::days(1);
    }
    date.format("%Y-%m-%d").to_string()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_booking_request(date: &str, time: &str) -> Request<Body> {
    json_request(
        "POST",
        "/api/appointments",
        serde_json::json!({
            "user_id": "u1",
            "service_id": "s1",
            "date": date,
            "time": time,
        }),
    )
}

// ── Scheduling ──

#[tokio::test]
async fn test_health() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_booking_and_slot_exclusion() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    let response = app
        .clone()
        .oneshot(create_booking_request(&date, "10:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking = response_json(response).await;
    assert_eq!(booking["status"], "scheduled");

    let response = app
        .oneshot(get_request(&format!(
            "/api/appointments/available-slots?date={date}&service_id=s1"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let slots = response_json(response).await;
    assert_eq!(slots["is_open"], true);

    let times: Vec<&str> = slots["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["formatted_time"].as_str().unwrap())
        .collect();
    assert!(!times.contains(&"10:00"));
    assert!(times.contains(&"09:30"));
    assert!(times.contains(&"10:30"));
}

#[tokio::test]
async fn test_slots_closed_day_empty_for_any_service() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let sunday = future_sunday();

    for query in [
        format!("/api/appointments/available-slots?date={sunday}"),
        format!("/api/appointments/available-slots?date={sunday}&service_id=s1"),
        format!("/api/appointments/available-slots?date={sunday}&service_id=does-not-exist"),
    ] {
        let response = app.clone().oneshot(get_request(&query)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["is_open"], false);
        assert_eq!(body["slots"].as_array().unwrap().len(), 0);
    }
}

#[tokio::test]
async fn test_double_booking_rejected() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    let response = app
        .clone()
        .oneshot(create_booking_request(&date, "10:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(create_booking_request(&date, "10:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_concurrent_requests_for_same_slot() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    let mut handles = vec![];
    for _ in 0..8 {
        let app = app.clone();
        let date = date.clone();
        handles.push(tokio::spawn(async move {
            app.oneshot(create_booking_request(&date, "14:00"))
                .await
                .unwrap()
                .status()
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        let status = handle.await.unwrap();
        if status == StatusCode::CREATED {
            created += 1;
        } else if status == StatusCode::CONFLICT {
            conflicts += 1;
        } else {
            panic!("unexpected status {status}");
        }
    }

    assert_eq!(created, 1, "exactly one request may win the slot");
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn test_booking_beyond_close_is_bad_request() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    // 17:45 + 30 minutes runs past the 18:00 close
    let response = app
        .oneshot(create_booking_request(&date, "17:45"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_unknown_user_or_bad_date() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/appointments",
            serde_json::json!({
                "user_id": "ghost",
                "service_id": "s1",
                "date": date,
                "time": "10:00",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(create_booking_request("03/10/2025", "10:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reschedule_to_own_time_and_to_conflict() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    let response = app
        .clone()
        .oneshot(create_booking_request(&date, "10:00"))
        .await
        .unwrap();
    let first = response_json(response).await;
    let first_id = first["id"].as_str().unwrap();

    // No-op move never conflicts with itself
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/appointments/{first_id}/reschedule"),
            serde_json::json!({ "date": date, "time": "10:00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let moved = response_json(response).await;
    assert_eq!(moved["status"], "rescheduled");

    let response = app
        .clone()
        .oneshot(create_booking_request(&date, "11:00"))
        .await
        .unwrap();
    let second = response_json(response).await;
    let second_id = second["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/appointments/{second_id}/reschedule"),
            serde_json::json!({ "date": date, "time": "10:00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_lifecycle() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    let response = app
        .clone()
        .oneshot(create_booking_request(&date, "10:00"))
        .await
        .unwrap();
    let booking = response_json(response).await;
    let id = booking["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/appointments/{id}/cancel"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The canceled booking no longer occupies its slot
    let response = app
        .clone()
        .oneshot(create_booking_request(&date, "10:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let replacement = response_json(response).await;
    let replacement_id = replacement["id"].as_str().unwrap().to_string();

    // Completing then canceling is rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/appointments/{replacement_id}/complete"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/appointments/{replacement_id}/cancel"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_cancel_missing_booking() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/appointments/nope/cancel",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_time_block_blocks_booking() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/time-blocks",
            serde_json::json!({
                "date": date,
                "start_time": "12:00",
                "end_time": "13:00",
                "reason": "staff meeting",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(create_booking_request(&date, "12:30"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Touching the block boundary is fine
    let response = app
        .oneshot(create_booking_request(&date, "13:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_special_day_closure_applies() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);
    let date = future_date();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/settings/special-days",
            serde_json::json!({ "date": date, "is_open": false, "reason": "holiday" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/api/appointments/available-slots?date={date}"
        )))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["is_open"], false);

    let response = app
        .oneshot(create_booking_request(&date, "10:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ── Delivery ──

#[tokio::test]
async fn test_delivery_falls_back_after_retries() {
    let harness = test_state(false);
    let state = Arc::clone(&harness.state);
    let app = salonbook::router(Arc::clone(&state));
    let date = future_date();

    let response = app
        .clone()
        .oneshot(create_booking_request(&date, "10:00"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Wait for the spawned best-effort confirmation delivery
    let mut message_id = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let done = {
            let conn = state.db.lock().unwrap();
            let messages = queries::list_notifications_for_user(&conn, "u1").unwrap();
            messages
                .first()
                .filter(|m| m.status != NotificationStatus::Pending)
                .map(|m| m.id.clone())
        };
        if let Some(id) = done {
            message_id = Some(id);
            break;
        }
    }

    let message_id = message_id.expect("confirmation message should be processed");
    let stored = {
        let conn = state.db.lock().unwrap();
        queries::get_notification(&conn, &message_id).unwrap().unwrap()
    };

    // Preferred email channel exhausted its retries, SMS fallback delivered
    assert_eq!(stored.status, NotificationStatus::Sent);
    assert_eq!(stored.channel, Channel::Sms);
    assert_eq!(harness.email_attempts.load(Ordering::SeqCst), 3);
    assert_eq!(harness.sms_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_process_endpoint_is_idempotent() {
    let harness = test_state(true);
    let state = Arc::clone(&harness.state);
    let app = salonbook::router(Arc::clone(&state));

    let now = Utc::now().naive_utc();
    {
        let conn = state.db.lock().unwrap();
        queries::create_notification(
            &conn,
            &salonbook::models::NotificationMessage {
                id: "n1".to_string(),
                user_id: "u1".to_string(),
                category: salonbook::models::NotificationCategory::Custom,
                channel: Channel::Email,
                subject: "hello".to_string(),
                body: "world".to_string(),
                scheduled_for: now,
                booking_id: None,
                status: NotificationStatus::Pending,
                sent_at: None,
                created_at: now,
            },
        )
        .unwrap();
    }

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/notifications/n1/process",
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["sent"], true);
    }

    // Second call returned the stored outcome without re-sending
    assert_eq!(harness.email_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_process_unknown_notification() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/notifications/ghost/process",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preferences_lazy_defaults_and_update() {
    let harness = test_state(true);
    let app = salonbook::router(harness.state);

    let response = app
        .clone()
        .oneshot(get_request("/api/notifications/preferences/u1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let preference = response_json(response).await;
    assert_eq!(preference["email_enabled"], true);
    assert_eq!(preference["reminder_lead_hours"], 24);

    // Lead hours are clamped to the allowed range
    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/notifications/preferences/u1",
            serde_json::json!({ "reminder_lead_hours": 500 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let preference = response_json(response).await;
    assert_eq!(preference["reminder_lead_hours"], 72);
}

#[tokio::test]
async fn test_business_hours_update_invalidates_slots() {
    let harness = test_state(true);
    let state = Arc::clone(&harness.state);
    let app = salonbook::router(Arc::clone(&state));
    let date = future_date();

    // Warm the calendar cache
    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/api/appointments/available-slots?date={date}"
        )))
        .await
        .unwrap();
    assert_eq!(response_json(response).await["is_open"], true);

    let weekday = chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .unwrap()
        .weekday()
        .num_days_from_sunday();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/settings/hours/{weekday}"),
            serde_json::json!({ "is_open": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request(&format!(
            "/api/appointments/available-slots?date={date}"
        )))
        .await
        .unwrap();
    assert_eq!(response_json(response).await["is_open"], false);
}
