use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveTime;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::router::appointment_routes;
use availability_cell::router::availability_routes;
use shared_database::AppState;
use shared_models::records::{Doctor, Patient};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

const DAY: &str = "2030-06-03";

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(TestConfig::default().to_app_config()))
}

/// Both cell routers merged the way the api binary mounts them.
fn create_test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/availability", availability_routes(state))
}

async fn seed_doctor(state: &AppState, user: &TestUser) -> Doctor {
    let doctor = Doctor {
        id: Uuid::new_v4(),
        user_id: Uuid::parse_str(&user.id).unwrap(),
        full_name: "Dr. Test".to_string(),
        specialty: "general".to_string(),
        is_available: true,
    };
    state.store.upsert_doctor(doctor.clone()).await;
    doctor
}

async fn seed_patient(state: &AppState, user: &TestUser) -> Patient {
    let patient = Patient {
        id: Uuid::new_v4(),
        user_id: Uuid::parse_str(&user.id).unwrap(),
        full_name: "Pat Test".to_string(),
    };
    state.store.upsert_patient(patient.clone()).await;
    patient
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json");
    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn token_for(user: &TestUser) -> String {
    JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, Some(24))
}

#[tokio::test]
async fn full_flow_publish_book_confirm_complete() {
    let state = test_state();
    let doctor_user = TestUser::doctor("doc@example.com");
    let patient_user = TestUser::patient("pat@example.com");
    let doctor = seed_doctor(&state, &doctor_user).await;
    seed_patient(&state, &patient_user).await;

    let doctor_token = token_for(&doctor_user);
    let patient_token = token_for(&patient_user);

    // Doctor publishes a morning block through the availability router.
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "POST",
            "/availability",
            &doctor_token,
            Some(json!([{
                "date": DAY,
                "start_time": "09:00:00",
                "end_time": "12:00:00",
                "day_of_week": null
            }])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Patient books inside it.
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "POST",
            "/appointments",
            &patient_token,
            Some(json!({
                "doctor_id": doctor.id,
                "date": DAY,
                "time": "10:00:00",
                "notes": null
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let appointment = json_body(response).await;
    assert_eq!(appointment["status"], "pending");
    let appointment_id = appointment["id"].as_str().unwrap().to_string();

    // Doctor confirms, then completes.
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "PATCH",
            &format!("/appointments/{}/status", appointment_id),
            &doctor_token,
            Some(json!({ "status": "confirmed" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "confirmed");

    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "PATCH",
            &format!("/appointments/{}/status", appointment_id),
            &doctor_token,
            Some(json!({ "status": "completed" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Completed is terminal.
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "PATCH",
            &format!("/appointments/{}/status", appointment_id),
            &doctor_token,
            Some(json!({ "status": "cancelled" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn double_booking_returns_conflict() {
    let state = test_state();
    let doctor_user = TestUser::doctor("doc@example.com");
    let first_user = TestUser::patient("first@example.com");
    let second_user = TestUser::patient("second@example.com");
    let doctor = seed_doctor(&state, &doctor_user).await;
    seed_patient(&state, &first_user).await;
    seed_patient(&state, &second_user).await;

    state
        .store
        .insert_slots(
            doctor.id,
            vec![shared_database::SlotCandidate {
                date: DAY.parse().unwrap(),
                start_time: "09:00:00".parse().unwrap(),
                end_time: "12:00:00".parse().unwrap(),
            }],
        )
        .await
        .unwrap();

    let body = json!({
        "doctor_id": doctor.id,
        "date": DAY,
        "time": "09:30:00",
        "notes": null
    });

    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "POST",
            "/appointments",
            &token_for(&first_user),
            Some(body.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "POST",
            "/appointments",
            &token_for(&second_user),
            Some(body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"], "slot already booked");
}

#[tokio::test]
async fn legacy_paciente_role_can_book() {
    let state = test_state();
    let doctor_user = TestUser::doctor("doc@example.com");
    let legacy_user = TestUser::new("legacy@example.com", "paciente");
    let doctor = seed_doctor(&state, &doctor_user).await;
    seed_patient(&state, &legacy_user).await;

    state
        .store
        .insert_slots(
            doctor.id,
            vec![shared_database::SlotCandidate {
                date: DAY.parse().unwrap(),
                start_time: "09:00:00".parse().unwrap(),
                end_time: "10:00:00".parse().unwrap(),
            }],
        )
        .await
        .unwrap();

    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "POST",
            "/appointments",
            &token_for(&legacy_user),
            Some(json!({
                "doctor_id": doctor.id,
                "date": DAY,
                "time": "09:00:00",
                "notes": "first visit"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["notes"], "first visit");
}

#[tokio::test]
async fn foreign_patient_cannot_read_or_cancel() {
    let state = test_state();
    let doctor_user = TestUser::doctor("doc@example.com");
    let owner_user = TestUser::patient("owner@example.com");
    let intruder_user = TestUser::patient("intruder@example.com");
    let doctor = seed_doctor(&state, &doctor_user).await;
    let owner = seed_patient(&state, &owner_user).await;
    seed_patient(&state, &intruder_user).await;

    state
        .store
        .insert_slots(
            doctor.id,
            vec![shared_database::SlotCandidate {
                date: DAY.parse().unwrap(),
                start_time: "09:00:00".parse().unwrap(),
                end_time: "10:00:00".parse().unwrap(),
            }],
        )
        .await
        .unwrap();
    let appointment = state
        .store
        .reserve_appointment(
            owner.id,
            doctor.id,
            DAY.parse().unwrap(),
            "09:00:00".parse().unwrap(),
            "09:30:00".parse().unwrap(),
            String::new(),
        )
        .await
        .unwrap();

    let intruder_token = token_for(&intruder_user);

    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "GET",
            &format!("/appointments/{}", appointment.id),
            &intruder_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "PATCH",
            &format!("/appointments/{}/status", appointment.id),
            &intruder_token,
            Some(json!({ "status": "cancelled" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The owner can do both.
    let owner_token = token_for(&owner_user);
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "GET",
            &format!("/appointments/{}", appointment.id),
            &owner_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "PATCH",
            &format!("/appointments/{}/status", appointment.id),
            &owner_token,
            Some(json!({ "status": "cancelled" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reprogram_revalidates_the_new_window() {
    let state = test_state();
    let doctor_user = TestUser::doctor("doc@example.com");
    let patient_user = TestUser::patient("pat@example.com");
    let doctor = seed_doctor(&state, &doctor_user).await;
    let patient = seed_patient(&state, &patient_user).await;

    state
        .store
        .insert_slots(
            doctor.id,
            vec![shared_database::SlotCandidate {
                date: DAY.parse().unwrap(),
                start_time: "09:00:00".parse().unwrap(),
                end_time: "11:00:00".parse().unwrap(),
            }],
        )
        .await
        .unwrap();
    let appointment = state
        .store
        .reserve_appointment(
            patient.id,
            doctor.id,
            DAY.parse().unwrap(),
            "09:00:00".parse().unwrap(),
            "09:30:00".parse().unwrap(),
            String::new(),
        )
        .await
        .unwrap();

    let patient_token = token_for(&patient_user);

    // Outside any published slot: rejected, nothing moves.
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "PATCH",
            &format!("/appointments/{}/reprogram", appointment.id),
            &patient_token,
            Some(json!({ "date": DAY, "time": "15:00:00" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let untouched = state.store.find_appointment(appointment.id).await.unwrap();
    assert_eq!(untouched.time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());

    // Inside the slot: moved and reset to pending.
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "PATCH",
            &format!("/appointments/{}/reprogram", appointment.id),
            &patient_token,
            Some(json!({ "date": DAY, "time": "10:00:00" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let moved = json_body(response).await;
    assert_eq!(moved["status"], "pending");
    assert_eq!(moved["time"], "10:00:00");
}

#[tokio::test]
async fn listings_require_matching_profile_or_admin() {
    let state = test_state();
    let doctor_user = TestUser::doctor("doc@example.com");
    let patient_user = TestUser::patient("pat@example.com");
    let admin_user = TestUser::admin("admin@example.com");
    let doctor = seed_doctor(&state, &doctor_user).await;
    let patient = seed_patient(&state, &patient_user).await;

    state
        .store
        .insert_slots(
            doctor.id,
            vec![shared_database::SlotCandidate {
                date: DAY.parse().unwrap(),
                start_time: "09:00:00".parse().unwrap(),
                end_time: "10:00:00".parse().unwrap(),
            }],
        )
        .await
        .unwrap();
    state
        .store
        .reserve_appointment(
            patient.id,
            doctor.id,
            DAY.parse().unwrap(),
            "09:00:00".parse().unwrap(),
            "09:30:00".parse().unwrap(),
            String::new(),
        )
        .await
        .unwrap();

    // Patient reads their own list.
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "GET",
            &format!("/appointments/patients/{}", patient.id),
            &token_for(&patient_user),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["total"], 1);

    // A doctor cannot read a patient's list.
    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "GET",
            &format!("/appointments/patients/{}", patient.id),
            &token_for(&doctor_user),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin reads both sides.
    let admin_token = token_for(&admin_user);
    for uri in [
        format!("/appointments/patients/{}", patient.id),
        format!("/appointments/doctors/{}", doctor.id),
    ] {
        let response = create_test_app(state.clone())
            .oneshot(authed_request("GET", &uri, &admin_token, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn unauthorized_and_malformed_tokens_are_rejected() {
    let state = test_state();

    let request = Request::builder()
        .method("POST")
        .uri("/appointments")
        .header("content-type", "application/json")
        .body(Body::from(json!({}).to_string()))
        .unwrap();
    let response = create_test_app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = create_test_app(state.clone())
        .oneshot(authed_request(
            "GET",
            &format!("/appointments/{}", Uuid::new_v4()),
            &JwtTestUtils::create_malformed_token(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let expired = JwtTestUtils::create_expired_token(
        &TestUser::patient("pat@example.com"),
        &TestConfig::default().jwt_secret,
    );
    let response = create_test_app(state)
        .oneshot(authed_request(
            "GET",
            &format!("/appointments/{}", Uuid::new_v4()),
            &expired,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctors_cannot_book_appointments() {
    let state = test_state();
    let doctor_user = TestUser::doctor("doc@example.com");
    let doctor = seed_doctor(&state, &doctor_user).await;

    let response = create_test_app(state)
        .oneshot(authed_request(
            "POST",
            "/appointments",
            &token_for(&doctor_user),
            Some(json!({
                "doctor_id": doctor.id,
                "date": DAY,
                "time": "09:00:00",
                "notes": null
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
