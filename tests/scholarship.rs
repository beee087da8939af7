mod common;

use cursus::model::entity::{Scholarship, UserEntity};
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, seed_admin, seed_program, setup_server, setup_test_db, signin_admin_action,
    signup_action,
};

/// A 100% code turns a paid program free and is consumed exactly once.
#[tokio::test]
async fn route_scholarship_redemption_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Paid Track", 50_000, true, None).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signin_admin_action())
        .step(
            Action::new("generate_full", "POST", "/api/v1/scholarships/generate")
                .with_body(json!({
                    "program_id": program_id,
                    "prefix": "FREE",
                    "discount_type": "percentage",
                    "discount_value": 100,
                }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("free_code")
                .assert_body(|body| assert!(body.contains("\"code\":\"FREE-"))),
        )
        .step(
            signup_action("first@example.com", "hunter2")
                .with_clear_cookies(true)
                .with_save_as("first"),
        )
        // without a code the paid program demands payment
        .step(
            Action::new("enroll_no_code", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("first");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::PAYMENT_REQUIRED),
        )
        .step(
            Action::new("enroll_with_code", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("first");
                    let sch = ctx.get_json::<Scholarship>("free_code");
                    json!({
                        "student_id": student.id(),
                        "program_id": program_id,
                        "scholarship_code": sch.code(),
                    })
                })
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| assert!(body.contains("\"status\":\"active\""))),
        )
        // a second student cannot reuse a consumed code
        .step(
            signup_action("second@example.com", "hunter2")
                .with_clear_cookies(true)
                .with_save_as("second"),
        )
        .step(
            Action::new("reuse_code", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("second");
                    let sch = ctx.get_json::<Scholarship>("free_code");
                    json!({
                        "student_id": student.id(),
                        "program_id": program_id,
                        "scholarship_code": sch.code(),
                    })
                })
                .with_expect(StatusCode::CONFLICT),
        )
        .run(&mut server, db)
        .await;
}

/// Partial discounts reduce the amount due but still stop at the payment step,
/// and preview reports the same arithmetic without consuming the code.
#[tokio::test]
async fn route_scholarship_partial_and_preview_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Paid Track", 50_000, true, None).await;
    let other_program = seed_program(&db, "Other Track", 50_000, true, None).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signin_admin_action())
        .step(
            Action::new("generate_half", "POST", "/api/v1/scholarships/generate")
                .with_body(json!({
                    "program_id": program_id,
                    "prefix": "HALF",
                    "discount_type": "percentage",
                    "discount_value": 50,
                }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("half_code"),
        )
        .step(
            signup_action("student@example.com", "hunter2")
                .with_clear_cookies(true)
                .with_save_as("student"),
        )
        .step(
            Action::new("preview", "GET", "dynamic")
                .with_dyn_path(move |ctx| {
                    let sch = ctx.get_json::<Scholarship>("half_code");
                    format!(
                        "/api/v1/scholarships/preview?code={}&program_id={}",
                        sch.code(),
                        program_id
                    )
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"original_price\":50000"));
                    assert!(body.contains("\"discount_amount\":25000"));
                    assert!(body.contains("\"final_price\":25000"));
                }),
        )
        .step(
            Action::new("preview_unknown", "GET", "dynamic")
                .with_dyn_path(move |_| {
                    format!(
                        "/api/v1/scholarships/preview?code=NOPE-XXXXXXXX&program_id={program_id}"
                    )
                })
                .with_expect(StatusCode::NOT_FOUND),
        )
        // the code belongs to another program
        .step(
            Action::new("preview_wrong_program", "GET", "dynamic")
                .with_dyn_path(move |ctx| {
                    let sch = ctx.get_json::<Scholarship>("half_code");
                    format!(
                        "/api/v1/scholarships/preview?code={}&program_id={}",
                        sch.code(),
                        other_program
                    )
                })
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        // a 50% code still leaves 250.00 due
        .step(
            Action::new("enroll_partial", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    let sch = ctx.get_json::<Scholarship>("half_code");
                    json!({
                        "student_id": student.id(),
                        "program_id": program_id,
                        "scholarship_code": sch.code(),
                    })
                })
                .with_expect(StatusCode::PAYMENT_REQUIRED)
                .assert_body(|body| {
                    assert!(body.contains("\"discount_amount\":25000"));
                    assert!(body.contains("\"final_price\":25000"));
                }),
        )
        .run(&mut server, db)
        .await;
}

#[tokio::test]
async fn route_scholarship_restrictions_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Restricted Track", 50_000, true, None).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signin_admin_action())
        .step(
            Action::new("generate_restricted", "POST", "/api/v1/scholarships/generate")
                .with_body(json!({
                    "program_id": program_id,
                    "prefix": "ALICE",
                    "student_email": "alice@example.com",
                    "discount_type": "percentage",
                    "discount_value": 100,
                }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("alice_code"),
        )
        .step(
            Action::new("generate_expired", "POST", "/api/v1/scholarships/generate")
                .with_body(json!({
                    "program_id": program_id,
                    "prefix": "LATE",
                    "discount_type": "percentage",
                    "discount_value": 100,
                    "expires_at": "2020-01-01T00:00:00Z",
                }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("late_code"),
        )
        .step(
            signup_action("bob@example.com", "hunter2")
                .with_clear_cookies(true)
                .with_save_as("bob"),
        )
        // restricted to alice, bob is rejected
        .step(
            Action::new("bob_uses_alice_code", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let bob = ctx.get_json::<UserEntity>("bob");
                    let sch = ctx.get_json::<Scholarship>("alice_code");
                    json!({
                        "student_id": bob.id(),
                        "program_id": program_id,
                        "scholarship_code": sch.code(),
                    })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("bob_uses_expired_code", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let bob = ctx.get_json::<UserEntity>("bob");
                    let sch = ctx.get_json::<Scholarship>("late_code");
                    json!({
                        "student_id": bob.id(),
                        "program_id": program_id,
                        "scholarship_code": sch.code(),
                    })
                })
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        // generation is an admin concern
        .step(
            Action::new("student_generate", "POST", "/api/v1/scholarships/generate")
                .with_body(json!({
                    "program_id": program_id,
                    "prefix": "NOPE",
                    "discount_type": "percentage",
                    "discount_value": 10,
                }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, db)
        .await;
}

#[tokio::test]
async fn route_scholarship_bulk_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Bulk Track", 50_000, true, None).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signin_admin_action())
        .step(
            Action::new("bulk_zero", "POST", "/api/v1/scholarships/bulk")
                .with_body(json!({
                    "quantity": 0,
                    "program_id": program_id,
                    "prefix": "BATCH",
                    "discount_type": "fixed",
                    "discount_value": 1000,
                }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("bulk_too_many", "POST", "/api/v1/scholarships/bulk")
                .with_body(json!({
                    "quantity": 101,
                    "program_id": program_id,
                    "prefix": "BATCH",
                    "discount_type": "fixed",
                    "discount_value": 1000,
                }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("bulk_three", "POST", "/api/v1/scholarships/bulk")
                .with_body(json!({
                    "quantity": 3,
                    "program_id": program_id,
                    "prefix": "BATCH",
                    "discount_type": "fixed",
                    "discount_value": 1000,
                }))
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| {
                    assert_eq!(body.matches("\"code\":\"BATCH-").count(), 3);
                }),
        )
        .run(&mut server, db)
        .await;
}
