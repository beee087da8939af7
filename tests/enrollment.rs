mod common;

use cursus::model::entity::{Enrollment, UserEntity};
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, seed_admin, seed_course, seed_lesson, seed_module, seed_program, setup_server,
    setup_test_db, signin_admin_action, signup_action,
};

#[tokio::test]
async fn route_enroll_free_program_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Rust Basics", 0, true, None).await;
    let course_id = seed_course(&db, program_id, "Ownership", 0, 0).await;
    let module_id = seed_module(&db, course_id, "Borrowing").await;
    seed_lesson(&db, module_id, "References").await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("ada@example.com", "hunter2").with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "program_id": program_id,
                    })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("enrollment")
                .assert_body(|body| {
                    assert!(body.contains("active"));
                    assert!(body.contains("courses_progress"));
                }),
        )
        // the (student, program) pair is unique
        .step(
            Action::new("enroll_again", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "program_id": program_id,
                    })
                })
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("get_enrollment", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::OK),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("list_by_program", "GET", "/api/v1/enrollments/")
                .with_param("program_id", &program_id.to_string())
                .with_param("limit", "10")
                .with_param("offset", "0")
                .assert_body(|body| {
                    assert!(body.contains("items"));
                    assert!(body.contains("total"));
                })
                .with_expect(StatusCode::OK),
        )
        .run(&mut server, db)
        .await;
}

#[tokio::test]
async fn route_enroll_guard_rails_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let unpublished = seed_program(&db, "Draft Program", 0, false, None).await;
    let paid = seed_program(&db, "Paid Program", 50_000, true, None).await;
    let tiny = seed_program(&db, "Tiny Program", 0, true, Some(1)).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("first@example.com", "hunter2").with_save_as("first"))
        // unpublished programs do not accept enrollments
        .step(
            Action::new("enroll_unpublished", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("first");
                    json!({ "student_id": student.id(), "program_id": unpublished })
                })
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        // non-zero final price stops with a 402 and the pricing breakdown
        .step(
            Action::new("enroll_paid", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("first");
                    json!({ "student_id": student.id(), "program_id": paid })
                })
                .with_expect(StatusCode::PAYMENT_REQUIRED)
                .assert_body(|body| {
                    assert!(body.contains("payment"));
                    assert!(body.contains("\"final_price\":50000"));
                    assert!(body.contains("\"original_price\":50000"));
                }),
        )
        // first student takes the only seat
        .step(
            Action::new("enroll_tiny", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("first");
                    json!({ "student_id": student.id(), "program_id": tiny })
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(
            signup_action("second@example.com", "hunter2")
                .with_clear_cookies(true)
                .with_save_as("second"),
        )
        .step(
            Action::new("enroll_full", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("second");
                    json!({ "student_id": student.id(), "program_id": tiny })
                })
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        // students cannot enroll somebody else
        .step(
            Action::new("enroll_other", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let other = ctx.get_json::<UserEntity>("first");
                    json!({ "student_id": other.id(), "program_id": paid })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, db)
        .await;
}

#[tokio::test]
async fn route_enrollment_status_machine_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Lifecycle", 0, true, None).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("flow@example.com", "hunter2").with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("enrollment"),
        )
        // students cannot suspend, even their own enrollment
        .step(
            Action::new("student_suspend", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}/status", e.id())
                })
                .with_body(json!({ "status": "suspended" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        // but they can drop out
        .step(
            Action::new("student_drop", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}/status", e.id())
                })
                .with_body(json!({ "status": "dropped" }))
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("dropped"))),
        )
        // and come back
        .step(
            Action::new("student_return", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}/status", e.id())
                })
                .with_body(json!({ "status": "active" }))
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("active"))),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("admin_complete", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}/status", e.id())
                })
                .with_body(json!({ "status": "completed" }))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("completed"));
                    assert!(body.contains("completion_date"));
                }),
        )
        // COMPLETED is terminal
        .step(
            Action::new("admin_reopen", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}/status", e.id())
                })
                .with_body(json!({ "status": "active" }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .run(&mut server, db)
        .await;
}

#[tokio::test]
async fn route_enrollment_delete_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Removable", 0, true, None).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("leaver@example.com", "hunter2").with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("enrollment"),
        )
        // students do not get to hard-delete enrollments
        .step(
            Action::new("student_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("admin_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::OK),
        )
        .step(
            Action::new("get_deleted", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, db)
        .await;
}

#[tokio::test]
async fn route_enroll_by_email_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Cohort Import", 0, true, None).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        // an existing account for the first email, already enrolled
        .step(signup_action("known@example.com", "hunter2").with_save_as("known"))
        .step(
            Action::new("pre_enroll_known", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("known");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        // failures early in the batch never stop the items behind them
        .step(
            Action::new("enroll_by_email", "POST", "/api/v1/enrollments/by-email")
                .with_body(json!({
                    "emails": ["known@example.com", "not-an-email", "fresh@example.com"],
                    "program_id": program_id,
                    "create_missing_users": true,
                }))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"enrolled\":1"));
                    assert!(body.contains("\"failed\":2"));
                    assert!(body.contains("\"new_users_created\":1"));
                    // the duplicate is reported on its own item
                    assert!(body.contains("\"target\":\"known@example.com\",\"enrolled\":false"));
                    assert!(body.contains("\"target\":\"fresh@example.com\",\"enrolled\":true"));
                }),
        )
        // without provisioning, unknown addresses fail per-item
        .step(
            Action::new("enroll_unknown", "POST", "/api/v1/enrollments/by-email")
                .with_body(json!({
                    "emails": ["nobody@example.com"],
                    "program_id": program_id,
                    "create_missing_users": false,
                }))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"enrolled\":0"));
                    assert!(body.contains("\"failed\":1"));
                }),
        )
        .run(&mut server, db)
        .await;
}

#[tokio::test]
async fn route_bulk_enroll_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Bulk Import", 0, true, None).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(
            signup_action("one@example.com", "hunter2")
                .with_save_cookies(false)
                .with_save_as("one"),
        )
        .step(
            signup_action("two@example.com", "hunter2")
                .with_save_cookies(false)
                .with_save_as("two"),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        // one unknown id among the batch fails alone, the rest land
        .step(
            Action::new("bulk_enroll", "POST", "/api/v1/enrollments/bulk")
                .with_dyn_body(move |ctx| {
                    let one = ctx.get_json::<UserEntity>("one");
                    let two = ctx.get_json::<UserEntity>("two");
                    json!({
                        "student_ids": [one.id(), two.id(), uuid::Uuid::new_v4()],
                        "program_id": program_id,
                    })
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"enrolled\":2"));
                    assert!(body.contains("\"failed\":1"));
                }),
        )
        .run(&mut server, db)
        .await;
}
