mod common;

use cursus::model::entity::{Certificate, UserEntity};
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, seed_admin, seed_course, seed_program, setup_server, setup_test_db,
    signin_admin_action, signup_action,
};

/// Issue a course certificate from graded work, then revoke it and watch the
/// public verification flip.
#[tokio::test]
async fn route_certificate_lifecycle_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Cert Track", 0, true, None).await;
    let course_id = seed_course(&db, program_id, "Cert Course", 70, 1).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("grad@example.com", "hunter2").with_save_as("student"))
        // students cannot issue certificates
        .step(
            Action::new("student_issue", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "course_id": course_id })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("grade", "POST", "/api/v1/progress/submissions")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "course_id": course_id,
                        "title": "Capstone",
                        "score": 92,
                    })
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("issue", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "course_id": course_id })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("certificate")
                .assert_body(|body| {
                    assert!(body.contains("\"certificate_number\":\"CERT-"));
                    assert!(body.contains("\"grade\":\"A\""));
                    assert!(body.contains("\"final_score\":92"));
                }),
        )
        // one certificate per student and course
        .step(
            Action::new("issue_again", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "course_id": course_id })
                })
                .with_expect(StatusCode::CONFLICT),
        )
        // verification is public
        .step(
            Action::new("verify_issued", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let cert = ctx.get_json::<Certificate>("certificate");
                    format!("/api/v1/certificates/{}/verify", cert.id())
                })
                .with_clear_cookies(true)
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"is_valid\":true"));
                    assert!(body.contains("\"student_name\":\"Test Student\""));
                }),
        )
        .step(signin_admin_action())
        .step(
            Action::new("revoke", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    let cert = ctx.get_json::<Certificate>("certificate");
                    format!("/api/v1/certificates/{}/revoke", cert.id())
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"status\":\"revoked\""))),
        )
        .step(
            Action::new("revoke_again", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    let cert = ctx.get_json::<Certificate>("certificate");
                    format!("/api/v1/certificates/{}/revoke", cert.id())
                })
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("verify_revoked", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let cert = ctx.get_json::<Certificate>("certificate");
                    format!("/api/v1/certificates/{}/verify", cert.id())
                })
                .with_clear_cookies(true)
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"is_valid\":false"))),
        )
        .run(&mut server, db)
        .await;
}

#[tokio::test]
async fn route_certificate_target_validation_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Cert Track", 0, true, None).await;
    let course_id = seed_course(&db, program_id, "Cert Course", 0, 0).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(
            signup_action("target@example.com", "hunter2")
                .with_save_cookies(false)
                .with_save_as("student"),
        )
        .step(signin_admin_action())
        .step(
            Action::new("both_targets", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "course_id": course_id,
                        "program_id": program_id,
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("no_target", "POST", "/api/v1/certificates/")
                .with_dyn_body(|ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id() })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        // a program certificate needs an enrollment to summarize
        .step(
            Action::new("no_enrollment", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("verify_unknown", "GET", "dynamic")
                .with_dyn_path(|_| {
                    format!("/api/v1/certificates/{}/verify", uuid::Uuid::new_v4())
                })
                .with_clear_cookies(true)
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, db)
        .await;
}

/// Program certificates summarize the enrollment snapshot.
#[tokio::test]
async fn route_program_certificate_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Diploma Track", 0, true, None).await;
    let course_id = seed_course(&db, program_id, "Only Course", 0, 0).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("diploma@example.com", "hunter2").with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("issue_program", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| {
                    assert!(body.contains("\"certificate_number\":\"CERT-"));
                    assert!(body.contains("\"program_title\":\"Diploma Track\""));
                }),
        )
        // the (student, course) and (student, program) uniqueness guards are
        // independent; a program certificate does not block a course one
        .step(
            Action::new("issue_course_too", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "course_id": course_id })
                })
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| assert!(body.contains("\"certificate_number\":\"CERT-"))),
        )
        .run(&mut server, db)
        .await;
}

/// A program certificate cannot be issued while any course in the live
/// catalog still misses its completion criteria.
#[tokio::test]
async fn route_program_certificate_requires_completion_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Strict Track", 0, true, None).await;
    seed_course(&db, program_id, "Open Course", 0, 0).await;
    let gated_course = seed_course(&db, program_id, "Gated Course", 70, 1).await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("strict@example.com", "hunter2").with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        // the gated course has no passing grade yet
        .step(
            Action::new("issue_too_early", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("grade_gated", "POST", "/api/v1/progress/submissions")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "course_id": gated_course,
                        "title": "Final Project",
                        "score": 85,
                    })
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("issue_after_grade", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| {
                    assert!(body.contains("\"program_title\":\"Strict Track\""));
                }),
        )
        .run(&mut server, db)
        .await;
}
