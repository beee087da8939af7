mod common;

use cursus::model::entity::{Certificate, Enrollment, UserEntity};
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, seed_admin, seed_course, seed_lesson, seed_module, seed_program, setup_server,
    setup_test_db, signin_action, signin_admin_action, signup_action,
};

/// Zero-criteria course: finishing the lessons is enough, so completing the
/// last lesson cascades through course completion into the enrollment.
#[tokio::test]
async fn lesson_completion_cascade_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Cascade", 0, true, None).await;
    let course_id = seed_course(&db, program_id, "Only Course", 0, 0).await;
    let module_id = seed_module(&db, course_id, "Only Module").await;
    let lesson_a = seed_lesson(&db, module_id, "Lesson A").await;
    let lesson_b = seed_lesson(&db, module_id, "Lesson B").await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("cascade@example.com", "hunter2").with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("enrollment"),
        )
        .step(
            Action::new("start_a", "POST", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/lessons/{lesson_a}/start"))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("in_progress"));
                    assert!(body.contains("\"completed_lessons\":0"));
                }),
        )
        .step(
            Action::new("complete_a", "POST", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/lessons/{lesson_a}/complete"))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"completed_lessons\":1"));
                    assert!(body.contains("\"total_lessons\":2"));
                }),
        )
        // still one lesson to go, the enrollment stays active
        .step(
            Action::new("check_active", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"status\":\"active\""))),
        )
        .step(
            Action::new("complete_b", "POST", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/lessons/{lesson_b}/complete"))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"completed_lessons\":2"));
                    assert!(body.contains("\"overall_progress\":100"));
                }),
        )
        // last lesson of the only course: the whole enrollment completed
        .step(
            Action::new("check_completed", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"status\":\"completed\""));
                }),
        )
        // repeat completion is a no-op, not a double count
        .step(
            Action::new("complete_b_again", "POST", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/lessons/{lesson_b}/complete"))
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"completed_lessons\":2"))),
        )
        .step(
            Action::new("course_summary", "GET", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/courses/{course_id}"))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"completed_lessons\":2"));
                    assert!(body.contains("\"total_lessons\":2"));
                }),
        )
        // the completed enrollment shows through on the certificate, with
        // its completion date in the public verification payload
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("issue_program_cert", "POST", "/api/v1/certificates/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("certificate"),
        )
        .step(
            Action::new("verify_cert", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let cert = ctx.get_json::<Certificate>("certificate");
                    format!("/api/v1/certificates/{}/verify", cert.id())
                })
                .with_clear_cookies(true)
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("\"is_valid\":true"));
                    assert!(body.contains("\"completion_date\":\"2"));
                }),
        )
        .run(&mut server, db)
        .await;
}

/// Reverse ordering of the gated flow: every lesson is finished before the
/// grade lands. Recording the grade must still close out the course and the
/// enrollment with it.
#[tokio::test]
async fn grade_after_lessons_completion_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Gated Late", 0, true, None).await;
    let course_id = seed_course(&db, program_id, "Hard Course", 70, 1).await;
    let module_id = seed_module(&db, course_id, "M1").await;
    let lesson_a = seed_lesson(&db, module_id, "L1").await;
    let lesson_b = seed_lesson(&db, module_id, "L2").await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("late@example.com", "hunter2").with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("enrollment"),
        )
        .step(
            Action::new("complete_a", "POST", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/lessons/{lesson_a}/complete"))
                .with_expect(StatusCode::OK),
        )
        .step(
            Action::new("complete_b", "POST", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/lessons/{lesson_b}/complete"))
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"completed_lessons\":2"))),
        )
        // all lessons done but nothing graded: the course stays open
        .step(
            Action::new("still_active", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"status\":\"active\""))),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("grade", "POST", "/api/v1/progress/submissions")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "course_id": course_id,
                        "title": "Project 1",
                        "score": 80,
                    })
                })
                .with_expect(StatusCode::CREATED),
        )
        // the grade alone finishes the job
        .step(
            Action::new("check_completed", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"status\":\"completed\""))),
        )
        .run(&mut server, db)
        .await;
}

/// A course gated on graded work does not complete on lessons alone.
#[tokio::test]
async fn submission_gated_completion_test() {
    let db = setup_test_db().await;
    seed_admin(&db).await;
    let program_id = seed_program(&db, "Gated", 0, true, None).await;
    let course_id = seed_course(&db, program_id, "Hard Course", 70, 1).await;
    let module_id = seed_module(&db, course_id, "M1").await;
    let lesson_a = seed_lesson(&db, module_id, "L1").await;
    let lesson_b = seed_lesson(&db, module_id, "L2").await;
    let mut server = setup_server(&db).await;

    Flow::new()
        .step(signup_action("gated@example.com", "hunter2").with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/v1/enrollments/")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({ "student_id": student.id(), "program_id": program_id })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("enrollment"),
        )
        .step(
            Action::new("complete_first", "POST", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/lessons/{lesson_a}/complete"))
                .with_expect(StatusCode::OK),
        )
        // one lesson left and no graded work yet, so nothing completes
        .step(
            Action::new("still_active", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"status\":\"active\""))),
        )
        // students cannot grade
        .step(
            Action::new("student_grade", "POST", "/api/v1/progress/submissions")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "course_id": course_id,
                        "title": "Project 1",
                        "score": 100,
                    })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        // out-of-range score
        .step(
            Action::new("bad_score", "POST", "/api/v1/progress/submissions")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "course_id": course_id,
                        "title": "Project 1",
                        "score": 101,
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("grade", "POST", "/api/v1/progress/submissions")
                .with_dyn_body(move |ctx| {
                    let student = ctx.get_json::<UserEntity>("student");
                    json!({
                        "student_id": student.id(),
                        "course_id": course_id,
                        "title": "Project 1",
                        "score": 80,
                    })
                })
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| assert!(body.contains("\"score\":80"))),
        )
        // the graded work satisfies the criteria, so finishing the last
        // lesson completes the course and the enrollment with it
        .step(signin_action("gated@example.com", "hunter2").with_clear_cookies(true))
        .step(
            Action::new("complete_last", "POST", "dynamic")
                .with_dyn_path(move |_| format!("/api/v1/progress/lessons/{lesson_b}/complete"))
                .with_expect(StatusCode::OK),
        )
        .step(
            Action::new("check_completed", "GET", "dynamic")
                .with_dyn_path(|ctx| {
                    let e = ctx.get_json::<Enrollment>("enrollment");
                    format!("/api/v1/enrollments/{}", e.id())
                })
                .with_expect(StatusCode::OK)
                .assert_body(|body| assert!(body.contains("\"status\":\"completed\""))),
        )
        .run(&mut server, db)
        .await;
}
