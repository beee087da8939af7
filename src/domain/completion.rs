//! Decides when a course or program counts as complete.
//!
//! Completion is judged by the submission proxy: graded submission scores,
//! not the lesson-based progress percentage. Lesson progress only decides
//! *when* an evaluation is worth running.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::notify::{NotificationCategory, NotificationRequest};
use crate::domain::{CoreError, CoreResult, EngineContext, email};
use crate::model::{CrudRepository, ResourceType};
use crate::model::entity::{
    Course, Enrollment, EnrollmentStatus, Program, Submission, UserEntity,
};
use crate::web::AuthenticatedUser;

/// Average of all GRADED submission scores meets the course minimum, and
/// enough of them pass (score ≥ 50) to cover the required project count.
pub async fn is_course_complete(
    ctx: &EngineContext,
    student_id: Uuid,
    course: &Course,
) -> CoreResult<bool> {
    let stats = Submission::stats_for(ctx.mm(), student_id, course.id()).await?;

    if stats.graded_count == 0 {
        // No graded work at all only passes a zero-criteria course.
        return Ok(course.minimum_quiz_score() == 0 && course.required_projects() == 0);
    }

    Ok(stats.average_score >= f64::from(course.minimum_quiz_score())
        && stats.passing_count >= i64::from(course.required_projects()))
}

/// Every course in the program's live catalog, not the enrollment-time
/// snapshot. A course added after enrollment still gates program completion.
pub async fn is_program_complete(
    ctx: &EngineContext,
    student_id: Uuid,
    program_id: Uuid,
) -> CoreResult<bool> {
    let actor = AuthenticatedUser::admin();
    let courses = Course::all_by_program(ctx.mm(), &actor, program_id).await?;

    for course in &courses {
        if !is_course_complete(ctx, student_id, course).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Flip one `courses_progress` entry to COMPLETED; when that was the last
/// open entry, the parent enrollment completes in the same update, with its
/// completion date stamped.
///
/// Idempotent: an entry already at COMPLETED is left alone.
pub async fn complete_course_entry(
    ctx: &EngineContext,
    enrollment: Enrollment,
    course_id: Uuid,
) -> CoreResult<Enrollment> {
    let now = Utc::now();
    let mut entries = enrollment.courses_progress().to_vec();

    let entry = entries
        .iter_mut()
        .find(|e| e.course_id == course_id)
        .ok_or(CoreError::NotFound(ResourceType::Course))?;

    if entry.status == EnrollmentStatus::Completed {
        return Ok(enrollment);
    }

    entry.status = EnrollmentStatus::Completed;
    entry.lessons_completed = entry.total_lessons;
    entry.completion_date = Some(now);

    let all_done = entries
        .iter()
        .all(|e| e.status == EnrollmentStatus::Completed);

    let parent = if all_done && enrollment.status() == EnrollmentStatus::Active {
        Some((EnrollmentStatus::Completed, now))
    } else {
        None
    };
    let program_completed = parent.is_some();

    let updated = Enrollment::update_snapshot(ctx.mm(), enrollment.id(), &entries, parent)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::Enrollment))?;

    if program_completed {
        ctx.notify(
            NotificationRequest::new(
                updated.student_id(),
                NotificationCategory::Enrollment,
                "Program completed",
                "Congratulations, you have completed your program.",
            )
            .about(updated.id(), ResourceType::Enrollment),
        )
        .await;

        let actor = AuthenticatedUser::admin();
        let student = UserEntity::find_by_id(ctx.mm(), &actor, updated.student_id()).await;
        let program = Program::find_by_id(ctx.mm(), &actor, updated.program_id()).await;
        if let (Ok(Some(student)), Ok(Some(program))) = (student, program) {
            ctx.send_email(email::EmailMessage {
                to: student.email().to_string(),
                template: email::EmailTemplate::Completion {
                    program_title: program.title().to_string(),
                },
            })
            .await;
        }
    } else {
        ctx.notify(
            NotificationRequest::new(
                updated.student_id(),
                NotificationCategory::Progress,
                "Course completed",
                "A course in your program is now complete.",
            )
            .about(course_id, ResourceType::Course),
        )
        .await;
    }

    Ok(updated)
}
