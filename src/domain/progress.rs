//! Nested lesson/module/course progress maintenance.
//!
//! Percentages always divide by the *current* catalog counts, so adding or
//! removing lessons shows through on the next event instead of freezing a
//! stale total. The module/lesson tree is a keyed map; repeated events hit
//! the same entry instead of appending duplicates.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::notify::{NotificationCategory, NotificationRequest};
use crate::domain::{CoreError, CoreResult, EngineContext, completion};
use crate::model::ResourceType;
use crate::model::entity::{
    Course, Enrollment, EnrollmentStatus, LessonLocator, LessonStatus, Module, ProgressDoc,
    ProgressScope, Submission, SubmissionCreate,
};

async fn locate(ctx: &EngineContext, lesson_id: Uuid) -> CoreResult<LessonLocator> {
    LessonLocator::find(ctx.mm(), lesson_id)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::Lesson))
}

pub async fn on_lesson_started(
    ctx: &EngineContext,
    student_id: Uuid,
    lesson_id: Uuid,
) -> CoreResult<ProgressDoc> {
    let at = locate(ctx, lesson_id).await?;
    let total = Course::lesson_total(ctx.mm(), at.course_id).await?;
    let mut doc = ProgressDoc::ensure(
        ctx.mm(),
        student_id,
        ProgressScope::Course,
        at.course_id,
        total as i32,
        0,
    )
    .await?;

    let module = doc.modules_mut().entry(at.module_id).or_default();
    let lesson = module.lessons.entry(lesson_id).or_default();
    if lesson.status == LessonStatus::NotStarted {
        lesson.status = LessonStatus::InProgress;
        lesson.started_at = Some(Utc::now());
    }

    recompute(ctx, &mut doc, at.module_id, at.course_id).await?;
    doc.save_lesson_state(ctx.mm()).await?;
    Ok(doc)
}

pub async fn on_lesson_completed(
    ctx: &EngineContext,
    student_id: Uuid,
    lesson_id: Uuid,
) -> CoreResult<ProgressDoc> {
    let at = locate(ctx, lesson_id).await?;
    let total = Course::lesson_total(ctx.mm(), at.course_id).await?;
    let mut doc = ProgressDoc::ensure(
        ctx.mm(),
        student_id,
        ProgressScope::Course,
        at.course_id,
        total as i32,
        0,
    )
    .await?;

    let module = doc.modules_mut().entry(at.module_id).or_default();
    let lesson = module.lessons.entry(lesson_id).or_default();
    if lesson.status == LessonStatus::Completed {
        // Repeat event; nothing to recount.
        ProgressDoc::add_time_spent(ctx.mm(), student_id, ProgressScope::Course, at.course_id, 0)
            .await?;
        return Ok(doc);
    }

    let now = Utc::now();
    if lesson.started_at.is_none() {
        lesson.started_at = Some(now);
    }
    lesson.status = LessonStatus::Completed;
    lesson.completed_at = Some(now);

    let module_done = recompute(ctx, &mut doc, at.module_id, at.course_id).await?;
    doc.save_lesson_state(ctx.mm()).await?;

    if module_done {
        ctx.notify(
            NotificationRequest::new(
                student_id,
                NotificationCategory::Progress,
                "Module completed",
                "You have finished every lesson in a module.",
            )
            .about(at.module_id, ResourceType::Module),
        )
        .await;
    }

    // Mirror the lesson count into the enrollment snapshot, then see
    // whether this was the course's last lesson and the submission-based
    // criteria already hold.
    if let Some(enrollment) =
        Enrollment::find_by_pair(ctx.mm(), student_id, at.program_id).await?
    {
        ProgressDoc::bump_program_lessons(ctx.mm(), student_id, at.program_id).await?;
        sync_snapshot_entry(ctx, &enrollment, at.course_id, doc.completed_lessons()).await?;

        let lessons_done =
            doc.total_lessons() > 0 && doc.completed_lessons() >= doc.total_lessons();
        if lessons_done {
            maybe_complete_course(ctx, student_id, at.course_id).await?;
        }
    }

    Ok(doc)
}

/// Run the submission-based completion check for a course whose lessons are
/// all done. Both orderings reach this: the last lesson event when the grades
/// already exist, and a grade event when the lessons finished first.
async fn maybe_complete_course(
    ctx: &EngineContext,
    student_id: Uuid,
    course_id: Uuid,
) -> CoreResult<()> {
    let actor = crate::web::AuthenticatedUser::admin();
    let course = Course::find_by_id(ctx.mm(), &actor, course_id)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::Course))?;

    if !completion::is_course_complete(ctx, student_id, &course).await? {
        return Ok(());
    }

    if let Some(enrollment) =
        Enrollment::find_by_pair(ctx.mm(), student_id, course.program_id()).await?
    {
        completion::complete_course_entry(ctx, enrollment, course_id).await?;
    }
    Ok(())
}

/// Recompute the module percentage and the course roll-up against live
/// catalog counts. Returns whether the module just reached 100%.
async fn recompute(
    ctx: &EngineContext,
    doc: &mut ProgressDoc,
    module_id: Uuid,
    course_id: Uuid,
) -> CoreResult<bool> {
    let module_total = Module::lesson_count(ctx.mm(), module_id).await?;
    let course_total = Course::lesson_total(ctx.mm(), course_id).await?;

    let mut module_done = false;
    if let Some(module) = doc.modules_mut().get_mut(&module_id) {
        let was_done = module.completion_percentage >= 100.0;
        module.completion_percentage = if module_total > 0 {
            (module.completed_lessons() as f64 * 100.0 / module_total as f64).min(100.0)
        } else {
            0.0
        };
        module_done = !was_done && module.completion_percentage >= 100.0;
    }

    let completed: i64 = doc.modules().values().map(|m| m.completed_lessons()).sum();
    let overall = if course_total > 0 {
        (completed as f64 * 100.0 / course_total as f64).min(100.0)
    } else {
        0.0
    };
    doc.set_totals(completed as i32, course_total as i32, overall);

    Ok(module_done)
}

/// Keep `courses_progress[i].lessons_completed` in step with the aggregate,
/// and move a PENDING entry to ACTIVE on first touch.
async fn sync_snapshot_entry(
    ctx: &EngineContext,
    enrollment: &Enrollment,
    course_id: Uuid,
    lessons_completed: i32,
) -> CoreResult<()> {
    let mut entries = enrollment.courses_progress().to_vec();
    let Some(entry) = entries.iter_mut().find(|e| e.course_id == course_id) else {
        // Course joined the program after enrollment; the snapshot does not
        // grow retroactively.
        return Ok(());
    };

    if entry.status == EnrollmentStatus::Completed {
        return Ok(());
    }
    if entry.status == EnrollmentStatus::Pending {
        entry.status = EnrollmentStatus::Active;
    }
    entry.lessons_completed = lessons_completed.min(entry.total_lessons);

    Enrollment::update_snapshot(ctx.mm(), enrollment.id(), &entries, None).await?;
    Ok(())
}

/// Record a graded submission and fold it into the course aggregate.
/// Upsert semantics: a missing aggregate is created, never a NotFound.
pub async fn on_assessment_graded(
    ctx: &EngineContext,
    data: SubmissionCreate,
) -> CoreResult<Submission> {
    if !(0..=100).contains(&data.score) {
        return Err(CoreError::validation("score must be within [0, 100]"));
    }

    let submission = Submission::insert(ctx.mm(), data).await?;
    let stats =
        Submission::stats_for(ctx.mm(), submission.student_id(), submission.course_id()).await?;

    ProgressDoc::record_assessment(
        ctx.mm(),
        submission.student_id(),
        submission.course_id(),
        stats.average_score,
    )
    .await?;

    // The student may have finished every lesson before this grade landed;
    // re-evaluate so the course does not stay open forever.
    if let Some(doc) = ProgressDoc::find_scope(
        ctx.mm(),
        submission.student_id(),
        ProgressScope::Course,
        submission.course_id(),
    )
    .await?
    {
        if doc.total_lessons() > 0 && doc.completed_lessons() >= doc.total_lessons() {
            maybe_complete_course(ctx, submission.student_id(), submission.course_id()).await?;
        }
    }

    Ok(submission)
}
