//! Enrollment creation, batch variants, status transitions and deletion.
//!
//! All uniqueness invariants live in the database: the application-level
//! existence checks give friendly errors in the common case, but the
//! (student, program) unique index is what decides concurrent races.

use serde::Serialize;
use uuid::Uuid;

use crate::auth;
use crate::domain::email::{EmailMessage, EmailTemplate};
use crate::domain::notify::{NotificationCategory, NotificationRequest};
use crate::domain::{CoreError, CoreResult, EngineContext, PricingBreakdown, Ref, scholarship};
use crate::model::entity::{
    Course, CourseProgressEntry, Enrollment, EnrollmentCreate, EnrollmentStatus, Program,
    ProgressDoc, ProgressScope, UserEntity, UserEntityCreateUpdate,
};
use crate::model::{CrudRepository, ResourceType};
use crate::web::{AuthenticatedUser, UserRole};

#[derive(Debug, Clone, Default)]
pub struct EnrollOptions {
    pub cohort: Option<String>,
    pub notes: Option<String>,
    pub scholarship_code: Option<String>,
    pub payment_method: Option<String>,
}

/// Allowed transitions of the enrollment state machine. Re-entry from
/// DROPPED/SUSPENDED back to ACTIVE is deliberately permitted; COMPLETED is
/// terminal.
pub fn can_transition(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
    use EnrollmentStatus::*;
    matches!(
        (from, to),
        (Pending, Active)
            | (Active, Completed)
            | (Active, Suspended)
            | (Active, Dropped)
            | (Suspended, Active)
            | (Suspended, Dropped)
            | (Dropped, Active)
    )
}

/// Who may request a transition: admins anything the machine allows,
/// students only dropping (or re-activating) their own enrollment.
fn transition_allowed_for(to: EnrollmentStatus, actor_is_admin: bool, actor_is_owner: bool) -> bool {
    if actor_is_admin {
        return true;
    }
    actor_is_owner
        && matches!(
            to,
            EnrollmentStatus::Dropped | EnrollmentStatus::Active
        )
}

pub async fn create_enrollment(
    ctx: &EngineContext,
    student_id: Uuid,
    program: Ref<Program>,
    opts: EnrollOptions,
) -> CoreResult<Enrollment> {
    let actor = AuthenticatedUser::admin();
    let program = program.resolve(ctx.mm(), &actor).await?;

    if !program.is_published() {
        return Err(CoreError::unavailable("program is not published"));
    }

    let student = UserEntity::find_by_id(ctx.mm(), &actor, student_id)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::User))?;
    if student.role() != UserRole::Student {
        return Err(CoreError::Forbidden);
    }

    if Enrollment::find_by_pair(ctx.mm(), student_id, program.id())
        .await?
        .is_some()
    {
        return Err(CoreError::Conflict(ResourceType::Enrollment));
    }

    // Soft capacity check; see the unique index for the hard duplicate
    // guard. Drift under concurrent load is an accepted limitation.
    if let Some(limit) = program.enrollment_limit() {
        let occupied = Enrollment::occupancy(ctx.mm(), program.id()).await?;
        if occupied >= i64::from(limit) {
            return Err(CoreError::unavailable("program has reached its enrollment limit"));
        }
    }

    // Snapshot the catalog as it stands right now. The list never grows,
    // even if courses are added to the program later.
    let courses = Course::all_by_program(ctx.mm(), &actor, program.id()).await?;
    let mut entries = Vec::with_capacity(courses.len());
    for course in &courses {
        let total = Course::lesson_total(ctx.mm(), course.id()).await?;
        entries.push(CourseProgressEntry::pending(course.id(), total as i32));
    }
    let snapshot_total: i32 = entries.iter().map(|e| e.total_lessons).sum();

    // Pricing. Any non-zero final price stops here: payment processing is
    // intentionally unimplemented, with or without a payment method.
    let base_price = program.price_cents();
    let applied_scholarship = match &opts.scholarship_code {
        Some(code) => Some(scholarship::validate(ctx, code, program.id(), student.email()).await?),
        None => None,
    };
    let discount = applied_scholarship
        .as_ref()
        .map(|s| scholarship::compute_discount(s, base_price))
        .unwrap_or(0);
    let due = scholarship::final_price(base_price, discount);
    if due > 0 {
        return Err(CoreError::PaymentRequired(PricingBreakdown {
            original_price: base_price,
            discount_amount: discount,
            final_price: due,
        }));
    }

    let enrollment = Enrollment::insert(
        ctx.mm(),
        EnrollmentCreate {
            student_id,
            program_id: program.id(),
            cohort: opts.cohort,
            notes: opts.notes,
            courses_progress: entries,
        },
    )
    .await
    .map_err(|e| CoreError::from_db(ResourceType::Enrollment, e))?;

    let course_ids = enrollment.snapshot_course_ids();
    Course::adjust_enrollment_counters(ctx.mm(), &course_ids, 1).await?;

    ProgressDoc::ensure(
        ctx.mm(),
        student_id,
        ProgressScope::Program,
        program.id(),
        snapshot_total,
        course_ids.len() as i32,
    )
    .await?;

    if let Some(sch) = &applied_scholarship {
        scholarship::mark_used(ctx, sch.id(), student_id).await?;
        ctx.send_email(EmailMessage {
            to: student.email().to_string(),
            template: EmailTemplate::ScholarshipAward {
                program_title: program.title().to_string(),
                code: sch.code().to_string(),
            },
        })
        .await;
    }

    ctx.notify(
        NotificationRequest::new(
            student_id,
            NotificationCategory::Enrollment,
            "Enrollment confirmed",
            format!("You are enrolled in {}.", program.title()),
        )
        .about(enrollment.id(), ResourceType::Enrollment),
    )
    .await;

    for instructor_id in Course::instructors_of_program(ctx.mm(), program.id()).await? {
        ctx.notify(
            NotificationRequest::new(
                instructor_id,
                NotificationCategory::Enrollment,
                "New student enrolled",
                format!("A student enrolled in {}.", program.title()),
            )
            .about(enrollment.id(), ResourceType::Enrollment),
        )
        .await;
    }

    ctx.send_email(EmailMessage {
        to: student.email().to_string(),
        template: EmailTemplate::EnrollmentConfirmation {
            program_title: program.title().to_string(),
        },
    })
    .await;

    Ok(enrollment)
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BatchItem {
    pub target: String,
    pub enrolled: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BatchOutcome {
    pub enrolled: usize,
    pub failed: usize,
    pub new_users_created: usize,
    pub items: Vec<BatchItem>,
}

impl BatchOutcome {
    fn record(&mut self, target: String, result: &CoreResult<Enrollment>) {
        match result {
            Ok(_) => {
                self.enrolled += 1;
                self.items.push(BatchItem {
                    target,
                    enrolled: true,
                    error: None,
                });
            }
            Err(e) => {
                self.failed += 1;
                self.items.push(BatchItem {
                    target,
                    enrolled: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }
}

/// Per-item isolation: one bad student id must not abort the rest, and
/// earlier successes are never rolled back.
pub async fn bulk_enroll(
    ctx: &EngineContext,
    student_ids: &[Uuid],
    program_id: Uuid,
    opts: &EnrollOptions,
) -> CoreResult<BatchOutcome> {
    let mut outcome = BatchOutcome {
        enrolled: 0,
        failed: 0,
        new_users_created: 0,
        items: Vec::with_capacity(student_ids.len()),
    };

    for &student_id in student_ids {
        let result =
            create_enrollment(ctx, student_id, Ref::Id(program_id), opts.clone()).await;
        outcome.record(student_id.to_string(), &result);
    }

    Ok(outcome)
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Enroll by email, optionally provisioning accounts for unknown addresses.
/// Account creation and enrollment are not one atomic unit: if the
/// enrollment fails afterwards, the fresh account stays.
pub async fn enroll_by_email(
    ctx: &EngineContext,
    emails: &[String],
    program_id: Uuid,
    create_missing_users: bool,
    opts: &EnrollOptions,
) -> CoreResult<BatchOutcome> {
    let actor = AuthenticatedUser::admin();
    let mut outcome = BatchOutcome {
        enrolled: 0,
        failed: 0,
        new_users_created: 0,
        items: Vec::with_capacity(emails.len()),
    };

    for email in emails {
        if !is_plausible_email(email) {
            outcome.failed += 1;
            outcome.items.push(BatchItem {
                target: email.clone(),
                enrolled: false,
                error: Some(CoreError::validation("malformed email address").to_string()),
            });
            continue;
        }

        // Lookup and provisioning failures stay inside their item; a lost
        // unique-index race on one address must not abort the rest.
        let found = match UserEntity::find_by_email(ctx.mm(), &actor, email).await {
            Ok(found) => found,
            Err(e) => {
                outcome.failed += 1;
                outcome.items.push(BatchItem {
                    target: email.clone(),
                    enrolled: false,
                    error: Some(CoreError::from(e).to_string()),
                });
                continue;
            }
        };
        let student = match found {
            Some(user) => user,
            None if create_missing_users => match provision_student(ctx, email).await {
                Ok(user) => {
                    outcome.new_users_created += 1;
                    user
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome.items.push(BatchItem {
                        target: email.clone(),
                        enrolled: false,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            },
            None => {
                outcome.failed += 1;
                outcome.items.push(BatchItem {
                    target: email.clone(),
                    enrolled: false,
                    error: Some(CoreError::NotFound(ResourceType::User).to_string()),
                });
                continue;
            }
        };

        let result =
            create_enrollment(ctx, student.id(), Ref::Id(program_id), opts.clone()).await;
        outcome.record(email.clone(), &result);
    }

    Ok(outcome)
}

/// New STUDENT account with a random temporary credential, sent by mail.
async fn provision_student(ctx: &EngineContext, email: &str) -> CoreResult<UserEntity> {
    let actor = AuthenticatedUser::admin();
    let temp_password = auth::generate_opaque_token(9);
    let hash = auth::hash_password(&temp_password)
        .map_err(|e| CoreError::validation(format!("unable to hash credential: {e}")))?;

    let full_name = email.split('@').next().unwrap_or(email).to_string();
    let user = UserEntity::create(
        ctx.mm(),
        &actor,
        UserEntityCreateUpdate {
            email: email.to_string(),
            full_name,
            password_hash: hash,
            role: UserRole::Student,
        },
    )
    .await
    .map_err(|e| CoreError::from_db(ResourceType::User, e))?;

    ctx.send_email(EmailMessage {
        to: email.to_string(),
        template: EmailTemplate::TemporaryCredential {
            password: temp_password,
        },
    })
    .await;

    Ok(user)
}

/// Caller-requested transition. The auto-complete path does not come through
/// here; it flips status together with the snapshot update.
pub async fn update_status(
    ctx: &EngineContext,
    enrollment_id: Uuid,
    new_status: EnrollmentStatus,
    actor: &AuthenticatedUser,
) -> CoreResult<Enrollment> {
    let enrollment = Enrollment::find_by_id(ctx.mm(), enrollment_id)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::Enrollment))?;

    let current = enrollment.status();
    let is_admin = actor.user_role() == UserRole::Admin;
    let is_owner = actor.user_id() == enrollment.student_id();

    if !transition_allowed_for(new_status, is_admin, is_owner) {
        return Err(CoreError::Forbidden);
    }
    if !can_transition(current, new_status) {
        return Err(CoreError::validation(format!(
            "cannot transition enrollment from {current} to {new_status}"
        )));
    }

    let completion_date = (new_status == EnrollmentStatus::Completed).then(chrono::Utc::now);
    let updated =
        Enrollment::cas_status(ctx.mm(), enrollment_id, current, new_status, completion_date)
            .await?
            // Another writer moved the row first.
            .ok_or(CoreError::Conflict(ResourceType::Enrollment))?;

    let (title, message) = match new_status {
        EnrollmentStatus::Completed => ("Program completed", "Your enrollment is complete."),
        EnrollmentStatus::Suspended => ("Enrollment suspended", "Your enrollment was suspended."),
        EnrollmentStatus::Dropped => ("Enrollment dropped", "You have left the program."),
        EnrollmentStatus::Active => ("Enrollment active", "Your enrollment is active again."),
        EnrollmentStatus::Pending => ("Enrollment pending", "Your enrollment is pending."),
    };
    ctx.notify(
        NotificationRequest::new(
            updated.student_id(),
            NotificationCategory::Enrollment,
            title,
            message,
        )
        .about(updated.id(), ResourceType::Enrollment),
    )
    .await;

    let admin = AuthenticatedUser::admin();
    if let Ok(Some(student)) = UserEntity::find_by_id(ctx.mm(), &admin, updated.student_id()).await
    {
        let program = Program::find_by_id(ctx.mm(), &admin, updated.program_id()).await;
        if let Ok(Some(program)) = program {
            ctx.send_email(EmailMessage {
                to: student.email().to_string(),
                template: EmailTemplate::StatusChange {
                    program_title: program.title().to_string(),
                    new_status: new_status.to_string(),
                },
            })
            .await;
        }
    }

    Ok(updated)
}

/// Tear-down cascade: course counters go back down by one each, progress
/// aggregates disappear, then the enrollment row itself.
pub async fn delete_enrollment(ctx: &EngineContext, enrollment_id: Uuid) -> CoreResult<()> {
    let enrollment = Enrollment::find_by_id(ctx.mm(), enrollment_id)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::Enrollment))?;

    let course_ids = enrollment.snapshot_course_ids();
    Course::adjust_enrollment_counters(ctx.mm(), &course_ids, -1).await?;
    ProgressDoc::delete_for_enrollment(
        ctx.mm(),
        enrollment.student_id(),
        enrollment.program_id(),
        &course_ids,
    )
    .await?;

    let student_id = enrollment.student_id();
    let program_id = enrollment.program_id();
    enrollment.delete(ctx.mm()).await?;

    ctx.notify(
        NotificationRequest::new(
            student_id,
            NotificationCategory::Enrollment,
            "Enrollment removed",
            "Your enrollment was removed.",
        )
        .about(program_id, ResourceType::Program),
    )
    .await;

    Ok(())
}
