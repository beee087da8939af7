//! Certificate issuance, revocation and public verification.
//!
//! A certificate is a frozen record: its metadata snapshots the numbers at
//! issue time and never changes afterwards, even when the catalog or the
//! student's submissions do.

use chrono::{Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth;
use crate::domain::notify::{NotificationCategory, NotificationRequest};
use crate::domain::{CoreError, CoreResult, EngineContext, completion};
use crate::model::ResourceType;
use crate::model::entity::{
    Certificate, CertificateCreate, CertificateStatus, CertificateVerificationRow, Course,
    Enrollment, EnrollmentStatus, Program, Submission, UserEntity,
};
use crate::model::CrudRepository;
use crate::web::AuthenticatedUser;

fn new_certificate_number() -> String {
    format!(
        "CERT-{}-{}",
        Utc::now().year(),
        auth::generate_opaque_token(6).to_uppercase()
    )
}

fn grade_for(score: i32) -> &'static str {
    match score {
        90.. => "A",
        80..=89 => "B",
        70..=79 => "C",
        50..=69 => "D",
        _ => "F",
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CertificateKind {
    Course(Uuid),
    Program(Uuid),
}

impl CertificateKind {
    /// Exactly one of `course_id` / `program_id`, as the request carries
    /// them.
    pub fn from_ids(course_id: Option<Uuid>, program_id: Option<Uuid>) -> CoreResult<Self> {
        match (course_id, program_id) {
            (Some(c), None) => Ok(Self::Course(c)),
            (None, Some(p)) => Ok(Self::Program(p)),
            _ => Err(CoreError::validation(
                "exactly one of course_id and program_id must be set",
            )),
        }
    }
}

/// Issue a certificate for a course or a program. The partial unique
/// indexes turn a repeat issue into Conflict, racing writers included.
pub async fn issue(
    ctx: &EngineContext,
    student_id: Uuid,
    kind: CertificateKind,
) -> CoreResult<Certificate> {
    let actor = AuthenticatedUser::admin();
    UserEntity::find_by_id(ctx.mm(), &actor, student_id)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::User))?;

    let (course_id, program_id, final_score, metadata, subject) = match kind {
        CertificateKind::Course(course_id) => {
            let course = Course::find_by_id(ctx.mm(), &actor, course_id)
                .await?
                .ok_or(CoreError::NotFound(ResourceType::Course))?;

            let stats = Submission::stats_for(ctx.mm(), student_id, course_id).await?;
            let modules = Course::module_count(ctx.mm(), course_id).await?;
            let score = stats.average_score.round() as i32;
            let metadata = serde_json::json!({
                "course_title": course.title(),
                "module_count": modules,
                "graded_submissions": stats.graded_count,
                "average_score": stats.average_score,
                "estimated_hours": course.estimated_hours(),
            });
            (
                Some(course_id),
                None,
                score,
                metadata,
                course.title().to_string(),
            )
        }
        CertificateKind::Program(program_id) => {
            let program = Program::find_by_id(ctx.mm(), &actor, program_id)
                .await?
                .ok_or(CoreError::NotFound(ResourceType::Program))?;

            // The snapshot on the enrollment, not the live catalog: the
            // certificate records what the student actually went through.
            let enrollment = Enrollment::find_by_pair(ctx.mm(), student_id, program_id)
                .await?
                .ok_or(CoreError::NotFound(ResourceType::Enrollment))?;

            // Every course in the live catalog must satisfy its criteria,
            // including courses added after the enrollment snapshot.
            if !completion::is_program_complete(ctx, student_id, program_id).await? {
                return Err(CoreError::validation(
                    "program completion criteria are not met",
                ));
            }

            let entries = enrollment.courses_progress();
            let completed = entries
                .iter()
                .filter(|e| e.status == EnrollmentStatus::Completed)
                .count();
            let score = if entries.is_empty() { 100 } else { 100 * completed as i32 / entries.len() as i32 };
            let metadata = serde_json::json!({
                "program_title": program.title(),
                "total_courses": entries.len(),
                "completed_courses": completed,
                "enrollment_status": enrollment.status().as_str(),
            });
            (
                None,
                Some(program_id),
                score,
                metadata,
                program.title().to_string(),
            )
        }
    };

    let certificate = Certificate::insert(
        ctx.mm(),
        CertificateCreate {
            student_id,
            course_id,
            program_id,
            certificate_number: new_certificate_number(),
            verification_code: auth::generate_opaque_token(12),
            grade: Some(grade_for(final_score).to_string()),
            final_score: Some(final_score),
            pdf_url: None,
            metadata,
        },
    )
    .await
    .map_err(|e| CoreError::from_db(ResourceType::Certificate, e))?;

    ctx.notify(
        NotificationRequest::new(
            student_id,
            NotificationCategory::Certificate,
            "Certificate issued",
            format!("Your certificate for {subject} is ready."),
        )
        .about(certificate.id(), ResourceType::Certificate),
    )
    .await;

    Ok(certificate)
}

/// ISSUED→REVOKED, exactly once. A certificate that exists but is not in
/// ISSUED answers Conflict, an unknown id NotFound.
pub async fn revoke(ctx: &EngineContext, certificate_id: Uuid) -> CoreResult<Certificate> {
    let revoked = match Certificate::revoke(ctx.mm(), certificate_id).await? {
        Some(c) => c,
        None => {
            return if Certificate::find_by_id(ctx.mm(), certificate_id).await?.is_some() {
                Err(CoreError::Conflict(ResourceType::Certificate))
            } else {
                Err(CoreError::NotFound(ResourceType::Certificate))
            };
        }
    };

    ctx.notify(
        NotificationRequest::new(
            revoked.student_id(),
            NotificationCategory::Certificate,
            "Certificate revoked",
            "One of your certificates has been revoked.",
        )
        .about(revoked.id(), ResourceType::Certificate),
    )
    .await;

    Ok(revoked)
}

/// Public verification payload. Revoked certificates still resolve, with
/// `is_valid` false; only unknown ids are NotFound.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerificationOutcome {
    pub is_valid: bool,
    #[serde(flatten)]
    pub certificate: CertificateVerificationRow,
}

pub async fn verify(ctx: &EngineContext, certificate_id: Uuid) -> CoreResult<VerificationOutcome> {
    let row = CertificateVerificationRow::find_by_id(ctx.mm(), certificate_id)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::Certificate))?;

    Ok(VerificationOutcome {
        is_valid: CertificateStatus::from(row.status.as_str()) == CertificateStatus::Issued,
        certificate: row,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_requires_exactly_one_target() {
        let c = Uuid::new_v4();
        let p = Uuid::new_v4();
        assert!(CertificateKind::from_ids(Some(c), None).is_ok());
        assert!(CertificateKind::from_ids(None, Some(p)).is_ok());
        assert!(CertificateKind::from_ids(None, None).is_err());
        assert!(CertificateKind::from_ids(Some(c), Some(p)).is_err());
    }

    #[test]
    fn grade_bands() {
        assert_eq!(grade_for(100), "A");
        assert_eq!(grade_for(90), "A");
        assert_eq!(grade_for(89), "B");
        assert_eq!(grade_for(70), "C");
        assert_eq!(grade_for(50), "D");
        assert_eq!(grade_for(49), "F");
        assert_eq!(grade_for(0), "F");
    }

    #[test]
    fn certificate_number_shape() {
        let number = new_certificate_number();
        assert!(number.starts_with("CERT-"));
        assert_ne!(number, new_certificate_number());
    }
}
