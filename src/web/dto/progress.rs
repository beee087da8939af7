use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{ProgressDoc, SubmissionCreate};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmissionGradeBody {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub score: i32,
}

impl From<SubmissionGradeBody> for SubmissionCreate {
    fn from(body: SubmissionGradeBody) -> Self {
        Self {
            student_id: body.student_id,
            course_id: body.course_id,
            title: body.title,
            score: body.score,
        }
    }
}

/// Flat roll-up for clients that do not want the full module tree.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProgressSummaryResponse {
    pub scope_id: Uuid,
    pub overall_progress: f64,
    pub completed_lessons: i32,
    pub total_lessons: i32,
    pub completed_assessments: i32,
    pub average_score: f64,
}

impl From<&ProgressDoc> for ProgressSummaryResponse {
    fn from(doc: &ProgressDoc) -> Self {
        Self {
            scope_id: doc.scope_id(),
            overall_progress: doc.overall_progress(),
            completed_lessons: doc.completed_lessons(),
            total_lessons: doc.total_lessons(),
            completed_assessments: doc.completed_assessments(),
            average_score: doc.average_score(),
        }
    }
}
