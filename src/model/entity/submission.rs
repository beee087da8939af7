use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};

/// A graded assessment submission. These rows feed the completion proxy:
/// average score and passing count per (student, course).
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Submission {
    id: Uuid,
    student_id: Uuid,
    course_id: Uuid,
    title: String,
    score: i32,
    status: String,
    graded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmissionCreate {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub score: i32,
}

impl ResourceTyped for Submission {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Submission
    }
}

impl Submission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn score(&self) -> i32 {
        self.score
    }
}

/// Roll-up used by CompletionEvaluator and certificate metadata.
#[derive(Debug, FromRow)]
pub struct SubmissionStats {
    pub graded_count: i64,
    pub average_score: f64,
    pub passing_count: i64,
}

impl Submission {
    pub async fn insert(mm: &ModelManager, data: SubmissionCreate) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO submissions (id, student_id, course_id, title, score, status)
            VALUES ($1,$2,$3,$4,$5,'graded')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.student_id)
        .bind(data.course_id)
        .bind(&data.title)
        .bind(data.score)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    /// Submissions scoring at least 50 count as passing projects.
    pub async fn stats_for(
        mm: &ModelManager,
        student_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<SubmissionStats> {
        let result = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS graded_count,
                COALESCE(AVG(score), 0)::DOUBLE PRECISION AS average_score,
                COUNT(*) FILTER (WHERE score >= 50) AS passing_count
            FROM submissions
            WHERE student_id = $1 AND course_id = $2 AND status = 'graded'
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }
}
