use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProgressScope {
    Course,
    Program,
}

impl ProgressScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Program => "program",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonState {
    pub status: LessonStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for LessonState {
    fn default() -> Self {
        Self {
            status: LessonStatus::NotStarted,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Nested per-module progress. Lessons are a keyed map (not an array scanned
/// linearly), so repeat events can never create duplicate entries; BTreeMap
/// keeps serialization order stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleProgress {
    pub lessons: BTreeMap<Uuid, LessonState>,
    pub completion_percentage: f64,
}

impl ModuleProgress {
    pub fn completed_lessons(&self) -> i64 {
        self.lessons
            .values()
            .filter(|l| l.status == LessonStatus::Completed)
            .count() as i64
    }
}

pub type ModuleMap = BTreeMap<Uuid, ModuleProgress>;

/// Aggregate keyed by (student, course) or (student, program).
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ProgressDoc {
    id: Uuid,
    student_id: Uuid,
    scope: String,
    scope_id: Uuid,
    #[schema(value_type = Object)]
    modules: Json<ModuleMap>,
    overall_progress: f64,
    completed_lessons: i32,
    total_lessons: i32,
    total_courses: i32,
    completed_assessments: i32,
    total_assessments: i32,
    average_score: f64,
    total_time_spent_secs: i64,
    last_accessed_at: DateTime<Utc>,
}

impl ResourceTyped for ProgressDoc {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Progress
    }
}

impl ProgressDoc {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn scope_id(&self) -> Uuid {
        self.scope_id
    }

    pub fn modules(&self) -> &ModuleMap {
        &self.modules.0
    }

    pub fn modules_mut(&mut self) -> &mut ModuleMap {
        &mut self.modules.0
    }

    pub fn overall_progress(&self) -> f64 {
        self.overall_progress
    }

    pub fn completed_lessons(&self) -> i32 {
        self.completed_lessons
    }

    pub fn total_lessons(&self) -> i32 {
        self.total_lessons
    }

    pub fn completed_assessments(&self) -> i32 {
        self.completed_assessments
    }

    pub fn average_score(&self) -> f64 {
        self.average_score
    }

    pub fn set_totals(&mut self, completed: i32, total: i32, overall: f64) {
        self.completed_lessons = completed;
        self.total_lessons = total;
        self.overall_progress = overall;
    }
}

impl ProgressDoc {
    pub async fn find_scope(
        mm: &ModelManager,
        student_id: Uuid,
        scope: ProgressScope,
        scope_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM progress WHERE student_id = $1 AND scope = $2 AND scope_id = $3",
        )
        .bind(student_id)
        .bind(scope.as_str())
        .bind(scope_id)
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    /// Find-or-create with upsert semantics: a lost insert race falls back
    /// to the row the other writer created.
    pub async fn ensure(
        mm: &ModelManager,
        student_id: Uuid,
        scope: ProgressScope,
        scope_id: Uuid,
        total_lessons: i32,
        total_courses: i32,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO progress (id, student_id, scope, scope_id, total_lessons, total_courses)
            VALUES ($1,$2,$3,$4,$5,$6)
            ON CONFLICT (student_id, scope, scope_id) DO UPDATE SET last_accessed_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(scope.as_str())
        .bind(scope_id)
        .bind(total_lessons)
        .bind(total_courses)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    /// Persist the nested module map and the recomputed roll-up counters.
    pub async fn save_lesson_state(&self, mm: &ModelManager) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE progress
            SET modules = $2,
                overall_progress = $3,
                completed_lessons = $4,
                total_lessons = $5,
                last_accessed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(&self.modules)
        .bind(self.overall_progress)
        .bind(self.completed_lessons)
        .bind(self.total_lessons)
        .execute(mm.executor())
        .await?;
        Ok(())
    }

    /// Assessment counters never fail with NotFound: missing aggregates are
    /// created on the fly.
    pub async fn record_assessment(
        mm: &ModelManager,
        student_id: Uuid,
        course_id: Uuid,
        average_score: f64,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO progress (id, student_id, scope, scope_id, completed_assessments, total_assessments, average_score)
            VALUES ($1,$2,'course',$3,1,1,$4)
            ON CONFLICT (student_id, scope, scope_id) DO UPDATE
            SET completed_assessments = progress.completed_assessments + 1,
                total_assessments = progress.total_assessments + 1,
                average_score = $4,
                last_accessed_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(course_id)
        .bind(average_score)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn add_time_spent(
        mm: &ModelManager,
        student_id: Uuid,
        scope: ProgressScope,
        scope_id: Uuid,
        secs: i64,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE progress
            SET total_time_spent_secs = total_time_spent_secs + $4, last_accessed_at = now()
            WHERE student_id = $1 AND scope = $2 AND scope_id = $3
            "#,
        )
        .bind(student_id)
        .bind(scope.as_str())
        .bind(scope_id)
        .bind(secs)
        .execute(mm.executor())
        .await?;
        Ok(())
    }

    /// Cascade for enrollment deletion: drops the program aggregate and
    /// every course aggregate from the enrollment snapshot.
    pub async fn delete_for_enrollment(
        mm: &ModelManager,
        student_id: Uuid,
        program_id: Uuid,
        course_ids: &[Uuid],
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            DELETE FROM progress
            WHERE student_id = $1
              AND ((scope = 'program' AND scope_id = $2)
                OR (scope = 'course' AND scope_id = ANY($3)))
            "#,
        )
        .bind(student_id)
        .bind(program_id)
        .bind(course_ids)
        .execute(mm.executor())
        .await?;
        Ok(())
    }

    pub async fn bump_program_lessons(
        mm: &ModelManager,
        student_id: Uuid,
        program_id: Uuid,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE progress
            SET completed_lessons = completed_lessons + 1,
                overall_progress = CASE WHEN total_lessons > 0
                    THEN LEAST(100.0, (completed_lessons + 1) * 100.0 / total_lessons)
                    ELSE 0 END,
                last_accessed_at = now()
            WHERE student_id = $1 AND scope = 'program' AND scope_id = $2
            "#,
        )
        .bind(student_id)
        .bind(program_id)
        .execute(mm.executor())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl HasOwner for ProgressDoc {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}
