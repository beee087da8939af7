use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, Page, error::DatabaseResult};
use crate::web::AuthenticatedUser;

/// Shared status enum for an enrollment and for each per-course snapshot
/// entry inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Active,
    Completed,
    Dropped,
    Suspended,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
            Self::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for EnrollmentStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "dropped" => Self::Dropped,
            "suspended" => Self::Suspended,
            _ => Self::Active,
        }
    }
}

/// One element of the `courses_progress` snapshot: the courses a program had
/// when the student enrolled. The list never grows afterwards, even if the
/// catalog does.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseProgressEntry {
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    pub lessons_completed: i32,
    pub total_lessons: i32,
    pub completion_date: Option<DateTime<Utc>>,
}

impl CourseProgressEntry {
    pub fn pending(course_id: Uuid, total_lessons: i32) -> Self {
        Self {
            course_id,
            status: EnrollmentStatus::Pending,
            lessons_completed: 0,
            total_lessons,
            completion_date: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Enrollment {
    id: Uuid,
    student_id: Uuid,
    program_id: Uuid,
    status: String,
    enrollment_date: DateTime<Utc>,
    completion_date: Option<DateTime<Utc>>,
    cohort: Option<String>,
    notes: Option<String>,
    #[schema(value_type = Vec<CourseProgressEntry>)]
    courses_progress: Json<Vec<CourseProgressEntry>>,
}

#[derive(Debug)]
pub struct EnrollmentCreate {
    pub student_id: Uuid,
    pub program_id: Uuid,
    pub cohort: Option<String>,
    pub notes: Option<String>,
    pub courses_progress: Vec<CourseProgressEntry>,
}

impl ResourceTyped for Enrollment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Enrollment
    }
}

impl Enrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn program_id(&self) -> Uuid {
        self.program_id
    }

    pub fn status(&self) -> EnrollmentStatus {
        EnrollmentStatus::from(self.status.as_str())
    }

    pub fn enrollment_date(&self) -> DateTime<Utc> {
        self.enrollment_date
    }

    pub fn completion_date(&self) -> Option<DateTime<Utc>> {
        self.completion_date
    }

    pub fn cohort(&self) -> Option<&str> {
        self.cohort.as_deref()
    }

    pub fn courses_progress(&self) -> &[CourseProgressEntry] {
        &self.courses_progress.0
    }

    pub fn snapshot_course_ids(&self) -> Vec<Uuid> {
        self.courses_progress.0.iter().map(|e| e.course_id).collect()
    }
}

impl Enrollment {
    /// Insert with status ACTIVE. The (student_id, program_id) unique index
    /// is the real duplicate guard; an application-level existence check ran
    /// before this, but two concurrent writers are decided here.
    pub async fn insert(mm: &ModelManager, data: EnrollmentCreate) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO enrollments (id, student_id, program_id, status, cohort, notes, courses_progress)
            VALUES ($1,$2,$3,'active',$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.student_id)
        .bind(data.program_id)
        .bind(&data.cohort)
        .bind(&data.notes)
        .bind(Json(&data.courses_progress))
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM enrollments WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_by_pair(
        mm: &ModelManager,
        student_id: Uuid,
        program_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM enrollments WHERE student_id = $1 AND program_id = $2")
                .bind(student_id)
                .bind(program_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    /// Capacity = PENDING + ACTIVE enrollments, compared against the
    /// program's optional limit.
    pub async fn occupancy(mm: &ModelManager, program_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE program_id = $1 AND status IN ('pending','active')",
        )
        .bind(program_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    /// Guarded status transition: only flips if the row is still in
    /// `expected`. Returns the updated row, or None if another writer won.
    pub async fn cas_status(
        mm: &ModelManager,
        id: Uuid,
        expected: EnrollmentStatus,
        next: EnrollmentStatus,
        completion_date: Option<DateTime<Utc>>,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            r#"
            UPDATE enrollments
            SET status = $3, completion_date = COALESCE($4, completion_date)
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(completion_date)
        .fetch_optional(mm.executor())
        .await?;

        Ok(result)
    }

    /// Rewrite the snapshot list, optionally flipping the parent status and
    /// stamping the completion date in the same statement.
    pub async fn update_snapshot(
        mm: &ModelManager,
        id: Uuid,
        entries: &[CourseProgressEntry],
        parent: Option<(EnrollmentStatus, DateTime<Utc>)>,
    ) -> DatabaseResult<Option<Self>> {
        let result = match parent {
            Some((status, completed)) => {
                sqlx::query_as(
                    r#"
                    UPDATE enrollments
                    SET courses_progress = $2, status = $3, completion_date = $4
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(Json(entries))
                .bind(status.as_str())
                .bind(completed)
                .fetch_optional(mm.executor())
                .await?
            }
            None => {
                sqlx::query_as(
                    "UPDATE enrollments SET courses_progress = $2 WHERE id = $1 RETURNING *",
                )
                .bind(id)
                .bind(Json(entries))
                .fetch_optional(mm.executor())
                .await?
            }
        };

        Ok(result)
    }

    pub async fn delete(self, mm: &ModelManager) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    pub async fn page_by_program(
        mm: &ModelManager,
        program_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Page<Self>> {
        let items = sqlx::query_as(
            "SELECT * FROM enrollments WHERE program_id = $1 ORDER BY enrollment_date LIMIT $2 OFFSET $3",
        )
        .bind(program_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE program_id = $1")
            .bind(program_id)
            .fetch_one(mm.executor())
            .await?;

        Ok(Page::new(items, total, limit, offset))
    }
}

#[async_trait]
impl HasOwner for Enrollment {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}
