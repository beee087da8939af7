use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    program_id: Uuid,
    title: String,
    instructor_id: Option<Uuid>,
    minimum_quiz_score: i32,
    required_projects: i32,
    capstone_required: bool,
    estimated_hours: i32,
    current_enrollment: i32,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreate {
    pub program_id: Uuid,
    pub title: String,
    pub instructor_id: Option<Uuid>,
    pub minimum_quiz_score: i32,
    pub required_projects: i32,
    pub capstone_required: bool,
    pub estimated_hours: i32,
    pub order_index: Option<i32>,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn program_id(&self) -> Uuid {
        self.program_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn instructor_id(&self) -> Option<Uuid> {
        self.instructor_id
    }

    pub fn minimum_quiz_score(&self) -> i32 {
        self.minimum_quiz_score
    }

    pub fn required_projects(&self) -> i32 {
        self.required_projects
    }

    pub fn capstone_required(&self) -> bool {
        self.capstone_required
    }

    pub fn estimated_hours(&self) -> i32 {
        self.estimated_hours
    }

    pub fn current_enrollment(&self) -> i32 {
        self.current_enrollment
    }
}

impl Course {
    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query("INSERT INTO courses (id, program_id, title, instructor_id, minimum_quiz_score, required_projects, capstone_required, estimated_hours, order_index) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9) RETURNING id")
            .bind(Uuid::new_v4())
            .bind(data.program_id)
            .bind(&data.title)
            .bind(data.instructor_id)
            .bind(data.minimum_quiz_score)
            .bind(data.required_projects)
            .bind(data.capstone_required)
            .bind(data.estimated_hours)
            .bind(data.order_index.unwrap_or(0))
            .fetch_one(mm.executor())
            .await?;

        let id = result.try_get("id")?;
        Ok(Course {
            id,
            program_id: data.program_id,
            title: data.title,
            instructor_id: data.instructor_id,
            minimum_quiz_score: data.minimum_quiz_score,
            required_projects: data.required_projects,
            capstone_required: data.capstone_required,
            estimated_hours: data.estimated_hours,
            current_enrollment: 0,
            order_index: data.order_index.unwrap_or(0),
        })
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }

        Ok(Some(result?))
    }

    /// Courses of a program in catalog order. This is the set snapshotted
    /// into `courses_progress` at enrollment time.
    pub async fn all_by_program(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        program_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM courses WHERE program_id = $1 ORDER BY order_index")
                .bind(program_id)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    /// Transitive lesson count through the course's modules, from the live
    /// catalog.
    pub async fn lesson_total(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(l.id)
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn module_count(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }

    pub async fn adjust_enrollment_counters(
        mm: &ModelManager,
        course_ids: &[Uuid],
        delta: i32,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE courses SET current_enrollment = current_enrollment + $2 WHERE id = ANY($1)",
        )
        .bind(course_ids)
        .bind(delta)
        .execute(mm.executor())
        .await?;
        Ok(())
    }

    /// Distinct instructors owning courses in a program, for fan-out
    /// notifications.
    pub async fn instructors_of_program(
        mm: &ModelManager,
        program_id: Uuid,
    ) -> DatabaseResult<Vec<Uuid>> {
        let result: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT instructor_id FROM courses WHERE program_id = $1 AND instructor_id IS NOT NULL",
        )
        .bind(program_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}
