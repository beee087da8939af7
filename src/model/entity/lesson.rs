use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    module_id: Uuid,
    title: String,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonCreate {
    pub module_id: Uuid,
    pub title: String,
    pub order_index: Option<i32>,
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn module_id(&self) -> Uuid {
        self.module_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

impl Lesson {
    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query(
            "INSERT INTO lessons (id, module_id, title, order_index) VALUES ($1,$2,$3,$4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(data.module_id)
        .bind(&data.title)
        .bind(data.order_index.unwrap_or(0))
        .fetch_one(mm.executor())
        .await?;

        let id = result.try_get("id")?;
        Ok(Lesson {
            id,
            module_id: data.module_id,
            title: data.title,
            order_index: data.order_index.unwrap_or(0),
        })
    }
}

// Utils

/// Where a lesson sits in the catalog tree. Progress events arrive with only
/// a lesson id; this row walks it up to the owning course and program.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct LessonLocator {
    pub lesson_id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub program_id: Uuid,
}

impl LessonLocator {
    pub async fn find(mm: &ModelManager, lesson_id: Uuid) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT
                l.id AS lesson_id,
                m.id AS module_id,
                c.id AS course_id,
                c.program_id AS program_id
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            JOIN courses c ON c.id = m.course_id
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }
}
