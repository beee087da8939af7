use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Module {
    id: Uuid,
    course_id: Uuid,
    title: String,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ModuleCreate {
    pub course_id: Uuid,
    pub title: String,
    pub order_index: Option<i32>,
}

impl ResourceTyped for Module {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Module
    }
}

impl Module {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

impl Module {
    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ModuleCreate,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query(
            "INSERT INTO modules (id, course_id, title, order_index) VALUES ($1,$2,$3,$4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(&data.title)
        .bind(data.order_index.unwrap_or(0))
        .fetch_one(mm.executor())
        .await?;

        let id = result.try_get("id")?;
        Ok(Module {
            id,
            course_id: data.course_id,
            title: data.title,
            order_index: data.order_index.unwrap_or(0),
        })
    }

    /// Live catalog lesson count for one module. Module percentages divide
    /// by this, not by a cached total, so catalog edits show through.
    pub async fn lesson_count(mm: &ModelManager, module_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE module_id = $1")
            .bind(module_id)
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}
