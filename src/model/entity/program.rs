use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::prelude::Row;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

/// Catalog node. The engine only reads programs; authoring happens elsewhere
/// (seeded by the CLI or an external catalog service).
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Program {
    id: Uuid,
    title: String,
    price_cents: i64,
    currency: String,
    enrollment_limit: Option<i32>,
    is_published: bool,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ProgramCreate {
    pub title: String,
    pub price_cents: i64,
    pub currency: String,
    pub enrollment_limit: Option<i32>,
    pub is_published: bool,
}

impl ResourceTyped for Program {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Program
    }
}

impl Program {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn enrollment_limit(&self) -> Option<i32> {
        self.enrollment_limit
    }

    pub fn is_published(&self) -> bool {
        self.is_published
    }
}

impl Program {
    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ProgramCreate,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query("INSERT INTO programs (id, title, price_cents, currency, enrollment_limit, is_published) VALUES ($1,$2,$3,$4,$5,$6) RETURNING id")
            .bind(Uuid::new_v4())
            .bind(&data.title)
            .bind(data.price_cents)
            .bind(&data.currency)
            .bind(data.enrollment_limit)
            .bind(data.is_published)
            .fetch_one(mm.executor())
            .await?;

        let id = result.try_get("id")?;
        Ok(Program {
            id,
            title: data.title,
            price_cents: data.price_cents,
            currency: data.currency,
            enrollment_limit: data.enrollment_limit,
            is_published: data.is_published,
        })
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM programs WHERE id = $1")
            .bind(id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }

        Ok(Some(result?))
    }
}
