use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};

/// Durable inbox row behind the notification gateway. Delivery to a live
/// socket is someone else's job; the engine only ever appends here.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Notification {
    id: Uuid,
    target_user_id: Uuid,
    category: String,
    title: String,
    message: String,
    related_entity_id: Option<Uuid>,
    related_entity_type: Option<String>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NotificationCreate {
    pub target_user_id: Uuid,
    pub category: String,
    pub title: String,
    pub message: String,
    pub related_entity_id: Option<Uuid>,
    pub related_entity_type: Option<String>,
}

impl ResourceTyped for Notification {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Notification
    }
}

impl Notification {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target_user_id(&self) -> Uuid {
        self.target_user_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Notification {
    pub async fn insert(mm: &ModelManager, data: NotificationCreate) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO notifications
                (id, target_user_id, category, title, message, related_entity_id, related_entity_type)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.target_user_id)
        .bind(&data.category)
        .bind(&data.title)
        .bind(&data.message)
        .bind(data.related_entity_id)
        .bind(&data.related_entity_type)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn all_for_user(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM notifications WHERE target_user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}
