use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl From<&str> for DiscountType {
    fn from(value: &str) -> Self {
        match value {
            "fixed" => Self::Fixed,
            _ => Self::Percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScholarshipStatus {
    Active,
    Used,
    Expired,
    Revoked,
}

impl ScholarshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

impl From<&str> for ScholarshipStatus {
    fn from(value: &str) -> Self {
        match value {
            "used" => Self::Used,
            "expired" => Self::Expired,
            "revoked" => Self::Revoked,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Scholarship {
    id: Uuid,
    code: String,
    program_id: Uuid,
    student_email: Option<String>,
    discount_type: String,
    discount_value: i64,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    used_by: Option<Uuid>,
}

#[derive(Debug)]
pub struct ScholarshipCreate {
    pub code: String,
    pub program_id: Uuid,
    pub student_email: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResourceTyped for Scholarship {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Scholarship
    }
}

impl Scholarship {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn program_id(&self) -> Uuid {
        self.program_id
    }

    pub fn student_email(&self) -> Option<&str> {
        self.student_email.as_deref()
    }

    pub fn discount_type(&self) -> DiscountType {
        DiscountType::from(self.discount_type.as_str())
    }

    pub fn discount_value(&self) -> i64 {
        self.discount_value
    }

    pub fn status(&self) -> ScholarshipStatus {
        ScholarshipStatus::from(self.status.as_str())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn used_by(&self) -> Option<Uuid> {
        self.used_by
    }
}

impl Scholarship {
    /// Insert a fresh ACTIVE record. A duplicate code trips the unique index
    /// and surfaces as a unique violation for the caller to retry on.
    pub async fn insert(mm: &ModelManager, data: ScholarshipCreate) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO scholarships (id, code, program_id, student_email, discount_type, discount_value, status, expires_at)
            VALUES ($1,$2,$3,$4,$5,$6,'active',$7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.code)
        .bind(data.program_id)
        .bind(&data.student_email)
        .bind(data.discount_type.as_str())
        .bind(data.discount_value)
        .bind(data.expires_at)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn find_by_code(mm: &ModelManager, code: &str) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM scholarships WHERE code = $1")
            .bind(code)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM scholarships WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// The one-time ACTIVE→USED redemption. Guarded on status so a second
    /// concurrent caller gets None back instead of a double redemption.
    pub async fn mark_used(
        mm: &ModelManager,
        id: Uuid,
        student_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            r#"
            UPDATE scholarships
            SET status = 'used', used_by = $2
            WHERE id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(student_id)
        .fetch_optional(mm.executor())
        .await?;

        Ok(result)
    }
}
