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
pub enum CertificateStatus {
    Pending,
    Issued,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Issued => "issued",
            Self::Revoked => "revoked",
        }
    }
}

impl From<&str> for CertificateStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "revoked" => Self::Revoked,
            _ => Self::Issued,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Certificate {
    id: Uuid,
    student_id: Uuid,
    course_id: Option<Uuid>,
    program_id: Option<Uuid>,
    certificate_number: String,
    verification_code: String,
    status: String,
    grade: Option<String>,
    final_score: Option<i32>,
    pdf_url: Option<String>,
    #[schema(value_type = Object)]
    metadata: Json<serde_json::Value>,
    issued_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CertificateCreate {
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub program_id: Option<Uuid>,
    pub certificate_number: String,
    pub verification_code: String,
    pub grade: Option<String>,
    pub final_score: Option<i32>,
    pub pdf_url: Option<String>,
    pub metadata: serde_json::Value,
}

impl ResourceTyped for Certificate {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Certificate
    }
}

impl Certificate {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn course_id(&self) -> Option<Uuid> {
        self.course_id
    }

    pub fn program_id(&self) -> Option<Uuid> {
        self.program_id
    }

    pub fn certificate_number(&self) -> &str {
        &self.certificate_number
    }

    pub fn status(&self) -> CertificateStatus {
        CertificateStatus::from(self.status.as_str())
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata.0
    }
}

impl Certificate {
    /// The partial unique indexes on (student, course) and (student,
    /// program) are the issuance guard; concurrent double-issue is decided
    /// by the database, not by a pre-check.
    pub async fn insert(mm: &ModelManager, data: CertificateCreate) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            INSERT INTO certificates
                (id, student_id, course_id, program_id, certificate_number,
                 verification_code, status, grade, final_score, pdf_url, metadata)
            VALUES ($1,$2,$3,$4,$5,$6,'issued',$7,$8,$9,$10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.student_id)
        .bind(data.course_id)
        .bind(data.program_id)
        .bind(&data.certificate_number)
        .bind(&data.verification_code)
        .bind(&data.grade)
        .bind(data.final_score)
        .bind(&data.pdf_url)
        .bind(Json(&data.metadata))
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM certificates WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// ISSUED→REVOKED exactly once; None when the row was not in ISSUED.
    pub async fn revoke(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "UPDATE certificates SET status = 'revoked' WHERE id = $1 AND status = 'issued' RETURNING *",
        )
        .bind(id)
        .fetch_optional(mm.executor())
        .await?;

        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Certificate {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.student_id)
    }
}

// Utils

/// Public verification view: joins out the display names but exposes
/// nothing about the issuer beyond what is stored on the certificate.
#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct CertificateVerificationRow {
    pub certificate_number: String,
    pub status: String,
    pub student_name: String,
    pub course_name: Option<String>,
    pub program_name: Option<String>,
    pub completion_date: Option<DateTime<Utc>>,
    pub issued_at: DateTime<Utc>,
    pub grade: Option<String>,
    pub final_score: Option<i32>,
    #[schema(value_type = Object)]
    pub metadata: Json<serde_json::Value>,
}

impl CertificateVerificationRow {
    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT
                ct.certificate_number,
                ct.status,
                u.full_name AS student_name,
                c.title AS course_name,
                p.title AS program_name,
                e.completion_date,
                ct.issued_at,
                ct.grade,
                ct.final_score,
                ct.metadata
            FROM certificates ct
            JOIN users u ON u.id = ct.student_id
            LEFT JOIN courses c ON c.id = ct.course_id
            LEFT JOIN programs p ON p.id = ct.program_id
            LEFT JOIN enrollments e
                ON e.student_id = ct.student_id
               AND e.program_id = COALESCE(ct.program_id, c.program_id)
            WHERE ct.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }
}
