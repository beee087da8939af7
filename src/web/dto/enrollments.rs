use serde::Deserialize;
use uuid::Uuid;

use crate::domain::enrollment::EnrollOptions;
use crate::model::entity::EnrollmentStatus;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EnrollmentCreateBody {
    pub student_id: Uuid,
    pub program_id: Uuid,
    pub cohort: Option<String>,
    pub notes: Option<String>,
    pub scholarship_code: Option<String>,
    pub payment_method: Option<String>,
}

impl EnrollmentCreateBody {
    pub fn options(&self) -> EnrollOptions {
        EnrollOptions {
            cohort: self.cohort.clone(),
            notes: self.notes.clone(),
            scholarship_code: self.scholarship_code.clone(),
            payment_method: self.payment_method.clone(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BulkEnrollBody {
    pub student_ids: Vec<Uuid>,
    pub program_id: Uuid,
    pub cohort: Option<String>,
    pub notes: Option<String>,
}

impl BulkEnrollBody {
    pub fn options(&self) -> EnrollOptions {
        EnrollOptions {
            cohort: self.cohort.clone(),
            notes: self.notes.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EmailEnrollBody {
    pub emails: Vec<String>,
    pub program_id: Uuid,
    #[serde(default)]
    pub create_missing_users: bool,
    pub cohort: Option<String>,
    pub notes: Option<String>,
}

impl EmailEnrollBody {
    pub fn options(&self) -> EnrollOptions {
        EnrollOptions {
            cohort: self.cohort.clone(),
            notes: self.notes.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StatusUpdateBody {
    pub status: EnrollmentStatus,
}
