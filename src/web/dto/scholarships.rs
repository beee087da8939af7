use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::PricingBreakdown;
use crate::domain::scholarship::ScholarshipSpec;
use crate::model::entity::{DiscountType, Scholarship};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ScholarshipGenerateBody {
    pub program_id: Uuid,
    pub prefix: String,
    pub student_email: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ScholarshipGenerateBody {
    pub fn spec(&self) -> ScholarshipSpec {
        ScholarshipSpec {
            program_id: self.program_id,
            prefix: self.prefix.clone(),
            student_email: self.student_email.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ScholarshipBulkBody {
    pub quantity: i64,
    pub program_id: Uuid,
    pub prefix: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ScholarshipBulkBody {
    pub fn spec(&self) -> ScholarshipSpec {
        ScholarshipSpec {
            program_id: self.program_id,
            prefix: self.prefix.clone(),
            student_email: None,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            expires_at: self.expires_at,
        }
    }
}

/// Dry-run validation: what the code would do to the price, without
/// consuming it.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ScholarshipPreviewQuery {
    pub code: String,
    pub program_id: Uuid,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ScholarshipPreviewResponse {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub pricing: PricingBreakdown,
}

impl ScholarshipPreviewResponse {
    pub fn new(sch: &Scholarship, base_price: i64, discount: i64, final_price: i64) -> Self {
        Self {
            code: sch.code().to_string(),
            discount_type: sch.discount_type(),
            discount_value: sch.discount_value(),
            pricing: PricingBreakdown {
                original_price: base_price,
                discount_amount: discount,
                final_price,
            },
        }
    }
}
