//! Discount code validation, arithmetic and one-time redemption.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::domain::{CoreError, CoreResult, EngineContext};
use crate::model::ResourceType;
use crate::model::entity::{DiscountType, Scholarship, ScholarshipCreate, ScholarshipStatus};

/// Unambiguous charset: no 0/O or 1/I lookalikes.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_SUFFIX_LEN: usize = 8;
const CODE_RETRIES: usize = 5;

pub const MAX_BULK_QUANTITY: i64 = 100;

pub fn new_code(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect();
    format!("{prefix}-{suffix}")
}

#[derive(Debug, Clone)]
pub struct ScholarshipSpec {
    pub program_id: Uuid,
    pub prefix: String,
    pub student_email: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Create one code, retrying with a fresh suffix when the unique index on
/// `code` reports a collision.
pub async fn create(ctx: &EngineContext, spec: &ScholarshipSpec) -> CoreResult<Scholarship> {
    if spec.discount_value < 0 {
        return Err(CoreError::validation("discount value must be non-negative"));
    }
    if spec.discount_type == DiscountType::Percentage && spec.discount_value > 100 {
        return Err(CoreError::validation("percentage discount cannot exceed 100"));
    }

    let mut last_err = None;
    for _ in 0..CODE_RETRIES {
        let data = ScholarshipCreate {
            code: new_code(&spec.prefix),
            program_id: spec.program_id,
            student_email: spec.student_email.clone(),
            discount_type: spec.discount_type,
            discount_value: spec.discount_value,
            expires_at: spec.expires_at,
        };
        match Scholarship::insert(ctx.mm(), data).await {
            Ok(s) => return Ok(s),
            Err(e) if e.is_unique_violation() => {
                last_err = Some(e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Vanishingly unlikely with an 8-char suffix.
    Err(CoreError::from_db(
        ResourceType::Scholarship,
        last_err.expect("retry loop ran at least once"),
    ))
}

pub async fn bulk_generate(
    ctx: &EngineContext,
    spec: &ScholarshipSpec,
    quantity: i64,
) -> CoreResult<Vec<Scholarship>> {
    if !(1..=MAX_BULK_QUANTITY).contains(&quantity) {
        return Err(CoreError::validation(format!(
            "quantity must be within [1, {MAX_BULK_QUANTITY}]"
        )));
    }

    let mut out = Vec::with_capacity(quantity as usize);
    for _ in 0..quantity {
        out.push(create(ctx, spec).await?);
    }
    Ok(out)
}

/// All the ways a code can refuse to apply, mapped onto the error taxonomy:
/// unknown code → NotFound, wrong program / expired → Unavailable, already
/// used → Conflict, email restriction → Forbidden.
pub async fn validate(
    ctx: &EngineContext,
    code: &str,
    program_id: Uuid,
    student_email: &str,
) -> CoreResult<Scholarship> {
    let sch = Scholarship::find_by_code(ctx.mm(), code)
        .await?
        .ok_or(CoreError::NotFound(ResourceType::Scholarship))?;

    if sch.program_id() != program_id {
        return Err(CoreError::unavailable(
            "scholarship code does not apply to this program",
        ));
    }

    match sch.status() {
        ScholarshipStatus::Active => {}
        ScholarshipStatus::Used => return Err(CoreError::Conflict(ResourceType::Scholarship)),
        ScholarshipStatus::Expired | ScholarshipStatus::Revoked => {
            return Err(CoreError::unavailable("scholarship code is no longer active"));
        }
    }

    if let Some(expires_at) = sch.expires_at() {
        if expires_at <= Utc::now() {
            return Err(CoreError::unavailable("scholarship code has expired"));
        }
    }

    if let Some(restricted_to) = sch.student_email() {
        if restricted_to != student_email {
            return Err(CoreError::Forbidden);
        }
    }

    Ok(sch)
}

/// Discount amount in minor units, always within `[0, base_price]`.
pub fn compute_discount(sch: &Scholarship, base_price: i64) -> i64 {
    let raw = match sch.discount_type() {
        DiscountType::Percentage => base_price * sch.discount_value() / 100,
        DiscountType::Fixed => sch.discount_value(),
    };
    raw.clamp(0, base_price)
}

pub fn final_price(base_price: i64, discount: i64) -> i64 {
    (base_price - discount).max(0)
}

/// The one-time ACTIVE→USED redemption. A second call finds the CAS guard
/// already tripped and fails with Conflict; no second discount anywhere.
pub async fn mark_used(ctx: &EngineContext, id: Uuid, student_id: Uuid) -> CoreResult<Scholarship> {
    match Scholarship::mark_used(ctx.mm(), id, student_id).await? {
        Some(s) => Ok(s),
        None => {
            if Scholarship::find_by_id(ctx.mm(), id).await?.is_some() {
                Err(CoreError::Conflict(ResourceType::Scholarship))
            } else {
                Err(CoreError::NotFound(ResourceType::Scholarship))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(discount_type: DiscountType, value: i64) -> Scholarship {
        serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "code": "TEST-AAAAAAAA",
            "program_id": Uuid::new_v4(),
            "student_email": null,
            "discount_type": discount_type.as_str(),
            "discount_value": value,
            "status": "active",
            "expires_at": null,
            "used_by": null,
        }))
        .unwrap()
    }

    #[test]
    fn percentage_discount() {
        // 50% of 500.00
        let sch = sample(DiscountType::Percentage, 50);
        assert_eq!(compute_discount(&sch, 50_000), 25_000);
        assert_eq!(final_price(50_000, 25_000), 25_000);
    }

    #[test]
    fn full_percentage_discount_zeroes_the_price() {
        let sch = sample(DiscountType::Percentage, 100);
        assert_eq!(compute_discount(&sch, 50_000), 50_000);
        assert_eq!(final_price(50_000, 50_000), 0);
    }

    #[test]
    fn fixed_discount_is_capped_at_base_price() {
        let sch = sample(DiscountType::Fixed, 99_999);
        assert_eq!(compute_discount(&sch, 10_000), 10_000);
        assert_eq!(final_price(10_000, 10_000), 0);
    }

    #[test]
    fn discount_is_bounded_for_any_input() {
        for value in [0, 1, 50, 100] {
            for base in [0i64, 1, 999, 50_000] {
                let pct = compute_discount(&sample(DiscountType::Percentage, value), base);
                let fixed = compute_discount(&sample(DiscountType::Fixed, value), base);
                assert!((0..=base).contains(&pct));
                assert!((0..=base).contains(&fixed));
            }
        }
    }

    #[test]
    fn code_shape() {
        let code = new_code("SCHOLAR");
        assert!(code.starts_with("SCHOLAR-"));
        assert_eq!(code.len(), "SCHOLAR-".len() + CODE_SUFFIX_LEN);
        assert_ne!(code, new_code("SCHOLAR"));
    }
}
