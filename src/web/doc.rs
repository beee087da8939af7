use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct CookieAuthModifier;

impl Modify for CookieAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::account::account_signup_handler,
        crate::web::routes::account::account_signin_handler,
        crate::web::routes::account::account_list_handler,
        crate::web::routes::enrollments::enrollment_create_handler,
        crate::web::routes::enrollments::enrollment_bulk_handler,
        crate::web::routes::enrollments::enrollment_by_email_handler,
        crate::web::routes::enrollments::enrollment_get_handler,
        crate::web::routes::enrollments::enrollment_status_handler,
        crate::web::routes::enrollments::enrollment_delete_handler,
        crate::web::routes::enrollments::enrollment_list_handler,
        crate::web::routes::progress::lesson_start_handler,
        crate::web::routes::progress::lesson_complete_handler,
        crate::web::routes::progress::course_progress_handler,
        crate::web::routes::progress::submission_grade_handler,
        crate::web::routes::scholarships::scholarship_generate_handler,
        crate::web::routes::scholarships::scholarship_bulk_handler,
        crate::web::routes::scholarships::scholarship_preview_handler,
        crate::web::routes::certificates::certificate_issue_handler,
        crate::web::routes::certificates::certificate_revoke_handler,
        crate::web::routes::certificates::certificate_verify_handler,
    ),
    modifiers(&CookieAuthModifier),
)]
pub struct ApiDoc;
