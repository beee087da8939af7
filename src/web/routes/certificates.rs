use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    domain::certificate::{self, CertificateKind, VerificationOutcome},
    model::{ResourceTyped, entity::Certificate},
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult,
        dto::certificates::CertificateIssueBody, error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/", post(certificate_issue_handler))
        .route("/{id}/revoke", post(certificate_revoke_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    // Verification is public by design: anyone holding a certificate id can
    // check it without an account.
    Router::new()
        .route("/{id}/verify", get(certificate_verify_handler))
        .merge(protected)
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/certificates/",
    request_body = CertificateIssueBody,
    description = "Issue a course or program certificate",
    responses(
        (status = 201, description = "Certificate issued", body = Certificate),
        (status = 400, description = "Exactly one of course_id / program_id required", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Student, course, program or enrollment not found", body = ErrorResponse),
        (status = 409, description = "Certificate already issued for this pair", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "certificates",
    security(
        ("cookie" = [])
    )
)]
async fn certificate_issue_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CertificateIssueBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Certificate::get_resource_type()));
    }

    let kind = CertificateKind::from_ids(payload.course_id, payload.program_id)?;
    let issued = certificate::issue(state.engine(), payload.student_id, kind).await?;

    Ok((StatusCode::CREATED, Json(issued)))
}

#[utoipa::path(
    post,
    path = "/api/v1/certificates/{id}/revoke",
    params(
        ("id" = Uuid, Path, description = "Certificate id")
    ),
    responses(
        (status = 200, description = "Certificate revoked", body = Certificate),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Certificate not found", body = ErrorResponse),
        (status = 409, description = "Certificate is not in ISSUED", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "certificates",
    security(
        ("cookie" = [])
    )
)]
async fn certificate_revoke_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Certificate::get_resource_type()));
    }

    let revoked = certificate::revoke(state.engine(), id).await?;

    Ok((StatusCode::OK, Json(revoked)))
}

#[utoipa::path(
    get,
    path = "/api/v1/certificates/{id}/verify",
    description = "Public verification endpoint, no authentication required",
    params(
        ("id" = Uuid, Path, description = "Certificate id")
    ),
    responses(
        (status = 200, description = "Certificate resolved; check is_valid", body = VerificationOutcome),
        (status = 404, description = "Certificate not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "certificates"
)]
async fn certificate_verify_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let outcome = certificate::verify(state.engine(), id).await?;

    Ok((StatusCode::OK, Json(outcome)))
}
