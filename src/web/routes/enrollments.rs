use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    domain::{Ref, enrollment},
    model::{
        DatabaseError, ResourceTyped, check_access,
        entity::{Enrollment, Program},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult,
        dto::enrollments::{BulkEnrollBody, EmailEnrollBody, EnrollmentCreateBody, StatusUpdateBody},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(enrollment_create_handler).get(enrollment_list_handler))
        .route("/bulk", post(enrollment_bulk_handler))
        .route("/by-email", post(enrollment_by_email_handler))
        .route(
            "/{id}",
            get(enrollment_get_handler).delete(enrollment_delete_handler),
        )
        .route("/{id}/status", put(enrollment_status_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/enrollments/",
    request_body = EnrollmentCreateBody,
    description = "Enroll a student into a program",
    responses(
        (status = 201, description = "Enrollment created", body = Enrollment),
        (status = 402, description = "Final price is non-zero, payment breakdown attached", body = ErrorResponse),
        (status = 403, description = "Target user cannot be enrolled by you", body = ErrorResponse),
        (status = 404, description = "Program or student not found", body = ErrorResponse),
        (status = 409, description = "Student is already enrolled", body = ErrorResponse),
        (status = 422, description = "Program unpublished or full", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = [])
    )
)]
async fn enrollment_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    // Students enroll themselves; admins enroll anyone.
    if user.user_role() != UserRole::Admin && user.user_id() != payload.student_id {
        return Err(WebError::resource_forbidden(Enrollment::get_resource_type()));
    }

    let created = enrollment::create_enrollment(
        state.engine(),
        payload.student_id,
        Ref::Id(payload.program_id),
        payload.options(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/enrollments/bulk",
    request_body = BulkEnrollBody,
    description = "Enroll many students at once, one outcome per student",
    responses(
        (status = 200, description = "Batch processed", body = enrollment::BatchOutcome),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = [])
    )
)]
async fn enrollment_bulk_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<BulkEnrollBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Enrollment::get_resource_type()));
    }

    let outcome = enrollment::bulk_enroll(
        state.engine(),
        &payload.student_ids,
        payload.program_id,
        &payload.options(),
    )
    .await?;

    Ok((StatusCode::OK, Json(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/enrollments/by-email",
    request_body = EmailEnrollBody,
    description = "Enroll by email address, optionally provisioning accounts",
    responses(
        (status = 200, description = "Batch processed", body = enrollment::BatchOutcome),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = [])
    )
)]
async fn enrollment_by_email_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<EmailEnrollBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Enrollment::get_resource_type()));
    }

    let outcome = enrollment::enroll_by_email(
        state.engine(),
        &payload.emails,
        payload.program_id,
        payload.create_missing_users,
        &payload.options(),
    )
    .await?;

    Ok((StatusCode::OK, Json(outcome)))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/{id}",
    params(
        ("id" = Uuid, Path, description = "Enrollment id")
    ),
    responses(
        (status = 200, description = "Enrollment found", body = Enrollment),
        (status = 403, description = "Not your enrollment", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = [])
    )
)]
async fn enrollment_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let found = Enrollment::find_by_id(state.pool(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Enrollment::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| {
            if let DatabaseError::Forbidden = e {
                WebError::resource_forbidden(Enrollment::get_resource_type())
            } else {
                WebError::resource_fetch_error(Enrollment::get_resource_type(), e)
            }
        })?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/enrollments/{id}/status",
    request_body = StatusUpdateBody,
    params(
        ("id" = Uuid, Path, description = "Enrollment id")
    ),
    responses(
        (status = 200, description = "Status updated", body = Enrollment),
        (status = 400, description = "Transition not allowed from the current status", body = ErrorResponse),
        (status = 403, description = "You may not request this transition", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 409, description = "Another update won the race", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = [])
    )
)]
async fn enrollment_status_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let updated = enrollment::update_status(state.engine(), id, payload.status, user).await?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/enrollments/{id}",
    description = "Remove an enrollment with its progress and counter cascade",
    params(
        ("id" = Uuid, Path, description = "Enrollment id")
    ),
    responses(
        (status = 200, description = "Enrollment deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = [])
    )
)]
async fn enrollment_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Enrollment::get_resource_type()));
    }

    enrollment::delete_enrollment(state.engine(), id).await?;

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EnrollmentListQuery {
    program_id: Uuid,
    limit: i64,
    offset: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/",
    params(
        ("program_id" = Uuid, Query, description = "Program to list enrollments of"),
        ("limit" = i64, Query, description = "Page size"),
        ("offset" = i64, Query, description = "Page offset"),
    ),
    responses(
        (status = 200, description = "Requested page", body = crate::model::Page<Enrollment>),
        (status = 403, description = "Students cannot list enrollments", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollments",
    security(
        ("cookie" = [])
    )
)]
async fn enrollment_list_handler(
    ctx: RequestContext,
    Query(query): Query<EnrollmentListQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() == UserRole::Student {
        return Err(WebError::resource_forbidden(Enrollment::get_resource_type()));
    }

    let page = Enrollment::page_by_program(state.pool(), query.program_id, query.limit, query.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(Program::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(page)))
}
