use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    domain::{CoreError, scholarship},
    model::{
        CrudRepository, ResourceType, ResourceTyped,
        entity::{Program, Scholarship, UserEntity},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::scholarships::{
            ScholarshipBulkBody, ScholarshipGenerateBody, ScholarshipPreviewQuery,
            ScholarshipPreviewResponse,
        },
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/generate", post(scholarship_generate_handler))
        .route("/bulk", post(scholarship_bulk_handler))
        .route("/preview", get(scholarship_preview_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/scholarships/generate",
    request_body = ScholarshipGenerateBody,
    description = "Generate one scholarship code",
    responses(
        (status = 201, description = "Code generated", body = Scholarship),
        (status = 400, description = "Discount out of range", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "scholarships",
    security(
        ("cookie" = [])
    )
)]
async fn scholarship_generate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ScholarshipGenerateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Scholarship::get_resource_type()));
    }

    let created = scholarship::create(state.engine(), &payload.spec()).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/scholarships/bulk",
    request_body = ScholarshipBulkBody,
    description = "Generate up to 100 codes in one call",
    responses(
        (status = 201, description = "Codes generated", body = Vec<Scholarship>),
        (status = 400, description = "Quantity or discount out of range", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "scholarships",
    security(
        ("cookie" = [])
    )
)]
async fn scholarship_bulk_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ScholarshipBulkBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(Scholarship::get_resource_type()));
    }

    let created = scholarship::bulk_generate(state.engine(), &payload.spec(), payload.quantity).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/scholarships/preview",
    description = "Validate a code against a program and preview the resulting price",
    params(
        ("code" = String, Query, description = "Scholarship code"),
        ("program_id" = uuid::Uuid, Query, description = "Program the code would apply to"),
    ),
    responses(
        (status = 200, description = "Code applies, pricing attached", body = ScholarshipPreviewResponse),
        (status = 403, description = "Code is restricted to another student", body = ErrorResponse),
        (status = 404, description = "Unknown code or program", body = ErrorResponse),
        (status = 409, description = "Code already used", body = ErrorResponse),
        (status = 422, description = "Code expired, revoked or for another program", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "scholarships",
    security(
        ("cookie" = [])
    )
)]
async fn scholarship_preview_handler(
    ctx: RequestContext,
    Query(query): Query<ScholarshipPreviewQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let admin = AuthenticatedUser::admin();
    let caller = UserEntity::find_by_id(state.pool(), &admin, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    let program = Program::find_by_id(state.pool(), &admin, query.program_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Program::get_resource_type(), e))?
        .ok_or(WebError::DomainError(CoreError::NotFound(ResourceType::Program)))?;

    let sch =
        scholarship::validate(state.engine(), &query.code, query.program_id, caller.email()).await?;

    let base = program.price_cents();
    let discount = scholarship::compute_discount(&sch, base);
    let final_price = scholarship::final_price(base, discount);

    Ok((
        StatusCode::OK,
        Json(ScholarshipPreviewResponse::new(&sch, base, discount, final_price)),
    ))
}
