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
    domain::progress,
    model::{
        ResourceTyped,
        entity::{ProgressDoc, ProgressScope, Submission},
    },
    web::{
        AppState, RequestContext, UserRole, WebError, WebResult,
        dto::progress::{ProgressSummaryResponse, SubmissionGradeBody},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/lessons/{id}/start", post(lesson_start_handler))
        .route("/lessons/{id}/complete", post(lesson_complete_handler))
        .route("/courses/{id}", get(course_progress_handler))
        .route("/submissions", post(submission_grade_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/progress/lessons/{id}/start",
    description = "Mark a lesson as started for the current user",
    params(
        ("id" = Uuid, Path, description = "Lesson id")
    ),
    responses(
        (status = 200, description = "Progress updated", body = ProgressDoc),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn lesson_start_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let doc = progress::on_lesson_started(state.engine(), user.user_id(), id).await?;

    Ok((StatusCode::OK, Json(doc)))
}

#[utoipa::path(
    post,
    path = "/api/v1/progress/lessons/{id}/complete",
    description = "Mark a lesson as completed; may cascade into course completion",
    params(
        ("id" = Uuid, Path, description = "Lesson id")
    ),
    responses(
        (status = 200, description = "Progress updated", body = ProgressDoc),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn lesson_complete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let doc = progress::on_lesson_completed(state.engine(), user.user_id(), id).await?;

    Ok((StatusCode::OK, Json(doc)))
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/courses/{id}",
    description = "Current user's aggregate for one course",
    params(
        ("id" = Uuid, Path, description = "Course id")
    ),
    responses(
        (status = 200, description = "Aggregate found", body = ProgressSummaryResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 404, description = "No progress recorded yet", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn course_progress_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let doc = ProgressDoc::find_scope(state.pool(), user.user_id(), ProgressScope::Course, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(ProgressDoc::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(ProgressDoc::get_resource_type()))?;

    Ok((StatusCode::OK, Json(ProgressSummaryResponse::from(&doc))))
}

#[utoipa::path(
    post,
    path = "/api/v1/progress/submissions",
    request_body = SubmissionGradeBody,
    description = "Record a graded submission and fold it into the course aggregate",
    responses(
        (status = 201, description = "Submission recorded", body = Submission),
        (status = 400, description = "Score outside [0, 100]", body = ErrorResponse),
        (status = 403, description = "Only instructors and admins grade submissions", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn submission_grade_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionGradeBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() == UserRole::Student {
        return Err(WebError::resource_forbidden(Submission::get_resource_type()));
    }

    let submission = progress::on_assessment_graded(state.engine(), payload.into()).await?;

    Ok((StatusCode::CREATED, Json(submission)))
}
