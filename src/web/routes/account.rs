use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Duration;
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};

use crate::{
    Config,
    auth::{self, UserClaims, hash_password, verify_password},
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped,
        entity::{UserEntity, UserEntityCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN},
        routes::PaginationQuery,
    },
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupBody {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SigninBody {
    pub email: String,
    pub password: String,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/page", get(account_list_handler))
        .route("/verify", get(account_verify_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/signup", post(account_signup_handler))
        .route("/signin", post(account_signin_handler))
        .merge(protected)
        .with_state(state)
}

fn set_session_cookie(cookies: &Cookies, token: String) {
    let mut cookie = Cookie::new(AUTH_TOKEN, token);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signup",
    request_body = SignupBody,
    description = "Creates a new student account",
    responses(
        (status = 200, description = "Account created successfully", body = UserEntity),
        (status = 409, description = "Account already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account"
)]
async fn account_signup_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SignupBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_email(state.pool(), &admin, &payload.email)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    if found.is_some() {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let payload = UserEntityCreateUpdate {
        email: payload.email,
        full_name: payload.full_name,
        password_hash: hash,
        role: UserRole::Student,
    };

    let created = UserEntity::create(state.pool(), &admin, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    let timestamp = (chrono::Utc::now() + Duration::days(1)).timestamp();
    let jwt_token = Config::get_or_init(false).await.app().jwt();

    let claims = UserClaims {
        sub: created.id().to_string(),
        exp: timestamp,
    };
    let token =
        auth::generate_token(claims, jwt_token).map_err(|e| WebError::server_crypt_error(e.into()))?;
    set_session_cookie(&cookies, token);

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signin",
    description = "Authorizes user in the system",
    request_body = SigninBody,
    responses(
        (status = 200, description = "User signed in", body = UserEntity),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
)]
async fn account_signin_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SigninBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_email(state.pool(), &admin, &payload.email)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    let Some(found) = found else {
        return Err(WebError::auth_invalid_credentials());
    };

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;

    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let timestamp = (chrono::Utc::now() + Duration::days(1)).timestamp();
    let jwt_token = Config::get_or_init(false).await.app().jwt();
    let claims = UserClaims {
        sub: found.id().to_string(),
        exp: timestamp,
    };

    let token =
        auth::generate_token(claims, jwt_token).map_err(|e| WebError::server_crypt_error(e.into()))?;
    set_session_cookie(&cookies, token);

    Ok((StatusCode::OK, Json(found)))
}

async fn account_verify_handler(ctx: RequestContext) -> WebResult<impl IntoResponse> {
    let user = ctx.maybe_user();

    if user.is_none() {
        return Ok(StatusCode::UNAUTHORIZED);
    }

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/account/page",
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<UserEntity>),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn account_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() != UserRole::Admin {
        return Err(WebError::resource_forbidden(UserEntity::get_resource_type()));
    }

    let users = UserEntity::page(state.pool(), user, page.limit, page.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(users)))
}
