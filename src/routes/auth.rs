use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use diesel::{
    ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth,
    extract::ValidatedJson,
    models::{AdminEntity, CreateAdminEntity, LoginReq, RegisterAdminReq},
    schema::admins,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/auth",
        OpenApiRouter::new()
            .routes(routes!(login))
            .routes(routes!(register)),
    )
}

#[derive(Serialize, ToSchema)]
struct LoginRes {
    token: String,
    username: String,
}

/// Exchange admin credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Auth"],
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in successfully", body = StdResponse<LoginRes, String>),
        (status = 401, description = "Invalid credentials")
    )
)]
async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let admin: Option<AdminEntity> = admins::table
        .filter(admins::username.eq(&body.username))
        .select(AdminEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get admin")?;

    let Some(admin) = admin else {
        warn!("Login attempt for unknown admin {}", body.username);
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !auth::verify_password_blocking(admin.password_hash.clone(), body.password).await? {
        warn!("Wrong password for admin {}", admin.username);
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = state.tokens.issue(admin.id, &admin.username)?;
    info!("Admin {} logged in", admin.username);

    Ok(StdResponse {
        data: Some(LoginRes {
            token,
            username: admin.username,
        }),
        message: Some("Logged in successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct RegisterRes {
    username: String,
}

/// Create the store's admin account. Only allowed while none exists.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Auth"],
    request_body = RegisterAdminReq,
    responses(
        (status = 201, description = "Admin user created successfully", body = StdResponse<RegisterRes, String>),
        (status = 409, description = "An admin already exists")
    )
)]
async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterAdminReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let existing: i64 = admins::table
        .count()
        .get_result(conn)
        .await
        .context("Failed to count admins")?;
    if existing > 0 {
        return Err(AppError::Conflict("Admin user already exists".into()));
    }

    let password_hash = auth::hash_password_blocking(body.password).await?;
    // Concurrent first registrations race past the count; the singleton key
    // lets exactly one insert through.
    let username: String = diesel::insert_into(admins::table)
        .values(CreateAdminEntity {
            username: body.username,
            password_hash,
        })
        .returning(admins::username)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::Conflict("Admin user already exists".into())
            }
            other => other.into(),
        })?;

    info!("Registered admin {}", username);

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(RegisterRes { username }),
            message: Some("Admin user created successfully"),
        },
    ))
}
