use anyhow::Context;
use axum::{Extension, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{self, AdminClaims},
    config::AppConfig,
    extract::ValidatedJson,
    middleware,
    models::{
        AdminEntity, CreateStoreSettingsEntity, StoreSettingsEntity, UpdateCredentialsReq,
        UpdateStoreSettingsEntity,
    },
    schema::{admins, store_settings},
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new().routes(routes!(get_store_settings));

    let admin = OpenApiRouter::new()
        .routes(routes!(update_store_settings))
        .routes(routes!(get_profile))
        .routes(routes!(update_credentials))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/settings", public.merge(admin))
}

/// Returns the settings row, creating it with defaults on first access.
pub(crate) async fn current_settings(
    conn: &mut AsyncPgConnection,
    config: &AppConfig,
) -> Result<StoreSettingsEntity, AppError> {
    let existing = store_settings::table
        .select(StoreSettingsEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get store settings")?;

    if let Some(settings) = existing {
        return Ok(settings);
    }

    diesel::insert_into(store_settings::table)
        .values(CreateStoreSettingsEntity::defaults(&config.store.whatsapp_phone))
        .on_conflict_do_nothing()
        .execute(conn)
        .await
        .context("Failed to initialise store settings")?;
    info!("Initialised store settings with defaults");

    let settings = store_settings::table
        .select(StoreSettingsEntity::as_select())
        .first(conn)
        .await
        .context("Failed to get store settings")?;
    Ok(settings)
}

/// Fetch the public store settings.
#[utoipa::path(
    get,
    path = "/store",
    tags = ["Settings"],
    responses(
        (status = 200, description = "Get store settings successfully", body = StdResponse<StoreSettingsEntity, String>)
    )
)]
async fn get_store_settings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let settings = current_settings(conn, &state.config).await?;

    Ok(StdResponse {
        data: Some(settings),
        message: Some("Get store settings successfully"),
    })
}

/// Update store settings. Absent fields keep their value.
#[utoipa::path(
    put,
    path = "/store",
    tags = ["Settings"],
    security(("bearerAuth" = [])),
    request_body = UpdateStoreSettingsEntity,
    responses(
        (status = 200, description = "Updated store settings successfully", body = StdResponse<StoreSettingsEntity, String>)
    )
)]
async fn update_store_settings(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UpdateStoreSettingsEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    current_settings(conn, &state.config).await?;

    let settings = diesel::update(store_settings::table)
        .set((&body, store_settings::updated_at.eq(Utc::now())))
        .returning(StoreSettingsEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to update store settings")?;

    info!("Store settings updated");

    Ok(StdResponse {
        data: Some(settings),
        message: Some("Updated store settings successfully"),
    })
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ProfileRes {
    username: String,
    created_at: DateTime<Utc>,
}

/// Fetch the signed-in admin's profile.
#[utoipa::path(
    get,
    path = "/profile",
    tags = ["Settings"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get profile successfully", body = StdResponse<ProfileRes, String>),
        (status = 404, description = "Admin no longer exists")
    )
)]
async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let admin: AdminEntity = admins::table
        .find(claims.admin_id()?)
        .select(AdminEntity::as_select())
        .first(conn)
        .await?;

    Ok(StdResponse {
        data: Some(ProfileRes {
            username: admin.username,
            created_at: admin.created_at,
        }),
        message: Some("Get profile successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct CredentialsRes {
    username: String,
}

/// Change the signed-in admin's username and password.
#[utoipa::path(
    put,
    path = "/credentials",
    tags = ["Settings"],
    security(("bearerAuth" = [])),
    request_body = UpdateCredentialsReq,
    responses(
        (status = 200, description = "Updated credentials successfully", body = StdResponse<CredentialsRes, String>),
        (status = 400, description = "Current password is incorrect"),
        (status = 409, description = "Username is taken")
    )
)]
async fn update_credentials(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    ValidatedJson(body): ValidatedJson<UpdateCredentialsReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let admin_id = claims.admin_id()?;
    let admin: AdminEntity = admins::table
        .find(admin_id)
        .select(AdminEntity::as_select())
        .first(conn)
        .await?;

    if !auth::verify_password_blocking(admin.password_hash, body.current_password).await? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let password_hash = auth::hash_password_blocking(body.new_password).await?;
    let username: String = diesel::update(admins::table.find(admin_id))
        .set((
            admins::username.eq(&body.new_username),
            admins::password_hash.eq(password_hash),
        ))
        .returning(admins::username)
        .get_result(conn)
        .await?;

    info!("Admin {} updated their credentials", admin_id);

    Ok(StdResponse {
        data: Some(CredentialsRes { username }),
        message: Some("Updated credentials successfully"),
    })
}
