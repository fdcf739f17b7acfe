use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::NotificationEntity,
    schema::notifications,
};

pub const DEFAULT_FEED_SIZE: i64 = 20;
pub const MAX_FEED_SIZE: i64 = 100;

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/notifications",
        OpenApiRouter::new()
            .routes(routes!(get_notifications))
            .routes(routes!(mark_notification_read))
            .routes(routes!(mark_all_notifications_read))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::admin_authorization,
            )),
    )
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
struct FeedQuery {
    /// Defaults to 20, at most 100.
    limit: Option<i64>,
}

impl FeedQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_FEED_SIZE).clamp(1, MAX_FEED_SIZE)
    }
}

/// Fetch the latest admin notifications.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Notifications"],
    security(("bearerAuth" = [])),
    params(FeedQuery),
    responses(
        (status = 200, description = "List notifications", body = StdResponse<Vec<NotificationEntity>, String>)
    )
)]
async fn get_notifications(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let limit = query.limit();
    let notifications: Vec<NotificationEntity> = notifications::table
        .order_by(notifications::created_at.desc())
        .limit(limit)
        .select(NotificationEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get notifications")?;

    Ok(StdResponse {
        data: Some(notifications),
        message: Some("Get notifications successfully"),
    })
}

/// Mark one notification as read.
#[utoipa::path(
    post,
    path = "/{id}/read",
    tags = ["Notifications"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Marked notification as read", body = StdResponse<NotificationEntity, String>),
        (status = 404, description = "Notification not found")
    )
)]
async fn mark_notification_read(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let notification: NotificationEntity = diesel::update(notifications::table.find(id))
        .set(notifications::read.eq(true))
        .returning(NotificationEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(notification),
        message: Some("Marked notification as read"),
    })
}

#[derive(Serialize, ToSchema)]
struct MarkAllRes {
    updated: usize,
}

/// Mark every unread notification as read.
#[utoipa::path(
    post,
    path = "/read-all",
    tags = ["Notifications"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Marked all notifications as read", body = StdResponse<MarkAllRes, String>)
    )
)]
async fn mark_all_notifications_read(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated = diesel::update(notifications::table.filter(notifications::read.eq(false)))
        .set(notifications::read.eq(true))
        .execute(conn)
        .await
        .context("Failed to mark notifications as read")?;

    Ok(StdResponse {
        data: Some(MarkAllRes { updated }),
        message: Some("Marked all notifications as read"),
    })
}
