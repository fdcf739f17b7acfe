use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper, pg::Pg};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    dispatch,
    extract::ValidatedJson,
    middleware,
    models::{CreateReviewEntity, CreateReviewReq, ReviewEntity, ReviewStatus, ReviewType},
    review_stats::{self, ReviewStats},
    routes::page_offset,
    schema::reviews,
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(routes!(get_reviews, create_review))
        .routes(routes!(get_review_stats))
        .routes(routes!(mark_review_helpful));

    let admin = OpenApiRouter::new()
        .routes(routes!(update_review_status))
        .routes(routes!(delete_review))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/reviews", public.merge(admin))
}

#[derive(Deserialize, IntoParams, Debug)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct ReviewListQuery {
    #[serde(rename = "type")]
    review_type: Option<ReviewType>,
    product_id: Option<Uuid>,
    status: Option<ReviewStatus>,
    /// 1-indexed, defaults to 1.
    page: Option<i64>,
    /// Defaults to 10, at most 100.
    limit: Option<i64>,
}

impl ReviewListQuery {
    fn filtered(&self) -> reviews::BoxedQuery<'static, Pg> {
        let mut query = reviews::table.into_boxed();
        if let Some(review_type) = self.review_type {
            query = query.filter(reviews::review_type.eq(review_type));
        }
        if let Some(product_id) = self.product_id {
            query = query.filter(reviews::product_id.eq(product_id));
        }
        if let Some(status) = self.status {
            query = query.filter(reviews::status.eq(status));
        }
        query
    }
}

/// Resolved `(page, limit)` for a listing request.
fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ReviewPage {
    reviews: Vec<ReviewEntity>,
    total: i64,
    page: i64,
    limit: i64,
    total_pages: i64,
}

/// Fetch reviews, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Reviews"],
    params(ReviewListQuery),
    responses(
        (status = 200, description = "List reviews", body = StdResponse<ReviewPage, String>)
    )
)]
async fn get_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit) = page_window(query.page, query.limit);
    let offset = page_offset(page, limit)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let total: i64 = query
        .filtered()
        .count()
        .get_result(conn)
        .await
        .context("Failed to count reviews")?;

    let reviews: Vec<ReviewEntity> = query
        .filtered()
        .order_by(reviews::created_at.desc())
        .limit(limit)
        .offset(offset)
        .get_results(conn)
        .await
        .context("Failed to get reviews")?;

    Ok(StdResponse {
        data: Some(ReviewPage {
            reviews,
            total,
            page,
            limit,
            total_pages: total_pages(total, limit),
        }),
        message: Some("Get reviews successfully"),
    })
}

/// Submit a review. New reviews wait for moderation.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Reviews"],
    request_body = CreateReviewReq,
    responses(
        (status = 201, description = "Review submitted", body = StdResponse<ReviewEntity, String>),
        (status = 400, description = "Invalid review")
    )
)]
async fn create_review(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateReviewReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let review: ReviewEntity = diesel::insert_into(reviews::table)
        .values(CreateReviewEntity::from(body))
        .returning(ReviewEntity::as_returning())
        .get_result(conn)
        .await?;

    info!("Review {} submitted ({} stars)", review.id, review.rating);
    dispatch::review_submitted(&state, &review);

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(review),
            message: Some("Review submitted"),
        },
    ))
}

#[derive(Deserialize, IntoParams, Debug)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct ReviewStatsQuery {
    #[serde(rename = "type")]
    review_type: ReviewType,
    product_id: Option<Uuid>,
}

/// Rating summary over approved reviews.
#[utoipa::path(
    get,
    path = "/stats",
    tags = ["Reviews"],
    params(ReviewStatsQuery),
    responses(
        (status = 200, description = "Review statistics", body = StdResponse<ReviewStats, String>)
    )
)]
async fn get_review_stats(
    State(state): State<AppState>,
    Query(query): Query<ReviewStatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut ratings_query = reviews::table
        .filter(reviews::status.eq(ReviewStatus::Approved))
        .filter(reviews::review_type.eq(query.review_type))
        .select(reviews::rating)
        .into_boxed();
    if let Some(product_id) = query.product_id {
        ratings_query = ratings_query.filter(reviews::product_id.eq(product_id));
    }

    let ratings: Vec<i32> = ratings_query
        .get_results(conn)
        .await
        .context("Failed to get review ratings")?;

    Ok(StdResponse {
        data: Some(review_stats::aggregate(ratings)),
        message: Some("Get review stats successfully"),
    })
}

/// Count one more "helpful" vote. Votes are not deduplicated.
#[utoipa::path(
    post,
    path = "/{id}/helpful",
    tags = ["Reviews"],
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 200, description = "Review marked as helpful", body = StdResponse<ReviewEntity, String>),
        (status = 404, description = "Review not found")
    )
)]
async fn mark_review_helpful(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let review: ReviewEntity = diesel::update(reviews::table.find(id))
        .set(reviews::helpful_count.eq(reviews::helpful_count + 1))
        .returning(ReviewEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(review),
        message: Some("Review marked as helpful"),
    })
}

#[derive(Deserialize, Validate, ToSchema, Debug)]
struct UpdateReviewStatusReq {
    status: ReviewStatus,
}

/// Approve or reject a review.
#[utoipa::path(
    put,
    path = "/{id}/status",
    tags = ["Reviews"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    request_body = UpdateReviewStatusReq,
    responses(
        (status = 200, description = "Review status updated", body = StdResponse<ReviewEntity, String>),
        (status = 404, description = "Review not found")
    )
)]
async fn update_review_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UpdateReviewStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let review: ReviewEntity = diesel::update(reviews::table.find(id))
        .set((
            reviews::status.eq(body.status),
            reviews::updated_at.eq(Utc::now()),
        ))
        .returning(ReviewEntity::as_returning())
        .get_result(conn)
        .await?;

    info!("Review {} is now {}", review.id, review.status);

    Ok(StdResponse {
        data: Some(review),
        message: Some("Review status updated"),
    })
}

/// Delete a review.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Reviews"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 204, description = "Deleted review successfully"),
        (status = 404, description = "Review not found")
    )
)]
async fn delete_review(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let deleted = diesel::delete(reviews::table.find(id))
        .execute(conn)
        .await
        .context("Failed to delete review")?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    info!("Review {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_defaults_and_bounds() {
        assert_eq!(page_window(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_window(Some(0), Some(0)), (1, 1));
        assert_eq!(page_window(Some(3), Some(500)), (3, MAX_PAGE_SIZE));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }
}
