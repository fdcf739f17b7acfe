use std::collections::HashMap;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{Days, NaiveDate, NaiveTime};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, pg::Pg};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
    analytics::{self, SalesSummary},
    app_error::{AppError, StdResponse},
    app_state::AppState,
    dispatch,
    export,
    extract::ValidatedJson,
    middleware,
    models::{
        CreateOrderEntity, CreateOrderItemEntity, CreateOrderReq, OrderDetails, OrderEntity,
        OrderItemEntity, OrderStatus,
    },
    pricing::{self, PricingSettings},
    routes::{page_offset, settings::current_settings},
    schema::{order_items, orders},
    whatsapp,
};

pub const MAX_PAGE_SIZE: i64 = 100;

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new()
        .routes(routes!(create_order))
        .routes(routes!(track_order));

    let admin = OpenApiRouter::new()
        .routes(routes!(get_orders))
        .routes(routes!(get_order, update_order_status))
        .routes(routes!(export_orders_csv))
        .routes(routes!(get_order_analytics))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_authorization,
        ));

    OpenApiRouter::new().nest("/orders", public.merge(admin))
}

/// Line items for the given orders, grouped by order and kept in submission order.
async fn items_by_order(
    conn: &mut AsyncPgConnection,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItemEntity>>, AppError> {
    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq_any(order_ids))
        .order_by((order_items::order_id, order_items::position))
        .select(OrderItemEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<Uuid, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }
    Ok(group)
}

async fn with_items(
    conn: &mut AsyncPgConnection,
    orders: Vec<OrderEntity>,
) -> Result<Vec<OrderDetails>, AppError> {
    let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let mut group = items_by_order(conn, &order_ids).await?;

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = group.remove(&order.id).unwrap_or_default();
            OrderDetails { order, items }
        })
        .collect())
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRes {
    order_id: Uuid,
    whatsapp_url: String,
}

/// Place an order from a checkout submission.
///
/// The submitted total is stored as given. A total that differs from the
/// server-side computation is only logged.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = CreateOrderReq,
    responses(
        (status = 201, description = "Created order successfully", body = StdResponse<CreateOrderRes, String>),
        (status = 400, description = "Invalid order")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let settings = current_settings(conn, &state.config).await?;
    let expected = pricing::compute_totals(&body.items, &PricingSettings::from(&settings));
    if !pricing::total_matches(body.total_amount, &expected) {
        warn!(
            submitted = body.total_amount,
            expected = expected.grand_total,
            "Order total differs from computed total, keeping submitted value"
        );
    }

    let whatsapp_url =
        whatsapp::build_whatsapp_url(&settings.whatsapp_phone, &settings.store_name, &body);

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        customer_name: body.customer_name,
                        customer_phone: body.customer_phone,
                        address: body.address,
                        total_amount: body.total_amount,
                        payment_method: body.payment_method,
                        status: OrderStatus::Pending,
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let items: Vec<CreateOrderItemEntity> = body
                    .items
                    .into_iter()
                    .enumerate()
                    .map(|(position, item)| CreateOrderItemEntity {
                        order_id: order.id,
                        product_id: item.product,
                        name: item.name,
                        qty: item.qty,
                        price: item.price,
                        position: position as i32,
                    })
                    .collect();

                diesel::insert_into(order_items::table)
                    .values(&items)
                    .execute(conn)
                    .await?;

                Ok::<OrderEntity, AppError>(order)
            })
        })
        .await?;

    info!("Order #{} created for {}", order.id, order.customer_name);
    dispatch::order_created(&state, &order);

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(CreateOrderRes {
                order_id: order.id,
                whatsapp_url,
            }),
            message: Some("Created order successfully"),
        },
    ))
}

/// Look up an order by id and the phone number it was placed with.
#[utoipa::path(
    get,
    path = "/track/{id}/{phone}",
    tags = ["Orders"],
    params(
        ("id" = String, Path, description = "Order ID"),
        ("phone" = String, Path, description = "Customer phone exactly as submitted")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderDetails, String>),
        (status = 404, description = "No order matches both id and phone")
    )
)]
async fn track_order(
    Path((id, phone)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::NotFound)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .filter(orders::customer_phone.eq(&phone))
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get order")?
        .ok_or(AppError::NotFound)?;

    let details = with_items(conn, vec![order]).await?.pop().ok_or(AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(details),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, IntoParams, Debug)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct OrderFilter {
    status: Option<OrderStatus>,
    /// First day to include (YYYY-MM-DD, UTC).
    start_date: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD, UTC).
    end_date: Option<NaiveDate>,
    /// 1-indexed, only used together with `limit`.
    page: Option<i64>,
    limit: Option<i64>,
}

impl OrderFilter {
    fn query(&self) -> orders::BoxedQuery<'static, Pg> {
        let mut query = orders::table.into_boxed();
        if let Some(status) = self.status {
            query = query.filter(orders::status.eq(status));
        }
        if let Some(start) = self.start_date {
            query = query.filter(orders::created_at.ge(start.and_time(NaiveTime::MIN).and_utc()));
        }
        if let Some(next_day) = self.end_date.and_then(|end| end.checked_add_days(Days::new(1))) {
            query = query.filter(orders::created_at.lt(next_day.and_time(NaiveTime::MIN).and_utc()));
        }
        query.order_by(orders::created_at.desc())
    }
}

/// Fetch orders, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(OrderFilter),
    responses(
        (status = 200, description = "List orders", body = StdResponse<Vec<OrderDetails>, String>)
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut query = filter.query();
    if let Some(limit) = filter.limit {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let page = filter.page.unwrap_or(1).max(1);
        query = query.limit(limit).offset(page_offset(page, limit)?);
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = query
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    let orders = with_items(conn, orders).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

/// Fetch a specific order with its items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderDetails, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .select(OrderEntity::as_select())
        .first(conn)
        .await?;

    let details = with_items(conn, vec![order]).await?.pop().ok_or(AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(details),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, Validate, ToSchema, Debug)]
struct UpdateOrderStatusReq {
    status: OrderStatus,
}

/// Move an order to any status.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Updated order successfully", body = StdResponse<OrderDetails, String>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found")
    )
)]
async fn update_order_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let previous: OrderStatus = orders::table
        .find(id)
        .select(orders::status)
        .first(conn)
        .await?;

    let order: OrderEntity = diesel::update(orders::table.find(id))
        .set(orders::status.eq(body.status))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await?;

    info!("Order #{} moved from {} to {}", order.id, previous, order.status);
    dispatch::order_status_updated(&state, &order, previous);

    let details = with_items(conn, vec![order]).await?.pop().ok_or(AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(details),
        message: Some("Updated order successfully"),
    })
}

/// Download the filtered orders as `orders.csv`.
#[utoipa::path(
    get,
    path = "/export/csv",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(OrderFilter),
    responses(
        (status = 200, description = "CSV export", content_type = "text/csv", body = String)
    )
)]
async fn export_orders_csv(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = filter
        .query()
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    let csv = export::orders_to_csv(&orders)?;
    info!("Exported {} orders to CSV", orders.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"orders.csv\""),
        ],
        csv,
    ))
}

/// Revenue and product rankings over the filtered orders.
#[utoipa::path(
    get,
    path = "/analytics",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(OrderFilter),
    responses(
        (status = 200, description = "Order analytics", body = StdResponse<SalesSummary, String>)
    )
)]
async fn get_order_analytics(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = filter
        .query()
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    let orders = with_items(conn, orders).await?;

    Ok(StdResponse {
        data: Some(analytics::summarize(&orders)),
        message: Some("Get order analytics successfully"),
    })
}
