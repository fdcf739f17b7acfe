//! Admin notification records.

use anyhow::Context;
use diesel_async::RunQueryDsl;
use serde_json::json;
use tracing::info;

use crate::{
    db::DbPool,
    models::{
        CreateNotificationEntity, NotificationType, OrderEntity, OrderStatus, ProductEntity,
        ReviewEntity,
    },
    schema::notifications,
    whatsapp::{CURRENCY_SYMBOL, format_amount},
};

/// Products at or below this stock level raise a `low_stock` notification.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

pub fn order_created(order: &OrderEntity) -> CreateNotificationEntity {
    CreateNotificationEntity {
        notification_type: NotificationType::OrderCreated,
        title: "New order received".into(),
        message: format!(
            "New order from {} - {}{}",
            order.customer_name,
            CURRENCY_SYMBOL,
            format_amount(order.total_amount)
        ),
        data: Some(json!({
            "orderId": order.id,
            "customerName": order.customer_name,
            "totalAmount": order.total_amount,
        })),
    }
}

pub fn order_status_updated(order: &OrderEntity, previous: OrderStatus) -> CreateNotificationEntity {
    CreateNotificationEntity {
        notification_type: NotificationType::OrderStatusUpdated,
        title: "Order status updated".into(),
        message: format!(
            "Order for {} changed from {} to {}",
            order.customer_name, previous, order.status
        ),
        data: Some(json!({
            "orderId": order.id,
            "previousStatus": previous,
            "status": order.status,
        })),
    }
}

pub fn review_submitted(review: &ReviewEntity) -> CreateNotificationEntity {
    CreateNotificationEntity {
        notification_type: NotificationType::ReviewSubmitted,
        title: "New review received".into(),
        message: format!(
            "New {} review from {} - {} stars",
            review.review_type, review.customer_name, review.rating
        ),
        data: Some(json!({
            "reviewId": review.id,
            "type": review.review_type,
            "rating": review.rating,
            "customerName": review.customer_name,
        })),
    }
}

pub fn product_created(product: &ProductEntity) -> CreateNotificationEntity {
    CreateNotificationEntity {
        notification_type: NotificationType::ProductCreated,
        title: "Product created".into(),
        message: format!("{} was added to the catalog", product.name),
        data: Some(json!({ "productId": product.id, "slug": product.slug })),
    }
}

pub fn product_deleted(product: &ProductEntity) -> CreateNotificationEntity {
    CreateNotificationEntity {
        notification_type: NotificationType::ProductDeleted,
        title: "Product deleted".into(),
        message: format!("{} was removed from the catalog", product.name),
        data: Some(json!({ "productId": product.id, "slug": product.slug })),
    }
}

/// `None` while stock is above [`LOW_STOCK_THRESHOLD`].
pub fn low_stock(product: &ProductEntity) -> Option<CreateNotificationEntity> {
    if product.stock > LOW_STOCK_THRESHOLD {
        return None;
    }
    Some(CreateNotificationEntity {
        notification_type: NotificationType::LowStock,
        title: "Low stock".into(),
        message: format!("{} has only {} left in stock", product.name, product.stock),
        data: Some(json!({ "productId": product.id, "stock": product.stock })),
    })
}

pub async fn create_notification(
    pool: &DbPool,
    notification: CreateNotificationEntity,
) -> anyhow::Result<()> {
    let conn = &mut pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    diesel::insert_into(notifications::table)
        .values(&notification)
        .execute(conn)
        .await
        .context("Failed to insert notification")?;

    info!(
        "Recorded {} notification: {}",
        notification.notification_type, notification.title
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::{PackagingType, PaymentMethod, ProductCategory, ProductUnit};

    fn product(stock: i32) -> ProductEntity {
        ProductEntity {
            id: Uuid::new_v4(),
            name: "Ripe Plantain Chips".into(),
            slug: "ripe-plantain-chips".into(),
            description: None,
            category: ProductCategory::RipePlantainChips,
            price: 1500.0,
            unit: ProductUnit::Piece,
            weight: None,
            packaging_type: PackagingType::Bucket,
            stock,
            images: vec![],
            created_at: Utc::now(),
        }
    }

    fn order(status: OrderStatus) -> OrderEntity {
        OrderEntity {
            id: Uuid::new_v4(),
            customer_name: "Ada".into(),
            customer_phone: "08000000000".into(),
            address: "Lagos".into(),
            total_amount: 2000.0,
            payment_method: PaymentMethod::BankTransfer,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn order_created_carries_order_id_and_total() {
        let order = order(OrderStatus::Pending);
        let notification = order_created(&order);

        assert_eq!(notification.notification_type, NotificationType::OrderCreated);
        assert_eq!(notification.message, "New order from Ada - ₦2000");
        let data = notification.data.unwrap();
        assert_eq!(data["orderId"], order.id.to_string());
        assert_eq!(data["totalAmount"], 2000.0);
    }

    #[test]
    fn status_update_mentions_both_states() {
        let notification = order_status_updated(&order(OrderStatus::OutForDelivery), OrderStatus::Packed);
        assert_eq!(
            notification.message,
            "Order for Ada changed from Packed to Out for Delivery"
        );
        assert_eq!(notification.data.unwrap()["status"], "Out for Delivery");
    }

    #[test]
    fn low_stock_triggers_at_threshold_inclusive() {
        assert!(low_stock(&product(LOW_STOCK_THRESHOLD + 1)).is_none());
        let notification = low_stock(&product(LOW_STOCK_THRESHOLD)).unwrap();
        assert_eq!(notification.notification_type, NotificationType::LowStock);
        assert!(low_stock(&product(0)).is_some());
    }

    #[test]
    fn product_events_use_their_own_types() {
        let product = product(20);
        assert_eq!(
            product_created(&product).notification_type,
            NotificationType::ProductCreated
        );
        assert_eq!(
            product_deleted(&product).notification_type,
            NotificationType::ProductDeleted
        );
    }
}
