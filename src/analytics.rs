//! Sales summary over an already filtered set of orders.
//!
//! Revenue only counts `Completed` orders. Product rankings use every order in
//! the set, keyed by the name snapshot on each line.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    models::{OrderDetails, OrderStatus},
    pricing::PricedLine,
};

pub const TOP_PRODUCTS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_orders: usize,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub pending_count: usize,
    pub completed_count: usize,
    pub revenue_by_date: Vec<DailyRevenue>,
    pub top_products: Vec<ProductSales>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductSales {
    pub name: String,
    pub qty: i64,
    pub revenue: f64,
}

pub fn summarize(orders: &[OrderDetails]) -> SalesSummary {
    let mut total_revenue = 0.0;
    let mut pending_count = 0;
    let mut completed_count = 0;
    let mut revenue_by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut products: HashMap<&str, ProductSales> = HashMap::new();

    for details in orders {
        let order = &details.order;
        match order.status {
            OrderStatus::Pending => pending_count += 1,
            OrderStatus::Completed => {
                completed_count += 1;
                total_revenue += order.total_amount;
                *revenue_by_date
                    .entry(order.created_at.date_naive())
                    .or_default() += order.total_amount;
            }
            _ => {}
        }

        for item in &details.items {
            let entry = products
                .entry(item.name.as_str())
                .or_insert_with(|| ProductSales {
                    name: item.name.clone(),
                    qty: 0,
                    revenue: 0.0,
                });
            entry.qty += i64::from(item.qty);
            entry.revenue += item.line_total();
        }
    }

    let total_orders = orders.len();
    let avg_order_value = if total_orders > 0 {
        total_revenue / total_orders as f64
    } else {
        0.0
    };

    let mut top_products: Vec<ProductSales> = products.into_values().collect();
    top_products.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_products.truncate(TOP_PRODUCTS_LIMIT);

    SalesSummary {
        total_orders,
        total_revenue,
        avg_order_value,
        pending_count,
        completed_count,
        revenue_by_date: revenue_by_date
            .into_iter()
            .map(|(date, revenue)| DailyRevenue { date, revenue })
            .collect(),
        top_products,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::{OrderEntity, OrderItemEntity, PaymentMethod};

    fn order(status: OrderStatus, day: u32, total: f64, items: &[(&str, i32, f64)]) -> OrderDetails {
        let id = Uuid::new_v4();
        OrderDetails {
            order: OrderEntity {
                id,
                customer_name: "Ada".into(),
                customer_phone: "08000000000".into(),
                address: "Lagos".into(),
                total_amount: total,
                payment_method: PaymentMethod::CashOnDelivery,
                status,
                created_at: Utc.with_ymd_and_hms(2025, 5, day, 15, 0, 0).unwrap(),
            },
            items: items
                .iter()
                .enumerate()
                .map(|(position, (name, qty, price))| OrderItemEntity {
                    id: Uuid::new_v4(),
                    order_id: id,
                    product_id: Uuid::new_v4(),
                    name: name.to_string(),
                    qty: *qty,
                    price: *price,
                    position: position as i32,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_set_summarizes_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.avg_order_value, 0.0);
        assert!(summary.revenue_by_date.is_empty());
        assert!(summary.top_products.is_empty());
    }

    #[test]
    fn revenue_counts_completed_orders_only() {
        let orders = [
            order(OrderStatus::Completed, 2, 80.0, &[("Chips", 2, 40.0)]),
            order(OrderStatus::Pending, 2, 55.0, &[("Juice", 1, 50.0)]),
            order(OrderStatus::Completed, 1, 20.0, &[("Juice", 4, 5.0)]),
            order(OrderStatus::Packed, 3, 15.0, &[("Chips", 1, 10.0)]),
        ];
        let summary = summarize(&orders);

        assert_eq!(summary.total_orders, 4);
        assert_eq!(summary.total_revenue, 100.0);
        assert_eq!(summary.avg_order_value, 25.0);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.completed_count, 2);
        assert_eq!(
            summary.revenue_by_date,
            vec![
                DailyRevenue {
                    date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
                    revenue: 20.0,
                },
                DailyRevenue {
                    date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
                    revenue: 80.0,
                },
            ]
        );
    }

    #[test]
    fn top_products_rank_by_line_revenue_across_all_orders() {
        let orders = [
            order(OrderStatus::Pending, 1, 0.0, &[("Chips", 2, 40.0), ("Juice", 1, 5.0)]),
            order(OrderStatus::Completed, 1, 0.0, &[("Juice", 10, 5.0)]),
        ];
        let summary = summarize(&orders);

        assert_eq!(summary.top_products.len(), 2);
        assert_eq!(summary.top_products[0].name, "Chips");
        assert_eq!(summary.top_products[0].revenue, 80.0);
        assert_eq!(summary.top_products[1].name, "Juice");
        assert_eq!(summary.top_products[1].qty, 11);
        assert_eq!(summary.top_products[1].revenue, 55.0);
    }

    #[test]
    fn top_products_are_capped() {
        let items: Vec<(String, i32, f64)> = (0..8)
            .map(|i| (format!("Product {}", i), 1, f64::from(i)))
            .collect();
        let borrowed: Vec<(&str, i32, f64)> = items
            .iter()
            .map(|(name, qty, price)| (name.as_str(), *qty, *price))
            .collect();
        let summary = summarize(&[order(OrderStatus::Pending, 1, 0.0, &borrowed)]);

        assert_eq!(summary.top_products.len(), TOP_PRODUCTS_LIMIT);
        assert_eq!(summary.top_products[0].name, "Product 7");
    }
}
