use anyhow::{Context, Result};
use chrono::SecondsFormat;

use crate::models::OrderEntity;

/// Column order is consumed by spreadsheets downstream and must not change.
pub const ORDER_CSV_COLUMNS: [&str; 8] = [
    "id",
    "customerName",
    "customerPhone",
    "address",
    "totalAmount",
    "paymentMethod",
    "status",
    "createdAt",
];

/// Serializes orders to CSV text with a header row.
pub fn orders_to_csv(orders: &[OrderEntity]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(ORDER_CSV_COLUMNS)
        .context("Failed to write CSV header")?;

    for order in orders {
        writer
            .write_record([
                order.id.to_string(),
                order.customer_name.clone(),
                order.customer_phone.clone(),
                order.address.clone(),
                order.total_amount.to_string(),
                order.payment_method.to_string(),
                order.status.to_string(),
                order
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ])
            .with_context(|| format!("Failed to write CSV row for order {}", order.id))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Failed to flush CSV writer: {}", err.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::{OrderStatus, PaymentMethod};

    fn order(name: &str, address: &str, total: f64) -> OrderEntity {
        OrderEntity {
            id: Uuid::new_v4(),
            customer_name: name.into(),
            customer_phone: "08000000000".into(),
            address: address.into(),
            total_amount: total,
            payment_method: PaymentMethod::MobileMoney,
            status: OrderStatus::OutForDelivery,
            created_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        }
    }

    #[test]
    fn header_uses_fixed_column_order() {
        let csv = orders_to_csv(&[]).unwrap();
        assert_eq!(
            csv,
            "id,customerName,customerPhone,address,totalAmount,paymentMethod,status,createdAt\n"
        );
    }

    #[test]
    fn row_fields_are_formatted_for_spreadsheets() {
        let order = order("Ada", "Lagos", 85.5);
        let csv = orders_to_csv(std::slice::from_ref(&order)).unwrap();
        let row = csv.lines().nth(1).unwrap();

        assert_eq!(
            row,
            format!(
                "{},Ada,08000000000,Lagos,85.5,mobile_money,Out for Delivery,2025-03-14T09:26:53.000Z",
                order.id
            )
        );
    }

    #[test]
    fn embedded_commas_quotes_and_newlines_are_quoted() {
        let order = order("Ada \"Mama\" Obi", "12 Marina, Lagos\nNear the bridge", 10.0);
        let csv = orders_to_csv(&[order]).unwrap();

        assert!(csv.contains("\"Ada \"\"Mama\"\" Obi\""));
        assert!(csv.contains("\"12 Marina, Lagos\nNear the bridge\""));
    }

    #[test]
    fn parsing_export_back_preserves_rows_and_totals() {
        let orders = vec![
            order("Ada", "Lagos, Ikoyi", 85.0),
            order("Bola", "Abuja", 1200.75),
            order("Chidi", "Line one\nLine two", 0.1 + 0.2),
        ];
        let csv = orders_to_csv(&orders).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), ORDER_CSV_COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), orders.len());

        for (row, order) in rows.iter().zip(&orders) {
            assert_eq!(&row[0], order.id.to_string());
            let total: f64 = row[4].parse().unwrap();
            assert!((total - order.total_amount).abs() < 1e-9);
        }
    }
}
