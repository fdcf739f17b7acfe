//! WhatsApp handoff link.
//!
//! Customers and support staff read the generated message directly, so its
//! line order, labels and currency symbol are fixed.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{
    models::CreateOrderReq,
    pricing::PricedLine,
};

pub const CURRENCY_SYMBOL: &str = "₦";

/// Characters JavaScript's `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Renders the order summary shown in the WhatsApp chat.
pub fn order_message(store_name: &str, order: &CreateOrderReq) -> String {
    let mut lines = Vec::with_capacity(order.items.len() + 7);
    lines.push(format!("{} Order", store_name));
    lines.push(format!("Name: {}", order.customer_name));
    lines.push(format!("Phone: {}", order.customer_phone));
    lines.push(format!("Address: {}", order.address));
    lines.push("Items:".to_string());
    for item in &order.items {
        lines.push(format!(
            "- {} x{} — {}{}",
            item.name,
            item.qty,
            CURRENCY_SYMBOL,
            format_amount(item.line_total())
        ));
    }
    lines.push(format!(
        "Total: {}{}",
        CURRENCY_SYMBOL,
        format_amount(order.total_amount)
    ));
    lines.push(format!("Payment: {}", order.payment_method));
    lines.join("\n")
}

/// `https://wa.me/<digits>?text=<encoded message>`.
pub fn build_whatsapp_url(support_phone: &str, store_name: &str, order: &CreateOrderReq) -> String {
    let phone: String = support_phone.chars().filter(char::is_ascii_digit).collect();
    let message = order_message(store_name, order);
    format!(
        "https://wa.me/{}?text={}",
        phone,
        utf8_percent_encode(&message, URI_COMPONENT)
    )
}

/// Shortest round-trip form, so `2000.0` prints `2000` and `12.5` prints `12.5`.
pub fn format_amount(amount: f64) -> String {
    if amount == 0.0 {
        // avoids "-0"
        return "0".to_string();
    }
    format!("{}", amount)
}
