use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    app_error::AppError,
    config::EmailConfig,
    models::OrderEntity,
    whatsapp::{CURRENCY_SYMBOL, format_amount},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Serialize)]
struct SendGridMail<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

pub fn new_order_email(config: &EmailConfig, order: &OrderEntity) -> Email {
    Email {
        to: config.admin_email.clone(),
        subject: format!("New order #{}", order.id),
        body: format!(
            "New order from {}. Total: {}{}.",
            order.customer_name,
            CURRENCY_SYMBOL,
            format_amount(order.total_amount)
        ),
    }
}

pub fn order_status_email(config: &EmailConfig, order: &OrderEntity) -> Email {
    Email {
        to: config.admin_email.clone(),
        subject: format!("Order #{} status updated", order.id),
        body: format!("Order for {} is now {}.", order.customer_name, order.status),
    }
}

/// Posts the email to SendGrid. Without an API key this only logs.
pub async fn send_email(client: &Client, config: &EmailConfig, email: &Email) -> Result<()> {
    let Some(api_key) = config.sendgrid_api_key.as_deref() else {
        debug!("No SendGrid API key configured, skipping email: {}", email.subject);
        return Ok(());
    };

    let payload = SendGridMail {
        personalizations: [Personalization {
            to: [Address { email: &email.to }],
        }],
        from: Address {
            email: &config.from,
        },
        subject: &email.subject,
        content: [Content {
            content_type: "text/plain",
            value: &email.body,
        }],
    };

    client
        .post(format!("{}/mail/send", config.api_url.trim_end_matches('/')))
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("SendGrid".into()))?
        .error_for_status()
        .context("SendGrid rejected the email")?;

    info!("Sent email: {}", email.subject);
    Ok(())
}
