//! Best-effort WhatsApp notification of new orders.
//!
//! Delivery failures are logged and swallowed: the order has already
//! committed by the time this runs, and a gateway outage must never turn a
//! placed order into an error response.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;

use crate::models::order::OrderWithItems;

/// WhatsApp gateway configuration. When absent, notifications are disabled.
#[derive(Clone)]
pub struct WhatsAppConfig {
    /// Gateway endpoint accepting `{ token, to, body }` JSON posts.
    pub api_url: String,
    /// Gateway API token.
    pub api_token: SecretString,
    /// Number that receives new-order notifications.
    pub recipient: String,
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"[REDACTED]")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Errors from one delivery attempt.
#[derive(Debug, Error)]
enum NotifyError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Sends order notifications to a WhatsApp gateway.
#[derive(Debug, Clone)]
pub struct WhatsAppNotifier {
    client: reqwest::Client,
    config: Option<WhatsAppConfig>,
}

impl WhatsAppNotifier {
    /// Create a notifier. Pass `None` to disable delivery.
    #[must_use]
    pub fn new(config: Option<WhatsAppConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Notify about a freshly committed order. Never fails: all errors are
    /// logged at `warn` and dropped.
    pub async fn notify_order_created(&self, order: &OrderWithItems) {
        let Some(config) = &self.config else {
            tracing::debug!(
                order_number = %order.order.order_number,
                "WhatsApp notifications disabled, skipping"
            );
            return;
        };

        let message = format_order_message(order);
        match self.send(config, &message).await {
            Ok(()) => {
                tracing::info!(
                    order_number = %order.order.order_number,
                    "WhatsApp order notification sent"
                );
            }
            Err(err) => {
                tracing::warn!(
                    order_number = %order.order.order_number,
                    error = %err,
                    "failed to send WhatsApp order notification"
                );
            }
        }
    }

    async fn send(&self, config: &WhatsAppConfig, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&config.api_url)
            .json(&json!({
                "token": config.api_token.expose_secret(),
                "to": config.recipient,
                "body": message,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }
}

/// Render the order into the message posted to the gateway.
fn format_order_message(order: &OrderWithItems) -> String {
    let header = &order.order;
    let mut message = format!(
        "New order {number}\n\
         Customer: {name}\n\
         Email: {email}\n\
         Phone: {phone}\n\
         Address: {address}, {city}\n\n\
         Items:\n",
        number = header.order_number,
        name = header.customer_name,
        email = header.customer_email,
        phone = header.customer_phone,
        address = header.shipping_address,
        city = header.shipping_city,
    );

    for item in &order.items {
        message.push_str(&format!(
            "- {title} x {qty} = {total} {currency}\n",
            title = item.book_title,
            qty = item.quantity,
            total = item.total_price,
            currency = header.currency,
        ));
    }

    message.push_str(&format!(
        "\nTotal: {total} {currency}\n",
        total = header.total_amount,
        currency = header.currency,
    ));

    if let Some(notes) = header.notes.as_deref().filter(|n| !n.is_empty()) {
        message.push_str(&format!("Notes: {notes}\n"));
    }

    message
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::{Order, OrderItem};
    use chrono::Utc;
    use maktaba_core::{
        BookId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    };
    use rust_decimal::Decimal;

    fn sample_order() -> OrderWithItems {
        let now = Utc::now();
        OrderWithItems {
            order: Order {
                id: OrderId::new(1),
                order_number: "ORD-2026-7F3KQ2MX".to_owned(),
                user_id: None,
                status: OrderStatus::Pending,
                payment_status: PaymentStatus::Pending,
                payment_method: PaymentMethod::CashOnDelivery,
                subtotal: "160.00".parse().unwrap(),
                tax_amount: "32.00".parse().unwrap(),
                shipping_amount: "30.00".parse().unwrap(),
                discount_amount: Decimal::ZERO,
                total_amount: "222.00".parse().unwrap(),
                currency: "MAD".to_owned(),
                customer_name: "Amina Alaoui".to_owned(),
                customer_email: "amina@example.com".to_owned(),
                customer_phone: "0612345678".to_owned(),
                shipping_address: "12 Avenue Hassan II".to_owned(),
                shipping_city: "Rabat".to_owned(),
                shipping_postal_code: None,
                shipping_country: "Morocco".to_owned(),
                notes: Some("Call before delivery".to_owned()),
                tracking_number: None,
                shipped_at: None,
                delivered_at: None,
                created_at: now,
                updated_at: now,
            },
            items: vec![OrderItem {
                id: OrderItemId::new(1),
                order_id: OrderId::new(1),
                book_id: BookId::new(3),
                book_title: "Introduction au droit marocain".to_owned(),
                book_slug: "introduction-au-droit-marocain".to_owned(),
                quantity: 2,
                unit_price: "80.00".parse().unwrap(),
                total_price: "160.00".parse().unwrap(),
            }],
        }
    }

    #[test]
    fn test_message_contains_order_details() {
        let message = format_order_message(&sample_order());
        assert!(message.contains("ORD-2026-7F3KQ2MX"));
        assert!(message.contains("Amina Alaoui"));
        assert!(message.contains("Introduction au droit marocain x 2 = 160.00 MAD"));
        assert!(message.contains("Total: 222.00 MAD"));
        assert!(message.contains("Notes: Call before delivery"));
    }

    #[test]
    fn test_message_omits_empty_notes() {
        let mut order = sample_order();
        order.order.notes = None;
        let message = format_order_message(&order);
        assert!(!message.contains("Notes:"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = WhatsAppConfig {
            api_url: "https://gateway.example.com/send".to_owned(),
            api_token: SecretString::from("wha_9kQ2x7PzL4mR8vT1"),
            recipient: "+212600000000".to_owned(),
        };
        let output = format!("{config:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("wha_9kQ2x7PzL4mR8vT1"));
    }
}
