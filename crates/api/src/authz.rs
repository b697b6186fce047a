//! Order authorization.
//!
//! One capability check covers every "can this user act on this order"
//! decision, instead of per-handler ownership tests.

use maktaba_core::UserId;

use crate::error::ApiError;
use crate::models::Order;

/// Who is acting.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub is_staff: bool,
}

impl Actor {
    /// An anonymous caller.
    pub const ANONYMOUS: Self = Self {
        user_id: None,
        is_staff: false,
    };

    /// An authenticated customer or staff member.
    #[must_use]
    pub const fn user(user_id: UserId, is_staff: bool) -> Self {
        Self {
            user_id: Some(user_id),
            is_staff,
        }
    }
}

/// What they want to do to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Read,
    Cancel,
    UpdateStatus,
}

/// Whether `actor` may perform `action` on `order`.
///
/// Staff may do everything. The owning customer may read and cancel their
/// own orders. Everyone else (including guests who placed the order without
/// an account) gets nothing: guest orders are only reachable by staff.
#[must_use]
pub fn can_act_on_order(actor: Actor, order: &Order, action: OrderAction) -> bool {
    if actor.is_staff {
        return true;
    }
    match action {
        OrderAction::Read | OrderAction::Cancel => match (actor.user_id, order.user_id) {
            (Some(actor_id), Some(owner_id)) => actor_id == owner_id,
            _ => false,
        },
        OrderAction::UpdateStatus => false,
    }
}

/// Capability check that surfaces the right error: 404 for reads the caller
/// may not even know exist, 403 for everything else.
///
/// # Errors
///
/// Returns `ApiError::NotFound` or `ApiError::Forbidden` when denied.
pub fn authorize_order(actor: Actor, order: &Order, action: OrderAction) -> Result<(), ApiError> {
    if can_act_on_order(actor, order, action) {
        return Ok(());
    }
    match action {
        OrderAction::Read => Err(ApiError::NotFound("order not found".to_owned())),
        _ => Err(ApiError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maktaba_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus};
    use rust_decimal::Decimal;

    fn order_owned_by(user_id: Option<UserId>) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(1),
            order_number: "ORD-2026-TEST0001".to_owned(),
            user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            shipping_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            currency: "MAD".to_owned(),
            customer_name: "Guest".to_owned(),
            customer_email: "guest@example.com".to_owned(),
            customer_phone: "0600000000".to_owned(),
            shipping_address: "1 Rue Test".to_owned(),
            shipping_city: "Rabat".to_owned(),
            shipping_postal_code: None,
            shipping_country: "Morocco".to_owned(),
            notes: None,
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_staff_can_do_everything() {
        let staff = Actor::user(UserId::new(9), true);
        let order = order_owned_by(Some(UserId::new(1)));
        assert!(can_act_on_order(staff, &order, OrderAction::Read));
        assert!(can_act_on_order(staff, &order, OrderAction::Cancel));
        assert!(can_act_on_order(staff, &order, OrderAction::UpdateStatus));
    }

    #[test]
    fn test_owner_can_read_and_cancel_only() {
        let owner = Actor::user(UserId::new(1), false);
        let order = order_owned_by(Some(UserId::new(1)));
        assert!(can_act_on_order(owner, &order, OrderAction::Read));
        assert!(can_act_on_order(owner, &order, OrderAction::Cancel));
        assert!(!can_act_on_order(owner, &order, OrderAction::UpdateStatus));
    }

    #[test]
    fn test_other_user_gets_nothing() {
        let other = Actor::user(UserId::new(2), false);
        let order = order_owned_by(Some(UserId::new(1)));
        assert!(!can_act_on_order(other, &order, OrderAction::Read));
        assert!(!can_act_on_order(other, &order, OrderAction::Cancel));
    }

    #[test]
    fn test_guest_orders_are_staff_only() {
        let user = Actor::user(UserId::new(1), false);
        let order = order_owned_by(None);
        assert!(!can_act_on_order(user, &order, OrderAction::Read));
        assert!(!can_act_on_order(Actor::ANONYMOUS, &order, OrderAction::Read));
    }

    #[test]
    fn test_authorize_read_denial_is_not_found() {
        let other = Actor::user(UserId::new(2), false);
        let order = order_owned_by(Some(UserId::new(1)));
        assert!(matches!(
            authorize_order(other, &order, OrderAction::Read),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            authorize_order(other, &order, OrderAction::Cancel),
            Err(ApiError::Forbidden)
        ));
    }
}
