//! Order handlers: guest checkout, customer order access, staff management.

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};
use chrono::NaiveDate;
use serde::Deserialize;

use maktaba_core::{BookId, Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus};

use crate::authz::{Actor, OrderAction, authorize_order};
use crate::db::orders::OrderFilter;
use crate::db::{OrderRepository, SettingsRepository};
use crate::error::ApiError;
use crate::middleware::auth::{OptionalUser, RequireStaff, RequireUser};
use crate::models::order::{Order, OrderStatistics, OrderWithItems};
use crate::pagination::{Page, PageParams};
use crate::services::orders::{OrderService, PlaceOrder};
use crate::state::AppState;

const DEFAULT_ORDERS_PER_PAGE: u32 = 15;

/// One submitted cart line.
#[derive(Debug, Deserialize)]
pub struct OrderItemPayload {
    pub book_id: i32,
    pub quantity: i32,
}

/// Checkout payload (guest or logged-in).
#[derive(Debug, Deserialize)]
pub struct StoreOrderPayload {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: Option<String>,
    pub shipping_country: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub items: Vec<OrderItemPayload>,
}

impl StoreOrderPayload {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("customer_name", &self.customer_name, 255)?;
        Email::parse(self.customer_email.trim())
            .map_err(|e| ApiError::Validation(format!("invalid customer_email: {e}")))?;
        require_text("customer_phone", &self.customer_phone, 20)?;
        require_text("shipping_address", &self.shipping_address, 500)?;
        require_text("shipping_city", &self.shipping_city, 100)?;
        if self.items.is_empty() {
            return Err(ApiError::Validation(
                "order must contain at least one item".to_owned(),
            ));
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > max {
        return Err(ApiError::Validation(format!(
            "{field} is required and must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Query parameters for order listings.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderListQuery {
    fn into_filter(self) -> (OrderFilter, PageParams) {
        (
            OrderFilter {
                user_id: None,
                status: self.status,
                payment_status: self.payment_status,
                date_from: self.date_from,
                date_to: self.date_to,
                search: self.search,
            },
            PageParams::new(self.page, self.per_page),
        )
    }
}

/// Status mutation payload (staff).
#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

/// `POST /api/orders` - guest checkout.
pub async fn store(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Json(payload): Json<StoreOrderPayload>,
) -> Result<(StatusCode, Json<OrderWithItems>), ApiError> {
    payload.validate()?;

    let settings = SettingsRepository::new(state.pool());
    let pricing = settings.pricing_config().await?;
    let currency = settings
        .get("currency")
        .await?
        .unwrap_or_else(|| "MAD".to_owned());

    let request = PlaceOrder {
        user_id: current.map(|user| user.id),
        payment_method: payload.payment_method.unwrap_or_default(),
        customer_name: payload.customer_name.trim().to_owned(),
        customer_email: payload.customer_email.trim().to_owned(),
        customer_phone: payload.customer_phone.trim().to_owned(),
        shipping_address: payload.shipping_address.trim().to_owned(),
        shipping_city: payload.shipping_city.trim().to_owned(),
        shipping_postal_code: payload.shipping_postal_code,
        shipping_country: payload.shipping_country,
        notes: payload.notes,
        items: payload
            .items
            .iter()
            .map(|item| (BookId::new(item.book_id), item.quantity))
            .collect(),
    };

    let order = OrderService::new(state.pool(), state.notifier())
        .create_order(request, pricing, currency)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders` - own orders, or all orders for staff.
pub async fn index(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    let (mut filter, page) = query.into_filter();
    if !current.is_staff {
        filter.user_id = Some(current.id);
    }
    let orders = OrderRepository::new(state.pool())
        .list(&filter, page, DEFAULT_ORDERS_PER_PAGE)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/user/orders` - always scoped to the caller.
pub async fn user_orders(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    let (mut filter, page) = query.into_filter();
    filter.user_id = Some(current.id);
    let orders = OrderRepository::new(state.pool())
        .list(&filter, page, DEFAULT_ORDERS_PER_PAGE)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<i32>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let order = OrderRepository::new(state.pool())
        .get_with_items(OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("order not found".to_owned()))?;

    authorize_order(current.actor(), &order.order, OrderAction::Read)?;
    Ok(Json(order))
}

/// `PUT /api/orders/{id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<i32>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let order = OrderService::new(state.pool(), state.notifier())
        .cancel_order(current.actor(), OrderId::new(id))
        .await?;
    Ok(Json(order))
}

/// `GET /api/admin/orders`
pub async fn admin_index(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    let (filter, page) = query.into_filter();
    let orders = OrderRepository::new(state.pool())
        .list(&filter, page, DEFAULT_ORDERS_PER_PAGE)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/admin/orders/statistics`
pub async fn statistics(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<OrderStatistics>, ApiError> {
    let stats = OrderRepository::new(state.pool()).statistics().await?;
    Ok(Json(stats))
}

/// `GET /api/admin/orders/{id}`
pub async fn admin_show(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let order = OrderRepository::new(state.pool())
        .get_with_items(OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("order not found".to_owned()))?;

    // Staff always pass; keep the single capability check on the one path.
    authorize_order(
        Actor::user(staff.id, staff.is_staff),
        &order.order,
        OrderAction::Read,
    )?;
    Ok(Json(order))
}

/// `PUT /api/admin/orders/{id}/status`
pub async fn update_status(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<OrderWithItems>, ApiError> {
    if let Some(tracking) = payload.tracking_number.as_deref()
        && tracking.len() > 100
    {
        return Err(ApiError::Validation(
            "tracking_number must be at most 100 characters".to_owned(),
        ));
    }

    let order = OrderService::new(state.pool(), state.notifier())
        .update_status(
            OrderId::new(id),
            payload.status,
            payload.tracking_number.as_deref(),
            payload.notes.as_deref(),
        )
        .await?;
    Ok(Json(order))
}
