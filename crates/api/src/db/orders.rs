//! Order repository.
//!
//! Read paths operate on the pool. The write paths used by order creation
//! and cancellation are free functions over `&mut PgConnection` so they can
//! run inside [`super::with_transaction`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use maktaba_core::{BookId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem, OrderStatistics, OrderWithItems};
use crate::pagination::{Page, PageParams};

/// Columns selected for every order row.
const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_status, payment_method, \
     subtotal, tax_amount, shipping_amount, discount_amount, total_amount, currency, \
     customer_name, customer_email, customer_phone, shipping_address, shipping_city, \
     shipping_postal_code, shipping_country, notes, tracking_number, shipped_at, delivered_at, \
     created_at, updated_at";

/// Optional filters for order listings.
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    /// Scope to one user's orders (always set for non-staff callers).
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Matches order number, customer name, or customer email.
    pub search: Option<String>,
}

/// Customer and shipping fields for a new order header.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub payment_method: PaymentMethod,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: Option<String>,
    pub shipping_country: String,
    pub notes: Option<String>,
    pub currency: String,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders matching `filter`, newest first, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<Order>, RepositoryError> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM store.orders WHERE TRUE");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM store.orders WHERE TRUE"
        ));
        push_filters(&mut query, filter);
        query.push(" ORDER BY created_at DESC");

        let (limit, offset) = params.limit_offset(default_per_page);
        query.push(" LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let orders: Vec<Order> = query.build_query_as().fetch_all(self.pool).await?;
        Ok(Page::new(orders, total, params, default_per_page))
    }

    /// Get an order header by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order: Option<Order> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM store.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Get an order with its line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_items(
        &self,
        id: OrderId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.items_of(id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// Line items of an order, joined with their book titles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_of(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as(
            "SELECT i.id, i.order_id, i.book_id, b.title AS book_title, b.slug AS book_slug, \
                    i.quantity, i.unit_price, i.total_price \
             FROM store.order_items i \
             JOIN store.books b ON b.id = i.book_id \
             WHERE i.order_id = $1 \
             ORDER BY i.id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Set an order's status, stamping shipped/delivered timestamps the
    /// first time those statuses are reached. Tracking number and notes are
    /// only overwritten when provided.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        let order: Option<Order> = sqlx::query_as(&format!(
            "UPDATE store.orders SET \
               status = $2, \
               tracking_number = COALESCE($3, tracking_number), \
               notes = COALESCE($4, notes), \
               shipped_at = CASE WHEN $2 = 'shipped' AND shipped_at IS NULL \
                                 THEN NOW() ELSE shipped_at END, \
               delivered_at = CASE WHEN $2 = 'delivered' AND delivered_at IS NULL \
                                   THEN NOW() ELSE delivered_at END, \
               updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(tracking_number)
        .bind(notes)
        .fetch_optional(self.pool)
        .await?;

        order.ok_or(RepositoryError::NotFound)
    }

    /// Aggregate counts and revenue for the admin dashboard. Revenue counts
    /// shipped and delivered orders only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn statistics(&self) -> Result<OrderStatistics, RepositoryError> {
        let stats = sqlx::query_as(
            "SELECT \
               COUNT(*) AS total_orders, \
               COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders, \
               COUNT(*) FILTER (WHERE status = 'processing') AS processing_orders, \
               COUNT(*) FILTER (WHERE status = 'shipped') AS shipped_orders, \
               COUNT(*) FILTER (WHERE status = 'delivered') AS delivered_orders, \
               COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_orders, \
               COALESCE(SUM(total_amount) FILTER \
                 (WHERE status IN ('shipped', 'delivered')), 0) AS total_revenue, \
               COALESCE(SUM(total_amount) FILTER \
                 (WHERE status IN ('shipped', 'delivered') \
                  AND date_trunc('month', created_at) = date_trunc('month', NOW())), 0) \
                 AS monthly_revenue \
             FROM store.orders",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }
}

// =============================================================================
// Transactional write path (order creation / cancellation)
// =============================================================================

/// Insert a pending order header with zeroed totals. Totals are written by
/// [`finalize_totals`] once every line item has been priced.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` when the generated order number
/// collides, `RepositoryError::Database` otherwise.
pub async fn insert_header(
    conn: &mut PgConnection,
    new_order: &NewOrder,
) -> Result<Order, RepositoryError> {
    let order: Order = sqlx::query_as(&format!(
        "INSERT INTO store.orders \
           (order_number, user_id, payment_method, customer_name, customer_email, \
            customer_phone, shipping_address, shipping_city, shipping_postal_code, \
            shipping_country, notes, currency) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(&new_order.order_number)
    .bind(new_order.user_id)
    .bind(new_order.payment_method)
    .bind(&new_order.customer_name)
    .bind(&new_order.customer_email)
    .bind(&new_order.customer_phone)
    .bind(&new_order.shipping_address)
    .bind(&new_order.shipping_city)
    .bind(&new_order.shipping_postal_code)
    .bind(&new_order.shipping_country)
    .bind(&new_order.notes)
    .bind(&new_order.currency)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_sqlx(e, "order number collision"))?;

    Ok(order)
}

/// Insert one line item with its snapshotted unit price.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    book_id: BookId,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO store.order_items (order_id, book_id, quantity, unit_price, total_price) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order_id)
    .bind(book_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(total_price)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Write the computed totals onto the order header.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn finalize_totals(
    conn: &mut PgConnection,
    order_id: OrderId,
    subtotal: Decimal,
    tax_amount: Decimal,
    shipping_amount: Decimal,
    discount_amount: Decimal,
    total_amount: Decimal,
) -> Result<Order, RepositoryError> {
    let order: Order = sqlx::query_as(&format!(
        "UPDATE store.orders SET subtotal = $2, tax_amount = $3, shipping_amount = $4, \
         discount_amount = $5, total_amount = $6, updated_at = NOW() \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(subtotal)
    .bind(tax_amount)
    .bind(shipping_amount)
    .bind(discount_amount)
    .bind(total_amount)
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

/// Lock an order row for cancellation and return it.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_for_update(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let order: Option<Order> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM store.orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(order)
}

/// Raw (book, quantity) pairs of an order's items, for counter reversal.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn item_quantities(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<(BookId, i32)>, RepositoryError> {
    let rows: Vec<(BookId, i32)> =
        sqlx::query_as("SELECT book_id, quantity FROM store.order_items WHERE order_id = $1")
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(rows)
}

/// Mark an order cancelled.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_cancelled(conn: &mut PgConnection, id: OrderId) -> Result<Order, RepositoryError> {
    let order: Order = sqlx::query_as(&format!(
        "UPDATE store.orders SET status = 'cancelled', updated_at = NOW() \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ");
        query.push_bind(user_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ");
        query.push_bind(status);
    }
    if let Some(payment_status) = filter.payment_status {
        query.push(" AND payment_status = ");
        query.push_bind(payment_status);
    }
    if let Some(date_from) = filter.date_from {
        query.push(" AND created_at::date >= ");
        query.push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        query.push(" AND created_at::date <= ");
        query.push_bind(date_to);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        query.push(" AND (order_number ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR customer_name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR customer_email ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
}
