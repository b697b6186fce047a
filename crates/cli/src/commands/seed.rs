//! Seed the settings table with its default rows.
//!
//! Existing rows are left untouched, so re-running the seeder after editing
//! settings in the admin panel is safe.

use super::CommandError;

/// (key, value, value_type, description, is_public)
const DEFAULT_SETTINGS: &[(&str, &str, &str, &str, bool)] = &[
    ("site_name", "Maktaba", "string", "Site name", true),
    (
        "site_description",
        "Online bookstore for legal and academic titles",
        "string",
        "Site description",
        true,
    ),
    ("contact_email", "info@maktaba.ma", "string", "Contact email", true),
    ("contact_phone", "+212 5 37 00 00 00", "string", "Contact phone", true),
    ("contact_address", "Rabat, Morocco", "string", "Contact address", true),
    (
        "whatsapp_number",
        "+212600000000",
        "string",
        "WhatsApp contact number shown to customers",
        true,
    ),
    (
        "free_shipping_threshold",
        "500",
        "decimal",
        "Minimum subtotal for free shipping",
        true,
    ),
    (
        "shipping_cost",
        "30",
        "decimal",
        "Flat shipping cost below the free-shipping threshold",
        true,
    ),
    (
        "tax_rate",
        "0.20",
        "decimal",
        "VAT rate applied to the subtotal",
        false,
    ),
    ("currency", "MAD", "string", "Store currency code", true),
    ("books_per_page", "12", "integer", "Default catalog page size", false),
    (
        "featured_books_count",
        "8",
        "integer",
        "Books shown on the featured shelf",
        false,
    ),
    (
        "recent_books_count",
        "6",
        "integer",
        "Books shown on the new-arrivals shelf",
        false,
    ),
];

/// Insert any missing default settings.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = super::connect().await?;

    let mut inserted = 0_u32;
    for &(key, value, value_type, description, is_public) in DEFAULT_SETTINGS {
        let result = sqlx::query(
            "INSERT INTO store.settings (key, value, value_type, description, is_public) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .bind(value_type)
        .bind(description)
        .bind(is_public)
        .execute(&pool)
        .await?;
        inserted += u32::try_from(result.rows_affected()).unwrap_or(0);
    }

    tracing::info!(inserted, "Settings seeded");
    Ok(())
}
