//! Settings repository.
//!
//! Settings are key/value rows. The pricing calculator never reads them
//! directly: [`SettingsRepository::pricing_config`] materializes an explicit
//! [`PricingConfig`] once per request, falling back to defaults for missing
//! or unparsable rows.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::setting::Setting;
use crate::services::pricing::PricingConfig;

const SETTING_COLUMNS: &str =
    "id, key, value, value_type, description, is_public, created_at, updated_at";

/// Setting keys consumed by the pricing calculator.
pub const FREE_SHIPPING_THRESHOLD_KEY: &str = "free_shipping_threshold";
/// Flat shipping cost below the free-shipping threshold.
pub const SHIPPING_COST_KEY: &str = "shipping_cost";
/// Tax rate applied to the subtotal (fraction, e.g. "0.20").
pub const TAX_RATE_KEY: &str = "tax_rate";

/// Repository for settings database operations.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every setting row (staff only).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<Setting>, RepositoryError> {
        let rows: Vec<Setting> = sqlx::query_as(&format!(
            "SELECT {SETTING_COLUMNS} FROM store.settings ORDER BY key"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Settings marked public, for the storefront.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn public(&self) -> Result<Vec<Setting>, RepositoryError> {
        let rows: Vec<Setting> = sqlx::query_as(&format!(
            "SELECT {SETTING_COLUMNS} FROM store.settings WHERE is_public ORDER BY key"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a single setting value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM store.settings WHERE key = $1")
                .bind(key)
                .fetch_optional(self.pool)
                .await?;
        Ok(value)
    }

    /// Insert or update a setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(
        &self,
        key: &str,
        value: &str,
        value_type: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<Setting, RepositoryError> {
        let row: Setting = sqlx::query_as(&format!(
            "INSERT INTO store.settings AS s (key, value, value_type, description, is_public) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (key) DO UPDATE SET value = $2, value_type = $3, \
               description = COALESCE($4, s.description), \
               is_public = $5, updated_at = NOW() \
             RETURNING {SETTING_COLUMNS}"
        ))
        .bind(key)
        .bind(value)
        .bind(value_type)
        .bind(description)
        .bind(is_public)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Load the pricing configuration for one request.
    ///
    /// Missing or unparsable rows fall back to the defaults baked into
    /// [`PricingConfig::default`]; a bad row is logged, never fatal.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pricing_config(&self) -> Result<PricingConfig, RepositoryError> {
        let mut config = PricingConfig::default();

        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM store.settings WHERE key = ANY($1)",
        )
        .bind(vec![
            FREE_SHIPPING_THRESHOLD_KEY.to_owned(),
            SHIPPING_COST_KEY.to_owned(),
            TAX_RATE_KEY.to_owned(),
        ])
        .fetch_all(self.pool)
        .await?;

        for (key, value) in rows {
            match value.parse::<Decimal>() {
                Ok(parsed) => match key.as_str() {
                    FREE_SHIPPING_THRESHOLD_KEY => config.free_shipping_threshold = parsed,
                    SHIPPING_COST_KEY => config.shipping_cost = parsed,
                    TAX_RATE_KEY => config.tax_rate = parsed,
                    _ => {}
                },
                Err(err) => {
                    tracing::warn!(key, value, error = %err, "ignoring unparsable pricing setting");
                }
            }
        }

        Ok(config)
    }
}
