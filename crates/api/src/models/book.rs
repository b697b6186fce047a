//! Book model and serialized views.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use maktaba_core::{
    BookId, CategoryId, FormatId, PublisherId, SeriesId, discount_percentage, final_price,
};

use super::review::Review;
use super::taxonomy::TaxonomyRef;

/// A catalog book, as stored.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub slug: String,
    pub isbn: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub pages: Option<i32>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub front_image_url: Option<String>,
    pub back_image_url: Option<String>,
    pub language: Option<String>,
    pub edition: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub is_published: bool,
    pub is_available: bool,
    pub is_featured: bool,
    pub stock_quantity: i32,
    pub views_count: i32,
    pub sales_count: i32,
    pub rating: Decimal,
    pub reviews_count: i32,
    pub category_id: Option<CategoryId>,
    pub publisher_id: Option<PublisherId>,
    pub series_id: Option<SeriesId>,
    pub physical_format_id: Option<FormatId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Effective selling price; computed on load, never stored.
    #[sqlx(default)]
    #[serde(rename = "final_price")]
    pub final_price_cached: Option<Decimal>,
}

impl Book {
    /// Effective selling price: base price minus any discount.
    #[must_use]
    pub fn final_price(&self) -> Decimal {
        final_price(self.price, self.discount_price)
    }

    /// Percentage of the base price covered by the discount.
    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        discount_percentage(self.price, self.discount_price)
    }

    /// Whether the book can be put in a cart or order.
    #[must_use]
    pub const fn is_orderable(&self) -> bool {
        self.is_published && self.is_available
    }

    /// Whether stock is tracked for this title (0 means untracked).
    #[must_use]
    pub const fn tracks_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Fill the serialized `final_price` field. Repositories call this on
    /// every row they return.
    #[must_use]
    pub fn with_computed_price(mut self) -> Self {
        self.final_price_cached = Some(self.final_price());
        self
    }
}

/// A book with its loaded relations, returned by the detail endpoint.
#[derive(Debug, Serialize)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub discount_percentage: u32,
    pub category: Option<TaxonomyRef>,
    pub publisher: Option<TaxonomyRef>,
    pub series: Option<TaxonomyRef>,
    pub physical_format: Option<TaxonomyRef>,
    pub authors: Vec<TaxonomyRef>,
    pub keywords: Vec<TaxonomyRef>,
    pub reviews: Vec<Review>,
}
