//! One repository for the six catalog taxonomies.
//!
//! Categories, authors, publishers, series, physical formats, and keywords
//! all share the same shape (name, unique slug, optional description), so a
//! single repository parameterized by [`TaxonomyKind`] serves them all. The
//! kind only supplies table names; every identifier pushed into SQL is a
//! static string from this module, never client input.

use sqlx::{PgPool, Postgres, QueryBuilder};

use maktaba_core::slugify;

use super::RepositoryError;
use super::books::BOOK_COLUMNS_QUALIFIED;
use crate::models::book::Book;
use crate::models::taxonomy::{Taxonomy, TaxonomyRef};
use crate::pagination::{Page, PageParams};

/// How books relate to a taxonomy table.
#[derive(Debug, Clone, Copy)]
enum BookLink {
    /// Books carry a foreign key column.
    Column(&'static str),
    /// Books are linked through a pivot table.
    Pivot {
        table: &'static str,
        fk: &'static str,
    },
}

/// Which taxonomy a repository instance operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Category,
    Author,
    Publisher,
    Series,
    PhysicalFormat,
    Keyword,
}

impl TaxonomyKind {
    /// Schema-qualified table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Category => "store.categories",
            Self::Author => "store.authors",
            Self::Publisher => "store.publishers",
            Self::Series => "store.series",
            Self::PhysicalFormat => "store.physical_formats",
            Self::Keyword => "store.keywords",
        }
    }

    /// Human label used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Author => "author",
            Self::Publisher => "publisher",
            Self::Series => "series",
            Self::PhysicalFormat => "physical format",
            Self::Keyword => "keyword",
        }
    }

    const fn book_link(self) -> BookLink {
        match self {
            Self::Category => BookLink::Column("category_id"),
            Self::Publisher => BookLink::Column("publisher_id"),
            Self::Series => BookLink::Column("series_id"),
            Self::PhysicalFormat => BookLink::Column("physical_format_id"),
            Self::Author => BookLink::Pivot {
                table: "store.book_authors",
                fk: "author_id",
            },
            Self::Keyword => BookLink::Pivot {
                table: "store.book_keywords",
                fk: "keyword_id",
            },
        }
    }

    /// Correlated subquery counting published+available books for row `t`.
    fn books_count_subquery(self) -> String {
        match self.book_link() {
            BookLink::Column(column) => format!(
                "(SELECT COUNT(*) FROM store.books b \
                 WHERE b.{column} = t.id AND b.is_published AND b.is_available)"
            ),
            BookLink::Pivot { table, fk } => format!(
                "(SELECT COUNT(*) FROM {table} p \
                 JOIN store.books b ON b.id = p.book_id \
                 WHERE p.{fk} = t.id AND b.is_published AND b.is_available)"
            ),
        }
    }
}

/// Fields accepted when creating or replacing a taxonomy row.
#[derive(Debug, Clone)]
pub struct TaxonomyInput {
    pub name: String,
    pub description: Option<String>,
}

/// Repository over one taxonomy table.
pub struct TaxonomyRepository<'a> {
    pool: &'a PgPool,
    kind: TaxonomyKind,
}

impl<'a> TaxonomyRepository<'a> {
    /// Create a repository for `kind`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, kind: TaxonomyKind) -> Self {
        Self { pool, kind }
    }

    /// List rows, optionally filtered by a name search, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<Taxonomy>, RepositoryError> {
        let table = self.kind.table();

        let mut count_query =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {table} t WHERE TRUE"));
        push_search(&mut count_query, search);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT t.id, t.name, t.slug, t.description, \
             {} AS books_count, t.created_at, t.updated_at \
             FROM {table} t WHERE TRUE",
            self.kind.books_count_subquery()
        ));
        push_search(&mut query, search);
        query.push(" ORDER BY t.name ASC");

        let (limit, offset) = params.limit_offset(default_per_page);
        query.push(" LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rows: Vec<Taxonomy> = query.build_query_as().fetch_all(self.pool).await?;
        Ok(Page::new(rows, total, params, default_per_page))
    }

    /// Rows with the most books first (used by `keywords/popular`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn popular(&self, limit: i64) -> Result<Vec<Taxonomy>, RepositoryError> {
        let rows: Vec<Taxonomy> = sqlx::query_as(&format!(
            "SELECT t.id, t.name, t.slug, t.description, \
             {} AS books_count, t.created_at, t.updated_at \
             FROM {} t ORDER BY books_count DESC, t.name ASC LIMIT $1",
            self.kind.books_count_subquery(),
            self.kind.table()
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get one row by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Taxonomy>, RepositoryError> {
        let row: Option<Taxonomy> = sqlx::query_as(&format!(
            "SELECT t.id, t.name, t.slug, t.description, \
             {} AS books_count, t.created_at, t.updated_at \
             FROM {} t WHERE t.slug = $1",
            self.kind.books_count_subquery(),
            self.kind.table()
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Lightweight reference to a row by ID, for embedding in book payloads.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_ref(&self, id: i32) -> Result<Option<TaxonomyRef>, RepositoryError> {
        let row: Option<TaxonomyRef> = sqlx::query_as(&format!(
            "SELECT id, name, slug FROM {} WHERE id = $1",
            self.kind.table()
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Published+available books belonging to the row with `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the slug does not exist.
    pub async fn books_of(
        &self,
        slug: &str,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<Book>, RepositoryError> {
        let entity = self
            .get_by_slug(slug)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let join_clause = match self.kind.book_link() {
            BookLink::Column(column) => format!("WHERE b.{column} = $1"),
            BookLink::Pivot { table, fk } => format!(
                "JOIN {table} p ON p.book_id = b.id WHERE p.{fk} = $1"
            ),
        };

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM store.books b {join_clause} \
             AND b.is_published AND b.is_available"
        ))
        .bind(entity.id)
        .fetch_one(self.pool)
        .await?;

        let (limit, offset) = params.limit_offset(default_per_page);
        let books: Vec<Book> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS_QUALIFIED} FROM store.books b {join_clause} \
             AND b.is_published AND b.is_available \
             ORDER BY b.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(entity.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let books = books.into_iter().map(Book::with_computed_price).collect();
        Ok(Page::new(books, total, params, default_per_page))
    }

    /// Insert a new row. The slug is derived from the name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate slug.
    pub async fn create(&self, input: &TaxonomyInput) -> Result<Taxonomy, RepositoryError> {
        let slug = derive_slug(&input.name, self.kind);

        let row: Taxonomy = sqlx::query_as(&format!(
            "WITH inserted AS (\
               INSERT INTO {} (name, slug, description) VALUES ($1, $2, $3) \
               RETURNING id, name, slug, description, created_at, updated_at\
             ) \
             SELECT t.id, t.name, t.slug, t.description, 0::int8 AS books_count, \
                    t.created_at, t.updated_at \
             FROM inserted t",
            self.kind.table()
        ))
        .bind(&input.name)
        .bind(&slug)
        .bind(&input.description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_sqlx(
                e,
                &format!("a {} with this slug already exists", self.kind.label()),
            )
        })?;

        Ok(row)
    }

    /// Replace a row's name and description. The slug follows the name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row does not exist,
    /// `RepositoryError::Conflict` on slug collision.
    pub async fn update(&self, id: i32, input: &TaxonomyInput) -> Result<Taxonomy, RepositoryError> {
        let slug = derive_slug(&input.name, self.kind);

        let row: Option<Taxonomy> = sqlx::query_as(&format!(
            "WITH updated AS (\
               UPDATE {} SET name = $2, slug = $3, description = $4, updated_at = NOW() \
               WHERE id = $1 \
               RETURNING id, name, slug, description, created_at, updated_at\
             ) \
             SELECT t.id, t.name, t.slug, t.description, {} AS books_count, \
                    t.created_at, t.updated_at \
             FROM updated t",
            self.kind.table(),
            self.kind.books_count_subquery()
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&slug)
        .bind(&input.description)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_sqlx(
                e,
                &format!("a {} with this slug already exists", self.kind.label()),
            )
        })?;

        row.ok_or(RepositoryError::NotFound)
    }

    /// Delete a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.kind.table()))
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn push_search(query: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        query.push(" AND t.name ILIKE ");
        query.push_bind(format!("%{search}%"));
    }
}

fn derive_slug(name: &str, kind: TaxonomyKind) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        kind.label().replace(' ', "-")
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_schema_qualified() {
        for kind in [
            TaxonomyKind::Category,
            TaxonomyKind::Author,
            TaxonomyKind::Publisher,
            TaxonomyKind::Series,
            TaxonomyKind::PhysicalFormat,
            TaxonomyKind::Keyword,
        ] {
            assert!(kind.table().starts_with("store."));
        }
    }

    #[test]
    fn test_derive_slug_fallback_per_kind() {
        assert_eq!(derive_slug("Roman Law", TaxonomyKind::Category), "roman-law");
        assert_eq!(derive_slug("قانون", TaxonomyKind::Keyword), "keyword");
        assert_eq!(
            derive_slug("غلاف", TaxonomyKind::PhysicalFormat),
            "physical-format"
        );
    }
}
