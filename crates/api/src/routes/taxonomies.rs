//! Handlers for the six catalog taxonomies.
//!
//! The per-entity modules are generated by `taxonomy_handlers!`; each is a
//! thin wrapper over the shared `*_impl` functions with its
//! [`TaxonomyKind`] baked in.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, http::StatusCode};
use serde::Deserialize;

use crate::db::taxonomies::TaxonomyInput;
use crate::db::{TaxonomyKind, TaxonomyRepository};
use crate::error::ApiError;
use crate::middleware::auth::RequireStaff;
use crate::models::book::Book;
use crate::models::taxonomy::Taxonomy;
use crate::pagination::{Page, PageParams};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 15;
const DEFAULT_BOOKS_PER_PAGE: u32 = 12;

/// Query parameters for taxonomy listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Limit query for popular listings.
#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<i64>,
}

/// Create/update payload.
#[derive(Debug, Deserialize)]
pub struct TaxonomyPayload {
    pub name: String,
    pub description: Option<String>,
}

impl TaxonomyPayload {
    fn validate(&self) -> Result<TaxonomyInput, ApiError> {
        let name = self.name.trim();
        if name.is_empty() || name.len() > 255 {
            return Err(ApiError::Validation(
                "name is required and must be at most 255 characters".to_owned(),
            ));
        }
        Ok(TaxonomyInput {
            name: name.to_owned(),
            description: self.description.clone(),
        })
    }
}

async fn index_impl(
    kind: TaxonomyKind,
    state: AppState,
    query: ListQuery,
) -> Result<Json<Page<Taxonomy>>, ApiError> {
    let params = PageParams::new(query.page, query.per_page);
    let page = TaxonomyRepository::new(state.pool(), kind)
        .list(query.search.as_deref(), params, DEFAULT_PER_PAGE)
        .await?;
    Ok(Json(page))
}

async fn show_impl(
    kind: TaxonomyKind,
    state: AppState,
    slug: String,
) -> Result<Json<Taxonomy>, ApiError> {
    let entity = TaxonomyRepository::new(state.pool(), kind)
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} '{slug}' not found", kind.label())))?;
    Ok(Json(entity))
}

async fn books_impl(
    kind: TaxonomyKind,
    state: AppState,
    slug: String,
    page: PageParams,
) -> Result<Json<Page<Book>>, ApiError> {
    let books = TaxonomyRepository::new(state.pool(), kind)
        .books_of(&slug, page, DEFAULT_BOOKS_PER_PAGE)
        .await
        .map_err(|err| match err {
            crate::db::RepositoryError::NotFound => {
                ApiError::NotFound(format!("{} '{slug}' not found", kind.label()))
            }
            other => other.into(),
        })?;
    Ok(Json(books))
}

async fn popular_impl(
    kind: TaxonomyKind,
    state: AppState,
    query: PopularQuery,
) -> Result<Json<Vec<Taxonomy>>, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let rows = TaxonomyRepository::new(state.pool(), kind)
        .popular(limit)
        .await?;
    Ok(Json(rows))
}

async fn create_impl(
    kind: TaxonomyKind,
    state: AppState,
    payload: TaxonomyPayload,
) -> Result<(StatusCode, Json<Taxonomy>), ApiError> {
    let input = payload.validate()?;
    let entity = TaxonomyRepository::new(state.pool(), kind)
        .create(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

async fn update_impl(
    kind: TaxonomyKind,
    state: AppState,
    id: i32,
    payload: TaxonomyPayload,
) -> Result<Json<Taxonomy>, ApiError> {
    let input = payload.validate()?;
    let entity = TaxonomyRepository::new(state.pool(), kind)
        .update(id, &input)
        .await?;
    Ok(Json(entity))
}

async fn destroy_impl(kind: TaxonomyKind, state: AppState, id: i32) -> Result<StatusCode, ApiError> {
    TaxonomyRepository::new(state.pool(), kind).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generate the handler module for one taxonomy.
macro_rules! taxonomy_handlers {
    ($mod_name:ident, $kind:expr) => {
        pub mod $mod_name {
            use super::*;

            pub async fn index(
                State(state): State<AppState>,
                Query(query): Query<ListQuery>,
            ) -> Result<Json<Page<Taxonomy>>, ApiError> {
                index_impl($kind, state, query).await
            }

            pub async fn show(
                State(state): State<AppState>,
                Path(slug): Path<String>,
            ) -> Result<Json<Taxonomy>, ApiError> {
                show_impl($kind, state, slug).await
            }

            pub async fn books(
                State(state): State<AppState>,
                Path(slug): Path<String>,
                Query(page): Query<PageParams>,
            ) -> Result<Json<Page<Book>>, ApiError> {
                books_impl($kind, state, slug, page).await
            }

            pub async fn popular(
                State(state): State<AppState>,
                Query(query): Query<PopularQuery>,
            ) -> Result<Json<Vec<Taxonomy>>, ApiError> {
                popular_impl($kind, state, query).await
            }

            pub async fn create(
                RequireStaff(_staff): RequireStaff,
                State(state): State<AppState>,
                Json(payload): Json<TaxonomyPayload>,
            ) -> Result<(StatusCode, Json<Taxonomy>), ApiError> {
                create_impl($kind, state, payload).await
            }

            pub async fn update(
                RequireStaff(_staff): RequireStaff,
                State(state): State<AppState>,
                Path(id): Path<i32>,
                Json(payload): Json<TaxonomyPayload>,
            ) -> Result<Json<Taxonomy>, ApiError> {
                update_impl($kind, state, id, payload).await
            }

            pub async fn destroy(
                RequireStaff(_staff): RequireStaff,
                State(state): State<AppState>,
                Path(id): Path<i32>,
            ) -> Result<StatusCode, ApiError> {
                destroy_impl($kind, state, id).await
            }
        }
    };
}

taxonomy_handlers!(categories, TaxonomyKind::Category);
taxonomy_handlers!(authors, TaxonomyKind::Author);
taxonomy_handlers!(publishers, TaxonomyKind::Publisher);
taxonomy_handlers!(series, TaxonomyKind::Series);
taxonomy_handlers!(physical_formats, TaxonomyKind::PhysicalFormat);
taxonomy_handlers!(keywords, TaxonomyKind::Keyword);

/// Public taxonomy routes, merged under `/api`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories::index))
        .route("/categories/{slug}", get(categories::show))
        .route("/categories/{slug}/books", get(categories::books))
        .route("/authors", get(authors::index))
        .route("/authors/{slug}", get(authors::show))
        .route("/authors/{slug}/books", get(authors::books))
        .route("/publishers", get(publishers::index))
        .route("/publishers/{slug}", get(publishers::show))
        .route("/publishers/{slug}/books", get(publishers::books))
        .route("/series", get(series::index))
        .route("/series/{slug}", get(series::show))
        .route("/series/{slug}/books", get(series::books))
        .route("/physical-formats", get(physical_formats::index))
        .route("/physical-formats/{slug}", get(physical_formats::show))
        .route("/physical-formats/{slug}/books", get(physical_formats::books))
        .route("/keywords", get(keywords::index))
        .route("/keywords/popular", get(keywords::popular))
        .route("/keywords/{slug}", get(keywords::show))
        .route("/keywords/{slug}/books", get(keywords::books))
}

/// Staff taxonomy CRUD, merged under `/api/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", axum::routing::post(categories::create))
        .route(
            "/categories/{id}",
            axum::routing::put(categories::update).delete(categories::destroy),
        )
        .route("/authors", axum::routing::post(authors::create))
        .route(
            "/authors/{id}",
            axum::routing::put(authors::update).delete(authors::destroy),
        )
        .route("/publishers", axum::routing::post(publishers::create))
        .route(
            "/publishers/{id}",
            axum::routing::put(publishers::update).delete(publishers::destroy),
        )
        .route("/series", axum::routing::post(series::create))
        .route(
            "/series/{id}",
            axum::routing::put(series::update).delete(series::destroy),
        )
        .route(
            "/physical-formats",
            axum::routing::post(physical_formats::create),
        )
        .route(
            "/physical-formats/{id}",
            axum::routing::put(physical_formats::update).delete(physical_formats::destroy),
        )
        .route("/keywords", axum::routing::post(keywords::create))
        .route(
            "/keywords/{id}",
            axum::routing::put(keywords::update).delete(keywords::destroy),
        )
}
