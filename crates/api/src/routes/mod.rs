//! HTTP routes.
//!
//! The public surface lives under `/api`, staff endpoints under
//! `/api/admin`. Authentication is enforced per handler through the
//! extractors in [`crate::middleware::auth`], mirroring the split the
//! session layer cannot express on its own.

pub mod auth;
pub mod blog;
pub mod books;
pub mod cart;
pub mod contact;
pub mod orders;
pub mod reviews;
pub mod settings;
pub mod taxonomies;
pub mod wishlist;

use axum::Router;
use axum::routing::{delete, get, post, put};

use crate::state::AppState;

/// Assemble the full route tree.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api", public_routes().merge(user_routes()))
        .nest("/api/admin", admin_routes())
}

/// Routes reachable without a session.
fn public_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Books
        .route("/books", get(books::index))
        .route("/books/featured", get(books::featured))
        .route("/books/recent", get(books::recent))
        .route("/books/{slug}", get(books::show))
        // Reviews (public read + guest submission)
        .route(
            "/books/{slug}/reviews",
            get(reviews::index).post(reviews::store),
        )
        // Taxonomies
        .merge(taxonomies::public_routes())
        // Blog
        .route("/blog", get(blog::index))
        .route("/blog/categories", get(blog::categories))
        .route("/blog/tags", get(blog::tags))
        .route("/blog/tags/popular", get(blog::popular_tags))
        .route("/blog/featured", get(blog::featured))
        .route("/blog/recent", get(blog::recent))
        .route("/blog/{slug}", get(blog::show))
        .route("/blog/{slug}/related", get(blog::related))
        // Contact & newsletter
        .route("/contact", post(contact::store))
        .route("/newsletter/subscribe", post(contact::subscribe))
        .route("/newsletter/unsubscribe", post(contact::unsubscribe))
        // Guest checkout
        .route("/orders", post(orders::store))
        // Public settings
        .route("/settings", get(settings::public_settings))
}

/// Routes that require a logged-in user.
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(auth::me))
        .route("/user/profile", put(auth::update_profile))
        .route("/user/orders", get(orders::user_orders))
        .route("/logout", post(auth::logout))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/cancel", put(orders::cancel))
        // Cart
        .route("/cart", get(cart::index).post(cart::store).delete(cart::clear))
        .route("/cart/{id}", put(cart::update).delete(cart::destroy))
        // Wishlist
        .route(
            "/wishlist",
            get(wishlist::index)
                .post(wishlist::store)
                .delete(wishlist::clear),
        )
        .route("/wishlist/{book_id}", delete(wishlist::destroy))
        .route("/wishlist/{book_id}/check", get(wishlist::check))
        // Own reviews
        .route(
            "/reviews/{id}",
            put(reviews::update).delete(reviews::destroy),
        )
}

/// Staff-only routes.
fn admin_routes() -> Router<AppState> {
    Router::new()
        // Books
        .route("/books", get(books::admin_index).post(books::store))
        .route(
            "/books/{id}",
            get(books::admin_show)
                .put(books::update)
                .delete(books::destroy),
        )
        // Taxonomies
        .merge(taxonomies::admin_routes())
        // Orders
        .route("/orders", get(orders::admin_index))
        .route("/orders/statistics", get(orders::statistics))
        .route("/orders/{id}", get(orders::admin_show))
        .route("/orders/{id}/status", put(orders::update_status))
        // Blog
        .route("/blog", get(blog::admin_index).post(blog::store))
        .route("/blog/{id}", put(blog::update).delete(blog::destroy))
        .route("/blog-categories", post(blog::store_category))
        .route(
            "/blog-categories/{id}",
            put(blog::update_category).delete(blog::destroy_category),
        )
        // Review moderation
        .route("/reviews/pending", get(reviews::pending))
        .route("/reviews/{id}/approve", put(reviews::approve))
        .route("/reviews/{id}/unapprove", put(reviews::unapprove))
        .route("/reviews/{id}", delete(reviews::admin_destroy))
        // Contact messages & newsletter
        .route("/messages", get(contact::admin_messages))
        .route(
            "/messages/{id}",
            get(contact::admin_show_message).delete(contact::admin_destroy_message),
        )
        .route("/messages/{id}/read", put(contact::admin_mark_read))
        .route("/newsletter/subscribers", get(contact::admin_subscribers))
        // Settings
        .route(
            "/settings",
            get(settings::admin_settings).put(settings::admin_upsert),
        )
}
