//! Domain models shared by repositories and route handlers.

pub mod blog;
pub mod book;
pub mod cart;
pub mod contact;
pub mod order;
pub mod review;
pub mod setting;
pub mod taxonomy;
pub mod user;

pub use blog::{BlogCategory, BlogPost, TagCount};
pub use book::{Book, BookDetails};
pub use cart::{CartItem, CartView};
pub use contact::{ContactMessage, Subscriber};
pub use order::{Order, OrderItem, OrderStatistics, OrderWithItems};
pub use review::Review;
pub use setting::Setting;
pub use taxonomy::Taxonomy;
pub use user::{CurrentUser, User};

/// Session keys used by the auth middleware.
pub mod session_keys {
    /// Key under which the logged-in user is stored in the session.
    pub const CURRENT_USER: &str = "current_user";
}
