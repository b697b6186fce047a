//! Business services on top of the repositories.

pub mod notifications;
pub mod orders;
pub mod passwords;
pub mod pricing;

pub use notifications::WhatsAppNotifier;
pub use orders::OrderService;
pub use pricing::{PricingConfig, Quote, QuoteLine, price_quote};
