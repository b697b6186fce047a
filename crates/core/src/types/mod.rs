//! Core types for Maktaba.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{discount_percentage, final_price, round_money};
pub use slug::slugify;
pub use status::*;
