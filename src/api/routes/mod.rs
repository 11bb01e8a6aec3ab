//! API Routes
//!
//! Route handlers organized by functionality.

pub mod admin;
pub mod analytics;
pub mod challenges;
pub mod credentials;
pub mod health;
pub mod layout;
pub mod market;
pub mod profile;
pub mod trades;
