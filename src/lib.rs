//! Local cache for IPO listings.
//!
//! Layers, leaf first:
//! - [`store`]: persistent key-value store with a silent-degrade policy
//! - [`cache`]: expiring listing cache, favorites, watchlist and preferences
//! - [`session`]: mirrored facade with change notifications for UI code

pub mod cache;
pub mod config;
pub mod ipo;
pub mod preferences;
pub mod session;
pub mod store;
