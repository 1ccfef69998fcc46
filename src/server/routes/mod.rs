//! HTTP Routes
//!
//! Route handlers organized by functionality.

pub mod health;
pub mod map;
pub mod page;
pub mod status;
