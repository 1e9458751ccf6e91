//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, token refresh and role management
//! - `catalog` - Product and category operations
//!
//! Services borrow their repositories from `AppState` for the duration of a
//! request and never touch HTTP types.

pub mod auth;
pub mod catalog;

pub use auth::{AuthError, AuthService};
pub use catalog::{CatalogError, CatalogService};
