//! Domain models for the marketplace API.
//!
//! These types represent validated domain objects separate from database row
//! types. Row decoding lives in `crate::db`.

pub mod product;
pub mod user;

pub use product::{Category, NewProduct, Product, ProductChanges, ProductPage};
pub use user::{NewUser, PublicUser, User};
