//! Marketplace Core - Shared types library.
//!
//! This crate provides the types shared by every marketplace component:
//! - `api` - The HTTP service (auth + product catalog)
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision logic - no I/O, no
//! database access, no HTTP. The product search rules live here so that the
//! `PostgreSQL` repository and the in-memory test store agree on them.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, prices, roles and password hashes
//! - [`query`] - Product search, sort and pagination model

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod query;
pub mod types;

pub use query::{
    MatchTier, PageRequest, PageWindow, ProductFilter, ProductQuery, QueryError, SearchTerm,
    SortKey, SortOrder, SortSpec, parse_timestamp,
};
pub use types::*;
