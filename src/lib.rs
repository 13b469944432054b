// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coffee Shop API - drinks catalog behind scope-gated JWT authorization.
//!
//! Bearer tokens issued by Auth0 are verified against the provider's JWKS;
//! every write and the detailed listing require an explicit permission scope.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token extraction, verification and permission enforcement
//! - `config` - Environment configuration
//! - `store` - In-memory drink store

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
