//! HTTP API client and authentication.
//!
//! This module provides the [`ApiClient`] used to talk to the store API,
//! along with the [`Auth`] type.

mod api;
mod auth;

pub use api::ApiClient;
pub use auth::Auth;
