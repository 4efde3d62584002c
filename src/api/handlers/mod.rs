//! API handlers for the credential service.

pub mod api_keys;
pub mod auth;
pub mod health;
pub mod root;
pub mod users;
