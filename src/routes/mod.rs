//! HTTP route handlers.

pub mod auth;
pub mod callback;
pub mod health;
pub mod sign_out;
pub mod start;
pub mod userinfo;
