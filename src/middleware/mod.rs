//! Request-level protections.

pub mod csrf;
