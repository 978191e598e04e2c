//! Route handlers, grouped the way the router nests them.

pub mod auth;
pub mod devices;
pub mod health;
pub mod users;
