// Library entry point for campus-hub
// Exposes modules for testing

pub mod api;
pub mod auth;
pub mod geocode;
pub mod models;
pub mod store;
