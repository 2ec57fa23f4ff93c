//! Admin REST API: engine status, manual reconcile, map lookup, fake alerts
//! and subscription management

pub mod handlers;
pub mod models;
pub mod routes;
