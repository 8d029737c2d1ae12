//! HTTP reporting surface
//!
//! Read-only JSON endpoints over the profile store and run reports.

pub mod health;
pub mod profiles;
pub mod reports;

pub use health::health_routes;
pub use profiles::profile_routes;
pub use reports::report_routes;
