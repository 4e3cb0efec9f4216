//! # Domain Layer
//!
//! Pure calculators (age, insights, week grid), the scheduled clock that
//! drives them, and the services that manage the user's stored documents.
//! Nothing in here knows how results are displayed.

pub mod age;
pub mod bucket_list_service;
pub mod clock;
pub mod commands;
pub mod goal_service;
pub mod insights;
pub mod journal_service;
pub mod live_age;
pub mod milestone_import;
pub mod milestone_service;
pub mod models;
pub mod profile_service;
pub mod quote_service;
pub mod theme_service;
pub mod week_grid;

pub use age::*;
pub use bucket_list_service::*;
pub use clock::*;
pub use goal_service::*;
pub use insights::*;
pub use journal_service::*;
pub use live_age::*;
pub use milestone_service::*;
pub use profile_service::*;
pub use quote_service::*;
pub use theme_service::*;
pub use week_grid::*;
