//! Reading list service
//!
//! Books CRUD over HTTP with partial-update merge semantics, assembled from
//! the kernel, HTTP, database, and telemetry crates.

pub mod app;
pub mod modules;

pub use app::App;
pub use modules::books;
