pub mod api;
pub mod cohort;
pub mod config;
pub mod consts;
pub mod error;
pub mod groups;
pub mod optimizer;
pub mod result;
pub mod scorer;
pub mod store;
pub mod strata;
// cmd and reports belong to the binary crate (main.rs).
