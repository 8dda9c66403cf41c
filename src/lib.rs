//! Message Composer — step-by-step wizard that collects what a personal
//! message should say, generates it through a primary transport with one
//! fallback, and saves accepted results.

pub mod compose;
pub mod config;
pub mod error;
pub mod generation;
pub mod routes;
pub mod store;
pub mod wizard;
