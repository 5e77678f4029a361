// snapcart/apps/api/src/lib.rs

//! Snapcart marketplace API: catalog, cart, checkout, orders, promotions and
//! analytics over actix-web, with multi-step operations run as `flow` pipelines.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod pricing;
pub mod repository;
pub mod seed;
pub mod services;
pub mod state;
pub mod web;

pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
