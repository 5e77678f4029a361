// snapcart/apps/api/src/services/mod.rs

pub mod auth_service;
pub mod notifier;
pub mod otp_service;
pub mod payment_gateway;
pub mod token_service;
