// snapcart/apps/api/src/web/handlers/mod.rs

pub mod analytics_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod catalog_handlers;
pub mod checkout_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod promotion_handlers;
pub mod user_handlers;
