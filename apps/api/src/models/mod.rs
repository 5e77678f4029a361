// snapcart/apps/api/src/models/mod.rs

//! Records persisted by the repositories and returned by the API.

pub mod address;
pub mod banner;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod offer;
pub mod order;
pub mod order_item;
pub mod otp;
pub mod product;
pub mod user;

pub use address::Address;
pub use banner::Banner;
pub use cart_item::CartItem;
pub use category::Category;
pub use coupon::{Coupon, CouponUsage, DiscountType};
pub use offer::Offer;
pub use order::{Order, OrderStatus, OrderWithItems, PaymentMethod, PaymentStatus};
pub use order_item::OrderItem;
pub use otp::OtpSession;
pub use product::{Product, ProductVariant, ProductWithVariants};
pub use user::{Role, User};
