//! Domain models for the storefront.
//!
//! Validated domain objects, separate from the database row types in
//! [`crate::db`]. JSON field names are camelCase to match the storefront
//! client.

pub mod activity;
pub mod cart;
pub mod contact;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use activity::{Activity, NewActivity};
pub use cart::{Cart, CartItem, CartLineView, CartView};
pub use contact::{ContactForm, ContactSubmission, NewContact};
pub use order::{
    NewOrder, Order, OrderDetail, OrderItem, OrderItemView, OrderPricing, PaymentInfo,
    ShippingInfo,
};
pub use product::{
    NewProduct, NewProductImage, Product, ProductFilter, ProductImage, ProductPage, ProductPatch,
    ProductSort, ProductSummary, SortField, Variant, VariantInput,
};
pub use session::{Caller, CurrentUser, keys as session_keys};
pub use user::{NewUser, ProfileUpdate, User};
