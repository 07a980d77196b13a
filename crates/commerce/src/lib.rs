//! Commerce-platform and payments-provider clients.
//!
//! - [`shopify`] — Admin GraphQL draft orders
//! - [`stripe`] — customers, SetupIntents, off-session PaymentIntents, webhook events
//! - [`signature`] — inbound webhook signature checks for both providers

pub mod error;
pub mod shopify;
pub mod signature;
pub mod stripe;

pub use error::CommerceError;
pub use shopify::ShopifyClient;
pub use stripe::StripeClient;
