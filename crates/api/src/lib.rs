//! HTTP surface of the buy-when-restocked service.
//!
//! Endpoints:
//! - POST /api/opt-in — join a product's waitlist
//! - POST /api/checkout/link — draft order checkout link
//! - POST /api/payments/setup-intent — save a card for off-session charges
//! - POST /api/payments/charge — charge a saved card
//! - POST /webhooks/inventory — commerce platform restock signal
//! - POST /webhooks/stripe — payment provider events

pub mod middleware;
pub mod routes;
pub mod state;
