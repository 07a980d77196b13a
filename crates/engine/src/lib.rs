pub mod handler;
pub mod queue;
pub mod restock;
pub mod waitlist;
