//! Record registry and durable storage

pub mod record_store;
pub mod registry;

pub use record_store::RecordStore;
pub use registry::{
    RequestRegistry, Settlement, SubscriptionId, DEFAULT_CAPACITY, DEFAULT_PERSIST_LIMIT,
};
