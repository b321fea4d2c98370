//! Data models shared across the inspector

pub mod cart;
pub mod record;

pub use cart::{CartDiff, CartLine, CartSnapshot, LineChange, MutationDeltas};
pub use record::{
    HttpMethod, RecordFilter, RequestBody, RequestCategory, RequestOrigin, RequestRecord,
    RequestStatus,
};
