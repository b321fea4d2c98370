//! Public operation surface consumed by the devtools panels

pub mod inspector;

pub use inspector::{Inspector, InspectorConfig};
