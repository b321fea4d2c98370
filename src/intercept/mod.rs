//! Network interception: URL classification, the transport shim, the
//! source blocklist, and the staleness monitor.

pub mod blocklist;
pub mod classify;
pub mod monitor;
pub mod shim;

pub use blocklist::{BlockedSource, SourceBlocklist};
pub use monitor::{StalenessMonitor, DEFAULT_STALE_AFTER, DEFAULT_SWEEP_INTERVAL};
pub use shim::{TransportShim, DEFAULT_CART_ENDPOINT};
