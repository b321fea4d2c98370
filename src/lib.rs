//! # Storefront Inspector Core
//!
//! Network interception and request-lifecycle tracking engine for the
//! storefront devtools, including the embedded cart-diff algorithm.
//!
//! ## Features
//!
//! - Transparent tracking of storefront HTTP traffic over an injected
//!   transport client
//! - Structural before/after cart diffs around cart-mutating calls
//! - Bounded, subscribable request history persisted across page reloads
//! - Display-level source blocking and request replay/editing
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Devtools panels (UI)                   │
//! ├──────────────────────────────────────────────────────────┤
//! │                 Inspector (service object)               │
//! │  ┌──────────┐  ┌──────────┐  ┌────────┐  ┌───────────┐   │
//! │  │Transport │  │ Request  │  │  Cart  │  │  Storage  │   │
//! │  │   Shim   │──│ Registry │──│  Diff  │──│ (SQLite)  │   │
//! │  └──────────┘  └──────────┘  └────────┘  └───────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The inspector never modifies, blocks, or delays real traffic; it only
//! classifies and records the calls the host page already issues.

pub mod api;
pub mod diff;
pub mod intercept;
pub mod models;
pub mod replay;
pub mod storage;
pub mod transport;

pub use api::{Inspector, InspectorConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
