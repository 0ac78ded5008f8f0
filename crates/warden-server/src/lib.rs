//! warden-server: Authorization facade and mutation coordinators
//!
//! This crate wires the domain core to a data store:
//! - Configuration and logging setup
//! - Storage adapters and the `Authz` facade
//! - Resource and trust-center coordinators
//! - Batch check handler with deduplication
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                warden-server                │
//! ├─────────────────────────────────────────────┤
//! │  config.rs        - Configuration loading   │
//! │  observability.rs - Logging setup           │
//! │  adapters.rs      - Storage <-> domain      │
//! │  authz.rs         - Check + tuple facade    │
//! │  watermark.rs     - Watermark job queue     │
//! │  services.rs      - Service wiring          │
//! │  handlers/                                  │
//! │    resources.rs    - Resource mutations     │
//! │    trust_center.rs - Documents and NDAs     │
//! │    batch/          - Batch checks           │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod authz;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod services;
pub mod watermark;

// Re-exports for convenience
pub use authz::Authz;
pub use config::{ConfigLoadError, ServerConfig};
pub use services::{build_store, WardenServices};
pub use watermark::{ChannelWatermarkQueue, WatermarkJob, WatermarkQueue};
