//! CubeFS CSI Driver - Volume Lifecycle Controller
//!
//! A CSI controller plugin that provisions, deletes, and expands CubeFS
//! volumes by driving the cluster masters' administrative HTTP API, and
//! materializes the per-volume client configuration consumed by the
//! out-of-process FUSE mount client.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Orchestrator (CO)                        │
//! └──────────────────────────────┬─────────────────────────────────┘
//!                                │ lifecycle protocol (unix socket)
//! ┌──────────────────────────────┴─────────────────────────────────┐
//! │                  Volume Lifecycle Controller                    │
//! │  validation · capability negotiation · capacity rounding        │
//! ├──────────────────┬─────────────────────────┬───────────────────┤
//! │    Parameter     │    Control-Plane        │   Client Config   │
//! │    Normalizer    │    Client (failover)    │   Materializer    │
//! └──────────────────┴────────────┬────────────┴─────────┬─────────┘
//!                                 │ HTTP                 │ JSON file
//!                    ┌────────────┴────────────┐  ┌──────┴─────────┐
//!                    │   CubeFS masters (N)    │  │  cfs-client    │
//!                    └─────────────────────────┘  │  (FUSE mount)  │
//!                                                 └────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`csi`]: protocol surface (controller, identity, data model)
//! - [`master`]: master control-plane client with ordered failover
//! - [`conf`]: parameter normalization and client config materialization
//! - [`transport`]: unix-socket request dispatch
//! - [`mount`]: FUSE client invocation
//! - [`error`]: error types and status classification

pub mod conf;
pub mod csi;
pub mod error;
pub mod master;
pub mod mount;
pub mod transport;

// Re-export commonly used types
pub use conf::{ClientConf, Clock, SystemClock};
pub use csi::{
    Controller, ControllerService, IdentityService, DRIVER_NAME, FS_TYPE_CUBEFS, GIB,
    MIN_VOLUME_SIZE,
};
pub use error::{Error, Result, StatusClass};
pub use master::{MasterClient, MasterResponse};
pub use transport::{CsiRequest, CsiResponse, CsiServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
