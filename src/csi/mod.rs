//! Lifecycle protocol surface
//!
//! The CSI-shaped interface through which the container orchestrator
//! requests volume provisioning, deletion, expansion, and capability
//! queries.

pub mod controller;
pub mod identity;
pub mod types;

pub use controller::{Controller, ControllerService, FS_TYPE_CUBEFS, GIB, MIN_VOLUME_SIZE};
pub use identity::{IdentityService, DRIVER_NAME};
pub use types::*;
