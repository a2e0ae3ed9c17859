//! CSI Identity service: plugin name, version, and readiness probe.

use crate::csi::types::PluginInfo;

/// Default plugin name in domain notation.
pub const DRIVER_NAME: &str = "csi.cubefs.com";

/// Identity half of the lifecycle protocol surface.
pub struct IdentityService {
    info: PluginInfo,
}

impl IdentityService {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: PluginInfo {
                name: name.into(),
                vendor_version: version.into(),
            },
        }
    }

    pub fn plugin_info(&self) -> PluginInfo {
        self.info.clone()
    }

    /// The controller holds no in-memory volume state, so it is ready as
    /// soon as the process is up.
    pub fn probe(&self) -> bool {
        true
    }
}

impl Default for IdentityService {
    fn default() -> Self {
        Self::new(DRIVER_NAME, crate::VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identity() {
        let id = IdentityService::default();
        let info = id.plugin_info();
        assert_eq!(info.name, DRIVER_NAME);
        assert_eq!(info.vendor_version, crate::VERSION);
        assert!(id.probe());
    }
}
