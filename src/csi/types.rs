//! Lifecycle-protocol data model: volumes, capabilities, and the
//! request/response shapes exchanged with the container orchestrator.
//!
//! Everything here is [`Serialize`]/[`Deserialize`] so requests can travel
//! over the JSON transport unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Volume identity
// =============================================================================

/// Opaque, unique identifier for a volume. For this driver the id is the
/// cluster volume name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VolumeId(pub String);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// How a volume may be accessed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessMode {
    /// Single-node read-write.
    ReadWriteOnce,
    /// Multi-node read-only.
    ReadOnlyMany,
    /// Multi-node read-write.
    ReadWriteMany,
}

/// Mount-style access: a filesystem mounted into the workload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountVolume {
    /// Filesystem type; must be `"cubefs"` for this driver.
    #[serde(default)]
    pub fs_type: String,
    /// Additional mount flags (e.g. `"ro"`).
    #[serde(default)]
    pub mount_flags: Vec<String>,
}

/// Requested access type for a volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessType {
    /// Filesystem mount access.
    Mount(MountVolume),
    /// Raw block access; not supported by this driver.
    Block,
}

/// A capability the caller requires from the volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeCapability {
    pub access_type: AccessType,
    pub access_mode: AccessMode,
}

impl VolumeCapability {
    /// The mount description, if this capability requests mount access.
    pub fn mount(&self) -> Option<&MountVolume> {
        match &self.access_type {
            AccessType::Mount(m) => Some(m),
            AccessType::Block => None,
        }
    }
}

/// Lifecycle capabilities this controller can advertise. Expansion is
/// served without being advertised, matching the upstream driver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ControllerCapability {
    CreateDeleteVolume,
}

// =============================================================================
// Requests & responses
// =============================================================================

/// Requested capacity bounds in bytes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CapacityRange {
    #[serde(default)]
    pub required_bytes: u64,
    #[serde(default)]
    pub limit_bytes: u64,
}

/// Request to provision a new volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateVolumeRequest {
    /// Caller-chosen volume name; becomes the volume id.
    pub name: String,
    #[serde(default)]
    pub capacity_range: Option<CapacityRange>,
    #[serde(default)]
    pub volume_capabilities: Vec<VolumeCapability>,
    /// Open-ended storage-class parameters; passed through to the
    /// resolved client configuration.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Descriptor for a provisioned volume, returned from create and used as
/// the identity in later lifecycle calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub volume_id: VolumeId,
    /// Post-rounding capacity in bytes.
    pub capacity_bytes: u64,
    /// The original caller parameters, unchanged.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

/// Request to delete a volume. Name, owner, and master address are
/// reconstructed from `parameters`; the persisted client config is never
/// read back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteVolumeRequest {
    pub volume_id: VolumeId,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Request to expand a volume to a new capacity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerExpandVolumeRequest {
    pub volume_id: VolumeId,
    #[serde(default)]
    pub capacity_range: Option<CapacityRange>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Acknowledgement of a volume expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerExpandVolumeResponse {
    /// Post-rounding capacity in bytes.
    pub capacity_bytes: u64,
    /// CubeFS volumes are FUSE-mounted; no node-side resize is needed.
    pub node_expansion_required: bool,
}

/// Request to validate volume capabilities against this plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateVolumeCapabilitiesRequest {
    pub volume_id: VolumeId,
    #[serde(default)]
    pub volume_capabilities: Vec<VolumeCapability>,
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Confirmation of supported capabilities, echoing the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateVolumeCapabilitiesResponse {
    pub volume_capabilities: Vec<VolumeCapability>,
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

// =============================================================================
// Plugin identity
// =============================================================================

/// Information about the plugin, reported during registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name in domain notation, e.g. `"csi.cubefs.com"`.
    pub name: String,
    pub vendor_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_id_display() {
        let id = VolumeId::from("pvc-1234");
        assert_eq!(id.to_string(), "pvc-1234");
    }

    #[test]
    fn test_capability_mount_accessor() {
        let cap = VolumeCapability {
            access_type: AccessType::Mount(MountVolume {
                fs_type: "cubefs".into(),
                mount_flags: vec![],
            }),
            access_mode: AccessMode::ReadWriteMany,
        };
        assert_eq!(cap.mount().unwrap().fs_type, "cubefs");

        let block = VolumeCapability {
            access_type: AccessType::Block,
            access_mode: AccessMode::ReadWriteOnce,
        };
        assert!(block.mount().is_none());
    }

    #[test]
    fn test_requests_construct_with_defaults() {
        let req = DeleteVolumeRequest::default();
        assert!(req.volume_id.0.is_empty());
        assert!(req.parameters.is_empty());

        let req = ControllerExpandVolumeRequest::default();
        assert!(req.volume_id.0.is_empty());

        let req = ValidateVolumeCapabilitiesRequest::default();
        assert!(req.volume_capabilities.is_empty());
    }

    #[test]
    fn test_create_request_decodes_with_defaults() {
        let req: CreateVolumeRequest = serde_json::from_str(r#"{"name":"v1"}"#).unwrap();
        assert_eq!(req.name, "v1");
        assert!(req.capacity_range.is_none());
        assert!(req.volume_capabilities.is_empty());
        assert!(req.parameters.is_empty());
    }

    #[test]
    fn test_volume_serde_round_trip() {
        let vol = Volume {
            volume_id: "v1".into(),
            capacity_bytes: 1 << 30,
            volume_context: HashMap::from([("masterAddr".into(), "m1:17010".into())]),
        };
        let json = serde_json::to_string(&vol).unwrap();
        let de: Volume = serde_json::from_str(&json).unwrap();
        assert_eq!(de.volume_id, vol.volume_id);
        assert_eq!(de.capacity_bytes, vol.capacity_bytes);
    }
}
