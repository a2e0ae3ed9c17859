//! CSI Controller service: the protocol-facing volume lifecycle shim.
//!
//! Each operation validates the request, resolves the per-volume client
//! configuration, and drives the master client; cluster result codes are
//! translated into idempotent success where the protocol demands it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::conf::{ClientConf, Clock};
use crate::csi::types::{
    ControllerCapability, ControllerExpandVolumeRequest, ControllerExpandVolumeResponse,
    CreateVolumeRequest, DeleteVolumeRequest, ValidateVolumeCapabilitiesRequest,
    ValidateVolumeCapabilitiesResponse, Volume, VolumeCapability,
};
use crate::error::{Error, Result};
use crate::master::{owner_auth_key, MasterClient};

/// Filesystem type this plugin provisions; the mount capability must name
/// it exactly (case-sensitive).
pub const FS_TYPE_CUBEFS: &str = "cubefs";

pub const GIB: u64 = 1 << 30;

/// Smallest volume the cluster will provision.
pub const MIN_VOLUME_SIZE: u64 = GIB;

/// Capacity sent to the cluster: required bytes floored at the minimum
/// volume size, then rounded up to whole GiB.
///
/// Rejects requests whose rounded size no longer fits in a `u64` byte
/// count, so descriptor capacities never overflow.
pub fn capacity_gib(required_bytes: u64) -> Result<u64> {
    let gib = required_bytes.max(MIN_VOLUME_SIZE).div_ceil(GIB);
    if gib > u64::MAX / GIB {
        return Err(Error::InvalidArgument(format!(
            "requested capacity {required_bytes} bytes is too large"
        )));
    }
    Ok(gib)
}

// =============================================================================
// Controller trait
// =============================================================================

/// Controller half of the lifecycle protocol surface.
///
/// The six operations this plugin deliberately does not provide respond
/// with `Unimplemented` rather than silently succeeding, so orchestrators
/// can skip unsupported features.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn create_volume(&self, req: CreateVolumeRequest) -> Result<Volume>;

    async fn delete_volume(&self, req: DeleteVolumeRequest) -> Result<()>;

    async fn expand_volume(
        &self,
        req: ControllerExpandVolumeRequest,
    ) -> Result<ControllerExpandVolumeResponse>;

    /// The fixed capability set advertised at startup.
    fn capabilities(&self) -> Vec<ControllerCapability>;

    fn validate_volume_capabilities(
        &self,
        req: ValidateVolumeCapabilitiesRequest,
    ) -> Result<ValidateVolumeCapabilitiesResponse>;

    async fn controller_publish_volume(&self) -> Result<()> {
        Err(Error::Unimplemented("ControllerPublishVolume"))
    }

    async fn controller_unpublish_volume(&self) -> Result<()> {
        Err(Error::Unimplemented("ControllerUnpublishVolume"))
    }

    async fn get_capacity(&self) -> Result<u64> {
        Err(Error::Unimplemented("GetCapacity"))
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        Err(Error::Unimplemented("ListVolumes"))
    }

    async fn create_snapshot(&self) -> Result<()> {
        Err(Error::Unimplemented("CreateSnapshot"))
    }

    async fn delete_snapshot(&self) -> Result<()> {
        Err(Error::Unimplemented("DeleteSnapshot"))
    }

    async fn list_snapshots(&self) -> Result<()> {
        Err(Error::Unimplemented("ListSnapshots"))
    }
}

// =============================================================================
// CubeFS controller
// =============================================================================

/// Controller service backed by the CubeFS master control plane.
pub struct ControllerService {
    caps: Vec<ControllerCapability>,
    clock: Arc<dyn Clock>,
}

impl ControllerService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            caps: vec![ControllerCapability::CreateDeleteVolume],
            clock,
        }
    }

    fn validate_request_capability(&self, cap: ControllerCapability) -> Result<()> {
        if self.caps.contains(&cap) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "unsupported capability {:?}",
                cap
            )))
        }
    }

    /// Create requests must carry a mount capability naming this
    /// plugin's filesystem type.
    fn validate_mount_fs_type(capabilities: &[VolumeCapability]) -> Result<()> {
        let mount = capabilities
            .iter()
            .find_map(VolumeCapability::mount)
            .ok_or_else(|| Error::InvalidArgument("volume lacks mount access type".into()))?;

        if mount.fs_type != FS_TYPE_CUBEFS {
            return Err(Error::InvalidArgument(format!(
                "volume fstype {:?} is not {}",
                mount.fs_type, FS_TYPE_CUBEFS
            )));
        }
        Ok(())
    }

    fn resolve_conf(
        &self,
        vol_name: &str,
        params: &std::collections::HashMap<String, String>,
    ) -> Result<ClientConf> {
        ClientConf::resolve(vol_name, params, self.clock.as_ref())
    }
}

#[async_trait]
impl Controller for ControllerService {
    async fn create_volume(&self, req: CreateVolumeRequest) -> Result<Volume> {
        debug!(name = %req.name, "CreateVolume request");
        self.validate_request_capability(ControllerCapability::CreateDeleteVolume)?;

        if req.name.is_empty() {
            return Err(Error::InvalidArgument("volume name missing in request".into()));
        }
        if req.volume_capabilities.is_empty() {
            return Err(Error::InvalidArgument(
                "volume capabilities missing in request".into(),
            ));
        }
        Self::validate_mount_fs_type(&req.volume_capabilities)?;

        let required = req
            .capacity_range
            .map(|r| r.required_bytes)
            .unwrap_or_default();
        let gib = capacity_gib(required)?;

        let conf = self.resolve_conf(&req.name, &req.parameters)?;
        let client = MasterClient::new(&conf.master_addr);
        client.create_volume(&conf, gib).await?;

        info!(volume = %conf.vol_name, capacity_gib = gib, "volume created");
        Ok(Volume {
            volume_id: conf.vol_name.into(),
            capacity_bytes: gib * GIB,
            volume_context: req.parameters,
        })
    }

    async fn delete_volume(&self, req: DeleteVolumeRequest) -> Result<()> {
        debug!(volume = %req.volume_id, "DeleteVolume request");
        self.validate_request_capability(ControllerCapability::CreateDeleteVolume)?;

        if req.volume_id.0.is_empty() {
            return Err(Error::InvalidArgument("volume id missing in request".into()));
        }

        let conf = self.resolve_conf(&req.volume_id.0, &req.parameters)?;
        let auth_key = owner_auth_key(&conf.owner);
        let client = MasterClient::new(&conf.master_addr);
        client.delete_volume(&conf.vol_name, &auth_key).await?;

        info!(volume = %conf.vol_name, "volume deleted");
        Ok(())
    }

    async fn expand_volume(
        &self,
        req: ControllerExpandVolumeRequest,
    ) -> Result<ControllerExpandVolumeResponse> {
        debug!(volume = %req.volume_id, "ExpandVolume request");

        if req.volume_id.0.is_empty() {
            return Err(Error::InvalidArgument("volume id missing in request".into()));
        }

        let required = req
            .capacity_range
            .map(|r| r.required_bytes)
            .unwrap_or_default();
        let gib = capacity_gib(required)?;

        let conf = self.resolve_conf(&req.volume_id.0, &req.parameters)?;
        let auth_key = owner_auth_key(&conf.owner);
        let client = MasterClient::new(&conf.master_addr);
        client.expand_volume(&conf.vol_name, &auth_key, gib).await?;

        info!(volume = %conf.vol_name, capacity_gib = gib, "volume expanded");
        Ok(ControllerExpandVolumeResponse {
            capacity_bytes: gib * GIB,
            node_expansion_required: false,
        })
    }

    fn capabilities(&self) -> Vec<ControllerCapability> {
        self.caps.clone()
    }

    fn validate_volume_capabilities(
        &self,
        req: ValidateVolumeCapabilitiesRequest,
    ) -> Result<ValidateVolumeCapabilitiesResponse> {
        use crate::csi::types::AccessMode;

        for cap in &req.volume_capabilities {
            if cap.access_mode != AccessMode::ReadWriteMany {
                return Err(Error::InvalidArgument(
                    "no multi node multi writer capability".into(),
                ));
            }
        }

        Ok(ValidateVolumeCapabilitiesResponse {
            volume_capabilities: req.volume_capabilities,
            volume_context: req.volume_context,
            parameters: req.parameters,
        })
    }
}
