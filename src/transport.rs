//! Unix-socket transport for the lifecycle protocol surface.
//!
//! The orchestrator side connects to the plugin's socket and sends one
//! JSON-encoded [`CsiRequest`] per line; the server dispatches it to the
//! controller or identity service and replies with one [`CsiResponse`]
//! line. Errors travel as a status class plus message.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::csi::{
    Controller, ControllerCapability, ControllerExpandVolumeRequest,
    ControllerExpandVolumeResponse, CreateVolumeRequest, DeleteVolumeRequest, IdentityService,
    PluginInfo, ValidateVolumeCapabilitiesRequest, ValidateVolumeCapabilitiesResponse, Volume,
};
use crate::error::{Error, Result, StatusClass};

// =============================================================================
// Request / response envelopes
// =============================================================================

/// A single protocol request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CsiRequest {
    // Controller
    CreateVolume(CreateVolumeRequest),
    DeleteVolume(DeleteVolumeRequest),
    ControllerExpandVolume(ControllerExpandVolumeRequest),
    ControllerGetCapabilities,
    ValidateVolumeCapabilities(ValidateVolumeCapabilitiesRequest),
    ControllerPublishVolume,
    ControllerUnpublishVolume,
    GetCapacity,
    ListVolumes,
    CreateSnapshot,
    DeleteSnapshot,
    ListSnapshots,
    // Identity
    GetPluginInfo,
    Probe,
}

/// Reply to a [`CsiRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CsiResponse {
    Volume(Volume),
    Deleted,
    Expanded(ControllerExpandVolumeResponse),
    Capabilities(Vec<ControllerCapability>),
    Capacity(u64),
    VolumeList(Vec<Volume>),
    Validated(ValidateVolumeCapabilitiesResponse),
    PluginInfo(PluginInfo),
    Ready(bool),
    Error { class: StatusClass, message: String },
}

impl From<Error> for CsiResponse {
    fn from(e: Error) -> Self {
        CsiResponse::Error {
            class: e.class(),
            message: e.to_string(),
        }
    }
}

fn ok_or_error<T>(result: Result<T>, into: impl FnOnce(T) -> CsiResponse) -> CsiResponse {
    match result {
        Ok(v) => into(v),
        Err(e) => e.into(),
    }
}

/// Map one request to the matching service call and wrap the outcome.
pub async fn dispatch<C: Controller>(
    controller: &C,
    identity: &IdentityService,
    request: CsiRequest,
) -> CsiResponse {
    match request {
        CsiRequest::CreateVolume(req) => {
            ok_or_error(controller.create_volume(req).await, CsiResponse::Volume)
        }
        CsiRequest::DeleteVolume(req) => {
            ok_or_error(controller.delete_volume(req).await, |()| CsiResponse::Deleted)
        }
        CsiRequest::ControllerExpandVolume(req) => {
            ok_or_error(controller.expand_volume(req).await, CsiResponse::Expanded)
        }
        CsiRequest::ControllerGetCapabilities => {
            CsiResponse::Capabilities(controller.capabilities())
        }
        CsiRequest::ValidateVolumeCapabilities(req) => ok_or_error(
            controller.validate_volume_capabilities(req),
            CsiResponse::Validated,
        ),
        CsiRequest::ControllerPublishVolume => ok_or_error(
            controller.controller_publish_volume().await,
            |()| CsiResponse::Deleted,
        ),
        CsiRequest::ControllerUnpublishVolume => ok_or_error(
            controller.controller_unpublish_volume().await,
            |()| CsiResponse::Deleted,
        ),
        CsiRequest::GetCapacity => {
            ok_or_error(controller.get_capacity().await, CsiResponse::Capacity)
        }
        CsiRequest::ListVolumes => {
            ok_or_error(controller.list_volumes().await, CsiResponse::VolumeList)
        }
        CsiRequest::CreateSnapshot => {
            ok_or_error(controller.create_snapshot().await, |()| CsiResponse::Deleted)
        }
        CsiRequest::DeleteSnapshot => {
            ok_or_error(controller.delete_snapshot().await, |()| CsiResponse::Deleted)
        }
        CsiRequest::ListSnapshots => {
            ok_or_error(controller.list_snapshots().await, |()| CsiResponse::Deleted)
        }
        CsiRequest::GetPluginInfo => CsiResponse::PluginInfo(identity.plugin_info()),
        CsiRequest::Probe => CsiResponse::Ready(identity.probe()),
    }
}

// =============================================================================
// Server
// =============================================================================

/// Accepts connections on a Unix socket and dispatches protocol requests.
pub struct CsiServer<C> {
    listener: UnixListener,
    path: PathBuf,
    controller: Arc<C>,
    identity: Arc<IdentityService>,
}

impl<C: Controller + 'static> CsiServer<C> {
    /// Bind the plugin socket, replacing a stale socket file left behind
    /// by a previous run.
    pub fn bind(path: &Path, controller: Arc<C>, identity: Arc<IdentityService>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        info!(endpoint = %path.display(), "CSI server listening");
        Ok(Self {
            listener,
            path: path.to_owned(),
            controller,
            identity,
        })
    }

    /// The bound socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections until the task is dropped.
    pub async fn serve(self) -> Result<()> {
        loop {
            let (stream, _) = self.listener.accept().await?;
            let controller = Arc::clone(&self.controller);
            let identity = Arc::clone(&self.identity);
            tokio::spawn(async move {
                if let Err(e) = handle_conn(stream, controller, identity).await {
                    warn!(error = %e, "connection handler error");
                }
            });
        }
    }
}

async fn handle_conn<C: Controller>(
    stream: UnixStream,
    controller: Arc<C>,
    identity: Arc<IdentityService>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<CsiRequest>(&line) {
            Ok(request) => {
                debug!(?request, "request received");
                dispatch(controller.as_ref(), identity.as_ref(), request).await
            }
            Err(e) => CsiResponse::Error {
                class: StatusClass::InvalidArgument,
                message: format!("malformed request: {e}"),
            },
        };

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
    }
    Ok(())
}
