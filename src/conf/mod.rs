//! Per-volume client configuration
//!
//! Resolves caller-supplied volume parameters into a typed [`ClientConf`]
//! and materializes it as the JSON file consumed by the out-of-process
//! FUSE mount client. Well-known keys become named fields; anything the
//! caller passes beyond those flows through unchanged in `extra`.

pub mod ports;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

// =============================================================================
// Wire keys & defaults
// =============================================================================

pub const KEY_VOLUME_NAME: &str = "volName";
pub const KEY_MASTER_ADDR: &str = "masterAddr";
pub const KEY_LOG_LEVEL: &str = "logLevel";
pub const KEY_LOG_DIR: &str = "logDir";
pub const KEY_OWNER: &str = "owner";
pub const KEY_MOUNT_POINT: &str = "mountPoint";
pub const KEY_EXPORTER_PORT: &str = "exporterPort";
pub const KEY_PROF_PORT: &str = "profPort";
pub const KEY_CROSS_ZONE: &str = "crossZone";
pub const KEY_ENABLE_TOKEN: &str = "enableToken";
pub const KEY_ZONE_NAME: &str = "zoneName";
pub const KEY_CONSUL_ADDR: &str = "consulAddr";
pub const KEY_VOL_TYPE: &str = "volType";

/// Keys absorbed into named [`ClientConf`] fields; everything else is a
/// pass-through parameter.
const RECOGNIZED_KEYS: &[&str] = &[
    KEY_VOLUME_NAME,
    KEY_MASTER_ADDR,
    KEY_LOG_LEVEL,
    KEY_LOG_DIR,
    KEY_OWNER,
    KEY_MOUNT_POINT,
    KEY_EXPORTER_PORT,
    KEY_PROF_PORT,
    KEY_CROSS_ZONE,
    KEY_ENABLE_TOKEN,
    KEY_ZONE_NAME,
    KEY_CONSUL_ADDR,
    KEY_VOL_TYPE,
];

pub const DEFAULT_CONF_DIR: &str = "/cfs/conf";
pub const DEFAULT_LOG_DIR: &str = "/cfs/logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_EXPORTER_PORT: u16 = 9513;
pub const DEFAULT_PROF_PORT: u16 = 10094;
pub const DEFAULT_CONSUL_ADDR: &str = "http://consul-service.cubefs.svc.cluster.local:8500";
pub const DEFAULT_VOL_TYPE: &str = "0";

/// Owner fallback identifiers are truncated to this length; the cluster
/// rejects longer owner names.
const MAX_OWNER_LEN: usize = 20;

// =============================================================================
// Clock
// =============================================================================

/// Source of wall-clock time for the owner fallback identifier.
///
/// Injected so tests can supply deterministic values instead of relying
/// on real time.
pub trait Clock: Send + Sync {
    fn now_nanos(&self) -> i64;
}

/// System wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    }
}

// =============================================================================
// Client configuration
// =============================================================================

/// Resolved per-volume configuration, serialized verbatim as the client
/// config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConf {
    #[serde(rename = "volName")]
    pub vol_name: String,
    #[serde(rename = "masterAddr")]
    pub master_addr: String,
    #[serde(rename = "logLevel")]
    pub log_level: String,
    #[serde(rename = "logDir")]
    pub log_dir: String,
    pub owner: String,
    #[serde(rename = "mountPoint", skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(rename = "exporterPort", skip_serializing_if = "Option::is_none")]
    pub exporter_port: Option<u16>,
    #[serde(rename = "profPort", skip_serializing_if = "Option::is_none")]
    pub prof_port: Option<u16>,
    #[serde(rename = "crossZone", default, skip_serializing_if = "Option::is_none")]
    pub cross_zone: Option<String>,
    #[serde(rename = "enableToken", default, skip_serializing_if = "Option::is_none")]
    pub enable_token: Option<String>,
    #[serde(rename = "zoneName", default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(rename = "consulAddr")]
    pub consul_addr: String,
    #[serde(rename = "volType")]
    pub vol_type: String,
    /// Caller-supplied parameters with no well-known meaning, passed
    /// through to the mount client unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ClientConf {
    /// Merge caller parameters with derived defaults.
    ///
    /// Fails with `InvalidArgument` if the volume name or the master
    /// address is empty. Caller values win over defaults for every key
    /// except `logDir`, which is always derived from the final volume
    /// name: the log directory layout is cluster policy, not user choice.
    pub fn resolve(
        vol_name: &str,
        params: &HashMap<String, String>,
        clock: &dyn Clock,
    ) -> Result<Self> {
        let master_addr = params
            .get(KEY_MASTER_ADDR)
            .map(String::as_str)
            .unwrap_or_default();
        if vol_name.is_empty() || master_addr.is_empty() {
            return Err(Error::InvalidArgument(
                "volume name and master address must be non-empty".into(),
            ));
        }

        let vol_name = value_or(params, KEY_VOLUME_NAME, vol_name).to_owned();
        let owner = value_or_else(params, KEY_OWNER, || default_owner(clock));

        let extra = params
            .iter()
            .filter(|(k, _)| !RECOGNIZED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            master_addr: master_addr.to_owned(),
            log_level: value_or(params, KEY_LOG_LEVEL, DEFAULT_LOG_LEVEL).to_owned(),
            log_dir: format!("{}/{}", DEFAULT_LOG_DIR, vol_name),
            owner,
            mount_point: None,
            exporter_port: None,
            prof_port: None,
            cross_zone: optional(params, KEY_CROSS_ZONE),
            enable_token: optional(params, KEY_ENABLE_TOKEN),
            zone_name: optional(params, KEY_ZONE_NAME),
            consul_addr: value_or(params, KEY_CONSUL_ADDR, DEFAULT_CONSUL_ADDR).to_owned(),
            vol_type: value_or(params, KEY_VOL_TYPE, DEFAULT_VOL_TYPE).to_owned(),
            vol_name,
            extra,
        })
    }

    /// Path of the client config file under the default config directory
    pub fn conf_file_path(&self) -> PathBuf {
        Self::conf_file_path_in(Path::new(DEFAULT_CONF_DIR), &self.vol_name)
    }

    /// Path of the client config file for `vol_name` under `conf_dir`
    pub fn conf_file_path_in(conf_dir: &Path, vol_name: &str) -> PathBuf {
        conf_dir.join(format!("{}.json", vol_name))
    }

    /// Materialize the config file under the default config directory.
    ///
    /// See [`ClientConf::persist_to`].
    pub fn persist(&mut self, mount_point: &str) -> Result<PathBuf> {
        self.persist_to(Path::new(DEFAULT_CONF_DIR), mount_point)
    }

    /// Materialize the full configuration as a JSON file under `conf_dir`.
    ///
    /// Allocates a free exporter and profiling port for the mount client,
    /// ensures the log directory exists (failure to create it is logged
    /// and swallowed; the config write still proceeds), and writes the
    /// file read-only so unrelated processes cannot modify the handoff
    /// artifact.
    pub fn persist_to(&mut self, conf_dir: &Path, mount_point: &str) -> Result<PathBuf> {
        self.mount_point = Some(mount_point.to_owned());
        self.exporter_port = Some(ports::free_port(DEFAULT_EXPORTER_PORT)?);
        self.prof_port = Some(ports::free_port(DEFAULT_PROF_PORT)?);

        if let Err(e) = fs::create_dir_all(&self.log_dir) {
            warn!(log_dir = %self.log_dir, error = %e, "failed to create client log dir");
        }

        let path = Self::conf_file_path_in(conf_dir, &self.vol_name);
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o444))?;
        }

        info!(volume = %self.vol_name, path = %path.display(), "client config written");
        Ok(path)
    }
}

/// Owner fallback: a process-unique identifier derived from the current
/// time, bounded to the cluster's owner length limit. Only used when the
/// caller supplies no real owner.
pub fn default_owner(clock: &dyn Clock) -> String {
    shorten(&format!("csi_{}", clock.now_nanos()), MAX_OWNER_LEN)
}

fn shorten(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn value_or<'a>(params: &'a HashMap<String, String>, key: &str, default: &'a str) -> &'a str {
    match params.get(key) {
        Some(v) if !v.is_empty() => v,
        _ => default,
    }
}

fn optional(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|v| !v.is_empty()).cloned()
}

fn value_or_else(
    params: &HashMap<String, String>,
    key: &str,
    default: impl FnOnce() -> String,
) -> String {
    match params.get(key) {
        Some(v) if !v.is_empty() => v.clone(),
        _ => default(),
    }
}
