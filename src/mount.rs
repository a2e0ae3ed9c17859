//! Invocation of the out-of-process FUSE mount client.
//!
//! The controller never mounts anything itself: it materializes the
//! client config file and hands it to the `cfs-client` binary, which owns
//! the data path.

use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::conf::ClientConf;
use crate::error::{Error, Result};

/// Default location of the FUSE client binary inside the plugin image.
pub const CLIENT_BIN: &str = "/cfs/bin/cfs-client";

/// Persist the client config for `mount_point` and run the FUSE client
/// against it. Fails if the client exits non-zero.
pub async fn mount_volume(conf: &mut ClientConf, mount_point: &str) -> Result<()> {
    let conf_file = conf.persist(mount_point)?;
    run_client(CLIENT_BIN, &conf_file).await
}

/// Run the FUSE client binary against an existing config file.
pub async fn run_client(client_bin: &str, conf_file: &Path) -> Result<()> {
    info!(client = client_bin, conf = %conf_file.display(), "starting fuse client");
    let status = Command::new(client_bin)
        .arg("-c")
        .arg(conf_file)
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::Internal(format!(
            "{} exited with {} for {}",
            client_bin,
            status,
            conf_file.display()
        )))
    }
}
