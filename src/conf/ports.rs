//! Local port allocation for the mount client's metrics and profiling
//! endpoints.

use std::net::TcpListener;

use crate::error::{Error, Result};

/// Find a currently-unbound local TCP port, starting at `preferred` and
/// advancing on conflict.
///
/// The trial socket is released before the port is returned, so the
/// caller (the out-of-process mount client) can bind it.
pub fn free_port(preferred: u16) -> Result<u16> {
    let mut port = preferred;
    loop {
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                drop(listener);
                return Ok(port);
            }
            Err(e) if port == u16::MAX => return Err(Error::Io(e)),
            Err(_) => port += 1,
        }
    }
}
