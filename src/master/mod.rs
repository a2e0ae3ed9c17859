//! CubeFS master control plane
//!
//! The masters expose an administrative HTTP API for volume management,
//! distinct from the data path used for file I/O. This module holds the
//! response schema, the result codes that carry idempotency semantics,
//! and the auth-key derivation shared by delete and expand.

pub mod client;

use serde::{Deserialize, Serialize};

pub use client::MasterClient;

/// Result code for "volume does not exist"; idempotent success on delete.
pub const ERR_CODE_VOL_NOT_EXISTS: i32 = 7;

/// Result code for "volume already exists"; idempotent success on create.
pub const ERR_CODE_DUPLICATE_VOL: i32 = 12;

/// Decoded reply from a master endpoint.
///
/// Code `0` means success; the known non-zero codes above are downgraded
/// to success by the operation that recognizes them, and every other
/// non-zero code is a hard failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterResponse {
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Derive the cluster authorization key from the owner identity.
///
/// The masters store the MD5 hex digest of the owner and compare it as a
/// shared secret on delete and expand; the digest is not reversible.
pub fn owner_auth_key(owner: &str) -> String {
    format!("{:x}", md5::compute(owner.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_auth_key_is_md5_hex() {
        // md5("cubefs")
        assert_eq!(owner_auth_key("cubefs"), "0f4542d97658fb53c6db6b31fdb59a15");
        assert_eq!(owner_auth_key("").len(), 32);
    }

    #[test]
    fn test_owner_auth_key_is_stable() {
        assert_eq!(owner_auth_key("team-infra"), owner_auth_key("team-infra"));
        assert_ne!(owner_auth_key("team-infra"), owner_auth_key("team-Infra"));
    }

    #[test]
    fn test_response_decodes_without_data() {
        let resp: MasterResponse = serde_json::from_str(r#"{"code":0,"msg":"success"}"#).unwrap();
        assert_eq!(resp.code, 0);
        assert_eq!(resp.msg, "success");
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_response_decodes_with_data() {
        let resp: MasterResponse =
            serde_json::from_str(r#"{"code":7,"msg":"vol not exists","data":"x"}"#).unwrap();
        assert_eq!(resp.code, ERR_CODE_VOL_NOT_EXISTS);
        assert_eq!(resp.data.as_deref(), Some("x"));
    }
}
