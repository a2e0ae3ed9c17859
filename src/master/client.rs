//! HTTP client for the master control plane with ordered failover.

use std::future::Future;

use tracing::{debug, error, warn};

use crate::conf::ClientConf;
use crate::error::{Error, Result};
use crate::master::{MasterResponse, ERR_CODE_DUPLICATE_VOL, ERR_CODE_VOL_NOT_EXISTS};

/// Client for a cluster's master endpoints.
///
/// The endpoint list is parsed once from the comma-separated master
/// address; its order defines failover priority and is preserved for the
/// client's lifetime. Empty segments from malformed input are kept as-is
/// and simply fail fast during failover.
pub struct MasterClient {
    addrs: Vec<String>,
    http: reqwest::Client,
}

impl MasterClient {
    pub fn new(master_addr: &str) -> Self {
        Self {
            addrs: master_addr.split(',').map(str::to_owned).collect(),
            http: reqwest::Client::new(),
        }
    }

    /// The ordered endpoint set
    pub fn addrs(&self) -> &[String] {
        &self.addrs
    }

    /// Issue one administrative GET and decode the JSON reply.
    ///
    /// Network failure and undecodable bodies both surface as
    /// `Unavailable`, distinct from a cluster-reported logical error.
    pub async fn execute(&self, url: &str) -> Result<MasterResponse> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("request {url} failed: {e}")))?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Unavailable(format!("read response body from {url}: {e}")))?;
        serde_json::from_slice(&body)
            .map_err(|e| Error::Unavailable(format!("decode response body from {url}: {e}")))
    }

    /// Run `attempt` against each master in order until one succeeds.
    ///
    /// First success wins and stops the iteration. Each failed attempt is
    /// logged as a warning with the endpoint identity; if every endpoint
    /// is exhausted the last error is returned. A single attempt per
    /// endpoint, no backoff, no randomization.
    pub async fn try_each_master<F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<()>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut last_err = None;
        for addr in &self.addrs {
            match attempt(addr.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(operation, master = %addr, error = %e, "master attempt failed");
                    last_err = Some(e);
                }
            }
        }

        error!(operation, "all masters failed");
        Err(last_err.unwrap_or_else(|| Error::Unavailable("no master endpoints".into())))
    }

    /// Create a volume of `capacity_gib` whole GiB.
    ///
    /// A duplicate-volume reply means the volume already exists and is
    /// treated as success so orchestrator retries converge.
    pub async fn create_volume(&self, conf: &ClientConf, capacity_gib: u64) -> Result<()> {
        self.try_each_master("CreateVolume", |addr| {
            let url = format!(
                "http://{}/admin/createVol?name={}&capacity={}&owner={}&crossZone={}&enableToken={}&zoneName={}&volType={}",
                addr,
                urlencoding::encode(&conf.vol_name),
                capacity_gib,
                urlencoding::encode(&conf.owner),
                urlencoding::encode(conf.cross_zone.as_deref().unwrap_or_default()),
                urlencoding::encode(conf.enable_token.as_deref().unwrap_or_default()),
                urlencoding::encode(conf.zone_name.as_deref().unwrap_or_default()),
                urlencoding::encode(&conf.vol_type),
            );
            async move {
                debug!(%url, "createVol request");
                let resp = self.execute(&url).await?;
                match resp.code {
                    0 => Ok(()),
                    ERR_CODE_DUPLICATE_VOL => {
                        warn!(volume = %conf.vol_name, msg = %resp.msg, "duplicate volume, treating create as success");
                        Ok(())
                    }
                    code => Err(Error::Cluster {
                        operation: "CreateVolume",
                        code,
                        msg: resp.msg,
                    }),
                }
            }
        })
        .await
    }

    /// Delete a volume, authorizing with the owner auth key.
    ///
    /// A volume-not-found reply means the volume is already gone and is
    /// treated as success.
    pub async fn delete_volume(&self, vol_name: &str, auth_key: &str) -> Result<()> {
        self.try_each_master("DeleteVolume", |addr| {
            let url = format!(
                "http://{}/vol/delete?name={}&authKey={}",
                addr,
                urlencoding::encode(vol_name),
                auth_key,
            );
            async move {
                debug!(%url, "deleteVol request");
                let resp = self.execute(&url).await?;
                match resp.code {
                    0 => Ok(()),
                    ERR_CODE_VOL_NOT_EXISTS => {
                        warn!(volume = %vol_name, msg = %resp.msg, "volume not found, assuming already deleted");
                        Ok(())
                    }
                    code => Err(Error::Cluster {
                        operation: "DeleteVolume",
                        code,
                        msg: resp.msg,
                    }),
                }
            }
        })
        .await
    }

    /// Expand a volume to `capacity_gib` whole GiB.
    ///
    /// No result codes are downgraded here: re-expanding to an unchanged
    /// size is a cluster-side no-op, so any non-zero code is a real
    /// failure.
    pub async fn expand_volume(
        &self,
        vol_name: &str,
        auth_key: &str,
        capacity_gib: u64,
    ) -> Result<()> {
        self.try_each_master("ExpandVolume", |addr| {
            let url = format!(
                "http://{}/vol/expand?name={}&authKey={}&capacity={}",
                addr,
                urlencoding::encode(vol_name),
                auth_key,
                capacity_gib,
            );
            async move {
                debug!(%url, "expandVol request");
                let resp = self.execute(&url).await?;
                match resp.code {
                    0 => Ok(()),
                    code => Err(Error::Cluster {
                        operation: "ExpandVolume",
                        code,
                        msg: resp.msg,
                    }),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{Clock, KEY_MASTER_ADDR, KEY_OWNER};
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_nanos(&self) -> i64 {
            1
        }
    }

    fn conf_for(master_addr: &str) -> ClientConf {
        let params: HashMap<String, String> = [
            (KEY_MASTER_ADDR.to_string(), master_addr.to_string()),
            (KEY_OWNER.to_string(), "tester".to_string()),
        ]
        .into_iter()
        .collect();
        ClientConf::resolve("vol-a", &params, &FixedClock).unwrap()
    }

    #[test]
    fn test_endpoint_set_preserves_order_and_empty_segments() {
        let client = MasterClient::new("m1:17010,m2:17010");
        assert_eq!(client.addrs(), ["m1:17010", "m2:17010"]);

        // malformed input keeps literal empty endpoints
        let client = MasterClient::new("m1:17010,,m2:17010,");
        assert_eq!(client.addrs(), ["m1:17010", "", "m2:17010", ""]);
    }

    #[tokio::test]
    async fn test_create_volume_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/admin/createVol")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"code":0,"msg":"success"}"#)
            .create_async()
            .await;

        let client = MasterClient::new(&server.host_with_port());
        let conf = conf_for(&server.host_with_port());
        client.create_volume(&conf, 2).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_volume_duplicate_is_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/admin/createVol")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"code":12,"msg":"duplicate vol"}"#)
            .create_async()
            .await;

        let client = MasterClient::new(&server.host_with_port());
        let conf = conf_for(&server.host_with_port());
        client.create_volume(&conf, 1).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_volume_hard_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/admin/createVol")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"code":33,"msg":"no space"}"#)
            .create_async()
            .await;

        let client = MasterClient::new(&server.host_with_port());
        let conf = conf_for(&server.host_with_port());
        let err = client.create_volume(&conf, 1).await.unwrap_err();
        assert_matches!(err, Error::Cluster { code: 33, .. });
    }

    #[tokio::test]
    async fn test_delete_volume_not_found_is_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vol/delete")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"code":7,"msg":"vol not exists"}"#)
            .create_async()
            .await;

        let client = MasterClient::new(&server.host_with_port());
        client.delete_volume("vol-a", "abc123").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expand_volume_recognizes_no_idempotent_codes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/vol/expand")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"code":7,"msg":"vol not exists"}"#)
            .create_async()
            .await;

        let client = MasterClient::new(&server.host_with_port());
        let err = client.expand_volume("vol-a", "abc123", 4).await.unwrap_err();
        assert_matches!(err, Error::Cluster { code: 7, .. });
    }

    #[tokio::test]
    async fn test_failover_stops_at_first_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vol/delete")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"code":0,"msg":"success"}"#)
            .expect(1)
            .create_async()
            .await;

        // first two endpoints are unreachable, third answers
        let addrs = format!("127.0.0.1:1,127.0.0.2:1,{}", server.host_with_port());
        let client = MasterClient::new(&addrs);
        client.delete_volume("vol-a", "abc123").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failover_warns_once_per_failed_master() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tracing::instrument::WithSubscriber;

        struct WarnCount(Arc<AtomicUsize>);

        impl tracing::Subscriber for WarnCount {
            fn enabled(&self, metadata: &tracing::Metadata<'_>) -> bool {
                *metadata.level() == tracing::Level::WARN
                    && metadata.target().starts_with("cubefs_csi")
            }
            fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
                tracing::span::Id::from_u64(1)
            }
            fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}
            fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}
            fn event(&self, _: &tracing::Event<'_>) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
            fn enter(&self, _: &tracing::span::Id) {}
            fn exit(&self, _: &tracing::span::Id) {}
        }

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vol/delete")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"code":0,"msg":"success"}"#)
            .expect(1)
            .create_async()
            .await;

        let warnings = Arc::new(AtomicUsize::new(0));
        let addrs = format!("127.0.0.1:1,127.0.0.2:1,{}", server.host_with_port());
        let client = MasterClient::new(&addrs);

        async {
            client.delete_volume("vol-a", "abc123").await.unwrap();
        }
        .with_subscriber(WarnCount(warnings.clone()))
        .await;

        // one warning per unreachable endpoint, none for the success
        assert_eq!(warnings.load(Ordering::Relaxed), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failover_exhaustion_returns_last_error() {
        let client = MasterClient::new("127.0.0.1:1,127.0.0.2:1");
        let err = client.delete_volume("vol-a", "abc123").await.unwrap_err();
        assert_matches!(err, Error::Unavailable(_));
        assert!(err.to_string().contains("127.0.0.2:1"));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/admin/createVol")
            .match_query(mockito::Matcher::Any)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = MasterClient::new(&server.host_with_port());
        let conf = conf_for(&server.host_with_port());
        let err = client.create_volume(&conf, 1).await.unwrap_err();
        assert_matches!(err, Error::Unavailable(_));
    }
}
