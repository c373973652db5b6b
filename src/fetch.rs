//! Fetcher (C1): issue one HTTP GET for one `(storeName, versionNumber)`,
//! decode the body to bytes, under a single per-request deadline.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::error::FetchError;
use crate::replica::ReplicaPicker;
use crate::topic::Topic;

pub struct Fetcher {
    client: reqwest::Client,
    replica_picker: ReplicaPicker,
    ssl_enabled: bool,
    fetch_timeout: Duration,
}

impl Fetcher {
    pub fn new(replica_picker: ReplicaPicker, ssl_enabled: bool, fetch_timeout: Duration) -> Self {
        // `reqwest::Client` owns its own connection pool and reactor; one
        // instance is shared across every fetch the service makes.
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .build()
            .expect("default reqwest client config is always valid");

        Self {
            client,
            replica_picker,
            ssl_enabled,
            fetch_timeout,
        }
    }

    /// Resolve a replica, issue `GET {base}/dictionary/{store}/{version}`,
    /// and return the raw response body. The whole resolve-connect-transfer
    /// sequence is bounded by `self.fetch_timeout`.
    pub async fn fetch(&self, topic: &Topic) -> Result<Bytes, FetchError> {
        let replica = self
            .replica_picker
            .pick(topic)
            .await
            .ok_or_else(|| FetchError::NoReplica(topic.clone()))?;

        let url = format!(
            "{}/dictionary/{}/{}",
            replica.base_url(self.ssl_enabled),
            topic.store_name(),
            topic.version_number()
        );

        debug!(%topic, url, "fetching dictionary");

        let response = self
            .client
            .get(&url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|err| Self::classify(topic, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError {
                topic: topic.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| Self::classify(topic, err))?;

        if body.is_empty() {
            return Err(FetchError::BadResponse(topic.clone()));
        }

        Ok(body)
    }

    fn classify(topic: &Topic, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(topic.clone())
        } else {
            FetchError::Transport {
                topic: topic.clone(),
                message: err.to_string(),
            }
        }
    }
}

/// Convenience constructor for services that already hold an `Arc` to the
/// instance directory.
pub fn new_fetcher(
    instance_directory: Arc<dyn crate::collaborators::InstanceDirectory>,
    ssl_enabled: bool,
    fetch_timeout: Duration,
) -> Fetcher {
    Fetcher::new(ReplicaPicker::new(instance_directory), ssl_enabled, fetch_timeout)
}
