// Internet reachability probe: HTTP GET against well-known hosts, first response wins.

use std::future::Future;
use std::time::Duration;

use tracing::instrument;

use crate::version;

/// Answers "is the internet reachable right now". Failures are reported as `false`.
pub trait ConnectivityProbe {
    /// `timeout` bounds each individual attempt.
    fn is_reachable(&self, timeout: Duration) -> impl Future<Output = bool> + Send;
}

pub struct HttpProbe {
    client: reqwest::Client,
    hosts: Vec<String>,
}

impl HttpProbe {
    pub fn new(hosts: Vec<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", version::NAME, version::VERSION))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build probe HTTP client: {e}"))?;
        Ok(Self { client, hosts })
    }
}

impl ConnectivityProbe for HttpProbe {
    #[instrument(skip(self), fields(operation = "connectivity_probe", hosts = self.hosts.len()))]
    async fn is_reachable(&self, timeout: Duration) -> bool {
        for host in &self.hosts {
            // Any HTTP response, whatever the status, proves the route works.
            match tokio::time::timeout(timeout, self.client.get(host).timeout(timeout).send()).await
            {
                Ok(Ok(resp)) => {
                    tracing::debug!(host = %host, status = resp.status().as_u16(), "host reachable");
                    return true;
                }
                Ok(Err(e)) => tracing::debug!(host = %host, error = %e, "host unreachable"),
                Err(_) => tracing::debug!(host = %host, ?timeout, "host probe timed out"),
            }
        }
        false
    }
}
