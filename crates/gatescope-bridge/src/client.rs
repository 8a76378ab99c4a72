//! Outbound HTTP client for the simulator control port.
//!
//! Every call is single shot: a non-success status becomes an error for
//! the caller to surface, and nothing is retried. The simulator connection
//! is treated as unreliable-but-single-shot per operation.

pub mod stub;

use gatescope_protocol::{
    BreakpointReply, BreakpointRequest, ConnectRequest, ConnectionEdge, ContextFrame,
    HierarchyReply,
};
use tracing::debug;

use crate::error::{Error, Result};

/// Client for `http://{ip}:{port}`, the simulator's control port.
#[derive(Debug, Clone)]
pub struct SimClient {
    base: String,
    http: reqwest::Client,
}

impl SimClient {
    pub fn new(ip: &str, port: u16) -> Self {
        Self {
            base: format!("http://{ip}:{port}"),
            http: reqwest::Client::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn expect_success(
        &self,
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(Error::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            })
        }
    }

    /// Register our callback listener with the simulator. Failure is fatal
    /// to session start; there is no reconnection loop.
    pub async fn connect(&self, req: &ConnectRequest) -> Result<()> {
        debug!(ip = %req.ip, port = req.port, "registering callback listener");
        let resp = self.http.post(self.url("/connect")).json(req).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::ConnectRejected {
                base: self.base.clone(),
            })
        }
    }

    /// Files the simulator has debug information for.
    pub async fn files(&self) -> Result<Vec<String>> {
        let resp = self.http.get(self.url("/files")).send().await?;
        let resp = self.expect_success("/files", resp).await?;
        Ok(resp.json().await?)
    }

    /// Insert a breakpoint; the reply carries the server-side id.
    pub async fn add_breakpoint(&self, req: &BreakpointRequest) -> Result<BreakpointReply> {
        let resp = self
            .http
            .post(self.url("/breakpoint"))
            .json(req)
            .send()
            .await?;
        let resp = self.expect_success("/breakpoint", resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn remove_breakpoint(&self, req: &BreakpointRequest) -> Result<()> {
        let resp = self
            .http
            .delete(self.url("/breakpoint"))
            .json(req)
            .send()
            .await?;
        self.expect_success("/breakpoint", resp).await?;
        Ok(())
    }

    /// Bulk removal of every breakpoint in one file.
    pub async fn clear_file_breakpoints(&self, filename: &str) -> Result<()> {
        // Absolute paths would put a double slash in the URL.
        let endpoint = format!("/breakpoint/file/{}", filename.trim_start_matches('/'));
        let resp = self.http.delete(self.url(&endpoint)).send().await?;
        self.expect_success(&endpoint, resp).await?;
        Ok(())
    }

    pub async fn continue_run(&self) -> Result<()> {
        let resp = self.http.post(self.url("/continue")).send().await?;
        self.expect_success("/continue", resp).await?;
        Ok(())
    }

    pub async fn step_over(&self) -> Result<()> {
        let resp = self.http.post(self.url("/step_over")).send().await?;
        self.expect_success("/step_over", resp).await?;
        Ok(())
    }

    /// Frames of every instance currently at `filename:line`. Only
    /// meaningful while the simulator is at a synchronization point.
    pub async fn context(&self, filename: &str, line: u64) -> Result<Vec<ContextFrame>> {
        let endpoint = format!("/context/{}:{line}", filename.trim_start_matches('/'));
        let resp = self.http.get(self.url(&endpoint)).send().await?;
        let resp = self.expect_success(&endpoint, resp).await?;
        Ok(resp.json().await?)
    }

    /// Current simulated time; the one read that is request/response.
    pub async fn time(&self) -> Result<u64> {
        let resp = self.http.get(self.url("/time")).send().await?;
        let resp = self.expect_success("/time", resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn hierarchy(&self, handle: &str) -> Result<HierarchyReply> {
        let endpoint = format!("/hierarchy/{handle}");
        let resp = self.http.post(self.url(&endpoint)).send().await?;
        let resp = self.expect_success(&endpoint, resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn connections_to(&self, handle: &str) -> Result<Vec<ConnectionEdge>> {
        let endpoint = format!("/connection/to/{handle}");
        let resp = self.http.get(self.url(&endpoint)).send().await?;
        let resp = self.expect_success(&endpoint, resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn connections_from(&self, handle: &str) -> Result<Vec<ConnectionEdge>> {
        let endpoint = format!("/connection/from/{handle}");
        let resp = self.http.get(self.url(&endpoint)).send().await?;
        let resp = self.expect_success(&endpoint, resp).await?;
        Ok(resp.json().await?)
    }

    /// Subscribe to value pushes for a handle. Every add must be paired
    /// with a remove; the server does no reference counting.
    pub async fn add_monitor(&self, handle: &str) -> Result<()> {
        let endpoint = format!("/monitor/{handle}");
        let resp = self.http.post(self.url(&endpoint)).send().await?;
        self.expect_success(&endpoint, resp).await?;
        Ok(())
    }

    pub async fn remove_monitor(&self, handle: &str) -> Result<()> {
        let endpoint = format!("/monitor/{handle}");
        let resp = self.http.delete(self.url(&endpoint)).send().await?;
        self.expect_success(&endpoint, resp).await?;
        Ok(())
    }

    /// Enable or disable pausing on clock edges.
    pub async fn set_clock(&self, on: bool) -> Result<()> {
        let endpoint = if on { "/clock/on" } else { "/clock/off" };
        let resp = self.http.post(self.url(endpoint)).send().await?;
        self.expect_success(endpoint, resp).await?;
        Ok(())
    }

    /// Run to the next synchronization point.
    pub async fn clock_synch(&self) -> Result<()> {
        let resp = self.http.post(self.url("/clock/synch")).send().await?;
        self.expect_success("/clock/synch", resp).await?;
        Ok(())
    }
}
