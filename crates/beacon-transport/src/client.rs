//! hyper clients for remote nodes and a remote directory.
//!
//! Each call opens a fresh HTTP/1 connection, sends one JSON request and
//! reads one `ApiResponse`. The whole exchange is bounded by the client
//! timeout; the protocol layer applies its own RPC timeout on top. The
//! election request is the exception: its wait grows with the cluster, so
//! only the caller bounds it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{
    Connector, Directory, DirectoryError, DirectoryResult, HeartbeatReply, NodeRpc, NodeStatus,
    PeerResult,
};
use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::TransportError;
use crate::wire::*;

const USER_AGENT: &str = concat!("beacon/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
struct HttpClient {
    address: String,
    timeout: Option<Duration>,
}

impl HttpClient {
    fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout: Some(timeout),
        }
    }

    /// Same address, no timeout of its own.
    fn unbounded(&self) -> Self {
        Self {
            address: self.address.clone(),
            timeout: None,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let (status, body) = self.send(Method::GET, path, None).await?;
        decode(status, &body)
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let (status, body) = self
            .send(method, path, Some(serde_json::to_vec(body)?))
            .await?;
        decode(status, &body)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Bytes), TransportError> {
        let address = self.address.as_str();
        let exchange = async {
            let stream = tokio::net::TcpStream::connect(address)
                .await
                .map_err(|source| TransportError::Connect {
                    address: address.to_string(),
                    source,
                })?;

            let io = TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

            // Drive the connection in the background.
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(error = %e, "connection closed with error");
                }
            });

            let mut req = http::Request::builder()
                .method(method)
                .uri(path)
                .header("host", address)
                .header("user-agent", USER_AGENT);
            let body = match body {
                Some(json) => {
                    req = req.header("content-type", "application/json");
                    Full::new(Bytes::from(json))
                }
                None => Full::new(Bytes::new()),
            };

            let resp = sender.send_request(req.body(body)?).await?;
            let status = resp.status();
            let body = resp.into_body().collect().await?.to_bytes();
            Ok::<_, TransportError>((status, body))
        };

        let Some(timeout) = self.timeout else {
            return exchange.await;
        };
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%address, %path, "request timed out");
                Err(TransportError::Timeout(timeout))
            }
        }
    }
}

/// Unwrap an `ApiResponse`, turning failures into `TransportError::Status`.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, TransportError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(body)
            .ok()
            .and_then(|r| r.error)
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
        return Err(TransportError::Status { status, message });
    }

    match serde_json::from_slice::<ApiResponse<T>>(body)? {
        ApiResponse {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        ApiResponse { error, .. } => Err(TransportError::Status {
            status,
            message: error.unwrap_or_else(|| "response carried no data".to_string()),
        }),
    }
}

// ── Peers ──────────────────────────────────────────────────────

/// Hands out HTTP clients for peers found in the directory.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, name: &str, endpoint: &str) -> Arc<dyn NodeRpc> {
        Arc::new(HttpPeer::new(name, endpoint, self.timeout))
    }
}

/// A remote node reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPeer {
    name: String,
    client: HttpClient,
}

impl HttpPeer {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            client: HttpClient::new(endpoint, timeout),
        }
    }
}

#[async_trait]
impl NodeRpc for HttpPeer {
    async fn start_election(&self, candidate: &str) -> PeerResult<String> {
        let req = ElectionRequest {
            candidate: candidate.to_string(),
        };
        self.client
            .unbounded()
            .call::<_, ElectionResponse>(Method::POST, "/rpc/election", &req)
            .await
            .map(|r| r.token)
            .map_err(|e| e.into_peer_error(&self.name))
    }

    async fn get_leader(&self) -> PeerResult<Option<String>> {
        self.client
            .get::<LeaderBody>("/rpc/leader")
            .await
            .map(|r| r.leader)
            .map_err(|e| e.into_peer_error(&self.name))
    }

    async fn adopt_leader(&self, leader: &str) -> PeerResult<()> {
        let req = LeaderBody {
            leader: Some(leader.to_string()),
        };
        self.client
            .call::<_, LeaderBody>(Method::POST, "/rpc/leader", &req)
            .await
            .map(|_| ())
            .map_err(|e| e.into_peer_error(&self.name))
    }

    async fn receive_heartbeat(&self, sender: &str, message: &str) -> PeerResult<HeartbeatReply> {
        let req = HeartbeatRequest {
            sender: sender.to_string(),
            message: message.to_string(),
        };
        self.client
            .call(Method::POST, "/rpc/heartbeat", &req)
            .await
            .map_err(|e| e.into_peer_error(&self.name))
    }

    async fn get_eligibility(&self) -> PeerResult<bool> {
        self.client
            .get::<EligibilityResponse>("/rpc/eligibility")
            .await
            .map(|r| r.eligible)
            .map_err(|e| e.into_peer_error(&self.name))
    }
}

/// Fetch `/status` from a running node.
pub async fn fetch_status(address: &str, timeout: Duration) -> Result<NodeStatus, TransportError> {
    HttpClient::new(address, timeout).get("/status").await
}

// ── Directory ──────────────────────────────────────────────────

/// Directory served by `directory_router` in another process.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: HttpClient,
}

impl HttpDirectory {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: HttpClient::new(address, timeout),
        }
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn bind(&self, name: &str, endpoint: &str) -> DirectoryResult<()> {
        let req = BindRequest {
            endpoint: endpoint.to_string(),
        };
        match self
            .client
            .call::<_, Binding>(Method::PUT, &format!("/names/{name}"), &req)
            .await
        {
            Ok(_) => Ok(()),
            Err(TransportError::Status {
                status: StatusCode::CONFLICT,
                ..
            }) => Err(DirectoryError::AlreadyBound(name.to_string())),
            Err(e) => Err(e.into_directory_error()),
        }
    }

    async fn unbind(&self, name: &str) -> DirectoryResult<bool> {
        let (status, body) = self
            .client
            .send(Method::DELETE, &format!("/names/{name}"), None)
            .await
            .map_err(TransportError::into_directory_error)?;
        decode::<UnbindResponse>(status, &body)
            .map(|r| r.removed)
            .map_err(TransportError::into_directory_error)
    }

    async fn lookup(&self, name: &str) -> DirectoryResult<Option<String>> {
        match self.client.get::<Binding>(&format!("/names/{name}")).await {
            Ok(binding) => Ok(Some(binding.endpoint)),
            Err(TransportError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => Ok(None),
            Err(e) => Err(e.into_directory_error()),
        }
    }

    async fn list(&self) -> DirectoryResult<Vec<String>> {
        self.client
            .get::<NamesResponse>("/names")
            .await
            .map(|r| r.names)
            .map_err(TransportError::into_directory_error)
    }
}
