use super::scrub::sanitize_detail;
use super::traits::EngineResult;
use crate::problem::ProblemDetails;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

pub fn build_engine_client() -> Client {
    build_engine_client_with_timeout(60)
}

pub fn build_engine_client_with_timeout(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Send a request and buffer the body. Connection and read failures become a
/// 503 problem instead of escaping as transport errors.
pub async fn send(request: RequestBuilder) -> EngineResult<HttpReply> {
    let response = request
        .send()
        .await
        .map_err(|e| ProblemDetails::unreachable(sanitize_detail(&e.to_string())))?;
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| ProblemDetails::unreachable(sanitize_detail(&e.to_string())))?;
    Ok(HttpReply {
        status,
        body: body.to_vec(),
    })
}
