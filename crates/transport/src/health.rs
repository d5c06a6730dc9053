//! Standard health-checking client.
//!
//! Uses the generated `grpc.health.v1` client from tonic-health rather than
//! the raw codec: the serving status lives in the response body, so this is
//! the one probe that actually decodes a payload.

use async_trait::async_trait;
use grapnel_common::{GrapnelError, GrapnelResult, HealthProber};
use std::time::Duration;
use tonic::transport::Channel;
use tonic::Request;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tracing::debug;

/// Health prober over a shared channel.
#[derive(Debug, Clone)]
pub struct GrpcHealthProbe {
    channel: Channel,
    call_timeout: Duration,
}

impl GrpcHealthProbe {
    #[must_use]
    pub fn new(channel: Channel, call_timeout: Duration) -> Self {
        Self {
            channel,
            call_timeout,
        }
    }
}

#[async_trait]
impl HealthProber for GrpcHealthProbe {
    async fn check(&self, service: Option<&str>) -> GrapnelResult<String> {
        let mut client = HealthClient::new(self.channel.clone());

        let mut request = Request::new(HealthCheckRequest {
            service: service.unwrap_or_default().to_string(),
        });
        request.set_timeout(self.call_timeout);

        let reply = tokio::time::timeout(
            self.call_timeout + Duration::from_secs(1),
            client.check(request),
        )
        .await
        .map_err(|_| GrapnelError::Health("health check deadline elapsed".into()))?
        .map_err(|status| GrapnelError::Health(status.to_string()))?;

        let raw = reply.into_inner().status;
        let status = ServingStatus::try_from(raw)
            .map(|s| s.as_str_name().to_string())
            .unwrap_or_else(|_| format!("UNKNOWN({raw})"));

        debug!(service = service.unwrap_or("<overall>"), %status, "health status");
        Ok(status)
    }
}
