//! Grapnel Reflection - service enumeration via server reflection.
//!
//! Opens the `ServerReflectionInfo` bidirectional stream, sends one
//! `list_services` request, and ingests whatever comes back. The probe
//! reports `enabled = true` ONLY when a non-empty service list was actually
//! received: a stream that opens but yields zero services must not suppress
//! the wordlist fallback.

use async_trait::async_trait;
use grapnel_common::{ReflectionOutcome, ReflectionProber};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::Request;
use tonic_reflection::pb::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::server_reflection_request::MessageRequest;
use tonic_reflection::pb::server_reflection_response::MessageResponse;
use tonic_reflection::pb::ServerReflectionRequest;
use tracing::{debug, warn};

/// Reflection prober over a shared channel. Uses its own stream; the probe
/// never shares the worker pool's invocations.
#[derive(Debug, Clone)]
pub struct GrpcReflectionProbe {
    channel: Channel,
    call_timeout: Duration,
    /// Send a `file_containing_symbol` request per discovered service to
    /// confirm server willingness. Replies are drained, not decoded.
    fetch_descriptors: bool,
}

impl GrpcReflectionProbe {
    #[must_use]
    pub fn new(channel: Channel, call_timeout: Duration) -> Self {
        Self {
            channel,
            call_timeout,
            fetch_descriptors: true,
        }
    }

    #[must_use]
    pub fn with_descriptor_fetch(mut self, fetch: bool) -> Self {
        self.fetch_descriptors = fetch;
        self
    }

    async fn run(&self) -> ReflectionOutcome {
        let mut client = ServerReflectionClient::new(self.channel.clone());

        let (tx, rx) = tokio::sync::mpsc::channel::<ServerReflectionRequest>(8);
        let outbound = ReceiverStream::new(rx);

        let list_request = ServerReflectionRequest {
            host: String::new(),
            message_request: Some(MessageRequest::ListServices(String::new())),
        };
        // Queue the first request before opening the stream so the server
        // sees it immediately.
        if tx.send(list_request).await.is_err() {
            return ReflectionOutcome {
                enabled: false,
                services: Vec::new(),
                error: Some("reflection request queue closed".into()),
            };
        }

        let opened = tokio::time::timeout(
            self.call_timeout,
            client.server_reflection_info(Request::new(outbound)),
        )
        .await;
        let mut inbound = match opened {
            Ok(Ok(response)) => response.into_inner(),
            Ok(Err(status)) => {
                debug!(error = %status, "reflection stream rejected");
                return ReflectionOutcome {
                    enabled: false,
                    services: Vec::new(),
                    error: Some(status.to_string()),
                };
            }
            Err(_) => {
                return ReflectionOutcome {
                    enabled: false,
                    services: Vec::new(),
                    error: Some("reflection deadline elapsed".into()),
                }
            }
        };

        let first = match tokio::time::timeout(self.call_timeout, inbound.message()).await {
            Err(_) => {
                return ReflectionOutcome {
                    enabled: false,
                    services: Vec::new(),
                    error: Some("reflection deadline elapsed".into()),
                }
            }
            Ok(reply) => match reply {
                Ok(Some(response)) => response,
                Ok(None) => {
                    return ReflectionOutcome {
                        enabled: false,
                        services: Vec::new(),
                        error: Some("reflection stream closed without a response".into()),
                    }
                }
                Err(status) => {
                    // UNIMPLEMENTED with "unknown service" here means the
                    // reflection service itself does not exist.
                    debug!(error = %status, "reflection response error");
                    return ReflectionOutcome {
                        enabled: false,
                        services: Vec::new(),
                        error: Some(status.to_string()),
                    };
                }
            },
        };

        let services: Vec<String> = match first.message_response {
            Some(MessageResponse::ListServicesResponse(list)) => {
                list.service.into_iter().map(|s| s.name).collect()
            }
            _ => {
                warn!("unexpected reflection response variant");
                Vec::new()
            }
        };

        if services.is_empty() {
            // Installed-but-empty reflection is reported as disabled so the
            // candidate fallback still runs.
            return ReflectionOutcome {
                enabled: false,
                services,
                error: None,
            };
        }

        for service in &services {
            debug!(%service, "discovered via reflection");
        }

        if self.fetch_descriptors {
            self.drain_descriptors(&tx, &mut inbound, &services).await;
        }

        ReflectionOutcome {
            enabled: true,
            services,
            error: None,
        }
    }

    /// Ask for the file containing each symbol and throw the bytes away.
    /// Failures here never downgrade the outcome; the list already arrived.
    async fn drain_descriptors(
        &self,
        tx: &tokio::sync::mpsc::Sender<ServerReflectionRequest>,
        inbound: &mut tonic::Streaming<tonic_reflection::pb::ServerReflectionResponse>,
        services: &[String],
    ) {
        for service in services {
            let request = ServerReflectionRequest {
                host: String::new(),
                message_request: Some(MessageRequest::FileContainingSymbol(service.clone())),
            };
            if tx.send(request).await.is_err() {
                return;
            }
            match tokio::time::timeout(self.call_timeout, inbound.message()).await {
                Ok(Ok(Some(_))) => debug!(%service, "descriptor response drained"),
                Ok(Ok(None)) => return,
                Ok(Err(status)) => {
                    debug!(%service, error = %status, "descriptor fetch failed");
                    return;
                }
                Err(_) => {
                    debug!(%service, "descriptor fetch deadline elapsed");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ReflectionProber for GrpcReflectionProbe {
    async fn list_services(&self) -> ReflectionOutcome {
        self.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_defaults_to_disabled() {
        let outcome = ReflectionOutcome::default();
        assert!(!outcome.enabled);
        assert!(outcome.services.is_empty());
    }

    #[test]
    fn list_request_shape() {
        let request = ServerReflectionRequest {
            host: String::new(),
            message_request: Some(MessageRequest::ListServices(String::new())),
        };
        assert!(matches!(
            request.message_request,
            Some(MessageRequest::ListServices(_))
        ));
    }
}
