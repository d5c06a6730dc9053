//! Channel-backed implementation of [`MethodProber`].

use crate::classify::Classifier;
use async_trait::async_trait;
use grapnel_common::{MethodProber, ProbeOutcome};
use grapnel_transport::RawClient;
use std::time::Duration;
use tonic::transport::Channel;
use tracing::debug;

/// Probes `service/method` paths over a shared channel and classifies the
/// replies. Pure in its inputs and idempotent; the only side effect is the
/// single RPC per probe.
#[derive(Debug, Clone)]
pub struct GrpcMethodProber {
    client: RawClient,
    classifier: Classifier,
}

impl GrpcMethodProber {
    #[must_use]
    pub fn new(channel: Channel, call_timeout: Duration, strict: bool) -> Self {
        Self {
            client: RawClient::new(channel, call_timeout),
            classifier: Classifier::new(strict),
        }
    }
}

#[async_trait]
impl MethodProber for GrpcMethodProber {
    async fn probe(&self, service: &str, method: &str) -> ProbeOutcome {
        let reply = self.client.unary_empty(service, method).await;
        let verdict = self.classifier.classify(&reply);

        let outcome = match &reply {
            Ok(()) => ProbeOutcome::new(verdict).with_status("Ok", ""),
            Err(status) => ProbeOutcome::new(verdict)
                .with_status(format!("{:?}", status.code()), status.message().to_string()),
        };

        debug!(
            path = %format!("/{service}/{method}"),
            verdict = %outcome.verdict,
            code = outcome.code.as_deref().unwrap_or("-"),
            "probe classified"
        );

        outcome
    }
}
