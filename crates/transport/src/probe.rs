//! Endpoint classification: does this peer speak gRPC at all?
//!
//! The probe invokes the well-known `/grpc.health.v1.Health/Check` path with
//! an empty body. Any genuine `grpc-status` trailer proves the peer is a
//! gRPC service, regardless of the code value: UNIMPLEMENTED and
//! UNAUTHENTICATED are as conclusive as OK. The subtle part is telling a
//! genuine status apart from the synthetic ones the client stack produces
//! for transport failures and plain-HTTP peers; that discrimination lives in
//! [`status_is_transport_artifact`] and [`status_is_http_artifact`] and is
//! shared with the method oracle.

use crate::channel::{connect, ChannelOptions};
use crate::invoke::RawClient;
use grapnel_common::EndpointProbe;
use std::time::Instant;
use tonic::{Code, Status};
use tracing::debug;

/// Well-known health-check path used for the liveness probe.
pub const HEALTH_SERVICE: &str = "grpc.health.v1.Health";
pub const HEALTH_METHOD: &str = "Check";

/// Message fragments the client stack produces when no gRPC status was ever
/// read off the wire: connection trouble, h2 failures, deadlines.
const TRANSPORT_MARKERS: &[&str] = &[
    "transport error",
    "error trying to connect",
    "connection refused",
    "connection reset",
    "connection closed",
    "broken pipe",
    "h2 protocol error",
    "http2 error",
    "frame with invalid",
    "timeout expired",
    "deadline elapsed",
    "deadline has elapsed",
    "per-call deadline elapsed",
    "service was not ready",
    "operation was canceled",
    "tls handshake",
];

/// Message fragments that indicate an HTTP peer answered without gRPC
/// framing: the response had no `grpc-status` trailer to read.
const HTTP_MARKERS: &[&str] = &[
    "grpc-status header missing",
    "invalid content-type",
    "expected content-type",
    "non-grpc",
];

/// True when the status was synthesized for a transport-layer failure
/// rather than read from a `grpc-status` trailer.
#[must_use]
pub fn status_is_transport_artifact(status: &Status) -> bool {
    let message = status.message().to_ascii_lowercase();
    if TRANSPORT_MARKERS.iter().any(|m| message.contains(m)) {
        return true;
    }
    // Codes the client stack itself uses for local failures. A server can
    // legitimately return these, but without trailer evidence in the message
    // we cannot tell, so they are treated as inconclusive.
    matches!(status.code(), Code::Cancelled | Code::DeadlineExceeded)
}

/// True when the status reports an HTTP response that lacked gRPC trailers.
#[must_use]
pub fn status_is_http_artifact(status: &Status) -> bool {
    let message = status.message().to_ascii_lowercase();
    HTTP_MARKERS.iter().any(|m| message.contains(m))
}

/// Classify the health-probe reply into (is_grpc, reason).
#[must_use]
pub fn classify_probe_reply(reply: &Result<(), Status>) -> (bool, String) {
    match reply {
        Ok(()) => (true, "health check answered OK".to_string()),
        Err(status) => {
            if status_is_http_artifact(status) {
                return (
                    false,
                    format!("HTTP response without gRPC trailers: {}", status.message()),
                );
            }
            if status_is_transport_artifact(status) {
                return (false, format!("transport failure: {}", status.message()));
            }
            match status.code() {
                // Unknown with no better evidence usually means the
                // response never carried gRPC framing.
                Code::Unknown => (
                    false,
                    format!("no conclusive gRPC status: {}", status.message()),
                ),
                code => (true, format!("gRPC status {code:?} received")),
            }
        }
    }
}

/// Probes whether an endpoint speaks gRPC.
///
/// Idempotent and cheap; the orchestrator reuses it before committing to a
/// full scan, and the bulk detector runs it against every target.
#[derive(Debug, Clone, Default)]
pub struct TransportProbe {
    opts: ChannelOptions,
}

impl TransportProbe {
    #[must_use]
    pub fn new(opts: ChannelOptions) -> Self {
        Self { opts }
    }

    /// Connect and classify. Never returns an error: every failure mode is
    /// folded into the [`EndpointProbe`] so bulk detection can keep going.
    pub async fn probe(&self, target: &str) -> EndpointProbe {
        let start = Instant::now();

        let channel = match connect(target, &self.opts).await {
            Ok(channel) => channel,
            Err(e) => {
                debug!(target, error = %e, "connect failed");
                return EndpointProbe::failed(e.to_string(), start.elapsed());
            }
        };

        let (is_grpc, reason) = self.classify_channel(&channel).await;

        debug!(target, is_grpc, %reason, "endpoint classified");

        EndpointProbe {
            connected: true,
            is_grpc,
            reason,
            latency: start.elapsed(),
        }
    }

    /// Classify a peer over an already-open channel. Used by the scan
    /// orchestrator, which reuses the same channel for everything else.
    pub async fn classify_channel(&self, channel: &tonic::transport::Channel) -> (bool, String) {
        let client = RawClient::new(channel.clone(), self.opts.call_timeout);
        let reply = client.unary_empty(HEALTH_SERVICE, HEALTH_METHOD).await;
        classify_probe_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_reply_is_grpc() {
        let (is_grpc, _) = classify_probe_reply(&Ok(()));
        assert!(is_grpc);
    }

    #[test]
    fn unimplemented_proves_grpc() {
        let reply = Err(Status::new(Code::Unimplemented, "unknown service foo.Bar"));
        let (is_grpc, reason) = classify_probe_reply(&reply);
        assert!(is_grpc);
        assert!(reason.contains("Unimplemented"));
    }

    #[test]
    fn auth_gated_statuses_prove_grpc() {
        for code in [
            Code::Unauthenticated,
            Code::PermissionDenied,
            Code::InvalidArgument,
            Code::Internal,
        ] {
            let reply = Err(Status::new(code, "denied"));
            let (is_grpc, _) = classify_probe_reply(&reply);
            assert!(is_grpc, "{code:?} should prove gRPC");
        }
    }

    #[test]
    fn plain_http_response_is_not_grpc() {
        let reply = Err(Status::new(
            Code::Unknown,
            "grpc-status header missing, mapped from HTTP status code 200",
        ));
        let (is_grpc, _) = classify_probe_reply(&reply);
        assert!(!is_grpc);
    }

    #[test]
    fn content_type_mismatch_is_not_grpc() {
        let reply = Err(Status::new(
            Code::Unknown,
            "invalid content-type: text/html",
        ));
        let (is_grpc, _) = classify_probe_reply(&reply);
        assert!(!is_grpc);
    }

    #[test]
    fn h2_failure_is_not_grpc() {
        let reply = Err(Status::new(
            Code::Unavailable,
            "h2 protocol error: frame with invalid size",
        ));
        let (is_grpc, _) = classify_probe_reply(&reply);
        assert!(!is_grpc);
    }

    #[test]
    fn deadline_is_transport_artifact() {
        let status = Status::deadline_exceeded("per-call deadline elapsed");
        assert!(status_is_transport_artifact(&status));
    }

    #[test]
    fn genuine_unavailable_with_server_message_counts_as_grpc() {
        // Server-produced UNAVAILABLE ("try again later") still carries a
        // real trailer; only transport-shaped messages are discarded.
        let reply = Err(Status::new(Code::Unavailable, "try again later"));
        let (is_grpc, _) = classify_probe_reply(&reply);
        assert!(is_grpc);
    }
}
