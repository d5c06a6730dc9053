//! Grapnel Transport - channel plumbing and endpoint classification.
//!
//! This crate owns everything that touches the wire directly:
//! - opening the per-target HTTP/2 channel (plaintext or TLS),
//! - the raw empty-body unary invoker used by every probe,
//! - the transport probe that decides whether a peer speaks gRPC,
//! - the standard health-checking client.

pub mod channel;
pub mod health;
pub mod invoke;
pub mod probe;

pub use channel::{connect, validate_target, ChannelOptions};
pub use health::GrpcHealthProbe;
pub use invoke::{RawClient, RawCodec, RawMessage};
pub use probe::{
    classify_probe_reply, status_is_http_artifact, status_is_transport_artifact, TransportProbe,
    HEALTH_METHOD, HEALTH_SERVICE,
};
