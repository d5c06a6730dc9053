//! Raw unary invocation on arbitrary paths.
//!
//! Probing a path we have no descriptor for means we cannot use generated
//! client stubs. Instead a minimal [`tonic::codec::Codec`] sends one framed
//! message of length zero (compression flag 0, no payload bytes) and
//! swallows whatever the server returns without decoding it. The
//! discriminating signal is entirely in the `grpc-status` trailer.

use bytes::{Buf, BufMut};
use http::uri::PathAndQuery;
use std::time::Duration;
use tonic::client::Grpc;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::transport::Channel;
use tonic::{Request, Status};
use tracing::trace;

/// Opaque message body. Empty on the way out; on the way in it captures the
/// raw bytes so the decoder never errors on unknown payloads.
#[derive(Debug, Clone, Default)]
pub struct RawMessage(pub Vec<u8>);

/// Codec that performs no protobuf work at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Encode = RawMessage;
    type Decode = RawMessage;
    type Encoder = RawCodec;
    type Decoder = RawCodec;

    fn encoder(&mut self) -> Self::Encoder {
        RawCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawCodec
    }
}

impl Encoder for RawCodec {
    type Item = RawMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put_slice(&item.0);
        Ok(())
    }
}

impl Decoder for RawCodec {
    type Item = RawMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let len = src.remaining();
        let body = src.copy_to_bytes(len);
        Ok(Some(RawMessage(body.to_vec())))
    }
}

/// Issues zero-body unary calls on a shared channel.
///
/// Cheap to clone; each invocation builds a fresh [`Grpc`] wrapper around
/// the multiplexed channel, so concurrent callers never contend.
#[derive(Debug, Clone)]
pub struct RawClient {
    channel: Channel,
    call_timeout: Duration,
}

impl RawClient {
    #[must_use]
    pub fn new(channel: Channel, call_timeout: Duration) -> Self {
        Self {
            channel,
            call_timeout,
        }
    }

    /// Invoke `/service/method` with an empty request body.
    ///
    /// `Ok(())` means the server answered with status OK. Everything else
    /// comes back as the raw [`Status`] for the caller to classify.
    pub async fn unary_empty(&self, service: &str, method: &str) -> Result<(), Status> {
        let path = format!("/{service}/{method}");
        let path = PathAndQuery::from_maybe_shared(path)
            .map_err(|e| Status::invalid_argument(format!("invalid path: {e}")))?;

        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("service was not ready: {e}")))?;

        let mut request = Request::new(RawMessage::default());
        request.set_timeout(self.call_timeout);

        trace!(%path, "issuing empty unary probe");

        // The grpc-timeout header asks nicely; the outer timeout enforces.
        let hard_deadline = self.call_timeout + Duration::from_secs(1);
        let call = grpc.unary::<RawMessage, RawMessage, RawCodec>(request, path, RawCodec);
        match tokio::time::timeout(hard_deadline, call).await {
            Ok(Ok(_response)) => Ok(()),
            Ok(Err(status)) => Err(status),
            Err(_) => Err(Status::deadline_exceeded("per-call deadline elapsed")),
        }
    }
}
