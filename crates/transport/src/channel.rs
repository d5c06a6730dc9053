//! Channel establishment.
//!
//! One HTTP/2 channel per target, shared by every worker scanning that
//! target. Plaintext by default; callers opt into TLS. The channel object is
//! safe for concurrent invocation, so no locking is layered on top of it.

use grapnel_common::{GrapnelError, GrapnelResult};
use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::debug;

/// Connection parameters for a single target.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub tls: bool,
    pub connect_timeout: Duration,
    /// Default per-call timeout applied at the endpoint level.
    pub call_timeout: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            tls: false,
            connect_timeout: Duration::from_secs(5),
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Split `host:port` into its host part, for TLS SNI.
pub(crate) fn host_of(target: &str) -> &str {
    match target.rfind(':') {
        Some(idx) => &target[..idx],
        None => target,
    }
}

/// Validate the `host:port` shape without resolving anything.
pub fn validate_target(target: &str) -> GrapnelResult<()> {
    let (host, port) = match target.rfind(':') {
        Some(idx) => (&target[..idx], &target[idx + 1..]),
        None => return Err(GrapnelError::InvalidTarget(format!("missing port in {target}"))),
    };
    if host.is_empty() {
        return Err(GrapnelError::InvalidTarget(format!("missing host in {target}")));
    }
    port.parse::<u16>()
        .map(|_| ())
        .map_err(|_| GrapnelError::InvalidTarget(format!("bad port in {target}")))
}

/// Open an HTTP/2 channel to `host:port` and wait for it to become usable.
///
/// A failed TCP/TLS or HTTP/2 handshake, or an elapsed connect deadline,
/// surfaces as [`GrapnelError::Connect`]; the caller treats that as fatal
/// for the target only.
pub async fn connect(target: &str, opts: &ChannelOptions) -> GrapnelResult<Channel> {
    validate_target(target)?;

    let scheme = if opts.tls { "https" } else { "http" };
    let uri = format!("{scheme}://{target}");

    let mut endpoint = Endpoint::from_shared(uri)
        .map_err(|e| GrapnelError::InvalidTarget(e.to_string()))?
        .connect_timeout(opts.connect_timeout)
        .timeout(opts.call_timeout);

    if opts.tls {
        let tls = ClientTlsConfig::new().domain_name(host_of(target).to_string());
        endpoint = endpoint
            .tls_config(tls)
            .map_err(|e| GrapnelError::Handshake(e.to_string()))?;
    }

    debug!(target, tls = opts.tls, "opening channel");

    match tokio::time::timeout(opts.connect_timeout, endpoint.connect()).await {
        Ok(Ok(channel)) => Ok(channel),
        Ok(Err(e)) => Err(GrapnelError::Connect(e.to_string())),
        Err(_) => Err(GrapnelError::Connect(format!(
            "connect deadline of {:?} elapsed",
            opts.connect_timeout
        ))),
    }
}
