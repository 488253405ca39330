//! gcrelay Node -- library crate for the GC message relay.
//!
//! Re-exports the runtime, config, host seam and HTTP delivery so the
//! binary and integration tests drive the same types.

pub mod config;
pub mod delivery;
pub mod host;
pub mod runtime;

pub use config::RelayConfig;
pub use delivery::HttpDelivery;
pub use host::{ClientInfo, HostServer};
pub use runtime::{ActivationError, RelayRuntime};

use base64::Engine as _;
use gcrelay_protocol::{emsg, Envelope, ProtoHeader};

/// Parse an envelope given on the command line as hex, or base64 when it
/// is not valid hex.
pub fn parse_envelope_arg(s: &str) -> anyhow::Result<Vec<u8>> {
    let s = s.trim();
    if let Ok(bytes) = hex::decode(s) {
        return Ok(bytes);
    }
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| anyhow::anyhow!("envelope is neither hex nor base64: {e}"))
}

/// One-line summary of an envelope, followed by its body when structured.
pub fn describe_envelope(bytes: &[u8]) -> anyhow::Result<String> {
    let env = Envelope::decode(bytes)?;
    let id = env.base_type();
    let header = ProtoHeader::from_bytes(&env.header)?;

    let mut out = format!(
        "{} ({id}) structured={} header={:?} body={} bytes",
        emsg::name(id),
        env.is_structured(),
        header,
        env.body.len()
    );
    if env.is_structured() {
        let body: serde_json::Value = serde_json::from_slice(&env.body)?;
        out.push('\n');
        out.push_str(&serde_json::to_string_pretty(&body)?);
    }
    Ok(out)
}
