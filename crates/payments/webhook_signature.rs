use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age of a signed webhook, matching the provider's SDKs.
pub const DEFAULT_TOLERANCE_SECONDS: i64 = 300;

/// Verifies `stripe-signature` headers. https://stripe.com/docs/webhooks/signatures
#[derive(Clone)]
pub struct WebhookSignatureVerifier {
    secret: String,
    tolerance_seconds: i64,
}

impl std::fmt::Debug for WebhookSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSignatureVerifier")
            .field("secret", &"<redacted>")
            .field("tolerance_seconds", &self.tolerance_seconds)
            .finish()
    }
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(signature_header: &str) -> Result<SignatureHeader> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest.parse().context("invalid timestamp in stripe-signature")?);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            // Undecodable entries are skipped so a malformed one cannot mask a valid one.
            if let Ok(bytes) = hex::decode(rest) {
                signatures.push(bytes);
            }
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in stripe-signature"))?;
    if signatures.is_empty() {
        anyhow::bail!("missing v1 in stripe-signature");
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Hex HMAC-SHA256 of `"<timestamp>.<payload>"`, the `v1` scheme.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

impl WebhookSignatureVerifier {
    pub fn new(secret: String, tolerance_seconds: i64) -> Self {
        Self {
            secret,
            tolerance_seconds,
        }
    }

    pub fn verify(&self, payload: &[u8], signature_header: &str, now: i64) -> Result<()> {
        if self.secret.trim().is_empty() {
            anyhow::bail!("webhook secret is not configured");
        }
        if signature_header.trim().is_empty() {
            anyhow::bail!("missing stripe-signature header");
        }

        let header = parse_header(signature_header)?;

        let tolerance = u64::try_from(self.tolerance_seconds).unwrap_or(0);
        if now.abs_diff(header.timestamp) > tolerance {
            anyhow::bail!(
                "stripe-signature timestamp outside tolerance ({}s)",
                self.tolerance_seconds
            );
        }

        let mut base = HmacSha256::new_from_slice(self.secret.as_bytes())?;
        base.update(header.timestamp.to_string().as_bytes());
        base.update(b".");
        base.update(payload);

        // verify_slice compares in constant time.
        let matched = header
            .signatures
            .iter()
            .any(|candidate| base.clone().verify_slice(candidate).is_ok());

        if !matched {
            anyhow::bail!("invalid webhook signature");
        }

        Ok(())
    }
}
