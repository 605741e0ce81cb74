use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_VERSION: &str = "v0";
pub const DEFAULT_MAX_SKEW_SECS: i64 = 300;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("malformed request timestamp `{0}`")]
    MalformedTimestamp(String),
    #[error("request timestamp is outside the allowed {max_skew_secs}s window")]
    StaleTimestamp { max_skew_secs: i64 },
    #[error("malformed request signature")]
    MalformedSignature,
    #[error("request signature mismatch")]
    Mismatch,
}

/// Verifies Slack's `v0` request signatures against the app signing secret.
#[derive(Clone, Debug)]
pub struct RequestVerifier {
    signing_secret: SecretString,
    max_skew_secs: i64,
}

impl RequestVerifier {
    pub fn new(signing_secret: SecretString) -> Self {
        Self { signing_secret, max_skew_secs: DEFAULT_MAX_SKEW_SECS }
    }

    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now_unix: i64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?.trim();
        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?.trim();

        let issued_at = timestamp
            .parse::<i64>()
            .map_err(|_| SignatureError::MalformedTimestamp(timestamp.to_owned()))?;
        if (now_unix - issued_at).abs() > self.max_skew_secs {
            return Err(SignatureError::StaleTimestamp { max_skew_secs: self.max_skew_secs });
        }

        let encoded = signature
            .strip_prefix(SIGNATURE_VERSION)
            .and_then(|rest| rest.strip_prefix('='))
            .ok_or(SignatureError::MalformedSignature)?;
        let provided = hex::decode(encoded).map_err(|_| SignatureError::MalformedSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.signing_secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;
        mac.update(&base_string(timestamp, body));
        mac.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)
    }
}

/// Computes the `X-Slack-Signature` header value for `body` sent at `timestamp`.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let digest = match HmacSha256::new_from_slice(signing_secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(&base_string(timestamp, body));
            hex::encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    };
    format!("{SIGNATURE_VERSION}={digest}")
}

/// Compares two secrets without short-circuiting on the first differing byte.
pub fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn base_string(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut base = Vec::with_capacity(SIGNATURE_VERSION.len() + timestamp.len() + body.len() + 2);
    base.extend_from_slice(SIGNATURE_VERSION.as_bytes());
    base.push(b':');
    base.extend_from_slice(timestamp.as_bytes());
    base.push(b':');
    base.extend_from_slice(body);
    base
}
