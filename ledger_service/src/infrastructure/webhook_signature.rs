use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::repository::WebhookSignatureVerifier;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the exact bytes of the received request body (§9 open
/// question (a)) — never a re-serialized payload, since re-serializing
/// JSON can reorder keys or change whitespace and silently break every
/// signature the gateway ever sends.
pub struct HmacWebhookSignatureVerifier {
    secret: Vec<u8>,
}

impl HmacWebhookSignatureVerifier {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }
}

impl WebhookSignatureVerifier for HmacWebhookSignatureVerifier {
    fn verify(&self, raw_body: &[u8], signature_hex: &str) -> bool {
        let Ok(expected_bytes) = hex::decode(signature_hex.trim()) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(raw_body);

        mac.verify_slice(&expected_bytes).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use hmac::Mac;

    use super::*;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_matching_signature() {
        let secret = b"top-secret".to_vec();
        let body = br#"{"event_id":"evt_1"}"#;
        let signature = sign(&secret, body);

        let verifier = HmacWebhookSignatureVerifier::new(secret);
        assert!(verifier.verify(body, &signature));
    }

    #[test]
    fn rejects_a_tampered_body() {
        let secret = b"top-secret".to_vec();
        let body = br#"{"event_id":"evt_1"}"#;
        let signature = sign(&secret, body);

        let verifier = HmacWebhookSignatureVerifier::new(secret);
        assert!(!verifier.verify(br#"{"event_id":"evt_2"}"#, &signature));
    }

    #[test]
    fn rejects_malformed_hex() {
        let verifier = HmacWebhookSignatureVerifier::new(b"top-secret".to_vec());
        assert!(!verifier.verify(b"{}", "not-hex"));
    }
}
