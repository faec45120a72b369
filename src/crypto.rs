//! Signature helpers for webhook checks: HMAC-SHA256 shared secrets and
//! RSA PKCS#1 v1.5 public keys.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// RSA PKCS#1 v1.5 verifier over SHA-256 digests.
pub type RsaSha256Verifier = VerifyingKey<Sha256>;

/// Base64 HMAC-SHA256 of `payload` under `key`.
pub fn sign_base64(key: &[u8], payload: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Constant-time check of a base64 HMAC-SHA256 signature.
pub fn verify_base64(key: &[u8], payload: &[u8], signature: &str) -> bool {
    let Ok(expected) = BASE64.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Byte comparison whose timing does not depend on where the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Parse a PEM public key, either SPKI (`PUBLIC KEY`) or PKCS#1
/// (`RSA PUBLIC KEY`).
pub fn rsa_verifier_from_pem(pem: &str) -> Result<RsaSha256Verifier, rsa::pkcs1::Error> {
    let pem = pem.trim();
    let key = match RsaPublicKey::from_public_key_pem(pem) {
        Ok(key) => key,
        Err(_) => RsaPublicKey::from_pkcs1_pem(pem)?,
    };
    Ok(VerifyingKey::new(key))
}

/// Check a base64 RSA PKCS#1 v1.5 SHA-256 signature over `payload`.
pub fn verify_rsa_base64(key: &RsaSha256Verifier, payload: &[u8], signature: &str) -> bool {
    let Ok(raw) = BASE64.decode(signature.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(raw.as_slice()) else {
        return false;
    };
    key.verify(payload, &signature).is_ok()
}

/// Base64 SHA-256 digest, used as a webhook idempotency key.
pub fn sha256_base64(body: &[u8]) -> String {
    BASE64.encode(Sha256::digest(body))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::OnceLock;

    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::signature::{SignatureEncoding, Signer};
    use rsa::RsaPrivateKey;
    use sha2::Sha256;

    /// One key pair per test binary; generation is slow in debug builds.
    pub fn rsa_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap())
    }

    pub fn rsa_public_pem() -> String {
        rsa_key().to_public_key().to_public_key_pem(LineEnding::LF).unwrap()
    }

    pub fn rsa_sign_base64(payload: &[u8]) -> String {
        let signer = SigningKey::<Sha256>::new(rsa_key().clone());
        BASE64.encode(signer.sign(payload).to_bytes())
    }
}
