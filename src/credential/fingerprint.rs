//! # Fingerprints
//!
//! SHA-256 content digests of credential payloads.
//!
//! The digest input is the compact JSON object mapping each key, in ascending
//! order, to the standard base64 encoding of its value, e.g.
//! `{"aws_access_key_id":"QQ==","aws_secret_access_key":"Qg=="}`. This is the
//! same byte form the deployed controllers hash, so annotations written before
//! an upgrade stay valid.
//!
//! Every call hashes with its own `Sha256` context.

use super::extract::CanonicalPayload;
use super::Payload;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Digest length in bytes
pub const FINGERPRINT_LEN: usize = 32;

/// A 32-byte SHA-256 content digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

/// Failure decoding a persisted fingerprint
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintDecodeError {
    #[error("fingerprint is not valid base64: {0}")]
    Base64(String),

    #[error("fingerprint must be 32 bytes, got {0}")]
    Length(usize),
}

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Text form persisted in the annotation
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(self.0)
    }

    /// Decode the annotation text form
    ///
    /// # Errors
    ///
    /// Fails on invalid base64 or a digest that is not 32 bytes.
    pub fn from_base64(text: &str) -> Result<Self, FingerprintDecodeError> {
        let bytes = BASE64_STANDARD
            .decode(text.trim())
            .map_err(|e| FingerprintDecodeError::Base64(e.to_string()))?;
        if bytes.len() != FINGERPRINT_LEN {
            return Err(FingerprintDecodeError::Length(bytes.len()));
        }
        let mut digest = [0u8; FINGERPRINT_LEN];
        digest.copy_from_slice(&bytes);
        Ok(Self(digest))
    }
}

impl From<[u8; FINGERPRINT_LEN]> for Fingerprint {
    fn from(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_base64())
    }
}

/// Fingerprint a canonical payload
pub fn fingerprint(payload: &CanonicalPayload) -> Fingerprint {
    fingerprint_data(payload.as_data())
}

/// Fingerprint an arbitrary payload (used for copies, which are hashed whole)
pub fn fingerprint_data(data: &Payload) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(data));
    Fingerprint(hasher.finalize().into())
}

/// Tamper check: does `candidate` hash to the trusted fingerprint?
pub fn matches(trusted: &Fingerprint, candidate: &Payload) -> bool {
    fingerprint_data(candidate) == *trusted
}

fn canonical_bytes(data: &Payload) -> Vec<u8> {
    let encoded: BTreeMap<&str, String> = data
        .iter()
        .map(|(key, value)| (key.as_str(), BASE64_STANDARD.encode(&value.0)))
        .collect();
    serde_json::to_vec(&encoded).expect("a map of strings always serializes to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;

    fn payload(pairs: &[(&str, &str)]) -> Payload {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
            .collect()
    }

    #[test]
    fn test_serialization_format() {
        let data = payload(&[("aws_secret_access_key", "B"), ("aws_access_key_id", "A")]);
        assert_eq!(
            canonical_bytes(&data),
            br#"{"aws_access_key_id":"QQ==","aws_secret_access_key":"Qg=="}"#.to_vec()
        );
    }

    #[test]
    fn test_known_digest() {
        let data = payload(&[("aws_access_key_id", "A"), ("aws_secret_access_key", "B")]);
        let expected: [u8; 32] =
            Sha256::digest(br#"{"aws_access_key_id":"QQ==","aws_secret_access_key":"Qg=="}"#)
                .into();
        assert_eq!(fingerprint_data(&data).as_bytes(), &expected);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut first = Payload::new();
        first.insert("b".to_string(), ByteString(b"2".to_vec()));
        first.insert("a".to_string(), ByteString(b"1".to_vec()));
        first.insert("c".to_string(), ByteString(b"3".to_vec()));

        let second: Payload = [("c", "3"), ("a", "1"), ("b", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
            .collect();

        assert_eq!(fingerprint_data(&first), fingerprint_data(&second));
    }

    #[test]
    fn test_different_content_different_fingerprint() {
        let a = payload(&[("k", "v1")]);
        let b = payload(&[("k", "v2")]);
        let c = payload(&[("k2", "v1")]);
        assert_ne!(fingerprint_data(&a), fingerprint_data(&b));
        assert_ne!(fingerprint_data(&a), fingerprint_data(&c));
    }

    #[test]
    fn test_canonical_and_raw_agree() {
        let canonical: CanonicalPayload = [("username", "u"), ("password", "p")]
            .into_iter()
            .collect();
        let raw = payload(&[("password", "p"), ("username", "u")]);
        assert_eq!(fingerprint(&canonical), fingerprint_data(&raw));
    }

    #[test]
    fn test_matches() {
        let trusted = fingerprint_data(&payload(&[("token", "abc")]));
        assert!(matches(&trusted, &payload(&[("token", "abc")])));
        assert!(!matches(&trusted, &payload(&[("token", "abd")])));
        assert!(!matches(
            &trusted,
            &payload(&[("token", "abc"), ("extra", "x")])
        ));
    }

    #[test]
    fn test_base64_round_trip_and_errors() {
        let fp = fingerprint_data(&payload(&[("k", "v")]));
        assert_eq!(Fingerprint::from_base64(&fp.to_base64()), Ok(fp));
        assert!(matches!(
            Fingerprint::from_base64("not base64!"),
            Err(FingerprintDecodeError::Base64(_))
        ));
        assert_eq!(
            Fingerprint::from_base64("QQ=="),
            Err(FingerprintDecodeError::Length(1))
        );
    }

    #[test]
    fn test_concurrent_fingerprints_are_independent() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let index = i.to_string();
                    let data = payload(&[("index", index.as_str())]);
                    (0..200).map(|_| fingerprint_data(&data)).collect::<Vec<_>>()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let results = handle.join().unwrap();
            let index = i.to_string();
            let expected = fingerprint_data(&payload(&[("index", index.as_str())]));
            assert!(results.iter().all(|fp| *fp == expected));
        }
    }
}
