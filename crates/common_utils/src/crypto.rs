//! Utilities for cryptographic algorithms
use base64::Engine;
use error_stack::ResultExt;
use ring::hmac;

use crate::errors::{self, CustomResult};

/// Trait for cryptographically signing messages
pub trait SignMessage {
    /// Takes in a secret and a message and returns the calculated signature as bytes
    fn sign_message(
        &self,
        _secret: &[u8],
        _msg: &[u8],
    ) -> CustomResult<Vec<u8>, errors::CryptoError>;
}

/// Trait for cryptographically verifying a message against a signature
pub trait VerifySignature {
    /// Takes in a secret, the signature and the message and verifies the message
    /// against the signature
    fn verify_signature(
        &self,
        _secret: &[u8],
        _signature: &[u8],
        _msg: &[u8],
    ) -> CustomResult<bool, errors::CryptoError>;
}

/// Represents no cryptographic algorithm.
/// Implements all crypto traits and acts like a Nop
#[derive(Debug)]
pub struct NoAlgorithm;

impl SignMessage for NoAlgorithm {
    fn sign_message(
        &self,
        _secret: &[u8],
        _msg: &[u8],
    ) -> CustomResult<Vec<u8>, errors::CryptoError> {
        Ok(Vec::new())
    }
}

impl VerifySignature for NoAlgorithm {
    fn verify_signature(
        &self,
        _secret: &[u8],
        _signature: &[u8],
        _msg: &[u8],
    ) -> CustomResult<bool, errors::CryptoError> {
        Ok(true)
    }
}

/// Represents the HMAC-SHA-256 algorithm
#[derive(Debug)]
pub struct HmacSha256;

impl SignMessage for HmacSha256 {
    fn sign_message(
        &self,
        secret: &[u8],
        msg: &[u8],
    ) -> CustomResult<Vec<u8>, errors::CryptoError> {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
        Ok(hmac::sign(&key, msg).as_ref().to_vec())
    }
}

impl VerifySignature for HmacSha256 {
    fn verify_signature(
        &self,
        secret: &[u8],
        signature: &[u8],
        msg: &[u8],
    ) -> CustomResult<bool, errors::CryptoError> {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret);

        Ok(hmac::verify(&key, msg, signature).is_ok())
    }
}

/// Represents the HMAC-SHA-512 algorithm
#[derive(Debug)]
pub struct HmacSha512;

impl SignMessage for HmacSha512 {
    fn sign_message(
        &self,
        secret: &[u8],
        msg: &[u8],
    ) -> CustomResult<Vec<u8>, errors::CryptoError> {
        let key = hmac::Key::new(hmac::HMAC_SHA512, secret);
        Ok(hmac::sign(&key, msg).as_ref().to_vec())
    }
}

impl VerifySignature for HmacSha512 {
    fn verify_signature(
        &self,
        secret: &[u8],
        signature: &[u8],
        msg: &[u8],
    ) -> CustomResult<bool, errors::CryptoError> {
        let key = hmac::Key::new(hmac::HMAC_SHA512, secret);

        Ok(hmac::verify(&key, msg, signature).is_ok())
    }
}

/// A secret echoed back by the caller instead of a signature, compared in constant time
#[derive(Debug)]
pub struct SharedSecret;

impl VerifySignature for SharedSecret {
    fn verify_signature(
        &self,
        secret: &[u8],
        signature: &[u8],
        _msg: &[u8],
    ) -> CustomResult<bool, errors::CryptoError> {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
        let expected = hmac::sign(&key, secret);

        Ok(!secret.is_empty() && hmac::verify(&key, signature, expected.as_ref()).is_ok())
    }
}

/// Trait for generating a digest of a message
pub trait GenerateDigest {
    /// Takes a message and creates a digest for it
    fn generate_digest(&self, message: &[u8]) -> CustomResult<Vec<u8>, errors::CryptoError>;
}

/// Represents the SHA-256 algorithm
#[derive(Debug)]
pub struct Sha256;

impl GenerateDigest for Sha256 {
    fn generate_digest(&self, message: &[u8]) -> CustomResult<Vec<u8>, errors::CryptoError> {
        let digest = ring::digest::digest(&ring::digest::SHA256, message);
        Ok(digest.as_ref().to_vec())
    }
}

/// Text encoding used to carry a binary signature in an HTTP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEncoding {
    /// Lower-case hexadecimal
    Hex,
    /// Standard base64 with padding
    Base64,
    /// Text taken as is
    Plain,
}

impl SignatureEncoding {
    /// Render signature bytes as header text.
    pub fn encode(self, signature: &[u8]) -> String {
        match self {
            Self::Hex => hex::encode(signature),
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(signature),
            Self::Plain => String::from_utf8_lossy(signature).into_owned(),
        }
    }

    /// Turn header text back into signature bytes.
    pub fn decode(self, signature: &str) -> CustomResult<Vec<u8>, errors::CryptoError> {
        let signature = signature.trim();
        match self {
            Self::Hex => hex::decode(signature)
                .change_context(errors::CryptoError::DecodingFailed)
                .attach_printable("Signature is not valid hex"),
            Self::Base64 => base64::engine::general_purpose::STANDARD
                .decode(signature)
                .change_context(errors::CryptoError::DecodingFailed)
                .attach_printable("Signature is not valid base64"),
            Self::Plain => Ok(signature.as_bytes().to_vec()),
        }
    }
}

/// Sign `msg` with `algorithm` and encode the result for transport.
pub fn sign_and_encode(
    algorithm: &dyn SignMessage,
    encoding: SignatureEncoding,
    secret: &[u8],
    msg: &[u8],
) -> CustomResult<String, errors::CryptoError> {
    algorithm
        .sign_message(secret, msg)
        .map(|signature| encoding.encode(&signature))
}

/// Decode a transported signature and verify it against `msg`.
///
/// A signature that can not be decoded is reported as a mismatch rather than an error, since it
/// comes from an untrusted caller.
pub fn decode_and_verify(
    algorithm: &dyn VerifySignature,
    encoding: SignatureEncoding,
    secret: &[u8],
    signature: &str,
    msg: &[u8],
) -> CustomResult<bool, errors::CryptoError> {
    match encoding.decode(signature) {
        Ok(signature) => algorithm.verify_signature(secret, &signature, msg),
        Err(_) => Ok(false),
    }
}
