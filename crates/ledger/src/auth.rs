//! Request authentication.
//!
//! Every mutating request carries an [`IdentityProof`]: the signer's public key
//! and an Ed25519 signature over the SHA-256 of the request's canonical
//! message. The guard checks the signature, then checks that the signer is the
//! identity the operation requires.

use crate::requests::SignedRequest;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use soldrive_types::Identity;
use thiserror::Error;

/// Why an identity proof was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("signature must be 64 bytes, got {len}")]
    MalformedSignature { len: usize },

    #[error("signer {signer} is not a valid public key")]
    InvalidPublicKey { signer: Identity },

    #[error("signature does not verify for {signer}")]
    InvalidSignature { signer: Identity },

    #[error("signer {signer} is not {expected}")]
    IdentityMismatch { expected: Identity, signer: Identity },
}

/// Proof that `signer` authorised a specific request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProof {
    pub signer: Identity,
    pub signature: Vec<u8>,
}

fn message_hash(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// Check that `proof` carries a valid signature over `request`.
///
/// Returns the proven identity.
pub fn verify<R: SignedRequest>(
    request: &R,
    proof: &IdentityProof,
) -> Result<Identity, AuthError> {
    if proof.signature.len() != 64 {
        return Err(AuthError::MalformedSignature {
            len: proof.signature.len(),
        });
    }

    let Ok(verifying_key) = VerifyingKey::from_bytes(proof.signer.as_bytes()) else {
        return Err(AuthError::InvalidPublicKey {
            signer: proof.signer,
        });
    };

    let Ok(signature) = Signature::from_slice(&proof.signature) else {
        return Err(AuthError::MalformedSignature {
            len: proof.signature.len(),
        });
    };

    let hash = message_hash(&request.signing_message());
    verifying_key
        .verify(&hash, &signature)
        .map_err(|_| AuthError::InvalidSignature {
            signer: proof.signer,
        })?;

    Ok(proof.signer)
}

/// Verify `proof` and require that it was produced by `expected`.
pub fn authorize<R: SignedRequest>(
    request: &R,
    proof: &IdentityProof,
    expected: &Identity,
) -> Result<Identity, AuthError> {
    let signer = verify(request, proof)?;
    require_identity(&signer, expected)?;
    Ok(signer)
}

/// Compare a proven identity with the one an entity records.
pub fn require_identity(signer: &Identity, expected: &Identity) -> Result<(), AuthError> {
    if signer != expected {
        return Err(AuthError::IdentityMismatch {
            expected: *expected,
            signer: *signer,
        });
    }
    Ok(())
}

/// Client-side helper that signs requests with an Ed25519 key.
pub struct RequestSigner {
    signing_key: SigningKey,
}

impl RequestSigner {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign<R: SignedRequest>(&self, request: &R) -> IdentityProof {
        let hash = message_hash(&request.signing_message());
        IdentityProof {
            signer: self.identity(),
            signature: self.signing_key.sign(&hash).to_bytes().to_vec(),
        }
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}
