use anyhow::{Result, anyhow};
use k256::ecdsa::{Signature, SigningKey, signature::Signer as _};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};
use tc_api_types::AccountAddress;
use zeroize::Zeroize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignPurpose {
    Transaction,
    Auth,
}

pub trait Signer: Send + Sync {
    fn sign(&self, payload: &[u8], purpose: SignPurpose) -> Result<Vec<u8>>;
    fn account(&self) -> AccountAddress;
}

/// secp256k1 keypair for the local development wallet and the
/// identity-provider signing surface. The account address is the keccak-256
/// of the uncompressed public key, truncated to the low 20 bytes.
pub struct Secp256k1Signer {
    signing_key: SigningKey,
}

impl Secp256k1Signer {
    pub fn new_random() -> Self {
        let mut rng = OsRng;
        Self {
            signing_key: SigningKey::random(&mut rng),
        }
    }

    pub fn from_secret_key_bytes(mut secret_key: [u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_bytes((&secret_key).into())
            .map_err(|err| anyhow!("invalid secret key: {err}"))?;
        secret_key.zeroize();
        Ok(Self { signing_key })
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    pub fn wallet_address(&self) -> AccountAddress {
        // Skip the 0x04 SEC1 tag, hash the 64 coordinate bytes.
        let encoded = self.public_key_bytes();
        let digest = Keccak256::digest(&encoded[1..]);
        let mut bytes = [0_u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        AccountAddress::from_bytes(&bytes)
    }
}

impl Signer for Secp256k1Signer {
    fn sign(&self, payload: &[u8], purpose: SignPurpose) -> Result<Vec<u8>> {
        if payload.is_empty() {
            return Err(anyhow!("payload cannot be empty"));
        }

        let purpose_tag = match purpose {
            SignPurpose::Transaction => "transaction",
            SignPurpose::Auth => "auth",
        };

        let mut signing_input = Vec::with_capacity(32 + payload.len());
        signing_input.extend_from_slice(b"tracecortex:v1:");
        signing_input.extend_from_slice(purpose_tag.as_bytes());
        signing_input.extend_from_slice(b":");
        signing_input.extend_from_slice(payload);

        let signature: Signature = self.signing_key.sign(&signing_input);
        Ok(signature.to_bytes().to_vec())
    }

    fn account(&self) -> AccountAddress {
        self.wallet_address()
    }
}

/// Keccak-256 convenience used for selectors and synthetic tx hashes.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(input);
    let mut out = [0_u8; 32];
    out.copy_from_slice(&digest);
    out
}
