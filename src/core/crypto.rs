use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::errors::{CofreError, CofreResult};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const ARGON2_M_COST: u32 = 65_536;
pub const ARGON2_T_COST: u32 = 3;
pub const ARGON2_P_COST: u32 = 1;

/// Symmetric key for the current vault session. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct CipherBlob {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
}

/// Salt and Argon2 verifier stored by the backend at setup time.
#[derive(Debug, Clone)]
pub struct AuthMaterial {
    pub salt: String,
    pub verifier: String,
}

fn argon2_instance() -> CofreResult<Argon2<'static>> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(KEY_SIZE))
        .map_err(|_| CofreError::Config("invalid argon2 parameters".to_owned()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).to_string()
}

pub fn derive_key(master_password: &SecretString, salt: &str) -> CofreResult<MasterKey> {
    let _ = SaltString::from_b64(salt).map_err(|_| CofreError::InvalidCredentials)?;
    let argon2 = argon2_instance()?;
    let mut out = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(
            master_password.expose_secret().as_bytes(),
            salt.as_bytes(),
            &mut out,
        )
        .map_err(|_| CofreError::InvalidCredentials)?;
    Ok(MasterKey(out))
}

pub fn create_auth_material(
    master_password: &SecretString,
) -> CofreResult<(AuthMaterial, MasterKey)> {
    let salt = generate_salt();
    let derived = derive_key(master_password, &salt)?;
    let salt_string = SaltString::from_b64(&salt).map_err(|_| CofreError::Crypto)?;
    let argon2 = argon2_instance()?;
    let verifier = argon2
        .hash_password(derived.bytes(), &salt_string)
        .map_err(|_| CofreError::Crypto)?
        .to_string();

    Ok((AuthMaterial { salt, verifier }, derived))
}

pub fn verify_master_password(
    master_password: &SecretString,
    salt: &str,
    verifier: &str,
) -> CofreResult<MasterKey> {
    let derived = derive_key(master_password, salt)?;
    let parsed = PasswordHash::new(verifier).map_err(|_| CofreError::InvalidCredentials)?;
    let argon2 = argon2_instance()?;
    argon2
        .verify_password(derived.bytes(), &parsed)
        .map_err(|_| CofreError::InvalidCredentials)?;
    Ok(derived)
}

pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> CofreResult<CipherBlob> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.bytes()));
    let ciphertext = cipher.encrypt(Nonce::from_slice(&nonce), plaintext)?;

    Ok(CipherBlob { ciphertext, nonce })
}

pub fn decrypt(
    key: &MasterKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> CofreResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.bytes()));
    let plaintext = cipher.decrypt(Nonce::from_slice(nonce), ciphertext)?;
    Ok(plaintext)
}
