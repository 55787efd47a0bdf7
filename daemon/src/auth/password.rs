use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::pbkdf2;
use ring::pbkdf2::PBKDF2_HMAC_SHA256;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = 32;
const N_ITER: NonZeroU32 = match NonZeroU32::new(10_000) {
    Some(n) => n,
    None => unreachable!(),
};

// Pbkdf2, 16 byte salt, 32 byte key, 10000 iterations of hmac-sha256,
// stored as `base64(salt)$base64(hash)`
pub fn hash_password(password: &str) -> Result<String, ring::error::Unspecified> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)?;

    let mut pbkdf2_hash = [0u8; CREDENTIAL_LEN];
    pbkdf2::derive(
        PBKDF2_HMAC_SHA256,
        N_ITER,
        &salt,
        password.as_bytes(),
        &mut pbkdf2_hash,
    );

    Ok(format!(
        "{}${}",
        STANDARD.encode(salt),
        STANDARD.encode(pbkdf2_hash)
    ))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, hash)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (STANDARD.decode(salt), STANDARD.decode(hash)) else {
        return false;
    };

    pbkdf2::verify(PBKDF2_HMAC_SHA256, N_ITER, &salt, password.as_bytes(), &hash).is_ok()
}
