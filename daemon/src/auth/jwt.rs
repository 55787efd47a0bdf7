use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use warden_protocol::user::Role;

const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const CHARS_LEN: usize = CHARS.len();

const ISSUER: &str = "Warden.Daemon";

pub fn generate_secret_string(length: usize) -> Result<String, ring::error::Unspecified> {
    let rng = SystemRandom::new();
    let mut s = String::with_capacity(length);

    for _ in 0..length {
        let idx = uniform_random_index(&rng, CHARS_LEN)?;
        s.push(CHARS[idx] as char);
    }

    Ok(s)
}

fn uniform_random_index(rng: &SystemRandom, max: usize) -> Result<usize, ring::error::Unspecified> {
    let byte_count = ((max as f64).log2() / 8.0).ceil().max(1.0) as usize;
    let bound = rejection_bound(byte_count, max as u64);
    let mut buf = vec![0u8; byte_count];

    loop {
        rng.fill(&mut buf)?;
        let num = buf.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
        if num < bound {
            return Ok((num % max as u64) as usize);
        }
    }
}

/// Largest multiple of `max` that `byte_count` random bytes can reach; draws at
/// or above it are rejected so every index is equally likely.
fn rejection_bound(byte_count: usize, max: u64) -> u64 {
    let range = 1u128 << (8 * byte_count.min(8));
    let max = u128::from(max);
    (range - range % max).min(u128::from(u64::MAX)) as u64
}

pub fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    iss: String,
    aud: String,
    pub sub: String,
    pub role: Role,
    pub exp: u64,
    pub jti: String,
}

impl SessionClaims {
    pub fn new(username: &str, role: Role, ttl_secs: u64) -> Self {
        Self {
            iss: ISSUER.into(),
            aud: ISSUER.into(),
            sub: username.to_string(),
            role,
            exp: now_secs() + ttl_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }
}

pub trait JwtCodec: Serialize + for<'de> Deserialize<'de> {
    fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error>;
    fn to_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error>;
}

impl JwtCodec for SessionClaims {
    fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_audience(&[ISSUER]);
        validation.set_issuer(&[ISSUER]);
        validation.leeway = 0;

        decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
    }

    fn to_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            &self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_uses_alphanumerics_only() {
        let secret = generate_secret_string(48).unwrap();
        assert_eq!(secret.len(), 48);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn rejection_bound_fits_the_drawn_bytes() {
        // one byte covers 0..256; 248 = 4 * 62 is the last unbiased cut
        assert_eq!(rejection_bound(1, CHARS_LEN as u64), 248);
        assert_eq!(rejection_bound(1, 16), 256);
        assert_eq!(rejection_bound(2, 1000), 65000);
    }

    #[test]
    fn every_index_is_reachable() {
        let rng = SystemRandom::new();
        let mut seen = [false; CHARS_LEN];
        for _ in 0..5000 {
            seen[uniform_random_index(&rng, CHARS_LEN).unwrap()] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn token_roundtrip_keeps_subject_and_role() {
        let claims = SessionClaims::new("steve", Role::Admin, 60);
        let token = claims.to_token("secret").unwrap();
        assert_eq!(SessionClaims::from_token(&token, "secret").unwrap(), claims);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = SessionClaims::new("steve", Role::User, 60)
            .to_token("secret")
            .unwrap();
        assert!(SessionClaims::from_token(&token, "another").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = SessionClaims::new("steve", Role::User, 0);
        claims.exp = now_secs() - 10;
        let token = claims.to_token("secret").unwrap();
        assert!(SessionClaims::from_token(&token, "secret").is_err());
    }
}
