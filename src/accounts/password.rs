use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Well-formed hash with the default cost parameters. Verified against when
/// the username is unknown so that path costs the same as a wrong password.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dXNlcmRlc2stZHVtbXkhIQ$ZHVtbXktaGFzaC1kdW1teS1oYXNoLWR1bW15LWhhc2g";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is malformed.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Display form of a stored hash: the algorithm and a mask, never the digest.
pub fn mask_password_hash(hash: &str) -> String {
    match PasswordHash::new(hash) {
        Ok(parsed) => format!("{} ********", parsed.algorithm),
        Err(_) => "unusable password".to_string(),
    }
}
