use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

fn hasher(memory_kib: u32, iterations: u32) -> anyhow::Result<Argon2<'static>> {
    let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Work factor comes from configuration; it is never decided at call sites.
pub fn hash_password(plain: &str, memory_kib: u32, iterations: u32) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = hasher(memory_kib, iterations)?;
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// The PHC string carries its own parameters, so verification does not need
/// the configured work factor.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

lazy_static! {
    static ref DUMMY_HASH: String =
        hash_password("propmart-dummy-password", Params::DEFAULT_M_COST, Params::DEFAULT_T_COST)
            .expect("hashing a constant cannot fail");
}

/// Burns a comparable amount of hashing work when the email is unknown, so a
/// missing account is not distinguishable from a wrong password by timing.
pub fn dummy_verify(plain: &str) {
    let _ = verify_password(plain, &DUMMY_HASH);
}
