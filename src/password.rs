use anyhow::{anyhow, bail, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
}; // Argon2 hashing algorithm for hashing and verification
use rand::{distr::Alphanumeric, Rng};
use std::fmt;
use std::str::FromStr;

/// Cost the web application uses when it registers users.
pub const DEFAULT_BCRYPT_COST: u32 = 12;
pub const BCRYPT_MIN_COST: u32 = 4;
pub const BCRYPT_MAX_COST: u32 = 31;
pub const MIN_PASSWORD_LEN: usize = 6;
// bcrypt silently ignores everything past this
pub const BCRYPT_MAX_BYTES: usize = 72;
pub const GENERATED_MIN_LEN: usize = 12;
pub const GENERATED_MAX_LEN: usize = 64;
/// Shorter email local parts are not matched against the password.
pub const LOCAL_PART_MIN_CHECKED: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Bcrypt { cost: u32 },
    Argon2id,
}

impl Default for HashScheme {
    fn default() -> Self {
        HashScheme::Bcrypt { cost: DEFAULT_BCRYPT_COST }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashScheme::Bcrypt { cost } => write!(f, "bcrypt (cost {cost})"),
            HashScheme::Argon2id => write!(f, "argon2id"),
        }
    }
}

impl FromStr for HashScheme {
    type Err = anyhow::Error;

    /// Parses the scheme name only; bcrypt gets the default cost.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcrypt" => Ok(HashScheme::default()),
            "argon2" | "argon2id" => Ok(HashScheme::Argon2id),
            other => Err(anyhow!("Unknown hash scheme '{other}' (expected bcrypt or argon2)")),
        }
    }
}

// Argon2id with the same parameters the login side verifies against:
// 64 MiB memory, 3 passes, single lane, default 32-byte output.
fn argon2_hasher() -> Result<Argon2<'static>> {
    let params = argon2::Params::new(65_536, 3, 1, None)
        .map_err(|e| anyhow!("Invalid Argon2 params: {e}"))?;
    Ok(Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
}

/// Hash a plaintext password with the chosen scheme.
/// bcrypt yields a `$2b$` string, argon2id a PHC string.
pub fn hash_password(password: &str, scheme: HashScheme) -> Result<String> {
    match scheme {
        HashScheme::Bcrypt { cost } => {
            bcrypt::hash(password, cost).context("Failed to hash password with bcrypt")
        }
        HashScheme::Argon2id => {
            let salt = SaltString::generate(&mut OsRng);
            let phc = argon2_hasher()?
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| anyhow!("Failed to hash password with argon2: {e}"))?;
            Ok(phc.to_string())
        }
    }
}

/// Verify a password against a stored hash, picking the algorithm from its prefix.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    if is_bcrypt_hash(stored_hash) {
        return bcrypt::verify(password, stored_hash).context("Invalid bcrypt hash");
    }
    if stored_hash.starts_with("$argon2") {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| anyhow!("Invalid password hash format: {e}"))?;
        // params come from the PHC string itself
        return Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok());
    }
    bail!("Unrecognised password hash format")
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|p| hash.starts_with(p))
}

/// Check a candidate password against the reset policy.
/// Returns every violation so the operator can fix them in one go.
pub fn check_policy(password: &str, email: &str, scheme: HashScheme) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!("Password too short (minimum {MIN_PASSWORD_LEN} characters)."));
    }
    if matches!(scheme, HashScheme::Bcrypt { .. }) && password.len() > BCRYPT_MAX_BYTES {
        problems.push(format!(
            "Password longer than {BCRYPT_MAX_BYTES} bytes; bcrypt would truncate it."
        ));
    }
    if password.trim() != password {
        problems.push("Password starts or ends with whitespace.".to_string());
    }
    if password.chars().any(|c| c.is_control()) {
        problems.push("Password contains control characters.".to_string());
    }

    let local_part = email.split('@').next().unwrap_or_default().to_lowercase();
    if local_part.chars().count() >= LOCAL_PART_MIN_CHECKED
        && password.to_lowercase().contains(&local_part)
    {
        problems.push("Password should not contain the account's email name.".to_string());
    }

    problems
}

/// Random alphanumeric password, length clamped to a sane range.
pub fn generate_password(len: usize) -> String {
    let len = len.clamp(GENERATED_MIN_LEN, GENERATED_MAX_LEN);
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
