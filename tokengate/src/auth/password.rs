//! Argon2id password hashing with a server-side pepper.

use super::{
    config::HashParams,
    errors::{AuthError, AuthResult},
};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
        rand_core::OsRng,
    },
};

/// One-way salted password hasher
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    pepper: String,
}

impl PasswordHasher {
    /// Create a hasher with the default Argon2id cost
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            argon2: Argon2::default(),
            pepper: pepper.into(),
        }
    }

    /// Create a hasher with explicit Argon2id cost parameters
    ///
    /// # Errors
    ///
    /// * `AuthError::Internal` - Parameters are outside Argon2's accepted range
    pub fn with_params(pepper: impl Into<String>, params: HashParams) -> AuthResult<Self> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| AuthError::Internal(format!("invalid argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            pepper: pepper.into(),
        })
    }

    /// Hash password with Argon2id + pepper and a fresh random salt
    ///
    /// # Returns
    ///
    /// * `AuthResult<String>` - PHC-formatted hash string
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = self.pepper(password);
        let salt = SaltString::generate(&mut OsRng);

        Ok(self
            .argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Password matches
    /// * `Ok(false)` - Password does not match
    ///
    /// # Errors
    ///
    /// * `AuthError::MalformedHash` - `hash` is not an Argon2id PHC string
    pub fn verify(&self, hash: &str, password: &str) -> AuthResult<bool> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::MalformedHash)?;
        if parsed_hash.algorithm.as_str() != Algorithm::Argon2id.as_str() {
            return Err(AuthError::MalformedHash);
        }

        let peppered = self.pepper(password);
        match self.argon2.verify_password(peppered.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(AuthError::MalformedHash),
        }
    }

    fn pepper(&self, password: &str) -> String {
        format!("{}{}", password, self.pepper)
    }
}
