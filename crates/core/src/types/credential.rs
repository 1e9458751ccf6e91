//! Stored password credential.
//!
//! A user's password only ever exists in this crate as its one-way hash.
//! No type here carries the plaintext.

use core::fmt;

/// A PHC-format password hash (e.g. `$argon2id$v=19$...`).
///
/// Produced by the auth service when a password is set and read back from
/// `users.password_hash` for verification. `Debug` is redacted and the type
/// does not implement `Serialize`, so it cannot leak into logs or responses.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wrap an already-computed PHC hash string.
    #[must_use]
    pub const fn from_phc(hash: String) -> Self {
        Self(hash)
    }

    /// The PHC string, for verification or storage.
    #[must_use]
    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword([REDACTED])")
    }
}
