// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room password hashing

/// Hex-encoded blake3 digest of `password`
pub fn hash(password: &str) -> String {
    hex::encode(blake3::hash(password.as_bytes()).as_bytes())
}

/// Does `attempt` match a stored hash? An empty hash matches nothing.
pub fn verify(attempt: &str, hashed: &str) -> bool {
    !hashed.is_empty() && hash(attempt) == hashed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        let h = hash("hunter2");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash("hunter2"));
        assert_ne!(h, hash("hunter3"));
    }

    #[test]
    fn verify_against_hash() {
        let h = hash("go");
        assert!(verify("go", &h));
        assert!(!verify("stop", &h));
        assert!(!verify("", ""));
    }
}
