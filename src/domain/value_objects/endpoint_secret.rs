use rand::RngCore;
use rand::rngs::OsRng;

/// Shared signing credential of one endpoint.
///
/// The secret is 32 random bytes rendered as lowercase hex; the hex string's
/// bytes are the HMAC key, which is also what receivers are handed.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointSecret(String);

impl EndpointSecret {
    pub const RANDOM_BYTES: usize = 32;

    /// Draw a fresh secret from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::RANDOM_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a secret loaded from storage.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for EndpointSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EndpointSecret(**redacted**)")
    }
}

#[cfg(test)]
mod tests {
    use super::EndpointSecret;

    #[test]
    fn given_generate_when_called_should_return_64_hex_chars() {
        let secret = EndpointSecret::generate();
        assert_eq!(secret.as_str().len(), 64);
        assert!(secret.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn given_two_generations_when_compared_should_differ() {
        assert_ne!(EndpointSecret::generate(), EndpointSecret::generate());
    }

    #[test]
    fn given_secret_when_debug_formatted_should_not_leak_value() {
        let secret = EndpointSecret::from_stored("topsecret".to_string());
        assert!(!format!("{secret:?}").contains("topsecret"));
    }
}
