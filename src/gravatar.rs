use sha2::{Digest, Sha256};

/// Derive a deterministic Gravatar URL for an email address. Pure
/// computation over the normalized address, so it can never block or fail
/// the signup that requests it.
pub fn gravatar_url(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{}?d=identicon",
        hex::encode(digest)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_deterministic() {
        assert_eq!(
            gravatar_url("agent007@gmail.com"),
            gravatar_url("agent007@gmail.com")
        );
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(
            gravatar_url("  Agent007@Gmail.com "),
            gravatar_url("agent007@gmail.com")
        );
    }

    #[test]
    fn embeds_a_full_hex_digest() {
        let url = gravatar_url("agent007@gmail.com");
        let hash = url
            .strip_prefix("https://www.gravatar.com/avatar/")
            .and_then(|rest| rest.split('?').next())
            .unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
