//! Bearer-token auth: self-contained HMAC-signed tokens.
//!
//! A token is `base64(email) . hex(hmac_sha256(secret, email))`. The
//! server holds no session state; any token minted with the configured
//! secret verifies, and tampering with either half fails the MAC check.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use docent_core::models::Identity;
use docent_core::traits::TokenVerifier;
use docent_core::{Result, TutorError};

type HmacSha256 = Hmac<Sha256>;

pub struct HmacVerifier {
    secret: Vec<u8>,
}

impl HmacVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Mint a token for an email address.
    pub fn mint_token(&self, email: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(email.as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("{}.{}", URL_SAFE_NO_PAD.encode(email), sig)
    }
}

fn auth_err() -> TutorError {
    TutorError::Auth("invalid or expired token".to_string())
}

#[async_trait]
impl TokenVerifier for HmacVerifier {
    async fn verify(&self, token: &str) -> Result<Identity> {
        let (encoded, sig_hex) = token.split_once('.').ok_or_else(auth_err)?;
        let email_bytes = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| auth_err())?;
        let email = String::from_utf8(email_bytes).map_err(|_| auth_err())?;
        if email.is_empty() {
            return Err(auth_err());
        }
        let sig = hex::decode(sig_hex).map_err(|_| auth_err())?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(email.as_bytes());
        // Constant-time comparison; a plain == would leak prefix length.
        mac.verify_slice(&sig).map_err(|_| auth_err())?;

        Ok(Identity { email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn minted_token_round_trips() {
        let verifier = HmacVerifier::new("test-secret");
        let token = verifier.mint_token("ada@example.com");
        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.email, "ada@example.com");
    }

    #[tokio::test]
    async fn tampered_email_is_rejected() {
        let verifier = HmacVerifier::new("test-secret");
        let token = verifier.mint_token("ada@example.com");
        let sig = token.split_once('.').unwrap().1;
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode("eve@example.com"), sig);
        assert!(matches!(
            verifier.verify(&forged).await,
            Err(TutorError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let token = HmacVerifier::new("secret-a").mint_token("ada@example.com");
        assert!(HmacVerifier::new("secret-b").verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn malformed_tokens_are_rejected() {
        let verifier = HmacVerifier::new("test-secret");
        for bad in ["", "no-dot", "!!!.abcd", "aGk.not-hex"] {
            assert!(
                matches!(verifier.verify(bad).await, Err(TutorError::Auth(_))),
                "token {:?} should not verify",
                bad
            );
        }
    }

    #[tokio::test]
    async fn empty_email_is_rejected() {
        let verifier = HmacVerifier::new("test-secret");
        let mut mac = HmacSha256::new_from_slice(b"test-secret").unwrap();
        mac.update(b"");
        let sig = hex::encode(mac.finalize().into_bytes());
        let token = format!("{}.{}", URL_SAFE_NO_PAD.encode(""), sig);
        assert!(verifier.verify(&token).await.is_err());
    }
}
