use std::sync::Arc;

use color_eyre::{Result, eyre::eyre};
use tracing::instrument;

use crate::auth::password::{dummy_hash, verify_password};
use crate::auth::token::{IssuedToken, TokenSigner};
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::services::admin::AdminService;

/// Exchanges an identity and secret for a signed session token.
pub struct CredentialVerifier {
    admins: AdminService,
    signer: Arc<TokenSigner>,
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(db: Arc<Database>, signer: Arc<TokenSigner>) -> Result<Self> {
        Ok(Self {
            admins: AdminService::new(db),
            signer,
            dummy_hash: dummy_hash()?,
        })
    }

    /// Unknown identities are checked against a dummy hash so both failure
    /// paths cost one argon2 verification and return the same error.
    #[instrument(skip(self, secret))]
    pub async fn login(&self, identity: &str, secret: &str) -> AppResult<IssuedToken> {
        let admin = self.admins.find_by_identity(identity).await?;

        let hash = admin
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |a| a.password_hash.clone());
        let secret = secret.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &secret))
            .await
            .map_err(|e| eyre!("Password verification task failed: {e}"))?;

        match admin {
            Some(admin) if matches => {
                let issued = self.signer.issue(&admin.identity, admin.role.as_str());
                log::info!("Admin '{}' logged in", admin.identity);
                Ok(issued)
            }
            _ => {
                log::warn!("Failed login attempt");
                Err(AppError::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::test_signer;
    use crate::test_utils::test_db;
    use password_hash::PasswordHash;

    async fn verifier_with_admin() -> (CredentialVerifier, Arc<TokenSigner>) {
        let db = test_db().await;
        AdminService::new(db.clone())
            .create("owner@example.com", "correct-password")
            .await
            .unwrap();
        let signer = Arc::new(test_signer());
        (CredentialVerifier::new(db, signer.clone()).unwrap(), signer)
    }

    #[tokio::test]
    async fn test_correct_credentials_issue_verifiable_token() {
        let (verifier, signer) = verifier_with_admin().await;

        let issued = verifier
            .login("Owner@Example.com", "correct-password")
            .await
            .unwrap();
        let claims = signer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "owner@example.com");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_wrong_secret_and_unknown_identity_fail_alike() {
        let (verifier, _) = verifier_with_admin().await;

        let wrong_secret = verifier
            .login("owner@example.com", "wrong-password")
            .await
            .unwrap_err();
        let unknown = verifier
            .login("nobody@example.com", "correct-password")
            .await
            .unwrap_err();

        assert!(matches!(wrong_secret, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong_secret.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_empty_secret_fails() {
        let (verifier, _) = verifier_with_admin().await;
        let err = verifier.login("owner@example.com", "").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_identity_verifies_against_real_argon2_params() {
        let (verifier, _) = verifier_with_admin().await;
        let stored = verifier
            .admins
            .find_by_identity("owner@example.com")
            .await
            .unwrap()
            .unwrap()
            .password_hash;

        let stored = PasswordHash::new(&stored).unwrap();
        let dummy = PasswordHash::new(&verifier.dummy_hash).unwrap();
        assert_eq!(dummy.algorithm, stored.algorithm);
        assert_eq!(dummy.version, stored.version);
        assert_eq!(dummy.params.to_string(), stored.params.to_string());
        assert!(dummy.hash.is_some());
    }
}
