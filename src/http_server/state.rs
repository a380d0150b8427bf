use std::sync::Arc;

use crate::auth::SessionCookie;
use crate::auth::token::TokenSigner;
use crate::auth::verifier::CredentialVerifier;
use crate::database::Database;

/// Process-scoped components, built once in `main` and shared by every request.
pub struct AppState {
    pub db: Arc<Database>,
    pub signer: Arc<TokenSigner>,
    pub verifier: Arc<CredentialVerifier>,
    pub cookie: SessionCookie,
}
