pub mod gate;
pub mod guard;
pub mod password;
pub mod token;
pub mod verifier;

/// Cookie carrying the session token.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}
