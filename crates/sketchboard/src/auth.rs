//! Authentication hook for the handshake.
//!
//! SketchBoard doesn't know where participants come from. The embedding
//! application implements [`Authenticator`] to turn the handshake token
//! into a [`ParticipantId`].

use sketchboard_protocol::ParticipantId;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication failed: {0}")]
    Rejected(String),
}

/// Validates a handshake token.
///
/// # Example
///
/// ```rust
/// use sketchboard::{AuthError, Authenticator};
/// use sketchboard_protocol::ParticipantId;
///
/// /// Treats the token as the participant number. Development only.
/// struct NumericTokens;
///
/// impl Authenticator for NumericTokens {
///     async fn authenticate(&self, token: &str) -> Result<ParticipantId, AuthError> {
///         token
///             .parse()
///             .map(ParticipantId)
///             .map_err(|_| AuthError::Rejected("token must be a number".into()))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Called once per connection with the handshake token (empty when
    /// the client sent none).
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<ParticipantId, AuthError>> + Send;
}
