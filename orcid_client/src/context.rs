//! The security context of a caller

use orcid_tokens::{AuthorizationCode, AuthorizationCodeRef, Principal, PrincipalRef};

/// The identity on whose behalf an operation runs, along with any one-shot
/// authorization code obtained for it
///
/// An authorization code is only good for a single token exchange. Every
/// fetch clears it on completion so that it cannot leak into an unrelated
/// later request.
pub trait SecurityContext {
    /// The principal whose tokens are used
    fn principal(&self) -> &PrincipalRef;

    /// The pending authorization code, if any
    fn authorization_code(&self) -> Option<&AuthorizationCodeRef>;

    /// Discards the pending authorization code
    fn clear_authorization_code(&mut self);
}

/// A security context holding a principal and an optional authorization code
#[derive(Clone, Debug)]
pub struct OAuth2SecurityContext {
    principal: Principal,
    authorization_code: Option<AuthorizationCode>,
}

impl OAuth2SecurityContext {
    /// Constructs a context for `principal` with no authorization code
    pub fn new(principal: impl Into<Principal>) -> Self {
        Self {
            principal: principal.into(),
            authorization_code: None,
        }
    }

    /// Attaches an authorization code received from the authority
    pub fn with_authorization_code(mut self, code: impl Into<AuthorizationCode>) -> Self {
        self.authorization_code = Some(code.into());
        self
    }

    /// Replaces the pending authorization code
    pub fn set_authorization_code(&mut self, code: Option<AuthorizationCode>) {
        self.authorization_code = code;
    }
}

impl SecurityContext for OAuth2SecurityContext {
    #[inline]
    fn principal(&self) -> &PrincipalRef {
        &self.principal
    }

    #[inline]
    fn authorization_code(&self) -> Option<&AuthorizationCodeRef> {
        self.authorization_code.as_deref()
    }

    fn clear_authorization_code(&mut self) {
        if self.authorization_code.take().is_some() {
            tracing::trace!(principal = %self.principal, "cleared authorization code");
        }
    }
}

/// Clears the authorization code of a context when dropped
pub(crate) struct ClearAuthorizationCode<'a, C: SecurityContext + ?Sized> {
    context: &'a mut C,
}

impl<'a, C: SecurityContext + ?Sized> ClearAuthorizationCode<'a, C> {
    pub(crate) fn new(context: &'a mut C) -> Self {
        Self { context }
    }
}

impl<C: SecurityContext + ?Sized> Drop for ClearAuthorizationCode<'_, C> {
    fn drop(&mut self) {
        self.context.clear_authorization_code();
    }
}
