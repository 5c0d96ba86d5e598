use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    AccessToken, AccessTokenRef, ClientId, OrcidId, OrcidIdRef, RefreshToken, RefreshTokenRef,
    ResourceId, ScopeToken,
};

/// Provider-specific capabilities attached to an access token
///
/// Most authorities return nothing beyond the standard OAuth2 token
/// response. ORCID additionally identifies the researcher who granted the
/// token, which allows a profile to be fetched without naming it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderMetadata {
    /// A token with no provider-specific extensions
    #[default]
    Generic,
    /// A token issued by ORCID on behalf of a researcher
    Orcid {
        /// The ORCID iD of the researcher who authorized the token
        orcid: OrcidId,
        /// The researcher's display name, if the authority returned one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// An access token as returned by an OAuth2 authority
///
/// Expiry is deliberately not tracked. A token is considered valid until
/// the resource server rejects it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2AccessToken {
    access_token: AccessToken,
    token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    scope: Vec<ScopeToken>,
    #[serde(default)]
    provider: ProviderMetadata,
}

impl OAuth2AccessToken {
    /// Constructs a generic bearer token
    pub fn bearer(access_token: impl Into<AccessToken>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_owned(),
            refresh_token: None,
            scope: Vec::new(),
            provider: ProviderMetadata::Generic,
        }
    }

    /// Marks this token as issued by ORCID on behalf of `orcid`
    pub fn with_orcid(mut self, orcid: OrcidId, name: Option<String>) -> Self {
        self.provider = ProviderMetadata::Orcid { orcid, name };
        self
    }

    /// Overrides the token type
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// Attaches a refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<RefreshToken>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the scope granted to this token
    pub fn with_scope<I>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = ScopeToken>,
    {
        self.scope = scope.into_iter().collect();
        self
    }

    /// Gets the access token
    #[inline]
    pub fn access_token(&self) -> &AccessTokenRef {
        &self.access_token
    }

    /// Gets the token type, usually `bearer`
    #[inline]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Gets the refresh token, if one was issued
    #[inline]
    pub fn refresh_token(&self) -> Option<&RefreshTokenRef> {
        self.refresh_token.as_deref()
    }

    /// Gets the scope granted to this token
    #[inline]
    pub fn scope(&self) -> &[ScopeToken] {
        &self.scope
    }

    /// Gets the provider-specific metadata
    #[inline]
    pub fn provider(&self) -> &ProviderMetadata {
        &self.provider
    }

    /// Gets the ORCID iD of the researcher who authorized this token, if
    /// the token was issued by ORCID
    pub fn orcid(&self) -> Option<&OrcidIdRef> {
        match &self.provider {
            ProviderMetadata::Orcid { orcid, .. } => Some(&**orcid),
            ProviderMetadata::Generic => None,
        }
    }
}

/// Describes a resource protected by an OAuth2 authority
///
/// When no usable token is held for a resource, these details are handed
/// back to the caller so that it can start an authorization flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDetails {
    /// Identifies the resource within a token store
    pub id: ResourceId,
    /// The client ID registered with the authority
    pub client_id: ClientId,
    /// Where the user is sent to authorize the client
    pub user_authorization_uri: Url,
    /// Where authorization codes are exchanged for access tokens
    pub access_token_uri: Url,
    /// The scope requested during authorization
    #[serde(default)]
    pub scope: Vec<ScopeToken>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_token_has_no_orcid() {
        let token = OAuth2AccessToken::bearer(AccessToken::from_static("abc"));
        assert_eq!(token.orcid(), None);
        assert_eq!(token.provider(), &ProviderMetadata::Generic);
    }

    #[test]
    fn orcid_token_exposes_researcher() {
        let orcid = OrcidId::new("0000-0002-1825-0097".to_owned()).unwrap();
        let token = OAuth2AccessToken::bearer(AccessToken::from_static("abc"))
            .with_orcid(orcid.clone(), Some("Josiah Carberry".to_owned()));

        assert_eq!(token.orcid(), Some(&*orcid));
    }

    #[test]
    fn serialized_token_carries_provider_tag() {
        let orcid = OrcidId::new("0000-0002-1825-0097".to_owned()).unwrap();
        let token = OAuth2AccessToken::bearer(AccessToken::from_static("abc")).with_orcid(orcid, None);

        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["access_token"], "abc");
        assert_eq!(value["provider"]["provider"], "orcid");
        assert_eq!(value["provider"]["orcid"], "0000-0002-1825-0097");

        let back: OAuth2AccessToken = serde_json::from_value(value).unwrap();
        assert_eq!(back, token);
    }
}
