//! DTOs for token responses returned by an OAuth2 authority

use serde::Deserialize;

use crate::{
    AccessToken, InvalidScopeToken, OAuth2AccessToken, OrcidId, RefreshToken, ScopeToken,
};

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// A token endpoint response
///
/// Covers the standard OAuth2 fields plus the `orcid` and `name`
/// extensions that ORCID includes when a researcher authorizes a client.
/// `expires_in` is accepted but not retained.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The access token
    pub access_token: AccessToken,
    /// The token type
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// The refresh token, if issued
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
    /// The space-delimited scope granted
    #[serde(default)]
    pub scope: Option<String>,
    /// The ORCID iD of the researcher who authorized the client
    #[serde(default)]
    pub orcid: Option<OrcidId>,
    /// The researcher's display name
    #[serde(default)]
    pub name: Option<String>,
}

impl TryFrom<TokenResponse> for OAuth2AccessToken {
    type Error = InvalidScopeToken;

    fn try_from(resp: TokenResponse) -> Result<Self, Self::Error> {
        let scope = resp
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_ascii_whitespace()
            .map(|s| ScopeToken::new(s.to_owned()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut token = OAuth2AccessToken::bearer(resp.access_token)
            .with_token_type(resp.token_type)
            .with_scope(scope);

        if let Some(rt) = resp.refresh_token {
            token = token.with_refresh_token(rt);
        }

        if let Some(orcid) = resp.orcid {
            token = token.with_orcid(orcid, resp.name);
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderMetadata;

    #[test]
    fn orcid_response_becomes_orcid_token() {
        let body = r#"{
            "access_token": "f5af9f51-07e6-4332-8f1a-c0c11c1e3728",
            "token_type": "bearer",
            "refresh_token": "f725f747-3a65-49f6-a231-3e8944ce464d",
            "expires_in": 631138518,
            "scope": "/read-limited /activities/update",
            "name": "Sofia Garcia",
            "orcid": "0000-0001-5109-3700"
        }"#;

        let resp: TokenResponse = serde_json::from_str(body).unwrap();
        let token = OAuth2AccessToken::try_from(resp).unwrap();

        assert_eq!(
            token.access_token().as_str(),
            "f5af9f51-07e6-4332-8f1a-c0c11c1e3728"
        );
        assert_eq!(token.scope().len(), 2);
        assert_eq!(token.scope()[0].as_str(), "/read-limited");
        assert!(token.refresh_token().is_some());
        assert_eq!(
            token.provider(),
            &ProviderMetadata::Orcid {
                orcid: OrcidId::new("0000-0001-5109-3700".to_owned()).unwrap(),
                name: Some("Sofia Garcia".to_owned()),
            }
        );
    }

    #[test]
    fn plain_response_becomes_generic_token() {
        let body = r#"{ "access_token": "abc", "expires_in": 3600 }"#;

        let resp: TokenResponse = serde_json::from_str(body).unwrap();
        let token = OAuth2AccessToken::try_from(resp).unwrap();

        assert_eq!(token.token_type(), "bearer");
        assert!(token.scope().is_empty());
        assert_eq!(token.orcid(), None);
    }

    #[test]
    fn invalid_orcid_is_rejected() {
        let body = r#"{ "access_token": "abc", "orcid": "1234" }"#;
        assert!(serde_json::from_str::<TokenResponse>(body).is_err());
    }
}
