//! Client errors

use orcid_reqwest::FetchError;
use orcid_tokens::{store::StoreError, ResourceDetails};
use thiserror::Error;

/// An error while performing an ORCID operation
#[derive(Debug, Error)]
pub enum Error {
    /// No usable access token is held for the resource
    ///
    /// Either a token was never obtained, or the resource server rejected
    /// the one held and it has been evicted. The caller should send the
    /// principal through the authorization flow described by the resource
    /// details and may then retry.
    #[error("authorization required for resource {}", .0.id)]
    AuthorizationRequired(Box<ResourceDetails>),
    /// The resource server could not be reached or returned an error
    #[error(transparent)]
    Transport(#[from] FetchError),
    /// The token store could not be read
    #[error("error reading token store")]
    TokenStore(#[from] StoreError),
    /// A profile was requested without an ORCID iD and the access token
    /// does not identify a researcher
    #[error("no ORCID iD given and the access token does not identify a researcher")]
    MissingOrcid,
    /// The request URL could not be constructed
    #[error("invalid request URL")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// The resource requiring authorization, if this is an
    /// [`AuthorizationRequired`][Error::AuthorizationRequired] error
    pub fn authorization_required(&self) -> Option<&ResourceDetails> {
        match self {
            Self::AuthorizationRequired(resource) => Some(&**resource),
            _ => None,
        }
    }
}
