//! Token stores

use std::{io, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{OAuth2AccessToken, PrincipalRef, ResourceIdRef};

pub mod file;
pub mod in_memory;

pub use file::FileTokenStore;
pub use in_memory::InMemoryTokenStore;

/// An error while reading or writing a token store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unable to read or write the backing storage
    #[error("error accessing token storage")]
    Io(#[from] io::Error),
    /// The stored tokens could not be serialized or deserialized
    #[error("error serializing stored tokens")]
    Serialization(#[from] serde_json::Error),
}

/// Holds access tokens on behalf of principals
///
/// Tokens are keyed by the principal that authorized them and the resource
/// they grant access to. Implementations must be safe to share between
/// concurrent callers.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Looks up the token held for `principal` on `resource`
    async fn lookup(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
    ) -> Result<Option<OAuth2AccessToken>, StoreError>;

    /// Removes any token held for `principal` on `resource`
    ///
    /// Evicting a token that is not present is not an error.
    async fn evict(&self, principal: &PrincipalRef, resource: &ResourceIdRef)
        -> Result<(), StoreError>;

    /// Stores a token for `principal` on `resource`, replacing any prior token
    async fn store(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
        token: OAuth2AccessToken,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<T> TokenStore for Arc<T>
where
    T: TokenStore + ?Sized,
{
    async fn lookup(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
    ) -> Result<Option<OAuth2AccessToken>, StoreError> {
        (**self).lookup(principal, resource).await
    }

    async fn evict(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
    ) -> Result<(), StoreError> {
        (**self).evict(principal, resource).await
    }

    async fn store(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
        token: OAuth2AccessToken,
    ) -> Result<(), StoreError> {
        (**self).store(principal, resource, token).await
    }
}
