//! An in-memory token store

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;

use super::{StoreError, TokenStore};
use crate::{OAuth2AccessToken, Principal, PrincipalRef, ResourceId, ResourceIdRef};

type Key = (Principal, ResourceId);

/// An in-memory token store
#[derive(Default, Debug)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<Key, OAuth2AccessToken>>,
}

impl InMemoryTokenStore {
    /// Constructs a new, empty in-memory token store
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of tokens currently held
    pub fn len(&self) -> usize {
        self.tokens().len()
    }

    /// Whether the store holds no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens().is_empty()
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<Key, OAuth2AccessToken>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(principal: &PrincipalRef, resource: &ResourceIdRef) -> Key {
        (principal.to_owned(), resource.to_owned())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn lookup(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
    ) -> Result<Option<OAuth2AccessToken>, StoreError> {
        Ok(self.tokens().get(&Self::key(principal, resource)).cloned())
    }

    async fn evict(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
    ) -> Result<(), StoreError> {
        if self
            .tokens()
            .remove(&Self::key(principal, resource))
            .is_some()
        {
            tracing::trace!(%principal, %resource, "evicted token from memory");
        }
        Ok(())
    }

    async fn store(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
        token: OAuth2AccessToken,
    ) -> Result<(), StoreError> {
        self.tokens().insert(Self::key(principal, resource), token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccessToken;

    fn alice() -> &'static PrincipalRef {
        PrincipalRef::from_static("alice")
    }

    fn member_api() -> &'static ResourceIdRef {
        ResourceIdRef::from_static("orcid-member-api")
    }

    #[tokio::test]
    async fn lookup_without_token_returns_none() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.lookup(alice(), member_api()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stored_token_is_returned_for_same_pair_only() {
        let store = InMemoryTokenStore::new();
        let token = OAuth2AccessToken::bearer(AccessToken::from_static("abc"));
        store
            .store(alice(), member_api(), token.clone())
            .await
            .unwrap();

        assert_eq!(
            store.lookup(alice(), member_api()).await.unwrap(),
            Some(token)
        );
        assert_eq!(
            store
                .lookup(PrincipalRef::from_static("bob"), member_api())
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            store
                .lookup(alice(), ResourceIdRef::from_static("other"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn evicted_token_is_gone() {
        let store = InMemoryTokenStore::new();
        store
            .store(
                alice(),
                member_api(),
                OAuth2AccessToken::bearer(AccessToken::from_static("abc")),
            )
            .await
            .unwrap();

        store.evict(alice(), member_api()).await.unwrap();

        assert_eq!(store.lookup(alice(), member_api()).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn evicting_missing_token_is_not_an_error() {
        let store = InMemoryTokenStore::new();
        assert!(store.evict(alice(), member_api()).await.is_ok());
    }
}
