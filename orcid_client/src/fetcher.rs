//! Token-authenticated document fetching

use orcid_reqwest::{DocumentClient, FetchError, XmlDocument};
use orcid_tokens::{
    store::TokenStore, OAuth2AccessToken, Principal, PrincipalRef, ResourceDetails,
};
use url::Url;

use crate::{
    context::{ClearAuthorizationCode, SecurityContext},
    Error,
};

fn maybe_value<'a, T: tracing::Value + 'a>(v: &'a Option<T>) -> &'a dyn tracing::Value {
    if let Some(v) = v {
        v
    } else {
        &tracing::field::Empty
    }
}

/// Fetches documents on behalf of a principal using the token held for a
/// protected resource
///
/// A fetcher is constructed for a single operation and consumed by it.
/// Construction resolves the token up front, so a fetcher only exists when
/// there is a token to present. When the resource server rejects that
/// token, it is evicted from the store and the caller is told to
/// re-authorize. The fetcher never retries on its own.
#[derive(Debug)]
pub struct AuthenticatedFetcher<'a, S: ?Sized, D: ?Sized, C: ?Sized> {
    store: &'a S,
    client: &'a D,
    resource: &'a ResourceDetails,
    context: &'a mut C,
    principal: Principal,
    token: OAuth2AccessToken,
}

impl<'a, S, D, C> AuthenticatedFetcher<'a, S, D, C>
where
    S: TokenStore + ?Sized,
    D: DocumentClient + ?Sized,
    C: SecurityContext + ?Sized,
{
    /// Resolves the token held for the context's principal on `resource`
    ///
    /// Fails with [`Error::AuthorizationRequired`] if no token is held. No
    /// request is made in that case.
    pub async fn new(
        store: &'a S,
        client: &'a D,
        context: &'a mut C,
        resource: &'a ResourceDetails,
    ) -> Result<AuthenticatedFetcher<'a, S, D, C>, Error> {
        let principal = context.principal().to_owned();

        match store.lookup(&principal, &resource.id).await? {
            Some(token) => Ok(Self {
                store,
                client,
                resource,
                context,
                principal,
                token,
            }),
            None => {
                tracing::debug!(%principal, resource = %resource.id, "no access token held");
                Err(Error::AuthorizationRequired(Box::new(resource.clone())))
            }
        }
    }

    /// The principal whose token is presented
    #[inline]
    pub fn principal(&self) -> &PrincipalRef {
        &self.principal
    }

    /// The protected resource
    #[inline]
    pub fn resource(&self) -> &ResourceDetails {
        self.resource
    }

    /// The token that will be presented
    #[inline]
    pub fn token(&self) -> &OAuth2AccessToken {
        &self.token
    }

    /// Fetches the document at `url`
    ///
    /// The context's authorization code is cleared once the request
    /// completes, whatever the outcome.
    pub async fn fetch(self, url: &Url) -> Result<XmlDocument, Error> {
        self.fetch_with(|_| Ok(url.clone())).await
    }

    /// Fetches the document at the URL produced by `url` from the held token
    ///
    /// The context's authorization code is cleared on every exit, including
    /// when `url` fails.
    #[tracing::instrument(
        skip_all,
        fields(
            url = tracing::field::Empty,
            principal = %self.principal,
            resource = %self.resource.id,
        ),
    )]
    pub async fn fetch_with<F>(self, url: F) -> Result<XmlDocument, Error>
    where
        F: FnOnce(&OAuth2AccessToken) -> Result<Url, Error>,
    {
        let _cleanup = ClearAuthorizationCode::new(self.context);

        let url = url(&self.token)?;
        tracing::Span::current().record("url", tracing::field::display(&url));

        tracing::trace!("fetching document");

        match self
            .client
            .get_document(&url, self.token.access_token())
            .await
        {
            Ok(document) => Ok(document),
            Err(FetchError::InvalidToken {
                status,
                description,
            }) => {
                tracing::info!(
                    response.status = status.as_u16(),
                    description = maybe_value(&description.as_deref()),
                    "access token rejected, evicting"
                );

                if let Err(error) = self.store.evict(&self.principal, &self.resource.id).await {
                    tracing::warn!(
                        error = (&error as &dyn std::error::Error),
                        "unable to evict rejected access token"
                    );
                }

                Err(Error::AuthorizationRequired(Box::new(self.resource.clone())))
            }
            Err(error) => Err(error.into()),
        }
    }
}
