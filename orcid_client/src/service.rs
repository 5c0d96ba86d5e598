//! Profile and search operations against the ORCID API

use std::collections::BTreeMap;

use orcid_reqwest::{DocumentClient, XmlDocument};
use orcid_tokens::{store::TokenStore, OrcidIdRef, ResourceDetails};
use url::Url;

use crate::{
    config::{Endpoints, ORCID_PLACEHOLDER},
    context::SecurityContext,
    AuthenticatedFetcher, Error,
};

/// Builds a search query from field and value pairs
///
/// Each pair is rendered as `field:value`, and the clauses are joined with
/// ` AND ` in iteration order.
///
/// ```
/// let query = orcid_client::build_query([("family-name", "Smith"), ("given-names", "Jane")]);
/// assert_eq!(query, "family-name:Smith AND given-names:Jane");
/// ```
pub fn build_query<I, K, V>(terms: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut query = String::new();
    for (field, value) in terms {
        if !query.is_empty() {
            query.push_str(" AND ");
        }
        query.push_str(field.as_ref());
        query.push(':');
        query.push_str(value.as_ref());
    }
    query
}

/// Reads researcher profiles and searches the ORCID registry
#[derive(Debug)]
pub struct OrcidService<S, D> {
    endpoints: Endpoints,
    resource: ResourceDetails,
    store: S,
    client: D,
}

impl<S, D> OrcidService<S, D>
where
    S: TokenStore,
    D: DocumentClient,
{
    /// Constructs a new service
    pub fn new(endpoints: Endpoints, resource: ResourceDetails, store: S, client: D) -> Self {
        Self {
            endpoints,
            resource,
            store,
            client,
        }
    }

    /// The token store, for seeding tokens after authorization
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The protected resource that tokens are held for
    #[inline]
    pub fn resource(&self) -> &ResourceDetails {
        &self.resource
    }

    /// Fetches a researcher's profile
    ///
    /// When `orcid` is `None`, the profile of the researcher who authorized
    /// the held access token is fetched.
    pub async fn fetch_profile<C>(
        &self,
        context: &mut C,
        orcid: Option<&OrcidIdRef>,
    ) -> Result<XmlDocument, Error>
    where
        C: SecurityContext + ?Sized,
    {
        self.fetcher(context)
            .await?
            .fetch_with(|token| {
                let orcid = match orcid {
                    Some(orcid) => orcid,
                    None => token.orcid().ok_or(Error::MissingOrcid)?,
                };
                self.profile_url(orcid)
            })
            .await
    }

    /// Runs a search using a raw query string, such as
    /// `family-name:Carberry AND given-names:Josiah`
    pub async fn search<C>(&self, context: &mut C, query: &str) -> Result<XmlDocument, Error>
    where
        C: SecurityContext + ?Sized,
    {
        let url = self.search_url(query);
        self.fetcher(context).await?.fetch(&url).await
    }

    /// Runs a search built from field and value pairs
    ///
    /// See [`build_query`] for how the query string is formed. Clauses are
    /// ordered by field name.
    pub async fn search_terms<C>(
        &self,
        context: &mut C,
        terms: &BTreeMap<String, String>,
    ) -> Result<XmlDocument, Error>
    where
        C: SecurityContext + ?Sized,
    {
        let query = build_query(terms);
        self.search(context, &query).await
    }

    async fn fetcher<'a, C>(
        &'a self,
        context: &'a mut C,
    ) -> Result<AuthenticatedFetcher<'a, S, D, C>, Error>
    where
        C: SecurityContext + ?Sized,
    {
        AuthenticatedFetcher::new(&self.store, &self.client, context, &self.resource).await
    }

    fn profile_url(&self, orcid: &OrcidIdRef) -> Result<Url, Error> {
        let url = self
            .endpoints
            .profile_url_template
            .replace(ORCID_PLACEHOLDER, orcid.as_str());
        Ok(Url::parse(&url)?)
    }

    fn search_url(&self, query: &str) -> Url {
        let mut url = self.endpoints.search_url.clone();
        url.query_pairs_mut().append_pair("q", query);
        url
    }
}
