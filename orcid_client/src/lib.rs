//! An ORCID API client that reads researcher profiles and searches the
//! registry on behalf of authorized principals
//!
//! Every operation runs against an explicit [`SecurityContext`] naming the
//! principal on whose behalf it runs. The access token held for that
//! principal is looked up first. If none is held, the operation fails with
//! [`Error::AuthorizationRequired`] before any request is made. If the
//! ORCID API rejects the token, it is evicted from the store and the same
//! error is returned, so the caller can send the principal back through
//! authorization and try again. Nothing is retried automatically.
//!
//! ```
//! use orcid_client::{Endpoints, Error, OAuth2SecurityContext, OrcidService};
//! use orcid_reqwest::ReqwestDocumentClient;
//! use orcid_tokens::{store::InMemoryTokenStore, ClientId, Principal, ResourceDetails, ResourceId};
//! use reqwest_middleware::ClientBuilder;
//! use url::Url;
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let endpoints = Endpoints::new(
//!     "https://api.sandbox.orcid.org/v1.2/{orcid}/orcid-profile",
//!     Url::parse("https://api.sandbox.orcid.org/v1.2/search/orcid-bio/").unwrap(),
//! )
//! .unwrap();
//! let resource = ResourceDetails {
//!     id: ResourceId::from_static("orcid"),
//!     client_id: ClientId::from_static("APP-5XXXXXXXXXXXXXXX"),
//!     user_authorization_uri: Url::parse("https://sandbox.orcid.org/oauth/authorize").unwrap(),
//!     access_token_uri: Url::parse("https://api.sandbox.orcid.org/oauth/token").unwrap(),
//!     scope: Vec::new(),
//! };
//!
//! let service = OrcidService::new(
//!     endpoints,
//!     resource,
//!     InMemoryTokenStore::new(),
//!     ReqwestDocumentClient::new(ClientBuilder::new(reqwest::Client::new()).build()),
//! );
//!
//! let mut context = OAuth2SecurityContext::new(Principal::from_static("alice"));
//! match service.fetch_profile(&mut context, None).await {
//!     Err(Error::AuthorizationRequired(resource)) => {
//!         // send alice to resource.user_authorization_uri
//!         assert_eq!(resource.id.as_str(), "orcid");
//!     }
//!     other => panic!("expected authorization to be required: {:?}", other),
//! }
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod config;
pub mod context;
mod error;
mod fetcher;
mod service;

pub use config::{ConfigError, Endpoints, OrcidConfig};
pub use context::{OAuth2SecurityContext, SecurityContext};
pub use error::Error;
pub use fetcher::AuthenticatedFetcher;
pub use service::{build_query, OrcidService};
