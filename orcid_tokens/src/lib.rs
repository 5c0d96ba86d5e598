//! Strongly-typed OAuth2 credentials and token storage for ORCID clients
//!
//! This crate holds the pieces of state that a client needs in order to
//! call the ORCID API on behalf of a researcher: the access tokens
//! themselves, the details of the protected resource they apply to, and a
//! [`TokenStore`][store::TokenStore] that keeps them between requests.
//!
//! Tokens are keyed by the [`Principal`] that authorized them and the
//! [`ResourceId`] of the protected resource. A store never predicts expiry.
//! A token is held until the resource server rejects it, at which point the
//! caller evicts it and sends the principal back through authorization.
//!
//! ```
//! use orcid_tokens::{
//!     dto::TokenResponse, store::InMemoryTokenStore, store::TokenStore, OAuth2AccessToken,
//!     PrincipalRef, ResourceIdRef,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let body = r#"{
//!     "access_token": "f5af9f51-07e6-4332-8f1a-c0c11c1e3728",
//!     "token_type": "bearer",
//!     "scope": "/read-limited",
//!     "orcid": "0000-0002-1825-0097"
//! }"#;
//!
//! let response: TokenResponse = serde_json::from_str(body).unwrap();
//! let token = OAuth2AccessToken::try_from(response).unwrap();
//!
//! let store = InMemoryTokenStore::new();
//! let principal = PrincipalRef::from_static("alice");
//! let resource = ResourceIdRef::from_static("orcid-member-api");
//! store.store(principal, resource, token).await.unwrap();
//!
//! let held = store.lookup(principal, resource).await.unwrap().unwrap();
//! assert_eq!(held.orcid().unwrap().as_str(), "0000-0002-1825-0097");
//! # }
//! ```
//!
//! Access tokens, refresh tokens, and authorization codes redact
//! themselves in `Debug` and `Display` output. Use the alternate form
//! (`{:#?}`) to reveal a short prefix when diagnosing problems.

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

mod braids;
pub mod dto;
pub mod store;
mod tokens;

pub use braids::*;
pub use tokens::{OAuth2AccessToken, ProviderMetadata, ResourceDetails};
