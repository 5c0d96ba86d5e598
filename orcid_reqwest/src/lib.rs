//! Authenticated retrieval of XML documents from the ORCID API
//!
//! A [`DocumentClient`] performs a single `GET` against a fully-formed URL,
//! presenting an access token as a bearer credential, and decodes the
//! response into an [`XmlDocument`]. Failures are classified so that the
//! caller can tell a rejected token ([`FetchError::InvalidToken`]) apart
//! from every other transport problem.
//!
//! [`ReqwestDocumentClient`] is built on a
//! [`ClientWithMiddleware`](reqwest_middleware::ClientWithMiddleware), so
//! any middleware stack may sit underneath it.
//!
//! ```
//! use orcid_reqwest::ReqwestDocumentClient;
//! use reqwest::Client;
//! use reqwest_middleware::ClientBuilder;
//!
//! let client = ReqwestDocumentClient::new(ClientBuilder::new(Client::default()).build());
//! ```
//!
//! By default the bearer token is only presented over HTTPS. A request that
//! fails the predicate is never sent, since the resource requires a token
//! and an anonymous request would only be rejected. Predicates compose:
//!
//! ```
//! use orcid_reqwest::{ExactHostMatch, HttpsOnly, ReqwestDocumentClient};
//! use predicates::prelude::PredicateBooleanExt;
//! use reqwest::Client;
//! use reqwest_middleware::ClientBuilder;
//!
//! ReqwestDocumentClient::new(ClientBuilder::new(Client::default()).build())
//!     .with_predicate(HttpsOnly.and(ExactHostMatch::new("api.orcid.org")));
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use std::fmt;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use orcid_tokens::AccessTokenRef;
use predicates::{prelude::*, reflection};
use reqwest::{header, Request, Response, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;

mod document;

pub use document::XmlDocument;

const ACCEPT_XML: &str = "application/orcid+xml, application/xml;q=0.9, text/xml;q=0.8";

/// An error while fetching a document
#[derive(Debug, Error)]
pub enum FetchError {
    /// The resource server rejected the access token, usually because it expired
    #[error("resource server rejected the access token ({status})")]
    InvalidToken {
        /// The status returned with the rejection
        status: StatusCode,
        /// The `error_description` from the bearer challenge, if any
        description: Option<String>,
    },
    /// The access token was not presented because the request failed the
    /// client's predicate
    #[error("refusing to present access token: {predicate} did not hold for {url}")]
    TokenWithheld {
        /// The request URL
        url: Url,
        /// A description of the predicate that failed
        predicate: String,
    },
    /// The access token cannot be expressed as a header value
    #[error("access token contains bytes not valid in a header")]
    MalformedToken(#[source] header::InvalidHeaderValue),
    /// The resource server returned a non-success status
    #[error("resource server responded with {status}: {body}")]
    Status {
        /// The response status
        status: StatusCode,
        /// The response body
        body: String,
    },
    /// Unable to send the request to the resource server
    #[error("error sending request to resource server")]
    Request(#[source] reqwest_middleware::Error),
    /// Unable to read the response
    #[error("error reading response body")]
    BodyRead(#[source] reqwest::Error),
    /// The response body was not a well-formed XML document
    #[error("error decoding XML document")]
    Decode(#[from] xmltree::ParseError),
}

/// A client able to fetch XML documents using a bearer token
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Fetches the document at `url`, presenting `bearer` as the credential
    async fn get_document(
        &self,
        url: &Url,
        bearer: &AccessTokenRef,
    ) -> Result<XmlDocument, FetchError>;
}

/// A [`DocumentClient`] backed by `reqwest`
#[derive(Clone, Debug)]
pub struct ReqwestDocumentClient<P = HttpsOnly> {
    client: ClientWithMiddleware,
    predicate: P,
}

impl ReqwestDocumentClient<HttpsOnly> {
    /// Construct a new document client
    ///
    /// By default, the access token will only be presented if the request
    /// is being sent via HTTPS. To change this behavior, provide a
    /// custom predicate with [`with_predicate()`][Self::with_predicate()].
    pub fn new(client: ClientWithMiddleware) -> Self {
        Self {
            client,
            predicate: HttpsOnly,
        }
    }

    /// Replaces the default predicate with a custom predicate
    pub fn with_predicate<P>(self, predicate: P) -> ReqwestDocumentClient<P> {
        ReqwestDocumentClient {
            client: self.client,
            predicate,
        }
    }
}

fn bearer_header(token: &AccessTokenRef) -> Result<header::HeaderValue, FetchError> {
    let mut header_value = BytesMut::with_capacity(token.as_str().len() + 7);
    header_value.put_slice(b"Bearer ");
    header_value.put_slice(token.as_str().as_bytes());
    let mut value = header::HeaderValue::from_maybe_shared(header_value.freeze())
        .map_err(FetchError::MalformedToken)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Extracts the `error` and `error_description` parameters from a bearer
/// challenge such as `Bearer realm="orcid", error="invalid_token"`
fn bearer_challenge(value: &str) -> Option<(&str, Option<&str>)> {
    let params = value
        .trim_start()
        .strip_prefix("Bearer")
        .or_else(|| value.trim_start().strip_prefix("bearer"))?;

    let mut error = None;
    let mut description = None;
    for param in split_params(params) {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match name.trim() {
            "error" => error = Some(value),
            "error_description" => description = Some(value),
            _ => {}
        }
    }

    error.map(|e| (e, description))
}

/// Splits challenge parameters on commas that fall outside quoted strings
fn split_params(params: &str) -> impl Iterator<Item = &str> {
    let mut in_quotes = false;
    params
        .split(move |c: char| {
            if c == '"' {
                in_quotes = !in_quotes;
            }
            c == ',' && !in_quotes
        })
        .filter(|p| !p.trim().is_empty())
}

async fn classify(resp: Response) -> Result<XmlDocument, FetchError> {
    let status = resp.status();

    let challenge = resp
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_challenge)
        .map(|(error, description)| (error.to_owned(), description.map(str::to_owned)));

    match challenge {
        Some((error, description)) if error == "invalid_token" => {
            return Err(FetchError::InvalidToken {
                status,
                description,
            });
        }
        challenge if status == StatusCode::UNAUTHORIZED => {
            return Err(FetchError::InvalidToken {
                status,
                description: challenge.and_then(|(_, d)| d),
            });
        }
        _ => {}
    }

    if !status.is_success() {
        let body = resp.text().await.map_err(FetchError::BodyRead)?;
        return Err(FetchError::Status { status, body });
    }

    let body = resp.text().await.map_err(FetchError::BodyRead)?;
    Ok(XmlDocument::parse(body)?)
}

#[async_trait]
impl<P> DocumentClient for ReqwestDocumentClient<P>
where
    P: Predicate<Request> + Send + Sync + 'static,
{
    #[tracing::instrument(skip(self, url, bearer), fields(url = %url))]
    async fn get_document(
        &self,
        url: &Url,
        bearer: &AccessTokenRef,
    ) -> Result<XmlDocument, FetchError> {
        let mut req = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, ACCEPT_XML)
            .build()
            .map_err(|e| FetchError::Request(e.into()))?;

        if !self.predicate.eval(&req) {
            tracing::warn!(predicate = %self.predicate, "request does not satisfy token predicate");
            return Err(FetchError::TokenWithheld {
                url: url.clone(),
                predicate: self.predicate.to_string(),
            });
        }

        req.headers_mut()
            .insert(header::AUTHORIZATION, bearer_header(bearer)?);

        tracing::trace!("sending document request");
        let resp = self
            .client
            .execute(req)
            .await
            .map_err(FetchError::Request)?;

        tracing::debug!(
            response.status = resp.status().as_u16(),
            "received document response"
        );

        classify(resp).await
    }
}

/// Only present an access token if the request is being sent over HTTPS
#[derive(Clone, Copy, Debug)]
pub struct HttpsOnly;

impl Predicate<Request> for HttpsOnly {
    #[inline]
    fn eval(&self, req: &Request) -> bool {
        req.url().scheme() == "https"
    }

    fn find_case(&self, expected: bool, req: &Request) -> Option<reflection::Case> {
        let result = self.eval(req);
        if result != expected {
            Some(
                reflection::Case::new(Some(self), result).add_product(reflection::Product::new(
                    "scheme",
                    req.url().scheme().to_owned(),
                )),
            )
        } else {
            None
        }
    }
}

impl reflection::PredicateReflection for HttpsOnly {}
impl fmt::Display for HttpsOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scheme is https")
    }
}

/// Only present an access token if the request is being sent to the exact host specified
#[derive(Clone, Debug)]
pub struct ExactHostMatch {
    host: String,
}

impl ExactHostMatch {
    /// Construct a new predicate from a host string
    pub fn new<S>(host: S) -> Self
    where
        S: ToString,
    {
        Self {
            host: host.to_string(),
        }
    }
}

impl Predicate<Request> for ExactHostMatch {
    #[inline]
    fn eval(&self, req: &Request) -> bool {
        req.url().host_str() == Some(&self.host)
    }

    fn find_case(&self, expected: bool, req: &Request) -> Option<reflection::Case> {
        let result = self.eval(req);
        if result != expected {
            Some(
                reflection::Case::new(Some(self), result).add_product(reflection::Product::new(
                    "host",
                    req.url()
                        .host_str()
                        .unwrap_or("<value not valid utf-8>")
                        .to_owned(),
                )),
            )
        } else {
            None
        }
    }
}

impl reflection::PredicateReflection for ExactHostMatch {}
impl fmt::Display for ExactHostMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("host == ")?;
        f.write_str(&self.host)
    }
}
