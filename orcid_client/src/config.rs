//! Configuration

use std::time::Duration;

use orcid_reqwest::{ExactHostMatch, HttpsOnly, ReqwestDocumentClient};
use orcid_tokens::{ClientId, ResourceDetails, ResourceId, ScopeToken};
use predicates::{prelude::*, BoxPredicate};
use reqwest::Request;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// The placeholder in a profile URL template that is replaced with an ORCID iD
pub const ORCID_PLACEHOLDER: &str = "{orcid}";

const DEFAULT_PROFILE_URL_TEMPLATE: &str =
    "https://api.sandbox.orcid.org/v1.2/{orcid}/orcid-profile";
const DEFAULT_SEARCH_URL: &str = "https://api.sandbox.orcid.org/v1.2/search/orcid-bio/";
const DEFAULT_AUTHORIZE_URL: &str = "https://sandbox.orcid.org/oauth/authorize";
const DEFAULT_TOKEN_URL: &str = "https://api.sandbox.orcid.org/oauth/token";
const DEFAULT_RESOURCE_ID: &str = "orcid";
const DEFAULT_SCOPE: &str = "/orcid-profile/read-limited";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// An error in the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was not provided
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    /// A setting could not be understood
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// The ORCID API endpoints used by the service
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "EndpointsDto")]
pub struct Endpoints {
    pub(crate) profile_url_template: String,
    pub(crate) search_url: Url,
}

#[derive(Deserialize)]
struct EndpointsDto {
    profile_url_template: String,
    search_url: Url,
}

impl TryFrom<EndpointsDto> for Endpoints {
    type Error = ConfigError;

    fn try_from(dto: EndpointsDto) -> Result<Self, Self::Error> {
        Self::new(dto.profile_url_template, dto.search_url)
    }
}

impl Endpoints {
    /// Constructs the endpoints
    ///
    /// The profile URL template must contain the `{orcid}` placeholder and
    /// form a valid URL once an ORCID iD is substituted.
    pub fn new(
        profile_url_template: impl Into<String>,
        search_url: Url,
    ) -> Result<Self, ConfigError> {
        let profile_url_template = profile_url_template.into();
        if !profile_url_template.contains(ORCID_PLACEHOLDER) {
            return Err(ConfigError::Invalid("ORCID_PROFILE_URL_TEMPLATE"));
        }

        Url::parse(&profile_url_template.replace(ORCID_PLACEHOLDER, "0000-0002-1825-0097"))
            .map_err(|_| ConfigError::Invalid("ORCID_PROFILE_URL_TEMPLATE"))?;

        Ok(Self {
            profile_url_template,
            search_url,
        })
    }

    /// The profile URL, containing an `{orcid}` placeholder
    #[inline]
    pub fn profile_url_template(&self) -> &str {
        &self.profile_url_template
    }

    /// The search URL, to which a `q` parameter is appended
    #[inline]
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_https_only() -> bool {
    true
}

/// Settings for an [`OrcidService`][crate::OrcidService]
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct OrcidConfig {
    /// The API endpoints
    #[serde(flatten)]
    pub endpoints: Endpoints,
    /// The protected resource tokens are held for
    pub resource: ResourceDetails,
    /// The timeout applied to each request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Whether access tokens may only be presented over HTTPS
    #[serde(default = "default_https_only")]
    pub https_only: bool,
    /// When set, access tokens are only presented to this host
    #[serde(default)]
    pub api_host: Option<String>,
}

impl OrcidConfig {
    /// Reads the configuration from the environment, after loading any
    /// `.env` file present
    ///
    /// | variable                     | default                                   |
    /// |------------------------------|-------------------------------------------|
    /// | `ORCID_CLIENT_ID`            | required                                  |
    /// | `ORCID_PROFILE_URL_TEMPLATE` | sandbox v1.2 `orcid-profile`              |
    /// | `ORCID_SEARCH_URL`           | sandbox v1.2 `search/orcid-bio/`          |
    /// | `ORCID_RESOURCE_ID`          | `orcid`                                   |
    /// | `ORCID_AUTHORIZE_URL`        | sandbox `oauth/authorize`                 |
    /// | `ORCID_TOKEN_URL`            | sandbox `oauth/token`                     |
    /// | `ORCID_SCOPE`                | `/orcid-profile/read-limited`             |
    /// | `ORCID_REQUEST_TIMEOUT_SECS` | `30`                                      |
    /// | `ORCID_HTTPS_ONLY`           | `true`                                    |
    /// | `ORCID_API_HOST`             | any host                                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration using `lookup` to resolve each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let url = |key: &'static str, default: &str| {
            Url::parse(&var(key, default)).map_err(|_| ConfigError::Invalid(key))
        };

        let endpoints = Endpoints::new(
            var("ORCID_PROFILE_URL_TEMPLATE", DEFAULT_PROFILE_URL_TEMPLATE),
            url("ORCID_SEARCH_URL", DEFAULT_SEARCH_URL)?,
        )?;

        let client_id = lookup("ORCID_CLIENT_ID")
            .map(ClientId::new)
            .ok_or(ConfigError::Missing("ORCID_CLIENT_ID"))?;

        let scope = var("ORCID_SCOPE", DEFAULT_SCOPE)
            .split_ascii_whitespace()
            .map(|s| ScopeToken::new(s.to_owned()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::Invalid("ORCID_SCOPE"))?;

        let resource = ResourceDetails {
            id: ResourceId::new(var("ORCID_RESOURCE_ID", DEFAULT_RESOURCE_ID)),
            client_id,
            user_authorization_uri: url("ORCID_AUTHORIZE_URL", DEFAULT_AUTHORIZE_URL)?,
            access_token_uri: url("ORCID_TOKEN_URL", DEFAULT_TOKEN_URL)?,
            scope,
        };

        let request_timeout_secs = match lookup("ORCID_REQUEST_TIMEOUT_SECS") {
            Some(s) => s
                .parse()
                .map_err(|_| ConfigError::Invalid("ORCID_REQUEST_TIMEOUT_SECS"))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let https_only = match lookup("ORCID_HTTPS_ONLY").as_deref() {
            None => true,
            Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(_) => return Err(ConfigError::Invalid("ORCID_HTTPS_ONLY")),
        };

        let api_host = lookup("ORCID_API_HOST").filter(|h| !h.is_empty());

        Ok(Self {
            endpoints,
            resource,
            request_timeout_secs,
            https_only,
            api_host,
        })
    }

    /// The timeout applied to each request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds a document client honoring the timeout, HTTPS, and host
    /// settings
    pub fn document_client(
        &self,
    ) -> Result<ReqwestDocumentClient<BoxPredicate<Request>>, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout())
            .build()?;

        let client = ReqwestDocumentClient::new(reqwest_middleware::ClientBuilder::new(client).build());

        Ok(client.with_predicate(self.token_predicate()))
    }

    /// The predicate a request must satisfy for the access token to be
    /// presented
    pub fn token_predicate(&self) -> BoxPredicate<Request> {
        let predicate = if self.https_only {
            HttpsOnly.boxed()
        } else {
            predicate::always().boxed()
        };

        match &self.api_host {
            Some(host) => predicate.and(ExactHostMatch::new(host)).boxed(),
            None => predicate,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_client_id_is_set() {
        let config =
            OrcidConfig::from_lookup(lookup(&[("ORCID_CLIENT_ID", "APP-5XXXXXXXXXXXXXXX")]))
                .unwrap();

        assert_eq!(
            config.endpoints.profile_url_template(),
            DEFAULT_PROFILE_URL_TEMPLATE
        );
        assert_eq!(config.resource.id.as_str(), "orcid");
        assert_eq!(config.resource.scope.len(), 1);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.https_only);
    }

    #[test]
    fn client_id_is_required() {
        let err = OrcidConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ORCID_CLIENT_ID"));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = OrcidConfig::from_lookup(lookup(&[
            ("ORCID_CLIENT_ID", "APP-5XXXXXXXXXXXXXXX"),
            (
                "ORCID_PROFILE_URL_TEMPLATE",
                "https://api.orcid.org/v1.2/orcid-profile",
            ),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("ORCID_PROFILE_URL_TEMPLATE"));
    }

    #[test]
    fn overrides_are_read() {
        let config = OrcidConfig::from_lookup(lookup(&[
            ("ORCID_CLIENT_ID", "APP-5XXXXXXXXXXXXXXX"),
            ("ORCID_SEARCH_URL", "http://localhost:8080/search/"),
            ("ORCID_SCOPE", "/read-limited /activities/update"),
            ("ORCID_REQUEST_TIMEOUT_SECS", "5"),
            ("ORCID_HTTPS_ONLY", "false"),
            ("ORCID_API_HOST", "localhost"),
        ]))
        .unwrap();

        assert_eq!(
            config.endpoints.search_url().as_str(),
            "http://localhost:8080/search/"
        );
        assert_eq!(config.resource.scope.len(), 2);
        assert_eq!(config.request_timeout_secs, 5);
        assert!(!config.https_only);
        assert_eq!(config.api_host.as_deref(), Some("localhost"));
    }

    #[test]
    fn unparseable_timeout_is_rejected() {
        let err = OrcidConfig::from_lookup(lookup(&[
            ("ORCID_CLIENT_ID", "APP-5XXXXXXXXXXXXXXX"),
            ("ORCID_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("ORCID_REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn deserializes_from_json() {
        let config: OrcidConfig = serde_json::from_value(serde_json::json!({
            "profile_url_template": "https://pub.orcid.org/v1.2/{orcid}/orcid-profile",
            "search_url": "https://pub.orcid.org/v1.2/search/orcid-bio/",
            "resource": {
                "id": "orcid-public",
                "client_id": "APP-5XXXXXXXXXXXXXXX",
                "user_authorization_uri": "https://orcid.org/oauth/authorize",
                "access_token_uri": "https://pub.orcid.org/oauth/token",
                "scope": ["/read-public"]
            }
        }))
        .unwrap();

        assert_eq!(
            config.endpoints.profile_url_template(),
            "https://pub.orcid.org/v1.2/{orcid}/orcid-profile"
        );
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.https_only);
        assert_eq!(config.api_host, None);
    }

    #[test]
    fn deserialization_rejects_template_without_placeholder() {
        let result: Result<OrcidConfig, _> = serde_json::from_value(serde_json::json!({
            "profile_url_template": "https://pub.orcid.org/v1.2/orcid-profile",
            "search_url": "https://pub.orcid.org/v1.2/search/orcid-bio/",
            "resource": {
                "id": "orcid-public",
                "client_id": "APP-5XXXXXXXXXXXXXXX",
                "user_authorization_uri": "https://orcid.org/oauth/authorize",
                "access_token_uri": "https://pub.orcid.org/oauth/token"
            }
        }));

        assert!(result.is_err());
    }

    mod endpoints {
        use super::*;

        fn search_url() -> Url {
            Url::parse(DEFAULT_SEARCH_URL).unwrap()
        }

        #[test]
        fn accepts_template_with_placeholder() {
            let endpoints = Endpoints::new(DEFAULT_PROFILE_URL_TEMPLATE, search_url()).unwrap();
            assert_eq!(endpoints.profile_url_template(), DEFAULT_PROFILE_URL_TEMPLATE);
            assert_eq!(endpoints.search_url(), &search_url());
        }

        #[test]
        fn rejects_template_without_placeholder() {
            let err = Endpoints::new("https://api.orcid.org/v1.2/orcid-profile", search_url())
                .unwrap_err();
            assert_eq!(err, ConfigError::Invalid("ORCID_PROFILE_URL_TEMPLATE"));
        }

        #[test]
        fn rejects_template_that_is_not_a_url() {
            let err = Endpoints::new("not a url {orcid}", search_url()).unwrap_err();
            assert_eq!(err, ConfigError::Invalid("ORCID_PROFILE_URL_TEMPLATE"));
        }
    }

    mod token_predicate {
        use super::*;

        fn config(vars: &[(&str, &str)]) -> OrcidConfig {
            let mut all = vec![("ORCID_CLIENT_ID", "APP-5XXXXXXXXXXXXXXX")];
            all.extend_from_slice(vars);
            OrcidConfig::from_lookup(lookup(&all)).unwrap()
        }

        fn get(url: &str) -> Request {
            Request::new(reqwest::Method::GET, url.parse().unwrap())
        }

        #[test]
        fn defaults_to_https_on_any_host() {
            let predicate = config(&[]).token_predicate();

            assert!(predicate.eval(&get("https://api.orcid.org/v1.2/search/orcid-bio/")));
            assert!(predicate.eval(&get("https://sandbox.orcid.org/oauth/authorize")));
            assert!(!predicate.eval(&get("http://api.orcid.org/v1.2/search/orcid-bio/")));
        }

        #[test]
        fn api_host_restricts_token_to_that_host() {
            let predicate = config(&[("ORCID_API_HOST", "api.sandbox.orcid.org")]).token_predicate();

            assert!(predicate.eval(&get("https://api.sandbox.orcid.org/v1.2/search/orcid-bio/")));
            assert!(!predicate.eval(&get("https://api.orcid.org/v1.2/search/orcid-bio/")));
            assert!(!predicate.eval(&get("http://api.sandbox.orcid.org/v1.2/search/orcid-bio/")));
        }

        #[test]
        fn api_host_applies_without_https() {
            let predicate = config(&[
                ("ORCID_HTTPS_ONLY", "false"),
                ("ORCID_API_HOST", "localhost"),
            ])
            .token_predicate();

            assert!(predicate.eval(&get("http://localhost:8080/search/")));
            assert!(!predicate.eval(&get("http://127.0.0.1:8080/search/")));
        }
    }

    #[test]
    fn document_client_builds() {
        let config =
            OrcidConfig::from_lookup(lookup(&[("ORCID_CLIENT_ID", "APP-5XXXXXXXXXXXXXXX")]))
                .unwrap();
        assert!(config.document_client().is_ok());
    }
}
