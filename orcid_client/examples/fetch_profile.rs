use std::collections::BTreeMap;

use clap::Parser;
use orcid_client::{Error, OAuth2SecurityContext, OrcidConfig, OrcidService};
use orcid_tokens::{store::TokenStore, AccessToken, OAuth2AccessToken, OrcidId, Principal};

#[derive(Debug, Parser)]
struct Opts {
    /// The principal on whose behalf requests are made
    #[arg(short, long, env = "ORCID_PRINCIPAL", default_value = "local")]
    principal: Principal,

    /// An access token previously issued for the principal
    #[arg(short = 't', long, env = "ORCID_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<AccessToken>,

    /// The ORCID iD that issued the access token
    #[arg(long, env = "ORCID_TOKEN_OWNER")]
    token_owner: Option<String>,

    /// The profile to fetch; defaults to the token owner
    #[arg(short, long)]
    orcid: Option<String>,

    /// Search terms as `field=value`; when given, a search is run instead
    #[arg(short, long = "term", value_parser = parse_term)]
    terms: Vec<(String, String)>,
}

fn parse_term(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected field=value, got {s:?}"))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let config = OrcidConfig::from_env()?;
    let opts = Opts::parse();

    let client = config.document_client()?;
    let service = OrcidService::new(
        config.endpoints.clone(),
        config.resource.clone(),
        orcid_tokens::store::InMemoryTokenStore::new(),
        client,
    );

    if let Some(access_token) = opts.access_token {
        let mut token = OAuth2AccessToken::bearer(access_token);
        if let Some(owner) = opts.token_owner {
            token = token.with_orcid(OrcidId::new(owner)?, None);
        }
        service
            .store()
            .store(&opts.principal, &service.resource().id, token)
            .await?;
    }

    let mut context = OAuth2SecurityContext::new(opts.principal);

    let result = if opts.terms.is_empty() {
        let orcid = opts.orcid.map(OrcidId::new).transpose()?;
        service.fetch_profile(&mut context, orcid.as_deref()).await
    } else {
        let terms: BTreeMap<_, _> = opts.terms.into_iter().collect();
        service.search_terms(&mut context, &terms).await
    };

    match result {
        Ok(document) => {
            println!("{}", document.text());
            Ok(())
        }
        Err(Error::AuthorizationRequired(resource)) => {
            tracing::error!(
                resource = %resource.id,
                client_id = %resource.client_id,
                authorize = %resource.user_authorization_uri,
                "authorization required; obtain a new access token and try again"
            );
            std::process::exit(2);
        }
        Err(error) => Err(error.into()),
    }
}
