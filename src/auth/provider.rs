//!
//! # Identity Provider Client
//!
//! Authentication is delegated to an external OpenID Connect provider. At
//! startup [`initialize`] fetches the provider's discovery document and its
//! signing keys, producing two immutable values that live for the rest of
//! the process:
//!
//! - a [`TokenValidator`](crate::auth::TokenValidator) holding the issuer
//!   and key material every request validates against
//! - a [`Provider`] holding the endpoints the authorization routes forward
//!   to
//!
//! Key rotation at the provider requires a restart; nothing here refreshes
//! after startup.

use crate::auth::token::KeySet;
use crate::auth::{local_scope, TokenValidator, USER_SCOPE};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::authorization::{
    AuthorizationCodeGrantForm, AuthorizationUrlData, ClientCredentialsForm,
    RefreshTokenGrantForm, SignOutData, TokenData,
};
use crate::models::user::Profile;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The subset of the provider's discovery document the API relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    /// Expected `iss` claim of every accepted token.
    pub issuer: String,
    /// Where the provider publishes its signing keys.
    pub jwks_uri: String,
    /// Where users are sent to sign in.
    pub authorization_endpoint: String,
    /// Where grants are redeemed for tokens.
    pub token_endpoint: String,
    /// Where users are sent to sign out.
    pub end_session_endpoint: String,
    /// Where the signed-in user's profile is fetched from.
    pub userinfo_endpoint: String,
}

/// The provider could not be brought up at startup.
#[derive(Debug)]
pub enum AuthSetupError {
    /// The discovery document or the key set could not be fetched or read.
    Fetch(reqwest::Error),
    /// An endpoint answered with a non-success status.
    Status { url: String, status: StatusCode },
}

impl fmt::Display for AuthSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSetupError::Fetch(error) => {
                write!(f, "Unable to reach the identity provider: {}", error)
            }
            AuthSetupError::Status { url, status } => {
                write!(f, "The identity provider answered {} for {}", status, url)
            }
        }
    }
}

impl std::error::Error for AuthSetupError {}

impl From<reqwest::Error> for AuthSetupError {
    fn from(error: reqwest::Error) -> Self {
        AuthSetupError::Fetch(error)
    }
}

/// Fetches the discovery document and signing keys of the provider named
/// by the configuration.
///
/// The issuer accepted by the returned validator is the one the provider
/// declares about itself, not the configured authority string.
pub async fn initialize(config: &Config) -> Result<(TokenValidator, Provider), AuthSetupError> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let discovery_url = format!(
        "{}/v2.0/.well-known/openid-configuration",
        config.authority.trim_end_matches('/')
    );
    let metadata: ProviderMetadata = fetch(&client, &discovery_url).await?;
    let key_set: KeySet = fetch(&client, &metadata.jwks_uri).await?;
    log::info!(
        "Accepting tokens issued by {} under {} signing keys",
        metadata.issuer,
        key_set.keys.len()
    );

    let validator = TokenValidator::new(
        metadata.issuer.clone(),
        config.audience.clone(),
        key_set.keys,
    );
    let provider = Provider::new(metadata, config.audience.clone(), client);
    Ok((validator, provider))
}

async fn fetch<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, AuthSetupError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(AuthSetupError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }
    Ok(response.json().await?)
}

/// Client for the provider endpoints the API forwards requests to.
#[derive(Debug, Clone)]
pub struct Provider {
    metadata: ProviderMetadata,
    audience: String,
    client: reqwest::Client,
}

impl Provider {
    pub fn new(metadata: ProviderMetadata, audience: String, client: reqwest::Client) -> Self {
        Provider {
            metadata,
            audience,
            client,
        }
    }

    /// The discovery document this provider was initialized from.
    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Builds the URL a user is sent to in order to sign in, along with the
    /// proof-key verifier and state the client must hold on to.
    ///
    /// Every call issues a fresh verifier and state; the challenge embedded
    /// in the URL is the S256 digest of the verifier.
    pub fn authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationUrlData, ApiError> {
        let code_verifier = generate_code_verifier();
        let state = Uuid::new_v4().simple().to_string();

        let mut url = parse_endpoint(&self.metadata.authorization_endpoint)?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.user_scopes())
            .append_pair("state", &state)
            .append_pair("code_challenge", &code_challenge(&code_verifier))
            .append_pair("code_challenge_method", "S256");

        Ok(AuthorizationUrlData {
            authorization_url: url.into(),
            code_verifier,
            state,
        })
    }

    /// Redeems an authorization code for tokens.
    pub async fn redeem_authorization_code(
        &self,
        form: &AuthorizationCodeGrantForm,
    ) -> Result<TokenData, ApiError> {
        let scopes = self.user_scopes();
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", form.client_id.as_str()),
            ("client_secret", form.client_secret.as_str()),
            ("redirect_uri", form.redirect_uri.as_str()),
            ("code", form.code.as_str()),
            ("code_verifier", form.code_verifier.as_str()),
            ("scope", scopes.as_str()),
        ];
        self.redeem(&params).await
    }

    /// Redeems a refresh token for a fresh set of tokens.
    pub async fn redeem_refresh_token(
        &self,
        form: &RefreshTokenGrantForm,
    ) -> Result<TokenData, ApiError> {
        let scopes = self.user_scopes();
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", form.client_id.as_str()),
            ("client_secret", form.client_secret.as_str()),
            ("refresh_token", form.refresh_token.as_str()),
            ("scope", scopes.as_str()),
        ];
        self.redeem(&params).await
    }

    /// Obtains an application token for a daemon client.
    pub async fn client_credentials_grant(
        &self,
        form: &ClientCredentialsForm,
    ) -> Result<TokenData, ApiError> {
        let scope = local_scope(&self.audience, ".default");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", form.client_id.as_str()),
            ("client_secret", form.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];
        self.redeem(&params).await
    }

    /// Builds the URL a user is sent to in order to sign out.
    pub fn sign_out_url(
        &self,
        post_logout_redirect_uri: Option<&str>,
    ) -> Result<SignOutData, ApiError> {
        let mut url = parse_endpoint(&self.metadata.end_session_endpoint)?;
        if let Some(redirect_uri) = post_logout_redirect_uri {
            url.query_pairs_mut()
                .append_pair("post_logout_redirect_uri", redirect_uri);
        }
        Ok(SignOutData {
            sign_out_url: url.into(),
        })
    }

    /// Fetches the signed-in user's profile from the provider, presenting
    /// the caller's own bearer token.
    ///
    /// A 401 or 403 from the provider passes through with the matching
    /// contract detail; any other failure is logged and collapses into the
    /// opaque 500.
    pub async fn userinfo(&self, bearer: &str) -> Result<Profile, ApiError> {
        let response = self
            .client
            .get(&self.metadata.userinfo_endpoint)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|error| {
                log::error!("Userinfo request failed: {}", error);
                ApiError::internal()
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ApiError::unauthorized()),
            StatusCode::FORBIDDEN => Err(ApiError::forbidden()),
            status if status.is_success() => {
                let claims: UserInfoClaims = response.json().await.map_err(|error| {
                    log::error!("Userinfo response could not be read: {}", error);
                    ApiError::internal()
                })?;
                Ok(claims.into())
            }
            status => {
                log::error!("Userinfo request answered status {}", status);
                Err(ApiError::internal())
            }
        }
    }

    async fn redeem(&self, params: &[(&str, &str)]) -> Result<TokenData, ApiError> {
        let response = self
            .client
            .post(&self.metadata.token_endpoint)
            .form(params)
            .send()
            .await
            .map_err(|error| {
                log::error!("Token endpoint request failed: {}", error);
                ApiError::internal()
            })?;

        // Grant rejections arrive as non-2xx statuses with a readable error
        // body, so the body is parsed regardless of status.
        let response: TokenEndpointResponse = response.json().await.map_err(|error| {
            log::error!("Token endpoint response could not be read: {}", error);
            ApiError::internal()
        })?;
        token_data(response)
    }

    /// Scopes requested on behalf of a signing-in user: the API's own
    /// delegated scope plus the standard OpenID Connect ones.
    fn user_scopes(&self) -> String {
        format!(
            "{} offline_access openid profile",
            local_scope(&self.audience, USER_SCOPE)
        )
    }
}

/// Raw answer of the provider's token endpoint; either tokens or an error.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    error: Option<String>,
    error_description: Option<String>,
    token_type: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    refresh_token: Option<String>,
}

fn token_data(response: TokenEndpointResponse) -> Result<TokenData, ApiError> {
    if let Some(error_code) = response.error {
        let description = response
            .error_description
            .as_deref()
            .unwrap_or("The identity provider rejected the grant.");
        return Err(ApiError::upstream(
            &error_code,
            &clean_error_description(description),
        ));
    }
    Ok(TokenData {
        token_type: response.token_type,
        access_token: response.access_token,
        access_token_expiration: response.expires_in,
        scope: response.scope,
        refresh_token: response.refresh_token,
    })
}

/// Reduces a provider error description to something a caller can show:
/// only the first line is kept, and a leading machine error-code prefix
/// (`"AADSTS70008: "` and the like) is dropped.
fn clean_error_description(description: &str) -> String {
    let first_line = description.split("\r\n").next().unwrap_or(description);
    match first_line.split_once(": ") {
        Some((_, message)) => message.to_string(),
        None => first_line.to_string(),
    }
}

/// Standard userinfo claims, plus the provider-specific job title.
#[derive(Debug, Deserialize)]
struct UserInfoClaims {
    sub: String,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    #[serde(alias = "jobTitle")]
    job_title: Option<String>,
}

impl From<UserInfoClaims> for Profile {
    fn from(claims: UserInfoClaims) -> Self {
        Profile {
            identifier: claims.sub,
            first_name: claims.given_name,
            last_name: claims.family_name,
            email: claims.email,
            job_title: claims.job_title,
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ApiError> {
    Url::parse(endpoint).map_err(|error| {
        log::error!("The provider endpoint {} is not a valid URL: {}", endpoint, error);
        ApiError::internal()
    })
}

/// A verifier of 64 characters from the unreserved set, inside the 43 to
/// 128 character bounds RFC 7636 requires.
fn generate_code_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
