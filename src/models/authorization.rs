//!
//! # Authorization Models
//!
//! Request and response shapes for the delegated-authorization endpoints.
//! The API holds no credentials of its own: every request carries the
//! client's identifier and, for the grant endpoints, its secret, and the
//! API forwards them to the identity provider.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query parameters for building an authorization URL.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AuthorizationUrlQuery {
    #[validate(length(min = 1))]
    pub client_id: String,

    /// Where the provider sends the user back to after signing in.
    #[validate(url)]
    pub redirect_uri: String,
}

/// Payload for redeeming an authorization code.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AuthorizationCodeGrantForm {
    #[validate(length(min = 1))]
    pub client_id: String,

    #[validate(length(min = 1))]
    pub client_secret: String,

    /// Must match the redirect URI the authorization URL was built with.
    #[validate(url)]
    pub redirect_uri: String,

    /// The authorization code returned by the provider.
    #[validate(length(min = 1))]
    pub code: String,

    /// The verifier whose challenge was embedded in the authorization URL.
    #[validate(length(min = 1))]
    pub code_verifier: String,
}

/// Payload for redeeming a refresh token.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RefreshTokenGrantForm {
    #[validate(length(min = 1))]
    pub client_id: String,

    #[validate(length(min = 1))]
    pub client_secret: String,

    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Payload for the client-credentials grant used by daemon clients.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ClientCredentialsForm {
    #[validate(length(min = 1))]
    pub client_id: String,

    #[validate(length(min = 1))]
    pub client_secret: String,
}

/// Query parameters for building a sign-out URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignOutQuery {
    /// Where the provider sends the user back to after signing out.
    pub post_logout_redirect_uri: Option<String>,
}

/// An authorization URL together with the secrets the client must hold on
/// to for the rest of the flow.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizationUrlData {
    pub authorization_url: String,
    /// Proof-key verifier to present when redeeming the code.
    pub code_verifier: String,
    /// Opaque value to compare against the provider's callback.
    pub state: String,
}

/// Tokens issued by the provider, reshaped to this API's contract.
///
/// A client-credentials response carries neither a scope nor a refresh
/// token; absent fields are omitted rather than serialized as null.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenData {
    pub token_type: Option<String>,
    pub access_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub access_token_expiration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignOutData {
    pub sign_out_url: String,
}
