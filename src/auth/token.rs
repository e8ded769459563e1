//!
//! # Bearer Token Validation
//!
//! Decodes and verifies access tokens issued by the identity provider.
//!
//! The [`TokenValidator`] holds the issuer and the RSA signing keys fetched at
//! startup (see [`crate::auth::provider::initialize`]) and is immutable from
//! then on, so request handlers share it read-only. Two authorization entry
//! points sit on top of the raw [`TokenValidator::decode`]:
//! [`TokenValidator::get_user_identifier`] for endpoints acting on behalf of a
//! signed-in user, and [`TokenValidator::validate_application_token`] for
//! endpoints open to trusted applications.
//!
//! Authentication failures (bad signature, bad claims) map to 401 with the
//! distinguished `expired_token` code for expiry; authorization failures
//! (valid token, insufficient scope/role) map to 403.

use crate::auth::{APPLICATION_ROLE, USER_SCOPE};
use crate::error::ApiError;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Claims carried by provider-issued access tokens.
///
/// `exp`, `iat` and `nbf` are required: a token missing any of them is
/// rejected even when the values that are present would validate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier of the user or application the token was issued to.
    pub sub: String,
    pub aud: String,
    pub iss: String,
    /// Expiration timestamp (seconds since epoch).
    pub exp: u64,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: u64,
    /// Not-before timestamp (seconds since epoch).
    pub nbf: u64,
    /// Space-separated delegated scopes; absent on application tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scp: Option<String>,
    /// Application roles; absent unless assigned administratively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl Claims {
    /// The delegated scopes as individual strings.
    pub fn scopes(&self) -> Vec<&str> {
        self.scp
            .as_deref()
            .map(|scp| scp.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().contains(&scope)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .as_deref()
            .map(|roles| roles.iter().any(|candidate| candidate == role))
            .unwrap_or(false)
    }
}

/// One signing key from the provider's JWKS document. Only RSA parameters are
/// kept; the provider publishes nothing else for access-token signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningKey {
    /// Key identifier matched against the `kid` of incoming token headers.
    pub kid: String,
    pub kty: String,
    /// RSA modulus, base64url-encoded.
    pub n: String,
    /// RSA public exponent, base64url-encoded.
    pub e: String,
}

/// The provider's published key set, as served by the JWKS endpoint.
#[derive(Debug, Deserialize)]
pub struct KeySet {
    pub keys: Vec<SigningKey>,
}

/// Per-call switches for [`TokenValidator::decode`].
///
/// Both verifications default to on. They are only relaxed at trust
/// boundaries where a token was already validated upstream.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub verify_issuer: bool,
    pub verify_signature: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            verify_issuer: true,
            verify_signature: true,
        }
    }
}

/// Validates provider-issued bearer tokens.
///
/// Constructed once at startup from the discovery document and the JWKS key
/// set; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    issuer: String,
    audience: String,
    keys: HashMap<String, SigningKey>,
}

impl TokenValidator {
    pub fn new(issuer: String, audience: String, keys: Vec<SigningKey>) -> Self {
        let keys = keys.into_iter().map(|key| (key.kid.clone(), key)).collect();
        TokenValidator {
            issuer,
            audience,
            keys,
        }
    }

    /// Decodes an access token and verifies its signature and claims.
    ///
    /// The signing key is located by the `kid` of the token header; an
    /// unknown or absent `kid` fails closed with the generic invalid-token
    /// error. Audience, expiry and not-before are always verified, the
    /// issuer and the signature according to `options`. `exp`, `iat` and
    /// `nbf` must be present, not merely valid when present.
    ///
    /// # Returns
    /// The decoded [`Claims`] if the token is valid.
    /// `ApiError` 401 with code `expired_token` when the expiry claim is in
    /// the past, the generic `invalid_token` 401 for every other
    /// signature/claim failure, and an opaque 500 when the stored key
    /// material cannot be parsed (logged server-side).
    pub fn decode(&self, token: &str, options: DecodeOptions) -> Result<Claims, ApiError> {
        let header = decode_header(token)?;

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iat", "nbf"]);
        validation.validate_nbf = true;
        if options.verify_issuer {
            validation.set_issuer(&[&self.issuer]);
        }

        let key = if options.verify_signature {
            let signing_key = header
                .kid
                .as_deref()
                .and_then(|kid| self.keys.get(kid))
                .ok_or_else(ApiError::unauthorized)?;
            DecodingKey::from_rsa_components(&signing_key.n, &signing_key.e).map_err(|error| {
                log::error!(
                    "Failed to build a decoding key from the stored material of key '{}': {}",
                    signing_key.kid,
                    error
                );
                ApiError::internal()
            })?
        } else {
            validation.insecure_disable_signature_validation();
            DecodingKey::from_secret(&[])
        };

        let data = decode::<Claims>(token, &key, &validation)?;
        Ok(data.claims)
    }

    /// Validates a token obtained on behalf of a signed-in user and returns
    /// the user's subject identifier.
    ///
    /// The token must carry the delegated-user scope. When `accepted_roles`
    /// is non-empty, the token's roles must additionally intersect it.
    ///
    /// # Returns
    /// The subject identifier, or 401 when the token is not authentic and
    /// 403 when it is authentic but insufficiently privileged.
    pub fn get_user_identifier(
        &self,
        token: &str,
        accepted_roles: &[&str],
    ) -> Result<String, ApiError> {
        let claims = self.decode(token, DecodeOptions::default())?;
        Self::authorize_user(&claims, accepted_roles)?;
        Ok(claims.sub)
    }

    /// Validates a token presented by a trusted application.
    ///
    /// Tokens carrying any delegated scope pass (a signed-in user is at
    /// least as trusted); tokens without scopes must carry the application
    /// role. Fails with 403 otherwise.
    pub fn validate_application_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.decode(token, DecodeOptions::default())?;
        Self::authorize_application(&claims)?;
        Ok(claims)
    }

    fn authorize_user(claims: &Claims, accepted_roles: &[&str]) -> Result<(), ApiError> {
        if !claims.has_scope(USER_SCOPE) {
            return Err(ApiError::forbidden());
        }
        if !accepted_roles.is_empty() && !accepted_roles.iter().any(|role| claims.has_role(role)) {
            return Err(ApiError::forbidden());
        }
        Ok(())
    }

    fn authorize_application(claims: &Claims) -> Result<(), ApiError> {
        if claims.scp.is_none() && !claims.has_role(APPLICATION_ROLE) {
            return Err(ApiError::forbidden());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::error::ResponseError;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const ISSUER: &str = "https://login.example.com/tenant/v2.0";
    const AUDIENCE: &str = "11111111-2222-3333-4444-555555555555";

    /// Skips signature verification so claim checks can be exercised with
    /// locally crafted tokens.
    const CLAIMS_ONLY: DecodeOptions = DecodeOptions {
        verify_issuer: true,
        verify_signature: false,
    };

    fn validator() -> TokenValidator {
        TokenValidator::new(ISSUER.to_string(), AUDIENCE.to_string(), Vec::new())
    }

    fn base_claims() -> Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "sub": "user-123",
            "aud": AUDIENCE,
            "iss": ISSUER,
            "exp": now + 3600,
            "iat": now - 60,
            "nbf": now - 60,
        })
    }

    fn encode_token(claims: &Value, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &EncodingKey::from_secret(b"unit-test-secret")).unwrap()
    }

    fn claims_with(scp: Option<&str>, roles: Option<&[&str]>) -> Claims {
        let now = chrono::Utc::now().timestamp() as u64;
        Claims {
            sub: "user-123".to_string(),
            aud: AUDIENCE.to_string(),
            iss: ISSUER.to_string(),
            exp: now + 3600,
            iat: now,
            nbf: now,
            scp: scp.map(str::to_string),
            roles: roles.map(|roles| roles.iter().map(|role| role.to_string()).collect()),
        }
    }

    #[test]
    fn test_decode_accepts_a_well_formed_token() {
        let token = encode_token(&base_claims(), None);
        let claims = validator().decode(&token, CLAIMS_ONLY).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.iss, ISSUER);
        assert!(claims.scp.is_none());
    }

    #[test]
    fn test_expired_token_yields_the_distinguished_error() {
        let mut claims = base_claims();
        claims["exp"] = json!(chrono::Utc::now().timestamp() - 3600);
        let token = encode_token(&claims, None);

        let error = validator().decode(&token, CLAIMS_ONLY).unwrap_err();
        assert_eq!(error.detail().error_code, "expired_token");
        assert_eq!(error.status_code(), 401);
    }

    #[test]
    fn test_not_yet_valid_token_is_a_generic_401() {
        let mut claims = base_claims();
        claims["nbf"] = json!(chrono::Utc::now().timestamp() + 3600);
        let token = encode_token(&claims, None);

        let error = validator().decode(&token, CLAIMS_ONLY).unwrap_err();
        assert_eq!(error.detail().error_code, "invalid_token");
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let mut claims = base_claims();
        claims["aud"] = json!("another-api");
        let token = encode_token(&claims, None);

        let error = validator().decode(&token, CLAIMS_ONLY).unwrap_err();
        assert_eq!(error.detail().error_code, "invalid_token");
    }

    #[test]
    fn test_issuer_verification_can_be_relaxed() {
        let mut claims = base_claims();
        claims["iss"] = json!("https://login.elsewhere.example/v2.0");
        let token = encode_token(&claims, None);

        let error = validator().decode(&token, CLAIMS_ONLY).unwrap_err();
        assert_eq!(error.detail().error_code, "invalid_token");

        let options = DecodeOptions {
            verify_issuer: false,
            verify_signature: false,
        };
        assert!(validator().decode(&token, options).is_ok());
    }

    #[test]
    fn test_missing_issued_at_claim_is_rejected() {
        let mut claims = base_claims();
        claims.as_object_mut().unwrap().remove("iat");
        let token = encode_token(&claims, None);

        let error = validator().decode(&token, CLAIMS_ONLY).unwrap_err();
        assert_eq!(error.status_code(), 401);
        assert_eq!(error.detail().error_code, "invalid_token");
    }

    #[test]
    fn test_unknown_key_id_fails_closed() {
        // Signature verification on, but the kid is not in the key set.
        let token = encode_token(&base_claims(), Some("unknown-key"));
        let error = validator()
            .decode(&token, DecodeOptions::default())
            .unwrap_err();
        assert_eq!(error.status_code(), 401);
        assert_eq!(error.detail().error_code, "invalid_token");
    }

    #[test]
    fn test_token_without_key_id_fails_closed() {
        let token = encode_token(&base_claims(), None);
        let error = validator()
            .decode(&token, DecodeOptions::default())
            .unwrap_err();
        assert_eq!(error.status_code(), 401);
    }

    #[test]
    fn test_garbage_token_is_a_generic_401() {
        let error = validator()
            .decode("not-a-token", DecodeOptions::default())
            .unwrap_err();
        assert_eq!(error.status_code(), 401);
        assert_eq!(error.detail().error_code, "invalid_token");
    }

    #[test]
    fn test_scope_and_role_accessors() {
        let claims = claims_with(Some("access_as_user profile.read"), Some(&["auditor"]));
        assert_eq!(claims.scopes(), vec!["access_as_user", "profile.read"]);
        assert!(claims.has_scope("access_as_user"));
        assert!(!claims.has_scope("profile"));
        assert!(claims.has_role("auditor"));
        assert!(!claims.has_role("contact_report_viewer"));

        let bare = claims_with(None, None);
        assert!(bare.scopes().is_empty());
        assert!(!bare.has_scope(USER_SCOPE));
        assert!(!bare.has_role(APPLICATION_ROLE));
    }

    #[test]
    fn test_user_authorization_requires_the_delegated_scope() {
        let claims = claims_with(Some("access_as_user"), None);
        assert!(TokenValidator::authorize_user(&claims, &[]).is_ok());

        let claims = claims_with(Some("something_else"), None);
        let error = TokenValidator::authorize_user(&claims, &[]).unwrap_err();
        assert_eq!(error.status_code(), 403);

        let claims = claims_with(None, Some(&[APPLICATION_ROLE]));
        let error = TokenValidator::authorize_user(&claims, &[]).unwrap_err();
        assert_eq!(error.status_code(), 403);
    }

    #[test]
    fn test_user_authorization_enforces_accepted_roles() {
        let accepted = ["contact_report_viewer"];

        let claims = claims_with(Some("access_as_user"), Some(&["contact_report_viewer"]));
        assert!(TokenValidator::authorize_user(&claims, &accepted).is_ok());

        let claims = claims_with(Some("access_as_user"), Some(&["unrelated_role"]));
        let error = TokenValidator::authorize_user(&claims, &accepted).unwrap_err();
        assert_eq!(error.status_code(), 403);
        assert_eq!(error.detail().error_code, "unauthorized_access");

        let claims = claims_with(Some("access_as_user"), None);
        assert!(TokenValidator::authorize_user(&claims, &accepted).is_err());
    }

    #[test]
    fn test_application_authorization() {
        // Any delegated token passes.
        let claims = claims_with(Some("access_as_user"), None);
        assert!(TokenValidator::authorize_application(&claims).is_ok());

        // A scope-less token needs the application role.
        let claims = claims_with(None, Some(&[APPLICATION_ROLE]));
        assert!(TokenValidator::authorize_application(&claims).is_ok());

        let claims = claims_with(None, Some(&["unrelated_role"]));
        let error = TokenValidator::authorize_application(&claims).unwrap_err();
        assert_eq!(error.status_code(), 403);

        let claims = claims_with(None, None);
        assert!(TokenValidator::authorize_application(&claims).is_err());
    }

    #[test]
    fn test_get_user_identifier_rejects_unauthenticated_tokens() {
        // Crafted token, full verification: must fail authentication (401),
        // never reach the authorization stage (403).
        let token = encode_token(&base_claims(), Some("unknown-key"));
        let error = validator().get_user_identifier(&token, &[]).unwrap_err();
        assert_eq!(error.status_code(), 401);

        let error = validator()
            .validate_application_token("not-a-token")
            .unwrap_err();
        assert_eq!(error.status_code(), 401);
    }
}
