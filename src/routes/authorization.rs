use crate::auth::Provider;
use crate::error::ApiError;
use crate::models::authorization::{
    AuthorizationCodeGrantForm, AuthorizationUrlQuery, ClientCredentialsForm,
    RefreshTokenGrantForm, SignOutQuery,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Builds the URL a client sends its user to in order to sign in.
///
/// The response carries the URL plus the proof-key verifier and state the
/// client must hold on to until the provider calls back. These endpoints
/// are anonymous: they are the way a client obtains tokens in the first
/// place.
///
/// ## Query Parameters:
/// - `client_id`: The client registered at the identity provider.
/// - `redirect_uri`: Where the provider sends the user back to.
///
/// ## Responses:
/// - `200 OK`: Returns the authorization URL, code verifier, and state.
/// - `422 Unprocessable Entity`: If a parameter is blank or not a URL.
/// - `500 Internal Server Error`: If the provider metadata is unusable.
#[get("/authorization-url")]
pub async fn get_authorization_url(
    provider: web::Data<Provider>,
    query: web::Query<AuthorizationUrlQuery>,
) -> Result<impl Responder, ApiError> {
    query.validate()?;
    let data = provider.authorization_url(&query.client_id, &query.redirect_uri)?;
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

/// Redeems an authorization code for tokens.
///
/// ## Responses:
/// - `200 OK`: Returns the reshaped token set.
/// - `422 Unprocessable Entity`: If a field is blank or not a URL.
/// - `500 Internal Server Error`: If the provider rejects the grant; the
///   detail carries the provider's error code and first description line.
#[post("/authorization-code-grant")]
pub async fn authorization_code_grant(
    provider: web::Data<Provider>,
    form: web::Json<AuthorizationCodeGrantForm>,
) -> Result<impl Responder, ApiError> {
    form.validate()?;
    let data = provider.redeem_authorization_code(&form).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

/// Redeems a refresh token for a fresh token set.
///
/// ## Responses:
/// - `200 OK`: Returns the reshaped token set.
/// - `422 Unprocessable Entity`: If a field is blank.
/// - `500 Internal Server Error`: If the provider rejects the grant.
#[post("/refresh-token-grant")]
pub async fn refresh_token_grant(
    provider: web::Data<Provider>,
    form: web::Json<RefreshTokenGrantForm>,
) -> Result<impl Responder, ApiError> {
    form.validate()?;
    let data = provider.redeem_refresh_token(&form).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

/// Obtains an application token for a daemon client.
///
/// ## Responses:
/// - `200 OK`: Returns the token set; no scope or refresh token is issued.
/// - `422 Unprocessable Entity`: If a field is blank.
/// - `500 Internal Server Error`: If the provider rejects the grant.
#[post("/client-credentials-grant")]
pub async fn client_credentials_grant(
    provider: web::Data<Provider>,
    form: web::Json<ClientCredentialsForm>,
) -> Result<impl Responder, ApiError> {
    form.validate()?;
    let data = provider.client_credentials_grant(&form).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

/// Builds the URL a client sends its user to in order to sign out.
///
/// ## Query Parameters:
/// - `post_logout_redirect_uri` (optional): Where the provider sends the
///   user back to afterwards.
///
/// ## Responses:
/// - `200 OK`: Returns the sign-out URL.
/// - `500 Internal Server Error`: If the provider metadata is unusable.
#[get("/sign-out-url")]
pub async fn get_sign_out_url(
    provider: web::Data<Provider>,
    query: web::Query<SignOutQuery>,
) -> Result<impl Responder, ApiError> {
    let data = provider.sign_out_url(query.post_logout_redirect_uri.as_deref())?;
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ProviderMetadata;
    use actix_web::{test, App};
    use pretty_assertions::assert_eq;

    fn provider() -> Provider {
        let metadata: ProviderMetadata = serde_json::from_value(serde_json::json!({
            "issuer": "https://login.example.com/83f5a2b1/v2.0",
            "jwks_uri": "https://login.example.com/83f5a2b1/discovery/v2.0/keys",
            "authorization_endpoint": "https://login.example.com/83f5a2b1/oauth2/v2.0/authorize",
            "token_endpoint": "https://login.example.com/83f5a2b1/oauth2/v2.0/token",
            "end_session_endpoint": "https://login.example.com/83f5a2b1/oauth2/v2.0/logout",
            "userinfo_endpoint": "https://login.example.com/oidc/userinfo",
        }))
        .unwrap();
        Provider::new(metadata, "a2778c78".to_string(), reqwest::Client::new())
    }

    #[actix_web::test]
    async fn test_authorization_url_issuance() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(provider()))
                .service(get_authorization_url),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/authorization-url?client_id=7a9c1450&redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        let url = body["data"]["authorization_url"].as_str().unwrap();
        assert!(url.starts_with("https://login.example.com/83f5a2b1/oauth2/v2.0/authorize?"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(body["data"]["code_verifier"].is_string());
        assert!(body["data"]["state"].is_string());
    }

    #[actix_web::test]
    async fn test_authorization_url_requires_a_url_redirect() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(provider()))
                .service(get_authorization_url),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/authorization-url?client_id=7a9c1450&redirect_uri=nowhere")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 422);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"]["error_code"], "validation_error");
    }

    #[actix_web::test]
    async fn test_sign_out_url_issuance() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(provider()))
                .service(get_sign_out_url),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/sign-out-url?post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A3000")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        let url = body["data"]["sign_out_url"].as_str().unwrap();
        assert!(url.starts_with("https://login.example.com/83f5a2b1/oauth2/v2.0/logout"));
        assert!(url.contains("post_logout_redirect_uri="));
    }
}
