use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{Error as ActixError, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::error::ApiError;

/// Extracts the bearer credential from the `Authorization` header.
///
/// This extractor only guarantees that a credential in the Bearer scheme is
/// present; what the token must prove (application role, delegated scope,
/// resource ownership) is decided per endpoint by handing it to
/// [`crate::auth::TokenValidator`].
///
/// A missing header, a non-Bearer scheme or an empty credential all yield the
/// distinguished 401 `authorization_header_not_found` error, which carries
/// the `WWW-Authenticate: Bearer` header like every 401 this API emits.
#[derive(Debug, Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl FromRequest for BearerToken {
    type Error = ActixError; // ApiError is converted into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let credential = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        match credential {
            Some(token) => ready(Ok(BearerToken(token.to_string()))),
            None => ready(Err(ApiError::authorization_header_not_found().into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_bearer_token_extraction_success() {
        let req = test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();

        let mut payload = Payload::None;
        let extracted = BearerToken::from_request(&req, &mut payload).await;
        assert_eq!(extracted.unwrap().token(), "abc.def.ghi");
    }

    #[actix_rt::test]
    async fn test_missing_authorization_header_is_401() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let result = BearerToken::from_request(&req, &mut payload).await;
        assert!(result.is_err());

        let response = result.unwrap_err().error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok()),
            Some("Bearer")
        );
    }

    #[actix_rt::test]
    async fn test_non_bearer_scheme_is_401() {
        let req = test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();

        let mut payload = Payload::None;
        let result = BearerToken::from_request(&req, &mut payload).await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().error_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_rt::test]
    async fn test_empty_bearer_credential_is_401() {
        let req = test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();

        let mut payload = Payload::None;
        let result = BearerToken::from_request(&req, &mut payload).await;
        assert!(result.is_err());
    }
}
