pub mod authorization;
pub mod contacts;
pub mod health;
pub mod posts;
pub mod users;

use crate::error::ApiError;
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

/// Mounts every API route under the scope this is configured into, along
/// with payload handlers that keep malformed input on the same error
/// contract as everything else.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(
            web::scope("/oauth2")
                .service(authorization::get_authorization_url)
                .service(authorization::authorization_code_grant)
                .service(authorization::refresh_token_grant)
                .service(authorization::client_credentials_grant)
                .service(authorization::get_sign_out_url),
        )
        .service(
            web::scope("/posts")
                .service(posts::get_posts)
                .service(posts::create_post)
                .service(posts::get_post)
                .service(posts::update_post)
                .service(posts::delete_post),
        )
        .service(
            web::scope("/contacts")
                .service(contacts::get_contacts)
                .service(contacts::create_contact),
        )
        .service(
            web::scope("/users")
                .service(users::get_users)
                .service(users::create_user)
                // `/me` must register before the `{email}` matchers.
                .service(users::get_signed_in_user)
                .service(users::get_user)
                .service(users::update_user)
                .service(users::delete_user),
        );
}

/// Replacement configuration used when startup could not complete: every
/// path answers the opaque 500 contract instead of the process crash-looping.
pub fn degraded(cfg: &mut web::ServiceConfig) {
    cfg.default_service(web::route().to(unavailable));
}

async fn unavailable() -> HttpResponse {
    ApiError::internal().error_response()
}

fn json_error_handler(error: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(error.to_string()).into()
}

fn query_error_handler(error: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(error.to_string()).into()
}

/// Rebuilds the externally visible URL of the current request, without the
/// query string. Pagination links and `Location` headers derive from it.
pub(crate) fn request_url(req: &HttpRequest) -> String {
    let connection = req.connection_info();
    format!("{}://{}{}", connection.scheme(), connection.host(), req.path())
}
