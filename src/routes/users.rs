use crate::auth::{BearerToken, Provider, TokenValidator};
use crate::db::Store;
use crate::error::ApiError;
use crate::models::user::{UserInput, UserUpdate, USER_COLLECTION};
use crate::models::ListQuery;
use crate::routes::request_url;
use actix_web::http::header;
use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Retrieves a page of registered users.
///
/// User administration is reserved for trusted daemon clients, so every
/// route in this scope except `/me` takes an application token.
///
/// ## Responses:
/// - `200 OK`: Returns a page of users with pagination links and counters.
/// - `401 Unauthorized`: If the request lacks a valid application token.
/// - `422 Unprocessable Entity`: If a query parameter is out of range.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("")]
pub async fn get_users(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    query: web::Query<ListQuery>,
    req: HttpRequest,
) -> Result<impl Responder, ApiError> {
    validator.validate_application_token(bearer.token())?;
    query.validate()?;

    let page = store
        .list(
            &USER_COLLECTION,
            &request_url(&req),
            query.page,
            query.records_per_page,
            query.keyword.as_deref(),
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// Registers a user.
///
/// The email is the record's address and must be unique; the probe runs
/// before the insert so a duplicate answers as a field validation error
/// rather than a storage failure.
///
/// ## Request Body:
/// - `first_name`, `last_name`: Between 1 and 50 characters.
/// - `email`: A valid address, unique across users.
/// - `job_title`: Between 1 and 100 characters.
///
/// ## Responses:
/// - `201 Created`: Returns the stored user; `Location` addresses it by email.
/// - `401 Unauthorized`: If the request lacks a valid application token.
/// - `422 Unprocessable Entity`: If a field is out of bounds or the email is taken.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[post("")]
pub async fn create_user(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    user_data: web::Json<UserInput>,
    req: HttpRequest,
) -> Result<impl Responder, ApiError> {
    validator.validate_application_token(bearer.token())?;
    user_data.validate()?;

    if store.exists(&USER_COLLECTION, "email", &user_data.email).await? {
        return Err(ApiError::validation("email: value must be unique"));
    }

    let user = store.create(&USER_COLLECTION, user_data.document()).await?;
    let location = format!("{}/{}", request_url(&req), user_data.email);

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location))
        .json(json!({ "data": user })))
}

/// Retrieves the signed-in user's profile from the identity provider.
///
/// The caller's own bearer token is forwarded to the provider's userinfo
/// endpoint; the provider's verdict on it passes through.
///
/// ## Responses:
/// - `200 OK`: Returns the profile reported by the provider.
/// - `401 Unauthorized`: If either this API or the provider rejects the token.
/// - `403 Forbidden`: If the token carries no delegated user scope.
/// - `500 Internal Server Error`: If the provider cannot be reached.
#[get("/me")]
pub async fn get_signed_in_user(
    validator: web::Data<TokenValidator>,
    provider: web::Data<Provider>,
    bearer: BearerToken,
) -> Result<impl Responder, ApiError> {
    validator.get_user_identifier(bearer.token(), &[])?;
    let profile = provider.userinfo(bearer.token()).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": profile })))
}

/// Retrieves one user by email.
///
/// ## Responses:
/// - `200 OK`: Returns the user.
/// - `401 Unauthorized`: If the request lacks a valid application token.
/// - `404 Not Found`: If no user carries the given email.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("/{email}")]
pub async fn get_user(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    email: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    validator.validate_application_token(bearer.token())?;
    let user = store.get(&USER_COLLECTION, &email).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": user })))
}

/// Edits one user by email.
///
/// Absent fields keep their stored value; the email itself cannot change.
///
/// ## Responses:
/// - `200 OK`: Returns the user as stored after the edit.
/// - `401 Unauthorized`: If the request lacks a valid application token.
/// - `404 Not Found`: If no user carries the given email.
/// - `422 Unprocessable Entity`: If a field is out of bounds.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[patch("/{email}")]
pub async fn update_user(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    email: web::Path<String>,
    user_data: web::Json<UserUpdate>,
) -> Result<impl Responder, ApiError> {
    validator.validate_application_token(bearer.token())?;
    user_data.validate()?;

    let user = store
        .update(&USER_COLLECTION, &email, user_data.document())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "data": user })))
}

/// Removes one user by email.
///
/// ## Responses:
/// - `204 No Content`: On successful removal.
/// - `401 Unauthorized`: If the request lacks a valid application token.
/// - `404 Not Found`: If no user carries the given email.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[delete("/{email}")]
pub async fn delete_user(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    email: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    validator.validate_application_token(bearer.token())?;
    store.delete(&USER_COLLECTION, &email).await?;
    Ok(HttpResponse::NoContent().finish())
}
