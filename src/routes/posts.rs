use crate::auth::{BearerToken, TokenValidator};
use crate::db::Store;
use crate::error::ApiError;
use crate::models::post::{add_relationships, PostInput, PostUpdate, POST_COLLECTION};
use crate::models::ListQuery;
use crate::routes::request_url;
use actix_web::http::header;
use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::{json, Value};
use validator::Validate;

/// Retrieves a page of noticeboard posts.
///
/// Readable with an application token, so daemon clients can render the
/// board without a signed-in user. Posts are ordered by most recent update
/// and an optional `keyword` narrows the page to matching messages.
///
/// ## Query Parameters:
/// - `page` (optional): 1-based page number, defaults to 1.
/// - `records_per_page` (optional): page size, defaults to 10.
/// - `keyword` (optional): pattern matched against post messages.
///
/// ## Responses:
/// - `200 OK`: Returns a page of posts with pagination links and counters.
/// - `401 Unauthorized`: If the request lacks a valid application token.
/// - `422 Unprocessable Entity`: If a query parameter is out of range.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("")]
pub async fn get_posts(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    query: web::Query<ListQuery>,
    req: HttpRequest,
) -> Result<impl Responder, ApiError> {
    validator.validate_application_token(bearer.token())?;
    query.validate()?;

    let mut page = store
        .list(
            &POST_COLLECTION,
            &request_url(&req),
            query.page,
            query.records_per_page,
            query.keyword.as_deref(),
            None,
        )
        .await?;
    for post in &mut page.data {
        add_relationships(post);
    }

    Ok(HttpResponse::Ok().json(page))
}

/// Publishes a new post.
///
/// Requires a signed-in user; the post's owner is the authenticated subject
/// and never part of the payload.
///
/// ## Request Body:
/// - `message`: The message to publish, between 10 and 500 characters.
///
/// ## Responses:
/// - `201 Created`: Returns the stored post; `Location` addresses it.
/// - `401 Unauthorized`: If the request lacks a valid user token.
/// - `403 Forbidden`: If the token carries no delegated user scope.
/// - `422 Unprocessable Entity`: If the message is out of bounds.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[post("")]
pub async fn create_post(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    post_data: web::Json<PostInput>,
    req: HttpRequest,
) -> Result<impl Responder, ApiError> {
    let owner = validator.get_user_identifier(bearer.token(), &[])?;
    post_data.validate()?;

    let mut post = store
        .create(&POST_COLLECTION, post_data.document(&owner))
        .await?;
    let location = format!(
        "{}/{}",
        request_url(&req),
        post.get("_id").and_then(Value::as_str).unwrap_or_default()
    );
    add_relationships(&mut post);

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location))
        .json(json!({ "data": post })))
}

/// Retrieves one post by its identifier.
///
/// ## Responses:
/// - `200 OK`: Returns the post.
/// - `401 Unauthorized`: If the request lacks a valid application token.
/// - `404 Not Found`: If no post carries the given identifier.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("/{id}")]
pub async fn get_post(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    post_id: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    validator.validate_application_token(bearer.token())?;

    let mut post = store.get(&POST_COLLECTION, &post_id).await?;
    add_relationships(&mut post);

    Ok(HttpResponse::Ok().json(json!({ "data": post })))
}

/// Edits a post owned by the signed-in user.
///
/// Absent fields keep their stored value; the post's last-update stamp only
/// moves when a field actually changed.
///
/// ## Responses:
/// - `200 OK`: Returns the post as stored after the edit.
/// - `401 Unauthorized`: If the request lacks a valid user token.
/// - `403 Forbidden`: If the signed-in user does not own the post.
/// - `404 Not Found`: If no post carries the given identifier.
/// - `422 Unprocessable Entity`: If the replacement message is out of bounds.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[patch("/{id}")]
pub async fn update_post(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    post_id: web::Path<String>,
    post_data: web::Json<PostUpdate>,
) -> Result<impl Responder, ApiError> {
    prove_ownership(&store, &validator, &bearer, &post_id).await?;
    post_data.validate()?;

    let mut post = store
        .update(&POST_COLLECTION, &post_id, post_data.document())
        .await?;
    add_relationships(&mut post);

    Ok(HttpResponse::Ok().json(json!({ "data": post })))
}

/// Removes a post owned by the signed-in user.
///
/// ## Responses:
/// - `204 No Content`: On successful removal.
/// - `401 Unauthorized`: If the request lacks a valid user token.
/// - `403 Forbidden`: If the signed-in user does not own the post.
/// - `404 Not Found`: If no post carries the given identifier.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[delete("/{id}")]
pub async fn delete_post(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    post_id: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    prove_ownership(&store, &validator, &bearer, &post_id).await?;
    store.delete(&POST_COLLECTION, &post_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Verifies that the bearer is a signed-in user owning the post.
///
/// The check reads the post before the caller mutates it; the two steps are
/// not atomic.
async fn prove_ownership(
    store: &Store,
    validator: &TokenValidator,
    bearer: &BearerToken,
    post_id: &str,
) -> Result<(), ApiError> {
    let user = validator.get_user_identifier(bearer.token(), &[])?;
    let post = store.get(&POST_COLLECTION, post_id).await?;
    if post.get("owner").and_then(Value::as_str) != Some(user.as_str()) {
        return Err(ApiError::forbidden());
    }
    Ok(())
}
