use crate::auth::{BearerToken, TokenValidator, UserRole};
use crate::db::Store;
use crate::error::ApiError;
use crate::models::contact::{ContactInput, CONTACT_COLLECTION};
use crate::models::ListQuery;
use crate::routes::request_url;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use bson::doc;
use serde_json::{json, Value};
use validator::Validate;

/// Retrieves a page of contact-form submissions, most recent first.
///
/// Reading the report requires a signed-in user holding the
/// `contact_report_viewer` role.
///
/// ## Responses:
/// - `200 OK`: Returns a page of submissions with pagination links.
/// - `401 Unauthorized`: If the request lacks a valid user token.
/// - `403 Forbidden`: If the user does not hold the viewer role.
/// - `422 Unprocessable Entity`: If a query parameter is out of range.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("")]
pub async fn get_contacts(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    query: web::Query<ListQuery>,
    req: HttpRequest,
) -> Result<impl Responder, ApiError> {
    validator.get_user_identifier(bearer.token(), &[UserRole::ContactReportViewer.as_str()])?;
    query.validate()?;

    let page = store
        .list(
            &CONTACT_COLLECTION,
            &request_url(&req),
            query.page,
            query.records_per_page,
            query.keyword.as_deref(),
            Some(doc! { "created_at": -1 }),
        )
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// Records a contact-form submission.
///
/// The public site submits on behalf of anonymous visitors, so this takes
/// an application token rather than a user token.
///
/// ## Responses:
/// - `201 Created`: Returns the stored submission; `Location` addresses it.
/// - `401 Unauthorized`: If the request lacks a valid application token.
/// - `422 Unprocessable Entity`: If a field is out of bounds.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[post("")]
pub async fn create_contact(
    store: web::Data<Store>,
    validator: web::Data<TokenValidator>,
    bearer: BearerToken,
    contact_data: web::Json<ContactInput>,
    req: HttpRequest,
) -> Result<impl Responder, ApiError> {
    validator.validate_application_token(bearer.token())?;
    contact_data.validate()?;

    let contact = store
        .create(&CONTACT_COLLECTION, contact_data.document())
        .await?;
    let location = format!(
        "{}/{}",
        request_url(&req),
        contact
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    );

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location))
        .json(json!({ "data": contact })))
}
