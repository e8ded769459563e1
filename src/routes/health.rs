use crate::config::Config;
use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

/// Health check endpoint
///
/// Returns the current status of the API, the configured version, and a
/// timestamp. Served outside the API prefix and without authentication.
#[get("/health")]
pub async fn health(config: web::Data<Config>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": config.api_version,
        "timestamp": Utc::now()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn test_health_endpoint() {
        let config = Config {
            authority: String::new(),
            audience: String::new(),
            allowed_origin: "http://localhost:3000".to_string(),
            api_prefix: "/api/v1".to_string(),
            api_version: "1.0.0".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            mongo_host: "localhost".to_string(),
            mongo_port: 27017,
            mongo_database: "noticeboard".to_string(),
            mongo_username_file: String::new(),
            mongo_password_file: String::new(),
        };
        let app = test::init_service(
            actix_web::App::new()
                .app_data(web::Data::new(config))
                .service(health),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "1.0.0");
        assert!(json["timestamp"].is_string());
    }
}
