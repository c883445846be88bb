//! In-process stand-ins for OMDb and Google's OAuth endpoints.
//!
//! One `HttpServer` on an ephemeral port serves both under `/omdb/` and
//! `/google/`.

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::json;
use std::collections::HashMap;
use std::net::TcpListener;

use watchlists::google::GoogleEndpoints;

pub const OMDB_API_KEY: &str = "test-omdb-key";
pub const GOOGLE_CLIENT_SECRET: &str = "test-client-secret";

/// Authorization code that Google exchanges for Grace Hopper's profile.
pub const GOOD_CODE: &str = "good-code";
/// Authorization code whose profile name collides with the local user "alice".
pub const ALICE_CODE: &str = "alice-code";

/// A title the mock answers with a server error.
pub const OUTAGE_TITLE: &str = "Outage";

async fn omdb_title(query: web::Query<HashMap<String, String>>) -> HttpResponse {
    if query.get("apikey").map(String::as_str) != Some(OMDB_API_KEY) {
        return HttpResponse::Unauthorized()
            .json(json!({"Response": "False", "Error": "Invalid API key!"}));
    }
    match query.get("t").map(String::as_str) {
        Some("Breaking Bad") => HttpResponse::Ok().json(json!({
            "Title": "Breaking Bad", "Year": "2008–2013", "Genre": "Crime, Drama, Thriller",
            "imdbRating": "9.5", "totalSeasons": "5", "Type": "series", "Response": "True"
        })),
        Some("The Wire") => HttpResponse::Ok().json(json!({
            "Title": "The Wire", "Year": "2002–2008", "Genre": "Crime, Drama, Thriller",
            "imdbRating": "9.3", "totalSeasons": "5", "Type": "series", "Response": "True"
        })),
        Some("Inception") => HttpResponse::Ok().json(json!({
            "Title": "Inception", "Year": "2010", "Genre": "Action, Adventure, Sci-Fi",
            "Director": "Christopher Nolan", "Runtime": "148 min", "imdbRating": "8.8",
            "Type": "movie", "Response": "True"
        })),
        Some(OUTAGE_TITLE) => HttpResponse::ServiceUnavailable().finish(),
        _ => HttpResponse::Ok().json(json!({"Response": "False", "Error": "Movie not found!"})),
    }
}

async fn google_token(form: web::Form<HashMap<String, String>>) -> HttpResponse {
    if form.get("client_secret").map(String::as_str) != Some(GOOGLE_CLIENT_SECRET)
        || form.get("grant_type").map(String::as_str) != Some("authorization_code")
    {
        return HttpResponse::Unauthorized().json(json!({"error": "invalid_client"}));
    }
    let token = match form.get("code").map(String::as_str) {
        Some(GOOD_CODE) => "grace-token",
        Some(ALICE_CODE) => "alice-token",
        _ => return HttpResponse::BadRequest().json(json!({"error": "invalid_grant"})),
    };
    HttpResponse::Ok().json(json!({
        "access_token": token, "token_type": "Bearer", "expires_in": 3599, "scope": "profile"
    }))
}

async fn google_userinfo(req: HttpRequest) -> HttpResponse {
    let auth = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    match auth {
        "Bearer grace-token" => {
            HttpResponse::Ok().json(json!({"sub": "google-42", "name": "Grace Hopper"}))
        }
        "Bearer alice-token" => HttpResponse::Ok().json(json!({"sub": "google-43", "name": "alice"})),
        _ => HttpResponse::Unauthorized().json(json!({"error": "invalid_token"})),
    }
}

pub struct MockProviders {
    pub base_url: String,
}

impl MockProviders {
    /// Start the mock providers on an ephemeral port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();

        let server = HttpServer::new(|| {
            App::new()
                .route("/omdb/", web::get().to(omdb_title))
                .route("/google/token", web::post().to(google_token))
                .route("/google/userinfo", web::get().to(google_userinfo))
        })
        .workers(1)
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

        // Lives as long as the test's runtime.
        actix_rt::spawn(server);

        MockProviders {
            base_url: format!("http://127.0.0.1:{}", port),
        }
    }

    pub fn omdb_url(&self) -> String {
        format!("{}/omdb/", self.base_url)
    }

    pub fn google_endpoints(&self) -> GoogleEndpoints {
        GoogleEndpoints {
            authorize_url: format!("{}/google/authorize", self.base_url),
            token_url: format!("{}/google/token", self.base_url),
            userinfo_url: format!("{}/google/userinfo", self.base_url),
        }
    }
}
