//! Shared test helpers: a fully wired app plus request shorthands.

use actix_http::Request;
use actix_identity::IdentityMiddleware;
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::{test, web, App};
use secrecy::SecretString;

use watchlists::auth::LocalAuth;
use watchlists::config::{GoogleSettings, OmdbSettings};
use watchlists::google::GoogleOAuth;
use watchlists::omdb::OmdbClient;
use watchlists::session_store::SledSessionStore;
use watchlists::{routes, session_middleware, views, SESSION_COOKIE};

use super::mock_providers::{MockProviders, GOOGLE_CLIENT_SECRET, OMDB_API_KEY};

/// bcrypt's minimum cost keeps the tests fast.
const TEST_BCRYPT_COST: u32 = 4;

pub fn temp_db() -> sled::Db {
    sled::Config::new()
        .temporary(true)
        .open()
        .expect("failed to open temporary database")
}

/// Create the app with the production middleware stack, talking to `mocks`.
pub async fn create_test_app(
    db: &sled::Db,
    mocks: &MockProviders,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    let omdb = OmdbClient::new(&OmdbSettings {
        base_url: mocks.omdb_url(),
        api_key: SecretString::from(OMDB_API_KEY.to_owned()),
    })
    .expect("failed to build OMDb client");
    let google = GoogleOAuth::new(
        &GoogleSettings {
            client_id: "test-client".to_owned(),
            client_secret: SecretString::from(GOOGLE_CLIENT_SECRET.to_owned()),
            callback_url: "http://localhost:3000/auth/google/secrets".to_owned(),
        },
        mocks.google_endpoints(),
    )
    .expect("failed to build Google client");
    let sessions = SledSessionStore::open(db).expect("failed to open session tree");

    test::init_service(
        App::new()
            .wrap(IdentityMiddleware::default())
            .wrap(session_middleware(sessions, Key::generate(), false))
            .app_data(web::Data::new(
                views::load_templates().expect("failed to load templates"),
            ))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(omdb))
            .app_data(web::Data::new(google))
            .app_data(web::Data::new(LocalAuth::new(TEST_BCRYPT_COST)))
            .configure(routes::configure),
    )
    .await
}

pub async fn get<S, B>(app: &S, uri: &str, cookie: Option<&Cookie<'static>>) -> ServiceResponse<B>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = test::TestRequest::get().uri(uri);
    if let Some(cookie) = cookie {
        req = req.cookie(cookie.clone());
    }
    test::call_service(app, req.to_request()).await
}

pub async fn post_form<S, B>(
    app: &S,
    uri: &str,
    form: &[(&str, &str)],
    cookie: Option<&Cookie<'static>>,
) -> ServiceResponse<B>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = test::TestRequest::post().uri(uri).set_form(form);
    if let Some(cookie) = cookie {
        req = req.cookie(cookie.clone());
    }
    test::call_service(app, req.to_request()).await
}

/// The session cookie set by a response, if any.
pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.into_owned())
}

pub fn location<B>(resp: &ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

pub async fn body_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    let bytes = test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).expect("body is not UTF-8")
}

/// Register a local account and return the session cookie it was signed in with.
pub async fn register<S, B>(app: &S, username: &str, password: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = post_form(
        app,
        "/register",
        &[("username", username), ("password", password)],
        None,
    )
    .await;
    assert_eq!(location(&resp).as_deref(), Some("/submit"));
    session_cookie(&resp).expect("registration did not start a session")
}

/// Log in and return the session cookie.
pub async fn log_in<S, B>(app: &S, username: &str, password: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = post_form(
        app,
        "/login",
        &[("username", username), ("password", password)],
        None,
    )
    .await;
    assert_eq!(location(&resp).as_deref(), Some("/lists"));
    session_cookie(&resp).expect("login did not start a session")
}
