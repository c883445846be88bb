use actix_identity::Identity;
use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::auth::{start_session, LocalAuth, SessionUser};
use crate::database::UserDb;
use crate::error::{redirect, AppError, AppResult};
use crate::google::{self, GoogleOAuth};
use crate::lists::{self, SubmitOutcome};
use crate::model::{MediaKind, Movie, Series};
use crate::omdb::OmdbClient;
use crate::views::{error_page, render};

type Tera = web::Data<tera::Tera>;
type Db = web::Data<sled::Db>;

const OAUTH_STATE_KEY: &str = "oauth_state";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/auth/google", web::get().to(google_login))
        .route("/auth/google/secrets", web::get().to(google_callback))
        .route("/login", web::get().to(login))
        .route("/login", web::post().to(login_post))
        .route("/register", web::get().to(register))
        .route("/register", web::post().to(register_post))
        .route("/logout", web::get().to(logout))
        .route("/lists", web::get().to(all_lists))
        .route("/lists/{user_id}", web::get().to(user_lists))
        .route("/submit", web::get().to(submit))
        .route("/submit/tv_series", web::post().to(submit_series))
        .route("/submit/movie", web::post().to(submit_movie));
}

/// Renders `err` as a full page, with the status its `ResponseError` mapping
/// gives it.
fn error_view(tera: &tera::Tera, err: &AppError, message: &str) -> AppResult<HttpResponse> {
    error_page(tera, err.status_code(), message)
}

/// Context shared by every page: who is signed in, if anyone.
fn page_context(current: Option<&SessionUser>) -> tera::Context {
    let mut ctx = tera::Context::new();
    ctx.insert(
        "current_user",
        &current.map(|session| session.user.username.as_str()),
    );
    ctx
}

async fn index(current: Option<SessionUser>, tera: Tera) -> AppResult<HttpResponse> {
    render(&tera, "home.html", &page_context(current.as_ref()))
}

async fn login(
    req: HttpRequest,
    current: Option<SessionUser>,
    tera: Tera,
) -> AppResult<HttpResponse> {
    let mut ctx = page_context(current.as_ref());
    ctx.insert("failed", &req.query_string().contains("failed"));
    render(&tera, "login.html", &ctx)
}

async fn register(current: Option<SessionUser>, tera: Tera) -> AppResult<HttpResponse> {
    render(&tera, "register.html", &page_context(current.as_ref()))
}

#[derive(Serialize, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn register_post(
    req: HttpRequest,
    params: web::Form<Credentials>,
    db: Db,
    auth: web::Data<LocalAuth>,
) -> HttpResponse {
    let Credentials { username, password } = params.into_inner();
    let registered = web::block({
        let username = username.clone();
        move || auth.register(&db, &username, &password)
    })
    .await;
    let id = match registered {
        Ok(Ok(id)) => id,
        Ok(Err(err)) => {
            log::info!("registration of {:?} refused: {}", username, err);
            return redirect("/register");
        }
        Err(err) => {
            log::error!("registration of {:?} failed: {}", username, err);
            return redirect("/register");
        }
    };
    log::info!("registered user {} ({:?})", id, username);
    match start_session(&req, id) {
        Ok(()) => redirect("/submit"),
        Err(err) => {
            log::error!("{}", err);
            redirect("/login")
        }
    }
}

async fn login_post(
    req: HttpRequest,
    params: web::Form<Credentials>,
    db: Db,
    auth: web::Data<LocalAuth>,
) -> HttpResponse {
    let Credentials { username, password } = params.into_inner();
    let authenticated = web::block({
        let username = username.clone();
        move || auth.authenticate(&db, &username, &password)
    })
    .await;
    let id = match authenticated {
        Ok(Ok(id)) => id,
        Ok(Err(AppError::InvalidCredentials)) => {
            log::info!("failed login for {:?}", username);
            return redirect("/login?failed");
        }
        Ok(Err(err)) => {
            log::error!("login for {:?} failed: {}", username, err);
            return redirect("/login?failed");
        }
        Err(err) => {
            log::error!("login for {:?} failed: {}", username, err);
            return redirect("/login?failed");
        }
    };
    match start_session(&req, id) {
        Ok(()) => redirect("/lists"),
        Err(err) => {
            log::error!("{}", err);
            redirect("/login?failed")
        }
    }
}

async fn logout(identity: Option<Identity>) -> HttpResponse {
    if let Some(identity) = identity {
        identity.logout();
    }
    redirect("/")
}

async fn google_login(session: Session, google: web::Data<GoogleOAuth>) -> AppResult<HttpResponse> {
    let state = google::generate_state();
    session
        .insert(OAUTH_STATE_KEY, &state)
        .map_err(|err| AppError::Session(err.to_string()))?;
    Ok(redirect(&google.authorize_url(&state)?))
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn google_callback(
    req: HttpRequest,
    session: Session,
    query: web::Query<CallbackQuery>,
    google: web::Data<GoogleOAuth>,
    db: Db,
) -> HttpResponse {
    let signed_in = complete_google_login(&session, &query, &google, &db)
        .await
        .and_then(|id| start_session(&req, id).map(|()| id));
    match signed_in {
        Ok(id) => {
            log::info!("Google login for user {}", id);
            redirect("/lists")
        }
        Err(err) => {
            log::warn!("Google login failed: {}", err);
            redirect("/login")
        }
    }
}

async fn complete_google_login(
    session: &Session,
    query: &CallbackQuery,
    google: &GoogleOAuth,
    db: &sled::Db,
) -> AppResult<u64> {
    let expected = session
        .get::<String>(OAUTH_STATE_KEY)
        .map_err(|err| AppError::Session(err.to_string()))?;
    session.remove(OAUTH_STATE_KEY);

    if let Some(error) = &query.error {
        return Err(AppError::OAuth(format!("consent refused: {}", error)));
    }
    match (expected.as_deref(), query.state.as_deref()) {
        (Some(expected), Some(provided)) if expected == provided => {}
        _ => return Err(AppError::OAuth("state verification failed".to_owned())),
    }
    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AppError::OAuth("callback without code".to_owned()))?;

    let profile = google.fetch_profile(code).await?;
    let (id, _user) = db
        .find_or_create_google_user(&profile.sub, profile.display_name())?
        .ok_or_else(|| AppError::DuplicateUsername(profile.display_name().to_owned()))?;
    Ok(id)
}

#[derive(Serialize)]
struct UserLists<'a> {
    id: u64,
    username: &'a str,
    series: &'a [Series],
    movies: &'a [Movie],
}

async fn all_lists(current: Option<SessionUser>, tera: Tera, db: Db) -> AppResult<HttpResponse> {
    let users = db.all_users()?;
    let views: Vec<_> = users
        .iter()
        .map(|(id, user)| UserLists {
            id: *id,
            username: &user.username,
            series: &user.series,
            movies: &user.movies,
        })
        .collect();
    let mut ctx = page_context(current.as_ref());
    ctx.insert("all_users", &views);
    render(&tera, "list.html", &ctx)
}

async fn user_lists(
    path: web::Path<String>,
    current: Option<SessionUser>,
    tera: Tera,
    db: Db,
) -> AppResult<HttpResponse> {
    let user = match path.parse::<u64>() {
        Ok(id) => db.get_user(id)?,
        Err(_) => None,
    };
    let user = match user {
        Some(user) => user,
        None => {
            let err = AppError::NotFound(path.into_inner());
            log::debug!("{}", err);
            return error_view(&tera, &err, "There is no such user.");
        }
    };
    let mut ctx = page_context(current.as_ref());
    ctx.insert("username", &user.username);
    ctx.insert("series", &user.series);
    ctx.insert("movies", &user.movies);
    render(&tera, "table.html", &ctx)
}

async fn submit(current: SessionUser, tera: Tera) -> AppResult<HttpResponse> {
    let mut ctx = page_context(Some(&current));
    ctx.insert("series", &current.user.series);
    ctx.insert("movies", &current.user.movies);
    render(&tera, "submit.html", &ctx)
}

#[derive(Deserialize)]
struct SeriesParams {
    series_name: String,
}

#[derive(Deserialize)]
struct MovieParams {
    movie_name: String,
}

async fn submit_series(
    current: SessionUser,
    params: web::Form<SeriesParams>,
    tera: Tera,
    db: Db,
    omdb: web::Data<OmdbClient>,
) -> AppResult<HttpResponse> {
    submit_title(current, &params.series_name, MediaKind::Series, &tera, &db, &omdb).await
}

async fn submit_movie(
    current: SessionUser,
    params: web::Form<MovieParams>,
    tera: Tera,
    db: Db,
    omdb: web::Data<OmdbClient>,
) -> AppResult<HttpResponse> {
    submit_title(current, &params.movie_name, MediaKind::Movie, &tera, &db, &omdb).await
}

/// Every outcome except an unreachable lookup service lands back on `/submit`.
async fn submit_title(
    current: SessionUser,
    query: &str,
    kind: MediaKind,
    tera: &tera::Tera,
    db: &sled::Db,
    omdb: &OmdbClient,
) -> AppResult<HttpResponse> {
    match lists::submit_title(db, omdb, current.id, query, kind).await {
        Ok(SubmitOutcome::Added) | Ok(SubmitOutcome::Missed) | Ok(SubmitOutcome::UnknownUser) => {
            Ok(redirect("/submit"))
        }
        Err(err @ AppError::TransportFailure(_)) => {
            log::error!("lookup of {} {:?} failed: {}", kind, query, err);
            error_view(
                tera,
                &err,
                "The title lookup service is unavailable right now. Please try again later.",
            )
        }
        Err(err) => {
            log::error!("submitting {} {:?} failed: {}", kind, query, err);
            Ok(redirect("/submit"))
        }
    }
}
