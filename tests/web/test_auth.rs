use actix_web::http::StatusCode;

use watchlists::database::UserDb;

use super::mock_providers::MockProviders;
use super::test_helpers::*;

#[actix_rt::test]
async fn test_register_signs_in_and_shows_own_lists() {
    let mocks = MockProviders::start().await;
    let db = temp_db();
    let app = create_test_app(&db, &mocks).await;

    let cookie = register(&app, "alice", "wonderland").await;
    let resp = get(&app, "/submit", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("alice&#x27;s lists") || body.contains("alice's lists"));
    assert!(body.contains("No series yet."));
    assert!(body.contains("No movies yet."));
}

#[actix_rt::test]
async fn test_duplicate_registration_is_refused() {
    let mocks = MockProviders::start().await;
    let db = temp_db();
    let app = create_test_app(&db, &mocks).await;

    register(&app, "alice", "wonderland").await;
    let resp = post_form(
        &app,
        "/register",
        &[("username", "alice"), ("password", "looking-glass")],
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp).as_deref(), Some("/register"));
    assert!(session_cookie(&resp).is_none());

    // The original password still works and the account was not replaced.
    assert_eq!(db.all_users().unwrap().len(), 1);
    log_in(&app, "alice", "wonderland").await;
}

#[actix_rt::test]
async fn test_wrong_password_is_refused() {
    let mocks = MockProviders::start().await;
    let db = temp_db();
    let app = create_test_app(&db, &mocks).await;

    register(&app, "alice", "wonderland").await;
    let resp = post_form(
        &app,
        "/login",
        &[("username", "alice"), ("password", "nope")],
        None,
    )
    .await;
    assert_eq!(location(&resp).as_deref(), Some("/login?failed"));
    assert!(session_cookie(&resp).is_none());

    let resp = post_form(
        &app,
        "/login",
        &[("username", "nobody"), ("password", "nope")],
        None,
    )
    .await;
    assert_eq!(location(&resp).as_deref(), Some("/login?failed"));

    let resp = get(&app, "/login?failed", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_each_user_sees_only_their_own_lists() {
    let mocks = MockProviders::start().await;
    let db = temp_db();
    let app = create_test_app(&db, &mocks).await;

    let alice = register(&app, "alice", "wonderland").await;
    let bob = register(&app, "bob", "builder").await;
    let resp = post_form(&app, "/submit/movie", &[("movie_name", "Inception")], Some(&alice)).await;
    assert_eq!(location(&resp).as_deref(), Some("/submit"));

    let alice_page = body_text(get(&app, "/submit", Some(&alice)).await).await;
    let bob_page = body_text(get(&app, "/submit", Some(&bob)).await).await;
    assert!(alice_page.contains("Christopher Nolan"));
    assert!(!bob_page.contains("Christopher Nolan"));
    assert!(bob_page.contains("No movies yet."));
}

#[actix_rt::test]
async fn test_anonymous_requests_are_sent_to_login() {
    let mocks = MockProviders::start().await;
    let db = temp_db();
    let app = create_test_app(&db, &mocks).await;

    let resp = get(&app, "/submit", None).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp).as_deref(), Some("/login"));

    let resp = post_form(&app, "/submit/movie", &[("movie_name", "Inception")], None).await;
    assert_eq!(location(&resp).as_deref(), Some("/login"));
    let resp = post_form(&app, "/submit/tv_series", &[("series_name", "The Wire")], None).await;
    assert_eq!(location(&resp).as_deref(), Some("/login"));

    let resp = get(&app, "/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_logout_invalidates_the_session() {
    let mocks = MockProviders::start().await;
    let db = temp_db();
    let app = create_test_app(&db, &mocks).await;

    let cookie = register(&app, "alice", "wonderland").await;
    let resp = get(&app, "/logout", Some(&cookie)).await;
    assert_eq!(location(&resp).as_deref(), Some("/"));

    // Replaying the old cookie finds no server-side session.
    let resp = get(&app, "/submit", Some(&cookie)).await;
    assert_eq!(location(&resp).as_deref(), Some("/login"));

    // Logging out anonymously is harmless.
    let resp = get(&app, "/logout", None).await;
    assert_eq!(location(&resp).as_deref(), Some("/"));
}
