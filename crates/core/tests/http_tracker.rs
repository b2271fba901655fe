//! HTTP tracker integration tests against an in-process fake tracker site.
//!
//! The fake site mimics the bibliotik flow: a login form that sets a session
//! cookie, an upload page carrying the authkey and announce URL, a search
//! page, a multipart upload endpoint and an authkey-protected ISBN lookup.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Form, Multipart, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tempfile::TempDir;

use bookseed_core::{
    testing::fixtures, AuthError, HttpOptions, HttpTracker, TorrentDescriptor, TrackerError,
    TrackerProfile, TrackerSite,
};

const AUTHKEY: &str = "5f3a9c";
const ANNOUNCE: &str = "https://tracker.test/announce/5f3a9c";
const SESSION_COOKIE: &str = "session=valid";

/// A field received by the fake upload endpoint.
#[derive(Debug, Clone)]
struct ReceivedField {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    value: Vec<u8>,
}

#[derive(Default)]
struct SiteState {
    books: Mutex<Vec<String>>,
    uploads: Mutex<Vec<Vec<ReceivedField>>>,
    expired: AtomicBool,
    omit_announce: AtomicBool,
    reject_uploads: AtomicBool,
}

type Shared = Arc<SiteState>;

fn logged_in(state: &SiteState, headers: &HeaderMap) -> bool {
    !state.expired.load(Ordering::SeqCst)
        && headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains(SESSION_COOKIE))
}

async fn login_page() -> Html<&'static str> {
    Html("<html><body><form action=\"/login\">Please log in</form></body></html>")
}

async fn login(Form(form): Form<HashMap<String, String>>) -> Response {
    let accepted = form.get("username").map(String::as_str) == Some("reader")
        && form.get("password").map(String::as_str) == Some("secret")
        && form.get("keeplogged").map(String::as_str) == Some("1");

    if !accepted {
        return Redirect::to("/login").into_response();
    }

    (
        [(header::SET_COOKIE, format!("{}; Path=/", SESSION_COOKIE))],
        Html("<html><body>Welcome back</body></html>"),
    )
        .into_response()
}

async fn upload_page(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !logged_in(&state, &headers) {
        return Redirect::to("/login").into_response();
    }

    let announce = if state.omit_announce.load(Ordering::SeqCst) {
        String::new()
    } else {
        format!("<div id=\"announce\">{}</div>", ANNOUNCE)
    };

    Html(format!(
        r#"<html><body>
            {}
            <form method="post" enctype="multipart/form-data">
              <input type="hidden" name="authkey" value="{}">
            </form>
        </body></html>"#,
        announce, AUTHKEY
    ))
    .into_response()
}

async fn upload(State(state): State<Shared>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    if !logged_in(&state, &headers) {
        return Redirect::to("/login").into_response();
    }

    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let value = field.bytes().await.unwrap().to_vec();
        fields.push(ReceivedField {
            name,
            file_name,
            content_type,
            value,
        });
    }
    state.uploads.lock().unwrap().push(fields);

    if state.reject_uploads.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Upload failed: duplicate torrent").into_response();
    }

    Html("<html><body>Upload complete</body></html>").into_response()
}

async fn search(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !logged_in(&state, &headers) {
        return Redirect::to("/login").into_response();
    }

    let wanted = query.get("search").cloned().unwrap_or_default();
    if state.books.lock().unwrap().contains(&wanted) {
        Html(format!("<table><tr><td>{}</td></tr></table>", wanted)).into_response()
    } else {
        Html("<p>No torrents found.</p>").into_response()
    }
}

async fn isbn_lookup(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !logged_in(&state, &headers) || query.get("authkey").map(String::as_str) != Some(AUTHKEY) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match query.get("isbn").map(String::as_str) {
        Some("9780131103627") => Json(json!({
            "title": "The C Programming Language",
            "authors": "Brian W. Kernighan, Dennis M. Ritchie",
            "isbn": "978-0-13-110362-7",
            "publisher": "Prentice Hall",
            "pages": "272",
            "year": "1988",
            "image": "",
            "description": "The classic.",
        }))
        .into_response(),
        _ => Json(json!([])).into_response(),
    }
}

/// Serve the fake site on an ephemeral port.
async fn spawn_site(state: Shared) -> SocketAddr {
    let app = Router::new()
        .route("/login", get(login_page).post(login))
        .route("/upload/ebook", get(upload_page).post(upload))
        .route("/torrents/", get(search))
        .route("/isbnlookup", get(isbn_lookup))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake site");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn profile(addr: SocketAddr) -> TrackerProfile {
    TrackerProfile::bibliotik().with_base_url(format!("http://{}", addr))
}

async fn authenticated(state: &Shared) -> HttpTracker {
    let addr = spawn_site(state.clone()).await;
    HttpTracker::authenticate(profile(addr), "reader", "secret", &HttpOptions::default())
        .await
        .expect("Failed to authenticate")
}

fn field<'a>(fields: &'a [ReceivedField], name: &str) -> &'a ReceivedField {
    fields
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("missing form field {}", name))
}

fn text(fields: &[ReceivedField], name: &str) -> String {
    String::from_utf8(field(fields, name).value.clone()).unwrap()
}

#[tokio::test]
async fn test_authenticate_harvests_tokens() {
    let state = Shared::default();
    let tracker = authenticated(&state).await;

    assert_eq!(tracker.name(), "bibliotik");
    assert_eq!(tracker.announce_url(), ANNOUNCE);
    assert_eq!(
        tracker.metadata_resolver().map(|r| r.name().to_string()),
        Some("bibliotik-lookup".to_string())
    );
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let addr = spawn_site(Shared::default()).await;
    let result =
        HttpTracker::authenticate(profile(addr), "reader", "wrong", &HttpOptions::default()).await;

    assert!(matches!(result, Err(AuthError::LoginRejected { .. })));
}

#[tokio::test]
async fn test_missing_announce_url_fails_authentication() {
    let state = Shared::default();
    state.omit_announce.store(true, Ordering::SeqCst);
    let addr = spawn_site(state).await;

    let result =
        HttpTracker::authenticate(profile(addr), "reader", "secret", &HttpOptions::default()).await;

    assert!(matches!(
        result,
        Err(AuthError::TokenNotFound { token: "announce URL", .. })
    ));
}

#[tokio::test]
async fn test_has_book_uses_not_found_marker() {
    let state = Shared::default();
    state.books.lock().unwrap().push("9780131103627".to_string());
    let tracker = authenticated(&state).await;

    assert!(tracker.has_book(&fixtures::isbn("9780131103627")).await.unwrap());
    assert!(!tracker.has_book(&fixtures::isbn("0262510871")).await.unwrap());
}

#[tokio::test]
async fn test_expired_session() {
    let state = Shared::default();
    let tracker = authenticated(&state).await;
    state.expired.store(true, Ordering::SeqCst);

    let err = tracker
        .has_book(&fixtures::isbn("9780131103627"))
        .await
        .unwrap_err();
    assert!(err.is_session_expired());
}

#[tokio::test]
async fn test_tracker_lookup_uses_authkey() {
    let state = Shared::default();
    let tracker = authenticated(&state).await;
    let resolver = tracker.metadata_resolver().unwrap();

    let metadata = resolver
        .resolve(&fixtures::isbn("9780131103627"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata.title, "The C Programming Language");
    assert_eq!(metadata.authors, vec!["Brian W. Kernighan", "Dennis M. Ritchie"]);
    assert_eq!(metadata.isbn.as_str(), "9780131103627");
    assert_eq!(metadata.pages, Some(272));
    assert_eq!(metadata.year, Some(1988));
    assert_eq!(metadata.image, None);

    let missing = resolver.resolve(&fixtures::isbn("0262510871")).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_submit_sends_multipart_form() {
    let state = Shared::default();
    let tracker = authenticated(&state).await;

    let dir = TempDir::new().unwrap();
    let torrent_path = dir.path().join("kr-9780131103627.torrent");
    std::fs::write(&torrent_path, b"d8:announce4:testi0ee").unwrap();
    let isbn = fixtures::isbn("9780131103627");

    tracker
        .submit(
            &dir.path().join("kr-9780131103627.epub"),
            &TorrentDescriptor::new(&torrent_path),
            &fixtures::metadata(&isbn),
        )
        .await
        .unwrap();

    let uploads = state.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    let fields = &uploads[0];

    let torrent = field(fields, "TorrentFileField");
    assert_eq!(torrent.file_name.as_deref(), Some("kr-9780131103627.torrent"));
    assert_eq!(torrent.content_type.as_deref(), Some("application/x-bittorrent"));
    assert_eq!(torrent.value, b"d8:announce4:testi0ee");

    assert_eq!(text(fields, "authkey"), AUTHKEY);
    assert_eq!(text(fields, "FormatField"), "15");
    assert_eq!(text(fields, "IsbnField"), "9780131103627");
    assert_eq!(text(fields, "AuthorsField"), "Ada Lovelace");
    assert_eq!(text(fields, "YearField"), "2001");
    assert_eq!(text(fields, "upload"), "");
}

#[tokio::test]
async fn test_submit_error_status_is_rejection() {
    let state = Shared::default();
    let tracker = authenticated(&state).await;
    state.reject_uploads.store(true, Ordering::SeqCst);

    let dir = TempDir::new().unwrap();
    let torrent_path = dir.path().join("sicp.torrent");
    std::fs::write(&torrent_path, b"d4:infoe").unwrap();
    let isbn = fixtures::isbn("0262510871");

    let err = tracker
        .submit(
            &dir.path().join("sicp-0262510871.pdf"),
            &TorrentDescriptor::new(&torrent_path),
            &fixtures::metadata(&isbn),
        )
        .await
        .unwrap_err();

    match err {
        TrackerError::Rejected { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("duplicate torrent"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
