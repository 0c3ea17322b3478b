use std::fs;
use std::io;

use gatehouse::http::cookie::CookieOptions;
use gatehouse::http::files::{FileOutcome, StorageRoots};
use gatehouse::http::handler::{Reply, Router};
use gatehouse::http::request::{Method, Request, RequestBuilder};
use gatehouse::http::response::{Response, ResponseBuilder, StatusCode};
use gatehouse::http::writer::{SERVER_NAME, not_found_page, serialize_response};
use serde_json::json;
use tempfile::TempDir;

const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\n\
Accept-Ranges: bytes\r\n\
Content-Type: text/html\r\n\
Content-Length: 13\r\n\
Cache-Control: max-age=86000\r\n\
Connection: close\r\n\
\r\n\
404 Not Found";

fn site() -> (TempDir, StorageRoots) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("www")).unwrap();
    fs::create_dir_all(dir.path().join("static")).unwrap();
    fs::write(dir.path().join("www/index.html"), "<h1>hello</h1>").unwrap();
    fs::write(dir.path().join("static/app.js"), "console.log(1);").unwrap();
    let roots = StorageRoots::new(dir.path());
    (dir, roots)
}

fn line(key: &str, value: &str) -> String {
    format!("{:<25} {}\r\n", format!("{}:", key), value)
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn get(path: &str) -> Request {
    RequestBuilder::new().method(Method::GET).path(path).build().unwrap()
}

#[test]
fn test_status_reason_phrases() {
    let cases = [
        (200, "OK"),
        (201, "Created"),
        (204, "No Content"),
        (301, "Moved Permanently"),
        (302, "Found"),
        (303, "See Other"),
        (304, "Not Modified"),
        (400, "Bad Request"),
        (401, "Unauthorized"),
        (403, "Forbidden"),
        (404, "Not Found"),
        (500, "Internal Server Error"),
        (418, "OK"),
        (502, "OK"),
    ];

    for (code, phrase) in cases {
        assert_eq!(StatusCode::from(code).reason_phrase(), phrase, "{code}");
    }
}

#[test]
fn test_not_found_page_is_fixed() {
    assert_eq!(text(&not_found_page()), NOT_FOUND);
}

#[test]
fn test_serves_existing_page() {
    let (_dir, roots) = site();
    let mut req = Request::prepare(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n", None);

    let out = text(&Response::new().build_response(&mut req, &roots));

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains(&line("Content-Type", "text/html")));
    assert!(out.contains(&line("Content-Length", "14")));
    assert!(out.contains(&line("Connection", "close")));
    assert!(out.contains(&line("Server", SERVER_NAME)));
    assert!(out.ends_with("\r\n\r\n<h1>hello</h1>"));
}

#[test]
fn test_root_serves_index_page() {
    let (_dir, roots) = site();
    let mut req = Request::prepare(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n", None);

    let out = text(&Response::new().build_response(&mut req, &roots));

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with("<h1>hello</h1>"));
    assert_eq!(req.path.as_deref(), Some("/index.html"));
}

#[test]
fn test_static_asset_content_type() {
    let (_dir, roots) = site();
    let mut req = get("/static/app.js");

    let out = text(&Response::new().build_response(&mut req, &roots));

    assert!(out.contains(&line("Content-Type", "application/javascript")));
    assert!(out.contains(&line("Content-Length", "15")));
}

#[test]
fn test_missing_file_gives_not_found_page() {
    let (_dir, roots) = site();
    let mut req = get("/missing.html");

    let out = Response::new().build_response(&mut req, &roots);
    assert_eq!(text(&out), NOT_FOUND);
}

#[test]
fn test_read_failure_gives_server_error() {
    let req = get("/index.html");
    let outcome = FileOutcome::Failed(io::Error::other("disk read error"));

    let out = text(&Response::new().render_file(&req, outcome));

    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(out.contains(&line("Content-Type", "text/plain")));
    assert!(out.contains(&line("Content-Length", "25")));
    assert!(out.ends_with("\r\n\r\n500 Internal Server Error"));
}

#[test]
fn test_render_file_outcomes() {
    let req = get("/index.html");

    let found = text(&Response::new().render_file(&req, FileOutcome::Found(b"<p>hi</p>".to_vec())));
    assert!(found.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(found.ends_with("<p>hi</p>"));

    let missing = Response::new().render_file(&req, FileOutcome::NotFound);
    assert_eq!(text(&missing), NOT_FOUND);
}

#[test]
fn test_escape_attempt_gives_not_found_page() {
    let (dir, roots) = site();
    fs::write(dir.path().join("passwords.html"), "secret").unwrap();
    let mut req = Request::prepare(b"GET /../passwords.html HTTP/1.1\r\n\r\n", None);

    let out = Response::new().build_response(&mut req, &roots);
    assert_eq!(text(&out), NOT_FOUND);
}

#[test]
fn test_unroutable_request_gives_not_found_page() {
    let (_dir, roots) = site();
    let mut req = Request::prepare(b"???\r\n\r\n", None);

    let out = Response::new().build_response(&mut req, &roots);
    assert_eq!(text(&out), NOT_FOUND);
}

#[test]
fn test_preflight_echoes_origin() {
    let (_dir, roots) = site();
    let mut req = Request::prepare(
        b"OPTIONS /api HTTP/1.1\r\nOrigin: http://a.test\r\n\r\n",
        None,
    );

    let out = text(&Response::new().build_response(&mut req, &roots));

    assert!(out.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert!(out.contains("Access-Control-Allow-Origin: http://a.test\r\n"));
    assert!(out.contains("Access-Control-Allow-Credentials: true\r\n"));
    assert!(out.contains("Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n"));
    assert!(out.contains("Connection: close\r\n"));
    assert!(out.ends_with("\r\n\r\n"));
}

#[test]
fn test_preflight_without_origin_uses_wildcard() {
    let (_dir, roots) = site();
    let mut req = Request::prepare(b"OPTIONS /api HTTP/1.1\r\n\r\n", None);

    let out = text(&Response::new().build_response(&mut req, &roots));

    assert!(out.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(!out.contains("Access-Control-Allow-Credentials"));
}

#[test]
fn test_decided_response_skips_files() {
    let (_dir, roots) = site();
    let mut req = get("/index.html");
    let mut resp = ResponseBuilder::new(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .body(br#"{"id":1}"#.to_vec())
        .build();

    let out = text(&resp.build_response(&mut req, &roots));

    assert!(out.starts_with("HTTP/1.1 201 Created\r\n"));
    assert!(out.contains(&line("Content-Type", "application/json")));
    assert!(out.contains(&line("Content-Length", "8")));
    assert!(out.ends_with("\r\n\r\n{\"id\":1}"));
}

#[test]
fn test_set_cookie_line() {
    let (_dir, roots) = site();
    let mut req = get("/index.html");
    let mut resp = ResponseBuilder::new(StatusCode::OK)
        .cookie("auth", "true", &CookieOptions::default().max_age(0))
        .build();

    let out = text(&resp.build_response(&mut req, &roots));

    assert!(out.contains("\r\nSet-Cookie: auth=true; Max-Age=0\r\n"));
}

#[test]
fn test_cookie_replaced_by_name() {
    let mut resp = Response::new();
    resp.set_cookie("auth", "false", &CookieOptions::default());
    resp.set_cookie("theme", "dark", &CookieOptions::default());
    resp.set_cookie("auth", "true", &CookieOptions::default().http_only());

    assert_eq!(
        resp.cookies,
        vec![
            ("auth".to_string(), "true; HttpOnly".to_string()),
            ("theme".to_string(), "dark".to_string()),
        ]
    );
}

#[test]
fn test_explicit_header_overrides_baseline_once() {
    let req = get("/anything");
    let resp = ResponseBuilder::new(StatusCode::OK)
        .header("cache-control", "max-age=60")
        .build();

    let out = text(&serialize_response(&resp, &req));

    assert!(out.contains(&line("cache-control", "max-age=60")));
    assert_eq!(out.to_lowercase().matches("cache-control").count(), 1);
    assert!(!out.contains("no-cache"));
}

#[test]
fn test_baseline_headers() {
    let mut req = get("/x");
    req.headers.insert("user-agent", "curl/8");
    req.headers.insert("accept", "text/plain");
    let resp = ResponseBuilder::new(StatusCode::OK).build();

    let out = text(&serialize_response(&resp, &req));

    assert!(out.contains(&line("Accept", "text/plain")));
    assert!(out.contains(&line("Accept-Language", "en-US,en;q=0.9")));
    assert!(out.contains(&line("User-Agent", "curl/8")));
    assert!(out.contains(&line("Cache-Control", "no-cache")));
    assert!(out.contains(&line("Content-Type", "text/html")));
    assert!(out.contains(&line("Content-Length", "0")));
    assert!(out.contains("Date:"));
}

#[test]
fn test_user_agent_only_when_sent() {
    let req = get("/x");
    let resp = ResponseBuilder::new(StatusCode::OK).build();

    let out = text(&serialize_response(&resp, &req));
    assert!(!out.contains("User-Agent"));
    assert!(out.contains(&line("Accept", "application/json")));
}

#[test]
fn test_no_content_has_minimal_head_and_no_body() {
    let req = get("/x");
    let resp = ResponseBuilder::new(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("X-Ignored", "1")
        .body(b"dropped".to_vec())
        .build();

    let out = text(&serialize_response(&resp, &req));

    assert!(out.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert!(out.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(!out.contains("X-Ignored"));
    assert!(!out.contains("Content-Length"));
    assert!(out.ends_with("\r\n\r\n"));
}

#[test]
fn test_unknown_status_renders_ok_reason() {
    let req = get("/x");
    let resp = ResponseBuilder::new(StatusCode(418)).build();

    let out = text(&serialize_response(&resp, &req));
    assert!(out.starts_with("HTTP/1.1 418 OK\r\n"));
}

#[test]
fn test_redirect() {
    let req = get("/login");
    let mut resp = Response::new();
    resp.set_body(b"stale".to_vec());
    resp.redirect("/index");

    assert_eq!(resp.status, Some(StatusCode::FOUND));
    assert_eq!(resp.url(), Some("/index"));
    assert_eq!(resp.body.as_deref(), Some(&b""[..]));

    let out = text(&serialize_response(&resp, &req));
    assert!(out.starts_with("HTTP/1.1 302 Found\r\n"));
    assert!(out.contains(&line("Location", "/index")));
    assert!(out.contains(&line("Content-Length", "0")));
    assert!(out.contains(&line("Content-Type", "text/html")));
}

#[test]
fn test_redirect_with_status() {
    let mut resp = Response::new();
    resp.redirect_with_status("https://example.com/", StatusCode::MOVED_PERMANENTLY);

    assert_eq!(resp.status, Some(StatusCode::MOVED_PERMANENTLY));
    assert_eq!(resp.headers.get("location"), Some("https://example.com/"));
}

#[test]
fn test_empty_url_sets_no_location() {
    let mut resp = Response::new();
    resp.set_url("");

    assert_eq!(resp.url(), Some(""));
    assert!(!resp.headers.contains("Location"));
}

#[test]
fn test_json_helper() {
    let resp = Response::json(&json!({"ok": true}), StatusCode::OK);

    assert_eq!(resp.headers.get("content-type"), Some("application/json"));
    assert_eq!(resp.headers.get("access-control-allow-origin"), Some("*"));
    assert_eq!(resp.body.as_deref(), Some(&br#"{"ok":true}"#[..]));
    assert_eq!(resp.headers.get("content-length"), Some("11"));
}

#[test]
fn test_handler_body_without_status_uses_no_backing_path() {
    let (_dir, roots) = site();
    let routes = Router::new().route(Method::POST, "/api/items", |_req: &Request| {
        Ok::<Reply, anyhow::Error>(Response::new().into())
    });
    let mut req = Request::prepare(b"POST /api/items HTTP/1.1\r\n\r\n", Some(&routes));

    let mut resp = Response::new();
    resp.set_body(br#"[1,2]"#.to_vec());

    let out = text(&resp.build_response(&mut req, &roots));

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains(&line("Content-Type", "application/json")));
    assert!(out.ends_with("\r\n\r\n[1,2]"));
}
