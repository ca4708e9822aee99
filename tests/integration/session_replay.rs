use super::{chapter, login_request, login_response};

use rstest::rstest;

use p4tape::p4::exchange::{HttpRequest, HttpResponse};
use p4tape::p4::variables::{Scope, VariableStore};

// ========================================
// State shared across chapters of one test session
// ========================================

#[rstest]
fn test_bounds_carry_values_between_chapters(
    login_request: HttpRequest,
    login_response: HttpResponse,
) {
    let mut store = VariableStore::new();

    let mut login = chapter(
        "login",
        &[&[
            r#"request:body:{"user": "(\w+)"}->%user"#,
            r#"response:body:{recorded-token}->{token-@{%user}}"#,
            r#"response:body:{"token": "([^"]+)"}->%token"#,
        ]],
    );
    let mut response = login_response.clone();
    login.replay(&login_request, &mut response, &mut store);
    assert_eq!(response.body, r#"{"token": "token-alice"}"#);

    store.begin_chapter();

    let mut profile = chapter(
        "profile",
        &[&[
            "?%var[token]->&auth",
            "response:body->{{\"owner\": \"@{%user}\", \"auth\": \"@{&auth}\"}}",
        ]],
    );
    let mut response = HttpResponse::default();
    profile.replay(&HttpRequest::default(), &mut response, &mut store);

    assert_eq!(
        response.body,
        r#"{"owner": "alice", "auth": "token-alice"}"#
    );
    assert_eq!(store.get(Scope::Chapter, "auth"), Some("token-alice"));
}

#[rstest]
fn chapter_scope_is_fresh_for_each_visit(
    login_request: HttpRequest,
    login_response: HttpResponse,
) {
    let mut store = VariableStore::new();
    let mut login = chapter("login", &[&["~?use:{1}->&first_visit"]]);

    login.replay(&login_request, &mut login_response.clone(), &mut store);
    assert_eq!(store.get(Scope::Chapter, "first_visit"), Some("1"));

    store.begin_chapter();
    login.replay(&login_request, &mut login_response.clone(), &mut store);
    assert_eq!(store.get(Scope::Chapter, "first_visit"), Some("false"));
    assert_eq!(login.uses, 2);
}

#[rstest]
fn other_chapter_use_count_is_visible(
    login_request: HttpRequest,
    login_response: HttpResponse,
) {
    let mut store = VariableStore::new();
    let mut login = chapter("login", &[]);
    login.replay(&login_request, &mut login_response.clone(), &mut store);
    login.replay(&login_request, &mut login_response.clone(), &mut store);

    store.begin_chapter();
    let mut logout = chapter(
        "logout",
        &[&["?use[login]:{2}->&logged_in_twice", "?use[signup]->&signed_up"]],
    );
    logout.replay(&HttpRequest::default(), &mut HttpResponse::default(), &mut store);

    assert_eq!(store.get(Scope::Chapter, "logged_in_twice"), Some("2"));
    assert_eq!(store.get(Scope::Chapter, "signed_up"), None);
    assert_eq!(store.chapter_uses("logout"), Some(1));

    let bounds = store.into_test_bounds();
    assert_eq!(bounds.chapter_uses.get("login"), Some(&2));
}

#[rstest]
fn login_cookie_rewrite_is_scoped_to_its_header(
    login_request: HttpRequest,
    login_response: HttpResponse,
) {
    let mut store = VariableStore::new();
    store.set(Scope::TestBounds, "session", "live-1");
    let mut login = chapter(
        "login",
        &[&["response:head[set-cookie]:{^session=}->{session=@{session}}"]],
    );
    let mut response = login_response;
    login.replay(&login_request, &mut response, &mut store);

    assert_eq!(response.headers.get("Set-Cookie"), Some("session=live-1"));
    assert_eq!(response.body, r#"{"token": "recorded-token"}"#);
}
