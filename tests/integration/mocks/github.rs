use reqwest::Url;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ghmigrate::credentials::Secret;
use ghmigrate::github_provider::GithubProvider;

pub fn provider_for(mock_server: &MockServer, token: &str) -> GithubProvider {
    GithubProvider::configure_provider(&api_url(mock_server), &Secret::new(token)).unwrap()
}

pub fn api_url(mock_server: &MockServer) -> Url {
    Url::parse(&mock_server.uri()).unwrap()
}

fn message(status: u16) -> serde_json::Value {
    match status {
        404 => json!({ "message": "Not Found" }),
        422 => json!({ "message": "Repository creation failed.", "errors": [{ "message": "name already exists on this account" }] }),
        _ => json!({ "message": format!("status {status}") }),
    }
}

pub fn get_repository_mock(owner: &str, repo: &str, status: u16) -> Mock {
    let body = if status == 200 {
        json!({ "name": repo, "full_name": format!("{owner}/{repo}") })
    } else {
        message(status)
    };

    Mock::given(method("GET"))
        .and(path(format!("/repos/{owner}/{repo}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(1)
}

pub fn create_repository_mock(owner: &str, expected_body: serde_json::Value, status: u16) -> Mock {
    Mock::given(method("POST"))
        .and(path(format!("/orgs/{owner}/repos")))
        .and(header("content-type", "application/json"))
        .and(body_json(expected_body))
        .respond_with(ResponseTemplate::new(status).set_body_json(message(status)))
}

pub fn transfer_mock(owner: &str, repo: &str, expected_body: serde_json::Value, status: u16) -> Mock {
    Mock::given(method("POST"))
        .and(path(format!("/repos/{owner}/{repo}/transfer")))
        .and(body_json(expected_body))
        .respond_with(ResponseTemplate::new(status).set_body_json(message(status)))
        .expect(1)
}

/// Matches only requests carrying the platform headers for `token`.
pub fn authenticated_lookup_mock(owner: &str, repo: &str, token: &str) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{owner}/{repo}")))
        .and(header("authorization", format!("token {token}").as_str()))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": repo })))
        .expect(1)
}
