// RegistryRepo against a mock Registry v2 server

use kubeversion_exporter::registry_repo::{RegistryCoordinate, RegistryRepo, TagSource};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn coordinate(server: &MockServer, repository: &str) -> RegistryCoordinate {
    RegistryCoordinate {
        endpoint: Url::parse(&server.uri()).unwrap(),
        repository: repository.to_string(),
    }
}

fn repo() -> RegistryRepo {
    RegistryRepo::new(Duration::from_secs(5), 100, 10).unwrap()
}

/// Answers every page with one tag and a link to a page never seen before.
struct EndlessPages;

impl Respond for EndlessPages {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let last: u64 = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "last")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(0);
        ResponseTemplate::new(200)
            .insert_header(
                "link",
                format!(r#"</v2/org/app/tags/list?last={}&n=100>; rel="next""#, last + 1).as_str(),
            )
            .set_body_json(serde_json::json!({
                "name": "org/app",
                "tags": [last.to_string()]
            }))
    }
}

#[tokio::test]
async fn test_list_tags_without_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/tags/list"))
        .and(query_param("n", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "library/nginx",
            "tags": ["1.19.0", "1.20.0", "1.21.0"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tags = repo()
        .list_tags(&coordinate(&server, "library/nginx"))
        .await
        .unwrap();
    assert_eq!(tags, vec!["1.19.0", "1.20.0", "1.21.0"]);
}

#[tokio::test]
async fn test_list_tags_answers_bearer_challenge() {
    let server = MockServer::start().await;
    let challenge = format!(
        r#"Bearer realm="{}/token",service="registry.test",scope="repository:library/nginx:pull""#,
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/tags/list"))
        .and(header("authorization", "Bearer s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "library/nginx",
            "tags": ["1.21.0"]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/library/nginx/tags/list"))
        .respond_with(ResponseTemplate::new(401).insert_header("www-authenticate", challenge.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("service", "registry.test"))
        .and(query_param("scope", "repository:library/nginx:pull"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "s3cr3t" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tags = repo()
        .list_tags(&coordinate(&server, "library/nginx"))
        .await
        .unwrap();
    assert_eq!(tags, vec!["1.21.0"]);
}

#[tokio::test]
async fn test_list_tags_without_challenge_header_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/org/private/tags/list"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = repo()
        .list_tags(&coordinate(&server, "org/private"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("requires authentication"));
}

#[tokio::test]
async fn test_list_tags_follows_link_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/org/app/tags/list"))
        .and(query_param("last", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "org/app",
            "tags": ["c"]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/org/app/tags/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "link",
                    r#"</v2/org/app/tags/list?last=b&n=100>; rel="next""#,
                )
                .set_body_json(serde_json::json!({
                    "name": "org/app",
                    "tags": ["a", "b"]
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tags = repo()
        .list_tags(&coordinate(&server, "org/app"))
        .await
        .unwrap();
    assert_eq!(tags, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_list_tags_null_tags_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/org/empty/tags/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "org/empty",
            "tags": null
        })))
        .mount(&server)
        .await;

    let tags = repo()
        .list_tags(&coordinate(&server, "org/empty"))
        .await
        .unwrap();
    assert!(tags.is_empty());
}

#[tokio::test]
async fn test_list_tags_server_error_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/org/app/tags/list"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(
        repo()
            .list_tags(&coordinate(&server, "org/app"))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_list_tags_stops_when_pagination_loops_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/org/app/tags/list"))
        .and(query_param("last", "b"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", r#"</v2/org/app/tags/list?n=100>; rel="next""#)
                .set_body_json(serde_json::json!({
                    "name": "org/app",
                    "tags": ["c"]
                })),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/org/app/tags/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "link",
                    r#"</v2/org/app/tags/list?last=b&n=100>; rel="next""#,
                )
                .set_body_json(serde_json::json!({
                    "name": "org/app",
                    "tags": ["a", "b"]
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tags = tokio::time::timeout(
        Duration::from_secs(5),
        repo().list_tags(&coordinate(&server, "org/app")),
    )
    .await
    .expect("listing finished")
    .unwrap();
    assert_eq!(tags, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_list_tags_fails_past_page_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/org/app/tags/list"))
        .respond_with(EndlessPages)
        .expect(3)
        .mount(&server)
        .await;

    let repo = RegistryRepo::new(Duration::from_secs(5), 100, 3).unwrap();
    let err = repo
        .list_tags(&coordinate(&server, "org/app"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("exceeds 3 pages"), "{err}");
}

#[tokio::test]
async fn test_list_tags_refuses_next_page_on_other_origin() {
    let server = MockServer::start().await;
    let foreign = MockServer::start().await;
    let challenge = format!(
        r#"Bearer realm="{}/token",service="registry.test""#,
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/v2/org/app/tags/list"))
        .and(header("authorization", "Bearer s3cr3t"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "link",
                    format!(r#"<{}/v2/org/app/tags/list?last=b>; rel="next""#, foreign.uri())
                        .as_str(),
                )
                .set_body_json(serde_json::json!({
                    "name": "org/app",
                    "tags": ["a", "b"]
                })),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/org/app/tags/list"))
        .respond_with(ResponseTemplate::new(401).insert_header("www-authenticate", challenge.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "s3cr3t" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&foreign)
        .await;

    let err = repo()
        .list_tags(&coordinate(&server, "org/app"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("is not on registry"), "{err}");
}
