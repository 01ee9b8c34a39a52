use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ghmigrate::cli::{RepositoryOptions, RepositoryRef, Visibility};
use ghmigrate::error::RemoteError;
use ghmigrate::provider::Provider;

use crate::mocks::github::{
    authenticated_lookup_mock, create_repository_mock, get_repository_mock, provider_for,
    transfer_mock,
};

mod repository_exists {

    use super::*;

    #[tokio::test]
    async fn found() {
        let mock_server = MockServer::start().await;
        get_repository_mock("beta", "widgets", 200)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "random_token");
        let exists = provider
            .repository_exists(&RepositoryRef::new("beta", "widgets"))
            .await
            .unwrap();

        assert!(exists);
        mock_server.verify().await;
    }

    #[tokio::test]
    async fn not_found() {
        let mock_server = MockServer::start().await;
        get_repository_mock("beta", "widgets", 404)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "random_token");
        let exists = provider
            .repository_exists(&RepositoryRef::new("beta", "widgets"))
            .await
            .unwrap();

        assert!(!exists);
    }

    #[tokio::test]
    async fn other_status_is_an_error() {
        let mock_server = MockServer::start().await;
        get_repository_mock("beta", "widgets", 403)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "random_token");
        let error = provider
            .repository_exists(&RepositoryRef::new("beta", "widgets"))
            .await
            .unwrap_err();

        match error {
            RemoteError::Status { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("status 403"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn sends_platform_headers() {
        let mock_server = MockServer::start().await;
        authenticated_lookup_mock("beta", "widgets", "tgt-token")
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "tgt-token");
        let exists = provider
            .repository_exists(&RepositoryRef::new("beta", "widgets"))
            .await
            .unwrap();

        assert!(exists);
        mock_server.verify().await;
    }
}

mod create_repository {

    use super::*;

    #[tokio::test]
    async fn created() {
        let mock_server = MockServer::start().await;
        create_repository_mock(
            "acme",
            json!({ "name": "widgets", "private": true, "visibility": "internal", "auto_init": false }),
            201,
        )
        .expect(1)
        .mount(&mock_server)
        .await;

        let provider = provider_for(&mock_server, "random_token");
        let options = RepositoryOptions::mirror_target().with_visibility(Visibility::Internal);
        provider
            .create_repository(&RepositoryRef::new("acme", "widgets"), &options)
            .await
            .unwrap();

        mock_server.verify().await;
    }

    #[tokio::test]
    async fn rejected() {
        let mock_server = MockServer::start().await;
        create_repository_mock(
            "acme",
            json!({ "name": "widgets", "private": false, "visibility": "public", "auto_init": true }),
            422,
        )
        .mount(&mock_server)
        .await;

        let provider = provider_for(&mock_server, "random_token");
        let error = provider
            .create_repository(
                &RepositoryRef::new("acme", "widgets"),
                &RepositoryOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(422));
        assert!(error.to_string().contains("name already exists"));
    }
}

mod transfer_ownership {

    use super::*;

    #[tokio::test]
    async fn accepted() {
        for status in [201, 202] {
            let mock_server = MockServer::start().await;
            transfer_mock(
                "acme",
                "widgets",
                json!({ "new_owner": "beta", "new_name": "gadgets" }),
                status,
            )
            .mount(&mock_server)
            .await;

            let provider = provider_for(&mock_server, "random_token");
            provider
                .transfer_ownership(
                    &RepositoryRef::new("acme", "widgets"),
                    &RepositoryRef::new("beta", "gadgets"),
                )
                .await
                .unwrap();

            mock_server.verify().await;
        }
    }

    #[tokio::test]
    async fn server_error() {
        let mock_server = MockServer::start().await;
        transfer_mock(
            "acme",
            "widgets",
            json!({ "new_owner": "beta", "new_name": "widgets" }),
            500,
        )
        .mount(&mock_server)
        .await;

        let provider = provider_for(&mock_server, "random_token");
        let error = provider
            .transfer_ownership(
                &RepositoryRef::new("acme", "widgets"),
                &RepositoryRef::new("beta", "widgets"),
            )
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(500));
    }
}

mod organization {

    use super::*;

    #[tokio::test]
    async fn invite_looks_up_user_id() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "login": "octocat", "id": 583231 })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/invitations"))
            .and(body_json(json!({ "invitee_id": 583231, "role": "direct_member" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "random_token");
        provider.invite_user("acme", "octocat").await.unwrap();

        mock_server.verify().await;
    }

    #[tokio::test]
    async fn invite_stops_when_user_is_unknown() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/invitations"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "random_token");
        let error = provider.invite_user("acme", "ghost").await.unwrap_err();

        assert_eq!(error.status(), Some(404));
        mock_server.verify().await;
    }

    #[tokio::test]
    async fn team_is_created_and_member_added() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/teams"))
            .and(body_json(json!({ "name": "Platform Team", "privacy": "closed" })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "name": "Platform Team", "slug": "platform-team" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/orgs/acme/teams/platform-team/memberships/octocat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "active" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "random_token");
        let slug =
            ghmigrate::organization::create_team_with_member(&provider, "acme", "Platform Team", "octocat")
                .await
                .unwrap();

        assert_eq!(slug, "platform-team");
        mock_server.verify().await;
    }

    #[tokio::test]
    async fn team_response_without_slug_is_a_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/teams"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "name": "Platform Team" })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "random_token");
        let error = provider.create_team("acme", "Platform Team").await.unwrap_err();

        assert!(matches!(error, RemoteError::Decode(_)));
    }
}
