use std::path::{Path, PathBuf};

use indoc::indoc;
use serde_json::json;
use tempfile::TempDir;
use wiremock::MockServer;

use ghmigrate::cli::{self, Endpoint, ParsedConfig};
use ghmigrate::credentials::{CredentialContext, Secret};
use ghmigrate::error::PreconditionError;
use ghmigrate::fixtures::vcs::{FakeVcs, VcsCall};
use ghmigrate::outcome::{Stage, Status};

use crate::mocks::github::{api_url, create_repository_mock, get_repository_mock};

struct Run {
    dir: TempDir,
    settings: ParsedConfig,
}

impl Run {
    fn new(mock_server: &MockServer) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = ParsedConfig {
            target: Endpoint {
                api_url: api_url(mock_server),
                ..Endpoint::default()
            },
            workspace: dir.path().join("temp_repo"),
            ..ParsedConfig::default()
        };

        Run { dir, settings }
    }

    fn job_file(&self, content: &str) -> PathBuf {
        let path = self.dir.path().join("repo_list.txt");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn workspace(&self) -> &Path {
        &self.settings.workspace
    }
}

fn credentials() -> CredentialContext {
    CredentialContext::new(Secret::new("src-token"), Secret::new("tgt-token"))
}

fn mirror_body(name: &str) -> serde_json::Value {
    json!({ "name": name, "private": true, "visibility": "private", "auto_init": false })
}

#[tokio::test]
async fn creates_target_and_mirrors() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 404)
        .mount(&mock_server)
        .await;
    create_repository_mock("beta", mirror_body("widgets"), 201)
        .expect(1)
        .mount(&mock_server)
        .await;

    let run = Run::new(&mock_server);
    let job_file = run.job_file("acme/widgets::beta/widgets\n");
    let vcs = FakeVcs::default();

    let report = cli::migrate(&run.settings, credentials(), &job_file, vcs.clone())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].stage, Stage::Cleanup);
    assert_eq!(report.results[0].status, Status::Success);
    assert_eq!(
        vcs.calls(),
        vec![
            VcsCall::Clone {
                source: "https://src-token@github.com/acme/widgets.git".parse().unwrap(),
                destination: run.workspace().to_path_buf(),
            },
            VcsCall::SetRemote {
                repository: run.workspace().to_path_buf(),
                remote: "origin".to_string(),
                url: "https://tgt-token@github.com/beta/widgets.git".parse().unwrap(),
            },
            VcsCall::Push {
                repository: run.workspace().to_path_buf(),
            },
        ]
    );
    assert!(!run.workspace().exists());
    mock_server.verify().await;
}

#[tokio::test]
async fn rejected_creation_stops_before_clone() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 404)
        .mount(&mock_server)
        .await;
    create_repository_mock("beta", mirror_body("widgets"), 422)
        .mount(&mock_server)
        .await;

    let run = Run::new(&mock_server);
    let job_file = run.job_file("acme/widgets::beta/widgets\n");
    let vcs = FakeVcs::default();

    let report = cli::migrate(&run.settings, credentials(), &job_file, vcs.clone())
        .await
        .unwrap();

    let result = &report.results[0];
    assert_eq!(result.stage, Stage::EnsureTarget);
    assert_eq!(result.status, Status::Failure);
    assert!(result.detail.contains("422"));
    assert!(vcs.calls().is_empty());
    assert!(!run.workspace().exists());
}

#[tokio::test]
async fn queued_creation_still_mirrors() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 404)
        .mount(&mock_server)
        .await;
    create_repository_mock("beta", mirror_body("widgets"), 202)
        .expect(1)
        .mount(&mock_server)
        .await;

    let run = Run::new(&mock_server);
    let job_file = run.job_file("acme/widgets::beta/widgets\n");
    let vcs = FakeVcs::default();

    let report = cli::migrate(&run.settings, credentials(), &job_file, vcs.clone())
        .await
        .unwrap();

    assert_eq!(report.results[0].status, Status::Success);
    assert_eq!(report.results[0].stage, Stage::Cleanup);
    assert_eq!(vcs.clone_count(), 1);
    mock_server.verify().await;
}

#[tokio::test]
async fn existing_target_is_never_created() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 200)
        .mount(&mock_server)
        .await;
    create_repository_mock("beta", mirror_body("widgets"), 201)
        .expect(0)
        .mount(&mock_server)
        .await;

    let run = Run::new(&mock_server);
    let job_file = run.job_file("acme/widgets::beta/widgets\n");

    let report = cli::migrate(&run.settings, credentials(), &job_file, FakeVcs::default())
        .await
        .unwrap();

    assert_eq!(report.results[0].status, Status::Success);
    mock_server.verify().await;
}

#[tokio::test]
async fn malformed_lines_do_not_count_as_jobs() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 200)
        .mount(&mock_server)
        .await;
    get_repository_mock("beta", "gears", 200)
        .mount(&mock_server)
        .await;

    let run = Run::new(&mock_server);
    let job_file = run.job_file(indoc! {"
        acme/widgets::beta/widgets

        not-a-valid-line
        acme/gears::beta/gears
    "});

    let report = cli::migrate(&run.settings, credentials(), &job_file, FakeVcs::default())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.malformed.len(), 1);
    assert_eq!(report.malformed[0].line, "not-a-valid-line");
    assert_eq!(report.count(Status::Success), 2);
}

#[tokio::test]
async fn push_failure_keeps_going_and_cleans_up() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 200)
        .mount(&mock_server)
        .await;
    get_repository_mock("beta", "gears", 200)
        .mount(&mock_server)
        .await;

    let run = Run::new(&mock_server);
    let job_file = run.job_file("acme/widgets::beta/widgets\nacme/gears::beta/gears\n");
    let vcs = FakeVcs::default().fail_push_to(
        "widgets",
        "! [remote rejected] main -> main (pre-receive hook declined)",
    );

    let report = cli::migrate(&run.settings, credentials(), &job_file, vcs)
        .await
        .unwrap();

    assert_eq!(report.results[0].stage, Stage::Push);
    assert_eq!(report.results[0].status, Status::Failure);
    assert!(report.results[0].detail.contains("pre-receive hook declined"));
    assert_eq!(report.results[1].status, Status::Success);
    assert!(!run.workspace().exists());
}

#[tokio::test]
async fn single_lines_land_under_target_org() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 404)
        .mount(&mock_server)
        .await;
    create_repository_mock("beta", mirror_body("widgets"), 201)
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut run = Run::new(&mock_server);
    run.settings.target_org = Some("beta".to_string());
    let job_file = run.job_file("acme/widgets\n");

    let report = cli::migrate(&run.settings, credentials(), &job_file, FakeVcs::default())
        .await
        .unwrap();

    assert_eq!(report.results[0].job.target.owner, "beta");
    assert_eq!(report.results[0].status, Status::Success);
    mock_server.verify().await;
}

#[tokio::test]
async fn pair_lines_still_run_when_target_org_is_configured() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 200)
        .mount(&mock_server)
        .await;
    get_repository_mock("delta", "gears", 200)
        .mount(&mock_server)
        .await;
    get_repository_mock("gamma", "levers", 200)
        .mount(&mock_server)
        .await;

    let mut run = Run::new(&mock_server);
    run.settings.target_org = Some("gamma".to_string());
    let job_file = run.job_file(indoc! {"
        acme/widgets::beta/widgets
        acme/gears::delta/gears
        acme/levers
    "});

    let report = cli::migrate(&run.settings, credentials(), &job_file, FakeVcs::default())
        .await
        .unwrap();

    assert!(report.malformed.is_empty());
    let targets: Vec<_> = report
        .results
        .iter()
        .map(|result| result.job.target.to_string())
        .collect();
    assert_eq!(targets, vec!["beta/widgets", "delta/gears", "gamma/levers"]);
    assert_eq!(report.count(Status::Success), 3);
    mock_server.verify().await;
}

#[tokio::test]
async fn stale_workspace_is_cleared_first() {
    let mock_server = MockServer::start().await;
    get_repository_mock("beta", "widgets", 200)
        .mount(&mock_server)
        .await;

    let run = Run::new(&mock_server);
    std::fs::create_dir_all(run.workspace().join("objects")).unwrap();
    std::fs::write(run.workspace().join("HEAD"), "leftover").unwrap();
    let job_file = run.job_file("acme/widgets::beta/widgets\n");

    let report = cli::migrate(&run.settings, credentials(), &job_file, FakeVcs::default())
        .await
        .unwrap();

    assert_eq!(report.results[0].status, Status::Success);
    assert!(!run.workspace().exists());
}

#[tokio::test]
async fn missing_job_file_is_fatal() {
    let mock_server = MockServer::start().await;
    let run = Run::new(&mock_server);
    let vcs = FakeVcs::default();

    let error = cli::migrate(
        &run.settings,
        credentials(),
        &run.dir.path().join("missing.txt"),
        vcs.clone(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<PreconditionError>(),
        Some(PreconditionError::JobFileMissing(_))
    ));
    assert!(vcs.calls().is_empty());
}
