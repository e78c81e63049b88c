mod common;

use common::http_mock::{ok_json, start_token_server, token_url};
use common::FakeStore;
use tokrot::config::{PermissionPolicy, RotationInputs};
use tokrot::error::{RotateError, TokenRefreshError};
use tokrot::secrets::FailureReason;
use tokrot::{PropagationOutcome, RotationConfig, RotationState, Rotator, WorkflowCommands};
use wiremock::matchers::{body_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOW: i64 = 1_700_000_000;

type TestRotator = Rotator<WorkflowCommands<Vec<u8>>>;

fn rotator(inputs: RotationInputs, store: FakeStore) -> TestRotator {
    Rotator::new(
        common::config(inputs),
        Box::new(store),
        WorkflowCommands::new(Vec::new()),
    )
    .unwrap()
}

fn log_lines(rotator: TestRotator) -> Vec<String> {
    String::from_utf8(rotator.into_emitter().into_sink().into_inner())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Scenario A: non-rotating refresh response falls back to the input refresh token
#[tokio::test]
async fn refresh_token_falls_back_to_input() {
    let server =
        start_token_server(ok_json(serde_json::json!({"access_token": "a1", "expires_in": 3600})))
            .await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("github_output");

    let mut rot = rotator(
        RotationInputs {
            github_output: Some(output.clone()),
            ..common::inputs(&token_url(&server))
        },
        FakeStore::default(),
    );
    let report = rot.run_at(NOW).await.unwrap();
    assert_eq!(rot.state(), RotationState::Done);
    assert_eq!(report.result.refresh_token.expose(), "r1");
    assert_eq!(report.result.expires_at.epoch_seconds(), NOW + 3600);
    assert!(report.result.propagation_outcomes.is_empty());
    assert_eq!(report.emitted.masked, 1);

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        content,
        format!("access_token=a1\nrefresh_token=r1\nexpires_at={}\n", NOW + 3600)
    );
    assert_eq!(log_lines(rot), vec!["::add-mask::a1"]);
}

/// Scenario B: HTTP 500 is fatal and nothing is written
#[tokio::test]
async fn http_error_is_fatal_and_silent() {
    let server =
        start_token_server(ResponseTemplate::new(500).set_body_string("server error")).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("github_output");

    let mut rot = rotator(
        RotationInputs {
            github_output: Some(output.clone()),
            ..common::inputs(&token_url(&server))
        },
        FakeStore::default(),
    );
    let err = rot.run_at(NOW).await.unwrap_err();
    match &err {
        RotateError::Refresh(TokenRefreshError::HttpStatus { code, body }) => {
            assert_eq!(*code, 500);
            assert_eq!(body, "server error");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!err.rotation_succeeded());
    assert_eq!(rot.state(), RotationState::Failed);
    assert!(!output.exists());
    assert!(log_lines(rot).is_empty());
}

/// Scenario C: a denied target is recorded and the run still completes
#[tokio::test]
async fn permission_denied_target_is_non_fatal() {
    let server = start_token_server(ok_json(serde_json::json!({
        "access_token": "a1",
        "refresh_token": "r2",
        "expires_in": 3600
    })))
    .await;
    let store = FakeStore::denying(&["T1"]);

    let mut rot = rotator(
        RotationInputs {
            update_secrets: true,
            owner: Some("acme".into()),
            repository: Some("acme/widgets".into()),
            access_secret_name: Some("T1".into()),
            refresh_secret_name: Some("T2".into()),
            ..common::inputs(&token_url(&server))
        },
        store.clone(),
    );
    let report = rot.run_at(NOW).await.unwrap();
    assert_eq!(rot.state(), RotationState::Done);
    assert_eq!(
        report.result.propagation_outcomes,
        vec![
            PropagationOutcome::Failed(FailureReason::PermissionDenied),
            PropagationOutcome::Updated,
        ]
    );
    assert_eq!(store.written(), vec![("T2".to_string(), "r2".to_string())]);

    let lines = log_lines(rot);
    assert_eq!(lines[0], "::add-mask::a1");
    assert_eq!(lines[1], "::add-mask::r2");
    let warning = lines.last().unwrap();
    assert!(warning.starts_with("::warning::"));
    assert!(warning.contains("permission denied for T1"));
}

/// Scenario D: no refresh token means no request at all
#[tokio::test]
async fn missing_refresh_token_makes_no_request() {
    let server = start_token_server(ok_json(serde_json::json!({"access_token": "a1"}))).await;

    let err = RotationConfig::from_inputs(RotationInputs {
        refresh_token: None,
        ..common::inputs(&token_url(&server))
    })
    .unwrap_err();
    assert!(matches!(err, RotateError::MissingInput(_)));

    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn rotate_once_rejects_missing_input() {
    let err = tokrot::rotate_once(RotationInputs::default()).await.unwrap_err();
    assert_eq!(err.code(), "missing_input");
}

#[tokio::test]
async fn strict_policy_aborts_before_output() {
    let server = start_token_server(ok_json(serde_json::json!({"access_token": "a1"}))).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("github_output");

    let mut rot = rotator(
        RotationInputs {
            update_secrets: true,
            owner: Some("acme".into()),
            repository: Some("widgets".into()),
            permission_policy: PermissionPolicy::Strict,
            github_output: Some(output.clone()),
            ..common::inputs(&token_url(&server))
        },
        FakeStore::denying(&["CLAUDE_ACCESS_TOKEN"]),
    );
    let err = rot.run_at(NOW).await.unwrap_err();
    assert!(matches!(err, RotateError::Propagation { failed: 1, total: 1 }));
    assert!(err.rotation_succeeded());
    assert_eq!(rot.state(), RotationState::Failed);
    assert!(!output.exists());
}

#[tokio::test]
async fn unrotated_refresh_token_leaves_its_secret_alone() {
    let server = start_token_server(ok_json(serde_json::json!({"access_token": "a1"}))).await;
    let store = FakeStore::default();

    let mut rot = rotator(
        RotationInputs {
            update_secrets: true,
            owner: Some("acme".into()),
            repository: Some("widgets".into()),
            ..common::inputs(&token_url(&server))
        },
        store.clone(),
    );
    let report = rot.run_at(NOW).await.unwrap();
    let result = &report.result;
    assert_eq!(result.propagation_outcomes, vec![PropagationOutcome::Updated]);
    assert_eq!(result.targets.len(), 1);
    assert_eq!(result.targets[0].name(), "CLAUDE_ACCESS_TOKEN");
    assert!(result.propagation_summary().is_fully_successful());
    assert_eq!(
        store.written(),
        vec![("CLAUDE_ACCESS_TOKEN".to_string(), "a1".to_string())]
    );
    // default lifetime applies when expires_in is missing
    assert_eq!(result.expires_at.epoch_seconds(), NOW + 28_800);

    let lines = log_lines(rot);
    assert!(lines.iter().all(|l| !l.starts_with("::warning::")));
}

#[tokio::test]
async fn rotated_refresh_token_updates_both_secrets() {
    let server = start_token_server(ok_json(
        serde_json::json!({"access_token": "a1", "refresh_token": "r2"}),
    ))
    .await;
    let store = FakeStore::default();

    let mut rot = rotator(
        RotationInputs {
            update_secrets: true,
            owner: Some("acme".into()),
            repository: Some("widgets".into()),
            ..common::inputs(&token_url(&server))
        },
        store.clone(),
    );
    let report = rot.run_at(NOW).await.unwrap();
    assert_eq!(
        report.result.propagation_outcomes,
        vec![PropagationOutcome::Updated, PropagationOutcome::Updated]
    );
    assert_eq!(
        store.written(),
        vec![
            ("CLAUDE_ACCESS_TOKEN".to_string(), "a1".to_string()),
            ("CLAUDE_REFRESH_TOKEN".to_string(), "r2".to_string()),
        ]
    );
}

#[tokio::test]
async fn request_body_matches_refresh_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({
            "grant_type": "refresh_token",
            "refresh_token": "r1",
            "client_id": "9d1c250a-e61b-44d9-88ed-5944d1962f5e"
        })))
        .respond_with(ok_json(serde_json::json!({"access_token": "a1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut rot = rotator(common::inputs(&server.uri()), FakeStore::default());
    rot.run_at(NOW).await.unwrap();
}

#[tokio::test]
async fn client_id_can_be_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({
            "grant_type": "refresh_token",
            "refresh_token": "r1"
        })))
        .respond_with(ok_json(serde_json::json!({"access_token": "a1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut rot = rotator(
        RotationInputs {
            omit_client_id: true,
            ..common::inputs(&server.uri())
        },
        FakeStore::default(),
    );
    rot.run_at(NOW).await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let server =
        start_token_server(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
    let mut rot = rotator(common::inputs(&token_url(&server)), FakeStore::default());
    let err = rot.run_at(NOW).await.unwrap_err();
    assert!(matches!(err, RotateError::Refresh(TokenRefreshError::Parse(_))));
}

#[tokio::test]
async fn missing_access_token_is_rejected() {
    let server =
        start_token_server(ok_json(serde_json::json!({"refresh_token": "r2"}))).await;
    let mut rot = rotator(common::inputs(&token_url(&server)), FakeStore::default());
    let err = rot.run_at(NOW).await.unwrap_err();
    assert!(matches!(
        err,
        RotateError::Refresh(TokenRefreshError::MissingAccessToken)
    ));
    assert!(log_lines(rot).is_empty());
}

#[tokio::test]
async fn non_200_success_status_is_an_error() {
    let server = start_token_server(
        ResponseTemplate::new(201).set_body_json(serde_json::json!({"access_token": "a1"})),
    )
    .await;
    let mut rot = rotator(common::inputs(&token_url(&server)), FakeStore::default());
    let err = rot.run_at(NOW).await.unwrap_err();
    assert_eq!(err.code(), "http_status_error");
}

#[tokio::test]
async fn connection_failure_is_network_error() {
    // port 1 is reserved and refuses connections
    let mut rot = rotator(
        common::inputs("http://127.0.0.1:1/v1/oauth/token"),
        FakeStore::default(),
    );
    let err = rot.run_at(NOW).await.unwrap_err();
    assert!(matches!(err, RotateError::Refresh(TokenRefreshError::Network(_))));
}

#[tokio::test]
async fn error_body_never_echoes_refresh_token() {
    let server = start_token_server(
        ResponseTemplate::new(400)
            .set_body_string(r#"{"error":"invalid_grant","token":"refresh-secret-xyz"}"#),
    )
    .await;
    let mut rot = rotator(
        RotationInputs {
            refresh_token: Some("refresh-secret-xyz".into()),
            ..common::inputs(&token_url(&server))
        },
        FakeStore::default(),
    );
    let err = rot.run_at(NOW).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("invalid_grant"));
    assert!(!message.contains("refresh-secret-xyz"));
}

#[tokio::test]
async fn unwritable_output_is_reported_after_rotation() {
    let server = start_token_server(ok_json(serde_json::json!({"access_token": "a1"}))).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("no-such-dir").join("github_output");

    let mut rot = rotator(
        RotationInputs {
            github_output: Some(output),
            ..common::inputs(&token_url(&server))
        },
        FakeStore::default(),
    );
    let err = rot.run_at(NOW).await.unwrap_err();
    assert!(matches!(err, RotateError::OutputWrite { .. }));
    assert!(err.rotation_succeeded());
    assert_eq!(rot.state(), RotationState::Failed);
    // masking happened before the failing write
    assert_eq!(log_lines(rot), vec!["::add-mask::a1"]);
}

#[tokio::test]
async fn with_legacy_writes_both_channels() {
    let server = start_token_server(ok_json(serde_json::json!({"access_token": "a1"}))).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("github_output");
    let env = dir.path().join("github_env");

    let mut rot = rotator(
        RotationInputs {
            github_output: Some(output.clone()),
            github_env: Some(env.clone()),
            output_mode: tokrot::config::OutputMode::FullWithLegacy,
            ..common::inputs(&token_url(&server))
        },
        FakeStore::default(),
    );
    let report = rot.run_at(NOW).await.unwrap();
    assert_eq!(
        report.emitted.channels,
        vec!["GITHUB_OUTPUT", "legacy set-output", "GITHUB_ENV"]
    );
    let env_content = std::fs::read_to_string(&env).unwrap();
    assert!(env_content.contains("CLAUDE_ACCESS_TOKEN=a1\n"));
    assert!(env_content.contains("CLAUDE_REFRESH_TOKEN=r1\n"));
    assert!(std::fs::read_to_string(&output).unwrap().contains("access_token=a1"));

    let lines = log_lines(rot);
    assert_eq!(lines[0], "::add-mask::a1");
    assert!(lines.contains(&"::set-output name=access_token::a1".to_string()));
}
