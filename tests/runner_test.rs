use std::sync::Arc;

use prompt_runner::config::{MapSource, Settings, configure};
use prompt_runner::error::{ErrorKind, RunnerError};
use prompt_runner::model::GenerateResponse;
use prompt_runner::model::mock::{MockModel, MockProvider};
use prompt_runner::runner::PromptRunner;

fn settings() -> Settings {
    configure(
        &MapSource::new()
            .with("GOOGLE_API_KEY", "k1")
            .with("model_name", "test-model"),
    )
    .unwrap()
}

fn build(model: MockModel) -> (PromptRunner, Arc<MockModel>, Arc<MockProvider>) {
    let model = Arc::new(model);
    let provider = Arc::new(MockProvider::new(model.clone()));
    let runner = PromptRunner::new(Ok(settings()), provider.clone());
    (runner, model, provider)
}

#[tokio::test]
async fn echo_returns_trimmed_input_exactly() {
    let (runner, model, _) = build(MockModel::echo());
    for prompt in ["a", "Hello world", "multi\nline", "ünïcödé ✓", "x  y"] {
        assert_eq!(runner.generate(prompt).await.unwrap(), prompt);
    }
    assert_eq!(model.calls(), 5);
}

#[tokio::test]
async fn blank_prompts_fail_validation_without_calling_model() {
    let (runner, model, _) = build(MockModel::echo());
    for prompt in ["", " ", "\t\n", "   \r\n  "] {
        let err = runner.generate(prompt).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "prompt {prompt:?}");
    }
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn missing_credential_disables_generation_and_never_builds_handle() {
    let configuration = configure(&MapSource::new().with("model_name", "test-model"));
    assert!(configuration.is_err());

    let provider = Arc::new(MockProvider::new(Arc::new(MockModel::echo())));
    let runner = PromptRunner::new(configuration, provider.clone());

    for prompt in ["hello", "", "  ", "another"] {
        let err = runner.generate(prompt).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.is_unavailable());
    }
    assert!(runner.load_model().is_err());
    assert_eq!(provider.attempts(), 0);
}

#[tokio::test]
async fn construction_failure_is_cached_and_attempted_once() {
    let provider = Arc::new(MockProvider::failing("unknown model"));
    let runner = PromptRunner::new(Ok(settings()), provider.clone());

    let mut messages = Vec::new();
    for prompt in ["one", "two", ""] {
        let err = runner.generate(prompt).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(err.is_unavailable());
        messages.push(err.to_string());
    }
    assert!(runner.load_model().is_err());

    assert_eq!(provider.attempts(), 1);
    assert!(messages.iter().all(|m| m == &messages[0]));
    assert!(messages[0].contains("unknown model"));
}

#[tokio::test]
async fn load_model_is_idempotent() {
    let (runner, _, provider) = build(MockModel::echo());
    let a = runner.load_model().unwrap();
    let b = runner.load_model().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    runner.generate("hi").await.unwrap();
    assert_eq!(provider.attempts(), 1);
}

#[tokio::test]
async fn safety_block_reason_is_reported() {
    let (runner, _, _) = build(MockModel::respond(GenerateResponse::blocked("SAFETY")));
    let err = runner.generate("something").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContentBlocked);
    assert!(err.to_string().contains("SAFETY"));
    match err {
        RunnerError::ContentBlocked { reason } => assert_eq!(reason, "SAFETY"),
        other => panic!("expected ContentBlocked, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_response_without_reason_is_generation_error() {
    let (runner, _, _) = build(MockModel::respond(GenerateResponse::default()));
    let err = runner.generate("something").await.unwrap_err();
    assert!(matches!(err, RunnerError::EmptyResponse));
    assert_eq!(err.kind(), ErrorKind::Generation);
}

#[tokio::test]
async fn transport_failure_is_wrapped() {
    let (runner, model, _) = build(MockModel::failing("connection reset"));
    let err = runner.generate("hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generation);
    assert!(err.to_string().contains("connection reset"));
    assert!(matches!(err, RunnerError::Generation(_)));
    // no retry
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn trims_prompt_before_sending() {
    let (runner, model, provider) = build(MockModel::respond(GenerateResponse::text("Hi there")));
    let text = runner.generate("  Hello world  ").await.unwrap();
    assert_eq!(text, "Hi there");
    assert_eq!(model.prompts(), vec!["Hello world"]);

    let seen = provider.last_settings().unwrap();
    assert_eq!(seen.model_name, "test-model");
    assert_eq!(seen.credential.expose(), "k1");
}

#[tokio::test]
async fn concurrent_requests_share_one_handle() {
    let model = Arc::new(MockModel::echo());
    let provider = Arc::new(MockProvider::new(model.clone()));
    let runner = Arc::new(PromptRunner::new(Ok(settings()), provider.clone()));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let runner = runner.clone();
        tasks.push(tokio::spawn(async move {
            runner.generate(&format!("prompt {i}")).await
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), format!("prompt {i}"));
    }
    assert_eq!(provider.attempts(), 1);
    assert_eq!(model.calls(), 8);
}
