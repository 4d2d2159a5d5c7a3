//! End-to-end gateway behavior against mock provider backends.

use crate::helpers::TestStack;
use switchboard_core::{CompletionParams, GatewayError};
use switchboard_keys::KeyStore;

#[tokio::test]
async fn initialize_with_no_credentials_reports_not_ready() {
    let stack = TestStack::new().await;
    stack.mount_all_health().await;

    assert!(!stack.gateway.initialize().await);
    assert!(!stack.gateway.is_ready());
    assert!(stack.gateway.available_providers().await.is_empty());
}

#[tokio::test]
async fn operations_before_readiness_fail_fast() {
    let stack = TestStack::new().await;

    let result = stack
        .gateway
        .execute_completion("openai", "hello", CompletionParams::new(), None)
        .await;
    assert!(matches!(result, Err(GatewayError::NotInitialized)));

    let result = stack.gateway.adapter("openai").await;
    assert!(matches!(result, Err(GatewayError::NotInitialized)));
}

#[tokio::test]
async fn initialize_skips_provider_with_failing_health_check() {
    let stack = TestStack::new().await;
    stack.openai.mock_models_list().await;
    stack.anthropic.mock_models_auth_error().await;
    stack.keys.store_key("openai", "sk-openai-test").await;
    stack.keys.store_key("anthropic", "sk-ant-test").await;

    assert!(stack.gateway.initialize().await);
    assert_eq!(stack.gateway.available_providers().await, vec!["openai"]);
}

#[tokio::test]
async fn completion_round_trip() {
    let stack = TestStack::ready().await;
    stack
        .openai
        .mock_chat_completion("gpt-4o-mini", "Hello from the mock")
        .await;

    let response = stack
        .gateway
        .execute_completion("openai", "Say hello", CompletionParams::new(), Some("tester"))
        .await
        .expect("completion");

    assert_eq!(response.text, "Hello from the mock");
    assert_eq!(response.provider, "openai");
    assert!(response.usage.is_some());
    assert!(response.raw.is_some());

    let samples = stack.sink.recent();
    assert_eq!(samples.len(), 1);
    assert!(samples[0].success);
    assert_eq!(samples[0].caller_id.as_deref(), Some("tester"));
}

#[tokio::test]
async fn completion_uses_registered_default_model() {
    let stack = TestStack::ready().await;
    // The mock only answers when the request body carries the factory
    // default model, so a response proves the gateway resolved it.
    stack
        .openai
        .mock_chat_completion_for_model("gpt-4o-mini", "default model used")
        .await;

    let response = stack
        .gateway
        .execute_completion("openai", "Say hello", CompletionParams::new(), None)
        .await
        .expect("completion");

    assert_eq!(response.text, "default model used");
    assert_eq!(response.model, "gpt-4o-mini");
}

#[tokio::test]
async fn provider_lookup_is_case_insensitive() {
    let stack = TestStack::ready().await;
    stack
        .openai
        .mock_chat_completion("gpt-4o-mini", "case folded")
        .await;

    for spelling in ["openai", "OpenAI", " OPENAI "] {
        let response = stack
            .gateway
            .execute_completion(spelling, "Say hello", CompletionParams::new(), None)
            .await
            .unwrap_or_else(|e| panic!("lookup failed for {spelling:?}: {e}"));
        assert_eq!(response.text, "case folded");
    }
}

#[tokio::test]
async fn upstream_error_surfaces_as_failure() {
    let stack = TestStack::ready().await;
    stack.openai.mock_server_error().await;

    let result = stack
        .gateway
        .execute_completion("openai", "Say hello", CompletionParams::new(), None)
        .await;

    assert!(matches!(
        result,
        Err(GatewayError::Provider {
            retryable: true,
            ..
        })
    ));

    let samples = stack.sink.recent();
    assert_eq!(samples.len(), 1);
    assert!(!samples[0].success);
}

#[tokio::test]
async fn compare_completions_returns_partial_results() {
    let stack = TestStack::ready().await;
    stack
        .openai
        .mock_chat_completion("gpt-4o-mini", "openai answer")
        .await;
    stack.gemini.mock_generate_content("gemini answer").await;
    stack.anthropic.mock_server_error().await;

    let responses = stack
        .gateway
        .compare_completions("Compare me", None, CompletionParams::new(), None)
        .await
        .expect("fan-out never fails on per-provider errors");

    assert_eq!(responses.len(), 2);
    assert_eq!(responses["openai"].text, "openai answer");
    assert_eq!(responses["gemini"].text, "gemini answer");
    assert!(!responses.contains_key("anthropic"));
}

#[tokio::test]
async fn compare_completions_with_explicit_targets() {
    let stack = TestStack::ready().await;
    stack
        .openai
        .mock_chat_completion("gpt-4o-mini", "openai answer")
        .await;

    let responses = stack
        .gateway
        .compare_completions(
            "Compare me",
            Some(vec!["openai".to_string()]),
            CompletionParams::new(),
            None,
        )
        .await
        .expect("fan-out");

    assert_eq!(responses.len(), 1);
    assert!(responses.contains_key("openai"));
}

#[tokio::test]
async fn usage_statistics_reflect_completed_calls() {
    let stack = TestStack::ready().await;
    stack
        .openai
        .mock_chat_completion("gpt-4o-mini", "counted")
        .await;

    stack
        .gateway
        .execute_completion("openai", "Say hello", CompletionParams::new(), None)
        .await
        .expect("completion");

    let stats = stack.gateway.usage_statistics().await.expect("ready");
    assert_eq!(stats.len(), 3);

    let openai = stats["openai"].expect("one recorded call");
    assert_eq!(openai.requests, 1);
    assert_eq!(openai.prompt_tokens, 10);

    // Providers that served no calls have nothing to report.
    assert!(stats["anthropic"].is_none());
    assert!(stats["gemini"].is_none());
}

#[tokio::test]
async fn available_models_lists_backend_models() {
    let stack = TestStack::ready().await;

    let models = stack
        .gateway
        .available_models("gemini")
        .await
        .expect("models");
    assert_eq!(models, vec!["gemini-1.5-flash", "gemini-1.5-pro"]);

    let models = stack
        .gateway
        .available_models("anthropic")
        .await
        .expect("models");
    assert!(models.contains(&"claude-3-5-sonnet-latest".to_string()));
}

#[tokio::test]
async fn add_and_remove_provider_lifecycle() {
    let stack = TestStack::new().await;
    stack.gemini.mock_models_list().await;

    stack
        .gateway
        .add_provider("gemini", "gm-fresh", None)
        .await
        .expect("registered");

    assert!(stack.gateway.is_ready());
    assert_eq!(stack.gateway.available_providers().await, vec!["gemini"]);
    assert_eq!(
        &*stack.keys.get_key("gemini").await.expect("stored"),
        "gm-fresh"
    );

    assert!(stack
        .gateway
        .remove_provider("gemini")
        .await
        .expect("valid id"));
    assert!(stack.gateway.available_providers().await.is_empty());
    assert!(stack.keys.get_key("gemini").await.is_none());
    assert!(!stack.gateway.is_ready());
}

#[tokio::test]
async fn add_provider_rejects_unsupported() {
    let stack = TestStack::new().await;

    let result = stack.gateway.add_provider("mistral", "key", None).await;
    assert!(matches!(
        result,
        Err(GatewayError::UnsupportedProvider { .. })
    ));
}

#[tokio::test]
async fn add_provider_health_failure_keeps_key_stored() {
    let stack = TestStack::new().await;
    stack.gemini.mock_models_auth_error().await;

    let result = stack.gateway.add_provider("gemini", "gm-kept", None).await;
    assert!(result.is_err());
    assert!(stack.gateway.available_providers().await.is_empty());
    assert_eq!(
        &*stack.keys.get_key("gemini").await.expect("kept"),
        "gm-kept"
    );
}

#[tokio::test]
async fn rotate_key_swaps_adapter_and_keeps_serving() {
    let stack = TestStack::ready().await;
    stack
        .openai
        .mock_chat_completion("gpt-4o-mini", "still serving")
        .await;

    stack
        .gateway
        .rotate_api_key("openai", "sk-rotated")
        .await
        .expect("rotation");

    assert_eq!(
        &*stack.keys.get_key("openai").await.expect("stored"),
        "sk-rotated"
    );

    let response = stack
        .gateway
        .execute_completion("openai", "Say hello", CompletionParams::new(), None)
        .await
        .expect("completion after rotation");
    assert_eq!(response.text, "still serving");
}

#[tokio::test]
async fn rotate_rolls_back_when_new_key_fails_verification() {
    let stack = TestStack::new().await;
    // One healthy health check for initialization, then the backend starts
    // rejecting the credential.
    stack.openai.mock_models_list_up_to(1).await;
    stack.openai.mock_models_auth_error().await;
    stack
        .openai
        .mock_chat_completion("gpt-4o-mini", "old adapter alive")
        .await;
    stack.keys.store_key("openai", "sk-original").await;
    assert!(stack.gateway.initialize().await);

    let result = stack.gateway.rotate_api_key("openai", "sk-bad").await;
    assert!(result.is_err());

    // The previous key is restored and the old adapter keeps serving.
    assert_eq!(
        &*stack.keys.get_key("openai").await.expect("restored"),
        "sk-original"
    );
    let response = stack
        .gateway
        .execute_completion("openai", "Say hello", CompletionParams::new(), None)
        .await
        .expect("old adapter still active");
    assert_eq!(response.text, "old adapter alive");
}

#[tokio::test]
async fn rotate_without_active_adapter_is_key_only() {
    let stack = TestStack::new().await;
    stack.keys.store_key("gemini", "gm-old").await;

    stack
        .gateway
        .rotate_api_key("gemini", "gm-new")
        .await
        .expect("key-only rotation");

    assert_eq!(
        &*stack.keys.get_key("gemini").await.expect("stored"),
        "gm-new"
    );
    assert!(!stack.gateway.is_ready());
}
