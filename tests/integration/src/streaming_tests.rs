//! Streaming delivery against mock SSE backends.

use crate::helpers::TestStack;
use switchboard_core::{CompletionParams, GatewayError};

#[tokio::test]
async fn openai_stream_delivers_chunks_in_order() {
    let stack = TestStack::ready().await;
    stack
        .openai
        .mock_streaming_response("gpt-4o-mini", vec!["Hel", "lo", " world"])
        .await;

    let mut collected = Vec::new();
    stack
        .gateway
        .execute_streaming_completion(
            "openai",
            "Say hello",
            CompletionParams::new(),
            Some("streamer"),
            |chunk| collected.push(chunk),
        )
        .await
        .expect("stream");

    let text: String = collected.iter().map(|c| c.delta.as_str()).collect();
    assert_eq!(text, "Hello world");
    assert!(collected.last().expect("chunks").is_final());

    let samples = stack.sink.recent();
    assert_eq!(samples.len(), 1);
    assert!(samples[0].success);
    assert!(samples[0].time_to_first_chunk_ms.is_some());
    assert_eq!(samples[0].caller_id.as_deref(), Some("streamer"));
}

#[tokio::test]
async fn anthropic_stream_delivers_chunks_in_order() {
    let stack = TestStack::ready().await;
    stack
        .anthropic
        .mock_streaming_response("claude-3-5-sonnet-latest", vec!["One", " two", " three"])
        .await;

    let mut collected = Vec::new();
    stack
        .gateway
        .execute_streaming_completion(
            "anthropic",
            "Count",
            CompletionParams::new(),
            None,
            |chunk| collected.push(chunk),
        )
        .await
        .expect("stream");

    let text: String = collected.iter().map(|c| c.delta.as_str()).collect();
    assert_eq!(text, "One two three");
    assert!(collected.last().expect("chunks").is_final());
}

#[tokio::test]
async fn gemini_stream_delivers_chunks_in_order() {
    let stack = TestStack::ready().await;
    stack
        .gemini
        .mock_streaming_response(vec!["Alpha", " beta", " gamma"])
        .await;

    let mut collected = Vec::new();
    stack
        .gateway
        .execute_streaming_completion(
            "gemini",
            "Recite",
            CompletionParams::new(),
            None,
            |chunk| collected.push(chunk),
        )
        .await
        .expect("stream");

    let text: String = collected.iter().map(|c| c.delta.as_str()).collect();
    assert_eq!(text, "Alpha beta gamma");
    assert!(collected.last().expect("chunks").is_final());
}

#[tokio::test]
async fn stream_open_failure_surfaces_error() {
    let stack = TestStack::ready().await;
    stack.openai.mock_server_error().await;

    let mut collected = Vec::new();
    let result = stack
        .gateway
        .execute_streaming_completion(
            "openai",
            "Say hello",
            CompletionParams::new(),
            None,
            |chunk| collected.push(chunk),
        )
        .await;

    assert!(matches!(result, Err(GatewayError::Provider { .. })));
    assert!(collected.is_empty());
}

#[tokio::test]
async fn concurrent_streams_are_independent() {
    let stack = TestStack::ready().await;
    stack
        .openai
        .mock_streaming_response("gpt-4o-mini", vec!["open", "ai"])
        .await;
    stack
        .anthropic
        .mock_streaming_response("claude-3-5-sonnet-latest", vec!["anth", "ropic"])
        .await;

    let mut openai_chunks = Vec::new();
    let mut anthropic_chunks = Vec::new();

    let (openai_result, anthropic_result) = tokio::join!(
        stack.gateway.execute_streaming_completion(
            "openai",
            "Name yourself",
            CompletionParams::new(),
            None,
            |chunk| openai_chunks.push(chunk),
        ),
        stack.gateway.execute_streaming_completion(
            "anthropic",
            "Name yourself",
            CompletionParams::new(),
            None,
            |chunk| anthropic_chunks.push(chunk),
        ),
    );

    openai_result.expect("openai stream");
    anthropic_result.expect("anthropic stream");

    let openai_text: String = openai_chunks.iter().map(|c| c.delta.as_str()).collect();
    let anthropic_text: String = anthropic_chunks.iter().map(|c| c.delta.as_str()).collect();
    assert_eq!(openai_text, "openai");
    assert_eq!(anthropic_text, "anthropic");
}
