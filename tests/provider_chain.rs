//! Integration Tests for the Provider Chain
//!
//! These tests drive the orchestrator against mock OpenAI and Hugging Face
//! servers:
//! - a streamed dice tool round followed by a follow-up request
//! - fallback to Hugging Face after an OpenAI failure
//! - local dice answers that skip Hugging Face entirely

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slack_code_assistant::history::{PromptHistory, Turn};
use slack_code_assistant::llm::{HuggingFaceClient, OpenAiClient, PrimaryAdapter, SecondaryAdapter};
use slack_code_assistant::orchestrator::{FALLBACK_NOTICE, UNAVAILABLE_MESSAGE};
use slack_code_assistant::stream::{RecordingStream, TaskStatus};
use slack_code_assistant::Orchestrator;

fn sse(events: &[Value]) -> ResponseTemplate {
    let body: String = events
        .iter()
        .map(|event| format!("event: {}\ndata: {}\n\n", event["type"].as_str().unwrap(), event))
        .collect();
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

fn primary(server: &MockServer) -> PrimaryAdapter {
    let client = OpenAiClient::new("sk-test", "gpt-4o-mini")
        .unwrap()
        .with_api_base(format!("{}/openai", server.uri()))
        .with_request_timeout(Duration::from_secs(5));
    PrimaryAdapter::new(Arc::new(client)).with_idle_timeout(Duration::from_secs(5))
}

fn secondary(server: &MockServer) -> SecondaryAdapter {
    let client = HuggingFaceClient::new("hf-test", "test-model")
        .with_api_base(format!("{}/hf", server.uri()))
        .with_request_timeout(Duration::from_secs(5));
    SecondaryAdapter::new(Arc::new(client))
}

async fn request_bodies(server: &MockServer, endpoint: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == endpoint)
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

/// A streamed `roll_dice` call is executed and replayed to the model.
#[tokio::test]
async fn test_tool_round_then_follow_up() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/responses"))
        .respond_with(sse(&[
            json!({"type": "response.created", "response": {"id": "resp_1"}}),
            json!({"type": "response.output_text.delta", "delta": "Rolling now. "}),
            json!({
                "type": "response.output_item.done",
                "output_index": 1,
                "item": {
                    "type": "function_call",
                    "id": "fc_1",
                    "call_id": "call_1",
                    "name": "roll_dice",
                    "arguments": "{\"sides\":20,\"count\":3}"
                }
            }),
            json!({"type": "response.completed", "response": {"id": "resp_1"}}),
        ]))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/openai/responses"))
        .respond_with(sse(&[
            json!({"type": "response.output_text.delta", "delta": "Good luck!"}),
            json!({"type": "response.completed", "response": {"id": "resp_2"}}),
        ]))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(Some(primary(&server)), Some(secondary(&server)));
    let mut stream = RecordingStream::new();
    let mut history = PromptHistory::from_user_message("roll 3d20 for me");

    orchestrator.call_llm(&mut stream, &mut history).await;

    assert_eq!(stream.text(), "Rolling now. Good luck!");

    let updates = stream.task_updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].0, "call_1");
    assert!(updates[0].1.contains("3d20"));
    assert_eq!(updates[0].2, TaskStatus::InProgress);
    assert_eq!(updates[1].0, "call_1");
    assert_eq!(updates[1].2, TaskStatus::Complete);

    // user message, function call, function call output
    assert_eq!(history.len(), 3);
    assert!(matches!(
        &history.turns()[2],
        Turn::FunctionCallOutput { call_id, .. } if call_id == "call_1"
    ));

    let bodies = request_bodies(&server, "/openai/responses").await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["input"].as_array().unwrap().len(), 1);
    let follow_up = bodies[1]["input"].as_array().unwrap();
    assert_eq!(follow_up.len(), 3);
    assert_eq!(follow_up[1]["type"], "function_call");
    assert_eq!(follow_up[1]["arguments"], "{\"sides\":20,\"count\":3}");
    assert_eq!(follow_up[2]["type"], "function_call_output");
    assert_eq!(follow_up[2]["call_id"], "call_1");

    assert!(request_bodies(&server, "/hf/chat/completions").await.is_empty());
}

/// An OpenAI server error hands the request to Hugging Face.
#[tokio::test]
async fn test_openai_failure_falls_back_to_huggingface() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/responses"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hf/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Assistant: Wrap the function in a closure."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(Some(primary(&server)), Some(secondary(&server)));
    let mut stream = RecordingStream::new();
    let mut history = PromptHistory::from_user_message("how do I defer a call?");

    orchestrator.call_llm(&mut stream, &mut history).await;

    assert_eq!(
        stream.texts(),
        vec![FALLBACK_NOTICE, "💻 Wrap the function in a closure."]
    );

    let bodies = request_bodies(&server, "/hf/chat/completions").await;
    assert_eq!(bodies[0]["model"], "test-model");
    assert_eq!(bodies[0]["messages"][0]["role"], "system");
    assert_eq!(bodies[0]["messages"][1]["content"], "how do I defer a call?");
}

/// Dice requests on the fallback path never reach Hugging Face.
#[tokio::test]
async fn test_fallback_dice_skips_remote_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hf/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "unused"}}]
        })))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(None, Some(secondary(&server)));
    let mut stream = RecordingStream::new();
    let mut history = PromptHistory::from_user_message("Roll 2d6 and 1d20");

    orchestrator.call_llm(&mut stream, &mut history).await;

    let texts = stream.texts();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], FALLBACK_NOTICE);
    assert!(texts[1].starts_with("🎲 Rolled a 2d6 to total "));
    assert!(texts[1].contains(", Rolled a 1d20 to total "));
    assert!(texts[1].ends_with("\n\nAnything else I can help you with?"));
}

/// Hugging Face errors produce a canned reply, not an error.
#[tokio::test]
async fn test_both_remote_failures_give_canned_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/responses"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hf/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(Some(primary(&server)), Some(secondary(&server)));
    let mut stream = RecordingStream::new();
    let mut history = PromptHistory::from_user_message("Can you optimize this python code?");

    orchestrator.call_llm(&mut stream, &mut history).await;

    let texts = stream.texts();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], FALLBACK_NOTICE);
    assert!(
        texts[1].starts_with("⚡"),
        "expected the optimization reply, got: {}",
        texts[1]
    );
    assert!(!stream.is_stopped());
    assert_eq!(request_bodies(&server, "/hf/chat/completions").await.len(), 1);
}

/// Dice are answered locally even with no provider configured.
#[tokio::test]
async fn test_dice_without_providers() {
    let orchestrator = Orchestrator::new(None, None);
    let mut stream = RecordingStream::new();
    let mut history = PromptHistory::from_user_message("Roll 2d6 and 1d20");

    orchestrator.call_llm(&mut stream, &mut history).await;

    let texts = stream.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[1].starts_with("🎲 Rolled a 2d6 to total "));
    assert!(!texts.contains(&UNAVAILABLE_MESSAGE));
}

/// Without a fallback provider a failed primary leaves exactly one
/// unavailability message.
#[tokio::test]
async fn test_no_fallback_gives_unavailable_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/responses"))
        .respond_with(sse(&[json!({"type": "error", "message": "rate limited"})]))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(Some(primary(&server)), None);
    let mut stream = RecordingStream::new();
    let mut history = PromptHistory::from_user_message("hi");

    orchestrator.call_llm(&mut stream, &mut history).await;

    let texts = stream.texts();
    assert_eq!(
        texts.iter().filter(|text| **text == UNAVAILABLE_MESSAGE).count(),
        1
    );
}
