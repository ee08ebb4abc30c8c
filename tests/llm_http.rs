//! HTTP contract tests for the language-model collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use orion::llm::{CloudInterpreter, CommandInterpreter, LanguageModel, OllamaClient, PromptContext};
use orion::resolver::parse_command;
use orion::{Intent, OrionError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context() -> PromptContext {
    PromptContext {
        now: NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
        preferences: BTreeMap::from([("home_city".to_owned(), "Oslo".to_owned())]),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_chat_is_non_streaming_and_trimmed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "llama3", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": "  Good afternoon.\n"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let reply = tokio::task::spawn_blocking(move || {
        OllamaClient::with_endpoint(&format!("{uri}/"), "llama3", Duration::from_secs(5))
            .complete("be brief", "hello")
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(reply, "Good afternoon.");
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_server_error_is_an_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        OllamaClient::with_endpoint(&uri, "llama3", Duration::from_secs(5)).complete("s", "u")
    })
    .await
    .unwrap();
    assert!(matches!(result, Err(OrionError::Llm(_))), "{result:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn cloud_interpreter_sends_preferences_and_unwraps_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .and(body_partial_json(json!({
            "text": "weather at home",
            "memory": {"home_city": "Oslo"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"intent": "get_weather", "args": {}, "reply": "Checking."}
        })))
        .mount(&server)
        .await;

    let url = format!("{}/interpret", server.uri());
    let raw = tokio::task::spawn_blocking(move || {
        CloudInterpreter::with_endpoint(&url, Duration::from_secs(5))
            .interpret("weather at home", &context())
    })
    .await
    .unwrap()
    .unwrap();

    let command = parse_command(&raw).unwrap();
    assert_eq!(command.intent, Intent::GetWeather);
    assert_eq!(command.reply, "Checking.");
}

#[tokio::test(flavor = "multi_thread")]
async fn cloud_interpreter_passes_string_results_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interpret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "{\"intent\":\"list_notes\",\"args\":{},\"reply\":\"\"}"
        })))
        .mount(&server)
        .await;

    let url = format!("{}/interpret", server.uri());
    let raw = tokio::task::spawn_blocking(move || {
        CloudInterpreter::with_endpoint(&url, Duration::from_secs(5)).interpret("notes", &context())
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(parse_command(&raw).unwrap().intent, Intent::ListNotes);
}
