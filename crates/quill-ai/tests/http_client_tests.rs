//! HTTP clients against a local stand-in server

use std::time::Duration;

use axum::extract::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use quill_ai::{
    AiAction, AiError, AiFunction, AiRequest, ChatCompletionsGateway, HttpAiFunction,
    HttpTranscriber, RewriteStyle, Transcriber, PAYMENT_REQUIRED_MESSAGE, RATE_LIMIT_MESSAGE,
};
use serde_json::{json, Value};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    Json(json!({
        "result": format!(
            "{} {} {}",
            auth,
            body["action"].as_str().unwrap_or(""),
            body["text"].as_str().unwrap_or("")
        )
    }))
}

async fn rate_limited() -> (StatusCode, Json<Value>) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({"error": RATE_LIMIT_MESSAGE})),
    )
}

async fn out_of_credits() -> (StatusCode, Json<Value>) {
    (
        StatusCode::PAYMENT_REQUIRED,
        Json(json!({"error": PAYMENT_REQUIRED_MESSAGE})),
    )
}

async fn bad_action() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Invalid action"})),
    )
}

fn client(base: &str, path: &str) -> HttpAiFunction {
    HttpAiFunction::new(
        format!("{}{}", base, path),
        Some("secret".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_function_success_sends_bearer_and_action() {
    let base = spawn(Router::new().route("/ai-writer", post(echo))).await;
    let ai = client(&base, "/ai-writer");

    let request = AiRequest::new(AiAction::Rewrite(RewriteStyle::Dialogue)).with_text("hi");
    let result = ai.invoke(&request).await.unwrap();
    assert_eq!(result, "Bearer secret rewrite-dialogue hi");
}

#[tokio::test]
async fn test_function_error_statuses() {
    let base = spawn(
        Router::new()
            .route("/limited", post(rate_limited))
            .route("/credits", post(out_of_credits))
            .route("/invalid", post(bad_action)),
    )
    .await;
    let request = AiRequest::new(AiAction::Summarize).with_text("x");

    let err = client(&base, "/limited").invoke(&request).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.user_message(), RATE_LIMIT_MESSAGE);

    let err = client(&base, "/credits").invoke(&request).await.unwrap_err();
    assert!(matches!(err, AiError::PaymentRequired { .. }));

    let err = client(&base, "/invalid").invoke(&request).await.unwrap_err();
    assert_eq!(
        err,
        AiError::Api {
            status: 500,
            message: "Invalid action".to_string()
        }
    );
}

#[tokio::test]
async fn test_unreachable_function_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ai = client(&format!("http://{}", addr), "/ai-writer");
    let err = ai
        .invoke(&AiRequest::new(AiAction::Chat).with_prompt("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Network(_)));
    assert_eq!(err.user_message(), "AI operation failed");
}

async fn completions(Json(body): Json<Value>) -> Json<Value> {
    let messages = body["messages"].as_array().cloned().unwrap_or_default();
    let system = messages[0]["content"].as_str().unwrap_or("").to_string();
    let user = messages[1]["content"].as_str().unwrap_or("").to_string();
    Json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": format!(
                    "{}|{}|{}|{}",
                    body["model"],
                    body["stream"],
                    !system.is_empty(),
                    user
                )
            }
        }]
    }))
}

#[tokio::test]
async fn test_gateway_renders_prompts() {
    let base = spawn(Router::new().route("/v1/chat/completions", post(completions))).await;
    let gateway = ChatCompletionsGateway::new(
        format!("{}/v1/chat/completions", base),
        None,
        "test-model",
        Duration::from_secs(5),
    )
    .unwrap();

    let reply = gateway
        .invoke(&AiRequest::new(AiAction::Summarize).with_text("The end."))
        .await
        .unwrap();
    assert_eq!(
        reply,
        "\"test-model\"|false|true|Summarize this chapter:\n\nThe end."
    );
}

#[tokio::test]
async fn test_gateway_status_messages() {
    let base = spawn(
        Router::new()
            .route("/limited", post(|| async { StatusCode::TOO_MANY_REQUESTS }))
            .route("/broken", post(|| async { StatusCode::BAD_GATEWAY })),
    )
    .await;
    let request = AiRequest::new(AiAction::Autocomplete).with_context("...");

    let limited =
        ChatCompletionsGateway::new(format!("{}/limited", base), None, "m", Duration::from_secs(5))
            .unwrap();
    assert_eq!(
        limited.invoke(&request).await.unwrap_err().user_message(),
        RATE_LIMIT_MESSAGE
    );

    let broken =
        ChatCompletionsGateway::new(format!("{}/broken", base), None, "m", Duration::from_secs(5))
            .unwrap();
    assert_eq!(
        broken.invoke(&request).await.unwrap_err().user_message(),
        "AI Gateway error: 502"
    );
}

#[tokio::test]
async fn test_transcriber_round_trip() {
    async fn transcribe(Json(body): Json<Value>) -> Json<Value> {
        let audio = body["audio"].as_str().unwrap_or("");
        Json(json!({ "text": format!("heard {}", audio) }))
    }
    let base = spawn(Router::new().route("/transcribe-audio", post(transcribe))).await;
    let transcriber = HttpTranscriber::new(
        format!("{}/transcribe-audio", base),
        None,
        Duration::from_secs(5),
    )
    .unwrap();

    let text = transcriber.transcribe(b"webm").await.unwrap();
    assert_eq!(text, "heard d2VibQ==");
}
