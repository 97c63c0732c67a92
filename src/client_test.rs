use super::*;
use crate::config::{ClientConfig, Timeouts};
use crate::model::Orientation;
use crate::session::CancelToken;

fn generate(id: &str) -> RequestPayload {
    RequestPayload::Generate(GenerateRequest {
        diagram_id: id.into(),
        diagram_description: "x".into(),
        license_key: String::new(),
        model: Model::Gpt3,
    })
}

fn config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.into(),
        license_key: "lic".into(),
        model: Model::Gpt4,
        orientation: Orientation::LeftRight,
        timeouts: Timeouts { request_secs: 5, connect_secs: 1 },
    }
}

#[test]
fn generate_payload_shape() {
    let payload = RequestPayload::Generate(GenerateRequest {
        diagram_id: "d1".into(),
        diagram_description: "a login flow".into(),
        license_key: "lic".into(),
        model: Model::Gpt3,
    });
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "action": "generate",
            "data": {
                "diagramId": "d1",
                "diagramDescription": "a login flow",
                "licenseKey": "lic",
                "model": "gpt3",
            }
        })
    );
    assert_eq!(payload.diagram_id(), "d1");
    assert_eq!(payload.action(), "generate");
}

#[test]
fn modify_payload_carries_current_diagram() {
    let edges = crate::stream::sample_sign_up_flow();
    let payload = RequestPayload::Modify(ModifyRequest {
        diagram_id: "d2".into(),
        diagram_node_id: "start".into(),
        diagram_data: edges.clone(),
        instructions: "add a captcha".into(),
        license_key: "lic".into(),
        model: Model::Gpt4,
    });
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["action"], "modify");
    assert_eq!(json["data"]["diagramId"], "d2");
    assert_eq!(json["data"]["diagramNodeId"], "start");
    assert_eq!(json["data"]["instructions"], "add a captcha");
    assert_eq!(json["data"]["model"], "gpt4");
    assert_eq!(json["data"]["diagramData"].as_array().unwrap().len(), edges.len());
}

#[test]
fn model_parsing() {
    assert_eq!("gpt3".parse::<Model>().unwrap(), Model::Gpt3);
    assert_eq!("GPT4".parse::<Model>().unwrap(), Model::Gpt4);
    assert!("claude".parse::<Model>().is_err());
    assert_eq!(Model::Gpt4.to_string(), "gpt4");
}

#[test]
fn endpoint_joins_base_url_and_path() {
    let client = DiagramClient::new(&config("http://127.0.0.1:9")).unwrap();
    assert_eq!(client.endpoint(), "http://127.0.0.1:9/api/gptStreaming");
}

#[tokio::test]
async fn unreachable_upstream_surfaces_as_request_error() {
    // Port 9 (discard) is closed on test hosts; the connect fails fast.
    let client = DiagramClient::new(&config("http://127.0.0.1:9")).unwrap();
    let mut source = client.open(&generate("d"), &CancelToken::new()).await;
    let err = source.next_chunk().await.unwrap_err();
    assert!(matches!(err, TransportError::Request(_)));
    assert!(err.user_message().unwrap().starts_with("Server error: "));
    assert_eq!(source.next_chunk().await.unwrap(), None);
}

#[tokio::test]
async fn cancel_while_waiting_for_headers_aborts_the_request() {
    // Accepts the connection and never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let silent = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        std::future::pending::<()>().await;
        drop(socket);
    });

    let client = DiagramClient::new(&config(&format!("http://{addr}"))).unwrap();
    let token = CancelToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let mut source = tokio::time::timeout(std::time::Duration::from_secs(2), client.open(&generate("d"), &token))
        .await
        .unwrap();
    let err = source.next_chunk().await.unwrap_err();
    assert!(matches!(err, TransportError::Aborted));
    assert_eq!(err.user_message(), None);
    silent.abort();
}

#[tokio::test]
async fn already_cancelled_token_never_sends() {
    let client = DiagramClient::new(&config("http://127.0.0.1:9")).unwrap();
    let token = CancelToken::new();
    token.cancel();
    let mut source = client.open(&generate("d"), &token).await;
    assert!(matches!(source.next_chunk().await.unwrap_err(), TransportError::Aborted));
    assert_eq!(source.next_chunk().await.unwrap(), None);
}
