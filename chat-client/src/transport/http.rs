//! HTTP transport for the chat backend.
//!
//! Every operation is a JSON `POST` with a bearer token. Responses use the
//! `{ status, data, message }` envelope; failures are classified into
//! [`TransportError`] variants here so the controller only sees kinds.

use async_trait::async_trait;
use chat_types::{
    ApiEnvelope, ConversationId, FetchPageRequest, MarkReadRequest, Message, PageData,
    RemoteMessage, SendMessageRequest, WireError,
};
use reqwest::StatusCode;
use serde::Serialize;

use super::{ConversationTransport, TransportError};
use crate::config::ClientConfig;
use crate::session::Credential;

/// Which operation a response belongs to; classification differs for send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    FetchPage,
    SendMessage,
    MarkRead,
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Create a transport for the configured backend.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// POST a JSON body; returns the status and body of a 2xx response.
    async fn post<B: Serialize + Sync>(
        &self,
        operation: Operation,
        path: &str,
        credential: &Credential,
        body: &B,
    ) -> Result<(StatusCode, Vec<u8>), TransportError> {
        let response = self
            .client
            .post(self.config.url(path))
            .bearer_auth(credential.token())
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            return Err(classify_status(operation, status, body));
        }

        tracing::trace!(?operation, status = status.as_u16(), "response received");
        Ok((status, bytes.to_vec()))
    }
}

/// Classify a non-2xx response.
fn classify_status(operation: Operation, status: StatusCode, body: String) -> TransportError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Auth(body),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
            if operation == Operation::SendMessage =>
        {
            TransportError::Validation(body)
        }
        _ => TransportError::Server {
            status: status.as_u16(),
            body,
        },
    }
}

/// Classify a 2xx response whose envelope could not be unwrapped.
fn classify_envelope(operation: Operation, status: StatusCode, error: WireError) -> TransportError {
    match error {
        WireError::Rejected { message } if operation == Operation::SendMessage => {
            TransportError::Validation(message)
        }
        other => TransportError::Server {
            status: status.as_u16(),
            body: other.to_string(),
        },
    }
}

fn unwrap_envelope<T: serde::de::DeserializeOwned>(
    operation: Operation,
    status: StatusCode,
    body: &[u8],
) -> Result<T, TransportError> {
    ApiEnvelope::<T>::from_slice(body)
        .and_then(ApiEnvelope::into_data)
        .map_err(|e| classify_envelope(operation, status, e))
}

#[async_trait]
impl ConversationTransport for HttpTransport {
    async fn fetch_page(
        &self,
        credential: &Credential,
        conversation: &ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, TransportError> {
        let request = FetchPageRequest {
            chat_id: conversation.clone(),
            limit,
            offset,
        };
        let (status, body) = self
            .post(
                Operation::FetchPage,
                &self.config.endpoints.fetch_page,
                credential,
                &request,
            )
            .await?;

        let page: PageData = unwrap_envelope(Operation::FetchPage, status, &body)?;
        Ok(page.messages.into_iter().map(Message::from).collect())
    }

    async fn send_message(
        &self,
        credential: &Credential,
        conversation: &ConversationId,
        content: &str,
    ) -> Result<Message, TransportError> {
        let request = SendMessageRequest::text(conversation.clone(), content);
        let (status, body) = self
            .post(
                Operation::SendMessage,
                &self.config.endpoints.send_message,
                credential,
                &request,
            )
            .await?;

        let message: RemoteMessage = unwrap_envelope(Operation::SendMessage, status, &body)?;
        Ok(message.into())
    }

    async fn mark_read(
        &self,
        credential: &Credential,
        conversation: &ConversationId,
    ) -> Result<(), TransportError> {
        let request = MarkReadRequest {
            chat_id: conversation.clone(),
        };
        self.post(
            Operation::MarkRead,
            &self.config.endpoints.mark_read,
            credential,
            &request,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::MessageId;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(ClientConfig::default().with_base_url(&server.uri())).unwrap()
    }

    fn credential() -> Credential {
        Credential::new("tok-123")
    }

    fn chat() -> ConversationId {
        ConversationId::new("c1")
    }

    fn remote(id: u64, at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "chat_id": "c1",
            "sender_id": "u2",
            "content": format!("message {}", id),
            "type": "text",
            "created_at": at
        })
    }

    // ===========================================
    // Fetch Page Tests
    // ===========================================

    #[tokio::test]
    async fn fetch_page_posts_body_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/messages"))
            .and(header("authorization", "Bearer tok-123"))
            .and(body_json(json!({ "chat_id": "c1", "limit": 20, "offset": 40 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": { "messages": [
                    remote(2, "2024-03-01T10:01:00Z"),
                    remote(1, "2024-03-01T10:00:00Z")
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = transport_for(&server)
            .fetch_page(&credential(), &chat(), 20, 40)
            .await
            .unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, MessageId::remote("2"), "remote order is kept");
        assert!(page.iter().all(|m| m.is_confirmed()));
    }

    #[tokio::test]
    async fn fetch_page_rejected_envelope_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": false, "message": "no such chat" })),
            )
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .fetch_page(&credential(), &chat(), 20, 0)
            .await
            .unwrap_err();

        assert!(
            matches!(err, TransportError::Server { status: 200, ref body } if body.contains("no such chat")),
            "got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .fetch_page(&credential(), &chat(), 20, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Server { status: 200, .. }));
    }

    // ===========================================
    // Classification Tests
    // ===========================================

    #[tokio::test]
    async fn unauthorized_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .fetch_page(&credential(), &chat(), 20, 0)
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::Auth("token expired".into()));
    }

    #[tokio::test]
    async fn forbidden_send_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .send_message(&credential(), &chat(), "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Auth(_)));
    }

    #[tokio::test]
    async fn bad_request_on_send_is_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("content too long"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .send_message(&credential(), &chat(), "hi")
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::Validation("content too long".into()));
    }

    #[tokio::test]
    async fn bad_request_on_fetch_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad offset"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .fetch_page(&credential(), &chat(), 20, 0)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransportError::Server {
                status: 400,
                body: "bad offset".into()
            }
        );
    }

    #[tokio::test]
    async fn internal_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .mark_read(&credential(), &chat())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransportError::Server {
                status: 503,
                body: "maintenance".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        // Nothing listens on port 1
        let config = ClientConfig::default().with_base_url("http://127.0.0.1:1");
        let transport = HttpTransport::new(config).unwrap();

        let err = transport
            .fetch_page(&credential(), &chat(), 20, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Network(_)));
    }

    // ===========================================
    // Send / Mark Read Tests
    // ===========================================

    #[tokio::test]
    async fn send_posts_text_body_and_returns_confirmed_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/send"))
            .and(header("authorization", "Bearer tok-123"))
            .and(body_json(json!({ "chat_id": "c1", "content": "hello", "type": "text" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "status": true,
                "data": {
                    "_id": "m-77",
                    "chat_id": "c1",
                    "sender_id": "me",
                    "content": "hello",
                    "sent_at": "2024-03-01T10:02:00Z"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let message = transport_for(&server)
            .send_message(&credential(), &chat(), "hello")
            .await
            .unwrap();

        assert_eq!(message.id, MessageId::remote("m-77"));
        assert!(message.is_confirmed());
        assert!(message.sent_at.is_some());
    }

    #[tokio::test]
    async fn send_rejected_envelope_is_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": false, "message": "blocked word" })),
            )
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .send_message(&credential(), &chat(), "hi")
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::Validation("blocked word".into()));
    }

    #[tokio::test]
    async fn mark_read_ignores_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/read"))
            .and(body_json(json!({ "chat_id": "c1" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        transport_for(&server)
            .mark_read(&credential(), &chat())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn custom_endpoint_paths_are_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/read"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = ClientConfig::default().with_base_url(&server.uri());
        config.endpoints.mark_read = "/api/v2/read".to_string();
        let transport = HttpTransport::new(config).unwrap();

        transport.mark_read(&credential(), &chat()).await.unwrap();
    }
}
