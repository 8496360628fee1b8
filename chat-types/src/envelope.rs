//! Envelope - the `{ status, data }` wrapper around every backend response.

use serde::Deserialize;

use crate::{RemoteMessage, WireError};

/// Response wrapper used by every chat endpoint.
///
/// `status: false` means the backend rejected the request even though the
/// HTTP status was 2xx; `message` then carries its explanation.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the backend accepted the request.
    pub status: bool,
    /// Payload, present on success.
    pub data: Option<T>,
    /// Human-readable explanation, usually present on rejection.
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload of an accepted response.
    pub fn into_data(self) -> Result<T, WireError> {
        if !self.status {
            return Err(WireError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            });
        }
        self.data.ok_or(WireError::MissingData)
    }
}

impl<T: serde::de::DeserializeOwned> ApiEnvelope<T> {
    /// Parse an envelope from a JSON response body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(bytes).map_err(WireError::Json)
    }
}

/// Payload of the fetch-page response.
#[derive(Debug, Clone, Deserialize)]
pub struct PageData {
    /// Messages, newest first.
    #[serde(default)]
    pub messages: Vec<RemoteMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageId;

    #[test]
    fn accepted_page_unwraps_messages() {
        let body = br#"{
            "status": true,
            "data": { "messages": [
                { "id": 2, "chat_id": 1, "sender_id": 1, "content": "b", "created_at": "2024-01-01T00:00:02Z" },
                { "id": 1, "chat_id": 1, "sender_id": 1, "content": "a", "created_at": "2024-01-01T00:00:01Z" }
            ] }
        }"#;

        let page = ApiEnvelope::<PageData>::from_slice(body)
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].id, MessageId::remote("2"));
    }

    #[test]
    fn rejected_envelope_carries_message() {
        let body = br#"{ "status": false, "message": "content empty" }"#;
        let err = ApiEnvelope::<PageData>::from_slice(body)
            .unwrap()
            .into_data()
            .unwrap_err();
        assert!(matches!(err, WireError::Rejected { ref message } if message == "content empty"));
    }

    #[test]
    fn accepted_envelope_without_data_is_an_error() {
        let body = br#"{ "status": true }"#;
        let err = ApiEnvelope::<PageData>::from_slice(body)
            .unwrap()
            .into_data()
            .unwrap_err();
        assert!(matches!(err, WireError::MissingData));
    }

    #[test]
    fn empty_page_is_valid() {
        let body = br#"{ "status": true, "data": {} }"#;
        let page = ApiEnvelope::<PageData>::from_slice(body)
            .unwrap()
            .into_data()
            .unwrap();
        assert!(page.messages.is_empty());
    }

    #[test]
    fn malformed_body_is_json_error() {
        let err = ApiEnvelope::<PageData>::from_slice(b"<html>").unwrap_err();
        assert!(matches!(err, WireError::Json(_)));
    }
}
