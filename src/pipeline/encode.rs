//! Image encoding: [`ImagePayload`] → base64 `inlineData` part.
//!
//! Gemini accepts images inline in the JSON request body as base64 with a
//! MIME type. The bytes are forwarded untouched: no re-encoding, no resizing.

use crate::pipeline::input::ImagePayload;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The `inlineData` object of a Gemini content part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Base64-wrap a payload for the request body.
pub fn encode_image(payload: &ImagePayload) -> InlineData {
    let b64 = STANDARD.encode(&payload.data);
    debug!("Encoded image → {} bytes base64", b64.len());

    InlineData {
        mime_type: payload.mime_type.clone(),
        data: b64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_mime_and_bytes() {
        let payload = ImagePayload::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]);
        let data = encode_image(&payload);
        assert_eq!(data.mime_type, "image/jpeg");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, payload.data);
    }

    #[test]
    fn wire_field_names() {
        let data = encode_image(&ImagePayload::from_bytes(b"abc".to_vec()));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["mimeType"], "image/jpeg");
        assert_eq!(json["data"], "YWJj");
    }
}
