use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Raw attachment bytes handed in by the presentation layer.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Base64 image content of an inline-data wire part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

/// Encodes an attachment into the display-ready payload stored on user
/// messages. The result is a self-describing data URL the front end can
/// render directly.
pub fn to_data_url(attachment: &Attachment) -> String {
    format!(
        "data:{};base64,{}",
        attachment.mime_type,
        STANDARD.encode(&attachment.data)
    )
}

/// Converts a fresh attachment into the inline part sent with the
/// current turn.
pub fn to_inline(attachment: &Attachment) -> InlineImage {
    InlineImage {
        mime_type: attachment.mime_type.clone(),
        data: STANDARD.encode(&attachment.data),
    }
}

/// Recovers the inline part from a stored data URL. The base64 body is
/// decoded to confirm it still round-trips to the original bytes; a
/// payload that does not is rejected rather than sent.
pub fn parse_data_url(url: &str) -> Result<InlineImage, ChatError> {
    let pattern = Regex::new(r"^data:(.*?);base64,(.*)$").unwrap();

    let captures = pattern
        .captures(url)
        .ok_or_else(|| ChatError::Image("not a base64 data URL".to_string()))?;

    let mime_type = captures.get(1).map(|m| m.as_str()).unwrap_or("");
    let data = captures.get(2).map(|m| m.as_str()).unwrap_or("");

    if mime_type.is_empty() {
        return Err(ChatError::Image("missing media type".to_string()));
    }

    STANDARD
        .decode(data)
        .map_err(|e| ChatError::Image(format!("Failed to decode image data: {}", e)))?;

    Ok(InlineImage {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

/// Decodes an inline part back to raw bytes.
pub fn decode_inline(image: &InlineImage) -> Result<Vec<u8>, ChatError> {
    STANDARD
        .decode(&image.data)
        .map_err(|e| ChatError::Image(format!("Failed to decode image data: {}", e)))
}
