//! Request and response bodies.

use crate::messaging::MessageId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextRequest {
    pub phone: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFileRequest {
    pub phone: Option<String>,
    pub file_url: Option<String>,
    pub filename: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendImageRequest {
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPdfRequest {
    pub phone: Option<String>,
    pub html_url: Option<String>,
    pub filename: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePdfRequest {
    pub html_url: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// `ready` or `not_ready`
    pub status: &'static str,
    #[serde(rename = "qrCode")]
    pub qr_code: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QrResponse {
    Code { qr: String },
    Status { status: &'static str },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message_id: String,
}

impl From<MessageId> for SendResponse {
    fn from(id: MessageId) -> Self {
        Self {
            success: true,
            message_id: id.0,
        }
    }
}

/// A field counts as present only when it is a non-empty string.
pub(super) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
