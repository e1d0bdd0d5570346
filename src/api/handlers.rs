//! HTTP handlers.
//!
//! Sending endpoints check session readiness before looking at their fields,
//! so a disconnected session answers 503 to every send. Upstream failures are
//! logged and returned as 500 with the upstream message.

use super::AppState;
use super::types::*;
use crate::error::ApiError;
use crate::fetch::file_name_from_url;
use crate::messaging::{self, MediaPayload, OutboundMessage};
use crate::phone::RecipientId;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use std::fmt::Display;

const DEFAULT_FILE_NAME: &str = "document";
const DEFAULT_IMAGE_NAME: &str = "image";
const PDF_MIME: &str = "application/pdf";

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.session.status();
    Json(StatusResponse {
        status: if status.ready { "ready" } else { "not_ready" },
        qr_code: status.pending_pairing_code.is_some(),
    })
}

pub async fn qr(State(state): State<AppState>) -> Json<QrResponse> {
    let status = state.session.status();
    let body = if status.ready {
        QrResponse::Status {
            status: "already_connected",
        }
    } else if let Some(code) = status.pending_pairing_code {
        QrResponse::Code { qr: code }
    } else {
        QrResponse::Status {
            status: "waiting_for_qr",
        }
    };
    Json(body)
}

pub async fn send_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SendResponse>, ApiError> {
    let req: SendTextRequest = parse_body(&headers, &body)?;
    ensure_ready(&state)?;
    let (Some(phone), Some(text)) = (present(&req.phone), present(&req.text)) else {
        return Err(ApiError::Validation("phone and text are required".to_string()));
    };

    let to = RecipientId::normalize(phone);
    deliver(&state, &to, OutboundMessage::Text(text.to_string()), "text").await
}

pub async fn send_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SendResponse>, ApiError> {
    let req: SendFileRequest = parse_body(&headers, &body)?;
    ensure_ready(&state)?;
    let (Some(phone), Some(file_url)) = (present(&req.phone), present(&req.file_url)) else {
        return Err(ApiError::Validation("phone and fileUrl are required".to_string()));
    };

    let to = RecipientId::normalize(phone);
    let content = state
        .fetcher
        .fetch(file_url)
        .await
        .map_err(|e| upstream("downloading file", e))?;

    let media = MediaPayload {
        data: content.bytes,
        mime_type: content.content_type,
        file_name: present(&req.filename).unwrap_or(DEFAULT_FILE_NAME).to_string(),
        caption: req.caption.unwrap_or_default(),
    };
    deliver(&state, &to, OutboundMessage::Media(media), "file").await
}

pub async fn send_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SendResponse>, ApiError> {
    let req: SendImageRequest = parse_body(&headers, &body)?;
    ensure_ready(&state)?;
    let (Some(phone), Some(image_url)) = (present(&req.phone), present(&req.image_url)) else {
        return Err(ApiError::Validation("phone and imageUrl are required".to_string()));
    };

    let to = RecipientId::normalize(phone);
    let content = state
        .fetcher
        .fetch(image_url)
        .await
        .map_err(|e| upstream("downloading image", e))?;

    let media = MediaPayload {
        data: content.bytes,
        mime_type: content.content_type,
        file_name: file_name_from_url(image_url).unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string()),
        caption: req.caption.unwrap_or_default(),
    };
    deliver(&state, &to, OutboundMessage::Media(media), "image").await
}

pub async fn send_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SendResponse>, ApiError> {
    let req: SendPdfRequest = parse_body(&headers, &body)?;
    ensure_ready(&state)?;
    let (Some(phone), Some(html_url)) = (present(&req.phone), present(&req.html_url)) else {
        return Err(ApiError::Validation("phone and htmlUrl are required".to_string()));
    };

    let to = RecipientId::normalize(phone);
    let document = state
        .renderer
        .render(html_url, present(&req.filename))
        .await
        .map_err(|e| upstream("generating PDF", e))?;

    let media = MediaPayload {
        data: document.bytes,
        mime_type: PDF_MIME.to_string(),
        file_name: document.file_name,
        caption: req.caption.unwrap_or_default(),
    };
    deliver(&state, &to, OutboundMessage::Media(media), "PDF").await
}

pub async fn generate_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: GeneratePdfRequest = parse_body(&headers, &body)?;
    let Some(html_url) = present(&req.html_url) else {
        return Err(ApiError::Validation("htmlUrl is required".to_string()));
    };

    let document = state
        .renderer
        .render(html_url, present(&req.filename))
        .await
        .map_err(|e| upstream("generating PDF", e))?;

    let disposition = content_disposition(&document.file_name)?;
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(PDF_MIME)),
            (CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}

/// A body that is blank or not declared as JSON is treated as `{}`.
fn parse_body<T: DeserializeOwned + Default>(
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<T, ApiError> {
    if !is_json(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("invalid JSON body: {}", e)))
}

/// `application/json` or any `+json` suffix type, parameters ignored.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn ensure_ready(state: &AppState) -> Result<(), ApiError> {
    if state.session.is_ready() {
        Ok(())
    } else {
        Err(ApiError::NotReady)
    }
}

async fn deliver(
    state: &AppState,
    to: &RecipientId,
    message: OutboundMessage,
    what: &str,
) -> Result<Json<SendResponse>, ApiError> {
    let id = messaging::deliver(state.messenger.as_ref(), to, message)
        .await
        .map_err(|e| upstream(&format!("sending {}", what), e))?;
    Ok(Json(id.into()))
}

/// Log an upstream failure and convert it into a 500.
fn upstream<E>(action: &str, e: E) -> ApiError
where
    E: Display + Into<ApiError>,
{
    tracing::error!("Error {}: {}", action, e);
    e.into()
}

fn content_disposition(file_name: &str) -> Result<HeaderValue, ApiError> {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .map_err(|e| ApiError::Upstream(format!("invalid filename: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_parse_body_empty_is_default() {
        let headers = json_headers("application/json");
        let req: SendTextRequest = parse_body(&headers, &Bytes::new()).unwrap();
        assert!(req.phone.is_none() && req.text.is_none());

        let req: SendTextRequest = parse_body(&headers, &Bytes::from_static(b"  \n")).unwrap();
        assert!(req.phone.is_none());
    }

    #[test]
    fn test_parse_body_malformed_is_validation_error() {
        let headers = json_headers("application/json; charset=utf-8");
        let err = parse_body::<SendTextRequest>(&headers, &Bytes::from_static(b"{not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_parse_body_ignores_non_json_content() {
        let body = Bytes::from_static(br#"{"phone":"1","text":"hi"}"#);

        let req: SendTextRequest = parse_body(&json_headers("text/plain"), &body).unwrap();
        assert!(req.phone.is_none() && req.text.is_none());

        let req: SendTextRequest = parse_body(&HeaderMap::new(), &body).unwrap();
        assert!(req.phone.is_none());

        let req: SendTextRequest = parse_body(&json_headers("Application/JSON"), &body).unwrap();
        assert_eq!(req.text.as_deref(), Some("hi"));

        let req: SendTextRequest =
            parse_body(&json_headers("application/vnd.api+json"), &body).unwrap();
        assert_eq!(req.phone.as_deref(), Some("1"));
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        let header = content_disposition("report \"final\".pdf").unwrap();
        assert_eq!(
            header.to_str().unwrap(),
            "attachment; filename=\"report _final_.pdf\""
        );
        let header = content_disposition("a\r\nb.pdf").unwrap();
        assert_eq!(header.to_str().unwrap(), "attachment; filename=\"a__b.pdf\"");
    }
}
