//! Image bridge: multipart upload to a folder.
//!
//! # Data Flow
//! ```text
//! multipart/form-data request
//!     → declared Content-Length checked against the upload limit plus framing headroom
//!     → fields streamed: folder, fileName, file (file bytes counted against the upload limit)
//!     → UploadRequest{folder, fileName, content, contentType}
//!     → ImageService::upload_to_folder
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{FromRequest, Multipart};
use axum::http::{header, Method, StatusCode};

use crate::bridge::{BridgeAdapter, BridgeCall, RouteSpec};
use crate::error::GatewayError;
use crate::http::request::InboundRequest;
use crate::http::response::{json_ok, OutboundResult};
use crate::resilience::call_with_deadline;
use crate::security::limits;
use crate::upstream::proto::UploadRequest;
use crate::upstream::{BackendKind, ImageService};

pub const UPLOAD_TO_FOLDER: &str = "Image_UploadToFolder";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Limit for each non-file part (folder, fileName, anything unrecognised).
const MAX_TEXT_FIELD_BYTES: usize = 8 * 1024;

/// Allowance over the file limit for boundaries, part headers and text fields.
const MULTIPART_FRAMING_BYTES: usize = 64 * 1024;

/// The uploaded file part.
#[derive(Debug)]
struct FilePart {
    original_name: Option<String>,
    content_type: Option<String>,
    content: Vec<u8>,
}

pub struct ImageAdapter {
    service: Arc<dyn ImageService>,
    max_upload_bytes: usize,
}

impl ImageAdapter {
    pub fn new(service: Arc<dyn ImageService>, max_upload_bytes: usize) -> Self {
        Self {
            service,
            max_upload_bytes,
        }
    }

    async fn translate(&self, request: InboundRequest) -> Result<UploadRequest, GatewayError> {
        let is_multipart = request
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);
        if !is_multipart {
            return Err(GatewayError::translation("Content-Type must be multipart/form-data"));
        }

        limits::check_content_length(
            &request.headers,
            self.max_upload_bytes.saturating_add(MULTIPART_FRAMING_BYTES),
        )
        .map_err(|_| GatewayError::PayloadTooLarge {
            limit: self.max_upload_bytes,
        })?;

        let mut multipart = Multipart::from_request(request.into_http(), &())
            .await
            .map_err(|rejection| GatewayError::translation(rejection.body_text()))?;

        let mut folder = None;
        let mut file_name = None;
        let mut file = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| self.multipart_error(e))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "folder" => folder = Some(self.read_text(field).await?),
                "fileName" => file_name = Some(self.read_text(field).await?),
                "file" => {
                    let original_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let content = self.read_field(field, self.max_upload_bytes, true).await?;
                    file = Some(FilePart {
                        original_name,
                        content_type,
                        content,
                    });
                }
                _ => {
                    self.read_field(field, MAX_TEXT_FIELD_BYTES, false).await?;
                }
            }
        }

        let folder = folder.filter(|f| !f.trim().is_empty());
        let (Some(folder), Some(file)) = (folder, file) else {
            return Err(GatewayError::translation("folder and file are required"));
        };

        let file_name = file_name
            .filter(|n| !n.trim().is_empty())
            .or(file.original_name)
            .unwrap_or_default();
        let content_type = file
            .content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Ok(UploadRequest {
            folder,
            file_name,
            content: file.content,
            content_type,
        })
    }

    /// Drain one field, failing once it exceeds `limit` bytes. Only kept when `keep` is set.
    async fn read_field(&self, mut field: Field<'_>, limit: usize, keep: bool) -> Result<Vec<u8>, GatewayError> {
        let mut buf = Vec::new();
        let mut received = 0usize;
        while let Some(chunk) = field.chunk().await.map_err(|e| self.multipart_error(e))? {
            received += chunk.len();
            if received > limit {
                return Err(GatewayError::PayloadTooLarge { limit });
            }
            if keep {
                buf.extend_from_slice(&chunk);
            }
        }
        Ok(buf)
    }

    async fn read_text(&self, field: Field<'_>) -> Result<String, GatewayError> {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = self.read_field(field, MAX_TEXT_FIELD_BYTES, true).await?;
        String::from_utf8(bytes).map_err(|_| GatewayError::translation(format!("field '{name}' must be UTF-8 text")))
    }

    fn multipart_error(&self, err: MultipartError) -> GatewayError {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge {
                limit: self.max_upload_bytes,
            }
        } else {
            GatewayError::translation(err.body_text())
        }
    }
}

#[async_trait]
impl BridgeAdapter for ImageAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Image
    }

    fn routes(&self) -> Vec<RouteSpec> {
        vec![RouteSpec::new(UPLOAD_TO_FOLDER, Method::POST, "/api/v1/Image/upload/folder")]
    }

    async fn handle(&self, call: BridgeCall) -> Result<OutboundResult, GatewayError> {
        if call.route != UPLOAD_TO_FOLDER {
            return Err(GatewayError::Internal(format!("image adapter has no route '{}'", call.route)));
        }

        let req = self.translate(call.request).await?;
        tracing::debug!(
            folder = %req.folder,
            file_name = %req.file_name,
            bytes = req.content.len(),
            "Uploading file"
        );

        let reply = call_with_deadline(
            BackendKind::Image.as_str(),
            call.timeout,
            &call.cancel,
            self.service.upload_to_folder(req),
        )
        .await?;
        json_ok(&reply)
    }
}
