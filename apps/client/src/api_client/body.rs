//! Request bodies: JSON or multipart, chosen once when the request is built.

use std::collections::BTreeMap;
use std::path::Path;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::warn;

use crate::errors::ClientError;
use crate::models::ProfileUpdate;

const OCTET_STREAM: &str = "application/octet-stream";

/// A file picked by the user, held in memory until upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime_type = guess_mime(&file_name).to_string();
        Ok(Self {
            file_name,
            mime_type,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// An unparsable `mime_type` is sent as `application/octet-stream`.
    fn into_part(self) -> Result<Part, ClientError> {
        let part = Part::bytes(self.bytes.to_vec()).file_name(self.file_name.clone());
        match part.mime_str(&self.mime_type) {
            Ok(part) => Ok(part),
            Err(_) => {
                warn!(
                    "Unknown content type {:?} for {}, sending as {OCTET_STREAM}",
                    self.mime_type, self.file_name
                );
                Ok(Part::bytes(self.bytes.to_vec())
                    .file_name(self.file_name)
                    .mime_str(OCTET_STREAM)?)
            }
        }
    }
}

fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => OCTET_STREAM,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, attachment: Attachment },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    /// JSON when no file is attached, multipart as soon as one is.
    pub fn profile_update(
        update: &ProfileUpdate,
        profile_image: Option<Attachment>,
        resume: Option<Attachment>,
    ) -> Result<Self, ClientError> {
        if profile_image.is_none() && resume.is_none() {
            return Ok(RequestBody::Json(serde_json::to_value(update)?));
        }

        let mut parts = Vec::new();
        if let Some(name) = &update.name {
            parts.push(text("name", name));
        }
        if let Some(bio) = &update.bio {
            parts.push(text("bio", bio));
        }
        if let Some(ids) = &update.skill_ids {
            // a form has no way to say "empty list": zero repeated keys reads as "unchanged"
            if ids.is_empty() {
                return Err(skills_cleared_with_files());
            }
            // repeated keys are how form payloads carry a list
            parts.extend(ids.iter().map(|id| text("skill_ids", &id.to_string())));
        }
        if let Some(image) = profile_image {
            parts.push(FormPart::File {
                name: "profile_image".to_string(),
                attachment: image,
            });
        }
        if let Some(resume) = resume {
            parts.push(FormPart::File {
                name: "resume".to_string(),
                attachment: resume,
            });
        }
        Ok(RequestBody::Multipart(parts))
    }

    /// Applications always carry the resume file, so they are always multipart.
    pub fn application(job_id: i64, cover_letter: &str, resume: Attachment) -> Self {
        RequestBody::Multipart(vec![
            text("job", &job_id.to_string()),
            text("cover_letter", cover_letter),
            FormPart::File {
                name: "resume".to_string(),
                attachment: resume,
            },
        ])
    }

    pub fn json(value: Value) -> Self {
        RequestBody::Json(value)
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }

    pub(crate) fn apply(self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        match self {
            RequestBody::Json(value) => Ok(builder.json(&value)),
            RequestBody::Multipart(parts) => {
                let mut form = Form::new();
                for part in parts {
                    form = match part {
                        FormPart::Text { name, value } => form.text(name, value),
                        FormPart::File { name, attachment } => {
                            form.part(name, attachment.into_part()?)
                        }
                    };
                }
                Ok(builder.multipart(form))
            }
        }
    }
}

fn skills_cleared_with_files() -> ClientError {
    let message = "Skills cannot be cleared in the same update as a file upload. \
                   Clear them in a separate update."
        .to_string();
    let mut fields = BTreeMap::new();
    fields.insert("skill_ids".to_string(), vec![message.clone()]);
    ClientError::Validation { message, fields }
}

fn text(name: &str, value: &str) -> FormPart {
    FormPart::Text {
        name: name.to_string(),
        value: value.to_string(),
    }
}
