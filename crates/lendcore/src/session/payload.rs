//! Session payload codec
//!
//! Each session detail stores one `Payload` as a JSON object whose `type`
//! field is the topic tag. The payload carries the answer that moved the
//! session to that topic, e.g.
//!
//! ```json
//! {"type": "borrow_date", "tool_id": 4}
//! {"type": "borrow_confirm", "duration": 30}
//! {"type": "manage_photo_upload", "file_id": "AgAC...", "file_unique_id": "AQAD..."}
//! {"type": "manage_edit_field", "change": {"field": "stock", "value": 7}}
//! ```
//!
//! The text is persisted verbatim and must round-trip through
//! `encode`/`decode`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::photo::PhotoRef;
use crate::session::topic::{EditField, Topic};

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Stored text is not a payload object with a known `type`
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// New value for one tool attribute in the edit flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum EditChange {
    Name(String),
    Brand(String),
    Type(String),
    Weight(f64),
    Stock(i64),
    Info(String),
}

impl EditChange {
    pub fn field(&self) -> EditField {
        match self {
            EditChange::Name(_) => EditField::Name,
            EditChange::Brand(_) => EditField::Brand,
            EditChange::Type(_) => EditField::Type,
            EditChange::Weight(_) => EditField::Weight,
            EditChange::Stock(_) => EditField::Stock,
            EditChange::Info(_) => EditField::Info,
        }
    }
}

/// Typed content of one detail. The variant is the detail's topic, the
/// fields are the answer given at the previous topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    BorrowInit,
    BorrowDate { tool_id: i64 },
    BorrowConfirm { duration: i64 },

    ReturnInit,
    ReturnConfirm { borrow_id: i64 },

    RegisterInit,
    RegisterNim { name: String },
    RegisterBatch { nim: String },
    RegisterConfirm { batch_year: i32 },

    ManageAddInit,
    ManageAddBrand { name: String },
    ManageAddType { brand: String },
    ManageAddWeight { product_type: String },
    ManageAddStock { weight: f64 },
    ManageAddInfo { stock: i64 },
    /// Entered with the info answer, then once per uploaded photo
    ManageAddPhoto {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        info: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        photo: Option<PhotoRef>,
    },
    ManageAddConfirm,

    ManageEditInit,
    ManageEditTool { tool_id: i64 },
    ManageEditField { change: EditChange },
    ManageEditName,
    ManageEditBrand,
    ManageEditType,
    ManageEditWeight,
    ManageEditStock,
    ManageEditInfo,
    ManageEditConfirm,

    ManagePhotoInit,
    ManagePhotoTool { tool_id: i64 },
    ManagePhotoUpload(PhotoRef),
    ManagePhotoConfirm,
}

impl Payload {
    /// Topic tag written to the `type` field.
    pub fn topic(&self) -> Topic {
        match self {
            Payload::BorrowInit => Topic::BorrowInit,
            Payload::BorrowDate { .. } => Topic::BorrowDate,
            Payload::BorrowConfirm { .. } => Topic::BorrowConfirm,
            Payload::ReturnInit => Topic::ReturnInit,
            Payload::ReturnConfirm { .. } => Topic::ReturnConfirm,
            Payload::RegisterInit => Topic::RegisterInit,
            Payload::RegisterNim { .. } => Topic::RegisterNim,
            Payload::RegisterBatch { .. } => Topic::RegisterBatch,
            Payload::RegisterConfirm { .. } => Topic::RegisterConfirm,
            Payload::ManageAddInit => Topic::ManageAddInit,
            Payload::ManageAddBrand { .. } => Topic::ManageAddBrand,
            Payload::ManageAddType { .. } => Topic::ManageAddType,
            Payload::ManageAddWeight { .. } => Topic::ManageAddWeight,
            Payload::ManageAddStock { .. } => Topic::ManageAddStock,
            Payload::ManageAddInfo { .. } => Topic::ManageAddInfo,
            Payload::ManageAddPhoto { .. } => Topic::ManageAddPhoto,
            Payload::ManageAddConfirm => Topic::ManageAddConfirm,
            Payload::ManageEditInit => Topic::ManageEditInit,
            Payload::ManageEditTool { .. } => Topic::ManageEditTool,
            Payload::ManageEditField { .. } => Topic::ManageEditField,
            Payload::ManageEditName => Topic::ManageEditName,
            Payload::ManageEditBrand => Topic::ManageEditBrand,
            Payload::ManageEditType => Topic::ManageEditType,
            Payload::ManageEditWeight => Topic::ManageEditWeight,
            Payload::ManageEditStock => Topic::ManageEditStock,
            Payload::ManageEditInfo => Topic::ManageEditInfo,
            Payload::ManageEditConfirm => Topic::ManageEditConfirm,
            Payload::ManagePhotoInit => Topic::ManagePhotoInit,
            Payload::ManagePhotoTool { .. } => Topic::ManagePhotoTool,
            Payload::ManagePhotoUpload(_) => Topic::ManagePhotoUpload,
            Payload::ManagePhotoConfirm => Topic::ManagePhotoConfirm,
        }
    }

    /// Payload recorded when a session of this topic's flow is opened.
    pub fn opening(topic: Topic) -> Option<Payload> {
        match topic {
            Topic::BorrowInit => Some(Payload::BorrowInit),
            Topic::ReturnInit => Some(Payload::ReturnInit),
            Topic::RegisterInit => Some(Payload::RegisterInit),
            Topic::ManageAddInit => Some(Payload::ManageAddInit),
            Topic::ManageEditInit => Some(Payload::ManageEditInit),
            Topic::ManagePhotoInit => Some(Payload::ManagePhotoInit),
            _ => None,
        }
    }

    /// Marker recorded when the user picks a field to edit.
    pub fn edit_value(field: EditField) -> Payload {
        match field {
            EditField::Name => Payload::ManageEditName,
            EditField::Brand => Payload::ManageEditBrand,
            EditField::Type => Payload::ManageEditType,
            EditField::Weight => Payload::ManageEditWeight,
            EditField::Stock => Payload::ManageEditStock,
            EditField::Info => Payload::ManageEditInfo,
        }
    }
}

/// Encodes a payload as `{"type": topic, ...fields}`.
pub fn encode(payload: &Payload) -> String {
    match serde_json::to_string(payload) {
        Ok(text) => text,
        Err(e) => {
            // Only reachable through a custom Serialize impl failing; keep the tag.
            log::error!("Failed to encode {} payload: {}", payload.topic(), e);
            format!(r#"{{"type":"{}"}}"#, payload.topic())
        }
    }
}

/// Decodes a stored payload.
///
/// # Errors
///
/// `CodecError::MalformedPayload` when the text is not JSON, has an unknown
/// `type`, or lacks a field the topic requires.
pub fn decode(text: &str) -> Result<Payload, CodecError> {
    Ok(serde_json::from_str(text)?)
}
