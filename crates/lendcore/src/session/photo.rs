//! Photo references and best-size selection
//!
//! Telegram delivers every photo as several resized variants. Only the
//! largest one is kept for a tool.

use serde::{Deserialize, Serialize};

/// Photo stored with a tool and recorded in photo payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub file_id: String,
    pub file_unique_id: String,
    /// Album id when the photo was sent as part of a media group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_group_id: Option<String>,
}

/// One resized variant of an incoming photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoVariant {
    pub file_id: String,
    pub file_unique_id: String,
    /// Size in bytes, when Telegram reports it
    pub file_size: Option<u32>,
}

impl PhotoVariant {
    pub fn into_ref(self, media_group_id: Option<String>) -> PhotoRef {
        PhotoRef {
            file_id: self.file_id,
            file_unique_id: self.file_unique_id,
            media_group_id,
        }
    }
}

/// Picks the variant with the largest `file_size`.
///
/// A missing size counts as 0. On ties the first variant wins.
/// Returns `None` for an empty slice.
pub fn pick_best(variants: &[PhotoVariant]) -> Option<&PhotoVariant> {
    variants.iter().fold(None, |best: Option<&PhotoVariant>, candidate| match best {
        Some(current) if candidate.file_size.unwrap_or(0) <= current.file_size.unwrap_or(0) => Some(current),
        _ => Some(candidate),
    })
}
