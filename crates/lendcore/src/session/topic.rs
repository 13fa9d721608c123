//! Closed set of conversation topics and the tags they are grouped by
//!
//! The snake_case string of every enum here is its persisted form: `Topic`
//! values are written to `session_details.topic` and to the `type` field of
//! each payload.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// One step of a conversation: the question the session is waiting on.
///
/// The session's current topic is its newest detail's topic. A valid answer
/// is recorded as a detail tagged with the next topic of the flow, so every
/// payload carries the answer that led to its topic. Answers at a flow's
/// confirm topic are the final yes/no and are not recorded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Which tool?
    BorrowInit,
    /// For how many days?
    BorrowDate,
    BorrowConfirm,

    /// Which borrow is being returned?
    ReturnInit,
    ReturnConfirm,

    /// Full name?
    RegisterInit,
    RegisterNim,
    RegisterBatch,
    RegisterConfirm,

    /// Tool name?
    ManageAddInit,
    ManageAddBrand,
    ManageAddType,
    ManageAddWeight,
    ManageAddStock,
    ManageAddInfo,
    /// Photos, until "done"
    ManageAddPhoto,
    ManageAddConfirm,

    /// Which tool?
    ManageEditInit,
    /// Which field? Nothing has changed yet, so "done" is refused
    ManageEditTool,
    /// Another field, or "done"
    ManageEditField,
    ManageEditName,
    ManageEditBrand,
    ManageEditType,
    ManageEditWeight,
    ManageEditStock,
    ManageEditInfo,
    ManageEditConfirm,

    /// Which tool?
    ManagePhotoInit,
    /// First photo; "done" is refused
    ManagePhotoTool,
    /// More photos, or "done"
    ManagePhotoUpload,
    ManagePhotoConfirm,
}

impl Topic {
    /// The flow this topic belongs to.
    pub fn flow(self) -> FlowMode {
        use Topic::*;
        match self {
            BorrowInit | BorrowDate | BorrowConfirm => FlowMode::Borrow,
            ReturnInit | ReturnConfirm => FlowMode::Return,
            RegisterInit | RegisterNim | RegisterBatch | RegisterConfirm => FlowMode::Register,
            ManageAddInit | ManageAddBrand | ManageAddType | ManageAddWeight | ManageAddStock | ManageAddInfo
            | ManageAddPhoto | ManageAddConfirm => FlowMode::Add,
            ManageEditInit | ManageEditTool | ManageEditField | ManageEditName | ManageEditBrand | ManageEditType
            | ManageEditWeight | ManageEditStock | ManageEditInfo | ManageEditConfirm => FlowMode::Edit,
            ManagePhotoInit | ManagePhotoTool | ManagePhotoUpload | ManagePhotoConfirm => FlowMode::Photo,
        }
    }

    /// Terminal topics end the conversation.
    pub fn is_terminal(self) -> bool {
        self == self.flow().confirm_topic()
    }
}

/// Which domain aggregate a session is building.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    Add,
    Edit,
    Photo,
    Register,
    Borrow,
    Return,
}

impl FlowMode {
    /// Topic recorded when the session is opened.
    pub fn init_topic(self) -> Topic {
        match self {
            FlowMode::Add => Topic::ManageAddInit,
            FlowMode::Edit => Topic::ManageEditInit,
            FlowMode::Photo => Topic::ManagePhotoInit,
            FlowMode::Register => Topic::RegisterInit,
            FlowMode::Borrow => Topic::BorrowInit,
            FlowMode::Return => Topic::ReturnInit,
        }
    }

    /// Topic at which the final yes/no is asked.
    pub fn confirm_topic(self) -> Topic {
        match self {
            FlowMode::Add => Topic::ManageAddConfirm,
            FlowMode::Edit => Topic::ManageEditConfirm,
            FlowMode::Photo => Topic::ManagePhotoConfirm,
            FlowMode::Register => Topic::RegisterConfirm,
            FlowMode::Borrow => Topic::BorrowConfirm,
            FlowMode::Return => Topic::ReturnConfirm,
        }
    }

    /// Tool management flows are reserved for lab staff.
    pub fn requires_staff(self) -> bool {
        matches!(self, FlowMode::Add | FlowMode::Edit | FlowMode::Photo)
    }

    /// Borrowing and returning need a completed registration.
    pub fn requires_registration(self) -> bool {
        matches!(self, FlowMode::Borrow | FlowMode::Return)
    }
}

/// Tool attribute picked in the edit flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum EditField {
    #[strum(to_string = "name", serialize = "nama")]
    Name,
    #[strum(to_string = "brand", serialize = "merk")]
    Brand,
    #[strum(to_string = "type", serialize = "tipe", serialize = "jenis")]
    Type,
    #[strum(to_string = "weight", serialize = "berat")]
    Weight,
    #[strum(to_string = "stock", serialize = "stok")]
    Stock,
    #[strum(to_string = "info", serialize = "keterangan")]
    Info,
}

impl EditField {
    /// Topic at which the new value of this field is asked.
    pub fn value_topic(self) -> Topic {
        match self {
            EditField::Name => Topic::ManageEditName,
            EditField::Brand => Topic::ManageEditBrand,
            EditField::Type => Topic::ManageEditType,
            EditField::Weight => Topic::ManageEditWeight,
            EditField::Stock => Topic::ManageEditStock,
            EditField::Info => Topic::ManageEditInfo,
        }
    }

    /// The field whose new value is asked at `topic`.
    pub fn from_value_topic(topic: Topic) -> Option<Self> {
        EditField::iter().find(|field| field.value_topic() == topic)
    }
}

/// Chat the conversation happens in. Sessions are scoped per (user, request type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Private,
    Group,
}

/// Session row status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_topic_tags_are_snake_case() {
        assert_eq!(Topic::BorrowInit.as_ref(), "borrow_init");
        assert_eq!(Topic::ManageAddWeight.as_ref(), "manage_add_weight");
        assert_eq!(Topic::RegisterConfirm.to_string(), "register_confirm");
        assert_eq!(Topic::from_str("manage_photo_upload").unwrap(), Topic::ManagePhotoUpload);
        assert!(Topic::from_str("borrow_later").is_err());
        assert!(Topic::from_str("borrow_tool").is_err());
    }

    #[test]
    fn test_every_flow_has_init_and_terminal_topic() {
        for flow in FlowMode::iter() {
            assert_eq!(flow.init_topic().flow(), flow);
            assert_eq!(flow.confirm_topic().flow(), flow);
            assert!(flow.confirm_topic().is_terminal());
            assert!(!flow.init_topic().is_terminal());
        }
    }

    #[test]
    fn test_exactly_one_terminal_topic_per_flow() {
        let terminal: Vec<Topic> = Topic::iter().filter(|t| t.is_terminal()).collect();
        assert_eq!(terminal.len(), FlowMode::iter().count());
    }

    #[test]
    fn test_edit_field_aliases() {
        assert_eq!(EditField::from_str("berat").unwrap(), EditField::Weight);
        assert_eq!(EditField::from_str("Stok").unwrap(), EditField::Stock);
        assert_eq!(EditField::from_str("name").unwrap(), EditField::Name);
        assert_eq!(EditField::Type.value_topic(), Topic::ManageEditType);
        assert_eq!(EditField::from_value_topic(Topic::ManageEditStock), Some(EditField::Stock));
        assert_eq!(EditField::from_value_topic(Topic::ManageEditField), None);
        assert_eq!(EditField::Weight.as_ref(), "weight");
        assert!(EditField::from_str("color").is_err());
    }

    #[test]
    fn test_flow_permissions() {
        assert!(FlowMode::Add.requires_staff());
        assert!(!FlowMode::Borrow.requires_staff());
        assert!(FlowMode::Return.requires_registration());
        assert!(!FlowMode::Register.requires_registration());
    }

    #[test]
    fn test_request_type_round_trip() {
        assert_eq!(RequestType::from_str("group").unwrap(), RequestType::Group);
        assert_eq!(SessionStatus::InProgress.as_ref(), "in_progress");
    }
}
