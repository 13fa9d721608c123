//! Domain reconstruction from session details
//!
//! A session never stores the object it is building. The draft is rebuilt
//! every time it is needed by replaying the recorded details oldest first;
//! later answers overwrite earlier ones, photos accumulate.
//!
//! Replay stops at the first detail that cannot be decoded (or whose topic
//! column is unknown or disagrees with its payload tag) and returns what was
//! gathered up to that point. Details that belong to another flow are skipped.

use crate::session::payload::{decode, EditChange, Payload};
use crate::session::photo::PhotoRef;
use crate::session::topic::FlowMode;
use crate::storage::sessions::SessionDetail;
use crate::storage::tools::{NewTool, Tool};

/// Tool being added, edited or given new photos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolDraft {
    /// Existing tool (edit and photo flows)
    pub tool_id: Option<i64>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub product_type: Option<String>,
    pub weight: Option<f64>,
    pub stock: Option<i64>,
    pub info: Option<String>,
    pub photos: Vec<PhotoRef>,
}

impl ToolDraft {
    /// Required fields still unanswered in the add flow.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.brand.is_none() {
            missing.push("brand");
        }
        if self.product_type.is_none() {
            missing.push("type");
        }
        if self.weight.is_none() {
            missing.push("weight");
        }
        if self.stock.is_none() {
            missing.push("stock");
        }
        missing
    }

    /// Fields of the new tool, when every required answer is present.
    pub fn to_new_tool(&self) -> Option<NewTool> {
        Some(NewTool {
            name: self.name.clone()?,
            brand: self.brand.clone()?,
            product_type: self.product_type.clone()?,
            weight: self.weight?,
            stock: self.stock?,
            info: self.info.clone().unwrap_or_default(),
        })
    }

    /// Overwrites the answered fields of an existing tool.
    pub fn apply_to(&self, tool: &mut Tool) {
        if let Some(name) = &self.name {
            tool.name = name.clone();
        }
        if let Some(brand) = &self.brand {
            tool.brand = brand.clone();
        }
        if let Some(product_type) = &self.product_type {
            tool.product_type = product_type.clone();
        }
        if let Some(weight) = self.weight {
            tool.weight = weight;
        }
        if let Some(stock) = self.stock {
            tool.stock = stock;
        }
        if let Some(info) = &self.info {
            tool.info = info.clone();
        }
    }

    /// Whether the edit flow recorded at least one new value.
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.brand.is_some()
            || self.product_type.is_some()
            || self.weight.is_some()
            || self.stock.is_some()
            || self.info.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BorrowDraft {
    pub tool_id: Option<i64>,
    /// Borrow period in days
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnDraft {
    pub borrow_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationDraft {
    pub name: Option<String>,
    pub nim: Option<String>,
    pub batch_year: Option<i32>,
}

/// Draft of whichever aggregate the session's flow builds.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Tool(ToolDraft),
    Borrow(BorrowDraft),
    Return(ReturnDraft),
    Registration(RegistrationDraft),
}

impl Aggregate {
    pub fn empty(mode: FlowMode) -> Self {
        match mode {
            FlowMode::Add | FlowMode::Edit | FlowMode::Photo => Aggregate::Tool(ToolDraft::default()),
            FlowMode::Borrow => Aggregate::Borrow(BorrowDraft::default()),
            FlowMode::Return => Aggregate::Return(ReturnDraft::default()),
            FlowMode::Register => Aggregate::Registration(RegistrationDraft::default()),
        }
    }

    fn apply(&mut self, payload: Payload) {
        match (self, payload) {
            (Aggregate::Borrow(d), Payload::BorrowDate { tool_id }) => d.tool_id = Some(tool_id),
            (Aggregate::Borrow(d), Payload::BorrowConfirm { duration }) => d.duration = Some(duration),

            (Aggregate::Return(d), Payload::ReturnConfirm { borrow_id }) => d.borrow_id = Some(borrow_id),

            (Aggregate::Registration(d), Payload::RegisterNim { name }) => d.name = Some(name),
            (Aggregate::Registration(d), Payload::RegisterBatch { nim }) => d.nim = Some(nim),
            (Aggregate::Registration(d), Payload::RegisterConfirm { batch_year }) => d.batch_year = Some(batch_year),

            (Aggregate::Tool(d), Payload::ManageEditTool { tool_id } | Payload::ManagePhotoTool { tool_id }) => {
                d.tool_id = Some(tool_id)
            }
            (Aggregate::Tool(d), Payload::ManageAddBrand { name }) => d.name = Some(name),
            (Aggregate::Tool(d), Payload::ManageAddType { brand }) => d.brand = Some(brand),
            (Aggregate::Tool(d), Payload::ManageAddWeight { product_type }) => d.product_type = Some(product_type),
            (Aggregate::Tool(d), Payload::ManageAddStock { weight }) => d.weight = Some(weight),
            (Aggregate::Tool(d), Payload::ManageAddInfo { stock }) => d.stock = Some(stock),
            (Aggregate::Tool(d), Payload::ManageAddPhoto { info, photo }) => {
                if info.is_some() {
                    d.info = info;
                }
                d.photos.extend(photo);
            }
            (Aggregate::Tool(d), Payload::ManagePhotoUpload(photo)) => d.photos.push(photo),
            (Aggregate::Tool(d), Payload::ManageEditField { change }) => match change {
                EditChange::Name(name) => d.name = Some(name),
                EditChange::Brand(brand) => d.brand = Some(brand),
                EditChange::Type(product_type) => d.product_type = Some(product_type),
                EditChange::Weight(weight) => d.weight = Some(weight),
                EditChange::Stock(stock) => d.stock = Some(stock),
                EditChange::Info(info) => d.info = Some(info),
            },

            // Opening, field choice and confirm markers: nothing to record
            _ => {}
        }
    }
}

/// Replays `details` (oldest first) into the draft for `mode`.
pub fn reconstruct(mode: FlowMode, details: &[SessionDetail]) -> Aggregate {
    let mut aggregate = Aggregate::empty(mode);

    for detail in details {
        let Some(topic) = detail.topic else {
            log::warn!(
                "⚠️ Detail {} of session {} has an unknown topic, stopping replay",
                detail.id,
                detail.session_id
            );
            break;
        };
        if topic.flow() != mode {
            log::debug!("Skipping {} detail {} while rebuilding a {} draft", topic, detail.id, mode);
            continue;
        }

        let payload = match decode(&detail.payload) {
            Ok(payload) if payload.topic() == topic => payload,
            Ok(payload) => {
                log::warn!(
                    "⚠️ Detail {} of session {} is tagged {} but carries a {} payload, stopping replay",
                    detail.id,
                    detail.session_id,
                    topic,
                    payload.topic()
                );
                break;
            }
            Err(e) => {
                log::warn!(
                    "⚠️ Detail {} of session {} could not be decoded, stopping replay: {}",
                    detail.id,
                    detail.session_id,
                    e
                );
                break;
            }
        };

        aggregate.apply(payload);
    }

    aggregate
}

/// Tool draft for the add, edit and photo flows.
pub fn reconstruct_tool(mode: FlowMode, details: &[SessionDetail]) -> ToolDraft {
    match reconstruct(mode, details) {
        Aggregate::Tool(draft) => draft,
        _ => ToolDraft::default(),
    }
}

pub fn reconstruct_borrow(details: &[SessionDetail]) -> BorrowDraft {
    match reconstruct(FlowMode::Borrow, details) {
        Aggregate::Borrow(draft) => draft,
        _ => BorrowDraft::default(),
    }
}

pub fn reconstruct_return(details: &[SessionDetail]) -> ReturnDraft {
    match reconstruct(FlowMode::Return, details) {
        Aggregate::Return(draft) => draft,
        _ => ReturnDraft::default(),
    }
}

pub fn reconstruct_registration(details: &[SessionDetail]) -> RegistrationDraft {
    match reconstruct(FlowMode::Register, details) {
        Aggregate::Registration(draft) => draft,
        _ => RegistrationDraft::default(),
    }
}
