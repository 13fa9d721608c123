//! Chat-session state machine
//!
//! - `topic`: closed set of conversation steps and flow tables
//! - `payload`: typed answer per topic and its JSON codec
//! - `photo`: photo references and best-size selection
//! - `reconstruct`: rebuilding drafts from recorded details
//! - `lifecycle`: opening, advancing and closing sessions

pub mod lifecycle;
pub mod payload;
pub mod photo;
pub mod reconstruct;
pub mod topic;

pub use lifecycle::SessionState;
pub use payload::{decode, encode, CodecError, EditChange, Payload};
pub use photo::{pick_best, PhotoRef, PhotoVariant};
pub use reconstruct::{reconstruct, Aggregate, BorrowDraft, RegistrationDraft, ReturnDraft, ToolDraft};
pub use topic::{EditField, FlowMode, RequestType, SessionStatus, Topic};
