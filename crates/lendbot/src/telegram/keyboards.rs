//! Inline keyboards
//!
//! Button data is routed like typed text, so every button carries exactly
//! the answer a user could type instead.

use lendcore::session::topic::EditField;
use lendcore::storage::borrows::Borrow;
use lendcore::storage::tools::Tool;
use strum::IntoEnumIterator;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use unic_langid::LanguageIdentifier;

use crate::i18n;
use crate::telegram::staff::StaffAction;

pub fn yes_no(lang: &LanguageIdentifier) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(i18n::t(lang, "button-yes"), "ya"),
        InlineKeyboardButton::callback(i18n::t(lang, "button-no"), "tidak"),
    ]])
}

/// "Done" button for repeatable steps.
pub fn done(lang: &LanguageIdentifier) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        i18n::t(lang, "button-done"),
        "selesai",
    )]])
}

/// One button per tool, two per row.
pub fn tools(tools: &[Tool]) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = tools
        .iter()
        .map(|tool| InlineKeyboardButton::callback(format!("#{} {}", tool.id, tool.name), tool.id.to_string()))
        .collect();
    InlineKeyboardMarkup::new(buttons.chunks(2).map(<[InlineKeyboardButton]>::to_vec))
}

pub fn borrows(borrows: &[(Borrow, String)]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(borrows.iter().map(|(borrow, tool_name)| {
        vec![InlineKeyboardButton::callback(
            format!("#{} {}", borrow.id, tool_name),
            borrow.id.to_string(),
        )]
    }))
}

/// Editable fields, optionally followed by a "done" button.
pub fn edit_fields(lang: &LanguageIdentifier, with_done: bool) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = EditField::iter()
        .map(|field| {
            InlineKeyboardButton::callback(i18n::t(lang, &format!("field-{}", field.as_ref())), field.as_ref())
        })
        .collect();
    let mut rows: Vec<Vec<InlineKeyboardButton>> = buttons.chunks(3).map(<[InlineKeyboardButton]>::to_vec).collect();
    if with_done {
        rows.push(vec![InlineKeyboardButton::callback(i18n::t(lang, "button-done"), "selesai")]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Confirm/reject buttons attached to staff notifications.
pub fn staff_decision(lang: &LanguageIdentifier, accept: StaffAction, reject: Option<StaffAction>) -> InlineKeyboardMarkup {
    let mut row = vec![InlineKeyboardButton::callback(
        i18n::t(lang, "button-confirm"),
        accept.callback_data(),
    )];
    if let Some(reject) = reject {
        row.push(InlineKeyboardButton::callback(
            i18n::t(lang, "button-reject"),
            reject.callback_data(),
        ));
    }
    InlineKeyboardMarkup::new(vec![row])
}
