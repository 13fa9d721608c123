//! Staff decisions on borrow and return requests
//!
//! Decisions arrive either as `/konfirmasi`, `/tolak`, `/terima` commands or
//! as presses on the keyboard attached to staff notifications. They do not
//! belong to any session.

use lazy_regex::regex_captures;
use lendcore::storage::borrows::{self, Decision};
use lendcore::storage::{tools, with_transaction};
use lendcore::AppResult;

use crate::telegram::router::{Ctx, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffAction {
    ConfirmBorrow(i64),
    RejectBorrow(i64),
    /// Accept a tool returning (id of the `tool_returnings` row)
    ConfirmReturn(i64),
}

impl StaffAction {
    /// Inline button data, e.g. `staff:borrow:confirm:5`.
    pub fn callback_data(self) -> String {
        match self {
            StaffAction::ConfirmBorrow(id) => format!("staff:borrow:confirm:{}", id),
            StaffAction::RejectBorrow(id) => format!("staff:borrow:reject:{}", id),
            StaffAction::ConfirmReturn(id) => format!("staff:return:confirm:{}", id),
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        let (_, kind, verb, id) = regex_captures!(r"^staff:(borrow|return):(confirm|reject):(\d+)$", data)?;
        let id = id.parse::<i64>().ok()?;
        match (kind, verb) {
            ("borrow", "confirm") => Some(StaffAction::ConfirmBorrow(id)),
            ("borrow", "reject") => Some(StaffAction::RejectBorrow(id)),
            ("return", "confirm") => Some(StaffAction::ConfirmReturn(id)),
            _ => None,
        }
    }

    fn target_id(self) -> i64 {
        match self {
            StaffAction::ConfirmBorrow(id) | StaffAction::RejectBorrow(id) | StaffAction::ConfirmReturn(id) => id,
        }
    }
}

/// Applies a staff decision and notifies the borrower.
pub(crate) fn decide(ctx: &mut Ctx<'_>, action: StaffAction) -> AppResult<Outcome> {
    if !ctx.is_staff() {
        log::info!("🚫 User {} is not staff, ignoring {:?}", ctx.inbound.user_id, action);
        let text = ctx.t("staff-only");
        ctx.reply(text);
        return Ok(Outcome::Denied);
    }

    let staff_id = ctx.inbound.user_id;
    let decision = with_transaction(ctx.conn, |tx| {
        let decision = match action {
            StaffAction::ConfirmBorrow(id) => borrows::confirm_borrow(tx, id, staff_id)?,
            StaffAction::RejectBorrow(id) => borrows::reject_borrow(tx, id, staff_id)?,
            StaffAction::ConfirmReturn(id) => borrows::confirm_tool_returning(tx, id, staff_id)?,
        };
        Ok(decision)
    })?;

    log::info!("🧾 Staff {} decided {:?}: {:?}", staff_id, action, decision);

    let id = action.target_id();
    match decision {
        Decision::Applied => announce(ctx, action)?,
        Decision::NotPending => {
            let text = ctx.t_args("staff-not-pending", &[("id", id.into())]);
            ctx.reply(text);
        }
        Decision::OutOfStock => {
            let text = ctx.t_args("staff-out-of-stock", &[("id", id.into())]);
            ctx.reply(text);
        }
    }

    Ok(Outcome::StaffDecision(decision))
}

/// Replies to staff and tells the borrower, in the default language.
fn announce(ctx: &mut Ctx<'_>, action: StaffAction) -> AppResult<()> {
    let borrow = match action {
        StaffAction::ConfirmBorrow(id) | StaffAction::RejectBorrow(id) => borrows::get_borrow(ctx.conn, id)?,
        StaffAction::ConfirmReturn(id) => match borrows::get_tool_returning(ctx.conn, id)? {
            Some(returning) => borrows::get_borrow(ctx.conn, returning.borrow_id)?,
            None => None,
        },
    };
    let Some(borrow) = borrow else {
        return Ok(());
    };
    let tool = tools::get_tool(ctx.conn, borrow.tool_id)?
        .map(|tool| tool.name)
        .unwrap_or_else(|| format!("#{}", borrow.tool_id));

    let (staff_key, borrower_key) = match action {
        StaffAction::ConfirmBorrow(_) => ("staff-borrow-confirmed", "borrow-approved"),
        StaffAction::RejectBorrow(_) => ("staff-borrow-rejected", "borrow-rejected"),
        StaffAction::ConfirmReturn(_) => ("staff-return-confirmed", "return-accepted"),
    };

    let text = ctx.t_args(staff_key, &[("id", borrow.id.into()), ("tool", tool.as_str().into())]);
    ctx.reply(text);

    let lang = ctx.default_lang();
    let notice = crate::i18n::t_args(
        &lang,
        borrower_key,
        &crate::telegram::router::fluent_args(&[
            ("id", borrow.id.into()),
            ("tool", tool.as_str().into()),
            ("days", borrow.duration_days.into()),
        ]),
    );
    ctx.send_to(borrow.user_id, notice, None);
    Ok(())
}
