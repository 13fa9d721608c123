//! Closing a confirmed (or declined) session
//!
//! The business operation, completion and removal of the session all happen
//! in one transaction. Messages are composed only after it has committed.

use lendcore::session::lifecycle;
use lendcore::session::reconstruct::{reconstruct, Aggregate, ToolDraft};
use lendcore::session::topic::FlowMode;
use lendcore::storage::sessions::Session;
use lendcore::storage::{borrows, tools, users, with_transaction};
use lendcore::AppResult;
use rusqlite::Connection;

use crate::i18n;
use crate::telegram::keyboards;
use crate::telegram::router::{fluent_args, Ctx, Outcome};
use crate::telegram::staff::StaffAction;
use crate::telegram::steps::tool_name;

/// What finalizing a session did.
#[derive(Debug, Clone, PartialEq)]
enum Finalized {
    Declined,
    /// Confirmed, but the rebuilt draft lacks required answers
    Incomplete,
    /// The tool or borrow the draft refers to is gone or no longer eligible
    Missing,
    BorrowRequested {
        borrow_id: i64,
        tool: String,
        days: i64,
    },
    ReturnRequested {
        returning_id: i64,
        borrow_id: i64,
        tool: String,
    },
    Registered {
        name: String,
    },
    ToolCreated {
        tool_id: i64,
        name: String,
    },
    ToolUpdated {
        tool_id: i64,
        name: String,
    },
    PhotosAdded {
        tool_id: i64,
        name: String,
        count: usize,
    },
}

/// Closes the session on the final answer, running the flow's business
/// operation first when it is "yes".
pub(crate) fn run(ctx: &mut Ctx<'_>, session: &Session, answer: bool) -> AppResult<Outcome> {
    let finalized = with_transaction(ctx.conn, |tx| {
        let finalized = if answer {
            let details = lifecycle::details(tx, &session.id)?;
            apply(tx, session, reconstruct(session.flow, &details))?
        } else {
            Finalized::Declined
        };

        lifecycle::mark_complete(tx, &session.id)?;
        lifecycle::close(tx, &session.id)?;
        Ok(finalized)
    })?;

    log::info!(
        "✅ Session {} ({}) of user {} finalized: {:?}",
        session.id,
        session.flow,
        session.user_id,
        finalized
    );

    announce(ctx, session, finalized)
}

fn apply(tx: &Connection, session: &Session, aggregate: Aggregate) -> AppResult<Finalized> {
    let finalized = match aggregate {
        Aggregate::Borrow(draft) => {
            let (Some(tool_id), Some(days)) = (draft.tool_id, draft.duration) else {
                return Ok(Finalized::Incomplete);
            };
            let Some(tool) = tools::get_tool(tx, tool_id)? else {
                return Ok(Finalized::Missing);
            };
            let borrow_id = borrows::create_borrow(tx, session.user_id, tool_id, days)?;
            Finalized::BorrowRequested {
                borrow_id,
                tool: tool.name,
                days,
            }
        }

        Aggregate::Return(draft) => {
            let Some(borrow_id) = draft.borrow_id else {
                return Ok(Finalized::Incomplete);
            };
            let returnable = borrows::list_returnable_borrows(tx, session.user_id)?;
            let Some(borrow) = returnable.into_iter().find(|borrow| borrow.id == borrow_id) else {
                return Ok(Finalized::Missing);
            };
            let returning_id = borrows::create_tool_returning(tx, borrow_id, session.user_id)?;
            Finalized::ReturnRequested {
                returning_id,
                borrow_id,
                tool: tool_name(tx, Some(borrow.tool_id))?,
            }
        }

        Aggregate::Registration(draft) => {
            let (Some(name), Some(nim), Some(batch_year)) = (draft.name, draft.nim, draft.batch_year) else {
                return Ok(Finalized::Incomplete);
            };
            users::register_user(tx, session.user_id, &name, &nim, batch_year)?;
            Finalized::Registered { name }
        }

        Aggregate::Tool(draft) => apply_tool(tx, session.flow, draft)?,
    };
    Ok(finalized)
}

fn apply_tool(tx: &Connection, flow: FlowMode, draft: ToolDraft) -> AppResult<Finalized> {
    match flow {
        FlowMode::Add => {
            let Some(new_tool) = draft.to_new_tool() else {
                log::warn!("⚠️ New tool draft is missing {:?}", draft.missing_fields());
                return Ok(Finalized::Incomplete);
            };
            let tool_id = tools::create_tool(tx, &new_tool, &draft.photos)?;
            Ok(Finalized::ToolCreated {
                tool_id,
                name: new_tool.name,
            })
        }
        FlowMode::Edit => {
            let Some(tool_id) = draft.tool_id else {
                return Ok(Finalized::Incomplete);
            };
            if !draft.has_changes() {
                return Ok(Finalized::Incomplete);
            }
            let Some(mut tool) = tools::get_tool(tx, tool_id)? else {
                return Ok(Finalized::Missing);
            };
            draft.apply_to(&mut tool);
            tools::update_tool(tx, &tool)?;
            Ok(Finalized::ToolUpdated {
                tool_id,
                name: tool.name,
            })
        }
        _ => {
            let Some(tool_id) = draft.tool_id else {
                return Ok(Finalized::Incomplete);
            };
            if draft.photos.is_empty() {
                return Ok(Finalized::Incomplete);
            }
            let Some(tool) = tools::get_tool(tx, tool_id)? else {
                return Ok(Finalized::Missing);
            };
            tools::add_tool_photos(tx, tool_id, &draft.photos)?;
            Ok(Finalized::PhotosAdded {
                tool_id,
                name: tool.name,
                count: draft.photos.len(),
            })
        }
    }
}

/// Tells the user (and the staff chat, for requests) what happened.
fn announce(ctx: &mut Ctx<'_>, session: &Session, finalized: Finalized) -> AppResult<Outcome> {
    let flow = session.flow;
    let flow_label = ctx.t(&format!("flow-{}", flow));

    let outcome = match finalized {
        Finalized::Declined => {
            let text = ctx.t_args("flow-declined", &[("flow", flow_label.into())]);
            ctx.reply(text);
            return Ok(Outcome::Declined(flow));
        }
        Finalized::Incomplete => {
            let text = ctx.t_args("flow-incomplete", &[("flow", flow_label.into())]);
            ctx.reply(text);
            return Ok(Outcome::Abandoned(flow));
        }
        Finalized::Missing => {
            let text = ctx.t_args("flow-missing", &[("flow", flow_label.into())]);
            ctx.reply(text);
            return Ok(Outcome::Abandoned(flow));
        }
        Finalized::BorrowRequested { borrow_id, tool, days } => {
            let text = ctx.t_args("borrow-requested", &[("id", borrow_id.into())]);
            ctx.reply(text);
            notify_staff(
                ctx,
                "staff-new-borrow",
                &[("id", borrow_id.into()), ("tool", tool.into()), ("days", days.into())],
                StaffAction::ConfirmBorrow(borrow_id),
                Some(StaffAction::RejectBorrow(borrow_id)),
            )?;
            Outcome::Finalized(flow)
        }
        Finalized::ReturnRequested {
            returning_id,
            borrow_id,
            tool,
        } => {
            let text = ctx.t_args("return-requested", &[("id", returning_id.into())]);
            ctx.reply(text);
            notify_staff(
                ctx,
                "staff-new-return",
                &[
                    ("id", returning_id.into()),
                    ("borrow", borrow_id.into()),
                    ("tool", tool.into()),
                ],
                StaffAction::ConfirmReturn(returning_id),
                None,
            )?;
            Outcome::Finalized(flow)
        }
        Finalized::Registered { name } => {
            let text = ctx.t_args("register-done", &[("name", name.into())]);
            ctx.reply(text);
            Outcome::Finalized(flow)
        }
        Finalized::ToolCreated { tool_id, name } => {
            let text = ctx.t_args("tool-created", &[("id", tool_id.into()), ("name", name.into())]);
            ctx.reply(text);
            Outcome::Finalized(flow)
        }
        Finalized::ToolUpdated { tool_id, name } => {
            let text = ctx.t_args("tool-updated", &[("id", tool_id.into()), ("name", name.into())]);
            ctx.reply(text);
            Outcome::Finalized(flow)
        }
        Finalized::PhotosAdded { tool_id, name, count } => {
            let text = ctx.t_args(
                "photos-added",
                &[("id", tool_id.into()), ("name", name.into()), ("count", count.into())],
            );
            ctx.reply(text);
            Outcome::Finalized(flow)
        }
    };
    Ok(outcome)
}

/// Posts a request to the staff chat with decision buttons.
fn notify_staff(
    ctx: &mut Ctx<'_>,
    key: &str,
    pairs: &[(&str, fluent_templates::fluent_bundle::FluentValue<'_>)],
    accept: StaffAction,
    reject: Option<StaffAction>,
) -> AppResult<()> {
    let Some(staff_chat_id) = ctx.config.staff_chat_id else {
        log::debug!("No STAFF_CHAT_ID configured, {} not forwarded", key);
        return Ok(());
    };

    let user = users::get_user(ctx.conn, ctx.inbound.user_id)?
        .map(|user| user.display_name())
        .unwrap_or_else(|| ctx.inbound.user_id.to_string());

    let lang = ctx.default_lang();
    let mut args = fluent_args(pairs);
    args.set("user", user);
    let text = i18n::t_args(&lang, key, &args);

    ctx.send_to(staff_chat_id, text, Some(keyboards::staff_decision(&lang, accept, reject)));
    Ok(())
}
