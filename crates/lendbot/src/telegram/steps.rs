//! Per-topic step handlers
//!
//! The newest detail's topic is the question the session is waiting on. A
//! valid answer is recorded as a detail tagged with the next topic and that
//! topic's question is asked; an invalid one is explained and the same
//! question is asked again. At a flow's confirm topic the answer is yes/no
//! and hands over to `finalize`.

use std::str::FromStr;

use chrono::Datelike;
use fluent_templates::fluent_bundle::FluentValue;
use lendcore::core::config::session::MAX_BORROW_DAYS;
use lendcore::core::validation::{
    is_done_keyword, parse_batch_year, parse_duration_days, parse_id, parse_stock, parse_weight, parse_yes_no,
    validate_name, validate_nim, validate_text, ValidationError,
};
use lendcore::session::lifecycle;
use lendcore::session::photo::{pick_best, PhotoRef};
use lendcore::session::reconstruct::{reconstruct, Aggregate, ToolDraft};
use lendcore::session::topic::{EditField, FlowMode, Topic};
use lendcore::session::{EditChange, Payload};
use lendcore::storage::sessions::Session;
use lendcore::storage::{borrows, tools};
use lendcore::{AppError, AppResult};
use rusqlite::Connection;
use strum::IntoEnumIterator;

use crate::telegram::finalize;
use crate::telegram::inbound::Content;
use crate::telegram::keyboards;
use crate::telegram::router::{Ctx, Outcome};

/// What an accepted input means for the session.
#[derive(Debug, PartialEq)]
enum Answer {
    /// Record this detail and ask its question
    Record(Payload),
    /// Final yes/no
    Confirm(bool),
    /// The session cannot continue from its current state
    Expire,
}

/// Interprets the user's input at `topic`.
pub(crate) fn handle(ctx: &mut Ctx<'_>, session: &Session, topic: Topic) -> AppResult<Outcome> {
    if topic.flow() != session.flow {
        log::warn!(
            "⚠️ Session {} ({}) is at foreign topic {}",
            session.id,
            session.flow,
            topic
        );
        return expire(ctx, session, Some(topic));
    }

    match read_answer(ctx, session, topic) {
        Ok(Answer::Record(next)) => {
            lifecycle::append_detail(ctx.conn, session, &next)?;
            let reached = next.topic();
            prompt(ctx, session, reached)?;
            Ok(Outcome::Advanced(reached))
        }
        Ok(Answer::Confirm(answer)) => finalize::run(ctx, session, answer),
        Ok(Answer::Expire) => expire(ctx, session, Some(topic)),
        Err(AppError::Validation(e)) => {
            log::debug!("Session {} rejected input at {}: {}", session.id, topic, e);
            let text = ctx.validation_message(&e);
            ctx.reply(text);
            prompt(ctx, session, topic)?;
            Ok(Outcome::Reprompted(topic))
        }
        Err(e) => Err(e),
    }
}

fn read_answer(ctx: &Ctx<'_>, session: &Session, topic: Topic) -> AppResult<Answer> {
    use Topic::*;

    let answer = match topic {
        BorrowInit => {
            let tool_id = parse_id(text(ctx)?)?;
            match tools::get_tool(ctx.conn, tool_id)? {
                Some(tool) if tool.stock > 0 => Answer::Record(Payload::BorrowDate { tool_id }),
                _ => return Err(ValidationError::UnknownTool(tool_id).into()),
            }
        }
        BorrowDate => Answer::Record(Payload::BorrowConfirm {
            duration: parse_duration_days(text(ctx)?)?,
        }),

        ReturnInit => {
            let borrow_id = parse_id(text(ctx)?)?;
            let returnable = borrows::list_returnable_borrows(ctx.conn, session.user_id)?;
            if !returnable.iter().any(|borrow| borrow.id == borrow_id) {
                return Err(ValidationError::UnknownBorrow(borrow_id).into());
            }
            Answer::Record(Payload::ReturnConfirm { borrow_id })
        }

        RegisterInit => Answer::Record(Payload::RegisterNim {
            name: validate_name(text(ctx)?)?,
        }),
        RegisterNim => Answer::Record(Payload::RegisterBatch {
            nim: validate_nim(text(ctx)?)?,
        }),
        RegisterBatch => Answer::Record(Payload::RegisterConfirm {
            batch_year: parse_batch_year(text(ctx)?, ctx.config.min_batch_year, current_year())?,
        }),

        ManageAddInit => Answer::Record(Payload::ManageAddBrand {
            name: validate_name(text(ctx)?)?,
        }),
        ManageAddBrand => Answer::Record(Payload::ManageAddType {
            brand: validate_name(text(ctx)?)?,
        }),
        ManageAddType => Answer::Record(Payload::ManageAddWeight {
            product_type: validate_name(text(ctx)?)?,
        }),
        ManageAddWeight => Answer::Record(Payload::ManageAddStock {
            weight: parse_weight(text(ctx)?)?,
        }),
        ManageAddStock => Answer::Record(Payload::ManageAddInfo {
            stock: parse_stock(text(ctx)?)?,
        }),
        ManageAddInfo => {
            let input = text(ctx)?;
            // Info is optional
            let info = if is_done_keyword(input) {
                String::new()
            } else {
                validate_text(input)?
            };
            Answer::Record(Payload::ManageAddPhoto {
                info: Some(info),
                photo: None,
            })
        }
        // Photos are optional when adding a tool
        ManageAddPhoto => match photo_or_done(ctx)? {
            Some(photo) => Answer::Record(Payload::ManageAddPhoto {
                info: None,
                photo: Some(photo),
            }),
            None => Answer::Record(Payload::ManageAddConfirm),
        },

        ManageEditInit => {
            let tool_id = parse_id(text(ctx)?)?;
            if tools::get_tool(ctx.conn, tool_id)?.is_none() {
                return Err(ValidationError::UnknownTool(tool_id).into());
            }
            Answer::Record(Payload::ManageEditTool { tool_id })
        }
        ManageEditTool => Answer::Record(Payload::edit_value(parse_field(text(ctx)?)?)),
        ManageEditName | ManageEditBrand | ManageEditType | ManageEditWeight | ManageEditStock | ManageEditInfo => {
            match EditField::from_value_topic(topic) {
                Some(field) => Answer::Record(Payload::ManageEditField {
                    change: edit_value(field, text(ctx)?)?,
                }),
                None => Answer::Expire,
            }
        }
        ManageEditField => {
            let input = text(ctx)?;
            if is_done_keyword(input) {
                Answer::Record(Payload::ManageEditConfirm)
            } else {
                Answer::Record(Payload::edit_value(parse_field(input)?))
            }
        }

        ManagePhotoInit => {
            let tool_id = parse_id(text(ctx)?)?;
            if tools::get_tool(ctx.conn, tool_id)?.is_none() {
                return Err(ValidationError::UnknownTool(tool_id).into());
            }
            Answer::Record(Payload::ManagePhotoTool { tool_id })
        }
        ManagePhotoTool => match photo_or_done(ctx)? {
            Some(photo) => Answer::Record(Payload::ManagePhotoUpload(photo)),
            None => return Err(ValidationError::NoPhotos.into()),
        },
        ManagePhotoUpload => match photo_or_done(ctx)? {
            Some(photo) => Answer::Record(Payload::ManagePhotoUpload(photo)),
            None => Answer::Record(Payload::ManagePhotoConfirm),
        },

        BorrowConfirm | ReturnConfirm | RegisterConfirm | ManageAddConfirm | ManageEditConfirm
        | ManagePhotoConfirm => Answer::Confirm(parse_yes_no(text(ctx)?)?),
    };
    Ok(answer)
}

/// Text answer: typed text or button data. Photos are refused.
fn text<'c>(ctx: &'c Ctx<'_>) -> Result<&'c str, ValidationError> {
    match &ctx.inbound.content {
        Content::Text(text) => Ok(text.trim()),
        Content::Callback { data, .. } => Ok(data.trim()),
        Content::Photo { .. } => Err(ValidationError::ExpectedText),
    }
}

/// The largest variant of an uploaded photo, or `None` for a "done" answer.
fn photo_or_done(ctx: &Ctx<'_>) -> Result<Option<PhotoRef>, ValidationError> {
    match &ctx.inbound.content {
        Content::Photo {
            variants,
            media_group_id,
            ..
        } => pick_best(variants)
            .cloned()
            .map(|best| Some(best.into_ref(media_group_id.clone())))
            .ok_or(ValidationError::ExpectedPhoto),
        _ if ctx.inbound.text().is_some_and(is_done_keyword) => Ok(None),
        _ => Err(ValidationError::ExpectedPhoto),
    }
}

fn parse_field(input: &str) -> Result<EditField, ValidationError> {
    EditField::from_str(input.trim()).map_err(|_| ValidationError::UnknownField(input.trim().to_string()))
}

fn edit_value(field: EditField, input: &str) -> Result<EditChange, ValidationError> {
    let change = match field {
        EditField::Name => EditChange::Name(validate_name(input)?),
        EditField::Brand => EditChange::Brand(validate_name(input)?),
        EditField::Type => EditChange::Type(validate_name(input)?),
        EditField::Weight => EditChange::Weight(parse_weight(input)?),
        EditField::Stock => EditChange::Stock(parse_stock(input)?),
        EditField::Info => EditChange::Info(validate_text(input)?),
    };
    Ok(change)
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Closes a session that cannot take more input. `at` is `None` when the
/// session's newest topic is not known.
pub(crate) fn expire(ctx: &mut Ctx<'_>, session: &Session, at: Option<Topic>) -> AppResult<Outcome> {
    match at {
        Some(topic) => log::warn!("⚠️ Session {} cannot continue from {}, closing it", session.id, topic),
        None => log::warn!("⚠️ Session {} is at an unknown topic, closing it", session.id),
    }
    lifecycle::close(ctx.conn, &session.id)?;
    let text = ctx.t("session-expired");
    ctx.reply(text);
    Ok(Outcome::Expired)
}

/// Asks the question of `topic`.
pub(crate) fn prompt(ctx: &mut Ctx<'_>, session: &Session, topic: Topic) -> AppResult<()> {
    use Topic::*;

    match topic {
        BorrowInit => {
            let available: Vec<_> = tools::list_tools(ctx.conn)?
                .into_iter()
                .filter(|tool| tool.stock > 0)
                .collect();
            let text = ctx.t("borrow-ask-tool");
            ctx.reply_with(text, keyboards::tools(&available));
        }
        BorrowDate => ask(ctx, "borrow-ask-days", &[("max", MAX_BORROW_DAYS.into())]),

        ReturnInit => {
            let mut labelled = Vec::new();
            for borrow in borrows::list_returnable_borrows(ctx.conn, session.user_id)? {
                let name = tool_name(ctx.conn, Some(borrow.tool_id))?;
                labelled.push((borrow, name));
            }
            let text = ctx.t("return-ask-borrow");
            ctx.reply_with(text, keyboards::borrows(&labelled));
        }

        RegisterInit => ask(ctx, "register-ask-name", &[]),
        RegisterNim => ask(ctx, "register-ask-nim", &[]),
        RegisterBatch => {
            let min = ctx.config.min_batch_year;
            ask(ctx, "register-ask-batch", &[("min", min.into()), ("max", current_year().into())]);
        }

        ManageAddInit => ask(ctx, "add-ask-name", &[]),
        ManageAddBrand => ask(ctx, "add-ask-brand", &[]),
        ManageAddType => ask(ctx, "add-ask-type", &[]),
        ManageAddWeight => ask(ctx, "add-ask-weight", &[]),
        ManageAddStock => ask(ctx, "add-ask-stock", &[]),
        ManageAddInfo => {
            let text = ctx.t("add-ask-info");
            ctx.reply_with(text, keyboards::done(&ctx.lang));
        }
        ManageAddPhoto | ManagePhotoUpload => photo_received(ctx, session)?,

        ManageEditInit | ManagePhotoInit => {
            let all = tools::list_tools(ctx.conn)?;
            let key = if topic == ManageEditInit {
                "edit-ask-tool"
            } else {
                "photo-ask-tool"
            };
            let text = ctx.t(key);
            ctx.reply_with(text, keyboards::tools(&all));
        }
        ManageEditTool => {
            let draft = tool_draft(ctx.conn, session)?;
            let name = tool_name(ctx.conn, draft.tool_id)?;
            let text = ctx.t_args("edit-ask-field", &[("tool", name.into())]);
            ctx.reply_with(text, keyboards::edit_fields(&ctx.lang, false));
        }
        ManageEditName | ManageEditBrand | ManageEditType | ManageEditWeight | ManageEditStock | ManageEditInfo => {
            let field = EditField::from_value_topic(topic)
                .map(|field| ctx.t(&format!("field-{}", field.as_ref())))
                .unwrap_or_default();
            ask(ctx, "edit-ask-value", &[("field", field.into())]);
        }
        ManageEditField => {
            let text = ctx.t("edit-ask-more");
            ctx.reply_with(text, keyboards::edit_fields(&ctx.lang, true));
        }
        ManagePhotoTool => {
            let draft = tool_draft(ctx.conn, session)?;
            let name = tool_name(ctx.conn, draft.tool_id)?;
            ask(ctx, "photo-ask-upload", &[("tool", name.into())]);
        }

        BorrowConfirm | ReturnConfirm | RegisterConfirm | ManageAddConfirm | ManageEditConfirm
        | ManagePhotoConfirm => summary(ctx, session)?,
    }
    Ok(())
}

fn ask(ctx: &mut Ctx<'_>, key: &str, args: &[(&str, FluentValue<'_>)]) {
    let text = ctx.t_args(key, args);
    ctx.reply(text);
}

fn tool_draft(conn: &Connection, session: &Session) -> AppResult<ToolDraft> {
    match reconstruct(session.flow, &lifecycle::details(conn, &session.id)?) {
        Aggregate::Tool(draft) => Ok(draft),
        _ => Ok(ToolDraft::default()),
    }
}

/// Tool name for messages, `#id` when the tool is gone.
pub(crate) fn tool_name(conn: &Connection, tool_id: Option<i64>) -> AppResult<String> {
    let Some(tool_id) = tool_id else {
        return Ok("-".to_string());
    };
    Ok(tools::get_tool(conn, tool_id)?
        .map(|tool| tool.name)
        .unwrap_or_else(|| format!("#{}", tool_id)))
}

/// Photo step of the add and photo flows: first ask, then a running count.
fn photo_received(ctx: &mut Ctx<'_>, session: &Session) -> AppResult<()> {
    let draft = tool_draft(ctx.conn, session)?;

    if draft.photos.is_empty() {
        let text = ctx.t("add-ask-photo");
        ctx.reply_with(text, keyboards::done(&ctx.lang));
        return Ok(());
    }

    // An album arrives as one message per photo; acknowledge it once
    if let Content::Photo {
        media_group_id: Some(group),
        ..
    } = &ctx.inbound.content
    {
        let seen = draft
            .photos
            .iter()
            .filter(|photo| photo.media_group_id.as_deref() == Some(group.as_str()))
            .count();
        if seen > 1 {
            return Ok(());
        }
    }

    let text = ctx.t_args("photo-received", &[("count", draft.photos.len().into())]);
    ctx.reply_with(text, keyboards::done(&ctx.lang));
    Ok(())
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// Recap shown with the yes/no question.
fn summary(ctx: &mut Ctx<'_>, session: &Session) -> AppResult<()> {
    let details = lifecycle::details(ctx.conn, &session.id)?;

    let text = match reconstruct(session.flow, &details) {
        Aggregate::Borrow(draft) => {
            let tool = tool_name(ctx.conn, draft.tool_id)?;
            ctx.t_args(
                "borrow-summary",
                &[
                    ("tool", tool.into()),
                    ("days", or_dash(draft.duration.map(|d| d.to_string())).into()),
                ],
            )
        }
        Aggregate::Return(draft) => {
            let borrow = match draft.borrow_id {
                Some(id) => borrows::get_borrow(ctx.conn, id)?,
                None => None,
            };
            let tool = tool_name(ctx.conn, borrow.as_ref().map(|b| b.tool_id))?;
            ctx.t_args(
                "return-summary",
                &[
                    ("id", or_dash(draft.borrow_id.map(|id| id.to_string())).into()),
                    ("tool", tool.into()),
                ],
            )
        }
        Aggregate::Registration(draft) => ctx.t_args(
            "register-summary",
            &[
                ("name", or_dash(draft.name).into()),
                ("nim", or_dash(draft.nim).into()),
                ("batch", or_dash(draft.batch_year.map(|y| y.to_string())).into()),
            ],
        ),
        Aggregate::Tool(draft) => match session.flow {
            FlowMode::Add => ctx.t_args(
                "add-summary",
                &[
                    ("name", or_dash(draft.name.clone()).into()),
                    ("brand", or_dash(draft.brand.clone()).into()),
                    ("type", or_dash(draft.product_type.clone()).into()),
                    ("weight", or_dash(draft.weight.map(|w| w.to_string())).into()),
                    ("stock", or_dash(draft.stock.map(|s| s.to_string())).into()),
                    ("info", or_dash(draft.info.clone().filter(|i| !i.is_empty())).into()),
                    ("photos", draft.photos.len().into()),
                ],
            ),
            FlowMode::Edit => {
                let tool = tool_name(ctx.conn, draft.tool_id)?;
                let changes = edit_changes(ctx, &draft);
                ctx.t_args("edit-summary", &[("tool", tool.into()), ("changes", changes.into())])
            }
            _ => {
                let tool = tool_name(ctx.conn, draft.tool_id)?;
                ctx.t_args(
                    "photo-summary",
                    &[("tool", tool.into()), ("count", draft.photos.len().into())],
                )
            }
        },
    };

    ctx.reply_with(text, keyboards::yes_no(&ctx.lang));
    Ok(())
}

/// One `label: value` line per edited field.
fn edit_changes(ctx: &Ctx<'_>, draft: &ToolDraft) -> String {
    let lines: Vec<String> = EditField::iter()
        .filter_map(|field| {
            let value = match field {
                EditField::Name => draft.name.clone(),
                EditField::Brand => draft.brand.clone(),
                EditField::Type => draft.product_type.clone(),
                EditField::Weight => draft.weight.map(|w| w.to_string()),
                EditField::Stock => draft.stock.map(|s| s.to_string()),
                EditField::Info => draft.info.clone(),
            }?;
            Some(format!("{}: {}", ctx.t(&format!("field-{}", field.as_ref())), value))
        })
        .collect();

    if lines.is_empty() {
        ctx.t("edit-no-changes")
    } else {
        lines.join("\n")
    }
}
