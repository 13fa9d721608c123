//! Command handlers

use lendcore::core::validation::parse_id;
use lendcore::session::lifecycle;
use lendcore::session::topic::FlowMode;
use lendcore::storage::sessions::Session;
use lendcore::storage::{borrows, tools, users};
use lendcore::{AppError, AppResult};

use crate::telegram::bot::Command;
use crate::telegram::messenger::Outgoing;
use crate::telegram::router::{Ctx, Outcome};
use crate::telegram::staff::{self, StaffAction};
use crate::telegram::steps;

/// Runs a command. `session` is the user's open session in this chat, if any.
pub(crate) fn dispatch(ctx: &mut Ctx<'_>, name: &str, args: &str, session: Option<&Session>) -> AppResult<Outcome> {
    let Some(command) = Command::parse(name) else {
        let text = ctx.t_args("command-unknown", &[("command", name.into())]);
        ctx.reply(text);
        return Ok(Outcome::Replied);
    };

    if command.is_staff_only() && !ctx.is_staff() {
        log::info!("🚫 User {} tried staff command /{}", ctx.inbound.user_id, command);
        let text = ctx.t("staff-only");
        ctx.reply(text);
        return Ok(Outcome::Denied);
    }

    match command {
        Command::Start => start(ctx),
        Command::Help => help(ctx),
        Command::Cek => cek(ctx, args),
        Command::Batal => cancel(ctx, session),
        Command::Lokasi => location(ctx),
        Command::Status => status(ctx),
        Command::Konfirmasi => staff_command(ctx, args, StaffAction::ConfirmBorrow),
        Command::Tolak => staff_command(ctx, args, StaffAction::RejectBorrow),
        Command::Terima => staff_command(ctx, args, StaffAction::ConfirmReturn),
        Command::Pinjam => open_flow(ctx, FlowMode::Borrow, session),
        Command::Kembali => open_flow(ctx, FlowMode::Return, session),
        Command::Daftar => open_flow(ctx, FlowMode::Register, session),
        Command::Tambah => open_flow(ctx, FlowMode::Add, session),
        Command::Edit => open_flow(ctx, FlowMode::Edit, session),
        Command::Foto => open_flow(ctx, FlowMode::Photo, session),
    }
}

/// Opens a session for `flow` after checking the user may start it.
fn open_flow(ctx: &mut Ctx<'_>, flow: FlowMode, session: Option<&Session>) -> AppResult<Outcome> {
    if session.is_some() {
        let text = ctx.t("session-busy");
        ctx.reply(text);
        return Ok(Outcome::Denied);
    }

    let user_id = ctx.inbound.user_id;
    let registered = users::get_user(ctx.conn, user_id)?.is_some_and(|user| user.registered);

    let refusal = match flow {
        FlowMode::Borrow | FlowMode::Return if !registered => Some("register-first"),
        FlowMode::Register if registered => Some("register-already"),
        FlowMode::Borrow if !tools::list_tools(ctx.conn)?.iter().any(|tool| tool.stock > 0) => {
            Some("borrow-no-tools")
        }
        FlowMode::Return if borrows::list_returnable_borrows(ctx.conn, user_id)?.is_empty() => Some("return-none"),
        FlowMode::Edit | FlowMode::Photo if tools::list_tools(ctx.conn)?.is_empty() => Some("tools-empty"),
        _ => None,
    };
    if let Some(key) = refusal {
        let text = ctx.t(key);
        ctx.reply(text);
        return Ok(Outcome::Denied);
    }

    let session = match lifecycle::open(ctx.conn, user_id, ctx.inbound.request_type, flow) {
        Ok(session) => session,
        Err(AppError::SessionAlreadyOpen { .. }) => {
            let text = ctx.t("session-busy");
            ctx.reply(text);
            return Ok(Outcome::Denied);
        }
        Err(e) => return Err(e),
    };

    steps::prompt(ctx, &session, flow.init_topic())?;
    Ok(Outcome::Opened(flow))
}

fn start(ctx: &mut Ctx<'_>) -> AppResult<Outcome> {
    let user = users::get_user(ctx.conn, ctx.inbound.user_id)?;
    let name = user
        .as_ref()
        .map(|u| u.display_name())
        .unwrap_or_else(|| ctx.inbound.user_id.to_string());

    let mut text = ctx.t_args("start-welcome", &[("name", name.into())]);
    if !user.is_some_and(|u| u.registered) {
        text.push_str("\n\n");
        text.push_str(&ctx.t("start-register-hint"));
    }
    ctx.reply(text);
    Ok(Outcome::Replied)
}

fn help(ctx: &mut Ctx<'_>) -> AppResult<Outcome> {
    let mut text = ctx.t("help-text");
    if ctx.is_staff() {
        text.push_str("\n\n");
        text.push_str(&ctx.t("help-staff"));
    }
    ctx.reply(text);
    Ok(Outcome::Replied)
}

/// `/cek` lists all tools, `/cek <id>` shows one tool with its photos.
fn cek(ctx: &mut Ctx<'_>, args: &str) -> AppResult<Outcome> {
    if args.is_empty() {
        let all = tools::list_tools(ctx.conn)?;
        if all.is_empty() {
            let text = ctx.t("tools-empty");
            ctx.reply(text);
            return Ok(Outcome::Replied);
        }
        let mut text = ctx.t("tools-list-header");
        for tool in &all {
            text.push('\n');
            text.push_str(&ctx.t_args(
                "tools-list-line",
                &[
                    ("id", tool.id.into()),
                    ("name", tool.name.as_str().into()),
                    ("brand", tool.brand.as_str().into()),
                    ("type", tool.product_type.as_str().into()),
                    ("stock", tool.stock.into()),
                ],
            ));
        }
        ctx.reply(text);
        return Ok(Outcome::Replied);
    }

    let tool_id = match parse_id(args) {
        Ok(id) => id,
        Err(e) => {
            let text = ctx.validation_message(&e);
            ctx.reply(text);
            return Ok(Outcome::Replied);
        }
    };
    let Some(tool) = tools::get_tool(ctx.conn, tool_id)? else {
        let text = ctx.t_args("tool-not-found", &[("id", tool_id.into())]);
        ctx.reply(text);
        return Ok(Outcome::Replied);
    };

    let text = ctx.t_args(
        "tool-detail",
        &[
            ("id", tool.id.into()),
            ("name", tool.name.as_str().into()),
            ("brand", tool.brand.as_str().into()),
            ("type", tool.product_type.as_str().into()),
            ("weight", tool.weight.into()),
            ("stock", tool.stock.into()),
            ("info", info_or_dash(&tool.info).into()),
        ],
    );
    ctx.reply(text);

    for (index, photo) in tools::get_tool_photos(ctx.conn, tool.id)?.into_iter().enumerate() {
        ctx.replies.push(Outgoing::Photo {
            chat_id: ctx.inbound.chat_id,
            file_id: photo.file_id,
            caption: (index == 0).then(|| tool.name.clone()),
        });
    }
    Ok(Outcome::Replied)
}

pub(crate) fn info_or_dash(info: &str) -> &str {
    if info.is_empty() {
        "-"
    } else {
        info
    }
}

fn cancel(ctx: &mut Ctx<'_>, session: Option<&Session>) -> AppResult<Outcome> {
    let Some(session) = session else {
        let text = ctx.t("cancel-nothing");
        ctx.reply(text);
        return Ok(Outcome::Replied);
    };

    lifecycle::close(ctx.conn, &session.id)?;
    log::info!("↩️ User {} cancelled {} session {}", session.user_id, session.flow, session.id);

    let flow = ctx.t(&format!("flow-{}", session.flow));
    let text = ctx.t_args("cancel-done", &[("flow", flow.into())]);
    ctx.reply(text);
    Ok(Outcome::Cancelled)
}

fn location(ctx: &mut Ctx<'_>) -> AppResult<Outcome> {
    match ctx.config.lab_location {
        Some(location) => {
            let text = ctx.t("location-caption");
            ctx.reply(text);
            ctx.replies.push(Outgoing::Location {
                chat_id: ctx.inbound.chat_id,
                latitude: location.latitude,
                longitude: location.longitude,
                heading: location.heading,
            });
        }
        None => {
            let text = ctx.t("location-unset");
            ctx.reply(text);
        }
    }
    Ok(Outcome::Replied)
}

/// The user's borrows with their status.
fn status(ctx: &mut Ctx<'_>) -> AppResult<Outcome> {
    let list = borrows::list_user_borrows(ctx.conn, ctx.inbound.user_id)?;
    if list.is_empty() {
        let text = ctx.t("status-empty");
        ctx.reply(text);
        return Ok(Outcome::Replied);
    }

    let mut text = ctx.t("status-header");
    for borrow in &list {
        let tool_name = tools::get_tool(ctx.conn, borrow.tool_id)?
            .map(|tool| tool.name)
            .unwrap_or_else(|| format!("#{}", borrow.tool_id));
        let status = ctx.t(&format!("borrow-status-{}", borrow.status));
        text.push('\n');
        text.push_str(&ctx.t_args(
            "status-line",
            &[
                ("id", borrow.id.into()),
                ("tool", tool_name.into()),
                ("days", borrow.duration_days.into()),
                ("status", status.into()),
            ],
        ));
    }
    ctx.reply(text);
    Ok(Outcome::Replied)
}

fn staff_command(ctx: &mut Ctx<'_>, args: &str, action: fn(i64) -> StaffAction) -> AppResult<Outcome> {
    match parse_id(args) {
        Ok(id) => staff::decide(ctx, action(id)),
        Err(e) => {
            let text = ctx.validation_message(&e);
            ctx.reply(text);
            Ok(Outcome::Replied)
        }
    }
}
