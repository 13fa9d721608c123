use clap::{Parser, Subcommand};
use lendcore::session::lifecycle::{self, SessionState};
use lendcore::session::reconstruct::reconstruct;
use lendcore::session::topic::RequestType;
use lendcore::AppResult;
use rusqlite::Connection;

#[derive(Parser)]
#[command(name = "lendbot")]
#[command(author, version, about = "Telegram bot for lending lab tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (default)
    Run {
        /// Receive updates through WEBHOOK_URL instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Inspect conversation sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Show a user's open sessions and the drafts rebuilt from them
    Show {
        /// Telegram user id
        user_id: i64,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Describes the user's open sessions (private and group), one block each.
pub fn describe_sessions(conn: &Connection, user_id: i64) -> AppResult<String> {
    let mut out = String::new();

    for request_type in [RequestType::Private, RequestType::Group] {
        let (session, topic) = match lifecycle::state_for(conn, user_id, request_type)? {
            SessionState::Idle => continue,
            SessionState::InFlow { session, topic } => (session, topic.to_string()),
            SessionState::Stale { session } => (session, "unknown".to_string()),
        };
        let details = lifecycle::details(conn, &session.id)?;

        out.push_str(&format!(
            "{} session {} ({}), opened {}\n",
            request_type, session.id, session.flow, session.created_at
        ));
        out.push_str(&format!("  current topic: {}\n", topic));
        for detail in &details {
            let tag = detail.topic.map_or_else(|| "?".to_string(), |t| t.to_string());
            out.push_str(&format!("  #{} {} {}\n", detail.id, tag, detail.payload));
        }
        out.push_str(&format!("  draft: {:?}\n", reconstruct(session.flow, &details)));
    }

    if out.is_empty() {
        out = format!("User {} has no open session\n", user_id);
    }
    Ok(out)
}
