use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use pies_types::ports::store::Store;
use tokio::time::Instant;

use crate::application::chat::{ChatId, Inbound, Reply, UserId};
use crate::application::dialogue::{Dialogue, DialogueState, Step};
use crate::application::messages;
use crate::application::order_service::OrderService;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    AddClient,
    NewOrder,
    Report(String),
    DeleteOrder(String),
    Clients,
    Cancel,
    Unknown,
}

/// Splits `/name@bot args` into a command; `None` for plain text.
fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let body = text.strip_prefix('/')?;
    let (head, args) = match body.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim().to_string()),
        None => (body, String::new()),
    };
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    Some(match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "add_client" => Command::AddClient,
        "new_order" => Command::NewOrder,
        "report" => Command::Report(args),
        "delete_order" => Command::DeleteOrder(args),
        "clients" => Command::Clients,
        "cancel" => Command::Cancel,
        _ => Command::Unknown,
    })
}

struct Session {
    state: DialogueState,
    touched: Instant,
}

/// Entry point for every operator message: checks the allow-list, owns the
/// per-chat sessions and hands each message to a command or the open dialogue.
pub struct Router<S: Store> {
    service: Arc<OrderService<S>>,
    dialogue: Dialogue<S>,
    operators: HashSet<UserId>,
    sessions: DashMap<ChatId, Session>,
    idle_timeout: Duration,
}

impl<S: Store> Router<S> {
    pub fn new(
        service: Arc<OrderService<S>>,
        operators: impl IntoIterator<Item = UserId>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            dialogue: Dialogue::new(service.clone()),
            service,
            operators: operators.into_iter().collect(),
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn is_operator(&self, user: UserId) -> bool {
        self.operators.contains(&user)
    }

    /// Messages of one chat must be handled one at a time; the session is
    /// taken out of the table while its step runs.
    pub async fn handle(&self, sender: UserId, chat: ChatId, input: Inbound) -> Option<Reply> {
        if !self.is_operator(sender) {
            tracing::debug!(sender, chat, "ignoring message from non-operator");
            return None;
        }

        let session = self.take_session(chat);
        let command = match &input {
            Inbound::Text(text) => parse_command(text),
            Inbound::Callback(_) => None,
        };

        let reply = match (session, command) {
            (Some(_), Some(Command::Cancel)) => {
                tracing::info!(chat, "dialogue cancelled");
                Reply::text(messages::CANCELLED)
            }
            (Some(state), _) => {
                let step = self.dialogue.advance(state, input).await;
                self.apply(chat, step)
            }
            (None, Some(command)) => self.command(chat, command).await,
            (None, None) => match input {
                Inbound::Text(_) => Reply::text(messages::UNKNOWN_INPUT),
                Inbound::Callback(_) => Reply::text(messages::STALE_BUTTON),
            },
        };
        Some(reply)
    }

    async fn command(&self, chat: ChatId, command: Command) -> Reply {
        tracing::debug!(chat, ?command, "command");
        match command {
            Command::Start | Command::Help => Reply::text(messages::HELP),
            Command::AddClient => self.apply(chat, self.dialogue.start_add_customer()),
            Command::NewOrder => self.apply(chat, self.dialogue.start_order()),
            Command::Report(args) if args.is_empty() => {
                self.apply(chat, self.dialogue.start_report())
            }
            Command::Report(args) => {
                let step = self
                    .dialogue
                    .advance(DialogueState::Report, Inbound::Text(args))
                    .await;
                self.apply(chat, step)
            }
            Command::DeleteOrder(args) if args.is_empty() => {
                self.apply(chat, self.dialogue.start_delete())
            }
            Command::DeleteOrder(args) => {
                let step = self
                    .dialogue
                    .advance(DialogueState::DeleteOrder, Inbound::Text(args))
                    .await;
                self.apply(chat, step)
            }
            Command::Clients => match self.service.list_customers().await {
                Ok(list) => Reply::text(messages::customers(&list)),
                Err(e) => {
                    tracing::error!(error = %e, "failed to list customers");
                    Reply::text(messages::GENERIC_FAILURE)
                }
            },
            Command::Cancel => Reply::text(messages::NOTHING_TO_CANCEL),
            Command::Unknown => Reply::text(messages::UNKNOWN_INPUT),
        }
    }

    fn apply(&self, chat: ChatId, step: Step) -> Reply {
        if let Some(state) = step.next {
            self.sessions.insert(
                chat,
                Session {
                    state,
                    touched: Instant::now(),
                },
            );
        }
        step.reply
    }

    fn take_session(&self, chat: ChatId) -> Option<DialogueState> {
        let (_, session) = self.sessions.remove(&chat)?;
        if session.touched.elapsed() > self.idle_timeout {
            tracing::debug!(chat, "dialogue expired");
            return None;
        }
        Some(session.state)
    }

    pub fn has_session(&self, chat: ChatId) -> bool {
        self.sessions.contains_key(&chat)
    }
}
