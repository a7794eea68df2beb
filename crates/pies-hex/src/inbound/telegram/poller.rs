use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pies_telegram::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup,
    ReplyKeyboardRemove, ReplyMarkup, SendMessage, Update,
};
use pies_telegram::BotClient;
use pies_types::ports::store::Store;
use tokio::task::JoinSet;

use crate::application::chat::{ChatId, Inbound, Keyboard, Reply};
use crate::application::messages;
use crate::application::router::Router;

/// Telegram rejects longer message texts.
pub const MAX_MESSAGE_LEN: usize = 4096;

const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub struct TelegramPoller<S: Store> {
    bot: BotClient,
    router: Arc<Router<S>>,
    poll_timeout_secs: u32,
}

impl<S: Store> TelegramPoller<S> {
    pub fn new(bot: BotClient, router: Arc<Router<S>>, poll_timeout_secs: u32) -> Self {
        Self {
            bot,
            router,
            poll_timeout_secs,
        }
    }

    /// Long-polls forever. Transport errors back off exponentially.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut offset = None;
        let mut backoff = MIN_BACKOFF;
        tracing::info!("telegram polling started");
        loop {
            let updates = match self.bot.get_updates(offset, self.poll_timeout_secs).await {
                Ok(updates) => {
                    backoff = MIN_BACKOFF;
                    updates
                }
                Err(e) => {
                    tracing::warn!(error = format!("{e:#}"), ?backoff, "getUpdates failed");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };
            if let Some(last) = updates.last() {
                offset = Some(last.update_id + 1);
            }
            self.handle_batch(updates).await;
        }
    }

    /// Updates of one chat run in order; different chats run concurrently.
    /// Returns once the whole batch is handled, so the next batch never
    /// overlaps a chat that is still busy.
    pub async fn handle_batch(&self, updates: Vec<Update>) {
        let mut by_chat: BTreeMap<ChatId, Vec<Update>> = BTreeMap::new();
        for update in updates {
            match update.chat_id() {
                Some(chat) => by_chat.entry(chat).or_default().push(update),
                None => tracing::debug!(update_id = update.update_id, "skipping update without chat"),
            }
        }

        let mut tasks = JoinSet::new();
        for (chat, batch) in by_chat {
            let bot = self.bot.clone();
            let router = self.router.clone();
            tasks.spawn(async move {
                for update in batch {
                    handle_update(&bot, &router, chat, update).await;
                }
            });
        }
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                tracing::error!(error = %e, "update handler panicked");
            }
        }
    }
}

async fn handle_update<S: Store>(bot: &BotClient, router: &Router<S>, chat: ChatId, update: Update) {
    let (sender, input, callback_id) = if let Some(query) = update.callback_query {
        let data = query.data.unwrap_or_default();
        (query.from.id, Inbound::Callback(data), Some(query.id))
    } else if let Some(message) = update.message {
        let Some(from) = message.from else {
            return;
        };
        match message.text {
            Some(text) => (from.id, Inbound::Text(text), None),
            None => {
                if router.is_operator(from.id) {
                    send(bot, SendMessage::text(chat, messages::TEXT_EXPECTED)).await;
                }
                return;
            }
        }
    } else {
        return;
    };

    let Some(reply) = router.handle(sender, chat, input).await else {
        return;
    };
    if let Some(id) = callback_id {
        if let Err(e) = bot.answer_callback_query(&id).await {
            tracing::warn!(chat, error = format!("{e:#}"), "failed to answer callback");
        }
    }
    for msg in to_send_messages(chat, reply) {
        send(bot, msg).await;
    }
}

async fn send(bot: &BotClient, msg: SendMessage) {
    if let Err(e) = bot.send_message(&msg).await {
        tracing::warn!(chat = msg.chat_id, error = format!("{e:#}"), "failed to send reply");
    }
}

/// Maps a reply to Bot API messages, splitting texts over the length limit.
/// The keyboard rides on the last part.
pub fn to_send_messages(chat: ChatId, reply: Reply) -> Vec<SendMessage> {
    let mut parts: Vec<SendMessage> = split_text(&reply.text, MAX_MESSAGE_LEN)
        .into_iter()
        .map(|text| SendMessage::text(chat, text))
        .collect();
    if let Some(last) = parts.last_mut() {
        last.reply_markup = reply.keyboard.map(reply_markup);
    }
    parts
}

fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => ReplyMarkup::Inline(InlineKeyboardMarkup {
            inline_keyboard: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|b| InlineKeyboardButton {
                            text: b.label,
                            callback_data: b.data,
                        })
                        .collect()
                })
                .collect(),
        }),
        Keyboard::Options(rows) => ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
            keyboard: rows
                .into_iter()
                .map(|row| row.into_iter().map(|text| KeyboardButton { text }).collect())
                .collect(),
            resize_keyboard: true,
            one_time_keyboard: true,
        }),
        Keyboard::Remove => ReplyMarkup::Remove(ReplyKeyboardRemove {
            remove_keyboard: true,
        }),
    }
}

// Telegram measures length in UTF-16 code units.
fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Splits on line breaks where possible, mid-line only for overlong lines.
fn split_text(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for line in text.split_inclusive('\n') {
        if utf16_len(&current) + utf16_len(line) <= limit {
            current.push_str(line);
            continue;
        }
        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        for ch in line.chars() {
            if utf16_len(&current) + ch.len_utf16() > limit {
                parts.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
    }
    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}
