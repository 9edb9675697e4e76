//! Mapping from Telegram updates to wizard inputs.
//!
//! Each update becomes at most one [`InboundEvent`]. Updates the bot cannot
//! use (non-text messages, bot senders, foreign button payloads) map to
//! `None` and are logged; they never reach the wizard.

use kbuilder_core::presentation::inbound::{normalize_choice, normalize_text, Input};
use kbuilder_types::session::SessionId;

use super::types::{CallbackQuery, Message, Update};

/// One normalized inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Wizard session the input belongs to.
    pub session_id: SessionId,
    /// Chat to reply in.
    pub chat_id: i64,
    pub input: Input,
}

/// Normalize one update.
pub fn normalize_update(update: &Update) -> Option<InboundEvent> {
    if let Some(message) = &update.message {
        return from_message(update.update_id, message);
    }
    if let Some(query) = &update.callback_query {
        return from_callback(update.update_id, query);
    }

    tracing::warn!(update_id = update.update_id, "update without message or callback ignored");
    None
}

fn from_message(update_id: i64, message: &Message) -> Option<InboundEvent> {
    let Some(user) = message.from.as_ref().filter(|user| !user.is_bot) else {
        tracing::debug!(update_id, "message without a human sender ignored");
        return None;
    };
    let Some(text) = message.text.as_deref() else {
        tracing::debug!(update_id, "non-text message ignored");
        return None;
    };

    Some(InboundEvent {
        session_id: SessionId::from_chat_user(message.chat.id, user.id),
        chat_id: message.chat.id,
        input: normalize_text(text),
    })
}

fn from_callback(update_id: i64, query: &CallbackQuery) -> Option<InboundEvent> {
    let Some(message) = &query.message else {
        tracing::warn!(update_id, "callback query without its message ignored");
        return None;
    };
    let Some(input) = query.data.as_deref().and_then(normalize_choice) else {
        tracing::warn!(update_id, data = ?query.data, "unrecognized callback payload ignored");
        return None;
    };

    Some(InboundEvent {
        session_id: SessionId::from_chat_user(message.chat.id, query.from.id),
        chat_id: message.chat.id,
        input,
    })
}
