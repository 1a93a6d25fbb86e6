//! Telegram update handlers.
//!
//! Each handler maps a teloxide update into a core [`RelayEvent`] and hands it to the
//! core router while holding the relay lock, so events are processed one at a time.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{ChatMemberUpdated, Message, MessageKind},
};

use anonrelay_core::{
    domain::{
        Author, ChannelId, ChatId, Conversation, GroupId, GroupInfo, InboundMessage, MessageId,
        MessageRef, UserId,
    },
    platform::types::RelayEvent,
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(inbound) = inbound_message(&msg) else {
        return Ok(());
    };
    state.dispatch(RelayEvent::Message(inbound)).await;
    Ok(())
}

pub async fn handle_my_chat_member(
    update: ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    if let Some(event) = membership_event(&update) {
        state.dispatch(event).await;
    }
    Ok(())
}

fn inbound_message(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from()?;
    let text = msg.text()?;

    let conversation = if msg.chat.is_private() {
        Conversation::Direct(ChatId(msg.chat.id.0))
    } else if msg.chat.is_group() || msg.chat.is_supergroup() {
        Conversation::Channel {
            group: GroupId(msg.chat.id.0),
            channel: channel_of(msg),
        }
    } else {
        return None;
    };

    let display_name = match &user.username {
        Some(username) => format!("{} (@{username})", user.full_name()),
        None => user.full_name(),
    };

    Some(InboundMessage {
        id: MessageRef {
            conversation,
            message_id: MessageId(msg.id.0),
        },
        author: Author {
            id: UserId(user.id.0 as i64),
            display_name,
        },
        content: text.to_string(),
    })
}

/// Forum topic a message belongs to. Reply threads in plain groups are not topics.
fn channel_of(msg: &Message) -> ChannelId {
    match msg.thread_id {
        Some(thread) if matches!(&msg.kind, MessageKind::Common(c) if c.is_topic_message) => {
            ChannelId(i64::from(thread))
        }
        _ => ChannelId::GENERAL,
    }
}

fn membership_event(update: &ChatMemberUpdated) -> Option<RelayEvent> {
    if update.chat.is_private() || update.chat.is_channel() {
        return None;
    }
    let group = GroupInfo {
        id: GroupId(update.chat.id.0),
        title: update.chat.title().unwrap_or("untitled group").to_string(),
    };

    let was_present = update.old_chat_member.kind.is_present();
    let is_present = update.new_chat_member.kind.is_present();
    Some(match (was_present, is_present) {
        (false, true) => RelayEvent::JoinedGroup(group),
        (true, false) => RelayEvent::RemovedFromGroup(group),
        (true, true) => RelayEvent::MembershipChanged(group),
        (false, false) => return None,
    })
}
