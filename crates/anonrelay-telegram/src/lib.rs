//! Telegram adapter (teloxide).
//!
//! This crate implements the `anonrelay-core` PlatformPort over the Telegram Bot API.
//! A group is a Telegram group/supergroup; a channel is a forum topic inside it, with
//! messages outside any topic living in [`ChannelId::GENERAL`].

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ChatAction, ParseMode},
    ApiError, RequestError,
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use anonrelay_core::{
    domain::{
        ChannelId, ChannelInfo, Conversation, GroupId, GroupInfo, MessageId, MessageRef,
        PermissionSet, UserId,
    },
    errors::Error,
    platform::port::PlatformPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
    me: teloxide::types::UserId,
}

impl TelegramPlatform {
    pub fn new(bot: Bot, me: teloxide::types::UserId) -> Self {
        Self { bot, me }
    }

    fn tg_chat(id: i64) -> teloxide::types::ChatId {
        teloxide::types::ChatId(id)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    /// Chat id and (for topics) thread id a conversation maps to.
    fn route(to: Conversation) -> (teloxide::types::ChatId, Option<i32>) {
        match to {
            Conversation::Channel { group, channel } => {
                let thread = (channel != ChannelId::GENERAL)
                    .then(|| i32::try_from(channel.0).ok())
                    .flatten();
                (Self::tg_chat(group.0), thread)
            }
            Conversation::Direct(chat) => (Self::tg_chat(chat.0), None),
        }
    }

    fn map_err(e: RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry_raw<T, Fut>(
        &self,
        mut op: impl FnMut() -> Fut,
    ) -> std::result::Result<T, RequestError>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(d).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn with_retry<T, Fut>(&self, op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        self.with_retry_raw(op).await.map_err(Self::map_err)
    }

    /// Bot API answers meaning the chat or topic no longer exists for us.
    fn is_gone(e: &ApiError) -> bool {
        match e {
            ApiError::ChatNotFound | ApiError::BotKicked | ApiError::BotKickedFromSupergroup => {
                true
            }
            ApiError::Unknown(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("message thread not found") || msg.contains("topic_deleted")
            }
            _ => false,
        }
    }

    /// Like `with_retry`, but an answer saying the entity is gone is `None`.
    /// Any other refusal stays an error so stored bindings are not purged over it.
    async fn lookup<T, Fut>(&self, op: impl FnMut() -> Fut) -> Result<Option<T>>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        match self.with_retry_raw(op).await {
            Ok(v) => Ok(Some(v)),
            Err(RequestError::Api(e)) if Self::is_gone(&e) => Ok(None),
            Err(other) => Err(Self::map_err(other)),
        }
    }
}

#[async_trait]
impl PlatformPort for TelegramPlatform {
    async fn resolve_group(&self, group: GroupId) -> Result<Option<GroupInfo>> {
        let chat_id = Self::tg_chat(group.0);
        let Some(chat) = self.lookup(|| self.bot.get_chat(chat_id)).await? else {
            return Ok(None);
        };
        // Public groups stay visible after a kick; membership decides.
        let member = self
            .lookup(|| self.bot.get_chat_member(chat_id, self.me))
            .await?;
        if !member.is_some_and(|m| m.kind.is_present()) {
            return Ok(None);
        }
        Ok(Some(GroupInfo {
            id: group,
            title: chat.title().unwrap_or("untitled group").to_string(),
        }))
    }

    async fn own_permissions(&self, group: GroupId) -> Result<PermissionSet> {
        let member = self
            .lookup(|| self.bot.get_chat_member(Self::tg_chat(group.0), self.me))
            .await?;
        Ok(member
            .map(|m| PermissionSet {
                can_send_messages: m.kind.can_send_messages(),
                can_manage_messages: m.kind.can_delete_messages(),
            })
            .unwrap_or_default())
    }

    async fn group_owner(&self, group: GroupId) -> Result<Option<UserId>> {
        let admins = self
            .lookup(|| self.bot.get_chat_administrators(Self::tg_chat(group.0)))
            .await?
            .unwrap_or_default();
        Ok(admins
            .iter()
            .find(|m| m.kind.is_owner())
            .map(|m| UserId(m.user.id.0 as i64)))
    }

    async fn resolve_channel(
        &self,
        group: GroupId,
        channel: ChannelId,
    ) -> Result<Option<ChannelInfo>> {
        if channel == ChannelId::GENERAL {
            return Ok(Some(ChannelInfo {
                id: channel,
                name: "General".to_string(),
            }));
        }
        let Ok(thread) = i32::try_from(channel.0) else {
            return Ok(None);
        };

        // The Bot API cannot list topics; a chat action into the thread is a harmless probe.
        let probe = self
            .lookup(|| {
                self.bot
                    .send_chat_action(Self::tg_chat(group.0), ChatAction::Typing)
                    .message_thread_id(thread)
            })
            .await?;
        Ok(probe.map(|_| ChannelInfo {
            id: channel,
            name: format!("topic #{thread}"),
        }))
    }

    async fn send_html(&self, to: Conversation, html: &str) -> Result<MessageRef> {
        let (chat_id, thread) = Self::route(to);
        let msg = self
            .with_retry(|| {
                let req = self
                    .bot
                    .send_message(chat_id, html.to_string())
                    .parse_mode(ParseMode::Html);
                match thread {
                    Some(t) => req.message_thread_id(t),
                    None => req,
                }
            })
            .await?;

        Ok(MessageRef {
            conversation: to,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        let (chat_id, _) = Self::route(msg.conversation);
        self.with_retry(|| {
            self.bot
                .delete_message(chat_id, Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anonrelay_core::domain::ChatId;

    #[test]
    fn general_channel_posts_without_thread() {
        let (chat, thread) = TelegramPlatform::route(Conversation::Channel {
            group: GroupId(-100),
            channel: ChannelId::GENERAL,
        });
        assert_eq!(chat, teloxide::types::ChatId(-100));
        assert_eq!(thread, None);
    }

    #[test]
    fn topics_post_into_their_thread() {
        let (_, thread) = TelegramPlatform::route(Conversation::Channel {
            group: GroupId(-100),
            channel: ChannelId(42),
        });
        assert_eq!(thread, Some(42));
    }

    #[test]
    fn only_vanished_entities_count_as_gone() {
        assert!(TelegramPlatform::is_gone(&ApiError::ChatNotFound));
        assert!(TelegramPlatform::is_gone(&ApiError::BotKickedFromSupergroup));
        assert!(TelegramPlatform::is_gone(&ApiError::Unknown(
            "Bad Request: message thread not found".to_string()
        )));

        assert!(!TelegramPlatform::is_gone(&ApiError::Unknown(
            "Bad Request: TOPIC_CLOSED".to_string()
        )));
        assert!(!TelegramPlatform::is_gone(&ApiError::Unknown(
            "Bad Request: not enough rights to send text messages to the chat".to_string()
        )));
        assert!(!TelegramPlatform::is_gone(&ApiError::MessageToDeleteNotFound));
    }

    #[test]
    fn direct_messages_go_to_the_private_chat() {
        let (chat, thread) = TelegramPlatform::route(Conversation::Direct(ChatId(7)));
        assert_eq!(chat, teloxide::types::ChatId(7));
        assert_eq!(thread, None);
    }
}
