use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Id of the group (chat community) the relay serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

/// Id of a channel inside a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub i64);

impl ChannelId {
    /// The channel every group has: messages that belong to no specific topic.
    pub const GENERAL: ChannelId = ChannelId(0);
}

/// Id of a private (direct message) chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Platform message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// Where a message lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Conversation {
    Channel { group: GroupId, channel: ChannelId },
    Direct(ChatId),
}

/// A stable reference to a platform message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub conversation: Conversation,
    pub message_id: MessageId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: GroupId,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

/// Capabilities the relay needs in its group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet {
    pub can_send_messages: bool,
    pub can_manage_messages: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    SendMessages,
    ManageMessages,
}

impl PermissionSet {
    pub fn all() -> Self {
        Self {
            can_send_messages: true,
            can_manage_messages: true,
        }
    }

    /// Missing permissions, in check order (send before manage).
    pub fn missing(&self) -> Vec<Permission> {
        let mut out = Vec::new();
        if !self.can_send_messages {
            out.push(Permission::SendMessages);
        }
        if !self.can_manage_messages {
            out.push(Permission::ManageMessages);
        }
        out
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::SendMessages => f.write_str("send message"),
            Permission::ManageMessages => f.write_str("manage messages"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub display_name: String,
}

/// Incoming text message, already mapped out of the platform's update model.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub id: MessageRef,
    pub author: Author,
    pub content: String,
}

impl InboundMessage {
    pub fn conversation(&self) -> Conversation {
        self.id.conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_permissions_are_ordered_send_first() {
        let none = PermissionSet::default();
        assert_eq!(
            none.missing(),
            vec![Permission::SendMessages, Permission::ManageMessages]
        );
        assert!(PermissionSet::all().missing().is_empty());
    }

    #[test]
    fn permission_causes_read_naturally() {
        assert_eq!(Permission::SendMessages.to_string(), "send message");
        assert_eq!(Permission::ManageMessages.to_string(), "manage messages");
    }
}
