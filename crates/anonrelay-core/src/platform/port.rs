use async_trait::async_trait;

use crate::{
    domain::{
        ChannelId, ChannelInfo, Conversation, GroupId, GroupInfo, MessageRef, PermissionSet,
        UserId,
    },
    Result,
};

/// Cross-platform port.
///
/// Lookups return `Ok(None)` when the entity does not exist (or is no longer visible to
/// the relay); `Err` is reserved for transport failures.
#[async_trait]
pub trait PlatformPort: Send + Sync {
    async fn resolve_group(&self, group: GroupId) -> Result<Option<GroupInfo>>;

    /// Capabilities of the relay's own membership in `group`.
    async fn own_permissions(&self, group: GroupId) -> Result<PermissionSet>;

    async fn group_owner(&self, group: GroupId) -> Result<Option<UserId>>;

    async fn resolve_channel(
        &self,
        group: GroupId,
        channel: ChannelId,
    ) -> Result<Option<ChannelInfo>>;

    async fn send_html(&self, to: Conversation, html: &str) -> Result<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;
}
