use std::{future::Future, sync::Arc, time::Duration};

use crate::{
    domain::{
        ChannelId, ChannelInfo, Conversation, GroupId, GroupInfo, MessageRef, PermissionSet,
        UserId,
    },
    errors::Error,
    platform::port::PlatformPort,
    Result,
};

/// PlatformPort decorator that bounds every outbound call.
///
/// The dispatcher handles one event at a time, so a hung request would otherwise stall
/// the whole relay.
pub struct TimeoutPlatform {
    inner: Arc<dyn PlatformPort>,
    limit: Duration,
}

impl TimeoutPlatform {
    pub fn new(inner: Arc<dyn PlatformPort>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout {
                op,
                after: self.limit,
            }),
        }
    }
}

#[async_trait::async_trait]
impl PlatformPort for TimeoutPlatform {
    async fn resolve_group(&self, group: GroupId) -> Result<Option<GroupInfo>> {
        self.bounded("resolve_group", self.inner.resolve_group(group))
            .await
    }

    async fn own_permissions(&self, group: GroupId) -> Result<PermissionSet> {
        self.bounded("own_permissions", self.inner.own_permissions(group))
            .await
    }

    async fn group_owner(&self, group: GroupId) -> Result<Option<UserId>> {
        self.bounded("group_owner", self.inner.group_owner(group))
            .await
    }

    async fn resolve_channel(
        &self,
        group: GroupId,
        channel: ChannelId,
    ) -> Result<Option<ChannelInfo>> {
        self.bounded("resolve_channel", self.inner.resolve_channel(group, channel))
            .await
    }

    async fn send_html(&self, to: Conversation, html: &str) -> Result<MessageRef> {
        self.bounded("send_html", self.inner.send_html(to, html))
            .await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.bounded("delete_message", self.inner.delete_message(msg))
            .await
    }
}
