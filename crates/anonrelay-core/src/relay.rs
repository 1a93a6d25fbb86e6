use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    config::Config,
    domain::{
        Author, ChannelId, ChannelInfo, Conversation, GroupId, GroupInfo, MessageRef, Permission,
        UserId,
    },
    envelope::{self, IdSource, RandomIds},
    formatting::escape_html,
    option::{Absent, Present},
    platform::port::PlatformPort,
    store::{PersistentStore, CHANNEL_KEY, GROUP_KEY},
    templates::{TemplateId, Templates},
    Result,
};

/// Observable lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayStatus {
    Unbound,
    BoundNoChannel,
    Ready,
}

/// Result of one [`Relay::resume`] attempt. Everything but `Ready` means "setup incomplete".
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResumeOutcome {
    Ready,
    NotJoinedGroup,
    NotSubscribedToChannel,
    MissingPermission(Permission),
}

#[derive(Clone, Debug)]
pub struct RelaySettings {
    /// Exact text that binds the channel it is posted in.
    pub setup_phrase: String,
    /// Role name shown in the `ineligible` notice.
    pub anon_role: String,
}

impl From<&Config> for RelaySettings {
    fn from(cfg: &Config) -> Self {
        Self {
            setup_phrase: cfg.setup_phrase.clone(),
            anon_role: cfg.anon_role.clone(),
        }
    }
}

/// Relay lifecycle state: bindings, readiness, and the repost counter.
///
/// The store is the durable source of truth; `group`/`channel` are a cache of it that
/// `resume` validates against the live platform.
pub struct Relay {
    me: UserId,
    store: PersistentStore,
    platform: Arc<dyn PlatformPort>,
    templates: Templates,
    settings: RelaySettings,
    ids: Box<dyn IdSource>,

    group: Option<GroupInfo>,
    channel: Option<ChannelInfo>,
    ready: bool,
    counter: u32,
}

impl Relay {
    pub fn new(
        me: UserId,
        store: PersistentStore,
        platform: Arc<dyn PlatformPort>,
        templates: Templates,
        settings: RelaySettings,
    ) -> Self {
        Self {
            me,
            store,
            platform,
            templates,
            settings,
            ids: Box::new(RandomIds::new()),
            group: None,
            channel: None,
            ready: false,
            counter: 0,
        }
    }

    pub fn with_ids(mut self, ids: Box<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn status(&self) -> RelayStatus {
        if self.ready {
            RelayStatus::Ready
        } else if self.group.is_some() {
            RelayStatus::BoundNoChannel
        } else {
            RelayStatus::Unbound
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn group(&self) -> Option<&GroupInfo> {
        self.group.as_ref()
    }

    pub fn channel(&self) -> Option<&ChannelInfo> {
        self.channel.as_ref()
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub(crate) fn platform(&self) -> &Arc<dyn PlatformPort> {
        &self.platform
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// Where reposts go, once a channel has been resolved.
    pub fn target(&self) -> Option<Conversation> {
        let group = self.group.as_ref()?;
        let channel = self.channel.as_ref()?;
        Some(Conversation::Channel {
            group: group.id,
            channel: channel.id,
        })
    }

    pub fn is_me(&self, user: UserId) -> bool {
        user == self.me
    }

    pub async fn is_owner(&self, user: UserId) -> Result<bool> {
        let Some(group) = &self.group else {
            return Ok(false);
        };
        Ok(self.platform.group_owner(group.id).await? == Some(user))
    }

    /// Hook for a future posting policy; everyone may post today.
    pub fn is_eligible(&self, _author: &Author) -> bool {
        true
    }

    /// (Re)derive the lifecycle state from the store and the live platform.
    ///
    /// A no-op once ready. Stale records (group left, channel deleted) are purged.
    pub async fn resume(&mut self) -> Result<ResumeOutcome> {
        if self.ready {
            return Ok(ResumeOutcome::Ready);
        }

        let Present(group_id) = self.store.load::<GroupId>(GROUP_KEY)? else {
            self.group = None;
            self.channel = None;
            info!("relay has not joined a group, initialization incomplete");
            return Ok(ResumeOutcome::NotJoinedGroup);
        };

        let Some(group) = self.platform.resolve_group(group_id).await? else {
            error!(group = group_id.0, "relay joined a group but was removed since");
            self.store.purge(GROUP_KEY)?;
            self.group = None;
            self.channel = None;
            return Ok(ResumeOutcome::NotJoinedGroup);
        };
        let group_id = group.id;
        self.group = Some(group);

        let missing = self.platform.own_permissions(group_id).await?.missing();
        for perm in &missing {
            error!(group = group_id.0, "missing the permission to {perm}, please fix");
        }
        if let Some(&first) = missing.first() {
            return Ok(ResumeOutcome::MissingPermission(first));
        }

        let Present(channel_id) = self.store.load::<ChannelId>(CHANNEL_KEY)? else {
            self.channel = None;
            warn!("relay has not been subscribed to a channel, initialization incomplete");
            return Ok(ResumeOutcome::NotSubscribedToChannel);
        };

        let Some(channel) = self.platform.resolve_channel(group_id, channel_id).await? else {
            error!(channel = channel_id.0, "the relay channel has been deleted");
            self.store.purge(CHANNEL_KEY)?;
            self.channel = None;
            return Ok(ResumeOutcome::NotSubscribedToChannel);
        };
        self.channel = Some(channel);

        self.ready = true;
        self.counter = 0;
        info!(group = group_id.0, channel = channel_id.0, "initialization complete");
        Ok(ResumeOutcome::Ready)
    }

    /// Drop readiness so the next `resume` re-checks everything.
    pub fn invalidate(&mut self) {
        self.ready = false;
    }

    /// Invalidate and resume. A relay that stays ready on the same target keeps its counter.
    pub async fn revalidate(&mut self) -> Result<ResumeOutcome> {
        let serving = self.ready.then(|| (self.target(), self.counter));
        self.invalidate();
        let outcome = self.resume().await?;
        if let Some((target, counter)) = serving {
            if outcome == ResumeOutcome::Ready && self.target() == target {
                self.counter = counter;
            }
        }
        Ok(outcome)
    }

    /// Persist a newly joined group. Joining a different group drops the old channel.
    pub fn bind_group(&mut self, group: &GroupInfo) -> Result<()> {
        let previous = self.store.load::<GroupId>(GROUP_KEY);
        let same = matches!(previous, Ok(Present(id)) if id == group.id);
        if !same {
            if !matches!(previous, Ok(Absent)) {
                warn!(group = group.id.0, "rebinding to a new group, dropping old bindings");
            }
            self.store.purge(CHANNEL_KEY)?;
            self.reset();
        }
        self.store.save(GROUP_KEY, &group.id)
    }

    /// Forget the group (and its channel). Returns false when `group` is not the bound one.
    pub fn unbind_group(&mut self, group: &GroupInfo) -> Result<bool> {
        if let Ok(Present(bound)) = self.store.load::<GroupId>(GROUP_KEY) {
            if bound != group.id {
                return Ok(false);
            }
        }
        self.store.purge(GROUP_KEY)?;
        self.store.purge(CHANNEL_KEY)?;
        self.reset();
        Ok(true)
    }

    pub fn bind_channel(&mut self, channel: ChannelId) -> Result<()> {
        self.store.save(CHANNEL_KEY, &channel)
    }

    /// Build the envelope for the next repost and return its number with it.
    ///
    /// The counter itself only moves once the post went out, see [`Relay::mark_relayed`].
    pub fn next_envelope(&mut self, content: &str) -> Result<(u32, String)> {
        let number = self.counter + 1;
        let id = self.ids.next_id();
        let html = envelope::compose(&self.templates, number, id, content)?;
        Ok((number, html))
    }

    /// Record a successful repost numbered `number`. The counter never goes down.
    pub fn mark_relayed(&mut self, number: u32) {
        self.counter = self.counter.max(number);
    }

    /// Send a templated notice.
    pub async fn say(
        &self,
        to: Conversation,
        id: TemplateId,
        args: &[(&str, &str)],
    ) -> Result<MessageRef> {
        let text = self.templates.render(id, args)?;
        self.platform.send_html(to, &escape_html(&text)).await
    }

    fn reset(&mut self) {
        self.group = None;
        self.channel = None;
        self.ready = false;
    }
}
