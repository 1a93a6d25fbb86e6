//! In-memory platform and helpers shared by the relay/router tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    domain::{
        ChannelId, ChannelInfo, Conversation, GroupId, GroupInfo, MessageId, MessageRef,
        PermissionSet, UserId,
    },
    envelope::FixedId,
    errors::Error,
    platform::port::PlatformPort,
    relay::{Relay, RelaySettings},
    store::PersistentStore,
    templates::{Templates, SAMPLE},
    Result,
};

pub(crate) const ME: UserId = UserId(1000);
pub(crate) const OWNER: UserId = UserId(1);
pub(crate) const MEMBER: UserId = UserId(2);
pub(crate) const GROUP_ID: GroupId = GroupId(-100500);
pub(crate) const TOPIC: ChannelId = ChannelId(77);
pub(crate) const DECOR_ID: u32 = 42424;
pub(crate) const SETUP: &str = "Please subscribe to here.";

pub(crate) fn group() -> GroupInfo {
    GroupInfo {
        id: GROUP_ID,
        title: "Confessions".to_string(),
    }
}

struct World {
    group: Option<GroupInfo>,
    owner: UserId,
    permissions: PermissionSet,
    channels: HashMap<ChannelId, String>,
}

#[derive(Default)]
struct Outbox {
    next_id: i32,
    sent: Vec<(Conversation, String)>,
    deleted: Vec<MessageRef>,
    fail_sends: bool,
    fail_deletes: bool,
    lookups: usize,
}

pub(crate) struct FakePlatform {
    world: Mutex<World>,
    outbox: Mutex<Outbox>,
}

impl FakePlatform {
    /// A group the relay is a member of, with full permissions, the general channel and `TOPIC`.
    pub(crate) fn with_group() -> Self {
        let mut channels = HashMap::new();
        channels.insert(ChannelId::GENERAL, "General".to_string());
        channels.insert(TOPIC, "anon".to_string());
        Self {
            world: Mutex::new(World {
                group: Some(group()),
                owner: OWNER,
                permissions: PermissionSet::all(),
                channels,
            }),
            outbox: Mutex::new(Outbox::default()),
        }
    }

    pub(crate) fn remove_group(&self) {
        self.world.lock().unwrap().group = None;
    }

    pub(crate) fn remove_channel(&self, channel: ChannelId) {
        self.world.lock().unwrap().channels.remove(&channel);
    }

    pub(crate) fn set_permissions(&self, send: bool, manage: bool) {
        self.world.lock().unwrap().permissions = PermissionSet {
            can_send_messages: send,
            can_manage_messages: manage,
        };
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        self.outbox.lock().unwrap().fail_sends = fail;
    }

    pub(crate) fn fail_deletes(&self, fail: bool) {
        self.outbox.lock().unwrap().fail_deletes = fail;
    }

    pub(crate) fn sent(&self) -> Vec<(Conversation, String)> {
        self.outbox.lock().unwrap().sent.clone()
    }

    pub(crate) fn deleted(&self) -> Vec<MessageRef> {
        self.outbox.lock().unwrap().deleted.clone()
    }

    /// Number of live lookups performed so far.
    pub(crate) fn lookups(&self) -> usize {
        self.outbox.lock().unwrap().lookups
    }

    fn count_lookup(&self) {
        self.outbox.lock().unwrap().lookups += 1;
    }
}

#[async_trait]
impl PlatformPort for FakePlatform {
    async fn resolve_group(&self, group: GroupId) -> Result<Option<GroupInfo>> {
        self.count_lookup();
        let world = self.world.lock().unwrap();
        Ok(world.group.clone().filter(|g| g.id == group))
    }

    async fn own_permissions(&self, _group: GroupId) -> Result<PermissionSet> {
        self.count_lookup();
        Ok(self.world.lock().unwrap().permissions)
    }

    async fn group_owner(&self, group: GroupId) -> Result<Option<UserId>> {
        let world = self.world.lock().unwrap();
        Ok(world
            .group
            .as_ref()
            .filter(|g| g.id == group)
            .map(|_| world.owner))
    }

    async fn resolve_channel(
        &self,
        group: GroupId,
        channel: ChannelId,
    ) -> Result<Option<ChannelInfo>> {
        self.count_lookup();
        let world = self.world.lock().unwrap();
        if world.group.as_ref().map(|g| g.id) != Some(group) {
            return Ok(None);
        }
        Ok(world.channels.get(&channel).map(|name| ChannelInfo {
            id: channel,
            name: name.clone(),
        }))
    }

    async fn send_html(&self, to: Conversation, html: &str) -> Result<MessageRef> {
        let mut outbox = self.outbox.lock().unwrap();
        if outbox.fail_sends {
            return Err(Error::External("send refused".to_string()));
        }
        outbox.next_id += 1;
        outbox.sent.push((to, html.to_string()));
        Ok(MessageRef {
            conversation: to,
            message_id: MessageId(outbox.next_id),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        let mut outbox = self.outbox.lock().unwrap();
        if outbox.fail_deletes {
            return Err(Error::External("delete refused".to_string()));
        }
        outbox.deleted.push(msg);
        Ok(())
    }
}

pub(crate) fn settings() -> RelaySettings {
    RelaySettings {
        setup_phrase: SETUP.to_string(),
        anon_role: "anon".to_string(),
    }
}

/// A relay over a fresh temp store with deterministic header ids.
pub(crate) fn relay_with(platform: FakePlatform) -> (tempfile::TempDir, Arc<FakePlatform>, Relay) {
    let dir = tempfile::tempdir().unwrap();
    let store = PersistentStore::open(dir.path().join("cache")).unwrap();
    let platform = Arc::new(platform);
    let relay = Relay::new(
        ME,
        store,
        platform.clone(),
        Templates::from_toml(SAMPLE).unwrap(),
        settings(),
    )
    .with_ids(Box::new(FixedId(DECOR_ID)));
    (dir, platform, relay)
}
