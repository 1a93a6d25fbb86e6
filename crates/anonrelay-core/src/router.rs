//! Event dispatch: classify each platform event and act on the relay.
//!
//! Handlers run one at a time against a `&mut Relay`; the adapter is responsible for
//! serializing calls (one lock around the relay).

use tracing::{debug, error, info, warn};

use crate::{
    domain::{Conversation, GroupInfo, InboundMessage, MessageRef},
    errors::Error,
    platform::types::RelayEvent,
    relay::{Relay, ResumeOutcome},
    templates::TemplateId,
    Result,
};

/// What the router did with a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Our own message.
    SelfEcho,
    /// Setup command handled; `subscribed` says whether the relay is now ready.
    Setup { subscribed: bool },
    /// Setup command outside the bound group; nothing persisted.
    SetupIgnored,
    /// Relay not ready yet.
    Dropped,
    /// Channel message reposted anonymously (and the original deleted if possible).
    Reposted,
    /// Direct message forwarded to the relay channel.
    Forwarded,
    /// Neither the relay channel nor a direct message.
    Ignored,
}

/// Handle one event. Never fails: errors are logged and the dispatch loop continues.
pub async fn dispatch(relay: &mut Relay, event: RelayEvent) {
    let res = match event {
        RelayEvent::Started => on_started(relay).await,
        RelayEvent::JoinedGroup(group) => on_joined(relay, group).await,
        RelayEvent::RemovedFromGroup(group) => on_removed(relay, group),
        RelayEvent::MembershipChanged(group) => on_membership_changed(relay, group).await,
        RelayEvent::Message(msg) => route(relay, msg)
            .await
            .map(|route| debug!(?route, counter = relay.counter(), "message handled")),
    };
    if let Err(e) = res {
        if matches!(e, Error::StoreCorruption { .. }) {
            error!(error = %e, "persistent store is corrupted, fix or delete the record");
        } else {
            error!(error = %e, "event handling failed");
        }
    }
}

async fn on_started(relay: &mut Relay) -> Result<()> {
    let outcome = relay.resume().await?;
    log_outcome(outcome);
    if outcome == ResumeOutcome::Ready {
        if let (Some(group), Some(channel)) = (relay.group(), relay.channel()) {
            info!(group = %group.title, channel = %channel.name, "relay is serving");
        }
    }
    Ok(())
}

async fn on_joined(relay: &mut Relay, group: GroupInfo) -> Result<()> {
    info!(group = group.id.0, title = %group.title, "joined group");
    relay.bind_group(&group)?;
    match relay.resume().await? {
        ResumeOutcome::NotSubscribedToChannel => {}
        other => log_outcome(other),
    }
    Ok(())
}

fn on_removed(relay: &mut Relay, group: GroupInfo) -> Result<()> {
    if relay.unbind_group(&group)? {
        info!(group = group.id.0, title = %group.title, "removed from group, bindings purged");
    } else {
        info!(group = group.id.0, "removed from a group we were not bound to");
    }
    Ok(())
}

async fn on_membership_changed(relay: &mut Relay, group: GroupInfo) -> Result<()> {
    if relay.group().map(|g| g.id) != Some(group.id) {
        return Ok(());
    }
    info!(group = group.id.0, "own membership changed, re-validating");
    let outcome = relay.revalidate().await?;
    log_outcome(outcome);
    Ok(())
}

/// Classify and handle one inbound message.
pub async fn route(relay: &mut Relay, msg: InboundMessage) -> Result<Route> {
    if relay.is_me(msg.author.id) {
        return Ok(Route::SelfEcho);
    }

    if msg.content == relay.settings().setup_phrase {
        return handle_setup(relay, &msg).await;
    }

    if !relay.is_ready() {
        return Ok(Route::Dropped);
    }

    let Some(target) = relay.target() else {
        return Ok(Route::Dropped);
    };

    if !relay.is_eligible(&msg.author) {
        let role = relay.settings().anon_role.clone();
        relay
            .say(target, TemplateId::Ineligible, &[("role", role.as_str())])
            .await?;
    }

    if msg.conversation() == target {
        forward(relay, target, &msg.content).await?;
        record(relay, &msg, "message");
        erase(relay, msg.id).await;
        return Ok(Route::Reposted);
    }

    if let Conversation::Direct(chat) = msg.conversation() {
        forward(relay, target, &msg.content).await?;
        record(relay, &msg, "direct message");
        relay
            .say(Conversation::Direct(chat), TemplateId::Ack, &[])
            .await?;
        return Ok(Route::Forwarded);
    }

    Ok(Route::Ignored)
}

async fn handle_setup(relay: &mut Relay, msg: &InboundMessage) -> Result<Route> {
    info!(user = msg.author.id.0, "received setup command");

    if relay.group().is_none() {
        let _ = relay.resume().await?;
    }

    // Advisory only: the binding below proceeds either way.
    if !relay.is_owner(msg.author.id).await? {
        let to = relay.target().unwrap_or(msg.conversation());
        if let Err(e) = relay.say(to, TemplateId::Forbidden, &[]).await {
            warn!(error = %e, "failed to send forbidden notice");
        }
    }

    let Conversation::Channel { group, channel } = msg.conversation() else {
        warn!("setup command outside any group, ignoring");
        return Ok(Route::SetupIgnored);
    };
    if relay.group().map(|g| g.id) != Some(group) {
        warn!(group = group.0, "setup command from a group we are not bound to, ignoring");
        return Ok(Route::SetupIgnored);
    }

    relay.bind_channel(channel)?;
    // Repeating the command in the serving channel must not restart the numbering.
    let outcome = if relay.channel().map(|c| c.id) == Some(channel) {
        relay.resume().await?
    } else {
        relay.revalidate().await?
    };
    match outcome {
        ResumeOutcome::Ready => {
            if let Some(ch) = relay.channel() {
                info!(channel = %ch.name, "subscribed to channel");
            }
            let target = relay.target().unwrap_or(msg.conversation());
            relay.say(target, TemplateId::Subscribed, &[]).await?;
            Ok(Route::Setup { subscribed: true })
        }
        ResumeOutcome::NotSubscribedToChannel => Ok(Route::Setup { subscribed: false }),
        other => {
            log_outcome(other);
            Ok(Route::Setup { subscribed: false })
        }
    }
}

/// Post the anonymized envelope. A failed post leaves the counter alone and triggers
/// re-validation so a deleted channel is noticed and unbound.
async fn forward(relay: &mut Relay, target: Conversation, content: &str) -> Result<MessageRef> {
    let (number, html) = relay.next_envelope(content)?;
    let sent = relay.platform().send_html(target, &html).await;
    match sent {
        Ok(posted) => {
            relay.mark_relayed(number);
            Ok(posted)
        }
        Err(e) => {
            warn!(error = %e, "repost failed, re-validating bindings");
            match relay.revalidate().await {
                Ok(outcome) => log_outcome(outcome),
                Err(re) => error!(error = %re, "re-validation failed"),
            }
            Err(e)
        }
    }
}

async fn erase(relay: &Relay, original: MessageRef) {
    if let Err(e) = relay.platform().delete_message(original).await {
        let failure = Error::CleanupFailure {
            message: original,
            reason: e.to_string(),
        };
        error!(error = %failure, "original message is still visible");
    }
}

fn record(relay: &Relay, msg: &InboundMessage, kind: &str) {
    info!(
        target: "anonrelay::audit",
        counter = relay.counter(),
        user = msg.author.id.0,
        name = %msg.author.display_name,
        content = %msg.content,
        "relayed {kind}"
    );
}

fn log_outcome(outcome: ResumeOutcome) {
    match outcome {
        ResumeOutcome::Ready => {}
        ResumeOutcome::NotJoinedGroup => info!("setup incomplete: not in a group"),
        ResumeOutcome::NotSubscribedToChannel => info!("setup incomplete: no relay channel"),
        ResumeOutcome::MissingPermission(p) => {
            error!("I don't have the required permission to {p}, please fix")
        }
    }
}
