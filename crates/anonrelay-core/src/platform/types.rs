use crate::domain::{GroupInfo, InboundMessage};

/// Cross-platform incoming event model.
///
/// Platform-specific fields should live in the adapter; the relay only sees these.
#[derive(Clone, Debug)]
pub enum RelayEvent {
    /// The platform connection is up and the relay may try to resume.
    Started,
    /// The relay was added to a group.
    JoinedGroup(GroupInfo),
    /// The relay left or was kicked from a group.
    RemovedFromGroup(GroupInfo),
    /// The relay's own rights in a group changed (promoted, restricted, ...).
    MembershipChanged(GroupInfo),
    Message(InboundMessage),
}
