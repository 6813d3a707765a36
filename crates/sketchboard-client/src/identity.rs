//! Mapping participant ids to whatever the UI displays.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use sketchboard_protocol::ParticipantId;

/// Resolves the ids in a snapshot to participant objects.
///
/// The reconciler compares resolved participants as a set, so the
/// participant type needs `Eq + Hash`.
pub trait IdentitySource {
    type Participant: Clone + Eq + Hash + Debug;

    /// `None` for an id this source has never heard of; the reconciler
    /// drops those from its list.
    fn resolve(&self, id: ParticipantId) -> Option<Self::Participant>;
}

/// Uses the ids themselves as participants.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawIds;

impl IdentitySource for RawIds {
    type Participant = ParticipantId;

    fn resolve(&self, id: ParticipantId) -> Option<ParticipantId> {
        Some(id)
    }
}

/// A fixed directory, e.g. the players of a town known to the client.
impl<P> IdentitySource for HashMap<ParticipantId, P>
where
    P: Clone + Eq + Hash + Debug,
{
    type Participant = P;

    fn resolve(&self, id: ParticipantId) -> Option<P> {
        self.get(&id).cloned()
    }
}
