//! The `Activity` trait: the payload a session hosts.
//!
//! The session shell (membership, leader, capacity, access mode, scores,
//! draw permission) is the same for every kind of shared activity. What
//! differs is the content being edited. An activity only has to say how
//! to apply an edit, how to reset itself, and how it looks on the wire.

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::{SessionConfig, SessionError};

/// Content hosted by a session.
///
/// Serialization is the serde bound: the activity is flattened into the
/// session state of every broadcast snapshot, so its fields sit next to
/// `accessMode`, `leaderId` and friends.
///
/// `PartialEq` is what the client reconciler uses to decide whether the
/// content facet changed between two snapshots.
pub trait Activity:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Payload of a `BoardEdit` command.
    type Edit: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Fresh content for a new session.
    fn new(config: &SessionConfig) -> Self;

    /// Applies one edit.
    ///
    /// Must be all-or-nothing: on `Err` the content is unchanged.
    fn apply_edit(&mut self, edit: Self::Edit) -> Result<(), SessionError>;

    /// Restores the blank content.
    fn reset(&mut self);
}
