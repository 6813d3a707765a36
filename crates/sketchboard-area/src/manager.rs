//! Area manager: creates, tracks, and routes observers to areas.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use sketchboard_protocol::{AreaId, CommandAck, CommandEnvelope, ParticipantId};
use sketchboard_session::{Activity, SessionConfig, Snapshot};

use crate::area::spawn_area;
use crate::{AreaConfig, AreaError, AreaHandle, AreaInfo, SnapshotSender};

static NEXT_AREA_ID: AtomicU64 = AtomicU64::new(1);

/// Owns every area and remembers which one each observer is in.
///
/// An observer is in at most one area at a time. Entering an area only
/// subscribes to its snapshots; joining the session is a separate
/// `RequestJoin` command.
pub struct AreaManager<A: Activity> {
    session_config: SessionConfig,
    area_config: AreaConfig,
    areas: HashMap<AreaId, AreaHandle<A>>,
    occupants: HashMap<ParticipantId, AreaId>,
}

impl<A: Activity> AreaManager<A> {
    pub fn new(session_config: SessionConfig, area_config: AreaConfig) -> Self {
        Self {
            session_config,
            area_config,
            areas: HashMap::new(),
            occupants: HashMap::new(),
        }
    }

    /// Spawns a new area actor and returns its id.
    pub fn create_area(&mut self) -> AreaId {
        let area_id = AreaId(NEXT_AREA_ID.fetch_add(1, Ordering::Relaxed));
        let handle = spawn_area::<A>(
            area_id,
            self.session_config.clone(),
            self.area_config.channel_size,
        );
        self.areas.insert(area_id, handle);
        tracing::info!(%area_id, "area created");
        area_id
    }

    /// Subscribes `observer` to `area_id`'s snapshots.
    pub async fn enter_area(
        &mut self,
        observer: ParticipantId,
        area_id: AreaId,
        sender: SnapshotSender<A>,
    ) -> Result<(), AreaError> {
        if let Some(current) = self.occupants.get(&observer) {
            return Err(AreaError::AlreadyInArea(observer, *current));
        }
        let handle = self.handle(area_id)?;
        handle.enter(observer, sender).await?;
        self.occupants.insert(observer, area_id);
        Ok(())
    }

    /// Takes `observer` out of their area, leaving its session if needed.
    pub async fn exit_area(&mut self, observer: ParticipantId) -> Result<AreaId, AreaError> {
        let area_id = self
            .occupants
            .remove(&observer)
            .ok_or(AreaError::NotInArea(observer))?;
        if let Some(handle) = self.areas.get(&area_id) {
            handle.exit(observer).await?;
        }
        Ok(area_id)
    }

    /// Forwards a command to an area. Occupancy isn't checked here; a
    /// caller that lets participants join without entering must also
    /// make them leave.
    pub async fn submit(
        &self,
        caller: ParticipantId,
        area_id: AreaId,
        envelope: CommandEnvelope<A::Edit>,
    ) -> Result<CommandAck, AreaError> {
        self.handle(area_id)?.submit(caller, envelope).await
    }

    pub async fn area_info(&self, area_id: AreaId) -> Result<AreaInfo, AreaError> {
        self.handle(area_id)?.info().await
    }

    pub async fn snapshot(&self, area_id: AreaId) -> Result<Option<Snapshot<A>>, AreaError> {
        self.handle(area_id)?.snapshot().await
    }

    /// Info for every area, sorted by id. Areas that don't answer (shutting
    /// down) are skipped.
    pub async fn list_areas(&self) -> Vec<AreaInfo> {
        let mut infos = Vec::with_capacity(self.areas.len());
        for handle in self.areas.values() {
            if let Ok(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos.sort_by_key(|info| info.area_id);
        infos
    }

    /// A cloned handle, for callers that must not hold the manager across
    /// an `.await`.
    pub fn handle(&self, area_id: AreaId) -> Result<AreaHandle<A>, AreaError> {
        self.areas
            .get(&area_id)
            .cloned()
            .ok_or(AreaError::NotFound(area_id))
    }

    pub fn area_handles(&self) -> Vec<AreaHandle<A>> {
        self.areas.values().cloned().collect()
    }

    /// Shuts an area down and forgets its occupants.
    pub async fn destroy_area(&mut self, area_id: AreaId) -> Result<(), AreaError> {
        let handle = self
            .areas
            .remove(&area_id)
            .ok_or(AreaError::NotFound(area_id))?;
        let _ = handle.shutdown().await;
        self.occupants.retain(|_, id| *id != area_id);
        tracing::info!(%area_id, "area destroyed");
        Ok(())
    }

    /// The area `observer` is currently in, if any.
    pub fn occupant_area(&self, observer: ParticipantId) -> Option<AreaId> {
        self.occupants.get(&observer).copied()
    }

    /// Records `observer` as being in `area_id` without messaging the
    /// area. Pair with [`AreaHandle::enter`] when the handle was taken out
    /// of the manager.
    pub fn track_occupant(
        &mut self,
        observer: ParticipantId,
        area_id: AreaId,
    ) -> Result<(), AreaError> {
        if !self.areas.contains_key(&area_id) {
            return Err(AreaError::NotFound(area_id));
        }
        if let Some(current) = self.occupants.get(&observer) {
            return Err(AreaError::AlreadyInArea(observer, *current));
        }
        self.occupants.insert(observer, area_id);
        Ok(())
    }

    /// Forgets where `observer` is without messaging the area.
    pub fn untrack_occupant(&mut self, observer: ParticipantId) -> Option<AreaId> {
        self.occupants.remove(&observer)
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    pub fn area_ids(&self) -> Vec<AreaId> {
        let mut ids: Vec<AreaId> = self.areas.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl<A: Activity> Default for AreaManager<A> {
    fn default() -> Self {
        Self::new(SessionConfig::default(), AreaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use sketchboard_session::SketchBoard;
    use tokio::sync::mpsc;

    use super::*;

    type Manager = AreaManager<SketchBoard>;

    #[tokio::test]
    async fn test_create_area_assigns_unique_ids() {
        let mut manager = Manager::default();
        let a = manager.create_area();
        let b = manager.create_area();
        assert_ne!(a, b);
        assert_eq!(manager.area_count(), 2);
    }

    #[tokio::test]
    async fn test_enter_area_twice_is_already_in_area() {
        let mut manager = Manager::default();
        let a = manager.create_area();
        let b = manager.create_area();
        let (tx, _rx) = mpsc::unbounded_channel();

        manager.enter_area(ParticipantId(1), a, tx.clone()).await.unwrap();
        let err = manager
            .enter_area(ParticipantId(1), b, tx)
            .await
            .unwrap_err();
        assert_eq!(err, AreaError::AlreadyInArea(ParticipantId(1), a));
        assert_eq!(manager.occupant_area(ParticipantId(1)), Some(a));
    }

    #[tokio::test]
    async fn test_enter_unknown_area_is_not_found() {
        let mut manager = Manager::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = manager
            .enter_area(ParticipantId(1), AreaId(u64::MAX), tx)
            .await
            .unwrap_err();
        assert_eq!(err, AreaError::NotFound(AreaId(u64::MAX)));
    }

    #[tokio::test]
    async fn test_exit_area_without_entering_is_not_in_area() {
        let mut manager = Manager::default();
        assert_eq!(
            manager.exit_area(ParticipantId(3)).await,
            Err(AreaError::NotInArea(ParticipantId(3)))
        );
    }

    #[tokio::test]
    async fn test_areas_have_independent_sessions() {
        let mut manager = Manager::default();
        let a = manager.create_area();
        let b = manager.create_area();

        let ack_a = manager
            .submit(ParticipantId(1), a, CommandEnvelope::join())
            .await
            .unwrap();
        let ack_b = manager
            .submit(ParticipantId(1), b, CommandEnvelope::join())
            .await
            .unwrap();
        assert_ne!(ack_a.session_id, ack_b.session_id);

        let infos = manager.list_areas().await;
        assert_eq!(infos.len(), 2);
        assert!(infos.iter().all(|info| info.participant_count == 1));
    }

    #[tokio::test]
    async fn test_destroy_area_forgets_occupants() {
        let mut manager = Manager::default();
        let a = manager.create_area();
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.enter_area(ParticipantId(1), a, tx).await.unwrap();

        manager.destroy_area(a).await.unwrap();

        assert_eq!(manager.occupant_area(ParticipantId(1)), None);
        assert_eq!(manager.area_count(), 0);
        assert!(matches!(
            manager.area_info(a).await,
            Err(AreaError::NotFound(_))
        ));
    }
}
