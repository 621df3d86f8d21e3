//! Read-only registry of other vehicles' positions.
//!
//! The registry is assembled explicitly and handed to each vehicle; nothing
//! scans for live instances. Entries are weak handles, so a vehicle that
//! goes away simply stops showing up.

use nalgebra::Vector3;

use crate::target::TargetHandle;

/// Identifies a vehicle inside a [`PeerRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub u32);

#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: Vec<(VehicleId, TargetHandle)>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vehicle, replacing any previous entry with the same id.
    pub fn register(&mut self, id: VehicleId, handle: TargetHandle) {
        match self.peers.iter_mut().find(|(peer, _)| *peer == id) {
            Some(entry) => entry.1 = handle,
            None => self.peers.push((id, handle)),
        }
    }

    pub fn remove(&mut self, id: VehicleId) -> bool {
        let before = self.peers.len();
        self.peers.retain(|(peer, _)| *peer != id);
        self.peers.len() != before
    }

    /// Drops entries whose vehicle no longer exists.
    pub fn prune(&mut self) {
        self.peers.retain(|(_, handle)| handle.is_live());
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Live positions of every registered vehicle except `id`.
    pub fn others(&self, id: VehicleId) -> impl Iterator<Item = (VehicleId, Vector3<f64>)> + '_ {
        self.peers
            .iter()
            .filter(move |(peer, _)| *peer != id)
            .filter_map(|(peer, handle)| handle.position().map(|p| (*peer, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetAnchor;

    #[test]
    fn test_others_excludes_self() {
        let a = TargetAnchor::new(Vector3::new(1.0, 0.0, 0.0));
        let b = TargetAnchor::new(Vector3::new(2.0, 0.0, 0.0));
        let c = TargetAnchor::new(Vector3::new(3.0, 0.0, 0.0));

        let mut registry = PeerRegistry::new();
        registry.register(VehicleId(0), a.handle());
        registry.register(VehicleId(1), b.handle());
        registry.register(VehicleId(2), c.handle());

        let others: Vec<_> = registry.others(VehicleId(1)).collect();
        assert_eq!(
            others,
            vec![
                (VehicleId(0), Vector3::new(1.0, 0.0, 0.0)),
                (VehicleId(2), Vector3::new(3.0, 0.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_positions_are_live() {
        let a = TargetAnchor::new(Vector3::zeros());
        let mut registry = PeerRegistry::new();
        registry.register(VehicleId(7), a.handle());

        a.set_position(Vector3::new(0.0, 9.0, 0.0));
        let (_, position) = registry.others(VehicleId(0)).next().unwrap();
        assert_eq!(position, Vector3::new(0.0, 9.0, 0.0));
    }

    #[test]
    fn test_dropped_vehicle_is_skipped_and_pruned() {
        let a = TargetAnchor::new(Vector3::zeros());
        let b = TargetAnchor::new(Vector3::zeros());
        let mut registry = PeerRegistry::new();
        registry.register(VehicleId(0), a.handle());
        registry.register(VehicleId(1), b.handle());

        drop(b);
        assert_eq!(registry.others(VehicleId(0)).count(), 0);
        assert_eq!(registry.len(), 2);

        registry.prune();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_replaces_and_remove() {
        let a = TargetAnchor::new(Vector3::new(1.0, 0.0, 0.0));
        let b = TargetAnchor::new(Vector3::new(2.0, 0.0, 0.0));
        let mut registry = PeerRegistry::new();
        registry.register(VehicleId(0), a.handle());
        registry.register(VehicleId(0), b.handle());

        assert_eq!(registry.len(), 1);
        let positions: Vec<_> = registry.others(VehicleId(9)).map(|(_, p)| p).collect();
        assert_eq!(positions, vec![Vector3::new(2.0, 0.0, 0.0)]);

        assert!(registry.remove(VehicleId(0)));
        assert!(!registry.remove(VehicleId(0)));
        assert!(registry.is_empty());
    }
}
