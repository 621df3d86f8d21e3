//! Target resolution for the flight controller.
//!
//! A target is either a fixed point or a live reference to a position
//! owned elsewhere (another vehicle, an operator-placed marker). Live
//! references are weak: when the owner goes away the controller falls back
//! to the literal target it had before it started following.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use nalgebra::Vector3;

/// Owner of a position that controllers can follow.
///
/// Cloning an anchor shares the same underlying position.
#[derive(Debug, Clone)]
pub struct TargetAnchor {
    position: Rc<Cell<Vector3<f64>>>,
}

impl TargetAnchor {
    pub fn new(position: Vector3<f64>) -> Self {
        Self {
            position: Rc::new(Cell::new(position)),
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position.get()
    }

    pub fn set_position(&self, position: Vector3<f64>) {
        self.position.set(position);
    }

    /// Places the anchor `distance` ahead of `eye` along `forward`.
    ///
    /// A zero `forward` leaves the anchor at `eye`.
    pub fn place_ahead(&self, eye: Vector3<f64>, forward: Vector3<f64>, distance: f64) {
        let direction = forward.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
        self.set_position(eye + direction * distance);
    }

    /// A non-owning, read-only handle to this anchor.
    pub fn handle(&self) -> TargetHandle {
        TargetHandle {
            position: Rc::downgrade(&self.position),
        }
    }
}

/// Read-only view of a [`TargetAnchor`] that does not keep it alive.
#[derive(Debug, Clone)]
pub struct TargetHandle {
    position: Weak<Cell<Vector3<f64>>>,
}

impl TargetHandle {
    /// Current position, or `None` once every anchor clone is dropped.
    pub fn position(&self) -> Option<Vector3<f64>> {
        self.position.upgrade().map(|cell| cell.get())
    }

    pub fn is_live(&self) -> bool {
        self.position.strong_count() > 0
    }
}

/// Where the controller is heading.
#[derive(Debug, Clone)]
pub enum Target {
    /// A literal world position.
    Fixed(Vector3<f64>),
    /// Track a live position; `fallback` is the literal target frozen when
    /// following began.
    Following {
        handle: TargetHandle,
        fallback: Vector3<f64>,
    },
}

impl Default for Target {
    fn default() -> Self {
        Target::Fixed(Vector3::zeros())
    }
}

impl Target {
    /// Position to steer toward this tick. A live reference always wins.
    pub fn resolve(&self) -> Vector3<f64> {
        match self {
            Target::Fixed(position) => *position,
            Target::Following { handle, fallback } => handle.position().unwrap_or(*fallback),
        }
    }

    /// The literal target, ignoring any live reference.
    pub fn literal(&self) -> Vector3<f64> {
        match self {
            Target::Fixed(position) => *position,
            Target::Following { fallback, .. } => *fallback,
        }
    }

    /// Replaces the literal target. Ignored while following; returns
    /// whether the write took effect.
    pub fn set_position(&mut self, position: Vector3<f64>) -> bool {
        match self {
            Target::Fixed(current) => {
                *current = position;
                true
            }
            Target::Following { .. } => false,
        }
    }

    /// Starts following `handle`, keeping the current literal as fallback.
    pub fn follow(&mut self, handle: TargetHandle) {
        let fallback = self.literal();
        *self = Target::Following { handle, fallback };
    }

    /// Stops following and returns to the frozen literal target.
    pub fn unfollow(&mut self) {
        *self = Target::Fixed(self.literal());
    }

    pub fn is_following(&self) -> bool {
        matches!(self, Target::Following { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_target_resolves_literal() {
        let mut target = Target::Fixed(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(target.resolve(), Vector3::new(1.0, 2.0, 3.0));

        assert!(target.set_position(Vector3::new(4.0, 5.0, 6.0)));
        assert_eq!(target.resolve(), Vector3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_live_reference_overrides_literal() {
        let anchor = TargetAnchor::new(Vector3::new(10.0, 0.0, 0.0));
        let mut target = Target::Fixed(Vector3::new(1.0, 1.0, 1.0));
        target.follow(anchor.handle());

        assert_eq!(target.resolve(), Vector3::new(10.0, 0.0, 0.0));

        anchor.set_position(Vector3::new(11.0, 0.0, 0.0));
        assert_eq!(target.resolve(), Vector3::new(11.0, 0.0, 0.0));

        // Literal writes are ignored while following
        assert!(!target.set_position(Vector3::new(-5.0, 0.0, 0.0)));
        assert_eq!(target.resolve(), Vector3::new(11.0, 0.0, 0.0));
        assert_eq!(target.literal(), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_dropped_anchor_falls_back_to_frozen_literal() {
        let anchor = TargetAnchor::new(Vector3::new(10.0, 0.0, 0.0));
        let mut target = Target::Fixed(Vector3::new(1.0, 1.0, 1.0));
        target.follow(anchor.handle());

        drop(anchor);

        assert!(target.is_following());
        assert_eq!(target.resolve(), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_unfollow_restores_literal() {
        let anchor = TargetAnchor::new(Vector3::new(10.0, 0.0, 0.0));
        let mut target = Target::Fixed(Vector3::new(2.0, 0.0, 0.0));
        target.follow(anchor.handle());
        target.unfollow();

        assert!(!target.is_following());
        assert_eq!(target.resolve(), Vector3::new(2.0, 0.0, 0.0));
        assert!(target.set_position(Vector3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn test_refollow_keeps_first_fallback() {
        let first = TargetAnchor::new(Vector3::new(10.0, 0.0, 0.0));
        let second = TargetAnchor::new(Vector3::new(20.0, 0.0, 0.0));
        let mut target = Target::Fixed(Vector3::new(1.0, 0.0, 0.0));

        target.follow(first.handle());
        target.follow(second.handle());
        drop(second);

        assert_eq!(target.resolve(), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_handle_liveness_tracks_clones() {
        let anchor = TargetAnchor::new(Vector3::zeros());
        let handle = anchor.handle();
        let clone = anchor.clone();

        drop(anchor);
        assert!(handle.is_live());
        clone.set_position(Vector3::new(0.0, 4.0, 0.0));
        assert_eq!(handle.position(), Some(Vector3::new(0.0, 4.0, 0.0)));

        drop(clone);
        assert!(!handle.is_live());
        assert_eq!(handle.position(), None);
    }

    #[test]
    fn test_place_ahead() {
        let anchor = TargetAnchor::new(Vector3::zeros());
        anchor.place_ahead(Vector3::new(1.0, 2.0, 0.0), Vector3::new(0.0, 0.0, 5.0), 3.0);
        assert_relative_eq!(anchor.position(), Vector3::new(1.0, 2.0, 3.0), epsilon = 1e-12);

        anchor.place_ahead(Vector3::new(1.0, 2.0, 0.0), Vector3::zeros(), 3.0);
        assert_eq!(anchor.position(), Vector3::new(1.0, 2.0, 0.0));
    }
}
