//! Collision layer system for filtering collision detection
//!
//! Every collider sits on one or more layers and carries a mask of the layers
//! it wants to touch. A pair is tested only when each side's layer appears in
//! the other side's mask.

use bitflags::bitflags;

bitflags! {
    /// Collision layer bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionLayers: u32 {
        /// Static environment geometry
        const ENVIRONMENT = 1 << 0;
        /// Dynamic simulated bodies
        const DYNAMIC = 1 << 1;
        /// Probe rays such as suspension or ground sensors
        const PROBE = 1 << 2;
        /// Trigger volumes (no physical response)
        const TRIGGER = 1 << 3;
        /// Debris and small physics objects
        const DEBRIS = 1 << 4;

        // User-defined layers live in the upper bits
        const _ = !0;
    }
}

impl Default for CollisionLayers {
    fn default() -> Self {
        Self::all()
    }
}

impl CollisionLayers {
    /// Check if two colliders should collide based on their layers and masks
    ///
    /// A's layer must be in B's mask and B's layer must be in A's mask.
    ///
    /// # Example
    /// ```
    /// use rust_physics::physics::CollisionLayers;
    ///
    /// let probe_mask = CollisionLayers::ENVIRONMENT;
    /// assert!(CollisionLayers::should_collide(
    ///     CollisionLayers::PROBE, probe_mask,
    ///     CollisionLayers::ENVIRONMENT, CollisionLayers::all(),
    /// ));
    /// assert!(!CollisionLayers::should_collide(
    ///     CollisionLayers::PROBE, probe_mask,
    ///     CollisionLayers::DYNAMIC, CollisionLayers::all(),
    /// ));
    /// ```
    pub fn should_collide(
        layer_a: CollisionLayers,
        mask_a: CollisionLayers,
        layer_b: CollisionLayers,
        mask_b: CollisionLayers,
    ) -> bool {
        layer_a.intersects(mask_b) && layer_b.intersects(mask_a)
    }

    /// Layer for user bit `index` (0..32)
    pub fn custom(index: u32) -> Self {
        Self::from_bits_retain(1u32.checked_shl(index).unwrap_or(0))
    }
}
