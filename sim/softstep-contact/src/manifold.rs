//! Persistent contact manifolds.
//!
//! A manifold lives as long as its contact does. It is keyed by a stable
//! contact id (the index of the shape that touched the terrain) so that the
//! impulses accumulated in one frame warm-start the same contact in the
//! next. Geometry is refreshed every frame; impulses are only ever written
//! back by the solver.

use nalgebra::{Point3, Vector2, Vector3};
use softstep_types::math::compute_basis;
use softstep_types::{BodyHandle, RigidBody, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of manifolds a [`ManifoldSet`] can hold.
pub const MAX_CONTACTS: usize = 32;

/// The single representative point of a manifold.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// Contact point on A in body space, relative to A's origin.
    pub local_anchor_a: Vector3<f64>,
    /// Contact point on B in body space, relative to B's origin.
    pub local_anchor_b: Vector3<f64>,
    /// Signed distance along the normal (negative when penetrating).
    pub separation: f64,
    /// Accumulated normal impulse (N·s), never negative.
    pub normal_impulse: f64,
    /// Accumulated friction impulse along the two tangents (N·s).
    pub tangent_impulse: Vector2<f64>,
}

/// A contact between two bodies with a frame-persistent impulse history.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactManifold {
    /// Stable id of the contact (the originating shape index).
    pub contact_id: usize,
    /// First body (the terrain side).
    pub body_a: BodyHandle,
    /// Second body.
    pub body_b: BodyHandle,
    /// Unit normal pointing from A to B.
    pub normal: Vector3<f64>,
    /// Tangent basis completing `normal`; `tangents.1 = normal × tangents.0`.
    pub tangents: (Vector3<f64>, Vector3<f64>),
    /// The contact point.
    pub point: ContactPoint,
}

impl ContactManifold {
    /// A new manifold with no impulse history.
    #[must_use]
    pub fn new(
        contact_id: usize,
        a: &RigidBody,
        b: &RigidBody,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        separation: f64,
    ) -> Self {
        let mut manifold = Self {
            contact_id,
            body_a: a.id,
            body_b: b.id,
            normal: *normal,
            tangents: compute_basis(normal),
            point: ContactPoint {
                local_anchor_a: Vector3::zeros(),
                local_anchor_b: Vector3::zeros(),
                separation,
                normal_impulse: 0.0,
                tangent_impulse: Vector2::zeros(),
            },
        };
        manifold.refresh(a, b, point, normal, separation);
        manifold
    }

    /// Replace the geometry, keeping the accumulated impulses.
    pub fn refresh(
        &mut self,
        a: &RigidBody,
        b: &RigidBody,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        separation: f64,
    ) {
        self.normal = *normal;
        self.tangents = compute_basis(normal);
        self.point.local_anchor_a = a.local_point(point);
        self.point.local_anchor_b = b.local_point(point);
        self.point.separation = separation;
    }

    /// Whether the bodies are touching rather than merely close.
    #[must_use]
    pub fn is_touching(&self) -> bool {
        self.point.separation <= 0.0
    }
}

/// Bounded set of live manifolds.
///
/// Insertion past the capacity fails with
/// [`SimError::ContactCapacityExceeded`]. Removal swaps the last manifold
/// into the freed slot, so manifold order is not stable; look manifolds up
/// by contact id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ManifoldSet {
    manifolds: Vec<ContactManifold>,
    capacity: usize,
}

impl ManifoldSet {
    /// An empty set holding at most `capacity` manifolds.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            manifolds: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of manifolds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live manifolds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    /// Whether no manifold is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    /// Position of the manifold with `contact_id`, if live.
    fn position(&self, contact_id: usize) -> Option<usize> {
        self.manifolds.iter().position(|m| m.contact_id == contact_id)
    }

    /// The manifold with `contact_id`, if live.
    #[must_use]
    pub fn get(&self, contact_id: usize) -> Option<&ContactManifold> {
        self.position(contact_id).map(|i| &self.manifolds[i])
    }

    /// Mutable access to the manifold with `contact_id`, if live.
    pub fn get_mut(&mut self, contact_id: usize) -> Option<&mut ContactManifold> {
        self.position(contact_id).map(move |i| &mut self.manifolds[i])
    }

    /// Refresh the manifold for `contact_id`, creating it if needed.
    ///
    /// Returns `true` when a new manifold was created.
    pub fn upsert(
        &mut self,
        contact_id: usize,
        a: &RigidBody,
        b: &RigidBody,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        separation: f64,
    ) -> softstep_types::Result<bool> {
        if let Some(i) = self.position(contact_id) {
            self.manifolds[i].refresh(a, b, point, normal, separation);
            return Ok(false);
        }

        if self.manifolds.len() >= self.capacity {
            tracing::warn!(
                contact_id,
                capacity = self.capacity,
                "contact manifold set is full"
            );
            return Err(SimError::ContactCapacityExceeded {
                capacity: self.capacity,
            });
        }

        tracing::debug!(contact_id, body = %b.id, separation, "contact created");
        self.manifolds
            .push(ContactManifold::new(contact_id, a, b, point, normal, separation));
        Ok(true)
    }

    /// Remove the manifold for `contact_id`, returning it if it was live.
    pub fn remove(&mut self, contact_id: usize) -> Option<ContactManifold> {
        let i = self.position(contact_id)?;
        let removed = self.manifolds.swap_remove(i);
        tracing::debug!(contact_id, body = %removed.body_b, "contact removed");
        Some(removed)
    }

    /// Drop every manifold.
    pub fn clear(&mut self) {
        self.manifolds.clear();
    }

    /// Iterate over the live manifolds.
    pub fn iter(&self) -> impl Iterator<Item = &ContactManifold> {
        self.manifolds.iter()
    }

    /// Iterate mutably over the live manifolds.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ContactManifold> {
        self.manifolds.iter_mut()
    }

    /// The first live manifold involving `body`.
    #[must_use]
    pub fn for_body(&self, body: BodyHandle) -> Option<&ContactManifold> {
        self.manifolds
            .iter()
            .find(|m| m.body_a == body || m.body_b == body)
    }
}

impl Default for ManifoldSet {
    fn default() -> Self {
        Self::new(MAX_CONTACTS)
    }
}
