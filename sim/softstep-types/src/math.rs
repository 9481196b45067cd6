//! Math helpers shared by the integrator, joints and the contact resolver.
//!
//! Vectors, matrices and quaternions come from nalgebra. This module adds the
//! handful of operations the solver needs on top of them: length-guarded
//! normalization, orthonormal basis construction, point-constraint effective
//! mass assembly and quaternion integration.
//!
//! # Degenerate input
//!
//! The normalize helpers return their input unchanged when its length is
//! below [`f64::EPSILON`] instead of producing `NaN`. Matrix inversion returns
//! the zero matrix for singular input, which makes the affected constraint
//! inert for the rest of the step.

use nalgebra::{Matrix2, Matrix3, Matrix4, Point3, Quaternion, Vector3};

/// Component threshold used by [`compute_basis`].
///
/// A unit vector with all components equal has `s = sqrt(1/3)`, so at least
/// one component of any unit vector is at least this large.
const BASIS_THRESHOLD: f64 = 0.577_35;

/// Normalize `v`, or return it unchanged if its length is (nearly) zero.
#[must_use]
pub fn normalize_or_self(v: &Vector3<f64>) -> Vector3<f64> {
    let len = v.norm();
    if len < f64::EPSILON {
        return *v;
    }
    v / len
}

/// Normalize `q`, or return it unchanged if its norm is (nearly) zero.
#[must_use]
pub fn normalize_quat_or_self(q: &Quaternion<f64>) -> Quaternion<f64> {
    let len = q.norm();
    if len < f64::EPSILON {
        return *q;
    }
    q / len
}

/// A unit vector perpendicular to `v`.
///
/// Picks the largest of the x/z components to avoid cancellation.
#[must_use]
pub fn perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    if v.x.abs() > v.z.abs() {
        normalize_or_self(&Vector3::new(-v.y, v.x, 0.0))
    } else {
        normalize_or_self(&Vector3::new(0.0, -v.z, v.y))
    }
}

/// Build two tangent vectors completing an orthonormal basis with `n`.
///
/// `n` is expected to be unit length. The returned pair `(t1, t2)` satisfies
/// `t2 = n × t1`.
#[must_use]
pub fn compute_basis(n: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let t1 = if n.x.abs() >= BASIS_THRESHOLD {
        Vector3::new(n.y, -n.x, 0.0)
    } else {
        Vector3::new(0.0, n.z, -n.y)
    };
    let t1 = normalize_or_self(&t1);
    let t2 = n.cross(&t1);
    (t1, t2)
}

/// Cross-product matrix: `skew(a) * b == a × b`.
#[must_use]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    v.cross_matrix()
}

/// `K = (mA + mB)·I − [rA]× IA [rA]× − [rB]× IB [rB]×` for a point constraint.
///
/// This is `J M⁻¹ Jᵀ` for the three translational rows that keep two anchors
/// coincident; invert it to get the effective mass.
#[must_use]
pub fn point_effective_mass(
    inv_mass_sum: f64,
    r_a: &Vector3<f64>,
    inv_i_a: &Matrix3<f64>,
    r_b: &Vector3<f64>,
    inv_i_b: &Matrix3<f64>,
) -> Matrix3<f64> {
    let sa = skew(r_a);
    let sb = skew(r_b);
    Matrix3::identity() * inv_mass_sum - sa * inv_i_a * sa - sb * inv_i_b * sb
}

/// Inverse of a 2×2 matrix, or zero if it is singular.
#[must_use]
pub fn invert_or_zero_2(m: &Matrix2<f64>) -> Matrix2<f64> {
    m.try_inverse().unwrap_or_else(|| {
        tracing::trace!(det = m.determinant(), "singular 2x2 effective mass");
        Matrix2::zeros()
    })
}

/// Inverse of a 3×3 matrix, or zero if it is singular.
#[must_use]
pub fn invert_or_zero_3(m: &Matrix3<f64>) -> Matrix3<f64> {
    m.try_inverse().unwrap_or_else(|| {
        tracing::trace!(det = m.determinant(), "singular 3x3 effective mass");
        Matrix3::zeros()
    })
}

/// `1 / k`, or zero when `k` is not positive.
#[must_use]
pub fn invert_or_zero(k: f64) -> f64 {
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

/// Homogeneous transform `translate(origin) · rotation`.
#[must_use]
pub fn transform_matrix(origin: &Point3<f64>, rotation: &Matrix3<f64>) -> Matrix4<f64> {
    Matrix4::new_translation(&origin.coords) * rotation.to_homogeneous()
}

/// Advance `q` by angular velocity `omega` over `h`.
///
/// Uses the first-order exponential map `q += ½ (ω h) ⊗ q` followed by a
/// guarded renormalization.
#[must_use]
pub fn integrate_rotation(q: &Quaternion<f64>, omega: &Vector3<f64>, h: f64) -> Quaternion<f64> {
    let spin = Quaternion::from_imag(omega * (0.5 * h)) * q;
    normalize_quat_or_self(&(q + spin))
}

/// Rotation matrix of a (unit) quaternion stored without the unit wrapper.
#[must_use]
pub fn quat_to_matrix(q: &Quaternion<f64>) -> Matrix3<f64> {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (xy, xz, yz) = (x * y, x * z, y * z);
    let (wx, wy, wz) = (w * x, w * y, w * z);
    Matrix3::new(
        1.0 - 2.0 * (yy + zz),
        2.0 * (xy - wz),
        2.0 * (xz + wy),
        2.0 * (xy + wz),
        1.0 - 2.0 * (xx + zz),
        2.0 * (yz - wx),
        2.0 * (xz - wy),
        2.0 * (yz + wx),
        1.0 - 2.0 * (xx + yy),
    )
}
