// 3D algebra used by the whole engine: vector helpers on top of
// `ultraviolet::Vec3`, axis-angle rotations, orthonormal bases and the
// triangle predicates of the mesh-collision layer.
//
// Everything here is value types with no owned state. Degenerate inputs
// (zero-length vectors, coincident points) are guarded and fall back to a
// default direction instead of producing NaN.

mod basis;
mod quaternion;
mod rotation;
mod triangle;

pub use basis::Basis;
pub use rotation::Rotation;
pub use triangle::{closest_dist_to_triangle_edge, projection_in_triangle};

pub(crate) use quaternion::Quaternion;

use ultraviolet::Vec3;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

/// Engine-specific vector operations that `ultraviolet` does not provide.
pub trait VecExt {
    /// Some vector orthogonal to `self`. Returns +Y for vectors on the Z
    /// axis (including zero), so the result is always usable.
    fn ortho(&self) -> Vec3;
    /// An orthogonal vector preferring the plane spanned with `v`, falling
    /// back to `ortho()` when the pair is degenerate.
    fn ortho_to(&self, v: Vec3) -> Vec3;
    fn is_zero(&self) -> bool;
    /// Unit vector, or `fallback` when `self` is (near) zero.
    fn normalized_or(&self, fallback: Vec3) -> Vec3;
    fn rotated(&self, r: &Rotation) -> Vec3;
    fn rotated_axis_angle(&self, angle: f32, axis: Vec3) -> Vec3;
}

impl VecExt for Vec3 {
    fn ortho(&self) -> Vec3 {
        if self.x == 0.0 && self.y == 0.0 {
            return Vec3::new(0.0, 1.0, 0.0);
        }
        Vec3::new(-self.y, self.x, 0.0)
    }

    fn ortho_to(&self, v: Vec3) -> Vec3 {
        if (v - *self).mag_sq() > 1e-12 {
            let res = self.cross(v);
            if res.mag_sq() > 1e-13 {
                return res;
            }
        }
        self.ortho()
    }

    fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    fn normalized_or(&self, fallback: Vec3) -> Vec3 {
        let sq = self.mag_sq();
        if sq > 0.0 {
            *self / sq.sqrt()
        } else {
            fallback
        }
    }

    fn rotated(&self, r: &Rotation) -> Vec3 {
        self.rotated_axis_angle(r.angle, r.axis)
    }

    // Quaternion sandwich expanded for a unit axis.
    fn rotated_axis_angle(&self, angle: f32, axis: Vec3) -> Vec3 {
        let half = angle * 0.5;
        let v = axis * half.sin();
        let vcv = 2.0 * v.cross(*self);
        *self + half.cos() * vcv + v.cross(vcv)
    }
}

/// Projection of `p` onto the line through `origin` and `b`.
pub fn project_on_line(origin: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let a = b - origin;
    let sq = a.mag_sq();
    if sq == 0.0 {
        return origin;
    }
    origin + a * (a.dot(p - origin) / sq)
}

/// Projection of `p` onto the plane with normal `n` passing through `o`.
/// `n` must be unit length.
pub fn project_on_plane(o: Vec3, n: Vec3, p: Vec3) -> Vec3 {
    p - n * n.dot(p - o)
}

/// Distance `l` such that `p + l*r` lies on the plane (`o`, normal `n`).
/// Zero when the ray is parallel to the plane or `p` already lies on it.
pub fn ray_cast(o: Vec3, n: Vec3, p: Vec3, r: Vec3) -> f32 {
    let nr = n.dot(r);
    if nr == 0.0 {
        0.0
    } else {
        n.dot(o - p) / nr
    }
}

/// Random unit vector from a seeded generator (normal-deviate sampling, so
/// the distribution is uniform on the sphere).
pub fn random_unit(rng: &mut fastrand::Rng) -> Vec3 {
    // Box-Muller pairs; the spare deviate is cheap to throw away here.
    let mut normal = |rng: &mut fastrand::Rng| -> f32 {
        let u1 = rng.f32().max(f32::MIN_POSITIVE);
        let u2 = rng.f32();
        (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
    };
    let v = Vec3::new(normal(rng), normal(rng), normal(rng));
    v.normalized_or(Vec3::new(0.0, 1.0, 0.0))
}
