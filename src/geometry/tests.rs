use std::f32::consts::{FRAC_PI_2, PI};

use ultraviolet::Vec3;

use super::*;

fn approx(a: Vec3, b: Vec3, eps: f32) -> bool {
    (a - b).mag() < eps
}

#[test]
fn ortho_is_orthogonal_and_nonzero() {
    let vs = [
        Vec3::new(1.0, 2.0, 3.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(-4.0, 0.5, 0.0),
    ];
    for v in vs {
        let o = v.ortho();
        assert!(o.mag_sq() > 0.0, "ortho must be usable for {:?}", v);
        assert!(v.dot(o).abs() < 1e-6, "ortho not orthogonal for {:?}", v);
    }
}

#[test]
fn rotation_between_carries_first_vector_onto_second() {
    let a = Vec3::new(1.0, 0.0, 0.0);
    let b = Vec3::new(0.0, 0.0, 1.0);
    let r = Rotation::between(a, b);
    assert!(approx(a.rotated(&r), b, 1e-5));
}

#[test]
fn quarter_turn_around_z() {
    let r = Rotation::new(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
    let v = Vec3::new(1.0, 0.0, 0.0).rotated(&r);
    assert!(approx(v, Vec3::new(0.0, 1.0, 0.0), 1e-5));
}

#[test]
fn composing_with_inverse_is_identity() {
    let r = Rotation::new(Vec3::new(0.6, 0.8, 0.0), 1.1);
    let v = Vec3::new(0.3, -2.0, 5.0);
    let back = v.rotated(&r).rotated(&r.inverted());
    assert!(approx(back, v, 1e-4));
}

#[test]
fn composition_angle_stays_compressed() {
    let r = Rotation::new(Vec3::new(0.0, 1.0, 0.0), 2.5);
    let sum = r.then(&r);
    assert!(sum.angle <= PI + 1e-5, "angle {} not compressed", sum.angle);
    // 2.5 + 2.5 = 5.0 rad == 2*pi - 5.0 around the flipped axis.
    let v = Vec3::new(1.0, 0.0, 0.0);
    let direct = v
        .rotated(&Rotation::new(Vec3::new(0.0, 1.0, 0.0), 5.0));
    assert!(approx(v.rotated(&sum), direct, 1e-4));
}

#[test]
fn integrate_matches_single_rotation_from_rest() {
    let w_dt = Vec3::new(0.0, 0.0, 1.2);
    let r = Rotation::default().integrate(w_dt);
    let v = Vec3::new(1.0, 0.0, 0.0);
    let expected = v.rotated(&Rotation::new(Vec3::new(0.0, 0.0, 1.0), 1.2));
    assert!(approx(v.rotated(&r), expected, 1e-5));
}

#[test]
fn basis_follows_rotation_and_stays_orthonormal() {
    let mut b = Basis::default();
    let r = Rotation::new(Vec3::new(0.577_35, 0.577_35, 0.577_35), 0.9);
    b.update_from_rotation(&r);
    assert!((b.x.mag() - 1.0).abs() < 1e-5);
    assert!((b.y.mag() - 1.0).abs() < 1e-5);
    assert!(b.x.dot(b.y).abs() < 1e-5);
    assert!((b.z().mag() - 1.0).abs() < 1e-5);
}

#[test]
fn rotation_between_bases_recovers_frame() {
    let r = Rotation::new(Vec3::new(0.0, 0.0, 1.0), 0.7);
    let target = Basis::default().rotated(&r);
    let rec = Rotation::from_bases(&Basis::default(), &target);
    let got = Basis::default().rotated(&rec);
    assert!(approx(got.x, target.x, 1e-4));
    assert!(approx(got.y, target.y, 1e-4));
}

#[test]
fn plane_projection_and_ray_cast_agree() {
    let o = Vec3::new(0.0, 2.0, 0.0);
    let n = Vec3::new(0.0, 1.0, 0.0);
    let p = Vec3::new(3.0, 7.0, -1.0);
    assert!(approx(
        project_on_plane(o, n, p),
        Vec3::new(3.0, 2.0, -1.0),
        1e-6
    ));
    // Ray straight down from p hits the plane after 5 units.
    let l = ray_cast(o, n, p, Vec3::new(0.0, -1.0, 0.0));
    assert!((l - 5.0).abs() < 1e-6);
    // Parallel ray reports 0.
    assert_eq!(ray_cast(o, n, p, Vec3::new(1.0, 0.0, 0.0)), 0.0);
}

#[test]
fn line_projection_lands_on_the_line() {
    let a = Vec3::new(0.0, 0.0, 0.0);
    let b = Vec3::new(10.0, 0.0, 0.0);
    let p = Vec3::new(3.0, 4.0, 0.0);
    assert!(approx(project_on_line(a, b, p), Vec3::new(3.0, 0.0, 0.0), 1e-6));
}

#[test]
fn triangle_projection_classifies_inside_and_outside() {
    let v0 = Vec3::new(0.0, 0.0, 0.0);
    let v1 = Vec3::new(1.0, 0.0, 0.0);
    let v2 = Vec3::new(0.0, 1.0, 0.0);
    let (inside, proj) = projection_in_triangle(v0, v1, v2, Vec3::new(0.25, 0.25, 3.0), 0.0);
    assert!(inside);
    assert!(approx(proj, Vec3::new(0.25, 0.25, 0.0), 1e-5));
    let (inside, _) = projection_in_triangle(v0, v1, v2, Vec3::new(2.0, 2.0, 0.0), 0.0);
    assert!(!inside);
}

#[test]
fn triangle_edge_distance() {
    let v0 = Vec3::new(0.0, 0.0, 0.0);
    let v1 = Vec3::new(2.0, 0.0, 0.0);
    let v2 = Vec3::new(0.0, 2.0, 0.0);
    // Point above the middle of edge v0-v1.
    let d = closest_dist_to_triangle_edge(v0, v1, v2, Vec3::new(1.0, 0.0, 1.5));
    assert!((d - 1.5).abs() < 1e-5, "got {}", d);
    // Point past v1: closest feature is the vertex.
    let d = closest_dist_to_triangle_edge(v0, v1, v2, Vec3::new(3.0, 0.0, 0.0));
    assert!((d - 1.0).abs() < 1e-5, "got {}", d);
}

#[test]
fn random_unit_is_unit_and_deterministic_per_seed() {
    let mut r1 = fastrand::Rng::with_seed(42);
    let mut r2 = fastrand::Rng::with_seed(42);
    for _ in 0..16 {
        let a = random_unit(&mut r1);
        let b = random_unit(&mut r2);
        assert_eq!(a.x, b.x);
        assert!((a.mag() - 1.0).abs() < 1e-5);
    }
}
