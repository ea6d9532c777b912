use ultraviolet::Vec3;

/// Projects `p` onto the plane of the triangle (`v0`, `v1`, `v2`) and tests,
/// with barycentric coordinates, whether the projection falls inside the
/// triangle (up to `tolerance` outside each edge).
pub fn projection_in_triangle(
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    p: Vec3,
    tolerance: f32,
) -> (bool, Vec3) {
    let u = v1 - v0;
    let v = v2 - v0;
    let n = u.cross(v);
    let w = p - v0;
    let nsq = n.mag_sq();
    let l = u.cross(w).dot(n) / nsq;
    let b = w.cross(v).dot(n) / nsq;
    let a = 1.0 - l - b;
    let inside = (-tolerance..=1.0 + tolerance).contains(&a)
        && (-tolerance..=1.0 + tolerance).contains(&b)
        && (-tolerance..=1.0 + tolerance).contains(&l);
    (inside, a * v0 + b * v1 + l * v2)
}

/// Distance from `p` to the closest point on any of the three edges of the
/// triangle (`v0`, `v1`, `v2`).
pub fn closest_dist_to_triangle_edge(v0: Vec3, v1: Vec3, v2: Vec3, p: Vec3) -> f32 {
    let a = v1 - v0;
    let b = v2 - v0;
    let c = v2 - v1;
    let v0p = p - v0;
    let v1p = p - v1;
    let v2p = p - v2;
    let v0dist = v0p.mag_sq();
    let v1dist = v1p.mag_sq();
    let v2dist = v2p.mag_sq();

    let edge_dist = |origin: Vec3, edge: Vec3, op: Vec3, near_sq: f32, far_sq: f32| {
        let t = op.dot(edge);
        if t >= 0.0 && t <= edge.mag_sq() {
            ((origin + (t / edge.mag_sq()) * edge) - p).mag_sq()
        } else if t < 0.0 {
            near_sq
        } else {
            far_sq
        }
    };

    let adist = edge_dist(v0, a, v0p, v0dist, v1dist);
    let bdist = edge_dist(v0, b, v0p, v0dist, v2dist);
    let cdist = edge_dist(v1, c, v1p, v1dist, v2dist);
    adist.min(bdist.min(cdist)).sqrt()
}
