// Small numeric helpers shared across modules.

/// Linear interpolation; `c = 0` yields `a`, `c = 1` yields `b`.
pub fn mix(a: f32, b: f32, c: f32) -> f32 {
    a * (1.0 - c) + c * b
}

/// Damping coefficient giving ratio `r` for a mass (or moment of inertia)
/// `m` attached to a spring of stiffness `k`. `r = 1` is critical damping.
pub fn damping_from_ratio(r: f32, m: f32, k: f32) -> f32 {
    r * 2.0 * (m * k).sqrt()
}

/// HSV (h in degrees, s and v in [0, 1]) to RGB in [0, 1].
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h = (h.rem_euclid(360.0)) / 60.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as i32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Pair key with a canonical order, independent of argument order.
pub fn ordered_pair<T: Ord>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_hits_both_endpoints() {
        assert_eq!(mix(2.0, 10.0, 0.0), 2.0);
        assert_eq!(mix(2.0, 10.0, 1.0), 10.0);
        assert_eq!(mix(2.0, 10.0, 0.5), 6.0);
    }

    #[test]
    fn critical_damping_formula() {
        // c = 2*sqrt(m*k) at ratio 1.
        let c = damping_from_ratio(1.0, 4.0, 9.0);
        assert!((c - 12.0).abs() < 1e-6, "expected 12, got {}", c);
    }

    #[test]
    fn ordered_pair_is_order_independent() {
        assert_eq!(ordered_pair(3u64, 1u64), ordered_pair(1u64, 3u64));
    }

    #[test]
    fn hsv_primaries() {
        let (r, g, b) = hsv_to_rgb(0.0, 1.0, 1.0);
        assert_eq!((r, g, b), (1.0, 0.0, 0.0));
        let (r, g, b) = hsv_to_rgb(120.0, 1.0, 1.0);
        assert_eq!((r, g, b), (0.0, 1.0, 0.0));
    }
}
