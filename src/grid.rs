// Uniform hash grid used as broad phase for both cells and mesh triangles.
//
// Buckets are kept in insertion order (a HashMap only maps keys to bucket
// indices), so iteration order, and therefore every downstream force
// computation, is independent of hasher state.

use std::collections::HashMap;
use std::hash::Hash;

use ultraviolet::Vec3;

use crate::geometry::{closest_dist_to_triangle_edge, projection_in_triangle};

pub type GridKey = (i32, i32, i32);

/// Number of color classes in the parallel partition (2 per axis).
pub const COLOR_CLASSES: usize = 8;

#[derive(Clone, Debug)]
pub struct SpatialGrid<T> {
    // Stored as 1/size so bucket lookup is a multiply.
    inv_cell_size: f32,
    index: HashMap<GridKey, usize>,
    buckets: Vec<(GridKey, Vec<T>)>,
}

impl<T: Copy + Eq + Hash> SpatialGrid<T> {
    pub fn new(cell_size: f32) -> Self {
        Self {
            inv_cell_size: 1.0 / cell_size,
            index: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        1.0 / self.inv_cell_size
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Occupied buckets in insertion order.
    pub fn content(&self) -> &[(GridKey, Vec<T>)] {
        &self.buckets
    }

    pub fn key_of(&self, p: Vec3) -> GridKey {
        (
            (p.x * self.inv_cell_size).floor() as i32,
            (p.y * self.inv_cell_size).floor() as i32,
            (p.z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Color class of a bucket. Buckets of the same class are never
    /// adjacent (not even diagonally), so per-class batches can be worked
    /// on concurrently without touching a common neighborhood.
    pub fn color_of(key: GridKey) -> usize {
        (key.0.unsigned_abs() as usize % 2)
            + (key.1.unsigned_abs() as usize % 2) * 2
            + (key.2.unsigned_abs() as usize % 2) * 4
    }

    pub fn insert_at(&mut self, key: GridKey, item: T) {
        let idx = *self.index.entry(key).or_insert_with(|| {
            self.buckets.push((key, Vec::new()));
            self.buckets.len() - 1
        });
        self.buckets[idx].1.push(item);
    }

    /// Inserts `item` into every bucket overlapped by the bounding cube of
    /// a sphere at `center`.
    pub fn insert_sphere(&mut self, item: T, center: Vec3, radius: f32) {
        let r = Vec3::new(radius, radius, radius);
        let min = self.key_of(center - r);
        let max = self.key_of(center + r);
        for i in min.0..=max.0 {
            for j in min.1..=max.1 {
                for k in min.2..=max.2 {
                    self.insert_at((i, j, k), item);
                }
            }
        }
    }

    /// Inserts `item` into the buckets actually crossed by the triangle
    /// (`p0`, `p1`, `p2`), pruning bounding-box buckets whose center is far
    /// from the triangle plane and outside the edge band.
    pub fn insert_triangle(&mut self, item: T, p0: Vec3, p1: Vec3, p2: Vec3) {
        let cs = self.cell_size();
        let blf = Vec3::new(
            p0.x.min(p1.x.min(p2.x)),
            p0.y.min(p1.y.min(p2.y)),
            p0.z.min(p1.z.min(p2.z)),
        );
        let trb = Vec3::new(
            p0.x.max(p1.x.max(p2.x)),
            p0.y.max(p1.y.max(p2.y)),
            p0.z.max(p1.z.max(p2.z)),
        );
        let min = self.key_of(blf);
        let max = self.key_of(trb);
        for i in min.0..=max.0 + 1 {
            for j in min.1..=max.1 + 1 {
                for k in min.2..=max.2 + 1 {
                    let center = Vec3::new(i as f32, j as f32, k as f32) * cs;
                    let (inside, proj) = projection_in_triangle(p0, p1, p2, center, 0.0);
                    if (center - proj).mag_sq() < 0.8 * cs * cs
                        && (inside
                            || closest_dist_to_triangle_edge(p0, p1, p2, center) < 0.87 * cs)
                    {
                        self.insert_at((i, j, k), item);
                    }
                }
            }
        }
    }

    /// All items whose bucket overlaps the bounding cube of the query
    /// sphere, deduplicated, in first-seen order.
    pub fn retrieve(&self, center: Vec3, radius: f32) -> Vec<T> {
        let r = Vec3::new(radius, radius, radius);
        let min = self.key_of(center - r);
        let max = self.key_of(center + r);
        let mut seen = std::collections::HashSet::new();
        let mut res = Vec::new();
        for i in min.0..=max.0 {
            for j in min.1..=max.1 {
                for k in min.2..=max.2 {
                    if let Some(&idx) = self.index.get(&(i, j, k)) {
                        for item in &self.buckets[idx].1 {
                            if seen.insert(*item) {
                                res.push(*item);
                            }
                        }
                    }
                }
            }
        }
        res
    }

    /// Buckets regrouped by color class, each class in insertion order.
    pub fn color_batches(&self) -> [Vec<&[T]>; COLOR_CLASSES] {
        let mut res: [Vec<&[T]>; COLOR_CLASSES] = Default::default();
        for (key, bucket) in &self.buckets {
            res[Self::color_of(*key)].push(bucket.as_slice());
        }
        res
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.buckets.clear();
    }
}
