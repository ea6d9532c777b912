// Static triangle meshes cells can collide with, loaded from Wavefront OBJ.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;

use ultraviolet::Vec3;

use crate::geometry::{Rotation, VecExt};

#[derive(Clone, Copy, Debug)]
pub struct Face {
    pub indices: [usize; 3],
}

#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub faces: Vec<Face>,
    /// Faces sharing at least one vertex.
    pub adjacency: HashMap<usize, HashSet<usize>>,
    changed: bool,
}

fn bad_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

impl Model {
    /// Parses OBJ text. Only `v`, `vn` and `f` records are used; faces with
    /// more than three vertices are fan-triangulated.
    pub fn from_obj_str(name: &str, text: &str) -> io::Result<Self> {
        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut faces = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some(tag @ ("v" | "vn")) => {
                    let target: &mut Vec<Vec3> = if tag == "vn" {
                        &mut normals
                    } else {
                        &mut vertices
                    };
                    let mut coords = [0.0f32; 3];
                    for c in &mut coords {
                        let field = fields.next().ok_or_else(|| {
                            bad_data(format!("line {}: expected 3 coordinates", lineno + 1))
                        })?;
                        *c = field.parse().map_err(|e| {
                            bad_data(format!("line {}: bad coordinate: {}", lineno + 1, e))
                        })?;
                    }
                    target.push(Vec3::new(coords[0], coords[1], coords[2]));
                }
                Some("f") => {
                    let mut idx = Vec::new();
                    for field in fields {
                        // "i", "i/t" and "i/t/n" forms; only the vertex
                        // index matters here.
                        let raw = field.split('/').next().unwrap_or(field);
                        let i: isize = raw.parse().map_err(|e| {
                            bad_data(format!("line {}: bad face index: {}", lineno + 1, e))
                        })?;
                        let i = if i < 0 {
                            vertices.len() as isize + i
                        } else {
                            i - 1
                        };
                        if i < 0 || i as usize >= vertices.len() {
                            return Err(bad_data(format!(
                                "line {}: face index out of range",
                                lineno + 1
                            )));
                        }
                        idx.push(i as usize);
                    }
                    if idx.len() < 3 {
                        return Err(bad_data(format!(
                            "line {}: face needs at least 3 vertices",
                            lineno + 1
                        )));
                    }
                    for w in 1..idx.len() - 1 {
                        faces.push(Face {
                            indices: [idx[0], idx[w], idx[w + 1]],
                        });
                    }
                }
                _ => {}
            }
        }
        let mut model = Self {
            name: name.to_string(),
            vertices,
            normals,
            faces,
            adjacency: HashMap::new(),
            changed: true,
        };
        model.compute_adjacency();
        Ok(model)
    }

    pub fn load<P: AsRef<Path>>(name: &str, path: P) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_obj_str(name, &text)
    }

    pub fn scale(&mut self, s: Vec3) {
        for v in &mut self.vertices {
            v.x *= s.x;
            v.y *= s.y;
            v.z *= s.z;
        }
        self.changed = true;
    }

    pub fn translate(&mut self, t: Vec3) {
        for v in &mut self.vertices {
            *v += t;
        }
        self.changed = true;
    }

    pub fn rotate(&mut self, r: &Rotation) {
        for v in &mut self.vertices {
            *v = v.rotated(r);
        }
        for n in &mut self.normals {
            *n = n.rotated(r);
        }
        self.changed = true;
    }

    pub fn compute_adjacency(&mut self) {
        self.adjacency.clear();
        // Faces grouped per vertex, so only faces that actually share a
        // vertex are ever paired up.
        let mut by_vertex: HashMap<usize, Vec<usize>> = HashMap::new();
        for (fi, f) in self.faces.iter().enumerate() {
            for &v in &f.indices {
                by_vertex.entry(v).or_default().push(fi);
            }
        }
        for faces in by_vertex.values() {
            for (n, &a) in faces.iter().enumerate() {
                for &b in &faces[n + 1..] {
                    self.adjacency.entry(a).or_default().insert(b);
                    self.adjacency.entry(b).or_default().insert(a);
                }
            }
        }
    }

    pub fn face_vertices(&self, face: usize) -> (Vec3, Vec3, Vec3) {
        let f = &self.faces[face];
        (
            self.vertices[f.indices[0]],
            self.vertices[f.indices[1]],
            self.vertices[f.indices[2]],
        )
    }

    /// True once since the last call if the mesh was transformed. The
    /// world's broad phase uses it to rebuild lazily.
    pub fn changed_since_last_check(&mut self) -> bool {
        let c = self.changed;
        self.changed = false;
        c
    }
}
