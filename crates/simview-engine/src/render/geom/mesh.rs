//! Unit meshes for each [`GeomShape`], packed into one vertex/index stream.

use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};

use crate::scene::GeomShape;

const SPHERE_STACKS: u32 = 12;
const SPHERE_SLICES: u32 = 24;
const CYLINDER_SLICES: u32 = 24;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct MeshVertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // pos
        1 => Float32x3  // normal
    ];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Slice of the shared index buffer belonging to one shape.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) struct MeshRange {
    pub first_index: u32,
    pub index_count: u32,
    pub base_vertex: i32,
}

/// All unit meshes, concatenated.
#[derive(Debug, Default)]
pub(super) struct MeshAtlas {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    ranges: Vec<(GeomShape, MeshRange)>,
}

impl MeshAtlas {
    pub(super) fn build() -> Self {
        let mut atlas = Self::default();
        for shape in GeomShape::ALL {
            let (vertices, indices) = match shape {
                GeomShape::Box => unit_box(),
                GeomShape::Sphere => unit_sphere(SPHERE_STACKS, SPHERE_SLICES),
                GeomShape::Cylinder => unit_cylinder(CYLINDER_SLICES),
                GeomShape::Plane => unit_plane(),
            };
            atlas.push(shape, vertices, indices);
        }
        atlas
    }

    fn push(&mut self, shape: GeomShape, vertices: Vec<MeshVertex>, indices: Vec<u32>) {
        let range = MeshRange {
            first_index: self.indices.len() as u32,
            index_count: indices.len() as u32,
            base_vertex: self.vertices.len() as i32,
        };
        self.vertices.extend(vertices);
        self.indices.extend(indices);
        self.ranges.push((shape, range));
    }

    pub(super) fn range(&self, shape: GeomShape) -> Option<MeshRange> {
        self.ranges
            .iter()
            .find(|(s, _)| *s == shape)
            .map(|(_, r)| *r)
    }
}

fn v(pos: [f32; 3], normal: [f32; 3]) -> MeshVertex {
    MeshVertex { pos, normal }
}

fn unit_box() -> (Vec<MeshVertex>, Vec<u32>) {
    // (normal, tangent u, tangent v) per face; u x v == normal keeps CCW winding.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, w) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = [
                n[0] + su * u[0] + sv * w[0],
                n[1] + su * u[1] + sv * w[1],
                n[2] + su * u[2] + sv * w[2],
            ];
            vertices.push(v(p, n));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

fn unit_sphere(stacks: u32, slices: u32) -> (Vec<MeshVertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    for i in 0..=stacks {
        let phi = PI * i as f32 / stacks as f32;
        let (sp, cp) = phi.sin_cos();
        for j in 0..=slices {
            let theta = TAU * j as f32 / slices as f32;
            let (st, ct) = theta.sin_cos();
            let p = [sp * ct, sp * st, cp];
            vertices.push(v(p, p));
        }
    }

    let mut indices = Vec::new();
    let row = slices + 1;
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * row + j;
            let b = a + row;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    (vertices, indices)
}

fn unit_cylinder(slices: u32) -> (Vec<MeshVertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // Side wall.
    for j in 0..=slices {
        let theta = TAU * j as f32 / slices as f32;
        let (s, c) = theta.sin_cos();
        vertices.push(v([c, s, -1.0], [c, s, 0.0]));
        vertices.push(v([c, s, 1.0], [c, s, 0.0]));
    }
    for j in 0..slices {
        let a = j * 2;
        indices.extend_from_slice(&[a, a + 2, a + 1, a + 1, a + 2, a + 3]);
    }

    // Caps as triangle fans.
    for (z, nz) in [(1.0_f32, 1.0_f32), (-1.0, -1.0)] {
        let center = vertices.len() as u32;
        vertices.push(v([0.0, 0.0, z], [0.0, 0.0, nz]));
        for j in 0..=slices {
            let theta = TAU * j as f32 / slices as f32;
            let (s, c) = theta.sin_cos();
            vertices.push(v([c, s, z], [0.0, 0.0, nz]));
        }
        for j in 0..slices {
            let a = center + 1 + j;
            if nz > 0.0 {
                indices.extend_from_slice(&[center, a, a + 1]);
            } else {
                indices.extend_from_slice(&[center, a + 1, a]);
            }
        }
    }
    (vertices, indices)
}

fn unit_plane() -> (Vec<MeshVertex>, Vec<u32>) {
    let n = [0.0, 0.0, 1.0];
    let vertices = vec![
        v([-1.0, -1.0, 0.0], n),
        v([1.0, -1.0, 0.0], n),
        v([1.0, 1.0, 0.0], n),
        v([-1.0, 1.0, 0.0], n),
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_shape_has_a_nonempty_range() {
        let atlas = MeshAtlas::build();
        for shape in GeomShape::ALL {
            let r = atlas.range(shape).unwrap();
            assert!(r.index_count > 0 && r.index_count % 3 == 0, "{shape:?}");
        }
    }

    #[test]
    fn indices_stay_within_their_mesh() {
        let atlas = MeshAtlas::build();
        let mut ends: Vec<i32> = GeomShape::ALL
            .iter()
            .map(|s| atlas.range(*s).unwrap().base_vertex)
            .collect();
        ends.push(atlas.vertices.len() as i32);

        for (i, shape) in GeomShape::ALL.iter().enumerate() {
            let r = atlas.range(*shape).unwrap();
            let count = (ends[i + 1] - ends[i]) as u32;
            let slice = &atlas.indices[r.first_index as usize..(r.first_index + r.index_count) as usize];
            assert!(slice.iter().all(|&ix| ix < count), "{shape:?}");
        }
    }

    #[test]
    fn unit_meshes_fit_in_cube() {
        let atlas = MeshAtlas::build();
        for vert in &atlas.vertices {
            assert!(vert.pos.iter().all(|c| c.abs() <= 1.0 + 1e-6));
        }
    }

    #[test]
    fn box_faces_wind_outward() {
        let (verts, idx) = unit_box();
        for tri in idx.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| glam::Vec3::from(verts[i as usize].pos));
            let n = glam::Vec3::from(verts[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }
}
