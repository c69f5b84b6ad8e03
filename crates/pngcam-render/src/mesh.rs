//! Triangle mesh import.
//!
//! Loads an STL file into a flat list of triangles and provides the small
//! set of transforms the renderer needs: bounding box, translation, and
//! rotation about an axis.

use nalgebra::{Point3, Rotation3, Vector3};
use pngcam_core::{Error, Result};
use std::fs::File;
use std::path::Path;

/// A 3D triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f32>; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(v1: Point3<f32>, v2: Point3<f32>, v3: Point3<f32>) -> Self {
        Self {
            vertices: [v1, v2, v3],
        }
    }
}

/// A triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Read a mesh from an STL file (binary or ASCII).
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|source| Error::InputOpen {
            path: path.display().to_string(),
            source,
        })?;

        let stl = stl_io::read_stl(&mut file).map_err(|e| Error::InputDecode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self::from_stl_mesh(&stl))
    }

    /// Convert an indexed STL mesh into a flat triangle list.
    pub fn from_stl_mesh(stl_mesh: &stl_io::IndexedMesh) -> Self {
        let mut triangles = Vec::with_capacity(stl_mesh.faces.len());

        for face in &stl_mesh.faces {
            let v1_idx = face.vertices[0];
            let v2_idx = face.vertices[1];
            let v3_idx = face.vertices[2];

            if v1_idx < stl_mesh.vertices.len()
                && v2_idx < stl_mesh.vertices.len()
                && v3_idx < stl_mesh.vertices.len()
            {
                let v1 = stl_mesh.vertices[v1_idx];
                let v2 = stl_mesh.vertices[v2_idx];
                let v3 = stl_mesh.vertices[v3_idx];

                triangles.push(Triangle::new(
                    Point3::new(v1[0], v1[1], v1[2]),
                    Point3::new(v2[0], v2[1], v2[2]),
                    Point3::new(v3[0], v3[1], v3[2]),
                ));
            }
        }

        Self { triangles }
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Axis-aligned bounding box as (min, max) corners.
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        let mut min = Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        let mut max = Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);

        for t in &self.triangles {
            for v in &t.vertices {
                min.x = min.x.min(v.x);
                min.y = min.y.min(v.y);
                min.z = min.z.min(v.z);
                max.x = max.x.max(v.x);
                max.y = max.y.max(v.y);
                max.z = max.z.max(v.z);
            }
        }

        (min, max)
    }

    /// Translate every vertex.
    pub fn translate(&mut self, v: Vector3<f32>) {
        for t in &mut self.triangles {
            for vertex in &mut t.vertices {
                *vertex += v;
            }
        }
    }

    /// Rotate every vertex about the origin.
    pub fn rotate(&mut self, rotation: &Rotation3<f32>) {
        for t in &mut self.triangles {
            for vertex in &mut t.vertices {
                *vertex = rotation * *vertex;
            }
        }
    }
}
