use cgmath::Point3;
use serde::{Deserialize, Serialize};

/// A point in world space, in centimeters (the model's native length unit).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub pos: Point3<f64>,
}

impl Vertex {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vertex { pos: Point3::new(x, y, z) }
    }
}
