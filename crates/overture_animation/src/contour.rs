//! Contour line geometry
//!
//! The background draws families of concentric rings in a 1000x1000 view box
//! and pushes every sampled point through a noise displacement, which turns
//! the circles into terrain-like contour lines.

use crate::noise::FractalNoise;
use overture_platform::Polyline;
use serde::{Deserialize, Serialize};

/// Concentric rings sharing a centre
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ContourGroup {
    pub cx: f32,
    pub cy: f32,
    pub radii: Vec<f32>,
}

impl ContourGroup {
    pub fn new(cx: f32, cy: f32, radii: Vec<f32>) -> Self {
        Self { cx, cy, radii }
    }

    /// The three ring families drawn by default
    pub fn defaults() -> Vec<ContourGroup> {
        vec![
            ContourGroup::new(
                500.0,
                500.0,
                vec![80.0, 130.0, 185.0, 245.0, 310.0, 380.0, 455.0, 530.0],
            ),
            ContourGroup::new(300.0, 350.0, vec![60.0, 110.0, 170.0, 240.0, 320.0, 410.0]),
            ContourGroup::new(720.0, 650.0, vec![70.0, 125.0, 190.0, 265.0, 350.0]),
        ]
    }
}

/// Sampled ring geometry, computed once per mount
#[derive(Clone, Debug)]
pub struct ContourField {
    rings: Vec<Polyline>,
}

impl ContourField {
    /// Sample every ring of every group with `segments` points
    ///
    /// Each polyline is closed: its last point repeats the first.
    pub fn new(groups: &[ContourGroup], segments: usize) -> Self {
        let segments = segments.max(3);
        let rings = groups
            .iter()
            .flat_map(|group| {
                group.radii.iter().map(move |&radius| {
                    (0..=segments)
                        .map(|i| {
                            let angle = (i % segments) as f32 / segments as f32
                                * std::f32::consts::TAU;
                            [
                                group.cx + radius * angle.cos(),
                                group.cy + radius * angle.sin(),
                            ]
                        })
                        .collect::<Polyline>()
                })
            })
            .collect();
        Self { rings }
    }

    pub fn rings(&self) -> &[Polyline] {
        &self.rings
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Displace every point by the noise field
    ///
    /// A point moves by `scale * (channel - 0.5)` on each axis, so a flat
    /// mid-grey field leaves the geometry untouched.
    pub fn displace(&self, noise: &FractalNoise, frequency: (f32, f32), scale: f32) -> Vec<Polyline> {
        self.rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|&[x, y]| {
                        let (dx, dy) = noise.sample_pair(x, y, frequency);
                        [x + scale * (dx - 0.5), y + scale * (dy - 0.5)]
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_field_has_nineteen_rings() {
        let field = ContourField::new(&ContourGroup::defaults(), 64);
        assert_eq!(field.len(), 19);
        assert!(field.rings().iter().all(|ring| ring.len() == 65));
    }

    #[test]
    fn test_rings_are_closed_and_on_radius() {
        let field = ContourField::new(&[ContourGroup::new(500.0, 500.0, vec![100.0])], 16);
        let ring = &field.rings()[0];
        assert_eq!(ring.first(), ring.last());
        for [x, y] in ring {
            let r = ((x - 500.0).powi(2) + (y - 500.0).powi(2)).sqrt();
            assert!((r - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_displacement_is_bounded_by_scale() {
        let field = ContourField::new(&ContourGroup::defaults(), 32);
        let noise = FractalNoise::new(1, 2);
        let displaced = field.displace(&noise, (0.004, 0.004), 50.0);

        for (ring, moved) in field.rings().iter().zip(&displaced) {
            for (a, b) in ring.iter().zip(moved) {
                assert!((a[0] - b[0]).abs() <= 25.0);
                assert!((a[1] - b[1]).abs() <= 25.0);
            }
        }
    }

    #[test]
    fn test_zero_scale_is_identity() {
        let field = ContourField::new(&ContourGroup::defaults(), 8);
        let displaced = field.displace(&FractalNoise::new(3, 2), (0.01, 0.01), 0.0);
        assert_eq!(displaced, field.rings());
    }
}
