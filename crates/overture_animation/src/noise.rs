//! Fractal noise for the background displacement
//!
//! Gradient noise summed over octaves, sampled with an independent base
//! frequency per axis in the manner of `feTurbulence type="fractalNoise"`.

/// Multi-octave gradient noise with per-axis base frequency
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractalNoise {
    pub seed: u64,
    pub octaves: u32,
}

impl FractalNoise {
    pub fn new(seed: u64, octaves: u32) -> Self {
        Self {
            seed,
            octaves: octaves.clamp(1, 8),
        }
    }

    /// Sample at `(x, y)` with base frequency `(fx, fy)`, in `[0, 1]`
    ///
    /// Each octave doubles the frequency and halves the amplitude.
    pub fn sample(&self, x: f32, y: f32, frequency: (f32, f32)) -> f32 {
        let mut result = 0.0;
        let mut scale = 1.0;
        let mut amp = 1.0;
        let mut max_amp = 0.0;

        for octave in 0..self.octaves {
            let seed = self.seed.wrapping_add(octave as u64 * 1000);
            result += perlin_2d(x * frequency.0 * scale, y * frequency.1 * scale, seed) * amp;
            max_amp += amp;
            scale *= 2.0;
            amp *= 0.5;
        }

        result / max_amp
    }

    /// Two decorrelated channels, used as the x and y displacement sources
    pub fn sample_pair(&self, x: f32, y: f32, frequency: (f32, f32)) -> (f32, f32) {
        let other = FractalNoise {
            seed: self.seed.wrapping_add(0x9E37),
            octaves: self.octaves,
        };
        (
            self.sample(x, y, frequency),
            other.sample(x, y, frequency),
        )
    }
}

fn hash(x: i32, y: i32, seed: u64) -> u32 {
    let mut h = seed as u32;
    h = h.wrapping_mul(374761393);
    h = h.wrapping_add((x as u32).wrapping_mul(668265263));
    h = h.wrapping_add((y as u32).wrapping_mul(2654435761));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

fn quintic(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn gradient(h: u32) -> (f32, f32) {
    let angle = (h as f32) / (u32::MAX as f32) * std::f32::consts::TAU;
    (angle.cos(), angle.sin())
}

/// Single-octave gradient noise normalized to `[0, 1]`
fn perlin_2d(x: f32, y: f32, seed: u64) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let u = quintic(fx);
    let v = quintic(fy);

    let corner = |cx: i32, cy: i32, dx: f32, dy: f32| {
        let (gx, gy) = gradient(hash(cx, cy, seed));
        gx * dx + gy * dy
    };

    let n00 = corner(x0, y0, fx, fy);
    let n10 = corner(x0 + 1, y0, fx - 1.0, fy);
    let n01 = corner(x0, y0 + 1, fx, fy - 1.0);
    let n11 = corner(x0 + 1, y0 + 1, fx - 1.0, fy - 1.0);

    let result = lerp(lerp(n00, n10, u), lerp(n01, n11, u), v);
    ((result + 1.0) * 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_range() {
        let noise = FractalNoise::new(1, 2);
        for i in 0..500 {
            let x = i as f32 * 7.3;
            let y = i as f32 * 3.1;
            let value = noise.sample(x, y, (0.004, 0.0045));
            assert!((0.0..=1.0).contains(&value), "{value} out of range");
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let a = FractalNoise::new(5, 2);
        let b = FractalNoise::new(5, 2);
        assert_eq!(a.sample(123.0, 456.0, (0.01, 0.01)), b.sample(123.0, 456.0, (0.01, 0.01)));
    }

    #[test]
    fn test_continuous_in_frequency() {
        // Small frequency changes must not cause jumps in the field
        let noise = FractalNoise::new(1, 2);
        let a = noise.sample(500.0, 500.0, (0.004, 0.004));
        let b = noise.sample(500.0, 500.0, (0.0040006, 0.0040006));
        assert!((a - b).abs() < 0.01);
    }

    #[test]
    fn test_channels_differ() {
        let noise = FractalNoise::new(1, 2);
        let (a, b) = noise.sample_pair(310.0, 220.0, (0.01, 0.01));
        assert_ne!(a, b);
    }

    #[test]
    fn test_octaves_clamped() {
        assert_eq!(FractalNoise::new(0, 0).octaves, 1);
        assert_eq!(FractalNoise::new(0, 99).octaves, 8);
    }
}
