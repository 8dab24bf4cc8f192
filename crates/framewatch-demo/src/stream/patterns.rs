use clap::ValueEnum;
use rand::prelude::*;

/// Image content produced by the synthetic source
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Uniform noise in [0, 255)
    Noise,
    /// Diagonal ramp that drifts one pixel per frame
    Gradient,
    /// A bright disk wandering over a dim noisy background
    Blob,
}

impl Pattern {
    /// Render one interleaved `height x width x components` buffer
    pub fn render<R: Rng>(
        &self,
        rng: &mut R,
        width: usize,
        height: usize,
        components: usize,
        tick: u64,
    ) -> Vec<f32> {
        let mut data = Vec::with_capacity(width * height * components);

        match self {
            Pattern::Noise => {
                for _ in 0..width * height * components {
                    data.push(rng.gen_range(0.0..255.0));
                }
            }
            Pattern::Gradient => {
                let period = (width + height).max(1);
                for y in 0..height {
                    for x in 0..width {
                        let step = (x + y + tick as usize) % period;
                        let value = 255.0 * step as f32 / period as f32;
                        data.extend(std::iter::repeat(value).take(components));
                    }
                }
            }
            Pattern::Blob => {
                let cx = rng.gen_range(0.25..0.75) * width as f32;
                let cy = rng.gen_range(0.25..0.75) * height as f32;
                let radius = width.min(height) as f32 / 6.0;
                for y in 0..height {
                    for x in 0..width {
                        let dx = x as f32 - cx;
                        let dy = y as f32 - cy;
                        let inside = dx * dx + dy * dy <= radius * radius;
                        for _ in 0..components {
                            let base = rng.gen_range(0.0..20.0);
                            data.push(if inside { base + 200.0 } else { base });
                        }
                    }
                }
            }
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn test_render_lengths() {
        let mut rng = StdRng::seed_from_u64(7);
        for pattern in [Pattern::Noise, Pattern::Gradient, Pattern::Blob] {
            assert_eq!(pattern.render(&mut rng, 12, 8, 3, 0).len(), 12 * 8 * 3);
        }
    }

    #[test]
    fn test_gradient_drifts() {
        let mut rng = StdRng::seed_from_u64(7);
        let first = Pattern::Gradient.render(&mut rng, 4, 4, 1, 0);
        let second = Pattern::Gradient.render(&mut rng, 4, 4, 1, 1);
        assert_ne!(first, second);
        assert_eq!(first[1], second[0]);
    }
}
