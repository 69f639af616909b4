use super::*;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Normalized single-channel images held in memory.
#[derive(Debug, Clone)]
pub struct Images {
    pixels: Vec<f32>,
    labels: Vec<u8>,
    width: usize,
}

impl Images {
    /// Build from raw 0..=255 intensities, normalizing each pixel.
    /// Callers guarantee one `width`-long row per label.
    pub(crate) fn from_raw(raw: &[u8], labels: Vec<u8>, width: usize) -> Self {
        debug_assert_eq!(raw.len(), labels.len() * width);
        Self {
            pixels: raw.iter().map(|b| Self::normalize(*b)).collect(),
            labels,
            width,
        }
    }

    /// Seeded stand-in for MNIST with the same geometry.
    ///
    /// Every class owns a fixed random stroke mask; a sample is its class
    /// mask with a fraction of pixels flipped. The same seed always
    /// produces the same images in the same order.
    pub fn synthetic(n: usize, seed: u64) -> Self {
        let ref mut rng = SmallRng::seed_from_u64(seed);
        let masks = (0..crate::CLASSES)
            .map(|_| {
                (0..crate::PIXELS)
                    .map(|_| rng.random_bool(0.25))
                    .collect::<Vec<bool>>()
            })
            .collect::<Vec<_>>();
        let labels = (0..n)
            .map(|_| rng.random_range(0..crate::CLASSES) as u8)
            .collect::<Vec<u8>>();
        let raw = labels
            .iter()
            .flat_map(|label| masks[*label as usize].iter())
            .map(|lit| *lit ^ rng.random_bool(0.1))
            .map(|lit| if lit { 255u8 } else { 0u8 })
            .collect::<Vec<u8>>();
        Self::from_raw(&raw, labels, crate::PIXELS)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn normalize(byte: u8) -> f32 {
        (byte as f32 / 255.0 - crate::PIXEL_MEAN) / crate::PIXEL_STD
    }
}

impl Dataset for Images {
    fn len(&self) -> usize {
        self.labels.len()
    }
    fn get(&self, index: usize) -> Sample<'_> {
        Sample {
            pixels: &self.pixels[index * self.width..(index + 1) * self.width],
            label: self.labels[index] as usize,
        }
    }
}
