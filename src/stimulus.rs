use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{BatteryError, Result};

/// Largest footprint a stimulus may occupy on screen. Oversized images are
/// shrunk by repeated 10% steps so the aspect ratio is kept.
pub const MAX_STIMULUS_WIDTH: f32 = 650.0;
pub const MAX_STIMULUS_HEIGHT: f32 = 300.0;

/// Index into the library's asset pool. Stable for the whole session.
pub type StimulusIndex = usize;

/// A randomly drawn stimulus pair: one tagged correct, one incorrect,
/// always distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StimulusPair {
    pub correct: StimulusIndex,
    pub incorrect: StimulusIndex,
}

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    /// File stem, used in result-log lines.
    label: String,
}

/// The pool of stimulus image assets for the choice tasks. Image files are
/// treated as opaque identifiers; dimensions are decoded lazily on first use
/// and a decode failure is fatal.
#[derive(Debug)]
pub struct StimulusLibrary {
    dir: PathBuf,
    entries: Vec<Entry>,
    dimensions: HashMap<StimulusIndex, (f32, f32)>,
}

impl StimulusLibrary {
    /// Lists the asset directory once at startup. Entries are sorted so
    /// indices are reproducible across runs.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for item in std::fs::read_dir(dir)? {
            let path = item?.path();
            if !path.is_file() {
                continue;
            }
            let label = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push(Entry { path, label });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self {
            dir: dir.to_owned(),
            entries,
            dimensions: HashMap::new(),
        })
    }

    /// Test constructor with pre-known dimensions, bypassing decode.
    #[cfg(test)]
    pub fn from_entries(entries: Vec<(&str, f32, f32)>) -> Self {
        let mut dimensions = HashMap::new();
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(i, (label, w, h))| {
                dimensions.insert(i, (w, h));
                Entry {
                    path: PathBuf::from(format!("{label}.bmp")),
                    label: label.to_owned(),
                }
            })
            .collect();
        Self {
            dir: PathBuf::from("stimuli"),
            entries,
            dimensions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Choice tasks draw distinct pairs by rejection sampling; with fewer
    /// than two assets that would never terminate, so it is refused up front.
    pub fn require_pair_capable(&self) -> Result<()> {
        if self.entries.len() < 2 {
            return Err(BatteryError::StimulusPoolTooSmall {
                dir: self.dir.clone(),
                count: self.entries.len(),
            });
        }
        Ok(())
    }

    pub fn label(&self, index: StimulusIndex) -> &str {
        &self.entries[index].label
    }

    pub fn path(&self, index: StimulusIndex) -> &Path {
        &self.entries[index].path
    }

    /// On-screen size of the asset, fitted under the stimulus footprint.
    /// First use decodes the image header; failure aborts the session.
    pub fn fitted_size(&mut self, index: StimulusIndex) -> Result<(f32, f32)> {
        if let Some(&dims) = self.dimensions.get(&index) {
            return Ok(fit(dims));
        }
        let path = &self.entries[index].path;
        let (w, h) = image::image_dimensions(path).map_err(|source| {
            BatteryError::InvalidAssetReference {
                path: path.clone(),
                source,
            }
        })?;
        let dims = (w as f32, h as f32);
        self.dimensions.insert(index, dims);
        Ok(fit(dims))
    }

    pub fn draw(&self, rng: &mut StdRng) -> StimulusIndex {
        rng.random_range(0..self.entries.len())
    }

    /// Re-draws until the result differs from `other`.
    pub fn draw_distinct_from(&self, rng: &mut StdRng, other: StimulusIndex) -> StimulusIndex {
        let mut pick = self.draw(rng);
        while pick == other {
            pick = self.draw(rng);
        }
        pick
    }

    pub fn draw_pair(&self, rng: &mut StdRng) -> StimulusPair {
        let correct = self.draw(rng);
        let incorrect = self.draw_distinct_from(rng, correct);
        StimulusPair { correct, incorrect }
    }
}

fn fit((mut w, mut h): (f32, f32)) -> (f32, f32) {
    while w > MAX_STIMULUS_WIDTH || h > MAX_STIMULUS_HEIGHT {
        w *= 0.9;
        h *= 0.9;
    }
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn library() -> StimulusLibrary {
        StimulusLibrary::from_entries(vec![
            ("apple", 120.0, 90.0),
            ("brick", 200.0, 200.0),
            ("cloud", 900.0, 280.0),
        ])
    }

    #[test]
    fn pairs_are_always_distinct() {
        let lib = library();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let pair = lib.draw_pair(&mut rng);
            assert_ne!(pair.correct, pair.incorrect);
        }
    }

    #[test]
    fn pool_of_one_is_a_config_error() {
        let lib = StimulusLibrary::from_entries(vec![("only", 64.0, 64.0)]);
        assert!(matches!(
            lib.require_pair_capable(),
            Err(BatteryError::StimulusPoolTooSmall { count: 1, .. })
        ));
        assert!(library().require_pair_capable().is_ok());
    }

    #[test]
    fn oversized_assets_are_fitted() {
        let mut lib = library();
        let (w, h) = lib.fitted_size(2).unwrap();
        assert!(w <= MAX_STIMULUS_WIDTH && h <= MAX_STIMULUS_HEIGHT);
        // Aspect ratio preserved.
        assert!((w / h - 900.0 / 280.0).abs() < 1e-3);

        let (w, h) = lib.fitted_size(0).unwrap();
        assert_eq!((w, h), (120.0, 90.0));
    }
}
