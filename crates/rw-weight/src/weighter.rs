//! Histogram-backed weight lookup.

use std::path::Path;
use std::sync::Arc;

use rw_root::{Histogram, ReadMode, RootError, RootFile};

use crate::coords::Coords;
use crate::error::{Result, WeightError};

/// Options for loading a weight histogram from a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// How the file's bytes are brought into memory while the histogram is
    /// extracted.
    pub read_mode: ReadMode,
}

impl LoadOptions {
    /// Read the whole file into memory instead of mapping it.
    pub fn buffered() -> Self {
        Self {
            read_mode: ReadMode::Buffered,
        }
    }
}

/// Maps a point in coordinate space to the content of the histogram bin
/// containing it.
///
/// A `Weighter` always holds a valid histogram. Cloning is cheap and the
/// clone shares the same histogram.
///
/// ```
/// use rw_root::{Axis, Histogram};
/// use rw_weight::Weighter;
///
/// let mut h = Histogram::new_2d(
///     "ratio2d",
///     Axis::uniform(2, 0.0, 2.0).unwrap(),
///     Axis::uniform(2, 0.0, 2.0).unwrap(),
/// );
/// h.set_content_at(0.5, 0.5, 0.0, 1.5);
///
/// let w = Weighter::from(h);
/// assert_eq!(w.weight((0.5, 0.5)), 1.5);
/// assert_eq!(w.eval(0.5, 0.5, 0.0), 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct Weighter {
    hist: Arc<Histogram>,
}

impl Weighter {
    /// Wrap a shared histogram. The histogram's data is not copied.
    pub fn new(hist: Arc<Histogram>) -> Self {
        Self { hist }
    }

    /// Load histogram `name` (a `dir/sub/name` path) from the ROOT file at `path`.
    pub fn from_file(path: impl AsRef<Path>, name: &str) -> Result<Self> {
        Self::from_file_with(path, name, &LoadOptions::default())
    }

    /// Like [`Weighter::from_file`], with explicit load options.
    ///
    /// Fails with [`WeightError::Open`] when the file cannot be opened or is
    /// not a ROOT file, with [`WeightError::MissingHistogram`] when `name` is
    /// absent, and with [`WeightError::Read`] when the object is not a
    /// readable histogram. The file is closed before this returns.
    pub fn from_file_with(path: impl AsRef<Path>, name: &str, opts: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let hist = {
            let file =
                RootFile::open_with(path, opts.read_mode).map_err(|source| WeightError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
            file.get_histogram(name).map_err(|source| match source {
                RootError::KeyNotFound(_) => WeightError::MissingHistogram {
                    path: path.to_path_buf(),
                    name: name.to_string(),
                },
                source => WeightError::Read {
                    path: path.to_path_buf(),
                    name: name.to_string(),
                    source,
                },
            })?
        };

        log::debug!(
            "loaded {}D weight histogram '{}' ({} cells) from {}",
            hist.dimension(),
            name,
            hist.n_cells(),
            path.display()
        );
        Ok(Self::new(Arc::new(hist)))
    }

    /// Weight at `(x, y, z)`: the content of the bin containing the point.
    ///
    /// Points outside the histogram range read the under/overflow bins.
    /// Coordinates beyond the histogram's dimension are ignored.
    #[inline]
    pub fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        self.hist.content_at(x, y, z)
    }

    /// Weight at a point given as `x`, `(x, y)`, `(x, y, z)` or an array;
    /// omitted trailing coordinates are zero.
    #[inline]
    pub fn weight(&self, at: impl Into<Coords>) -> f64 {
        let c = at.into();
        self.eval(c.x, c.y, c.z)
    }

    /// Weights for column-wise coordinates, in input order.
    ///
    /// Missing `ys`/`zs` columns are treated as zeros. Every present column
    /// must have the length of `xs`.
    pub fn weights(&self, xs: &[f64], ys: Option<&[f64]>, zs: Option<&[f64]>) -> Result<Vec<f64>> {
        for col in [ys, zs].into_iter().flatten() {
            if col.len() != xs.len() {
                return Err(WeightError::ColumnLength {
                    expected: xs.len(),
                    got: col.len(),
                });
            }
        }

        let at = |col: Option<&[f64]>, i: usize| col.map_or(0.0, |c| c[i]);
        Ok(xs
            .iter()
            .enumerate()
            .map(|(i, &x)| self.eval(x, at(ys, i), at(zs, i)))
            .collect())
    }

    /// The shared histogram.
    pub fn histogram(&self) -> &Arc<Histogram> {
        &self.hist
    }

    /// Number of histogram dimensions.
    pub fn dimension(&self) -> usize {
        self.hist.dimension()
    }

    /// Whether `self` and `other` read the same histogram instance.
    pub fn shares_histogram_with(&self, other: &Weighter) -> bool {
        Arc::ptr_eq(&self.hist, &other.hist)
    }
}

impl From<Arc<Histogram>> for Weighter {
    fn from(hist: Arc<Histogram>) -> Self {
        Self::new(hist)
    }
}

impl From<Histogram> for Weighter {
    fn from(hist: Histogram) -> Self {
        Self::new(Arc::new(hist))
    }
}
