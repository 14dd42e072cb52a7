//! Histogram and axis types returned by `RootFile::get_histogram`.
//!
//! Cells are stored the way ROOT stores them: every axis carries an
//! underflow bin (0) and an overflow bin (`n_bins + 1`), and the global bin
//! index is
//!
//! ```text
//! bin = bx + (nx + 2) * (by + (ny + 2) * bz)
//! ```
//!
//! Coordinates are mapped to bins with *fixed* bin-finding: points outside
//! the axis range go to the under/overflow bin, the axis is never extended.

use crate::error::{Result, RootError};

/// One binned axis, uniform or with explicit edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    n_bins: usize,
    min: f64,
    max: f64,
    /// Variable bin edges (`n_bins + 1` values), `None` for uniform binning.
    edges: Option<Vec<f64>>,
}

impl Axis {
    /// Uniform axis with `n_bins` bins on `[min, max)`.
    pub fn uniform(n_bins: usize, min: f64, max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(RootError::InvalidBinning(
                "axis needs at least one bin".into(),
            ));
        }
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(RootError::InvalidBinning(format!(
                "axis range [{}, {}) is empty or not finite",
                min, max
            )));
        }
        Ok(Self {
            n_bins,
            min,
            max,
            edges: None,
        })
    }

    /// Axis with explicit, strictly increasing bin edges.
    pub fn variable(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(RootError::InvalidBinning(format!(
                "variable axis needs at least 2 edges, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(RootError::InvalidBinning("bin edges must be finite".into()));
        }
        if let Some(w) = edges.windows(2).find(|w| w[0] >= w[1]) {
            return Err(RootError::InvalidBinning(format!(
                "bin edges must be strictly increasing ({} >= {})",
                w[0], w[1]
            )));
        }
        let n_bins = edges.len() - 1;
        Ok(Self {
            n_bins,
            min: edges[0],
            max: edges[n_bins],
            edges: Some(edges),
        })
    }

    /// Build from TAxis fields as stored on disk: an empty edge array means
    /// uniform binning.
    pub(crate) fn from_stored(n_bins: i32, min: f64, max: f64, edges: Vec<f64>) -> Result<Self> {
        let n = usize::try_from(n_bins).map_err(|_| {
            RootError::InvalidBinning(format!("negative bin count {}", n_bins))
        })?;
        if edges.is_empty() {
            return Self::uniform(n, min, max);
        }
        if edges.len() != n + 1 {
            return Err(RootError::InvalidBinning(format!(
                "axis has {} bins but {} edges",
                n,
                edges.len()
            )));
        }
        Self::variable(edges)
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Lower edge of the first bin.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper edge of the last bin.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether the axis uses explicit bin edges.
    pub fn is_variable(&self) -> bool {
        self.edges.is_some()
    }

    /// Stored variable edges, empty for a uniform axis.
    pub fn stored_edges(&self) -> &[f64] {
        self.edges.as_deref().unwrap_or(&[])
    }

    /// All bin edges (length `n_bins + 1`).
    pub fn edges(&self) -> Vec<f64> {
        match &self.edges {
            Some(edges) => edges.clone(),
            None => {
                let width = (self.max - self.min) / self.n_bins as f64;
                (0..=self.n_bins).map(|i| self.min + i as f64 * width).collect()
            }
        }
    }

    /// Locate the bin containing `x` without extending the axis.
    ///
    /// Returns 0 below `min` and `n_bins + 1` at or above `max`; NaN lands in
    /// the overflow bin.
    pub fn find_fix_bin(&self, x: f64) -> usize {
        if x < self.min {
            return 0;
        }
        if !(x < self.max) {
            return self.n_bins + 1;
        }
        match &self.edges {
            None => {
                // multiply before dividing, as TAxis::FindFixBin does
                let n = self.n_bins as f64;
                let bin = 1 + (n * (x - self.min) / (self.max - self.min)) as usize;
                // rounding can push x just below max into n_bins + 1
                bin.min(self.n_bins)
            }
            // edges[0] <= x < edges[n], so the count is in 1..=n
            Some(edges) => edges.partition_point(|&e| e <= x),
        }
    }

    /// Number of cells including under/overflow.
    fn n_cells(&self) -> usize {
        self.n_bins + 2
    }
}

/// A 1D, 2D or 3D histogram with under/overflow cells.
#[derive(Debug, Clone)]
pub struct Histogram {
    name: String,
    title: String,
    axes: Vec<Axis>,
    /// Cell contents in global-bin order (length = `n_cells`).
    contents: Vec<f64>,
    sumw2: Option<Vec<f64>>,
    entries: f64,
}

impl Histogram {
    /// Empty histogram over the given axes (one to three).
    pub fn new(name: impl Into<String>, axes: Vec<Axis>) -> Result<Self> {
        let n_cells = cell_count(&axes)?;
        Ok(Self {
            name: name.into(),
            title: String::new(),
            axes,
            contents: vec![0.0; n_cells],
            sumw2: None,
            entries: 0.0,
        })
    }

    /// Empty 1D histogram.
    pub fn new_1d(name: impl Into<String>, x: Axis) -> Self {
        Self::with_axes(name.into(), vec![x])
    }

    /// Empty 2D histogram.
    pub fn new_2d(name: impl Into<String>, x: Axis, y: Axis) -> Self {
        Self::with_axes(name.into(), vec![x, y])
    }

    /// Empty 3D histogram.
    pub fn new_3d(name: impl Into<String>, x: Axis, y: Axis, z: Axis) -> Self {
        Self::with_axes(name.into(), vec![x, y, z])
    }

    fn with_axes(name: String, axes: Vec<Axis>) -> Self {
        let n_cells = axes.iter().map(Axis::n_cells).product();
        Self {
            name,
            title: String::new(),
            axes,
            contents: vec![0.0; n_cells],
            sumw2: None,
            entries: 0.0,
        }
    }

    /// Assemble a histogram from deserialized parts.
    pub fn from_parts(
        name: String,
        title: String,
        axes: Vec<Axis>,
        contents: Vec<f64>,
        sumw2: Option<Vec<f64>>,
        entries: f64,
    ) -> Result<Self> {
        let n_cells = cell_count(&axes)?;
        if contents.len() != n_cells {
            return Err(RootError::Deserialization(format!(
                "'{}': {} cell contents for {} cells",
                name,
                contents.len(),
                n_cells
            )));
        }
        let sumw2 = match sumw2 {
            Some(s) if s.len() != n_cells => {
                log::warn!(
                    "'{}': ignoring sumw2 of length {} (expected {})",
                    name,
                    s.len(),
                    n_cells
                );
                None
            }
            other => other,
        };
        Ok(Self {
            name,
            title,
            axes,
            contents,
            sumw2,
            entries,
        })
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Histogram title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of dimensions (1, 2 or 3).
    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// All axes, x first.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// The x axis.
    pub fn x_axis(&self) -> &Axis {
        &self.axes[0]
    }

    /// The y axis, if the histogram has one.
    pub fn y_axis(&self) -> Option<&Axis> {
        self.axes.get(1)
    }

    /// The z axis, if the histogram has one.
    pub fn z_axis(&self) -> Option<&Axis> {
        self.axes.get(2)
    }

    /// Number of cells including under/overflow.
    pub fn n_cells(&self) -> usize {
        self.contents.len()
    }

    /// Raw cell contents in global-bin order.
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    /// Per-cell sum of squared weights, if stored.
    pub fn sumw2(&self) -> Option<&[f64]> {
        self.sumw2.as_deref()
    }

    /// Stored number of entries.
    pub fn entries(&self) -> f64 {
        self.entries
    }

    /// Set the stored number of entries.
    pub fn set_entries(&mut self, entries: f64) {
        self.entries = entries;
    }

    /// Global bin from per-axis bins. Bins of axes the histogram lacks are ignored.
    pub fn bin(&self, bx: usize, by: usize, bz: usize) -> usize {
        match self.axes.as_slice() {
            [_] => bx,
            [x, _] => bx + x.n_cells() * by,
            [x, y, _] => bx + x.n_cells() * (by + y.n_cells() * bz),
            _ => unreachable!("histograms have one to three axes"),
        }
    }

    /// Global bin containing `(x, y, z)`, using fixed bin-finding per axis.
    /// Coordinates beyond the histogram's dimension are ignored.
    pub fn find_fix_bin(&self, x: f64, y: f64, z: f64) -> usize {
        let coords = [x, y, z];
        let mut per_axis = [0usize; 3];
        for (slot, (axis, &c)) in per_axis.iter_mut().zip(self.axes.iter().zip(coords.iter())) {
            *slot = axis.find_fix_bin(c);
        }
        self.bin(per_axis[0], per_axis[1], per_axis[2])
    }

    /// Content of a global bin. Out-of-range indices are clamped to the
    /// first or last cell.
    pub fn bin_content(&self, bin: usize) -> f64 {
        let last = self.contents.len() - 1;
        self.contents[bin.min(last)]
    }

    /// Content of the cell containing `(x, y, z)`.
    pub fn content_at(&self, x: f64, y: f64, z: f64) -> f64 {
        self.bin_content(self.find_fix_bin(x, y, z))
    }

    /// Overwrite the content of a global bin.
    pub fn set_bin_content(&mut self, bin: usize, value: f64) -> Result<()> {
        let n_cells = self.contents.len();
        let cell = self.contents.get_mut(bin).ok_or(RootError::BinOutOfRange { bin, n_cells })?;
        *cell = value;
        Ok(())
    }

    /// Overwrite the content of the cell containing `(x, y, z)`.
    pub fn set_content_at(&mut self, x: f64, y: f64, z: f64, value: f64) {
        let bin = self.find_fix_bin(x, y, z);
        self.contents[bin] = value;
    }
}

fn cell_count(axes: &[Axis]) -> Result<usize> {
    if axes.is_empty() || axes.len() > 3 {
        return Err(RootError::InvalidBinning(format!(
            "histograms have 1 to 3 axes, got {}",
            axes.len()
        )));
    }
    axes.iter().try_fold(1usize, |acc, a| {
        acc.checked_mul(a.n_cells())
            .ok_or_else(|| RootError::InvalidBinning("cell count overflows usize".into()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_axis_bins() {
        let a = Axis::uniform(10, 0.0, 10.0).unwrap();
        assert_eq!(a.find_fix_bin(-0.1), 0);
        assert_eq!(a.find_fix_bin(0.0), 1);
        assert_eq!(a.find_fix_bin(0.999), 1);
        assert_eq!(a.find_fix_bin(1.0), 2);
        assert_eq!(a.find_fix_bin(9.999_999), 10);
        assert_eq!(a.find_fix_bin(10.0), 11);
        assert_eq!(a.find_fix_bin(1e9), 11);
        assert_eq!(a.find_fix_bin(f64::NEG_INFINITY), 0);
        assert_eq!(a.find_fix_bin(f64::NAN), 11);
    }

    #[test]
    fn uniform_edges_open_their_bin() {
        for a in [
            Axis::uniform(5, 0.0, 3.0).unwrap(),
            Axis::uniform(5, -3.0, 3.0).unwrap(),
            Axis::uniform(99, 0.0, 9.9).unwrap(),
        ] {
            let edges = a.edges();
            for (k, &e) in edges[..a.n_bins()].iter().enumerate() {
                assert_eq!(a.find_fix_bin(e), k + 1, "edge {} of {:?}", e, a);
            }
        }

        // values where dividing first would round into the previous bin
        let cases = [
            ((5, 0.0, 3.0), 0.6, 2),
            ((5, 0.0, 3.0), 1.2, 3),
            ((5, 0.0, 3.0), 2.4, 5),
            ((5, -3.0, 3.0), -1.8, 2),
            ((5, -3.0, 3.0), 1.8, 5),
        ];
        for ((n, min, max), x, bin) in cases {
            let a = Axis::uniform(n, min, max).unwrap();
            assert_eq!(a.find_fix_bin(x), bin, "x = {} on {:?}", x, a);
        }

        let mut h = Histogram::new_1d("h", Axis::uniform(5, 0.0, 3.0).unwrap());
        h.set_bin_content(1, 1.0).unwrap();
        h.set_bin_content(2, 2.0).unwrap();
        assert_eq!(h.content_at(0.6, 0.0, 0.0), 2.0);
        assert_eq!(h.content_at(0.599, 0.0, 0.0), 1.0);
    }

    #[test]
    fn variable_axis_bins() {
        let a = Axis::variable(vec![0.0, 1.0, 5.0, 20.0]).unwrap();
        assert_eq!(a.n_bins(), 3);
        assert_eq!((a.min(), a.max()), (0.0, 20.0));
        assert_eq!(a.find_fix_bin(-1.0), 0);
        assert_eq!(a.find_fix_bin(0.0), 1);
        assert_eq!(a.find_fix_bin(1.0), 2);
        assert_eq!(a.find_fix_bin(4.99), 2);
        assert_eq!(a.find_fix_bin(5.0), 3);
        assert_eq!(a.find_fix_bin(20.0), 4);
    }

    #[test]
    fn axis_validation() {
        assert!(Axis::uniform(0, 0.0, 1.0).is_err());
        assert!(Axis::uniform(3, 1.0, 1.0).is_err());
        assert!(Axis::uniform(3, 0.0, f64::INFINITY).is_err());
        assert!(Axis::variable(vec![1.0]).is_err());
        assert!(Axis::variable(vec![0.0, 2.0, 2.0]).is_err());
        assert!(Axis::variable(vec![0.0, f64::NAN]).is_err());
        assert!(Axis::from_stored(3, 0.0, 1.0, vec![0.0, 1.0]).is_err());
        assert!(Axis::from_stored(-1, 0.0, 1.0, Vec::new()).is_err());
    }

    #[test]
    fn uniform_edges() {
        let a = Axis::uniform(4, 0.0, 2.0).unwrap();
        assert_eq!(a.edges(), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert!(a.stored_edges().is_empty());
    }

    #[test]
    fn global_bin_layout() {
        let h = Histogram::new_3d(
            "h",
            Axis::uniform(2, 0.0, 2.0).unwrap(),
            Axis::uniform(3, 0.0, 3.0).unwrap(),
            Axis::uniform(4, 0.0, 4.0).unwrap(),
        );
        assert_eq!(h.n_cells(), 4 * 5 * 6);
        assert_eq!(h.bin(1, 2, 3), 1 + 4 * (2 + 5 * 3));
        assert_eq!(h.find_fix_bin(0.5, 1.5, 2.5), h.bin(1, 2, 3));
        assert_eq!(h.find_fix_bin(-1.0, -1.0, -1.0), 0);
        assert_eq!(h.find_fix_bin(9.0, 9.0, 9.0), h.n_cells() - 1);
    }

    #[test]
    fn extra_coordinates_are_ignored() {
        let mut h = Histogram::new_1d("h", Axis::uniform(2, 0.0, 2.0).unwrap());
        h.set_content_at(1.5, 0.0, 0.0, 7.0);
        assert_eq!(h.content_at(1.5, 100.0, -100.0), 7.0);

        let mut h2 = Histogram::new_2d(
            "h2",
            Axis::uniform(2, 0.0, 2.0).unwrap(),
            Axis::uniform(2, 0.0, 2.0).unwrap(),
        );
        h2.set_content_at(0.5, 1.5, 0.0, 3.0);
        assert_eq!(h2.content_at(0.5, 1.5, 42.0), 3.0);
        assert_eq!(h2.dimension(), 2);
        assert!(h2.z_axis().is_none());
    }

    #[test]
    fn bin_content_clamps() {
        let mut h = Histogram::new_1d("h", Axis::uniform(2, 0.0, 2.0).unwrap());
        h.set_bin_content(3, 9.0).unwrap();
        assert_eq!(h.bin_content(3), 9.0);
        assert_eq!(h.bin_content(1000), 9.0);
        assert!(matches!(
            h.set_bin_content(4, 1.0),
            Err(RootError::BinOutOfRange { bin: 4, n_cells: 4 })
        ));
    }

    #[test]
    fn from_parts_checks_lengths() {
        let axes = vec![Axis::uniform(2, 0.0, 2.0).unwrap()];
        let short = vec![0.0; 3];
        let wrong = Histogram::from_parts("h".into(), "t".into(), axes.clone(), short, None, 0.0);
        assert!(wrong.is_err());
        let h = Histogram::from_parts(
            "h".into(),
            "t".into(),
            axes,
            vec![0.0, 1.0, 2.0, 0.0],
            Some(vec![1.0]),
            3.0,
        )
        .unwrap();
        assert!(h.sumw2().is_none());
        assert_eq!(h.title(), "t");
        assert_eq!(h.entries(), 3.0);
        assert!(Histogram::new("h", Vec::new()).is_err());
    }
}
