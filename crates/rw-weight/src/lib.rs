//! # rw-weight
//!
//! Event re-weighting from pre-built histograms.
//!
//! A [`Weighter`] wraps a 1D, 2D or 3D histogram, either one already in
//! memory or one loaded by name from a ROOT file, and returns the content of
//! the bin containing a queried point. Typical uses are pileup, scale-factor
//! and efficiency maps applied to simulated events.
//!
//! ## Example
//!
//! ```no_run
//! use rw_weight::Weighter;
//!
//! let sf = Weighter::from_file("weights.root", "leptons/sf_pt_eta")?;
//! let w_event = sf.weight((42.0, -1.3));
//! # let _ = w_event;
//! # Ok::<(), rw_weight::WeightError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coords;
pub mod error;
pub mod weighter;

pub use coords::Coords;
pub use error::{Result, WeightError};
pub use weighter::{LoadOptions, Weighter};
