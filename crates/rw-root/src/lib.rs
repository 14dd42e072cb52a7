//! # rw-root
//!
//! Native ROOT file reader for weight histograms.
//!
//! Reads TH1/TH2/TH3 histograms (double and float storage) from `.root`
//! files without requiring Python or external ROOT libraries, and maps
//! coordinates to bins with ROOT's fixed bin-finding rules. Supports zlib,
//! LZ4, ZSTD, and XZ compressed records and nested directories. A minimal
//! writer produces files holding TH*D histograms.
//!
//! ## Example
//!
//! ```no_run
//! use rw_root::RootFile;
//!
//! let f = RootFile::open("weights.root").unwrap();
//! for key in f.list_keys().unwrap() {
//!     println!("{} ({})", key.name, key.class_name);
//! }
//! let h = f.get_histogram("pileup/ratio").unwrap();
//! println!("dim: {}, cells: {}", h.dimension(), h.n_cells());
//! println!("w(25) = {}", h.content_at(25.0, 0.0, 0.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod datasource;
pub mod directory;
pub mod error;
pub mod file;
pub mod histogram;
pub mod key;
pub mod objects;
pub mod rbuffer;
pub mod wbuffer;
pub mod writer;

pub use compression::Compression;
pub use datasource::ReadMode;
pub use error::{Result, RootError};
pub use file::RootFile;
pub use histogram::{Axis, Histogram};
pub use key::KeyInfo;
pub use writer::RootWriter;
