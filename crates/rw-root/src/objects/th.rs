//! TH1/TH2/TH3 deserialization (D and F storage) and TH*D serialization.
//!
//! ROOT histogram serialization layout (simplified):
//! ```text
//! TH{1,2,3}{D,F}
//!   ├─ TH2 / TH3 wrapper (only for 2D/3D; extra sums, TAtt3D for TH3)
//!   │    └─ TH1 (base)
//!   │         ├─ TNamed (name, title)
//!   │         ├─ TAttLine, TAttFill, TAttMarker (skipped via byte count)
//!   │         ├─ fNcells (i32)
//!   │         ├─ fXaxis, fYaxis, fZaxis (TAxis)
//!   │         ├─ scalar stats (fBarOffset, fBarWidth, fEntries, fTsumw, ...)
//!   │         ├─ fContour, fSumw2 (TArrayD)
//!   │         ├─ fOption (TString), fFunctions (TList, skipped)
//!   │         └─ fBufferSize, fBinStatErrOpt, fStatOverflows (version-dependent)
//!   └─ TArrayD / TArrayF (cell contents, fNcells entries)
//! ```

use crate::error::{Result, RootError};
use crate::histogram::{Axis, Histogram};
use crate::rbuffer::RBuffer;
use crate::wbuffer::WBuffer;

const TH1_VERSION: u16 = 8;
const TH2_VERSION: u16 = 5;
const TH3_VERSION: u16 = 6;
const THND_VERSION: u16 = 4;
const TAXIS_VERSION: u16 = 10;

/// Storage type of the cell array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
    F32,
    F64,
}

/// Dimension and storage for a supported class name.
fn classify(class_name: &str) -> Option<(usize, Storage)> {
    match class_name {
        "TH1D" => Some((1, Storage::F64)),
        "TH1F" => Some((1, Storage::F32)),
        "TH2D" => Some((2, Storage::F64)),
        "TH2F" => Some((2, Storage::F32)),
        "TH3D" => Some((3, Storage::F64)),
        "TH3F" => Some((3, Storage::F32)),
        _ => None,
    }
}

/// Whether `class_name` is a histogram class this crate can read.
pub fn is_supported(class_name: &str) -> bool {
    classify(class_name).is_some()
}

/// Read a histogram of class `class_name` from decompressed object bytes.
pub fn read(data: &[u8], class_name: &str) -> Result<Histogram> {
    let (dim, storage) =
        classify(class_name).ok_or_else(|| RootError::UnsupportedClass(class_name.to_string()))?;
    let mut r = RBuffer::new(data);

    let outer = r.read_object_header()?;
    if outer.version < 1 {
        return Err(RootError::Deserialization(format!(
            "unsupported {} version: {}",
            class_name, outer.version
        )));
    }

    let base = match dim {
        1 => read_th1_base(&mut r)?,
        _ => read_thn_wrapper(&mut r, dim)?,
    };

    let arr_n = r.read_u32()? as usize;
    if arr_n != base.n_cells {
        return Err(RootError::Deserialization(format!(
            "{} array size {} != fNcells {}",
            class_name, arr_n, base.n_cells
        )));
    }
    let contents = match storage {
        Storage::F64 => r.read_f64s(arr_n)?,
        Storage::F32 => r.read_f32s_widened(arr_n)?,
    };

    let axes = base
        .axes
        .into_iter()
        .take(dim)
        .map(|a| Axis::from_stored(a.n_bins, a.x_min, a.x_max, a.bin_edges))
        .collect::<Result<Vec<_>>>()?;

    Histogram::from_parts(
        base.name,
        base.title,
        axes,
        contents,
        base.sumw2,
        base.entries,
    )
}

/// Axis info extracted from TAxis.
struct AxisInfo {
    n_bins: i32,
    x_min: f64,
    x_max: f64,
    /// Variable-width bin edges (empty for uniform binning).
    bin_edges: Vec<f64>,
}

/// Fields of the TH1 base class this crate keeps.
struct Th1Base {
    name: String,
    title: String,
    n_cells: usize,
    axes: [AxisInfo; 3],
    sumw2: Option<Vec<f64>>,
    entries: f64,
}

/// Read the TH2 or TH3 wrapper around the TH1 base.
fn read_thn_wrapper(r: &mut RBuffer, dim: usize) -> Result<Th1Base> {
    let wrapper = r.read_object_header()?;
    let base = read_th1_base(r)?;
    match wrapper.end {
        Some(_) => r.close_object(&wrapper)?,
        // fScalefactor, fTsumwy, fTsumwy2, fTsumwxy
        None if dim == 2 => r.skip(4 * 8)?,
        None => {
            // TAtt3D, then fTsumwy .. fTsumwyz
            r.skip_object()?;
            r.skip(7 * 8)?;
        }
    }
    Ok(base)
}

/// Read the TH1 base class.
fn read_th1_base(r: &mut RBuffer) -> Result<Th1Base> {
    let th1 = r.read_object_header()?;
    let th1_ver = th1.version;

    let (name, title) = r.read_tnamed()?;

    // TAttLine, TAttFill, TAttMarker
    for _ in 0..3 {
        r.skip_object()?;
    }

    let n_cells = r.read_i32()?;
    let n_cells = usize::try_from(n_cells)
        .map_err(|_| RootError::Deserialization(format!("negative fNcells {}", n_cells)))?;

    let axes = [read_taxis(r)?, read_taxis(r)?, read_taxis(r)?];

    let _bar_offset = r.read_i16()?;
    let _bar_width = r.read_i16()?;
    let entries = r.read_f64()?;
    // fTsumw, fTsumw2, fTsumwx, fTsumwx2
    r.skip(4 * 8)?;
    if th1_ver >= 2 {
        // fMaximum, fMinimum
        r.skip(2 * 8)?;
    }
    if th1_ver >= 3 {
        // fNormFactor
        r.skip(8)?;
    }

    // fContour (TArrayD)
    let contour_n = r.read_u32()? as usize;
    r.skip(contour_n.saturating_mul(8))?;

    // fSumw2 (TArrayD)
    let sumw2_n = r.read_u32()? as usize;
    let sumw2 = match sumw2_n {
        0 => None,
        n => Some(r.read_f64s(n)?),
    };

    let _option = r.read_string()?;

    // fFunctions (TList)
    r.skip_object()?;

    if th1_ver >= 4 {
        let buf_size = r.read_i32()?;
        if buf_size > 0 {
            r.skip(buf_size as usize * 8)?;
        }
    }
    if th1_ver >= 7 {
        let _err_opt = r.read_i32()?;
    }
    if th1_ver >= 8 {
        let _stat_overflows = r.read_i32()?;
    }

    // Anything newer versions append is skipped via the byte count.
    r.close_object(&th1)?;

    Ok(Th1Base {
        name,
        title,
        n_cells,
        axes,
        sumw2,
        entries,
    })
}

/// Read a TAxis.
fn read_taxis(r: &mut RBuffer) -> Result<AxisInfo> {
    let axis = r.read_object_header()?;
    if axis.end.is_none() {
        return Err(RootError::Deserialization(
            "TAxis without byte count".into(),
        ));
    }

    let (_name, _title) = r.read_tnamed()?;

    // TAttAxis
    r.skip_object()?;

    let n_bins = r.read_i32()?;
    let x_min = r.read_f64()?;
    let x_max = r.read_f64()?;

    // fXbins (TArrayD)
    let xbins_n = r.read_u32()? as usize;
    let bin_edges = r.read_f64s(xbins_n)?;

    // fFirst, fLast, fBits2, fTimeDisplay, fTimeFormat, fLabels, fModLabs
    r.close_object(&axis)?;

    Ok(AxisInfo {
        n_bins,
        x_min,
        x_max,
        bin_edges,
    })
}

// ── serialization ──────────────────────────────────────────────

/// ROOT class name used when writing `h`.
pub fn class_name_for(h: &Histogram) -> &'static str {
    match h.dimension() {
        1 => "TH1D",
        2 => "TH2D",
        _ => "TH3D",
    }
}

/// Serialize `h` as a TH1D/TH2D/TH3D object payload.
pub fn write(h: &Histogram) -> Vec<u8> {
    let mut w = WBuffer::new();
    w.write_versioned(THND_VERSION, |w| {
        match h.dimension() {
            1 => write_th1_base(w, h),
            2 => w.write_versioned(TH2_VERSION, |w| {
                write_th1_base(w, h);
                // fScalefactor, fTsumwy, fTsumwy2, fTsumwxy
                w.write_f64(1.0);
                for _ in 0..3 {
                    w.write_f64(0.0);
                }
            }),
            _ => w.write_versioned(TH3_VERSION, |w| {
                write_th1_base(w, h);
                // TAtt3D has no members
                w.write_versioned(1, |_| {});
                for _ in 0..7 {
                    w.write_f64(0.0);
                }
            }),
        }
        w.write_array_f64(h.contents());
    });
    w.into_inner()
}

fn write_th1_base(w: &mut WBuffer, h: &Histogram) {
    w.write_versioned(TH1_VERSION, |w| {
        w.write_tnamed(h.name(), h.title());
        // TAttLine: color, style, width
        w.write_versioned(2, |w| {
            w.write_i16(602);
            w.write_i16(1);
            w.write_i16(1);
        });
        // TAttFill: color, style
        w.write_versioned(2, |w| {
            w.write_i16(0);
            w.write_i16(1001);
        });
        // TAttMarker: color, style, size
        w.write_versioned(2, |w| {
            w.write_i16(1);
            w.write_i16(1);
            w.write_f32(1.0);
        });

        w.write_i32(h.n_cells() as i32);

        for (i, axis_name) in ["xaxis", "yaxis", "zaxis"].into_iter().enumerate() {
            match h.axes().get(i) {
                Some(a) => write_taxis(
                    w,
                    axis_name,
                    a.n_bins(),
                    a.min(),
                    a.max(),
                    a.stored_edges(),
                ),
                // unused axes are one bin on [0, 1), as ROOT writes them
                None => write_taxis(w, axis_name, 1, 0.0, 1.0, &[]),
            }
        }

        // fBarOffset, fBarWidth
        w.write_i16(0);
        w.write_i16(1000);
        w.write_f64(h.entries());
        let tsumw: f64 = h.contents().iter().sum();
        w.write_f64(tsumw);
        // fTsumw2, fTsumwx, fTsumwx2
        for _ in 0..3 {
            w.write_f64(0.0);
        }
        // fMaximum, fMinimum
        w.write_f64(-1111.0);
        w.write_f64(-1111.0);
        // fNormFactor
        w.write_f64(0.0);

        // fContour
        w.write_array_f64(&[]);
        w.write_array_f64(h.sumw2().unwrap_or(&[]));
        // fOption
        w.write_string("");
        // fFunctions: empty TList
        w.write_versioned(5, |w| {
            w.write_tobject();
            w.write_string("");
            w.write_i32(0);
        });
        // fBufferSize, fBinStatErrOpt, fStatOverflows
        w.write_i32(0);
        w.write_i32(0);
        w.write_i32(2);
    });
}

fn write_taxis(
    w: &mut WBuffer,
    name: &str,
    n_bins: usize,
    min: f64,
    max: f64,
    edges: &[f64],
) {
    w.write_versioned(TAXIS_VERSION, |w| {
        w.write_tnamed(name, "");
        // TAttAxis
        w.write_versioned(4, |w| {
            w.write_i32(510);
            w.write_i16(1);
            w.write_i16(1);
            w.write_i16(42);
            for v in [0.005f32, 0.035, 0.03, 1.0, 0.035] {
                w.write_f32(v);
            }
            w.write_i16(1);
            w.write_i16(42);
        });
        w.write_i32(n_bins as i32);
        w.write_f64(min);
        w.write_f64(max);
        w.write_array_f64(edges);
        // fFirst, fLast, fBits2, fTimeDisplay, fTimeFormat
        w.write_i32(0);
        w.write_i32(0);
        w.write_u16(0);
        w.write_u8(0);
        w.write_string("");
        // fLabels, fModLabs (null pointers)
        w.write_u32(0);
        w.write_u32(0);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio_2d() -> Histogram {
        let mut h = Histogram::new_2d(
            "ratio2d",
            Axis::uniform(2, 0.0, 2.0).unwrap(),
            Axis::variable(vec![0.0, 1.0, 3.0]).unwrap(),
        )
        .with_title("data / MC");
        h.set_content_at(0.5, 0.5, 0.0, 1.5);
        h.set_content_at(1.5, 2.0, 0.0, 0.75);
        h.set_content_at(5.0, 5.0, 0.0, 9.0);
        h.set_entries(3.0);
        h
    }

    #[test]
    fn th2d_payload_reads_back() {
        let h = ratio_2d();
        let payload = write(&h);
        let back = read(&payload, class_name_for(&h)).unwrap();

        assert_eq!(back.name(), "ratio2d");
        assert_eq!(back.title(), "data / MC");
        assert_eq!(back.dimension(), 2);
        assert_eq!(back.entries(), 3.0);
        assert_eq!(back.axes(), h.axes());
        assert_eq!(back.contents(), h.contents());
        assert_eq!(back.content_at(0.5, 0.5, 0.0), 1.5);
        assert_eq!(back.content_at(1.2, 1.1, 0.0), 0.75);
        assert_eq!(back.content_at(10.0, 10.0, 0.0), 9.0);
    }

    #[test]
    fn th3d_payload_reads_back() {
        let mut h = Histogram::new_3d(
            "eff3d",
            Axis::uniform(2, 0.0, 1.0).unwrap(),
            Axis::uniform(3, -1.0, 1.0).unwrap(),
            Axis::variable(vec![0.0, 10.0, 100.0]).unwrap(),
        );
        h.set_content_at(0.25, 0.0, 50.0, 0.5);
        let back = read(&write(&h), "TH3D").unwrap();
        assert_eq!(back.dimension(), 3);
        assert_eq!(back.content_at(0.25, 0.0, 50.0), 0.5);
        assert_eq!(back.z_axis().map(Axis::is_variable), Some(true));
    }

    #[test]
    fn th1f_contents_widen_to_f64() {
        // Patch a TH1D payload into TH1F storage by rewriting the cell array.
        let mut h = Histogram::new_1d("h", Axis::uniform(2, 0.0, 2.0).unwrap());
        h.set_bin_content(1, 0.25).unwrap();
        let payload = write(&h);
        let cells = h.n_cells();
        let arr_start = payload.len() - cells * 8;

        let mut f = payload[..arr_start].to_vec();
        for v in h.contents() {
            f.extend_from_slice(&(*v as f32).to_be_bytes());
        }
        // outer byte count shrinks by 4 bytes per cell
        let raw = u32::from_be_bytes([f[0], f[1], f[2], f[3]]) - (cells as u32) * 4;
        f[0..4].copy_from_slice(&raw.to_be_bytes());

        let back = read(&f, "TH1F").unwrap();
        assert_eq!(back.bin_content(1), 0.25);
    }

    #[test]
    fn unsupported_class() {
        assert!(matches!(
            read(&[], "TProfile"),
            Err(RootError::UnsupportedClass(c)) if c == "TProfile"
        ));
        assert!(!is_supported("TTree"));
        assert!(is_supported("TH2F"));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let payload = write(&ratio_2d());
        let cut = &payload[..payload.len() / 2];
        assert!(read(cut, "TH2D").is_err());
    }
}
