//! Query coordinates with zero defaults for omitted trailing axes.

/// A point in histogram coordinate space.
///
/// Conversions fill omitted trailing coordinates with zero, so `2.0`,
/// `(2.0, 0.0)` and `(2.0, 0.0, 0.0)` are the same point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coords {
    /// First coordinate.
    pub x: f64,
    /// Second coordinate.
    pub y: f64,
    /// Third coordinate.
    pub z: f64,
}

impl Coords {
    /// Point from all three coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<f64> for Coords {
    fn from(x: f64) -> Self {
        Self::new(x, 0.0, 0.0)
    }
}

impl From<(f64, f64)> for Coords {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y, 0.0)
    }
}

impl From<(f64, f64, f64)> for Coords {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self::new(x, y, z)
    }
}

impl From<[f64; 1]> for Coords {
    fn from([x]: [f64; 1]) -> Self {
        Self::from(x)
    }
}

impl From<[f64; 2]> for Coords {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::from((x, y))
    }
}

impl From<[f64; 3]> for Coords {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_coordinates_default_to_zero() {
        assert_eq!(Coords::from(1.5), Coords::new(1.5, 0.0, 0.0));
        assert_eq!(Coords::from((1.5, 2.5)), Coords::new(1.5, 2.5, 0.0));
        assert_eq!(Coords::from([1.5]), Coords::from(1.5));
        assert_eq!(Coords::from([1.5, 2.5]), Coords::from((1.5, 2.5)));
        assert_eq!(Coords::from([1.0, 2.0, 3.0]), Coords::from((1.0, 2.0, 3.0)));
        assert_eq!(Coords::default(), Coords::from(0.0));
    }
}
