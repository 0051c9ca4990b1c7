//! Value ranges used to normalize weights and activations before coloring.

use serde::{Deserialize, Serialize};

use crate::error::{ExtentError, ExtentResult};
use crate::model::{InputLink, Tensor};

/// Closed `[min, max]` interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min: f32,
    pub max: f32,
}

impl Extent {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn point(value: f32) -> Self {
        Self::new(value, value)
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Width of the zero-centered interval covering this extent. Diverging
    /// scales are fed this as `range`.
    pub fn symmetric_range(&self) -> f32 {
        2.0 * self.min.abs().max(self.max.abs())
    }

    pub fn include(self, value: f32) -> Self {
        Self::new(self.min.min(value), self.max.max(value))
    }

    pub fn union(self, other: Extent) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }
}

impl From<Extent> for [f32; 2] {
    fn from(extent: Extent) -> Self {
        [extent.min, extent.max]
    }
}

/// Compute the `[min, max]` of a scalar, vector or matrix.
///
/// A scalar, or a vector holding a single element, is its own range.
pub fn extent(values: &Tensor) -> ExtentResult<Extent> {
    match values {
        Tensor::Scalar(v) => Ok(Extent::point(*v)),
        Tensor::Vector(cells) => scan(cells.iter().copied()).ok_or_else(|| shape("empty vector")),
        Tensor::Matrix(rows) => {
            let width = rows.first().map_or(0, Vec::len);
            if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
                return Err(shape(&format!(
                    "row {i} has {} cells, expected {width}",
                    row.len()
                )));
            }
            scan(rows.iter().flatten().copied()).ok_or_else(|| shape("empty matrix"))
        }
    }
}

/// Weight range over a set of links, `None` when there are none.
pub fn extent_of_links(links: &[InputLink]) -> Option<Extent> {
    scan(links.iter().map(|link| link.weight))
}

fn scan(mut values: impl Iterator<Item = f32>) -> Option<Extent> {
    let first = values.next()?;
    Some(values.fold(Extent::point(first), Extent::include))
}

fn shape(reason: &str) -> ExtentError {
    ExtentError::ShapeMismatch {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_and_single_element_are_their_own_range() {
        assert_eq!(extent(&Tensor::Scalar(5.0)).unwrap(), Extent::point(5.0));
        assert_eq!(extent(&Tensor::Vector(vec![5.0])).unwrap(), Extent::point(5.0));
    }

    #[test]
    fn vector_scan() {
        let e = extent(&Tensor::Vector(vec![3.0, -2.0, 7.0, 0.0])).unwrap();
        assert_eq!(<[f32; 2]>::from(e), [-2.0, 7.0]);
    }

    #[test]
    fn descending_vector_keeps_first_as_max() {
        let e = extent(&Tensor::Vector(vec![3.0, 2.0, 1.0])).unwrap();
        assert_eq!(e, Extent::new(1.0, 3.0));
    }

    #[test]
    fn matrix_scans_every_cell() {
        let m = Tensor::Matrix(vec![vec![1.0, 2.0], vec![3.0, -4.0]]);
        assert_eq!(extent(&m).unwrap(), Extent::new(-4.0, 3.0));

        // a single row is scanned, not aliased to a scalar
        let row = Tensor::Matrix(vec![vec![0.5, -0.5]]);
        assert_eq!(extent(&row).unwrap(), Extent::new(-0.5, 0.5));
    }

    #[test]
    fn ragged_and_empty_are_shape_errors() {
        let ragged = Tensor::Matrix(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(extent(&ragged), Err(ExtentError::ShapeMismatch { .. })));
        assert!(extent(&Tensor::Vector(vec![])).is_err());
        assert!(extent(&Tensor::Matrix(vec![])).is_err());
        assert!(extent(&Tensor::Matrix(vec![vec![], vec![]])).is_err());
    }

    #[test]
    fn ranges() {
        let e = Extent::new(-0.25, 0.75);
        assert_eq!(e.span(), 1.0);
        assert_eq!(e.symmetric_range(), 1.5);
        assert_eq!(e.union(Extent::point(-2.0)), Extent::new(-2.0, 0.75));
    }

    #[test]
    fn link_weights() {
        let links = [InputLink::new(0, 0.2), InputLink::new(1, -0.4)];
        assert_eq!(extent_of_links(&links), Some(Extent::new(-0.4, 0.2)));
        assert_eq!(extent_of_links(&[]), None);
    }
}
