use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors raised when scan grids do not line up.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid '{name}' has shape {got}, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: GridShape,
        got: GridShape,
    },
    #[error("grid '{name}' row {row} has {got} columns, expected {expected}")]
    Ragged {
        name: String,
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("grid data length {got} does not match shape {shape}")]
    DataLength { shape: GridShape, got: usize },
}

/// Number of rows and columns of a rectangular scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl GridShape {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row/column of a 0-based row-major index.
    #[inline]
    pub fn coords_of(&self, index: usize) -> Option<GridCoords> {
        if index >= self.len() {
            return None;
        }
        Some(GridCoords {
            row: index / self.cols,
            col: index % self.cols,
        })
    }

    /// Row/column of a 1-based scan index as used by listings and reports.
    #[inline]
    pub fn coords_of_source_index(&self, source_index: usize) -> Option<GridCoords> {
        source_index.checked_sub(1).and_then(|i| self.coords_of(i))
    }

    /// 0-based row-major index of `coords`.
    #[inline]
    pub fn index_of(&self, coords: GridCoords) -> Option<usize> {
        (coords.row < self.rows && coords.col < self.cols)
            .then(|| coords.row * self.cols + coords.col)
    }

    /// Fail with [`GridError::ShapeMismatch`] unless `other` equals `self`.
    pub fn ensure_matches(&self, name: &str, other: GridShape) -> Result<(), GridError> {
        if *self == other {
            Ok(())
        } else {
            Err(GridError::ShapeMismatch {
                name: name.to_string(),
                expected: *self,
                got: other,
            })
        }
    }
}

/// 0-based grid position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoords {
    pub row: usize,
    pub col: usize,
}

/// Row-major 2-D array.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    shape: GridShape,
    data: Vec<T>, // row-major, len = rows * cols
}

impl<T> Grid<T> {
    pub fn from_vec(shape: GridShape, data: Vec<T>) -> Result<Self, GridError> {
        if data.len() != shape.len() {
            return Err(GridError::DataLength {
                shape,
                got: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Build from nested rows; every row must have the width of the first.
    pub fn from_rows(name: &str, rows: Vec<Vec<T>>) -> Result<Self, GridError> {
        let cols = rows.first().map_or(0, Vec::len);
        let shape = GridShape::new(rows.len(), cols);
        let mut data = Vec::with_capacity(shape.len());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != cols {
                return Err(GridError::Ragged {
                    name: name.to_string(),
                    row,
                    expected: cols,
                    got: values.len(),
                });
            }
            data.extend(values);
        }
        Ok(Self { shape, data })
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    #[inline]
    pub fn get(&self, coords: GridCoords) -> Option<&T> {
        self.shape.index_of(coords).map(|i| &self.data[i])
    }

    #[inline]
    pub fn get_flat(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            shape: self.shape,
            data: self.data.iter().map(f).collect(),
        }
    }
}
