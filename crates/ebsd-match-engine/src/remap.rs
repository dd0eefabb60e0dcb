//! Grid position to physical file naming.

use std::fs;
use std::io;
use std::path::Path;

/// Physical file name of the reference pixel at (`grid_row`, `grid_col`).
///
/// Both coordinates are scaled by their axis step and `scale_factor`, then
/// rounded half-to-even.
pub fn physical_name(
    grid_row: usize,
    grid_col: usize,
    x_step: f64,
    y_step: f64,
    scale_factor: f64,
) -> String {
    let col_phys = (grid_col as f64 * x_step * scale_factor).round_ties_even() as i64;
    let row_phys = (grid_row as f64 * y_step * scale_factor).round_ties_even() as i64;
    format!("0th_x{col_phys}y{row_phys}.tif")
}

/// First `x<digits>y<digits>` pair in `name`.
pub fn parse_physical_coords(name: &str) -> Option<(i64, i64)> {
    let bytes = name.as_bytes();
    let digits_at = |start: usize| -> usize {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    for (i, &b) in bytes.iter().enumerate() {
        if b != b'x' {
            continue;
        }
        let x_len = digits_at(i + 1);
        if x_len == 0 {
            continue;
        }
        let y_pos = i + 1 + x_len;
        if bytes.get(y_pos) != Some(&b'y') {
            continue;
        }
        let y_len = digits_at(y_pos + 1);
        if y_len == 0 {
            continue;
        }
        let (Ok(x), Ok(y)) = (
            name[i + 1..y_pos].parse(),
            name[y_pos + 1..y_pos + 1 + y_len].parse(),
        ) else {
            continue;
        };
        return Some((x, y));
    }
    None
}

/// Existing reference files keyed by their physical coordinates.
#[derive(Clone, Debug, Default)]
pub struct PhysicalFileIndex {
    files: Vec<(String, (i64, i64))>,
}

impl PhysicalFileIndex {
    /// Index `names`, ignoring those without physical coordinates. Order is
    /// kept and decides ties in [`Self::closest`].
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files = names
            .into_iter()
            .filter_map(|name| {
                let name = name.into();
                parse_physical_coords(&name).map(|xy| (name, xy))
            })
            .collect();
        Self { files }
    }

    /// Index the `.tif` files of `dir`, sorted by name.
    pub fn from_dir(dir: impl AsRef<Path>) -> io::Result<Self> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_ascii_lowercase().ends_with(".tif") {
                names.push(name);
            }
        }
        names.sort();
        Ok(Self::new(names))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File closest to `(x, y)` by squared distance.
    pub fn closest(&self, x: i64, y: i64) -> Option<&str> {
        let dist = |&(fx, fy): &(i64, i64)| {
            let dx = u128::from(fx.abs_diff(x));
            let dy = u128::from(fy.abs_diff(y));
            (dx * dx).saturating_add(dy * dy)
        };
        let mut best: Option<(&str, u128)> = None;
        for (name, xy) in &self.files {
            let d = dist(xy);
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((name, d));
            }
        }
        best.map(|(name, _)| name)
    }

    /// Existing file closest to the coordinates encoded in `physical_name`.
    pub fn resolve(&self, physical_name: &str) -> Option<&str> {
        let (x, y) = parse_physical_coords(physical_name)?;
        self.closest(x, y)
    }
}
