use serde::{Deserialize, Serialize};

const DX: [isize; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [isize; 8] = [0, -1, -1, -1, 0, 1, 1, 1];
const DIRS_C4: [usize; 4] = [0, 2, 4, 6];
const DIRS_C8: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Pixel adjacency rule shared by labeling and boundary tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Axis-aligned neighbours only.
    C4,
    /// Axis-aligned and diagonal neighbours.
    #[default]
    C8,
}

impl Connectivity {
    /// Neighbour offsets `(dx, dy)` for this rule.
    pub fn offsets(self) -> impl Iterator<Item = (isize, isize)> {
        let dirs: &'static [usize] = match self {
            Self::C4 => &DIRS_C4,
            Self::C8 => &DIRS_C8,
        };
        dirs.iter().map(|&d| (DX[d], DY[d]))
    }

    /// Flat index of the neighbour of `p` at `(dx, dy)`, if inside the grid.
    #[inline]
    pub fn neighbor(p: usize, dx: isize, dy: isize, width: usize, height: usize) -> Option<usize> {
        if width == 0 {
            return None;
        }
        let nx = (p % width) as isize + dx;
        let ny = (p / width) as isize + dy;
        if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
            return None;
        }
        Some(ny as usize * width + nx as usize)
    }
}
