use cv_core::{BinaryMask, Connectivity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    E,
    S,
    W,
    N,
}

const DIRS: [Dir; 4] = [Dir::E, Dir::S, Dir::W, Dir::N];

impl Dir {
    #[inline]
    fn bit(self) -> u8 {
        1 << self as u8
    }

    fn from_bits(bits: u8) -> Option<Self> {
        DIRS.into_iter().find(|d| bits & d.bit() != 0)
    }

    // Lattice y grows downwards, so turning left from east faces north.
    #[inline]
    fn left(self) -> Self {
        match self {
            Self::E => Self::N,
            Self::S => Self::E,
            Self::W => Self::S,
            Self::N => Self::W,
        }
    }

    #[inline]
    fn right(self) -> Self {
        match self {
            Self::E => Self::S,
            Self::S => Self::W,
            Self::W => Self::N,
            Self::N => Self::E,
        }
    }
}

/// Closed boundary cycle on the pixel-corner lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRing {
    /// Corner vertices `(col, row)` without the closing duplicate.
    pub vertices: Vec<(usize, usize)>,
    /// A foreground pixel `(x, y)` lying directly right of the ring.
    pub inside_pixel: (usize, usize),
    /// Twice the signed lattice area; positive for exterior rings.
    pub twice_area: i64,
}

impl PixelRing {
    pub fn is_exterior(&self) -> bool {
        self.twice_area > 0
    }
}

/// Traces all boundary cycles of `mask`.
///
/// Rings keep the foreground on their right when walked on the lattice
/// (y down), so exteriors have positive and holes negative signed area.
pub fn trace_rings(mask: &BinaryMask, connectivity: Connectivity) -> Vec<PixelRing> {
    let (width, height) = mask.shape();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let vw = width + 1;
    let vh = height + 1;
    let set = |x: usize, y: usize| mask.is_set(x, y);

    let mut out_edges = vec![0u8; vw * vh];
    for y in 0..height {
        for x in 0..width {
            if !set(x, y) {
                continue;
            }
            if y == 0 || !set(x, y - 1) {
                out_edges[y * vw + x] |= Dir::E.bit();
            }
            if x + 1 == width || !set(x + 1, y) {
                out_edges[y * vw + x + 1] |= Dir::S.bit();
            }
            if y + 1 == height || !set(x, y + 1) {
                out_edges[(y + 1) * vw + x + 1] |= Dir::W.bit();
            }
            if x == 0 || !set(x - 1, y) {
                out_edges[(y + 1) * vw + x] |= Dir::N.bit();
            }
        }
    }

    let mut used = vec![0u8; vw * vh];
    let mut rings = Vec::new();
    let mut steps: Vec<(usize, Dir)> = Vec::new();

    for v in 0..vw * vh {
        for start_dir in DIRS {
            if out_edges[v] & start_dir.bit() == 0 || used[v] & start_dir.bit() != 0 {
                continue;
            }

            steps.clear();
            let mut cur = v;
            let mut dir = start_dir;
            loop {
                used[cur] |= dir.bit();
                steps.push((cur, dir));

                cur = step(cur, dir, vw);
                let avail = out_edges[cur];
                dir = match avail.count_ones() {
                    1 => Dir::from_bits(avail).expect("one direction bit is set"),
                    2 => match connectivity {
                        Connectivity::C8 => dir.left(),
                        Connectivity::C4 => dir.right(),
                    },
                    _ => break,
                };
                if used[cur] & dir.bit() != 0 {
                    debug_assert!(cur == v && dir == start_dir, "ring closes on its start");
                    break;
                }
            }

            rings.push(build_ring(&steps, vw, start_dir));
        }
    }

    rings
}

#[inline]
fn step(v: usize, dir: Dir, vw: usize) -> usize {
    match dir {
        Dir::E => v + 1,
        Dir::S => v + vw,
        Dir::W => v - 1,
        Dir::N => v - vw,
    }
}

fn build_ring(steps: &[(usize, Dir)], vw: usize, start_dir: Dir) -> PixelRing {
    let n = steps.len();
    let vertices: Vec<(usize, usize)> = (0..n)
        .filter(|&i| steps[(i + n - 1) % n].1 != steps[i].1)
        .map(|i| (steps[i].0 % vw, steps[i].0 / vw))
        .collect();

    let m = vertices.len();
    let twice_area = (0..m)
        .map(|i| {
            let (x0, y0) = vertices[i];
            let (x1, y1) = vertices[(i + 1) % m];
            x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
        })
        .sum();

    let (x, y) = (steps[0].0 % vw, steps[0].0 / vw);
    let inside_pixel = match start_dir {
        Dir::E => (x, y),
        Dir::S => (x - 1, y),
        Dir::W => (x - 1, y - 1),
        Dir::N => (x, y - 1),
    };

    PixelRing {
        vertices,
        inside_pixel,
        twice_area,
    }
}
