use bevy::math::{DVec2, Vec2};

/// Calibration corner, in the order the quad stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];
}

/// Four points in top-left, top-right, bottom-left, bottom-right order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub points: [Vec2; 4],
}

impl Quad {
    /// The canonical capture rectangle corners.
    pub fn rect(width: f32, height: f32) -> Self {
        Self {
            points: [
                Vec2::new(0.0, 0.0),
                Vec2::new(width, 0.0),
                Vec2::new(0.0, height),
                Vec2::new(width, height),
            ],
        }
    }

    pub fn corner(&self, c: Corner) -> Vec2 {
        self.points[c as usize]
    }

    pub fn set_corner(&mut self, c: Corner, p: Vec2) {
        self.points[c as usize] = p;
    }

    /// Outline in drawing order (TL, TR, BR, BL).
    pub fn outline(&self) -> [Vec2; 4] {
        let [tl, tr, bl, br] = self.points;
        [tl, tr, br, bl]
    }

    /// True when any three corners are (nearly) collinear, which includes duplicates.
    pub fn is_degenerate(&self) -> bool {
        const MIN_AREA2: f64 = 1e-3;
        const TRIANGLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
        let p = self.points.map(|v| v.as_dvec2());
        TRIANGLES.iter().any(|&[a, b, c]| {
            let area2 = (p[b] - p[a]).perp_dot(p[c] - p[a]).abs();
            area2 < MIN_AREA2 || !area2.is_finite()
        })
    }
}

/// Planar projective transform, row-major 3x3 with `m[8] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: [f64; 9],
}

impl Default for Homography {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Homography {
    pub const IDENTITY: Homography = Homography {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Solve for the transform taking each `from` corner onto the matching `to` corner.
    /// Returns `None` for degenerate input.
    pub fn between(from: &Quad, to: &Quad) -> Option<Self> {
        if from.is_degenerate() || to.is_degenerate() {
            return None;
        }
        // 8x9 augmented system, unknowns h0..h7.
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (x, y) = (from.points[i].x as f64, from.points[i].y as f64);
            let (u, v) = (to.points[i].x as f64, to.points[i].y as f64);
            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
        }
        let h = solve8(a)?;
        let m = [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0];
        m.iter().all(|v| v.is_finite()).then_some(Self { m })
    }

    /// `between`, falling back to identity (with a warning) when the input is unusable.
    pub fn between_or_identity(from: &Quad, to: &Quad) -> Self {
        Self::between(from, to).unwrap_or_else(|| {
            tracing::warn!(?from, "degenerate calibration quad; using identity transform");
            Self::IDENTITY
        })
    }

    /// Map a point; points on the horizon line come back non-finite.
    #[inline]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        let m = &self.m;
        let w = m[6] * p.x + m[7] * p.y + m[8];
        DVec2::new(
            (m[0] * p.x + m[1] * p.y + m[2]) / w,
            (m[3] * p.x + m[4] * p.y + m[5]) / w,
        )
    }

    pub fn is_identity(&self) -> bool {
        self.m
            .iter()
            .zip(Self::IDENTITY.m.iter())
            .all(|(a, b)| (a - b).abs() < 1e-9)
    }
}

/// Gaussian elimination with partial pivoting.
fn solve8(mut a: [[f64; 9]; 8]) -> Option<[f64; 8]> {
    const PIVOT_EPS: f64 = 1e-10;
    for col in 0..8 {
        let pivot = (col..8).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPS {
            return None;
        }
        a.swap(col, pivot);
        for row in 0..8 {
            if row == col {
                continue;
            }
            let f = a[row][col] / a[col][col];
            if f == 0.0 {
                continue;
            }
            for k in col..9 {
                a[row][k] -= f * a[col][k];
            }
        }
    }
    let mut x = [0.0; 8];
    for i in 0..8 {
        x[i] = a[i][8] / a[i][i];
    }
    Some(x)
}
