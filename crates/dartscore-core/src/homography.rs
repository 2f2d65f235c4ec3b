use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Planar projective transform `dst ~ H * src`, scaled so `H[2][2] == 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub matrix: Matrix3<f64>,
}

impl Homography {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Build from row-major entries.
    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    /// Row-major entries.
    pub fn to_array(&self) -> [[f64; 3]; 3] {
        std::array::from_fn(|r| std::array::from_fn(|c| self.matrix[(r, c)]))
    }

    /// Map a point through the transform, dividing by the homogeneous `w`.
    ///
    /// Points mapped onto the line at infinity come back non-finite.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.matrix * p.to_homogeneous();
        Point2::new(v.x / v.z, v.y / v.z)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.matrix
            .try_inverse()
            .and_then(unit_scale)
            .map(Self::new)
    }

    /// Euclidean distance between `H * src` and `dst`; infinite when `src`
    /// maps to infinity.
    #[inline]
    pub fn transfer_error(&self, src: Point2<f64>, dst: Point2<f64>) -> f64 {
        let err = (self.apply(src) - dst).norm();
        if err.is_finite() {
            err
        } else {
            f64::INFINITY
        }
    }
}

/// Rescale so the bottom-right entry is 1.
fn unit_scale(m: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let w = m[(2, 2)];
    (w.is_finite() && w.abs() >= 1e-12).then(|| m / w)
}

/// Similarity that centers a point set on the origin with mean radius sqrt(2).
#[derive(Clone, Copy, Debug)]
struct Conditioner {
    center: Vector3<f64>,
    scale: f64,
}

impl Conditioner {
    fn fit(pts: &[Point2<f64>]) -> Self {
        let n = pts.len() as f64;
        let sum = pts.iter().fold(Vector3::zeros(), |acc, p| acc + p.to_homogeneous());
        let center = Vector3::new(sum.x / n, sum.y / n, 0.0);
        let spread = pts
            .iter()
            .map(|p| (p.coords - center.xy()).norm())
            .sum::<f64>()
            / n;
        let scale = if spread > 1e-12 {
            std::f64::consts::SQRT_2 / spread
        } else {
            1.0
        };
        Self { center, scale }
    }

    fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::from((p.coords - self.center.xy()) * self.scale)
    }

    fn apply_all(&self, pts: &[Point2<f64>]) -> Vec<Point2<f64>> {
        pts.iter().map(|&p| self.apply(p)).collect()
    }

    fn matrix(&self) -> Matrix3<f64> {
        let (s, c) = (self.scale, self.center);
        Matrix3::new(
            s, 0.0, -s * c.x, //
            0.0, s, -s * c.y, //
            0.0, 0.0, 1.0,
        )
    }

    fn inverse_matrix(&self) -> Matrix3<f64> {
        let (s, c) = (self.scale, self.center);
        Matrix3::new(
            1.0 / s, 0.0, c.x, //
            0.0, 1.0 / s, c.y, //
            0.0, 0.0, 1.0,
        )
    }

    /// Lift a transform between conditioned sets back to the original frames.
    fn lift(src: &Self, dst: &Self, hn: Matrix3<f64>) -> Option<Homography> {
        unit_scale(dst.inverse_matrix() * hn * src.matrix()).map(Homography::new)
    }
}

fn cross(o: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let (u, v) = (a - o, b - o);
    u.x * v.y - u.y * v.x
}

/// True if any three of the points are (numerically) collinear.
///
/// Expects conditioned input so the tolerance is scale-free.
fn has_collinear_triple(pts: &[Point2<f64>]) -> bool {
    const EPS: f64 = 1e-9;
    (0..pts.len()).any(|i| {
        (i + 1..pts.len()).any(|j| {
            (j + 1..pts.len()).any(|k| cross(pts[i], pts[j], pts[k]).abs() < EPS)
        })
    })
}

/// The two DLT constraints one correspondence puts on the 9 entries of H.
fn dlt_rows(p: Point2<f64>, q: Point2<f64>) -> [[f64; 9]; 2] {
    let (x, y, u, v) = (p.x, p.y, q.x, q.y);
    [
        [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u],
        [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, -v],
    ]
}

/// Estimate H such that `dst ~ H * src` with the normalized DLT.
///
/// Exactly four correspondences are routed to [`homography_from_4pt`].
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if let (Ok(s), Ok(d)) = (
        <&[Point2<f64>; 4]>::try_from(src),
        <&[Point2<f64>; 4]>::try_from(dst),
    ) {
        return homography_from_4pt(s, d);
    }

    let (cs, cd) = (Conditioner::fit(src), Conditioner::fit(dst));
    let (s, d) = (cs.apply_all(src), cd.apply_all(dst));

    let mut a = DMatrix::<f64>::zeros(2 * src.len(), 9);
    for (k, (&p, &q)) in s.iter().zip(&d).enumerate() {
        for (r, row) in dlt_rows(p, q).iter().enumerate() {
            for (c, &val) in row.iter().enumerate() {
                a[(2 * k + r, c)] = val;
            }
        }
    }

    // The null vector of A is the right singular vector with the smallest
    // singular value; with >= 5 correspondences A has at least 10 rows.
    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let best = svd.singular_values.argmin().0;
    let hn = Matrix3::from_fn(|r, c| v_t[(best, 3 * r + c)]);

    Conditioner::lift(&cs, &cd, hn)
}

/// Compute H such that `dst ~ H * src` from exactly 4 correspondences.
///
/// Returns `None` when three points on either side are collinear or the
/// system is otherwise singular.
pub fn homography_from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Homography> {
    let (cs, cd) = (Conditioner::fit(src), Conditioner::fit(dst));
    let s = src.map(|p| cs.apply(p));
    let d = dst.map(|p| cd.apply(p));
    if has_collinear_triple(&s) || has_collinear_triple(&d) {
        return None;
    }

    // Fix h33 = 1 and move its column to the right-hand side.
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (&p, &q)) in s.iter().zip(&d).enumerate() {
        for (r, row) in dlt_rows(p, q).iter().enumerate() {
            for c in 0..8 {
                a[(2 * k + r, c)] = row[c];
            }
            b[2 * k + r] = -row[8];
        }
    }

    let h = a.lu().solve(&b)?;
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    let hn = Matrix3::from_fn(|r, c| if r == 2 && c == 2 { 1.0 } else { h[3 * r + c] });

    Conditioner::lift(&cs, &cd, hn)
}
