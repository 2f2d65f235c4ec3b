//! Segment and ring classification of board-space positions.
//!
//! Angles are measured with `atan(dy / dx)` in image orientation (y grows
//! downwards), truncated to whole degrees and looked up in a table of the
//! nine segment boundaries between -81° and 63°. Each bucket names the two
//! segments it could belong to; the sign of `dy` (or `dx` for the 6/11
//! bucket) picks one of them.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::board::{BoardGeometry, BOARD_CENTER};

/// Added to `x` when it sits exactly on the vertical center line.
pub const ANGLE_EPSILON: f64 = 1e-5;

/// Angle bucket at and beyond which a position lies on the 3/20 axis.
const VERTICAL_BUCKET_DEG: f64 = 81.0;

const BOUNDARY_ANGLES: [f64; 9] = [-81.0, -63.0, -45.0, -27.0, -9.0, 9.0, 27.0, 45.0, 63.0];

const SEGMENT_PAIRS: [(u8, u8); 9] = [
    (19, 1),
    (7, 18),
    (16, 4),
    (8, 13),
    (6, 11),
    (10, 14),
    (15, 9),
    (2, 12),
    (17, 5),
];

const VERTICAL_PAIR: (u8, u8) = (3, 20);

/// The only bucket that straddles the horizontal axis, so it is split on `x`.
const HORIZONTAL_PAIR: (u8, u8) = (6, 11);

/// Value of either bull before the multiplier.
pub const BULL_VALUE: u32 = 25;

/// Radial band a position falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreRegion {
    DoubleBull,
    SingleBull,
    Single,
    Double,
    Triple,
    Miss,
}

impl ScoreRegion {
    /// Bands between consecutive scoring radii, innermost first.
    const BANDS: [ScoreRegion; 6] = [
        ScoreRegion::DoubleBull,
        ScoreRegion::SingleBull,
        ScoreRegion::Single,
        ScoreRegion::Triple,
        ScoreRegion::Single,
        ScoreRegion::Double,
    ];

    pub fn multiplier(self) -> u32 {
        match self {
            ScoreRegion::DoubleBull => 2,
            ScoreRegion::SingleBull | ScoreRegion::Single => 1,
            ScoreRegion::Double => 2,
            ScoreRegion::Triple => 3,
            ScoreRegion::Miss => 0,
        }
    }

    /// Short code used in labels.
    pub fn code(self) -> &'static str {
        match self {
            ScoreRegion::DoubleBull => "DB",
            ScoreRegion::SingleBull => "SB",
            ScoreRegion::Single => "S",
            ScoreRegion::Double => "D",
            ScoreRegion::Triple => "T",
            ScoreRegion::Miss => "miss",
        }
    }

    pub fn is_bull(self) -> bool {
        matches!(self, ScoreRegion::DoubleBull | ScoreRegion::SingleBull)
    }
}

/// Outcome of scoring a single position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Segment number 1..=20, 25 for either bull, 0 for a miss.
    pub segment_number: u8,
    pub region: ScoreRegion,
    pub score_value: u32,
    /// `DB`, `SB`, `miss`, or region code followed by the segment (`T20`).
    pub label: String,
}

impl ScoreResult {
    pub fn miss() -> Self {
        Self {
            segment_number: 0,
            region: ScoreRegion::Miss,
            score_value: 0,
            label: ScoreRegion::Miss.code().to_string(),
        }
    }

    fn from_parts(region: ScoreRegion, segment: u8) -> Self {
        match region {
            ScoreRegion::Miss => Self::miss(),
            ScoreRegion::DoubleBull | ScoreRegion::SingleBull => Self {
                segment_number: BULL_VALUE as u8,
                region,
                score_value: region.multiplier() * BULL_VALUE,
                label: region.code().to_string(),
            },
            _ => Self {
                segment_number: segment,
                region,
                score_value: region.multiplier() * u32::from(segment),
                label: format!("{}{}", region.code(), segment),
            },
        }
    }
}

/// Truncated angle bucket of `p` around the board center, in whole degrees.
///
/// `p.x` must not equal the center; callers nudge it by [`ANGLE_EPSILON`].
fn angle_bucket_deg(p: Point2<f64>) -> f64 {
    let deg = ((p.y - BOARD_CENTER) / (p.x - BOARD_CENTER)).atan().to_degrees();
    if deg > 0.0 {
        deg.floor()
    } else {
        deg.ceil()
    }
}

fn candidate_pair(angle_deg: f64) -> (u8, u8) {
    if angle_deg.abs() >= VERTICAL_BUCKET_DEG {
        return VERTICAL_PAIR;
    }
    BOUNDARY_ANGLES
        .iter()
        .rposition(|&b| b <= angle_deg)
        .map(|i| SEGMENT_PAIRS[i])
        .unwrap_or(VERTICAL_PAIR)
}

fn pick_segment(pair: (u8, u8), p: Point2<f64>) -> u8 {
    let coord = if pair == HORIZONTAL_PAIR { p.x } else { p.y };
    if coord > BOARD_CENTER {
        pair.0
    } else {
        pair.1
    }
}

/// Scores board-space positions against a fixed [`BoardGeometry`].
#[derive(Clone, Debug)]
pub struct BoardScorer {
    radii: [f64; 7],
}

impl Default for BoardScorer {
    fn default() -> Self {
        Self::new(&BoardGeometry::default())
    }
}

impl BoardScorer {
    pub fn new(geometry: &BoardGeometry) -> Self {
        Self {
            radii: geometry.scoring_radii(),
        }
    }

    /// Normalized radii bounding the scoring bands.
    pub fn radii(&self) -> &[f64; 7] {
        &self.radii
    }

    /// Segment number (1..=20) whose wedge contains `p`.
    pub fn segment(&self, p: Point2<f64>) -> u8 {
        let p = nudge(p);
        pick_segment(candidate_pair(angle_bucket_deg(p)), p)
    }

    /// Radial band for a distance from the board center.
    pub fn region_for_distance(&self, distance: f64) -> ScoreRegion {
        if !distance.is_finite() || distance > self.radii[6] {
            return ScoreRegion::Miss;
        }
        self.radii[..6]
            .iter()
            .rposition(|&r| distance > r)
            .map(|i| ScoreRegion::BANDS[i])
            .unwrap_or(ScoreRegion::DoubleBull)
    }

    /// Score a board-space position. Pure; the caller's point is not modified.
    pub fn score(&self, position: Point2<f64>) -> ScoreResult {
        if !position.x.is_finite() || !position.y.is_finite() {
            return ScoreResult::miss();
        }
        let p = nudge(position);
        let distance = ((p.x - BOARD_CENTER).powi(2) + (p.y - BOARD_CENTER).powi(2)).sqrt();
        let region = self.region_for_distance(distance);
        let segment = pick_segment(candidate_pair(angle_bucket_deg(p)), p);
        ScoreResult::from_parts(region, segment)
    }
}

#[inline]
fn nudge(p: Point2<f64>) -> Point2<f64> {
    if p.x == BOARD_CENTER {
        Point2::new(p.x + ANGLE_EPSILON, p.y)
    } else {
        p
    }
}

/// Score a position on a standard board.
pub fn score_position(position: Point2<f64>) -> ScoreResult {
    BoardScorer::default().score(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: f64 = 451.0;

    /// Board-space point at `radius_mm` from the center along `deg`
    /// (clockwise from the positive x axis, image orientation).
    fn polar(radius_mm: f64, deg: f64) -> Point2<f64> {
        let a = deg.to_radians();
        Point2::new(
            0.5 + radius_mm / D * a.cos(),
            0.5 + radius_mm / D * a.sin(),
        )
    }

    #[test]
    fn center_is_double_bull() {
        let s = score_position(Point2::new(0.5, 0.5));
        assert_eq!(s.region, ScoreRegion::DoubleBull);
        assert_eq!(s.score_value, 50);
        assert_eq!(s.label, "DB");
    }

    #[test]
    fn single_bull_ring() {
        let s = score_position(polar(11.0, 200.0));
        assert_eq!(s.region, ScoreRegion::SingleBull);
        assert_eq!(s.score_value, 25);
        assert_eq!(s.label, "SB");
    }

    #[test]
    fn treble_twenty_straight_up() {
        let s = score_position(Point2::new(0.5, 0.5 - 102.4 / D));
        assert_eq!(s.segment_number, 20);
        assert_eq!(s.region, ScoreRegion::Triple);
        assert_eq!(s.score_value, 60);
        assert_eq!(s.label, "T20");
    }

    #[test]
    fn double_twenty_near_the_edge() {
        let s = score_position(Point2::new(0.5, 0.5 - 165.0 / D));
        assert_eq!(s.label, "D20");
        assert_eq!(s.score_value, 40);
    }

    #[test]
    fn three_straight_down() {
        let s = score_position(Point2::new(0.5, 0.5 + 60.0 / D));
        assert_eq!(s.label, "S3");
        assert_eq!(s.score_value, 3);
    }

    #[test]
    fn six_and_eleven_split_on_x() {
        assert_eq!(score_position(polar(60.0, 0.0)).label, "S6");
        assert_eq!(score_position(polar(60.0, 180.0)).label, "S11");
        assert_eq!(score_position(polar(60.0, 5.0)).label, "S6");
        assert_eq!(score_position(polar(60.0, 185.0)).label, "S11");
    }

    #[test]
    fn segments_around_the_board() {
        // Wedge centers, clockwise from straight up in image orientation.
        let order = [
            20u8, 1, 18, 4, 13, 6, 10, 15, 2, 17, 3, 19, 7, 16, 8, 11, 14, 9, 12, 5,
        ];
        let scorer = BoardScorer::default();
        for (k, &expected) in order.iter().enumerate() {
            let deg = -90.0 + 18.0 * k as f64;
            let p = polar(60.0, deg);
            assert_eq!(scorer.segment(p), expected, "wedge at {deg}°");
        }
    }

    #[test]
    fn single_nineteen_lower_left() {
        let s = score_position(polar(60.0, 108.0));
        assert_eq!(s.label, "S19");
        assert_eq!(s.score_value, 19);
    }

    #[test]
    fn outside_double_ring_is_miss() {
        let s = score_position(Point2::new(0.5, 0.5 - 175.0 / D));
        assert_eq!(s, ScoreResult::miss());
        assert_eq!(score_position(Point2::new(f64::NAN, 0.5)).region, ScoreRegion::Miss);
    }

    #[test]
    fn band_boundaries_are_inclusive_on_the_outside() {
        let scorer = BoardScorer::default();
        let r = *scorer.radii();
        assert_eq!(scorer.region_for_distance(0.0), ScoreRegion::DoubleBull);
        assert_eq!(scorer.region_for_distance(r[1]), ScoreRegion::DoubleBull);
        assert_eq!(scorer.region_for_distance(r[3] + 1e-9), ScoreRegion::Triple);
        assert_eq!(scorer.region_for_distance(r[6]), ScoreRegion::Double);
        assert_eq!(scorer.region_for_distance(r[6] + 1e-9), ScoreRegion::Miss);
    }

    #[test]
    fn scoring_is_pure() {
        let p = Point2::new(0.5, 0.3);
        let a = score_position(p);
        let b = score_position(p);
        assert_eq!(a, b);
        assert_eq!(p, Point2::new(0.5, 0.3));
    }

    #[test]
    fn bull_treble_twenty_single_nineteen_total() {
        let darts = [
            Point2::new(0.5, 0.5),
            Point2::new(0.5, 0.5 - 102.4 / D),
            polar(60.0, 108.0),
        ];
        let total: u32 = darts.iter().map(|&p| score_position(p).score_value).sum();
        assert_eq!(total, 129);
    }
}
