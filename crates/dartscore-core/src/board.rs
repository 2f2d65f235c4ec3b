//! Physical dartboard geometry and the six calibration slots.
//!
//! Board space is normalized: `(0.5, 0.5)` is the bull and distances are
//! divided by the board diameter, so the outer double wire sits at
//! `double_outer_mm / board_diameter_mm` (≈ 0.377 for a standard board).

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Normalized coordinate of the board center on both axes.
pub const BOARD_CENTER: f64 = 0.5;

/// Board center as a point.
#[inline]
pub fn board_center() -> Point2<f64> {
    Point2::new(BOARD_CENTER, BOARD_CENTER)
}

/// Number of calibration slots.
pub const SLOT_COUNT: usize = 6;

/// Physical board dimensions in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardGeometry {
    /// Width of the double and treble rings.
    pub ring_width_mm: f64,
    /// Width of the wires around the bullseye.
    pub bullseye_wire_mm: f64,
    /// Diameter used to normalize all radii.
    pub board_diameter_mm: f64,
    /// Outer radius of the double ring (board edge for scoring).
    pub double_outer_mm: f64,
    /// Outer radius of the treble ring.
    pub treble_outer_mm: f64,
    /// Outer radius of the single bull.
    pub bull_outer_mm: f64,
    /// Outer radius of the double bull.
    pub double_bull_outer_mm: f64,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            ring_width_mm: 10.0,
            bullseye_wire_mm: 1.6,
            board_diameter_mm: 451.0,
            double_outer_mm: 170.0,
            treble_outer_mm: 107.4,
            bull_outer_mm: 15.9,
            double_bull_outer_mm: 6.35,
        }
    }
}

impl BoardGeometry {
    /// Radius of the outer double wire in board space (170/451 by default).
    #[inline]
    pub fn outer_radius_ratio(&self) -> f64 {
        self.double_outer_mm / self.board_diameter_mm
    }

    /// Inner radii of the scoring bands, ascending, normalized by the board diameter.
    ///
    /// Bands in order: double bull, single bull, inner single, treble,
    /// outer single, double. Anything beyond the last radius is a miss.
    pub fn scoring_radii(&self) -> [f64; 7] {
        let half_wire = self.bullseye_wire_mm / 2.0;
        let mm = [
            0.0,
            self.double_bull_outer_mm + half_wire,
            self.bull_outer_mm + half_wire,
            self.treble_outer_mm - self.ring_width_mm,
            self.treble_outer_mm,
            self.double_outer_mm - self.ring_width_mm,
            self.double_outer_mm,
        ];
        mm.map(|r| r / self.board_diameter_mm)
    }

    /// Canonical board-space positions of the six calibration slots.
    pub fn reference_points(&self) -> [Point2<f64>; SLOT_COUNT] {
        let radius = self.outer_radius_ratio();
        CalibrationSlot::ALL.map(|slot| slot.reference_point(radius))
    }

    /// Check that every dimension is finite and the bands are strictly ordered.
    pub fn is_valid(&self) -> bool {
        let fields = [
            self.ring_width_mm,
            self.bullseye_wire_mm,
            self.board_diameter_mm,
            self.double_outer_mm,
            self.treble_outer_mm,
            self.bull_outer_mm,
            self.double_bull_outer_mm,
        ];
        if fields.iter().any(|v| !v.is_finite() || *v < 0.0) || self.board_diameter_mm <= 0.0 {
            return false;
        }
        let radii = self.scoring_radii();
        radii.windows(2).all(|w| w[0] < w[1])
    }
}

/// Which end of a diameter a slot sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Minus,
    Plus,
}

/// One of the six calibration markers printed around the board rim.
///
/// Slots come in pairs on three diameters (81°, -9° and 27° in image
/// orientation); the slot index is the position in [`CalibrationSlot::ALL`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSlot {
    Top20,
    Bottom3,
    Left11,
    Right6,
    UpperLeft9,
    LowerRight15,
}

impl CalibrationSlot {
    pub const ALL: [CalibrationSlot; SLOT_COUNT] = [
        CalibrationSlot::Top20,
        CalibrationSlot::Bottom3,
        CalibrationSlot::Left11,
        CalibrationSlot::Right6,
        CalibrationSlot::UpperLeft9,
        CalibrationSlot::LowerRight15,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Segment number printed next to the marker.
    pub fn label(self) -> &'static str {
        match self {
            CalibrationSlot::Top20 => "20",
            CalibrationSlot::Bottom3 => "3",
            CalibrationSlot::Left11 => "11",
            CalibrationSlot::Right6 => "6",
            CalibrationSlot::UpperLeft9 => "9",
            CalibrationSlot::LowerRight15 => "15",
        }
    }

    fn diameter(self) -> (f64, Side) {
        match self {
            CalibrationSlot::Top20 => (81.0, Side::Minus),
            CalibrationSlot::Bottom3 => (81.0, Side::Plus),
            CalibrationSlot::Left11 => (-9.0, Side::Minus),
            CalibrationSlot::Right6 => (-9.0, Side::Plus),
            CalibrationSlot::UpperLeft9 => (27.0, Side::Minus),
            CalibrationSlot::LowerRight15 => (27.0, Side::Plus),
        }
    }

    /// Board-space reference point on a circle of `radius` around the center.
    pub fn reference_point(self, radius: f64) -> Point2<f64> {
        let (angle_deg, side) = self.diameter();
        let a = angle_deg.to_radians();
        let offset = Vector2::new(radius * a.cos(), radius * a.sin());
        match side {
            Side::Minus => board_center() - offset,
            Side::Plus => board_center() + offset,
        }
    }

    /// Nominal angle (degrees, `atan2` convention in `[0, 360)`) at which the
    /// marker is expected in a roughly upright image.
    pub fn expected_angle_deg(self) -> f64 {
        match self {
            CalibrationSlot::Top20 => 0.0,
            CalibrationSlot::Bottom3 => 90.0,
            CalibrationSlot::Left11 => 180.0,
            CalibrationSlot::Right6 => 270.0,
            CalibrationSlot::UpperLeft9 => 315.0,
            CalibrationSlot::LowerRight15 => 45.0,
        }
    }

    /// Accepted angular window `(min, max)` in degrees; `min > max` wraps through 0°.
    pub fn angular_window(self) -> (f64, f64) {
        match self {
            CalibrationSlot::Top20 => (350.0, 10.0),
            CalibrationSlot::Bottom3 => (80.0, 100.0),
            CalibrationSlot::Left11 => (170.0, 190.0),
            CalibrationSlot::Right6 => (260.0, 280.0),
            CalibrationSlot::UpperLeft9 => (305.0, 325.0),
            CalibrationSlot::LowerRight15 => (35.0, 55.0),
        }
    }

    /// Expected image position on a circle of `radius` at [`Self::expected_angle_deg`].
    pub fn expected_position(self, radius: f64) -> Point2<f64> {
        let a = self.expected_angle_deg().to_radians();
        board_center() + Vector2::new(radius * a.cos(), radius * a.sin())
    }
}
