//! Temporal stabilization of dart sightings into a visit.
//!
//! A visit is up to three darts thrown before they are pulled from the
//! board. Each camera session owns a [`VisitState`]; every frame's
//! board-space sightings are fed through [`PredictionStabilizer::update`],
//! which promotes sightings that recur within a short ring buffer of recent
//! frames and ends a committed visit once the board is seen empty.

mod params;
mod ring;
mod stabilizer;
mod state;

pub use params::{StabilizerParams, StabilizerProfile, MAX_DARTS};
pub use ring::{FrameRing, FrameSlots};
pub use stabilizer::{PredictionStabilizer, StabilizerUpdate};
pub use state::{FrameDart, StableDart, VisitPhase, VisitState};
