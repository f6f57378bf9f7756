//! Rendition ladder planning.
//!
//! A probed source height is snapped to the nearest standard height (the
//! "base"), and every standard height below it becomes one rung of the ladder.
//! Smaller rungs get a higher CRF, since they need less detail to look fine.

use serde::{Deserialize, Serialize};

/// Standard pixel heights, ascending.
pub const STANDARD_HEIGHTS: [u32; 9] = [144, 240, 360, 480, 720, 1080, 1440, 2160, 4320];

/// Highest base height for which an upscale request is still sent.
pub const UPSCALE_MAX_HEIGHT: u32 = 1440;

/// CRF given to the smallest rung.
pub const LADDER_BASE_CRF: i32 = 26;
/// CRF floor for the ladder schedule.
pub const LADDER_MIN_CRF: i32 = 8;
/// CRF ceiling for the ladder schedule.
pub const LADDER_MAX_CRF: i32 = 26;

/// Number of standard heights above the source exposed as upscale targets.
const UPSCALE_TARGETS: usize = 2;

/// Whether `height` is one of the standard heights.
pub fn is_standard(height: u32) -> bool {
    STANDARD_HEIGHTS.contains(&height)
}

/// Snap a height to the standard height with minimum absolute distance.
///
/// Ties keep the first match of the ascending scan, so they resolve to the
/// smaller height.
pub fn closest_standard_height(height: u32) -> u32 {
    let mut closest = STANDARD_HEIGHTS[0];
    let mut min_diff = height.abs_diff(closest);
    for &h in &STANDARD_HEIGHTS[1..] {
        let diff = height.abs_diff(h);
        if diff < min_diff {
            min_diff = diff;
            closest = h;
        }
    }
    closest
}

/// Every standard height strictly below `base`, ascending.
pub fn lower_standard_heights(base: u32) -> Vec<u32> {
    STANDARD_HEIGHTS.iter().copied().filter(|&h| h < base).collect()
}

/// CRF for ladder position `index` (0 = smallest rung).
pub fn ladder_crf(index: usize) -> i32 {
    let index = i32::try_from(index).unwrap_or(i32::MAX / 2);
    LADDER_BASE_CRF
        .saturating_sub(index.saturating_mul(2))
        .clamp(LADDER_MIN_CRF, LADDER_MAX_CRF)
}

/// CRF for the normalise transcode, derived from the base height's position in
/// the standard set.
pub fn normalise_crf(base: u32) -> i32 {
    let index = STANDARD_HEIGHTS
        .iter()
        .position(|&h| h == closest_standard_height(base))
        .unwrap_or(0);
    ladder_crf(index)
}

/// CRF the normalise transcode historically used: `26 - 2 * height`.
///
/// This is far outside the encoder's accepted range for any real height, so
/// the encoder rejects it. Kept behind `WORKER_LEGACY_NORMALISE_CRF`.
pub fn legacy_normalise_crf(height: u32) -> i32 {
    let height = i32::try_from(height).unwrap_or(i32::MAX / 2);
    LADDER_BASE_CRF.saturating_sub(height.saturating_mul(2))
}

/// Whether an upscale request may be sent for this base height.
pub fn upscale_allowed(base: u32) -> bool {
    base <= UPSCALE_MAX_HEIGHT
}

/// Renditions believed to be available for a stored quality.
///
/// Covers every standard height up to the source plus the next two larger ones
/// (the upscale targets), clamped to the standard set.
pub fn available_qualities(quality: u32) -> Vec<u32> {
    let index = STANDARD_HEIGHTS
        .iter()
        .position(|&h| h == closest_standard_height(quality))
        .unwrap_or(0);
    let end = (index + 1 + UPSCALE_TARGETS).min(STANDARD_HEIGHTS.len());
    STANDARD_HEIGHTS[..end].to_vec()
}

/// One target of the transcode fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    /// Target pixel height
    pub height: u32,
    /// Constant rate factor for the encoder
    pub crf: i32,
}

/// Everything the orchestrator needs to know about one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionPlan {
    /// Height reported by the probe
    pub probed_height: u32,
    /// Normalised (standard) source height
    pub base: u32,
    /// Extra transcode to the base height, present when the probe was non-standard
    pub normalise: Option<Rendition>,
    /// Lower renditions, ascending
    pub ladder: Vec<Rendition>,
    /// Whether the upscale request should be sent
    pub upscale: bool,
}

impl RenditionPlan {
    /// Plan renditions for a probed height.
    pub fn new(probed_height: u32, upscale_requested: bool, legacy_normalise_crf: bool) -> Self {
        let base = closest_standard_height(probed_height);

        let normalise = (!is_standard(probed_height)).then(|| Rendition {
            height: base,
            crf: if legacy_normalise_crf {
                self::legacy_normalise_crf(base)
            } else {
                normalise_crf(base)
            },
        });

        let ladder = lower_standard_heights(base)
            .into_iter()
            .enumerate()
            .map(|(i, height)| Rendition {
                height,
                crf: ladder_crf(i),
            })
            .collect();

        Self {
            probed_height,
            base,
            normalise,
            ladder,
            upscale: upscale_requested && upscale_allowed(base),
        }
    }

    /// Ladder heights, ascending.
    pub fn ladder_heights(&self) -> Vec<u32> {
        self.ladder.iter().map(|r| r.height).collect()
    }

    /// Every height that ends up with a rendition: the ladder plus the base.
    pub fn all_heights(&self) -> Vec<u32> {
        let mut heights = self.ladder_heights();
        heights.push(self.base);
        heights
    }
}
