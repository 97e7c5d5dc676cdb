#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the blackout experience.
//!
//! This crate defines the message surface that connects input systems, the
//! authoritative stage, and presentation adapters. Systems translate raw
//! sensor data into [`Command`] values, the stage executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values describing
//! what changed. Adapters query immutable snapshots and render them however
//! they see fit; nothing outside the stage mutates coordinator state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Highest promille value the experience ever reports.
pub const MAX_PROMILLE: f32 = 1.8;

/// Scroll progress at which the promille ramp saturates.
pub const RAMP_PROGRESS: f32 = 0.75;

/// Promille covered by a single unit of alcohol.
pub const UNIT_PROMILLE: f32 = 0.2;

/// Normalized scroll progress in the closed interval `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Progress(f32);

impl Progress {
    /// Progress at the very top of the page.
    pub const ZERO: Progress = Progress(0.0);

    /// Creates a progress sample, clamping the input into `[0, 1]`.
    ///
    /// Non-finite input collapses to zero so a misbehaving scroll source can
    /// never poison downstream threshold comparisons.
    #[must_use]
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0))
        } else {
            Self(0.0)
        }
    }

    /// Retrieves the normalized scalar.
    #[must_use]
    pub const fn get(&self) -> f32 {
        self.0
    }
}

/// Simulated blood-alcohol level derived from scroll progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Promille(f32);

impl Promille {
    /// Saturated promille reached at [`RAMP_PROGRESS`] and beyond.
    pub const MAX: Promille = Promille(MAX_PROMILLE);

    /// Maps scroll progress onto the promille scale.
    ///
    /// Linear ramp from zero to [`MAX_PROMILLE`] over
    /// `[0, RAMP_PROGRESS]`, saturated thereafter. Total and stateless.
    #[must_use]
    pub fn from_progress(progress: Progress) -> Self {
        let p = progress.get();
        if p <= RAMP_PROGRESS {
            Self((p / RAMP_PROGRESS) * MAX_PROMILLE)
        } else {
            Self::MAX
        }
    }

    /// Wraps an already-computed promille value, clamping below zero.
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self(value.max(0.0))
    }

    /// Retrieves the promille scalar.
    #[must_use]
    pub const fn get(&self) -> f32 {
        self.0
    }

    /// Whole units of alcohol represented by this level.
    ///
    /// One unit per [`UNIT_PROMILLE`]. The tolerance keeps exact unit
    /// boundaries on the next unit despite f32 rounding (1.8 / 0.2 lands a
    /// hair under 9.0 in f32).
    #[must_use]
    pub fn units(&self) -> u32 {
        const UNIT_TOLERANCE: f32 = 1e-4;
        ((self.0 + UNIT_TOLERANCE) / UNIT_PROMILLE) as u32
    }
}

/// Position expressed in mirrored camera coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point from camera-space components.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal component of the point.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical component of the point.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Dimensions of the viewport hosting the experience.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    width: f32,
    height: f32,
}

impl Viewport {
    /// Creates a new viewport description.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width of the viewport in screen units.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Height of the viewport in screen units.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Length of the longest viewport edge.
    #[must_use]
    pub fn longest_edge(&self) -> f32 {
        self.width.max(self.height)
    }
}

/// Dimensions of the camera frame that keypoints are reported in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraDimensions {
    width: f32,
    height: f32,
}

impl CameraDimensions {
    /// Frame size requested from the capture device.
    pub const DEFAULT: CameraDimensions = CameraDimensions {
        width: 1024.0,
        height: 768.0,
    };

    /// Creates a new camera frame description.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width of the camera frame.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Height of the camera frame.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }
}

/// Narrative panels staged across the scroll range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Panel {
    /// First signs of intoxication.
    Onset,
    /// Drag-and-evade interaction beat.
    Evasion,
    /// Overlapping haze interlude.
    Haze,
    /// Countdown-and-touch emergency beat.
    Emergency,
    /// Terminal panel shown after the takeover.
    Blackout,
}

impl Panel {
    /// Every panel in narrative order.
    pub const ALL: [Panel; 5] = [
        Panel::Onset,
        Panel::Evasion,
        Panel::Haze,
        Panel::Emergency,
        Panel::Blackout,
    ];

    /// Promille band within which the panel is shown.
    ///
    /// Bands may overlap; each panel is evaluated independently against the
    /// current level.
    #[must_use]
    pub const fn band(self) -> PromilleBand {
        match self {
            Panel::Onset => PromilleBand::between(0.2, 0.8),
            Panel::Evasion => PromilleBand::between(0.8, 1.5),
            Panel::Haze => PromilleBand::between(1.2, 1.5),
            Panel::Emergency => PromilleBand::between(1.5, 1.8),
            Panel::Blackout => PromilleBand::from(1.8),
        }
    }
}

/// Half-open promille interval that drives panel visibility.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PromilleBand {
    lo: f32,
    hi: Option<f32>,
}

impl PromilleBand {
    /// Band covering `[lo, hi)`.
    #[must_use]
    pub const fn between(lo: f32, hi: f32) -> Self {
        Self { lo, hi: Some(hi) }
    }

    /// Unbounded band covering `[lo, ∞)`.
    #[must_use]
    pub const fn from(lo: f32) -> Self {
        Self { lo, hi: None }
    }

    /// Inclusive lower edge of the band.
    #[must_use]
    pub const fn lo(&self) -> f32 {
        self.lo
    }

    /// Exclusive upper edge of the band, if bounded.
    #[must_use]
    pub const fn hi(&self) -> Option<f32> {
        self.hi
    }

    /// Reports whether the level falls inside the band.
    #[must_use]
    pub fn contains(&self, promille: Promille) -> bool {
        let value = promille.get();
        match self.hi {
            Some(hi) => value >= self.lo && value < hi,
            None => value >= self.lo,
        }
    }
}

/// Names given to the keypoints the coordinator consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeypointLabel {
    /// Tip of the index finger reported by the hand model.
    IndexFingerTip,
    /// Nose landmark reported by the body-pose model.
    Nose,
}

/// Single named keypoint with its detection confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    label: KeypointLabel,
    position: Point,
    confidence: f32,
}

impl Keypoint {
    /// Creates a new keypoint record.
    #[must_use]
    pub const fn new(label: KeypointLabel, position: Point, confidence: f32) -> Self {
        Self {
            label,
            position,
            confidence,
        }
    }

    /// Name assigned to the keypoint by the detection model.
    #[must_use]
    pub const fn label(&self) -> KeypointLabel {
        self.label
    }

    /// Position of the keypoint in camera coordinates.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Detection confidence in `[0, 1]`.
    #[must_use]
    pub const fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// One detected hand and its keypoints for a single capture tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandFrame {
    keypoints: Vec<Keypoint>,
}

impl HandFrame {
    /// Creates a hand frame from the detector's keypoint list.
    #[must_use]
    pub fn from_keypoints(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Index fingertip position, if the detector reported one.
    #[must_use]
    pub fn index_tip(&self) -> Option<Point> {
        self.keypoints
            .iter()
            .find(|keypoint| keypoint.label() == KeypointLabel::IndexFingerTip)
            .map(Keypoint::position)
    }
}

/// One detected body pose and its keypoints for a single capture tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseFrame {
    keypoints: Vec<Keypoint>,
}

impl PoseFrame {
    /// Creates a pose frame from the detector's keypoint list.
    #[must_use]
    pub fn from_keypoints(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Nose keypoint, if the detector reported one.
    #[must_use]
    pub fn nose(&self) -> Option<&Keypoint> {
        self.keypoints
            .iter()
            .find(|keypoint| keypoint.label() == KeypointLabel::Nose)
    }
}

/// Commands that express all permissible stage mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Announces the viewport dimensions, initially and on resize.
    ConfigureViewport {
        /// Current size of the hosting viewport.
        viewport: Viewport,
    },
    /// Delivers a scroll-linked progress sample.
    UpdateProgress {
        /// Normalized scroll position.
        progress: Progress,
    },
    /// Advances the stage clock by the provided delta time.
    Tick {
        /// Time elapsed since the previous tick.
        dt: Duration,
    },
    /// Delivers the latest fingertip positions in mirrored camera space.
    PointerSample {
        /// Raw fingertip position for this tick.
        raw: Point,
        /// Deliberately lagged fingertip position used for emergency
        /// collision checks.
        delayed: Point,
    },
    /// Signals that no fingertip is currently detected.
    PointerLost,
}

/// What finally set the countdown dot expanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpansionTrigger {
    /// The countdown deadline passed.
    Expiry,
    /// The lagged pointer reached the dot after the deadline.
    Touch,
}

/// Events broadcast by the stage after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the stage clock advanced.
    TimeAdvanced {
        /// Time elapsed during the tick.
        dt: Duration,
    },
    /// Reports the promille level derived from the latest progress sample.
    PromilleChanged {
        /// Newly derived level.
        promille: Promille,
    },
    /// A panel entered its visible band.
    PanelShown {
        /// Panel that became visible.
        panel: Panel,
    },
    /// A panel left its visible band or was suppressed.
    PanelHidden {
        /// Panel that became hidden.
        panel: Panel,
    },
    /// The draggable marker snapped to the fingertip.
    MarkerDragged {
        /// Marker position after the snap.
        to: Point,
    },
    /// The evasion target fled from the marker.
    TargetFled {
        /// Target position after the flee step.
        to: Point,
    },
    /// The evasion warning overlay became visible.
    EvasionWarningShown,
    /// Marker and target centers aligned; the explosion animation started.
    TargetExplosionStarted,
    /// The explosion finished; the evasion beat is permanently complete.
    EvasionCompleted,
    /// The emergency countdown began running.
    CountdownStarted {
        /// Clock value at which the countdown expires.
        deadline: Duration,
    },
    /// The emergency countdown was cleared without expanding.
    CountdownCleared,
    /// The countdown dot began expanding.
    DotExpansionStarted {
        /// Branch that fired the expansion.
        trigger: ExpansionTrigger,
    },
    /// The expanding dot covered the viewport; the takeover is latched.
    TakeoverLatched,
    /// Decorative surfaces went dark after the takeover delay.
    SurfacesDarkened,
    /// The terminal panel took over the viewport; scrolling is frozen.
    BlackoutRevealed,
    /// Surfaces hidden by an interrupted takeover were restored.
    SurfacesRestored,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    #[test]
    fn promille_ramps_linearly_until_saturation() {
        for step in 0..=75 {
            let p = step as f32 / 100.0;
            let expected = (p / RAMP_PROGRESS) * MAX_PROMILLE;
            let actual = Promille::from_progress(Progress::new(p)).get();
            assert!(
                (actual - expected).abs() < 1e-5,
                "progress {p} mapped to {actual}, expected {expected}"
            );
        }
    }

    #[test]
    fn promille_saturates_past_the_ramp() {
        for p in [0.76, 0.8, 0.9, 1.0] {
            assert_eq!(
                Promille::from_progress(Progress::new(p)),
                Promille::MAX,
                "progress {p} should saturate"
            );
        }
    }

    #[test]
    fn progress_clamps_out_of_range_input() {
        assert_eq!(Progress::new(-0.5).get(), 0.0);
        assert_eq!(Progress::new(1.5).get(), 1.0);
        assert_eq!(Progress::new(f32::NAN).get(), 0.0);
    }

    #[test]
    fn units_follow_the_unit_boundaries() {
        assert_eq!(Promille::new(0.19).units(), 0);
        assert_eq!(Promille::new(0.2).units(), 1);
        assert_eq!(Promille::new(1.8).units(), 9);
    }

    #[test]
    fn units_never_decrease_with_rising_promille() {
        let mut previous = 0;
        for step in 0..=180 {
            let units = Promille::new(step as f32 / 100.0).units();
            assert!(units >= previous, "units regressed at {step}");
            previous = units;
        }
    }

    #[test]
    fn panel_bands_match_the_narrative_thresholds() {
        let level = Promille::new(1.0);
        assert!(!Panel::Onset.band().contains(level));
        assert!(Panel::Evasion.band().contains(level));
        assert!(!Panel::Haze.band().contains(level));

        let overlap = Promille::new(1.3);
        assert!(Panel::Evasion.band().contains(overlap));
        assert!(Panel::Haze.band().contains(overlap));

        assert!(Panel::Blackout.band().contains(Promille::MAX));
        assert!(Panel::Blackout.band().contains(Promille::new(99.0)));
    }

    #[test]
    fn band_edges_are_half_open() {
        let band = Panel::Onset.band();
        assert!(band.contains(Promille::new(0.2)));
        assert!(!band.contains(Promille::new(0.8)));
    }

    #[test]
    fn hand_frame_exposes_the_index_tip() {
        let frame = HandFrame::from_keypoints(vec![Keypoint::new(
            KeypointLabel::IndexFingerTip,
            Point::new(10.0, 20.0),
            0.9,
        )]);
        assert_eq!(frame.index_tip(), Some(Point::new(10.0, 20.0)));
        assert_eq!(HandFrame::default().index_tip(), None);
    }

    #[test]
    fn pose_frame_exposes_the_nose() {
        let nose = Keypoint::new(KeypointLabel::Nose, Point::new(512.0, 300.0), 0.8);
        let frame = PoseFrame::from_keypoints(vec![nose]);
        assert_eq!(frame.nose().map(Keypoint::position), Some(nose.position()));
        assert!(PoseFrame::default().nose().is_none());
    }

    #[test]
    fn point_distance_is_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f32::EPSILON);
        assert!((b.distance(a) - 5.0).abs() < f32::EPSILON);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: serde::Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn point_round_trips_through_bincode() {
        assert_round_trip(&Point::new(512.0, 384.0));
    }

    #[test]
    fn viewport_round_trips_through_bincode() {
        assert_round_trip(&Viewport::new(1920.0, 1080.0));
    }

    #[test]
    fn panel_round_trips_through_bincode() {
        assert_round_trip(&Panel::Emergency);
    }
}
