#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system deriving a parallax offset from body-pose nose tracking.
//!
//! The depth field drifts with the participant's head. Low-confidence nose
//! detections are ignored; accepted ones steer a smoothed offset that the
//! presentation layer scales up with scroll progress, so the drift grows more
//! pronounced the further the narrative has advanced.

use std::time::Duration;

use blackout_core::{CameraDimensions, Point, PoseFrame, Progress};

/// Minimum nose confidence accepted for tracking.
const CONFIDENCE_FLOOR: f32 = 0.3;

/// Full span of the drift in screen units across the camera frame.
const DRIFT_SPAN: f32 = 200.0;

/// Lag applied when steering toward a new nose position.
const LAG: Duration = Duration::from_millis(500);

/// Multiplier added to the drift per unit of scroll progress.
const PROGRESS_GAIN: f32 = 2.0;

/// Head-drift system owning the smoothed parallax offset.
#[derive(Debug, Default)]
pub struct HeadDrift {
    offset: Point,
}

impl HeadDrift {
    /// Creates a head-drift system resting at the frame center.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the latest pose frames and advances the smoothed offset.
    ///
    /// Only the first detected pose is considered; a missing or low-confidence
    /// nose leaves the offset where it was.
    pub fn handle(&mut self, poses: &[PoseFrame], camera: CameraDimensions, dt: Duration) {
        let Some(nose) = poses.first().and_then(PoseFrame::nose) else {
            return;
        };
        if nose.confidence() <= CONFIDENCE_FLOOR {
            return;
        }

        let position = nose.position();
        let target = Point::new(
            (position.x() - camera.width() / 2.0) / camera.width() * DRIFT_SPAN,
            (position.y() - camera.height() / 2.0) / camera.height() * DRIFT_SPAN,
        );

        let fraction = (dt.as_secs_f32() / LAG.as_secs_f32()).clamp(0.0, 1.0);
        self.offset = Point::new(
            self.offset.x() + (target.x() - self.offset.x()) * fraction,
            self.offset.y() + (target.y() - self.offset.y()) * fraction,
        );
    }

    /// Current smoothed parallax offset.
    #[must_use]
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Offset scaled by scroll progress for presentation.
    #[must_use]
    pub fn influence(&self, progress: Progress) -> Point {
        let gain = 1.0 + PROGRESS_GAIN * progress.get();
        Point::new(self.offset.x() * gain, self.offset.y() * gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackout_core::{Keypoint, KeypointLabel};

    const CAMERA: CameraDimensions = CameraDimensions::DEFAULT;

    fn pose_with_nose(x: f32, y: f32, confidence: f32) -> PoseFrame {
        PoseFrame::from_keypoints(vec![Keypoint::new(
            KeypointLabel::Nose,
            Point::new(x, y),
            confidence,
        )])
    }

    #[test]
    fn low_confidence_noses_are_ignored() {
        let mut drift = HeadDrift::new();
        drift.handle(
            &[pose_with_nose(1024.0, 768.0, 0.3)],
            CAMERA,
            Duration::from_secs(1),
        );
        assert_eq!(drift.offset(), Point::new(0.0, 0.0));
    }

    #[test]
    fn offset_steers_toward_the_nose() {
        let mut drift = HeadDrift::new();
        // Nose at the frame corner maps to half the drift span; a full-lag
        // tick closes the entire gap.
        drift.handle(
            &[pose_with_nose(1024.0, 768.0, 0.9)],
            CAMERA,
            Duration::from_millis(500),
        );
        assert_eq!(drift.offset(), Point::new(100.0, 100.0));
    }

    #[test]
    fn partial_ticks_close_part_of_the_gap() {
        let mut drift = HeadDrift::new();
        drift.handle(
            &[pose_with_nose(1024.0, 768.0, 0.9)],
            CAMERA,
            Duration::from_millis(250),
        );
        assert_eq!(drift.offset(), Point::new(50.0, 50.0));
    }

    #[test]
    fn centered_noses_produce_no_drift() {
        let mut drift = HeadDrift::new();
        drift.handle(
            &[pose_with_nose(512.0, 384.0, 0.9)],
            CAMERA,
            Duration::from_secs(1),
        );
        assert_eq!(drift.offset(), Point::new(0.0, 0.0));
    }

    #[test]
    fn empty_pose_streams_leave_the_offset_alone() {
        let mut drift = HeadDrift::new();
        drift.handle(
            &[pose_with_nose(1024.0, 768.0, 0.9)],
            CAMERA,
            Duration::from_millis(500),
        );
        let before = drift.offset();

        drift.handle(&[], CAMERA, Duration::from_secs(5));
        assert_eq!(drift.offset(), before);
    }

    #[test]
    fn influence_scales_with_progress() {
        let mut drift = HeadDrift::new();
        drift.handle(
            &[pose_with_nose(1024.0, 768.0, 0.9)],
            CAMERA,
            Duration::from_millis(500),
        );

        assert_eq!(drift.influence(Progress::ZERO), Point::new(100.0, 100.0));
        assert_eq!(
            drift.influence(Progress::new(1.0)),
            Point::new(300.0, 300.0)
        );
    }
}
