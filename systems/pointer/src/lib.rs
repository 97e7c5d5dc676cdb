#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns raw hand frames into pointer commands.
//!
//! Fingertips arrive in unmirrored camera coordinates; interaction happens in
//! the mirrored frame the participant sees. This system mirrors the fingertip,
//! advances the deliberately lagged pointer used for emergency collision
//! checks, and emits one pointer command per tick.

use std::time::Duration;

use blackout_core::{CameraDimensions, Command, HandFrame, Point};

/// Lag applied to the delayed pointer while the emergency panel is up.
const EMERGENCY_LAG: Duration = Duration::from_millis(1500);

/// Lag applied to the delayed pointer everywhere else.
const DEFAULT_LAG: Duration = Duration::from_millis(400);

/// Pointer system owning the lagged-fingertip interpolation state.
#[derive(Debug, Default)]
pub struct Pointer {
    delayed: Option<Point>,
}

impl Pointer {
    /// Creates a pointer system with no fingertip seen yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the latest hand frames and emits a pointer command.
    ///
    /// The first hand exposing an index fingertip wins the tick; with no
    /// fingertip in sight a `PointerLost` is emitted and the lagged position
    /// is retained for the next detection.
    pub fn handle(
        &mut self,
        hands: &[HandFrame],
        camera: CameraDimensions,
        emergency_visible: bool,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let Some(tip) = hands.iter().find_map(HandFrame::index_tip) else {
            out.push(Command::PointerLost);
            return;
        };

        let raw = Point::new(camera.width() - tip.x(), tip.y());
        let lag = if emergency_visible {
            EMERGENCY_LAG
        } else {
            DEFAULT_LAG
        };

        let delayed = match self.delayed {
            // The very first detection snaps; there is nothing to lag from.
            None => raw,
            Some(current) => advance(current, raw, dt, lag),
        };
        self.delayed = Some(delayed);

        out.push(Command::PointerSample { raw, delayed });
    }
}

/// Moves `current` toward `target` by the fraction of the lag that elapsed.
fn advance(current: Point, target: Point, dt: Duration, lag: Duration) -> Point {
    if lag.is_zero() {
        return target;
    }

    let fraction = (dt.as_secs_f32() / lag.as_secs_f32()).clamp(0.0, 1.0);
    Point::new(
        current.x() + (target.x() - current.x()) * fraction,
        current.y() + (target.y() - current.y()) * fraction,
    )
}
