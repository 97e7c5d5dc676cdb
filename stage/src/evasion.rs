//! Drag-and-evade interaction state owned by the stage.

use std::time::Duration;

use blackout_core::{CameraDimensions, Event, Point};

pub(crate) const MARKER_START: Point = Point::new(512.0, 384.0);
pub(crate) const MARKER_RADIUS: f32 = 40.0;
pub(crate) const TARGET_START: Point = Point::new(300.0, 300.0);
pub(crate) const TARGET_RADIUS: f32 = 60.0;

const CAPTURE_HALF_EXTENT: f32 = 50.0;
const AVOIDANCE_RADIUS: f32 = 150.0;
const SPEED_THRESHOLD: f32 = 5.0;
const FLEE_STEP: f32 = 6.0;
const BOUNDS_PAD: f32 = 20.0;
const CENTER_MATCH_TOLERANCE: f32 = 10.0;
const WARNING_DURATION: Duration = Duration::from_secs(3);

pub(crate) const EXPLOSION_DURATION: Duration = Duration::from_millis(600);
const EXPLOSION_SCALE_GAIN: f32 = 4.0;
const EXPLOSION_BLUR_MAX: f32 = 30.0;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Marker {
    pub(crate) position: Point,
    previous: Point,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Target {
    pub(crate) position: Point,
    pub(crate) visible: bool,
    explosion: Option<Explosion>,
}

#[derive(Clone, Copy, Debug)]
struct Explosion {
    elapsed: Duration,
}

/// Explosion animation values interpolated for presentation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ExplosionValues {
    pub(crate) scale: f32,
    pub(crate) opacity: f32,
    pub(crate) blur: f32,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Evasion {
    pub(crate) marker: Option<Marker>,
    pub(crate) target: Target,
    pub(crate) complete: bool,
    warning_until: Option<Duration>,
}

impl Evasion {
    pub(crate) fn new() -> Self {
        Self {
            marker: Some(Marker {
                position: MARKER_START,
                previous: MARKER_START,
            }),
            target: Target {
                position: TARGET_START,
                visible: true,
                explosion: None,
            },
            complete: false,
            warning_until: None,
        }
    }

    /// Snaps the marker to a raw fingertip landing inside its capture box.
    pub(crate) fn drag(&mut self, raw: Point, out_events: &mut Vec<Event>) {
        let Some(marker) = self.marker.as_mut() else {
            return;
        };

        let inside = (raw.x() - marker.position.x()).abs() < CAPTURE_HALF_EXTENT
            && (raw.y() - marker.position.y()).abs() < CAPTURE_HALF_EXTENT;
        if inside {
            marker.position = raw;
            out_events.push(Event::MarkerDragged { to: raw });
        }
    }

    /// Advances flee physics and the explosion animation by one tick.
    ///
    /// Returns `true` on the tick the interaction completes.
    pub(crate) fn tick(
        &mut self,
        dt: Duration,
        camera: CameraDimensions,
        clock: Duration,
        out_events: &mut Vec<Event>,
    ) -> bool {
        if self.complete {
            return false;
        }

        if let Some(explosion) = self.target.explosion.as_mut() {
            explosion.elapsed = explosion.elapsed.saturating_add(dt);
            if explosion.elapsed >= EXPLOSION_DURATION {
                self.target.visible = false;
                self.marker = None;
                self.complete = true;
                out_events.push(Event::EvasionCompleted);
                return true;
            }
            return false;
        }

        let Some(marker) = self.marker.as_mut() else {
            return false;
        };
        if !self.target.visible {
            return false;
        }

        let speed = marker.position.distance(marker.previous);
        let distance = marker.position.distance(self.target.position);

        if distance < AVOIDANCE_RADIUS && speed > SPEED_THRESHOLD {
            let (unit_x, unit_y) = if distance > f32::EPSILON {
                (
                    (self.target.position.x() - marker.position.x()) / distance,
                    (self.target.position.y() - marker.position.y()) / distance,
                )
            } else {
                // Coincident centers flee leftward.
                (-1.0, 0.0)
            };

            let margin = TARGET_RADIUS + BOUNDS_PAD;
            let fled = Point::new(
                (self.target.position.x() + unit_x * FLEE_STEP)
                    .clamp(margin, camera.width() - margin),
                (self.target.position.y() + unit_y * FLEE_STEP)
                    .clamp(margin, camera.height() - margin),
            );
            self.target.position = fled;
            out_events.push(Event::TargetFled { to: fled });

            let warning_expired = self
                .warning_until
                .map_or(true, |until| clock >= until);
            if warning_expired {
                self.warning_until = Some(clock.saturating_add(WARNING_DURATION));
                out_events.push(Event::EvasionWarningShown);
            }
        }

        marker.previous = marker.position;

        if marker.position.distance(self.target.position) < CENTER_MATCH_TOLERANCE {
            self.target.explosion = Some(Explosion {
                elapsed: Duration::ZERO,
            });
            out_events.push(Event::TargetExplosionStarted);
        }

        false
    }

    /// Current explosion animation values, if the explosion is running.
    pub(crate) fn explosion_values(&self) -> Option<ExplosionValues> {
        self.target.explosion.map(|explosion| {
            let t = (explosion.elapsed.as_secs_f32() / EXPLOSION_DURATION.as_secs_f32())
                .clamp(0.0, 1.0);
            let eased = ease_out_quad(t);
            ExplosionValues {
                scale: 1.0 + EXPLOSION_SCALE_GAIN * eased,
                opacity: 1.0 - eased,
                blur: EXPLOSION_BLUR_MAX * eased,
            }
        })
    }

    /// Reports whether the evasion warning overlay is currently shown.
    pub(crate) fn warning_visible(&self, clock: Duration) -> bool {
        self.warning_until.map_or(false, |until| clock < until)
    }
}

fn ease_out_quad(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}
