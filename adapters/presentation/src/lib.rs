#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Declarative presentation contracts for blackout frontends.
//!
//! [`compose`] folds the stage snapshot into a [`Scene`]: the shapes, overlay
//! text, and distortion parameters a frontend draws for one frame. Frontends
//! implement [`Present`] and stay free of coordinator logic; everything here
//! is a pure function of the stage and the injected clock, so frames can be
//! asserted in tests without a window.

use std::time::Duration;

use anyhow::Result as AnyResult;
use blackout_core::{CameraDimensions, Panel, Point, Progress, Viewport};
use blackout_stage::{query, Stage};
use glam::Vec2;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the same color with a replaced alpha channel.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }
}

const BACKGROUND: Color = Color::new(0.0, 0.0, 0.0, 1.0);
const TERMINAL_BACKGROUND: Color = Color::new(0.0, 0.0, 0.0, 1.0);
const FLICKER_BACKGROUND: Color = Color::from_rgb_u8(139, 0, 0);

const MARKER_FILL: Color = Color::new(1.0, 0.0, 0.0, 0.7);
const MARKER_STROKE: Color = Color::from_rgb_u8(255, 0, 0);
const TARGET_STROKE: Color = Color::from_rgb_u8(0, 255, 0);
const DOT_FILL: Color = Color::new(1.0, 0.0, 0.0, 0.95);
const DOT_STROKE: Color = Color::from_rgb_u8(255, 0, 0);
const PULSE_STROKE: Color = Color::new(1.0, 0.0, 0.0, 0.4);
const CURSOR_FILL: Color = Color::from_rgb_u8(0, 255, 255);
const CURSOR_STROKE: Color = Color::from_rgb_u8(0, 0, 255);

const CURSOR_RADIUS: f32 = 12.0;
const PULSE_RATE: f32 = 5.0;
const PULSE_DEPTH: f32 = 0.2;
const FLICKER_PERIOD_MS: u128 = 1000;
const FLICKER_WINDOW_MS: u128 = 100;

/// Scale factors mapping camera coordinates onto the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewScale {
    scale_x: f32,
    scale_y: f32,
}

impl ViewScale {
    /// Derives the scale factors for a viewport and camera frame pair.
    #[must_use]
    pub fn new(viewport: Viewport, camera: CameraDimensions) -> Self {
        Self {
            scale_x: viewport.width() / camera.width(),
            scale_y: viewport.height() / camera.height(),
        }
    }

    /// Projects a camera-space point into screen space.
    #[must_use]
    pub fn to_screen(&self, point: Point) -> Vec2 {
        Vec2::new(point.x() * self.scale_x, point.y() * self.scale_y)
    }

    /// Uniform scale applied to radii so circles stay circular.
    #[must_use]
    pub fn radius_scale(&self) -> f32 {
        self.scale_x.min(self.scale_y)
    }
}

/// Distortion intensities derived from scroll progress.
///
/// Each axis switches on at its own progress threshold and saturates at a
/// shared ceiling, so the field degrades in stages as the level climbs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistortionEnvelope {
    rotation: f32,
    scale: f32,
    skew: f32,
    blur: f32,
}

const ROTATION_ONSET: f32 = 0.3;
const SCALE_ONSET: f32 = 0.4;
const SKEW_ONSET: f32 = 0.5;
const DISTORTION_CEILING: f32 = 0.54;
const MAX_ROTATION: f32 = 2.5;
const DRIFT_REFERENCE: f32 = 200.0;
const WOBBLE_DEPTH: f32 = 0.3;
const SKEW_DEPTH: f32 = 0.5;
const BLUR_GAIN: f32 = 10.0;

impl DistortionEnvelope {
    /// Computes the envelope for the provided scroll progress.
    #[must_use]
    pub fn at(progress: Progress) -> Self {
        let p = progress.get();
        Self {
            rotation: ramp(p, ROTATION_ONSET).powf(1.5),
            scale: ramp(p, SCALE_ONSET).powi(2),
            skew: ramp(p, SKEW_ONSET).powi(2),
            blur: p * BLUR_GAIN,
        }
    }

    /// Blur radius applied to the field and interactive shapes.
    #[must_use]
    pub const fn blur(&self) -> f32 {
        self.blur
    }

    /// Rotation angle in radians for the provided head offset.
    #[must_use]
    pub fn rotation_angle(&self, head_offset_x: f32) -> f32 {
        head_offset_x / DRIFT_REFERENCE * MAX_ROTATION * self.rotation
    }

    /// Per-axis scale wobble at the provided clock value.
    #[must_use]
    pub fn scale_factors(&self, clock: Duration) -> Vec2 {
        let t = clock.as_secs_f32();
        Vec2::new(
            1.0 + t.sin() * WOBBLE_DEPTH * self.scale,
            1.0 + t.cos() * WOBBLE_DEPTH * self.scale,
        )
    }

    /// Per-axis skew factors at the provided clock value.
    #[must_use]
    pub fn skew_factors(&self, clock: Duration) -> Vec2 {
        let t = clock.as_secs_f32() * 2.0;
        Vec2::new(
            t.sin() * SKEW_DEPTH * self.skew,
            t.cos() * SKEW_DEPTH * self.skew,
        )
    }
}

fn ramp(progress: f32, onset: f32) -> f32 {
    if progress < onset {
        return 0.0;
    }
    ((progress - onset) / (DISTORTION_CEILING - onset)).min(1.0)
}

/// Sway applied to interactive shapes, half as strong as the field effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlaySway {
    /// Positional offset added to shape centers.
    pub offset: Vec2,
    /// Scale multiplier applied to shape radii.
    pub scale: f32,
}

const SWAY_AMPLITUDE: f32 = 50.0;
const SWAY_INTENSITY_CAP: f32 = 0.5;

impl OverlaySway {
    /// Computes the sway for the provided progress and clock values.
    #[must_use]
    pub fn at(progress: Progress, clock: Duration) -> Self {
        let t = clock.as_secs_f32();
        let intensity = (progress.get() * 0.5).min(SWAY_INTENSITY_CAP);
        Self {
            offset: Vec2::new(
                (t * 2.0).sin() * SWAY_AMPLITUDE * intensity,
                (t * 2.0).cos() * SWAY_AMPLITUDE * intensity,
            ),
            scale: 1.0 + (t * 1.5).sin() * WOBBLE_DEPTH * intensity,
        }
    }
}

/// Stroke description for outlined shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    /// Stroke color.
    pub color: Color,
    /// Stroke width in screen units.
    pub width: f32,
}

/// Drawable shape emitted for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Filled circle with an optional outline.
    Disc {
        /// Center in screen coordinates.
        center: Vec2,
        /// Radius in screen units.
        radius: f32,
        /// Fill color.
        fill: Color,
        /// Optional outline.
        stroke: Option<Stroke>,
        /// Blur radius applied when drawing.
        blur: f32,
    },
    /// Hollow circle.
    Ring {
        /// Center in screen coordinates.
        center: Vec2,
        /// Radius in screen units.
        radius: f32,
        /// Outline description.
        stroke: Stroke,
        /// Blur radius applied when drawing.
        blur: f32,
    },
}

/// Overlay text and flags shown above the field.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlays {
    /// Whether the promille/unit counters are shown at all.
    pub hud_visible: bool,
    /// Formatted promille counter, e.g. `1.3‰`.
    pub promille_text: String,
    /// Formatted unit counter.
    pub units_text: String,
    /// Formatted countdown seconds, present only while it should display.
    pub countdown_text: Option<String>,
    /// Whether the evasion warning overlay is shown.
    pub warning_visible: bool,
}

/// Complete declarative description of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Background color behind the field.
    pub background: Color,
    /// Whether the depth field is drawn at all.
    pub field_visible: bool,
    /// Head parallax offset handed through to the field renderer.
    pub head_offset: Vec2,
    /// Distortion parameters for the field transform.
    pub distortion: DistortionEnvelope,
    /// Panels currently visible, in narrative order.
    pub panels: Vec<Panel>,
    /// Interactive shapes drawn above the field.
    pub shapes: Vec<Shape>,
    /// Overlay text and flags.
    pub overlays: Overlays,
}

/// Sink that realizes composed scenes on an actual display surface.
pub trait Present {
    /// Presents a single composed frame.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}

/// Folds the current stage state into a drawable scene.
#[must_use]
pub fn compose(stage: &Stage, head_offset: Point) -> Scene {
    let clock = query::clock(stage);
    let progress = query::progress(stage);
    let promille = query::promille(stage);
    let panels = query::panels(stage);
    let phase = query::takeover_phase(stage);
    let distortion = DistortionEnvelope::at(progress);

    let darkened = matches!(
        phase,
        query::TakeoverPhase::Darkened | query::TakeoverPhase::Revealed
    );
    if darkened {
        return Scene {
            background: TERMINAL_BACKGROUND,
            field_visible: false,
            head_offset: Vec2::ZERO,
            distortion,
            panels: panels.visible_panels(),
            shapes: Vec::new(),
            overlays: Overlays {
                hud_visible: false,
                promille_text: promille_text(promille.get()),
                units_text: promille.units().to_string(),
                countdown_text: None,
                warning_visible: false,
            },
        };
    }

    let scale = ViewScale::new(query::viewport(stage), query::camera(stage));
    let sway = OverlaySway::at(progress, clock);
    let emergency_visible = panels.is_visible(Panel::Emergency);
    let mut shapes = Vec::new();

    if panels.is_visible(Panel::Evasion) {
        let evasion = query::evasion(stage);

        if evasion.target.visible {
            let (explosion_scale, opacity, explosion_blur) = evasion
                .target
                .explosion
                .map_or((1.0, 1.0, 0.0), |explosion| {
                    (explosion.scale, explosion.opacity, explosion.blur)
                });
            shapes.push(Shape::Ring {
                center: scale.to_screen(evasion.target.position) + sway.offset,
                radius: evasion.target.radius * scale.radius_scale() * sway.scale
                    * explosion_scale,
                stroke: Stroke {
                    color: TARGET_STROKE.with_alpha(opacity),
                    width: 8.0,
                },
                blur: distortion.blur() + explosion_blur,
            });
        }

        if let Some(marker) = evasion.marker {
            shapes.push(Shape::Disc {
                center: scale.to_screen(marker.position) + sway.offset,
                radius: marker.radius * scale.radius_scale() * sway.scale,
                fill: MARKER_FILL,
                stroke: Some(Stroke {
                    color: MARKER_STROKE,
                    width: 3.0,
                }),
                blur: distortion.blur(),
            });
        }
    }

    if emergency_visible {
        let emergency = query::emergency(stage);
        if emergency.dot.visible {
            let center = scale.to_screen(emergency.dot.position) + sway.offset;
            let radius = emergency.dot.current_radius * scale.radius_scale() * sway.scale;
            shapes.push(Shape::Disc {
                center,
                radius,
                fill: DOT_FILL,
                stroke: (!emergency.dot.expanding).then_some(Stroke {
                    color: DOT_STROKE,
                    width: 4.0,
                }),
                blur: distortion.blur(),
            });

            if !emergency.dot.expanding {
                let pulse = (clock.as_secs_f32() * PULSE_RATE).sin() * PULSE_DEPTH + 1.0;
                shapes.push(Shape::Ring {
                    center,
                    radius: radius * pulse,
                    stroke: Stroke {
                        color: PULSE_STROKE,
                        width: 2.0,
                    },
                    blur: distortion.blur(),
                });
            }
        }
    }

    let cursor_allowed = panels.is_visible(Panel::Evasion) || emergency_visible;
    if cursor_allowed {
        if let Some(pointer) = query::pointer(stage) {
            shapes.push(Shape::Disc {
                center: scale.to_screen(pointer.delayed),
                radius: CURSOR_RADIUS * scale.radius_scale(),
                fill: CURSOR_FILL,
                stroke: Some(Stroke {
                    color: CURSOR_STROKE,
                    width: 2.0,
                }),
                blur: distortion.blur(),
            });
        }
    }

    let countdown_text = query::emergency(stage)
        .countdown
        .map(|countdown| format!("{:.1}", countdown.remaining.as_secs_f32()));

    Scene {
        background: if emergency_visible && flicker_active(clock) {
            FLICKER_BACKGROUND
        } else {
            BACKGROUND
        },
        field_visible: true,
        head_offset: Vec2::new(head_offset.x(), head_offset.y()),
        distortion,
        panels: panels.visible_panels(),
        shapes,
        overlays: Overlays {
            hud_visible: true,
            promille_text: promille_text(promille.get()),
            units_text: promille.units().to_string(),
            countdown_text,
            warning_visible: panels.is_visible(Panel::Evasion)
                && query::evasion(stage).warning_visible,
        },
    }
}

fn promille_text(value: f32) -> String {
    format!("{value:.1}\u{2030}")
}

/// Deterministic stand-in for the emergency background strobe: one short
/// window per second.
fn flicker_active(clock: Duration) -> bool {
    clock.as_millis() % FLICKER_PERIOD_MS < FLICKER_WINDOW_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackout_core::{Command, Event, Progress};
    use blackout_stage::apply;

    fn drive(stage: &mut Stage, command: Command) {
        let mut events: Vec<Event> = Vec::new();
        apply(stage, command, &mut events);
    }

    fn scroll_to(stage: &mut Stage, progress: f32) {
        drive(
            stage,
            Command::UpdateProgress {
                progress: Progress::new(progress),
            },
        );
    }

    #[test]
    fn view_scale_projects_camera_points() {
        let scale = ViewScale::new(Viewport::new(2048.0, 1536.0), CameraDimensions::DEFAULT);
        assert_eq!(scale.to_screen(Point::new(512.0, 384.0)), Vec2::new(1024.0, 768.0));
        assert_eq!(scale.radius_scale(), 2.0);
    }

    #[test]
    fn distortion_axes_switch_on_in_stages() {
        let early = DistortionEnvelope::at(Progress::new(0.25));
        assert_eq!(early.rotation, 0.0);
        assert_eq!(early.scale, 0.0);
        assert_eq!(early.skew, 0.0);

        let mid = DistortionEnvelope::at(Progress::new(0.45));
        assert!(mid.rotation > 0.0);
        assert!(mid.scale > 0.0);
        assert_eq!(mid.skew, 0.0);
    }

    #[test]
    fn distortion_freezes_at_the_ceiling() {
        let ceiling = DistortionEnvelope::at(Progress::new(DISTORTION_CEILING));
        let beyond = DistortionEnvelope::at(Progress::new(0.9));
        assert_eq!(ceiling.rotation, beyond.rotation);
        assert_eq!(ceiling.scale, beyond.scale);
        assert_eq!(ceiling.skew, beyond.skew);
        assert_eq!(ceiling.rotation, 1.0);
    }

    #[test]
    fn blur_grows_linearly_with_progress() {
        assert_eq!(DistortionEnvelope::at(Progress::new(0.0)).blur(), 0.0);
        assert_eq!(DistortionEnvelope::at(Progress::new(0.5)).blur(), 5.0);
        assert_eq!(DistortionEnvelope::at(Progress::new(1.0)).blur(), 10.0);
    }

    #[test]
    fn unswayed_factors_are_identity_at_rest() {
        let envelope = DistortionEnvelope::at(Progress::ZERO);
        assert_eq!(envelope.scale_factors(Duration::ZERO), Vec2::new(1.0, 1.0));
        assert_eq!(envelope.skew_factors(Duration::ZERO), Vec2::ZERO);
        assert_eq!(envelope.rotation_angle(100.0), 0.0);

        let sway = OverlaySway::at(Progress::ZERO, Duration::ZERO);
        assert_eq!(sway.offset, Vec2::ZERO);
        assert_eq!(sway.scale, 1.0);
    }

    #[test]
    fn fresh_stage_composes_an_empty_scene() {
        let stage = Stage::new();
        let scene = compose(&stage, Point::new(0.0, 0.0));

        assert!(scene.field_visible);
        assert!(scene.panels.is_empty());
        assert!(scene.shapes.is_empty());
        assert_eq!(scene.overlays.promille_text, "0.0\u{2030}");
        assert_eq!(scene.overlays.units_text, "0");
    }

    #[test]
    fn evasion_band_composes_marker_and_target() {
        let mut stage = Stage::new();
        scroll_to(&mut stage, 0.45);

        let scene = compose(&stage, Point::new(0.0, 0.0));
        let rings = scene
            .shapes
            .iter()
            .filter(|shape| matches!(shape, Shape::Ring { .. }))
            .count();
        let discs = scene
            .shapes
            .iter()
            .filter(|shape| matches!(shape, Shape::Disc { .. }))
            .count();
        assert_eq!(rings, 1);
        assert_eq!(discs, 1);
    }

    #[test]
    fn overlay_counters_track_the_promille_level() {
        let mut stage = Stage::new();
        // Promille 1.3: six whole units.
        scroll_to(&mut stage, 1.3 / 2.4);

        let scene = compose(&stage, Point::new(0.0, 0.0));
        assert_eq!(scene.overlays.promille_text, "1.3\u{2030}");
        assert_eq!(scene.overlays.units_text, "6");
    }

    #[test]
    fn countdown_text_appears_with_a_detected_hand() {
        let mut stage = Stage::new();
        scroll_to(&mut stage, 0.67);
        drive(
            &mut stage,
            Command::Tick {
                dt: Duration::from_secs(2),
            },
        );

        let scene = compose(&stage, Point::new(0.0, 0.0));
        assert_eq!(scene.overlays.countdown_text, None);

        drive(
            &mut stage,
            Command::PointerSample {
                raw: Point::new(10.0, 10.0),
                delayed: Point::new(10.0, 10.0),
            },
        );
        let scene = compose(&stage, Point::new(0.0, 0.0));
        assert_eq!(scene.overlays.countdown_text.as_deref(), Some("8.0"));
    }

    #[test]
    fn darkened_takeover_blanks_the_scene() {
        let mut stage = Stage::new();
        scroll_to(&mut stage, 0.67);
        drive(
            &mut stage,
            Command::Tick {
                dt: Duration::from_secs(11),
            },
        );
        for _ in 0..200 {
            drive(
                &mut stage,
                Command::Tick {
                    dt: Duration::from_millis(16),
                },
            );
        }

        let scene = compose(&stage, Point::new(50.0, 50.0));
        assert!(!scene.field_visible);
        assert!(!scene.overlays.hud_visible);
        assert!(scene.shapes.is_empty());
        assert_eq!(scene.head_offset, Vec2::ZERO);
        assert_eq!(scene.panels, vec![Panel::Blackout]);
    }

    #[test]
    fn cursor_follows_the_delayed_pointer() {
        let mut stage = Stage::new();
        scroll_to(&mut stage, 0.45);
        drive(
            &mut stage,
            Command::PointerSample {
                raw: Point::new(200.0, 100.0),
                delayed: Point::new(180.0, 90.0),
            },
        );

        let scale = ViewScale::new(query::viewport(&stage), query::camera(&stage));
        let scene = compose(&stage, Point::new(0.0, 0.0));
        let cursor = scene.shapes.iter().find(|shape| {
            matches!(shape, Shape::Disc { fill, .. } if *fill == CURSOR_FILL)
        });
        match cursor {
            Some(Shape::Disc { center, .. }) => {
                assert_eq!(*center, scale.to_screen(Point::new(180.0, 90.0)));
            }
            other => panic!("expected a cursor disc, got {other:?}"),
        }
    }
}
