#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative coordinator state for the blackout experience.
//!
//! The [`Stage`] owns every flag and entity the narrative depends on: panel
//! visibility, the drag-and-evade beat, the emergency countdown, and the
//! terminal takeover latch. Input systems and adapters mutate it exclusively
//! through [`apply`] and observe it through [`query`]. All timing is measured
//! against a clock advanced by `Command::Tick`, so tests can step the whole
//! experience deterministically.

mod emergency;
mod evasion;

use std::time::Duration;

use blackout_core::{
    CameraDimensions, Command, Event, Panel, Point, Progress, Promille, Viewport,
};
use emergency::{Emergency, Takeover};
use evasion::Evasion;

const DEFAULT_VIEWPORT: Viewport = Viewport::new(1280.0, 720.0);

/// Latest fingertip positions retained between ticks.
#[derive(Clone, Copy, Debug)]
struct PointerState {
    raw: Point,
    delayed: Point,
}

#[derive(Clone, Copy, Debug, Default)]
struct PanelFlags([bool; 5]);

impl PanelFlags {
    const fn index(panel: Panel) -> usize {
        match panel {
            Panel::Onset => 0,
            Panel::Evasion => 1,
            Panel::Haze => 2,
            Panel::Emergency => 3,
            Panel::Blackout => 4,
        }
    }

    fn is_visible(&self, panel: Panel) -> bool {
        self.0[Self::index(panel)]
    }

    fn set(&mut self, panel: Panel, visible: bool) {
        self.0[Self::index(panel)] = visible;
    }
}

/// Represents the authoritative coordinator state.
#[derive(Debug)]
pub struct Stage {
    viewport: Viewport,
    camera: CameraDimensions,
    progress: Progress,
    promille: Promille,
    clock: Duration,
    panels: PanelFlags,
    pointer: Option<PointerState>,
    evasion: Evasion,
    emergency: Emergency,
    takeover: Takeover,
}

impl Stage {
    /// Creates a stage at the top of the page with nothing visible yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            viewport: DEFAULT_VIEWPORT,
            camera: CameraDimensions::DEFAULT,
            progress: Progress::ZERO,
            promille: Promille::default(),
            clock: Duration::ZERO,
            panels: PanelFlags::default(),
            pointer: None,
            evasion: Evasion::new(),
            emergency: Emergency::new(),
            takeover: Takeover::default(),
        }
    }

    fn recompute_panels(&mut self, out_events: &mut Vec<Event>) {
        for panel in Panel::ALL {
            let mut should_show = panel.band().contains(self.promille);
            if panel == Panel::Evasion && self.evasion.complete {
                should_show = false;
            }

            let was_visible = self.panels.is_visible(panel);
            if should_show == was_visible {
                continue;
            }

            self.panels.set(panel, should_show);
            if should_show {
                out_events.push(Event::PanelShown { panel });
                if panel == Panel::Emergency {
                    self.enter_emergency(out_events);
                }
            } else {
                out_events.push(Event::PanelHidden { panel });
                if panel == Panel::Emergency {
                    self.emergency.clear_countdown(out_events);
                }
            }
        }
    }

    fn enter_emergency(&mut self, out_events: &mut Vec<Event>) {
        self.emergency.arm(self.clock, out_events);
        self.takeover.reset(out_events);
    }

    fn force_takeover_panels(&mut self, out_events: &mut Vec<Event>) {
        for panel in Panel::ALL {
            let visible = self.panels.is_visible(panel);
            match panel {
                Panel::Blackout => {
                    if !visible {
                        self.panels.set(panel, true);
                        out_events.push(Event::PanelShown { panel });
                    }
                }
                _ => {
                    if visible {
                        self.panels.set(panel, false);
                        out_events.push(Event::PanelHidden { panel });
                        if panel == Panel::Emergency {
                            self.emergency.clear_countdown(out_events);
                        }
                    }
                }
            }
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the stage, mutating state deterministically.
pub fn apply(stage: &mut Stage, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureViewport { viewport } => {
            stage.viewport = viewport;
        }
        Command::UpdateProgress { progress } => {
            if stage.takeover.latched {
                return;
            }

            stage.progress = progress;
            stage.promille = Promille::from_progress(progress);
            out_events.push(Event::PromilleChanged {
                promille: stage.promille,
            });
            stage.recompute_panels(out_events);
        }
        Command::PointerSample { raw, delayed } => {
            stage.pointer = Some(PointerState { raw, delayed });

            if stage.panels.is_visible(Panel::Evasion) {
                stage.evasion.drag(raw, out_events);
            }
            if stage.panels.is_visible(Panel::Emergency) {
                stage.emergency.probe(delayed, stage.clock, out_events);
            }
        }
        Command::PointerLost => {
            stage.pointer = None;
        }
        Command::Tick { dt } => {
            stage.clock = stage.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });

            if stage.panels.is_visible(Panel::Evasion) {
                let completed = stage
                    .evasion
                    .tick(dt, stage.camera, stage.clock, out_events);
                if completed {
                    stage.panels.set(Panel::Evasion, false);
                    out_events.push(Event::PanelHidden {
                        panel: Panel::Evasion,
                    });
                }
            }

            if stage.panels.is_visible(Panel::Emergency) {
                let covered = stage
                    .emergency
                    .tick(stage.clock, stage.viewport, out_events);
                if covered && !stage.takeover.latched {
                    stage.takeover.latch(stage.clock, out_events);
                    stage.force_takeover_panels(out_events);
                }
            }

            stage.takeover.tick(stage.clock, out_events);
        }
    }
}

/// Query functions that provide read-only access to the stage state.
pub mod query {
    use std::time::Duration;

    use super::{evasion, PanelFlags, Stage};
    use blackout_core::{CameraDimensions, Panel, Point, Progress, Promille, Viewport};

    /// Current viewport dimensions.
    #[must_use]
    pub fn viewport(stage: &Stage) -> Viewport {
        stage.viewport
    }

    /// Camera frame dimensions that interaction coordinates are expressed in.
    #[must_use]
    pub fn camera(stage: &Stage) -> CameraDimensions {
        stage.camera
    }

    /// Latest scroll progress sample.
    #[must_use]
    pub fn progress(stage: &Stage) -> Progress {
        stage.progress
    }

    /// Promille level derived from the latest progress sample.
    #[must_use]
    pub fn promille(stage: &Stage) -> Promille {
        stage.promille
    }

    /// Accumulated stage clock.
    #[must_use]
    pub fn clock(stage: &Stage) -> Duration {
        stage.clock
    }

    /// Captures the current visibility of every panel.
    #[must_use]
    pub fn panels(stage: &Stage) -> PanelVisibility {
        PanelVisibility {
            flags: stage.panels,
        }
    }

    /// Captures a read-only view of the drag-and-evade beat.
    #[must_use]
    pub fn evasion(stage: &Stage) -> EvasionSnapshot {
        let explosion = stage
            .evasion
            .explosion_values()
            .map(|values| ExplosionSnapshot {
                scale: values.scale,
                opacity: values.opacity,
                blur: values.blur,
            });

        EvasionSnapshot {
            marker: stage.evasion.marker.map(|marker| MarkerSnapshot {
                position: marker.position,
                radius: evasion::MARKER_RADIUS,
            }),
            target: TargetSnapshot {
                position: stage.evasion.target.position,
                radius: evasion::TARGET_RADIUS,
                visible: stage.evasion.target.visible,
                explosion,
            },
            complete: stage.evasion.complete,
            warning_visible: stage.evasion.warning_visible(stage.clock),
        }
    }

    /// Captures a read-only view of the emergency beat.
    ///
    /// The countdown is populated only while the dot is armed and a hand is
    /// currently detected, which is exactly when the display should show it.
    #[must_use]
    pub fn emergency(stage: &Stage) -> EmergencySnapshot {
        let dot = stage.emergency.dot;
        let armed = stage.emergency.countdown_running()
            && dot.visible
            && !dot.expanding
            && stage.panels.is_visible(Panel::Emergency);
        let countdown = if armed && stage.pointer.is_some() {
            stage
                .emergency
                .remaining(stage.clock)
                .map(|remaining| CountdownSnapshot { remaining })
        } else {
            None
        };

        EmergencySnapshot {
            dot: DotSnapshot {
                position: dot.position,
                radius: super::emergency::DOT_RADIUS,
                current_radius: dot.current_radius,
                visible: dot.visible,
                expanding: dot.expanding,
            },
            countdown,
        }
    }

    /// Stage of the terminal takeover sequence.
    #[must_use]
    pub fn takeover_phase(stage: &Stage) -> TakeoverPhase {
        if stage.takeover.revealed {
            TakeoverPhase::Revealed
        } else if stage.takeover.darkened {
            TakeoverPhase::Darkened
        } else if stage.takeover.latched {
            TakeoverPhase::Latched
        } else {
            TakeoverPhase::Inactive
        }
    }

    /// Latest fingertip positions, if a hand is currently detected.
    #[must_use]
    pub fn pointer(stage: &Stage) -> Option<PointerSnapshot> {
        stage.pointer.map(|pointer| PointerSnapshot {
            raw: pointer.raw,
            delayed: pointer.delayed,
        })
    }

    /// Read-only visibility flags for every panel.
    #[derive(Clone, Copy, Debug)]
    pub struct PanelVisibility {
        flags: PanelFlags,
    }

    impl PanelVisibility {
        /// Reports whether the provided panel is currently visible.
        #[must_use]
        pub fn is_visible(&self, panel: Panel) -> bool {
            self.flags.is_visible(panel)
        }

        /// Enumerates the currently visible panels in narrative order.
        #[must_use]
        pub fn visible_panels(&self) -> Vec<Panel> {
            Panel::ALL
                .into_iter()
                .filter(|panel| self.flags.is_visible(*panel))
                .collect()
        }
    }

    /// Immutable representation of the draggable marker.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct MarkerSnapshot {
        /// Marker center in camera coordinates.
        pub position: Point,
        /// Marker radius in camera units.
        pub radius: f32,
    }

    /// Immutable representation of the evading target.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct TargetSnapshot {
        /// Target center in camera coordinates.
        pub position: Point,
        /// Target radius in camera units.
        pub radius: f32,
        /// Whether the target is currently drawn at all.
        pub visible: bool,
        /// Explosion animation values while the explosion is running.
        pub explosion: Option<ExplosionSnapshot>,
    }

    /// Eased explosion animation values.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ExplosionSnapshot {
        /// Scale multiplier applied to the target radius.
        pub scale: f32,
        /// Opacity of the target outline.
        pub opacity: f32,
        /// Additional blur applied to the target, in screen units.
        pub blur: f32,
    }

    /// Immutable representation of the drag-and-evade beat.
    #[derive(Clone, Copy, Debug)]
    pub struct EvasionSnapshot {
        /// Draggable marker, absent once the beat completed.
        pub marker: Option<MarkerSnapshot>,
        /// Evading target.
        pub target: TargetSnapshot,
        /// Whether the beat has permanently completed.
        pub complete: bool,
        /// Whether the evasion warning overlay is currently shown.
        pub warning_visible: bool,
    }

    /// Immutable representation of the countdown dot.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct DotSnapshot {
        /// Dot center in camera coordinates.
        pub position: Point,
        /// Resting dot radius in camera units.
        pub radius: f32,
        /// Radius the dot currently occupies, growing during expansion.
        pub current_radius: f32,
        /// Whether the dot is currently drawn at all.
        pub visible: bool,
        /// Whether the dot is expanding toward the takeover.
        pub expanding: bool,
    }

    /// Countdown display values while the countdown should be shown.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CountdownSnapshot {
        /// Time left until the deadline.
        pub remaining: Duration,
    }

    /// Immutable representation of the emergency beat.
    #[derive(Clone, Copy, Debug)]
    pub struct EmergencySnapshot {
        /// Countdown dot.
        pub dot: DotSnapshot,
        /// Countdown display, populated only while it should be visible.
        pub countdown: Option<CountdownSnapshot>,
    }

    /// Stages of the terminal takeover sequence, in order.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum TakeoverPhase {
        /// No takeover has been latched.
        Inactive,
        /// The dot covered the viewport; delays are counting down.
        Latched,
        /// Decorative surfaces have gone dark.
        Darkened,
        /// The terminal panel owns the viewport; scrolling is frozen.
        Revealed,
    }

    /// Latest fingertip positions.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PointerSnapshot {
        /// Raw fingertip position for this tick.
        pub raw: Point,
        /// Deliberately lagged fingertip position.
        pub delayed: Point,
    }
}
