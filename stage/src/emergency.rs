//! Countdown-and-touch interaction and the takeover sequencer.

use std::time::Duration;

use blackout_core::{Event, ExpansionTrigger, Point, Viewport};

pub(crate) const DOT_START: Point = Point::new(700.0, 400.0);
pub(crate) const DOT_RADIUS: f32 = 50.0;

const COUNTDOWN_DURATION: Duration = Duration::from_secs(10);
const TOUCH_PAD: f32 = 30.0;
const EXPANSION_STEP: f32 = 50.0;
const EXPANSION_VIEWPORT_FACTOR: f32 = 2.0;

const DARKEN_DELAY: Duration = Duration::from_millis(500);
const REVEAL_DELAY: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug)]
pub(crate) struct CountdownDot {
    pub(crate) position: Point,
    pub(crate) current_radius: f32,
    pub(crate) visible: bool,
    pub(crate) expanding: bool,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Emergency {
    pub(crate) dot: CountdownDot,
    deadline: Option<Duration>,
}

impl Emergency {
    pub(crate) fn new() -> Self {
        Self {
            dot: CountdownDot {
                position: DOT_START,
                current_radius: DOT_RADIUS,
                visible: true,
                expanding: false,
            },
            deadline: None,
        }
    }

    /// Re-arms the dot on panel entry and starts the countdown if idle.
    pub(crate) fn arm(&mut self, clock: Duration, out_events: &mut Vec<Event>) {
        self.dot.visible = true;
        self.dot.expanding = false;
        self.dot.current_radius = DOT_RADIUS;

        if self.deadline.is_none() {
            let deadline = clock.saturating_add(COUNTDOWN_DURATION);
            self.deadline = Some(deadline);
            out_events.push(Event::CountdownStarted { deadline });
        }
    }

    /// Clears the countdown on panel exit; expansion state is left as-is.
    pub(crate) fn clear_countdown(&mut self, out_events: &mut Vec<Event>) {
        if self.deadline.take().is_some() {
            out_events.push(Event::CountdownCleared);
        }
    }

    /// Tests the lagged pointer against the dot.
    ///
    /// Touches are ignored until the countdown deadline has passed; the dot
    /// cannot be saved early.
    pub(crate) fn probe(&mut self, delayed: Point, clock: Duration, out_events: &mut Vec<Event>) {
        if !self.dot.visible || self.dot.expanding {
            return;
        }
        if !self.deadline_passed(clock) {
            return;
        }
        if delayed.distance(self.dot.position) < DOT_RADIUS + TOUCH_PAD {
            self.begin_expansion(ExpansionTrigger::Touch, out_events);
        }
    }

    /// Advances expiry and expansion by one tick.
    ///
    /// Returns `true` on the tick the expanded dot covers the viewport and
    /// the takeover should latch.
    pub(crate) fn tick(
        &mut self,
        clock: Duration,
        viewport: Viewport,
        out_events: &mut Vec<Event>,
    ) -> bool {
        if self.dot.visible && !self.dot.expanding && self.deadline_passed(clock) {
            self.begin_expansion(ExpansionTrigger::Expiry, out_events);
        }

        if self.dot.expanding {
            let max_radius = viewport.longest_edge() * EXPANSION_VIEWPORT_FACTOR;
            if self.dot.current_radius < max_radius {
                self.dot.current_radius += EXPANSION_STEP;
            } else {
                return true;
            }
        }

        false
    }

    /// Remaining countdown time, when the countdown is running.
    pub(crate) fn remaining(&self, clock: Duration) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_sub(clock))
    }

    pub(crate) fn countdown_running(&self) -> bool {
        self.deadline.is_some()
    }

    fn deadline_passed(&self, clock: Duration) -> bool {
        self.deadline.map_or(false, |deadline| clock >= deadline)
    }

    fn begin_expansion(&mut self, trigger: ExpansionTrigger, out_events: &mut Vec<Event>) {
        self.dot.expanding = true;
        out_events.push(Event::DotExpansionStarted { trigger });
    }
}

/// One-way terminal sequence latched when the dot covers the viewport.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Takeover {
    pub(crate) latched: bool,
    pub(crate) darkened: bool,
    pub(crate) revealed: bool,
    darken_at: Option<Duration>,
    reveal_at: Option<Duration>,
}

impl Takeover {
    /// Latches the takeover and schedules its staged deadlines.
    pub(crate) fn latch(&mut self, clock: Duration, out_events: &mut Vec<Event>) {
        self.latched = true;
        self.darken_at = Some(clock.saturating_add(DARKEN_DELAY));
        self.reveal_at = Some(clock.saturating_add(DARKEN_DELAY + REVEAL_DELAY));
        out_events.push(Event::TakeoverLatched);
    }

    /// Fires staged deadlines that the clock has reached.
    pub(crate) fn tick(&mut self, clock: Duration, out_events: &mut Vec<Event>) {
        if !self.latched {
            return;
        }

        if !self.darkened {
            if let Some(darken_at) = self.darken_at {
                if clock >= darken_at {
                    self.darkened = true;
                    out_events.push(Event::SurfacesDarkened);
                }
            }
        }

        if self.darkened && !self.revealed {
            if let Some(reveal_at) = self.reveal_at {
                if clock >= reveal_at {
                    self.revealed = true;
                    out_events.push(Event::BlackoutRevealed);
                }
            }
        }
    }

    /// Clears staging left behind by an interrupted takeover.
    pub(crate) fn reset(&mut self, out_events: &mut Vec<Event>) {
        if self.latched || self.darkened {
            out_events.push(Event::SurfacesRestored);
        }
        *self = Self::default();
    }
}
