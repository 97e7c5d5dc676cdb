use std::time::Duration;

use blackout_core::{
    CameraDimensions, Command, Event, ExpansionTrigger, HandFrame, Keypoint, KeypointLabel,
    Panel, Point, Progress,
};
use blackout_stage::{apply, query, Stage};
use blackout_system_pointer::Pointer;

const TICK: Duration = Duration::from_millis(16);
const CAMERA: CameraDimensions = CameraDimensions::DEFAULT;

#[test]
fn narrative_replay_is_deterministic() {
    let first = run_narrative();
    let second = run_narrative();
    assert_eq!(first, second, "replay diverged between runs");
}

#[test]
fn narrative_replay_hits_every_milestone_in_order() {
    let log = run_narrative();

    let milestones = [
        position(&log, |event| {
            matches!(event, Event::PanelShown { panel: Panel::Onset })
        }),
        position(&log, |event| {
            matches!(event, Event::PanelShown { panel: Panel::Evasion })
        }),
        position(&log, |event| matches!(event, Event::EvasionWarningShown)),
        position(&log, |event| {
            matches!(event, Event::TargetExplosionStarted)
        }),
        position(&log, |event| matches!(event, Event::EvasionCompleted)),
        position(&log, |event| {
            matches!(event, Event::PanelShown { panel: Panel::Emergency })
        }),
        position(&log, |event| {
            matches!(event, Event::CountdownStarted { .. })
        }),
        position(&log, |event| {
            matches!(
                event,
                Event::DotExpansionStarted {
                    trigger: ExpansionTrigger::Expiry
                }
            )
        }),
        position(&log, |event| matches!(event, Event::TakeoverLatched)),
        position(&log, |event| matches!(event, Event::SurfacesDarkened)),
        position(&log, |event| matches!(event, Event::BlackoutRevealed)),
    ];

    for window in milestones.windows(2) {
        assert!(
            window[0] < window[1],
            "milestones fired out of order: {milestones:?}"
        );
    }
}

#[test]
fn narrative_replay_ends_frozen_on_the_blackout_panel() {
    let mut harness = Harness::new();
    harness.play_narrative();

    for progress in [0.0, 0.3, 0.67, 1.0] {
        let before = harness.log.len();
        harness.scroll(progress);
        assert_eq!(harness.log.len(), before, "scroll thawed a frozen stage");
        assert_eq!(
            query::panels(&harness.stage).visible_panels(),
            vec![Panel::Blackout]
        );
    }
}

fn run_narrative() -> Vec<Event> {
    let mut harness = Harness::new();
    harness.play_narrative();
    harness.log
}

fn position(log: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    log.iter()
        .position(predicate)
        .unwrap_or_else(|| panic!("milestone missing from replay log"))
}

struct Harness {
    stage: Stage,
    pointer: Pointer,
    log: Vec<Event>,
    hand: Option<Point>,
}

impl Harness {
    fn new() -> Self {
        Self {
            stage: Stage::new(),
            pointer: Pointer::new(),
            log: Vec::new(),
            hand: None,
        }
    }

    fn scroll(&mut self, progress: f32) {
        apply(
            &mut self.stage,
            Command::UpdateProgress {
                progress: Progress::new(progress),
            },
            &mut self.log,
        );
    }

    /// Runs one frame: pointer system first, then the stage tick, matching
    /// the embedder's in-frame ordering.
    fn frame(&mut self) {
        let hands: Vec<HandFrame> = self
            .hand
            .map(|tip| {
                HandFrame::from_keypoints(vec![Keypoint::new(
                    KeypointLabel::IndexFingerTip,
                    tip,
                    0.95,
                )])
            })
            .into_iter()
            .collect();

        let emergency_visible = query::panels(&self.stage).is_visible(Panel::Emergency);
        let mut commands = Vec::new();
        self.pointer
            .handle(&hands, CAMERA, emergency_visible, TICK, &mut commands);
        for command in commands {
            apply(&mut self.stage, command, &mut self.log);
        }
        apply(&mut self.stage, Command::Tick { dt: TICK }, &mut self.log);
    }

    fn frames(&mut self, count: usize) {
        for _ in 0..count {
            self.frame();
        }
    }

    fn frames_until(&mut self, limit: usize, predicate: impl Fn(&Event) -> bool) {
        for _ in 0..limit {
            let before = self.log.len();
            self.frame();
            if self.log[before..].iter().any(&predicate) {
                return;
            }
        }
        panic!("condition not reached within {limit} frames");
    }

    /// Glides the scripted hand toward a detector-space destination.
    fn glide_hand(&mut self, destination: Point, step: f32) {
        let mut guard = 0;
        loop {
            let current = self.hand.unwrap_or(destination);
            let remaining = current.distance(destination);
            self.hand = Some(if remaining <= step {
                destination
            } else {
                Point::new(
                    current.x() + (destination.x() - current.x()) / remaining * step,
                    current.y() + (destination.y() - current.y()) / remaining * step,
                )
            });
            self.frame();
            if self.hand == Some(destination) {
                return;
            }
            guard += 1;
            assert!(guard < 1_000, "glide never reached its destination");
        }
    }

    /// Creeps toward the live target position until the explosion starts.
    fn creep_onto_target(&mut self) {
        let mut guard = 0;
        loop {
            let snapshot = query::evasion(&self.stage);
            assert!(snapshot.marker.is_some(), "marker vanished mid-creep");
            let goal = Point::new(
                CAMERA.width() - snapshot.target.position.x(),
                snapshot.target.position.y(),
            );
            let current = self.hand.expect("creep requires a placed hand");
            let remaining = current.distance(goal);
            let step = 3.0_f32.min(remaining);
            self.hand = Some(if remaining <= step {
                goal
            } else {
                Point::new(
                    current.x() + (goal.x() - current.x()) / remaining * step,
                    current.y() + (goal.y() - current.y()) / remaining * step,
                )
            });

            let before = self.log.len();
            self.frame();
            if self.log[before..]
                .iter()
                .any(|event| matches!(event, Event::TargetExplosionStarted))
            {
                return;
            }
            guard += 1;
            assert!(guard < 2_000, "creep never reached the target");
        }
    }

    /// Plays the full narrative through to the revealed blackout panel.
    fn play_narrative(&mut self) {
        self.scroll(0.11);
        self.frames(5);

        self.scroll(0.45);
        // Place the hand on the marker, rush the target to spook it, then
        // creep the rest of the way.
        self.hand = Some(Point::new(512.0, 384.0));
        self.frame();
        self.glide_hand(Point::new(724.0, 300.0), 12.0);
        self.creep_onto_target();
        self.frames_until(200, |event| matches!(event, Event::EvasionCompleted));

        self.scroll(0.67);
        self.hand = Some(Point::new(
            CAMERA.width() - 700.0,
            400.0,
        ));
        self.frames_until(1_000, |event| {
            matches!(event, Event::DotExpansionStarted { .. })
        });
        self.frames_until(200, |event| matches!(event, Event::BlackoutRevealed));
    }
}
