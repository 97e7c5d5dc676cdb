#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a scripted blackout session.
//!
//! The driver synthesizes the external collaborators a browser would provide:
//! scroll keyframes, a wandering fingertip with seeded jitter, and a swaying
//! nose pose. Everything else runs through the real stage, systems, and
//! presentation crates, with milestone events traced to stdout.

mod scenario;

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use blackout_core::{
    Command, Event, HandFrame, Keypoint, KeypointLabel, Panel, Point, PoseFrame, Progress,
    Viewport,
};
use blackout_presentation::compose;
use blackout_stage::{apply, query, Stage};
use blackout_system_head_drift::HeadDrift;
use blackout_system_pointer::Pointer;
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scenario::Scenario;

/// Pixels of seeded jitter applied to the synthetic fingertip. Kept small so
/// a scripted creep stays below the evasion speed threshold.
const JITTER_AMPLITUDE: f32 = 0.5;

/// Confidence reported for every synthetic keypoint.
const SYNTHETIC_CONFIDENCE: f32 = 0.95;

/// Headless driver that replays a scripted blackout session.
#[derive(Debug, Parser)]
#[command(name = "blackout", about = "Replay a scripted blackout session")]
struct Args {
    /// Path to a TOML scenario; the bundled demo runs when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Also trace per-tick drag and flee events.
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => Scenario::demo(),
    };
    run(&scenario, args.verbose);
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct Glide {
    from: Point,
    to: Point,
    start: f32,
    over: f32,
}

/// Synthetic hand driven by the scenario timeline, in detector coordinates.
#[derive(Debug, Default)]
struct HandScript {
    position: Option<Point>,
    glide: Option<Glide>,
    chase_speed: Option<f32>,
}

impl HandScript {
    fn begin_glide(&mut self, destination: Point, over: f32, now: f32) {
        self.chase_speed = None;
        if over <= 0.0 || self.position.is_none() {
            self.position = Some(destination);
            self.glide = None;
            return;
        }
        self.glide = Some(Glide {
            from: self.position.unwrap_or(destination),
            to: destination,
            start: now,
            over,
        });
    }

    fn begin_chase(&mut self, speed: f32) {
        self.glide = None;
        self.chase_speed = Some(speed);
    }

    fn drop_hand(&mut self) {
        self.position = None;
        self.glide = None;
        self.chase_speed = None;
    }

    fn advance(&mut self, now: f32, stage: &Stage) {
        if let Some(glide) = self.glide {
            let t = ((now - glide.start) / glide.over).clamp(0.0, 1.0);
            self.position = Some(Point::new(
                glide.from.x() + (glide.to.x() - glide.from.x()) * t,
                glide.from.y() + (glide.to.y() - glide.from.y()) * t,
            ));
            if t >= 1.0 {
                self.glide = None;
            }
            return;
        }

        let Some(speed) = self.chase_speed else {
            return;
        };
        let snapshot = query::evasion(stage);
        let (Some(position), Some(_marker)) = (self.position, snapshot.marker) else {
            self.chase_speed = None;
            return;
        };
        if !snapshot.target.visible {
            self.chase_speed = None;
            return;
        }

        // The stage reports mirrored coordinates; the detector sees the
        // unmirrored frame, so flip x before steering toward the target.
        let camera = query::camera(stage);
        let goal = Point::new(
            camera.width() - snapshot.target.position.x(),
            snapshot.target.position.y(),
        );
        let remaining = position.distance(goal);
        if remaining <= speed {
            self.position = Some(goal);
            return;
        }
        self.position = Some(Point::new(
            position.x() + (goal.x() - position.x()) / remaining * speed,
            position.y() + (goal.y() - position.y()) / remaining * speed,
        ));
    }
}

fn run(scenario: &Scenario, verbose: bool) {
    let session = scenario.session;
    let mut stage = Stage::new();
    let mut events = Vec::new();
    apply(
        &mut stage,
        Command::ConfigureViewport {
            viewport: Viewport::new(session.viewport[0], session.viewport[1]),
        },
        &mut events,
    );

    let mut pointer = Pointer::new();
    let mut head = HeadDrift::new();
    let mut hand = HandScript::default();
    let mut rng = ChaCha8Rng::seed_from_u64(session.seed);

    let dt = Duration::from_secs_f32(1.0 / session.tick_hz as f32);
    let total_ticks = (session.duration * session.tick_hz as f32).ceil() as u64;
    let camera = query::camera(&stage);
    let mut next_step = 0;
    let mut now = 0.0_f32;
    let mut revealed = false;

    for tick in 0..total_ticks {
        now = tick as f32 / session.tick_hz as f32;

        while let Some(step) = scenario.steps.get(next_step) {
            if step.at > now {
                break;
            }
            if let Some(progress) = step.progress {
                apply(
                    &mut stage,
                    Command::UpdateProgress {
                        progress: Progress::new(progress),
                    },
                    &mut events,
                );
            }
            if let Some(hand_move) = step.hand {
                hand.begin_glide(Point::new(hand_move.x, hand_move.y), hand_move.over, now);
            }
            if let Some(chase) = step.chase {
                hand.begin_chase(chase.speed);
            }
            if step.hand_off {
                hand.drop_hand();
            }
            next_step += 1;
        }

        hand.advance(now, &stage);

        let hands: Vec<HandFrame> = hand
            .position
            .map(|position| {
                let jittered = Point::new(
                    position.x() + rng.gen_range(-JITTER_AMPLITUDE..=JITTER_AMPLITUDE),
                    position.y() + rng.gen_range(-JITTER_AMPLITUDE..=JITTER_AMPLITUDE),
                );
                HandFrame::from_keypoints(vec![Keypoint::new(
                    KeypointLabel::IndexFingerTip,
                    jittered,
                    SYNTHETIC_CONFIDENCE,
                )])
            })
            .into_iter()
            .collect();

        let poses = vec![PoseFrame::from_keypoints(vec![Keypoint::new(
            KeypointLabel::Nose,
            Point::new(
                camera.width() / 2.0 + (now * 0.4).sin() * 60.0,
                camera.height() / 2.0 + (now * 0.3).cos() * 30.0,
            ),
            0.9,
        )])];
        head.handle(&poses, camera, dt);

        let emergency_visible = query::panels(&stage).is_visible(Panel::Emergency);
        let mut commands = Vec::new();
        pointer.handle(&hands, camera, emergency_visible, dt, &mut commands);
        for command in commands {
            apply(&mut stage, command, &mut events);
        }
        apply(&mut stage, Command::Tick { dt }, &mut events);

        for event in events.drain(..) {
            if matches!(event, Event::BlackoutRevealed) {
                revealed = true;
            }
            if let Some(line) = describe(&event, verbose) {
                println!("[{now:7.3}s] {line}");
            }
        }

        if revealed {
            break;
        }
    }

    let scene = compose(&stage, head.influence(query::progress(&stage)));
    println!("session finished at {now:.3}s");
    println!("takeover phase: {:?}", query::takeover_phase(&stage));
    println!(
        "visible panels: {:?}",
        query::panels(&stage).visible_panels()
    );
    println!(
        "final scene: {} shapes, field {}, promille {}",
        scene.shapes.len(),
        if scene.field_visible { "on" } else { "off" },
        scene.overlays.promille_text
    );
}

fn describe(event: &Event, verbose: bool) -> Option<String> {
    match event {
        Event::TimeAdvanced { .. } | Event::PromilleChanged { .. } => None,
        Event::MarkerDragged { to } => verbose
            .then(|| format!("marker dragged to ({:.0}, {:.0})", to.x(), to.y())),
        Event::TargetFled { to } => {
            verbose.then(|| format!("target fled to ({:.0}, {:.0})", to.x(), to.y()))
        }
        Event::PanelShown { panel } => Some(format!("panel shown: {panel:?}")),
        Event::PanelHidden { panel } => Some(format!("panel hidden: {panel:?}")),
        Event::EvasionWarningShown => Some("evasion warning shown".to_owned()),
        Event::TargetExplosionStarted => Some("target explosion started".to_owned()),
        Event::EvasionCompleted => Some("evasion beat complete".to_owned()),
        Event::CountdownStarted { deadline } => Some(format!(
            "countdown started, expires at stage clock {:.1}s",
            deadline.as_secs_f32()
        )),
        Event::CountdownCleared => Some("countdown cleared".to_owned()),
        Event::DotExpansionStarted { trigger } => {
            Some(format!("dot expansion started ({trigger:?})"))
        }
        Event::TakeoverLatched => Some("takeover latched".to_owned()),
        Event::SurfacesDarkened => Some("surfaces darkened".to_owned()),
        Event::BlackoutRevealed => Some("blackout revealed".to_owned()),
        Event::SurfacesRestored => Some("surfaces restored".to_owned()),
    }
}
