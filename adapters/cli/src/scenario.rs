//! Scenario files that script a headless blackout session.
//!
//! A scenario is a TOML timeline: scroll keyframes, scripted hand gestures,
//! and session parameters. The bundled demo scenario walks the entire
//! narrative from the first panel to the takeover.

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading a scenario file.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The scenario file could not be read from disk.
    #[error("could not read scenario file: {0}")]
    Io(#[from] std::io::Error),
    /// The scenario file was not valid TOML for the expected schema.
    #[error("could not parse scenario file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A step was scheduled before its predecessor.
    #[error("step {index} at {at}s is scheduled before its predecessor")]
    OutOfOrder {
        /// Zero-based index of the offending step.
        index: usize,
        /// Timestamp carried by the offending step.
        at: f32,
    },
    /// The scenario contains no steps at all.
    #[error("scenario has no steps")]
    Empty,
}

/// Session parameters for a scripted run.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Session {
    /// Viewport dimensions presented to the stage.
    #[serde(default = "default_viewport")]
    pub(crate) viewport: [f32; 2],
    /// Fixed tick rate the session runs at.
    #[serde(default = "default_tick_hz")]
    pub(crate) tick_hz: u32,
    /// Seed for the synthetic fingertip jitter.
    #[serde(default)]
    pub(crate) seed: u64,
    /// Wall-clock length of the session in seconds.
    pub(crate) duration: f32,
}

fn default_viewport() -> [f32; 2] {
    [1280.0, 720.0]
}

fn default_tick_hz() -> u32 {
    60
}

/// Hand gesture gliding the fingertip to a detector-space position.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HandMove {
    /// Destination x in detector coordinates.
    pub(crate) x: f32,
    /// Destination y in detector coordinates.
    pub(crate) y: f32,
    /// Seconds the glide takes; zero teleports.
    #[serde(default)]
    pub(crate) over: f32,
}

/// Hand gesture homing in on the evasion target.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ChaseMove {
    /// Approach speed in camera units per tick.
    pub(crate) speed: f32,
}

/// One timeline entry.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Step {
    /// Session time the step fires at, in seconds.
    pub(crate) at: f32,
    /// Scroll keyframe delivered to the stage.
    #[serde(default)]
    pub(crate) progress: Option<f32>,
    /// Glide gesture starting at this step.
    #[serde(default)]
    pub(crate) hand: Option<HandMove>,
    /// Chase gesture starting at this step.
    #[serde(default)]
    pub(crate) chase: Option<ChaseMove>,
    /// Removes the hand from the frame.
    #[serde(default)]
    pub(crate) hand_off: bool,
}

/// Complete scripted session.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Session parameters.
    pub(crate) session: Session,
    /// Timeline entries in chronological order.
    #[serde(rename = "step", default)]
    pub(crate) steps: Vec<Step>,
}

impl Scenario {
    /// Loads and validates a scenario from the provided path.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses and validates a scenario from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.steps.is_empty() {
            return Err(ScenarioError::Empty);
        }

        let mut previous = 0.0_f32;
        for (index, step) in self.steps.iter().enumerate() {
            if step.at < previous {
                return Err(ScenarioError::OutOfOrder {
                    index,
                    at: step.at,
                });
            }
            previous = step.at;
        }

        Ok(())
    }

    /// Built-in demo walking the full narrative: onset, a fast approach that
    /// spooks the target, a slow chase that captures it, then the emergency
    /// countdown through to the takeover.
    pub(crate) fn demo() -> Self {
        Self {
            session: Session {
                viewport: default_viewport(),
                tick_hz: default_tick_hz(),
                seed: 7,
                duration: 26.0,
            },
            steps: vec![
                Step {
                    at: 0.0,
                    progress: Some(0.11),
                    ..Step::default()
                },
                Step {
                    at: 1.0,
                    progress: Some(0.45),
                    ..Step::default()
                },
                Step {
                    at: 1.5,
                    hand: Some(HandMove {
                        x: 512.0,
                        y: 384.0,
                        over: 0.0,
                    }),
                    ..Step::default()
                },
                // Rush at the target; it should flee and raise the warning.
                Step {
                    at: 2.0,
                    hand: Some(HandMove {
                        x: 724.0,
                        y: 320.0,
                        over: 0.4,
                    }),
                    ..Step::default()
                },
                // Creep up on it instead, slow enough not to spook it.
                Step {
                    at: 3.0,
                    chase: Some(ChaseMove { speed: 3.5 }),
                    ..Step::default()
                },
                Step {
                    at: 10.0,
                    progress: Some(0.67),
                    ..Step::default()
                },
                Step {
                    at: 10.5,
                    hand: Some(HandMove {
                        x: 324.0,
                        y: 400.0,
                        over: 1.0,
                    }),
                    ..Step::default()
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_scenario() {
        let scenario = Scenario::parse(
            r#"
            [session]
            duration = 5.0

            [[step]]
            at = 0.0
            progress = 0.45

            [[step]]
            at = 2.0
            hand = { x = 512.0, y = 384.0, over = 0.5 }

            [[step]]
            at = 4.0
            hand_off = true
            "#,
        )
        .expect("scenario should parse");

        assert_eq!(scenario.session.tick_hz, 60);
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[0].progress, Some(0.45));
        assert!(scenario.steps[2].hand_off);
    }

    #[test]
    fn rejects_steps_out_of_order() {
        let error = Scenario::parse(
            r#"
            [session]
            duration = 5.0

            [[step]]
            at = 2.0

            [[step]]
            at = 1.0
            "#,
        )
        .expect_err("out-of-order steps should be rejected");

        assert!(matches!(error, ScenarioError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn rejects_an_empty_timeline() {
        let error = Scenario::parse(
            r#"
            [session]
            duration = 5.0
            "#,
        )
        .expect_err("empty scenarios should be rejected");

        assert!(matches!(error, ScenarioError::Empty));
    }

    #[test]
    fn rejects_unknown_fields() {
        let error = Scenario::parse(
            r#"
            [session]
            duration = 5.0
            camera = "rear"

            [[step]]
            at = 0.0
            "#,
        )
        .expect_err("unknown fields should be rejected");

        assert!(matches!(error, ScenarioError::Parse(_)));
    }

    #[test]
    fn demo_scenario_is_valid() {
        Scenario::demo().validate().expect("demo must validate");
    }
}
