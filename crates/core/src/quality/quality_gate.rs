//! Ordered, short-circuiting rule chain turning one face observation and
//! one brightness sample into a verdict.

use serde::{Deserialize, Serialize};

use crate::detection::domain::face_observation::FaceObservation;
use crate::quality::brightness_estimator::BrightnessSample;
use crate::quality::validation_result::{ReasonCode, ValidationResult};
use crate::shared::constants::{MAX_POSE_ANGLE_DEGREES, MIN_BRIGHTNESS};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
    pub max_pose_angle: f64,
    pub min_brightness: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            max_pose_angle: MAX_POSE_ANGLE_DEGREES,
            min_brightness: MIN_BRIGHTNESS,
        }
    }
}

/// One link of the chain. Returns the rejection reason, or `None` to pass
/// the frame on to the next rule.
pub trait QualityRule: Send {
    fn name(&self) -> &'static str;

    fn check(&self, observation: &FaceObservation, brightness: BrightnessSample)
        -> Option<ReasonCode>;
}

/// Exactly one face must be in view.
pub struct FaceCountRule;

impl QualityRule for FaceCountRule {
    fn name(&self) -> &'static str {
        "face_count"
    }

    fn check(&self, observation: &FaceObservation, _: BrightnessSample) -> Option<ReasonCode> {
        (observation.face_count() != 1).then_some(ReasonCode::MultipleOrNoFaces)
    }
}

/// Rejects when any of yaw, pitch or roll is strictly beyond the limit.
pub struct PoseRule {
    max_angle: f64,
}

impl PoseRule {
    pub fn new(max_angle: f64) -> Self {
        Self { max_angle }
    }
}

impl QualityRule for PoseRule {
    fn name(&self) -> &'static str {
        "pose"
    }

    fn check(&self, observation: &FaceObservation, _: BrightnessSample) -> Option<ReasonCode> {
        observation
            .pose()
            .filter(|pose| pose.exceeds(self.max_angle))
            .map(|_| ReasonCode::PoseOutOfRange)
    }
}

/// Rejects frames strictly darker than the minimum.
pub struct BrightnessRule {
    min_brightness: f64,
}

impl BrightnessRule {
    pub fn new(min_brightness: f64) -> Self {
        Self { min_brightness }
    }
}

impl QualityRule for BrightnessRule {
    fn name(&self) -> &'static str {
        "brightness"
    }

    fn check(&self, _: &FaceObservation, brightness: BrightnessSample) -> Option<ReasonCode> {
        (brightness.value() < self.min_brightness).then_some(ReasonCode::LowLight)
    }
}

/// Stateless decision engine. The first failing rule decides the verdict;
/// a frame passing every rule is accepted.
pub struct QualityGate {
    rules: Vec<Box<dyn QualityRule>>,
}

impl QualityGate {
    /// Face count, then pose, then brightness.
    pub fn new(thresholds: GateThresholds) -> Self {
        Self {
            rules: vec![
                Box::new(FaceCountRule),
                Box::new(PoseRule::new(thresholds.max_pose_angle)),
                Box::new(BrightnessRule::new(thresholds.min_brightness)),
            ],
        }
    }

    /// Appends `rule` after every rule already installed.
    pub fn with_rule(mut self, rule: Box<dyn QualityRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn evaluate(
        &self,
        observation: &FaceObservation,
        brightness: BrightnessSample,
    ) -> ValidationResult {
        self.rules
            .iter()
            .find_map(|rule| rule.check(observation, brightness))
            .map_or_else(ValidationResult::accepted, ValidationResult::rejected)
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(GateThresholds::default())
    }
}
