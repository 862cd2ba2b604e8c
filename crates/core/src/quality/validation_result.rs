use serde::{Deserialize, Serialize};

/// Why a frame was accepted or rejected.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Validated,
    MultipleOrNoFaces,
    PoseOutOfRange,
    LowLight,
}

impl ReasonCode {
    pub const ALL: &[ReasonCode] = &[
        ReasonCode::Validated,
        ReasonCode::MultipleOrNoFaces,
        ReasonCode::PoseOutOfRange,
        ReasonCode::LowLight,
    ];

    pub fn text(&self) -> &'static str {
        match self {
            ReasonCode::Validated => "Face validated successfully",
            ReasonCode::MultipleOrNoFaces => "Multiple or no faces detected",
            ReasonCode::PoseOutOfRange => "Face not straight",
            ReasonCode::LowLight => "Poor lighting",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// The verdict for one evaluated frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub accepted: bool,
    pub reason: ReasonCode,
}

impl ValidationResult {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: ReasonCode::Validated,
        }
    }

    pub fn rejected(reason: ReasonCode) -> Self {
        Self {
            accepted: false,
            reason,
        }
    }

    pub fn reason_text(&self) -> &'static str {
        self.reason.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_texts() {
        assert_eq!(ReasonCode::Validated.text(), "Face validated successfully");
        assert_eq!(
            ReasonCode::MultipleOrNoFaces.text(),
            "Multiple or no faces detected"
        );
        assert_eq!(ReasonCode::PoseOutOfRange.text(), "Face not straight");
        assert_eq!(ReasonCode::LowLight.text(), "Poor lighting");
    }

    #[test]
    fn test_accepted_and_rejected() {
        let ok = ValidationResult::accepted();
        assert!(ok.accepted);
        assert_eq!(ok.reason_text(), "Face validated successfully");

        let dark = ValidationResult::rejected(ReasonCode::LowLight);
        assert!(!dark.accepted);
        assert_eq!(dark.reason.to_string(), "Poor lighting");
    }

    #[test]
    fn test_serializes_reason_as_snake_case() {
        let json = serde_json::to_string(&ValidationResult::rejected(ReasonCode::PoseOutOfRange))
            .unwrap();
        assert_eq!(json, r#"{"accepted":false,"reason":"pose_out_of_range"}"#);
    }
}
