use stream_api::{ReplayId, ReplayPreset};

use crate::error::EngineError;

/// Global replay settings, validated once at startup.
///
/// A `ReplayPolicy` always satisfies: `preset == Custom` iff `replay_id`
/// is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayPolicy {
    preset: ReplayPreset,
    replay_id: Option<ReplayId>,
}

impl ReplayPolicy {
    pub fn new(preset: ReplayPreset, replay_id: Option<ReplayId>) -> Result<Self, EngineError> {
        validate(preset, replay_id.as_ref())?;
        Ok(Self { preset, replay_id })
    }

    pub fn preset(&self) -> ReplayPreset {
        self.preset
    }

    pub fn replay_id(&self) -> Option<&ReplayId> {
        self.replay_id.as_ref()
    }
}

/// Check that the preset and the replay id agree.
pub fn validate(preset: ReplayPreset, replay_id: Option<&ReplayId>) -> Result<(), EngineError> {
    match (preset, replay_id) {
        (ReplayPreset::Custom, Some(_)) => Ok(()),
        (ReplayPreset::Custom, None) => Err(EngineError::Config(
            "replay_id must be set when replay_preset is CUSTOM".into(),
        )),
        (preset, Some(_)) => Err(EngineError::Config(format!(
            "replay_id must not be set when replay_preset is {preset}"
        ))),
        (_, None) => Ok(()),
    }
}
