//! Phase and step definitions.

use serde::{Deserialize, Serialize};

use crate::core::{EngineError, EngineResult, PhaseId, StepId};
use crate::effects::Effect;
use crate::ledger::DisplayInfo;

/// One step of a phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: StepId,
    #[serde(default)]
    pub display: DisplayInfo,
    /// Trigger points collected and run when the step executes, in order.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Run after the triggers.
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl StepDefinition {
    pub fn new(id: impl Into<StepId>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            triggers: Vec::new(),
            effects: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.triggers.push(trigger.into());
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: Vec<Effect>) -> Self {
        self.effects = effects;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseDefinition {
    pub id: PhaseId,
    #[serde(default)]
    pub display: DisplayInfo,
    /// The phase in which the active player performs actions.
    #[serde(default)]
    pub action: bool,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl PhaseDefinition {
    pub fn new(id: impl Into<PhaseId>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            action: false,
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn action_phase(mut self) -> Self {
        self.action = true;
        self
    }

    #[must_use]
    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.id.as_str() == id)
    }

    /// Step ids must be unique within the phase.
    pub fn validate(&self) -> EngineResult<()> {
        for (index, step) in self.steps.iter().enumerate() {
            if self.steps[..index].iter().any(|earlier| earlier.id == step.id) {
                return Err(EngineError::duplicate("step", format!("{}.{}", self.id, step.id)));
            }
        }
        Ok(())
    }
}
