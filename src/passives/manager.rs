//! Installed passives.
//!
//! A passive is a named effect bundle owned by one player. Installing it
//! runs its effects under a stat-source frame naming the passive; removing
//! it runs the same effects with every `add`/`remove` flipped under the
//! same frames, then forgets the record.
//!
//! Records are keyed `"<id>_<owner index>"`, so the same passive can be
//! installed once per player.

use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::modifiers::ModifierRegistry;
use crate::core::{
    ActivePlayerScope, EngineResult, FrameScope, GameContext, PassiveId, PhaseId, PlayerId, StepId,
};
use crate::effects::{execute_effects, invert_all, Effect};
use crate::stats::{Longevity, SourceLink, StatSourceFrame};

/// Record key for `id` owned by `owner`.
#[must_use]
pub fn passive_key(id: &str, owner: PlayerId) -> String {
    format!("{id}_{}", owner.index())
}

/// Display metadata carried on a passive record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// What installed the passive (a tier, a building, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLink>,
    /// How the passive goes away.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal: Option<String>,
}

/// A phase step reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRef {
    pub phase: PhaseId,
    pub step: StepId,
}

/// Phases and steps skipped while the passive is installed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipFlags {
    #[serde(default)]
    pub phases: Vec<PhaseId>,
    #[serde(default)]
    pub steps: Vec<StepRef>,
}

impl SkipFlags {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty() && self.steps.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassiveDefinition {
    pub id: PassiveId,
    #[serde(flatten)]
    pub meta: PassiveMetadata,
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Effects run by the phase driver at named trigger points.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub triggers: BTreeMap<String, Vec<Effect>>,
    #[serde(default, skip_serializing_if = "SkipFlags::is_empty")]
    pub skip: SkipFlags,
}

impl PassiveDefinition {
    pub fn new(id: impl Into<PassiveId>, effects: Vec<Effect>) -> Self {
        Self {
            id: id.into(),
            meta: PassiveMetadata::default(),
            effects,
            triggers: BTreeMap::new(),
            skip: SkipFlags::default(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.meta.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>, effects: Vec<Effect>) -> Self {
        self.triggers.insert(trigger.into(), effects);
        self
    }

    #[must_use]
    pub fn skipping_phase(mut self, phase: impl Into<PhaseId>) -> Self {
        self.skip.phases.push(phase.into());
        self
    }

    #[must_use]
    pub fn skipping_step(mut self, phase: impl Into<PhaseId>, step: impl Into<StepId>) -> Self {
        self.skip.steps.push(StepRef {
            phase: phase.into(),
            step: step.into(),
        });
        self
    }
}

/// Options for [`add_passive`].
#[derive(Clone, Debug, Default)]
pub struct AddPassiveOptions {
    /// Defaults to the active player.
    pub owner: Option<PlayerId>,
    /// Extra frames pushed outside the passive's own frame.
    pub frames: Vec<StatSourceFrame>,
    /// Overrides the definition's detail.
    pub detail: Option<String>,
    /// Merged into the passive's own frame.
    pub meta: Option<StatSourceFrame>,
    /// What installed the passive.
    pub source: Option<SourceLink>,
}

impl AddPassiveOptions {
    #[must_use]
    pub fn owned_by(owner: PlayerId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame: StatSourceFrame) -> Self {
        self.frames.push(frame);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: SourceLink) -> Self {
        self.source = Some(source);
        self
    }
}

/// An installed passive.
#[derive(Clone, Debug, PartialEq)]
pub struct PassiveRecord {
    pub key: String,
    pub owner: PlayerId,
    pub definition: PassiveDefinition,
    /// Frames active at install, outermost first, ending with `frame`.
    pub frames: Vec<StatSourceFrame>,
    /// The passive's own attribution frame.
    pub frame: StatSourceFrame,
    pub meta: PassiveMetadata,
}

impl PassiveRecord {
    #[must_use]
    pub fn id(&self) -> &PassiveId {
        &self.definition.id
    }

    /// Effects bound to `trigger`, if any.
    #[must_use]
    pub fn trigger_effects(&self, trigger: &str) -> Option<&[Effect]> {
        self.definition.triggers.get(trigger).map(Vec::as_slice)
    }
}

/// Installed passives plus the modifier registries.
#[derive(Clone, Debug, Default)]
pub struct PassiveManager {
    records: OrdMap<String, PassiveRecord>,
    modifiers: ModifierRegistry,
}

impl PassiveManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Records ===

    #[must_use]
    pub fn get(&self, id: &str, owner: PlayerId) -> Option<&PassiveRecord> {
        self.records.get(&passive_key(id, owner))
    }

    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&PassiveRecord> {
        self.records.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut PassiveRecord> {
        self.records.get_mut(key)
    }

    #[must_use]
    pub fn contains(&self, id: &str, owner: PlayerId) -> bool {
        self.records.contains_key(&passive_key(id, owner))
    }

    /// Installed passives in key order, optionally for one owner.
    #[must_use]
    pub fn list(&self, owner: Option<PlayerId>) -> Vec<&PassiveRecord> {
        self.records
            .values()
            .filter(|record| owner.is_none_or(|owner| record.owner == owner))
            .collect()
    }

    fn insert(&mut self, record: PassiveRecord) {
        self.records.insert(record.key.clone(), record);
    }

    fn take(&mut self, key: &str) -> Option<PassiveRecord> {
        self.records.remove(key)
    }

    // === Modifiers ===

    #[must_use]
    pub fn modifiers(&self) -> &ModifierRegistry {
        &self.modifiers
    }

    pub(crate) fn modifiers_mut(&mut self) -> &mut ModifierRegistry {
        &mut self.modifiers
    }
}

/// Install a passive and run its effects. Returns the record key.
///
/// Installing a passive that is already present for the owner removes the
/// old record first.
pub fn add_passive(
    ctx: &mut GameContext,
    definition: PassiveDefinition,
    options: AddPassiveOptions,
) -> EngineResult<String> {
    let owner = options.owner.unwrap_or_else(|| ctx.active_player());
    let key = passive_key(definition.id.as_str(), owner);
    if ctx.passives().get_by_key(&key).is_some() {
        remove_passive(ctx, definition.id.as_str(), Some(owner))?;
    }

    let detail = options.detail.or_else(|| definition.meta.detail.clone());
    let mut frame = StatSourceFrame::new("passive", definition.id.as_str())
        .with_key(format!("passive:{key}"))
        .with_longevity(Longevity::Ongoing);
    frame.detail = detail.clone();
    if let Some(meta) = &options.meta {
        frame.merge_from(meta);
    }

    let mut pushed = options.frames;
    pushed.push(frame.clone());
    let mut frames = ctx.stat_sources().frames().to_vec();
    frames.extend(pushed.iter().cloned());

    debug!(passive = %definition.id, %owner, "installing passive");
    {
        let mut scope = ActivePlayerScope::new(ctx, owner);
        let mut scope = FrameScope::new(&mut scope, pushed);
        execute_effects(&definition.effects, &mut scope, 1.0)?;
    }

    let player = ctx.player_mut(owner);
    for phase in &definition.skip.phases {
        player.add_phase_skip(phase, &key);
    }
    for step in &definition.skip.steps {
        player.add_step_skip(&step.phase, &step.step, &key);
    }

    let meta = PassiveMetadata {
        detail,
        source: options.source,
        ..definition.meta.clone()
    };
    ctx.passives_mut().insert(PassiveRecord {
        key: key.clone(),
        owner,
        definition,
        frames,
        frame,
        meta,
    });
    Ok(key)
}

/// Remove a passive, reversing its effects. Returns `false` if it was not
/// installed.
pub fn remove_passive(ctx: &mut GameContext, id: &str, owner: Option<PlayerId>) -> EngineResult<bool> {
    let owner = owner.unwrap_or_else(|| ctx.active_player());
    let key = passive_key(id, owner);
    let Some(record) = ctx.passives_mut().take(&key) else {
        return Ok(false);
    };

    debug!(passive = %id, %owner, "removing passive");
    let player = ctx.player_mut(owner);
    for phase in &record.definition.skip.phases {
        player.remove_phase_skip(phase, &key);
    }
    for step in &record.definition.skip.steps {
        player.remove_step_skip(&step.phase, &step.step, &key);
    }

    let inverse = invert_all(&record.definition.effects);
    let mut scope = ActivePlayerScope::new(ctx, owner);
    let mut scope = FrameScope::new(&mut scope, record.frames);
    execute_effects(&inverse, &mut scope, 1.0)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passive_key() {
        assert_eq!(passive_key("radiant", PlayerId::new(1)), "radiant_1");
    }

    #[test]
    fn test_definition_from_json() {
        let json = r#"{
            "id": "drought",
            "name": "Drought",
            "detail": "Fields lie fallow",
            "effects": [],
            "triggers": { "on_upkeep_phase": [] },
            "skip": { "phases": ["growth"], "steps": [{ "phase": "upkeep", "step": "pay" }] }
        }"#;
        let def: PassiveDefinition = serde_json::from_str(json).unwrap();

        assert_eq!(def.meta.name.as_deref(), Some("Drought"));
        assert_eq!(def.skip.phases, vec![PhaseId::new("growth")]);
        assert_eq!(def.skip.steps.len(), 1);
        assert!(def.triggers.contains_key("on_upkeep_phase"));
    }
}
