//! Stat-source provenance.
//!
//! Every stat change is attributed to a named contribution. Attribution
//! comes from a stack of [`StatSourceFrame`]s pushed by whatever is running
//! the effect (a passive, an action, an evaluator branch) plus any `meta`
//! the effect itself carries.
//!
//! ## Merge rules
//!
//! Frames are folded innermost first. Scalar fields are set only if still
//! unset, `Ongoing` longevity wins over `Permanent` from any frame, and
//! `depends_on` links are appended without duplicates.

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::core::numeric::is_negligible;
use crate::core::{PlayerId, PlayerMap, StatKey};
use crate::effects::Effect;

/// How long a contribution is expected to last.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Longevity {
    #[default]
    Permanent,
    /// Lasts while its source (usually a passive) is installed.
    Ongoing,
}

/// Reference to something a contribution depends on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SourceLink {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Partial attribution metadata, either pushed as a frame or attached to
/// an effect as `meta`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSourceFrame {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longevity: Option<Longevity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<SourceLink>,
}

impl StatSourceFrame {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_longevity(mut self, longevity: Longevity) -> Self {
        self.longevity = Some(longevity);
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn depending_on(mut self, link: SourceLink) -> Self {
        self.depends_on.push(link);
        self
    }

    /// Fold `other` into `self` using the merge rules.
    pub fn merge_from(&mut self, other: &StatSourceFrame) {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }
        fill(&mut self.kind, &other.kind);
        fill(&mut self.id, &other.id);
        fill(&mut self.key, &other.key);
        fill(&mut self.detail, &other.detail);
        self.longevity = match (self.longevity, other.longevity) {
            (Some(Longevity::Ongoing), _) | (_, Some(Longevity::Ongoing)) => Some(Longevity::Ongoing),
            (current, incoming) => current.or(incoming),
        };
        for link in &other.depends_on {
            if !self.depends_on.contains(link) {
                self.depends_on.push(link.clone());
            }
        }
    }
}

/// Fully resolved attribution for one contribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSourceMeta {
    pub key: String,
    pub longevity: Longevity,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<SourceLink>,
}

/// One named contribution to a stat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatContribution {
    pub amount: f64,
    pub meta: StatSourceMeta,
}

type StatLedger = OrdMap<StatKey, OrdMap<String, StatContribution>>;

/// Per-player contribution ledgers plus the active frame stack.
#[derive(Clone, Debug)]
pub struct StatSourceTracker {
    frames: Vec<StatSourceFrame>,
    ledgers: PlayerMap<StatLedger>,
}

impl StatSourceTracker {
    #[must_use]
    pub fn new(player_count: usize) -> Self {
        Self {
            frames: Vec::new(),
            ledgers: PlayerMap::new(player_count, |_| OrdMap::new()),
        }
    }

    // === Frames ===

    /// Number of frames currently pushed.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn push_frame(&mut self, frame: StatSourceFrame) {
        self.frames.push(frame);
    }

    pub(crate) fn truncate_frames(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Frames currently pushed, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[StatSourceFrame] {
        &self.frames
    }

    // === Resolution ===

    /// Resolve attribution for a change to `stat` made by `effect`.
    ///
    /// Frames fold innermost to outermost, then the effect's own `meta`,
    /// then the defaults: key `"<type>:<method>:<stat>"`, longevity
    /// `Permanent`.
    #[must_use]
    pub fn resolve_meta(&self, effect: &Effect, stat: &StatKey) -> StatSourceMeta {
        let mut merged = StatSourceFrame::default();
        for frame in self.frames.iter().rev() {
            merged.merge_from(frame);
        }
        if let Some(meta) = &effect.meta {
            merged.merge_from(meta);
        }

        let key = merged.key.unwrap_or_else(|| {
            let kind = effect.kind.as_deref().unwrap_or_default();
            let method = effect.method.as_ref().map(ToString::to_string).unwrap_or_default();
            format!("{kind}:{method}:{stat}")
        });
        StatSourceMeta {
            key,
            longevity: merged.longevity.unwrap_or_default(),
            kind: merged.kind,
            id: merged.id,
            detail: merged.detail,
            depends_on: merged.depends_on,
        }
    }

    // === Contributions ===

    /// Merge `delta` into the contribution keyed by `meta.key`.
    ///
    /// Negligible deltas are ignored; a contribution that returns to zero
    /// is deleted.
    pub fn apply_delta(&mut self, player: PlayerId, stat: &StatKey, delta: f64, meta: StatSourceMeta) {
        if is_negligible(delta) {
            return;
        }
        let ledger = &mut self.ledgers[player];
        let mut entries = ledger.get(stat).cloned().unwrap_or_default();
        let amount = entries.get(&meta.key).map_or(0.0, |c| c.amount) + delta;
        if is_negligible(amount) {
            entries.remove(&meta.key);
        } else {
            entries.insert(meta.key.clone(), StatContribution { amount, meta });
        }
        if entries.is_empty() {
            ledger.remove(stat);
        } else {
            ledger.insert(stat.clone(), entries);
        }
    }

    /// Contributions to one stat, keyed by source key.
    pub fn contributions(
        &self,
        player: PlayerId,
        stat: &str,
    ) -> impl Iterator<Item = (&String, &StatContribution)> {
        self.ledgers[player].get(stat).into_iter().flat_map(|entries| entries.iter())
    }

    /// Every stat with at least one contribution.
    pub fn stats(&self, player: PlayerId) -> impl Iterator<Item = &StatKey> {
        self.ledgers[player].keys()
    }

    #[must_use]
    pub fn contribution(&self, player: PlayerId, stat: &str, key: &str) -> Option<&StatContribution> {
        self.ledgers[player].get(stat)?.get(key)
    }
}
