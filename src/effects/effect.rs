//! Effect trees.
//!
//! Effects are declarative content data:
//!
//! ```json
//! { "type": "resource", "method": "add", "params": { "key": "gold", "amount": 2 } }
//! ```
//!
//! A node is one of three shapes (see [`EffectShape`]):
//!
//! - **Plain**: `type` + `method`, dispatched to a registered handler.
//! - **Scaled**: an `evaluator` whose count scales the nested `effects`.
//! - **Malformed**: neither; skipped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::numeric::RoundingMode;
use crate::core::{EngineError, EngineResult};
use crate::stats::{SourceLink, StatSourceFrame};

/// Effect method. `Add` and `Remove` are each other's inverse; every
/// other method is its own inverse.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    Add,
    Remove,
    Other(String),
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Method::Add => "add",
            Method::Remove => "remove",
            Method::Other(name) => name,
        }
    }

    /// The method that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Method {
        match self {
            Method::Add => Method::Remove,
            Method::Remove => Method::Add,
            Method::Other(name) => Method::Other(name.clone()),
        }
    }
}

impl From<String> for Method {
    fn from(name: String) -> Self {
        match name.as_str() {
            "add" => Method::Add,
            "remove" => Method::Remove,
            _ => Method::Other(name),
        }
    }
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        Method::from(name.to_string())
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form effect parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key)?.as_f64()
    }

    /// Required string param.
    pub fn require_str(&self, effect: &str, key: &str) -> EngineResult<&str> {
        match self.0.get(key) {
            None | Some(Value::Null) => Err(missing(effect, key)),
            Some(value) => value.as_str().ok_or_else(|| invalid(effect, key, "a string")),
        }
    }

    /// Required numeric param.
    pub fn require_number(&self, effect: &str, key: &str) -> EngineResult<f64> {
        self.optional_number(effect, key)?
            .ok_or_else(|| missing(effect, key))
    }

    /// Optional numeric param; present-but-not-a-number is an error.
    pub fn optional_number(&self, effect: &str, key: &str) -> EngineResult<Option<f64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| invalid(effect, key, "a number")),
        }
    }

    /// Optional string param; present-but-not-a-string is an error.
    pub fn optional_str(&self, effect: &str, key: &str) -> EngineResult<Option<&str>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| invalid(effect, key, "a string")),
        }
    }

    /// Deserialize a structured param.
    pub fn decode<T: serde::de::DeserializeOwned>(
        &self,
        effect: &str,
        key: &str,
        expected: &'static str,
    ) -> EngineResult<Option<T>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|_| invalid(effect, key, expected)),
        }
    }
}

fn missing(effect: &str, key: &str) -> EngineError {
    EngineError::MissingParam {
        effect: effect.to_string(),
        param: key.to_string(),
    }
}

fn invalid(effect: &str, key: &str, expected: &'static str) -> EngineError {
    EngineError::InvalidParam {
        effect: effect.to_string(),
        param: key.to_string(),
        expected,
    }
}

/// An evaluator reference: `{ "type": "development", "params": { "id": "farm" } }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

impl EvaluatorSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Params::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Key evaluation modifiers target: `"<type>:<id>"`, or just the type
    /// when the params carry no `id`.
    #[must_use]
    pub fn target_key(&self) -> String {
        match self.params.str("id") {
            Some(id) => format!("{}:{id}", self.kind),
            None => self.kind.clone(),
        }
    }

    /// Frame attributing nested stat changes to what this evaluator counts.
    #[must_use]
    pub fn dependency_frame(&self) -> StatSourceFrame {
        let id = ["id", "role", "key"].iter().find_map(|key| self.params.str(key));
        let link = SourceLink {
            kind: self.kind.clone(),
            id: id.map(str::to_string),
            detail: self.params.str("detail").map(str::to_string),
        };
        StatSourceFrame::default().depending_on(link)
    }
}

/// A node in an effect tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<EvaluatorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<StatSourceFrame>,
}

/// Classification of an effect node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectShape<'a> {
    Plain { kind: &'a str, method: &'a Method },
    Scaled(&'a EvaluatorSpec),
    Malformed,
}

impl Effect {
    /// A plain `type:method` effect.
    pub fn new(kind: impl Into<String>, method: impl Into<Method>) -> Self {
        Self {
            kind: Some(kind.into()),
            method: Some(method.into()),
            ..Self::default()
        }
    }

    /// An evaluator-scaled group.
    #[must_use]
    pub fn scaled(evaluator: EvaluatorSpec, effects: Vec<Effect>) -> Self {
        Self {
            evaluator: Some(evaluator),
            effects,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: Vec<Effect>) -> Self {
        self.effects = effects;
        self
    }

    #[must_use]
    pub fn with_round(mut self, round: RoundingMode) -> Self {
        self.round = Some(round);
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: StatSourceFrame) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Classify this node. An evaluator makes the node scaled even if
    /// `type`/`method` are also present.
    #[must_use]
    pub fn shape(&self) -> EffectShape<'_> {
        match (&self.evaluator, &self.kind, &self.method) {
            (Some(evaluator), _, _) => EffectShape::Scaled(evaluator),
            (None, Some(kind), Some(method)) => EffectShape::Plain { kind, method },
            _ => EffectShape::Malformed,
        }
    }

    /// `"type:method"`, used in error messages and default source keys.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}:{}",
            self.kind.as_deref().unwrap_or("?"),
            self.method.as_ref().map_or("?", Method::as_str)
        )
    }

    /// This effect with every `add`/`remove` method flipped, recursively.
    #[must_use]
    pub fn inverted(&self) -> Effect {
        Effect {
            method: self.method.as_ref().map(Method::inverse),
            effects: invert_all(&self.effects),
            ..self.clone()
        }
    }
}

/// Invert a whole effect list.
#[must_use]
pub fn invert_all(effects: &[Effect]) -> Vec<Effect> {
    effects.iter().map(Effect::inverted).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serde() {
        let method: Method = serde_json::from_str("\"add\"").unwrap();
        assert_eq!(method, Method::Add);
        let method: Method = serde_json::from_str("\"transfer\"").unwrap();
        assert_eq!(method, Method::Other("transfer".into()));
        assert_eq!(serde_json::to_string(&Method::Remove).unwrap(), "\"remove\"");
    }

    #[test]
    fn test_shape() {
        let plain = Effect::new("resource", Method::Add);
        assert!(matches!(plain.shape(), EffectShape::Plain { kind: "resource", .. }));

        let scaled = Effect::scaled(EvaluatorSpec::new("population"), vec![plain.clone()]);
        assert!(matches!(scaled.shape(), EffectShape::Scaled(_)));

        let malformed = Effect {
            kind: Some("resource".into()),
            ..Effect::default()
        };
        assert_eq!(malformed.shape(), EffectShape::Malformed);
    }

    #[test]
    fn test_inverted_is_recursive() {
        let tree = Effect::scaled(
            EvaluatorSpec::new("development").with_param("id", "farm"),
            vec![
                Effect::new("resource", Method::Add),
                Effect::new("resource", "transfer"),
            ],
        );

        let inverted = tree.inverted();
        assert_eq!(inverted.effects[0].method, Some(Method::Remove));
        assert_eq!(inverted.effects[1].method, Some(Method::Other("transfer".into())));
        assert_eq!(inverted.inverted(), tree);
    }

    #[test]
    fn test_target_key() {
        let farm = EvaluatorSpec::new("development").with_param("id", "farm");
        assert_eq!(farm.target_key(), "development:farm");
        assert_eq!(EvaluatorSpec::new("population").target_key(), "population");
    }

    #[test]
    fn test_dependency_frame() {
        let spec = EvaluatorSpec::new("population").with_param("role", "council");
        let frame = spec.dependency_frame();
        assert_eq!(frame.depends_on, vec![SourceLink::new("population", "council")]);
    }

    #[test]
    fn test_effect_from_json() {
        let json = r#"{
            "evaluator": { "type": "development", "params": { "id": "farm" } },
            "effects": [
                { "type": "resource", "method": "add", "params": { "key": "gold", "amount": 2 } }
            ]
        }"#;
        let effect: Effect = serde_json::from_str(json).unwrap();

        assert!(matches!(effect.shape(), EffectShape::Scaled(_)));
        assert_eq!(effect.effects[0].params.str("key"), Some("gold"));
        assert_eq!(effect.effects[0].params.number("amount"), Some(2.0));
    }

    #[test]
    fn test_param_errors() {
        let effect = Effect::new("resource", Method::Add).with_param("amount", "two");
        assert!(matches!(
            effect.params.require_number("resource:add", "amount"),
            Err(EngineError::InvalidParam { .. })
        ));
        assert!(matches!(
            effect.params.require_str("resource:add", "key"),
            Err(EngineError::MissingParam { .. })
        ));
    }
}
