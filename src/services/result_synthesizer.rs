//! Folds settled child results into a parent's output.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::domain::models::{Agent, ChildResult, Output};
use crate::services::role_catalog::{RoleCatalog, SynthesisStyle};

/// Role-aware synthesis of child results.
///
/// Failed children are counted and reported, never unwrapped.
#[derive(Debug, Clone)]
pub struct ResultSynthesizer {
    catalog: Arc<RoleCatalog>,
}

impl ResultSynthesizer {
    pub const fn new(catalog: Arc<RoleCatalog>) -> Self {
        Self { catalog }
    }

    pub fn synthesize(&self, parent: &Agent, children: &[ChildResult]) -> Output {
        let strategies = self.catalog.strategies(parent.role);
        if let Some(custom) = &strategies.custom_synthesizer {
            return custom.synthesize(parent, children);
        }

        let mut output = Map::new();
        output.insert("role".into(), json!(parent.role));
        output.insert("strategy".into(), json!(strategies.synthesis.as_str()));

        match strategies.synthesis {
            SynthesisStyle::Aggregate => {
                let results = children
                    .iter()
                    .map(|child| if child.succeeded() { child_output(child) } else { Value::Null })
                    .collect();
                output.insert("results".into(), Value::Array(results));
            }
            SynthesisStyle::BestQuality => {
                output.insert("selected".into(), best_quality(children));
            }
            SynthesisStyle::Deduplicate => {
                let mut unique: Vec<Value> = Vec::new();
                for value in completed(children) {
                    if !unique.contains(&value) {
                        unique.push(value);
                    }
                }
                output.insert("results".into(), Value::Array(unique));
            }
            SynthesisStyle::Concatenate => {
                let text = completed(children)
                    .map(|value| match value {
                        Value::String(text) => text,
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                output.insert("text".into(), Value::String(text));
            }
        }

        insert_counts(&mut output, children);
        Value::Object(output)
    }
}

fn child_output(child: &ChildResult) -> Value {
    child.output.clone().unwrap_or(Value::Null)
}

fn completed(children: &[ChildResult]) -> impl Iterator<Item = Value> + '_ {
    children.iter().filter(|child| child.succeeded()).map(child_output)
}

/// Completed child with the highest numeric `quality`; ties keep the first.
fn best_quality(children: &[ChildResult]) -> Value {
    let mut best: Option<(f64, &ChildResult)> = None;
    for child in children.iter().filter(|child| child.succeeded()) {
        let quality = child
            .output
            .as_ref()
            .and_then(|output| output.get("quality"))
            .and_then(Value::as_f64)
            .unwrap_or(f64::NEG_INFINITY);
        if best.is_none_or(|(top, _)| quality > top) {
            best = Some((quality, child));
        }
    }
    best.map_or(Value::Null, |(_, child)| child_output(child))
}

fn insert_counts(output: &mut Map<String, Value>, children: &[ChildResult]) {
    let completed = children.iter().filter(|child| child.succeeded()).count();
    let failures: Vec<Value> = children
        .iter()
        .filter(|child| !child.succeeded())
        .map(|child| {
            Value::String(
                child
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("{} child did not complete", child.role)),
            )
        })
        .collect();

    output.insert("children_total".into(), json!(children.len()));
    output.insert("children_completed".into(), json!(completed));
    output.insert("children_failed".into(), json!(failures.len()));
    output.insert("failures".into(), Value::Array(failures));
}
