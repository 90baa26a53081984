//! Metric extraction: flatten nested iteration records into dotted metric paths.
//!
//! Traversal uses an explicit worklist instead of recursion and stops descending past
//! [`MAX_DEPTH`] levels, so hostile inputs cannot exhaust the stack.

use loadgate_types::{IterationRecord, ERROR_MARKER, FAILED_MARKER};
use serde_json::Value;
use std::collections::BTreeMap;

/// Nesting levels below the iteration root that are still inspected.
pub const MAX_DEPTH: usize = 32;

/// Visit every non-object leaf of an iteration with its dot-joined path.
///
/// Arrays are leaves (they are never descended into). Top-level failure markers are skipped.
/// Within one object, keys are visited in map order.
pub fn visit_leaves<F>(iteration: &IterationRecord, mut visit: F)
where
    F: FnMut(&str, &Value),
{
    let mut stack: Vec<(String, &serde_json::Map<String, Value>, usize)> =
        vec![(String::new(), iteration, 0)];

    while let Some((prefix, map, depth)) = stack.pop() {
        // Push children in reverse so they pop in key order.
        for (key, value) in map.iter().rev() {
            if depth == 0 && (key == FAILED_MARKER || key == ERROR_MARKER) {
                continue;
            }
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                Value::Object(child) => {
                    if depth < MAX_DEPTH {
                        stack.push((path, child, depth + 1));
                    }
                }
                leaf => visit(&path, leaf),
            }
        }
    }
}

/// The value as a finite `f64`, if it is a JSON number that fits.
pub fn finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Append every finite numeric leaf of one iteration to its metric sequence.
pub fn extract_metrics(iteration: &IterationRecord, into: &mut BTreeMap<String, Vec<f64>>) {
    visit_leaves(iteration, |path, value| {
        if let Some(v) = finite_number(value) {
            match into.get_mut(path) {
                Some(seq) => seq.push(v),
                None => {
                    into.insert(path.to_string(), vec![v]);
                }
            }
        }
    });
}

/// Merge many iterations into one ordered sequence per metric path.
pub fn collect_metrics<'a, I>(iterations: I) -> BTreeMap<String, Vec<f64>>
where
    I: IntoIterator<Item = &'a IterationRecord>,
{
    let mut out = BTreeMap::new();
    for iteration in iterations {
        extract_metrics(iteration, &mut out);
    }
    out
}
