//! Identifier-name statistics.
//!
//! Average name length per binding kind and the share of one-character
//! identifiers; heavily minified code scores short on both.

use crate::features::reporting::domain::report::CodeStats;
use crate::features::scoping::domain::{BindingKind, ScopeTree};

pub fn compute_code_stats(scopes: &[&ScopeTree]) -> CodeStats {
    let mut variables = LengthBucket::default();
    let mut functions = LengthBucket::default();
    let mut parameters = LengthBucket::default();
    let mut one_char = 0usize;
    let mut total = 0usize;

    for scope_tree in scopes {
        for binding in &scope_tree.bindings {
            let bucket = match binding.kind {
                BindingKind::Var | BindingKind::Let | BindingKind::Const => &mut variables,
                BindingKind::Function | BindingKind::FunctionExpressionName => &mut functions,
                BindingKind::Parameter => &mut parameters,
                _ => continue,
            };
            let len = binding.name.chars().count();
            bucket.add(len);
            total += 1;
            if len == 1 {
                one_char += 1;
            }
        }
    }

    CodeStats {
        avg_variable_name_length: variables.average(),
        avg_function_name_length: functions.average(),
        avg_parameter_name_length: parameters.average(),
        one_character_identifier_percentage: if total == 0 {
            -1.0
        } else {
            100.0 * one_char as f64 / total as f64
        },
    }
}

#[derive(Default)]
struct LengthBucket {
    sum: usize,
    count: usize,
}

impl LengthBucket {
    fn add(&mut self, len: usize) {
        self.sum += len;
        self.count += 1;
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            -1.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}
