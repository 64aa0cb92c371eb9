// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Filter evaluation over attribute lists.
//!
//! Comparison semantics follow the declared type of the attribute value:
//! strings compare case-insensitively, integers numerically, booleans by
//! truth value. `>=` and `<=` are defined only for integers; on any other
//! type the item is false. A missing tag never matches.

use super::parser::{CompareOp, FilterNode};
use crate::attributes::{AttrValue, Attributes};

/// Evaluate a filter node against an attribute list.
///
/// Empty `&` and `|` lists are vacuous and evaluate to true.
pub fn evaluate(node: &FilterNode, attributes: &Attributes) -> bool {
    match node {
        FilterNode::And(children) => children.iter().all(|c| evaluate(c, attributes)),
        FilterNode::Or(children) => {
            children.is_empty() || children.iter().any(|c| evaluate(c, attributes))
        }
        FilterNode::Not(child) => !evaluate(child, attributes),
        FilterNode::Present(tag) => attributes.contains_tag(tag),
        FilterNode::Compare { tag, op, value } => match attributes.get(tag) {
            Some(values) => values.iter().any(|v| compare(v, *op, value)),
            None => false,
        },
    }
}

fn compare(attr: &AttrValue, op: CompareOp, operand: &str) -> bool {
    match op {
        CompareOp::Equal => equals(attr, operand),
        CompareOp::Ge => int_compare(attr, operand).is_some_and(|ord| ord.is_ge()),
        CompareOp::Le => int_compare(attr, operand).is_some_and(|ord| ord.is_le()),
    }
}

fn equals(attr: &AttrValue, operand: &str) -> bool {
    if operand.contains('*') {
        return wildcard_match(&attr.to_string(), operand);
    }
    match attr {
        AttrValue::String(s) => s.eq_ignore_ascii_case(operand),
        AttrValue::Integer(i) => operand.parse::<i32>() == Ok(*i),
        AttrValue::Boolean(b) => {
            operand.eq_ignore_ascii_case(if *b { "true" } else { "false" })
        }
        // Opaque operands arrive in their escaped form, which is exactly
        // how AttrValue::Opaque displays.
        AttrValue::Opaque(_) => attr.to_string().eq_ignore_ascii_case(operand),
    }
}

/// Ordering of the attribute value relative to the operand, when both are
/// integers.
fn int_compare(attr: &AttrValue, operand: &str) -> Option<std::cmp::Ordering> {
    let AttrValue::Integer(i) = attr else {
        return None;
    };
    let operand: i32 = operand.trim().parse().ok()?;
    Some(i.cmp(&operand))
}

/// Case-insensitive glob match with `*` as the only metacharacter.
fn wildcard_match(text: &str, pattern: &str) -> bool {
    let text = text.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();
    let segments: Vec<&str> = pattern.split('*').collect();

    // No wildcard at all: plain equality.
    if segments.len() == 1 {
        return text == pattern;
    }

    let mut rest = text.as_str();
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            // Anchored at the start.
            match rest.strip_prefix(segment) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if i == segments.len() - 1 {
            // Anchored at the end.
            return rest.ends_with(segment);
        } else {
            match rest.find(segment) {
                Some(idx) => rest = &rest[idx + segment.len()..],
                None => return false,
            }
        }
    }
    true
}
