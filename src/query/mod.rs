//! Query model.
//!
//! A query is a closed tree of span operators. [`SpanQuery`] is the
//! serializable form of that tree; [`SpanQuery::validate`] checks structural
//! rules without touching an index, and [`build_cursor`] lowers a tree onto
//! a corpus snapshot for evaluation.

mod build;

pub use build::build_cursor;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::span::{AttributeSpec, DistanceConstraint, ExpandDirection, RelationDirection, WithinMode};
use crate::types::{MAX_USER_CLASS, TEMP_CLASS_MIN};

fn default_sorted() -> bool {
    true
}

/// One node of a query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SpanQuery {
    /// A single annotation term, any layer.
    Term { text: String },
    /// All occurrences of a markup element.
    Element { name: String },
    /// Width-1 spans at attribute anchors.
    Attribute { name: String },
    /// Union of the operands, merged in position order.
    Or { operands: Vec<SpanQuery> },
    /// Right begins exactly where left ends.
    Next {
        left: Box<SpanQuery>,
        right: Box<SpanQuery>,
    },
    /// Inner constrained against outer; emits the outer span.
    Within {
        outer: Box<SpanQuery>,
        inner: Box<SpanQuery>,
        mode: WithinMode,
    },
    /// Pairs within one distance band.
    Distance {
        left: Box<SpanQuery>,
        right: Box<SpanQuery>,
        constraint: DistanceConstraint,
        #[serde(default)]
        ordered: bool,
        #[serde(default)]
        exclusion: bool,
    },
    /// Pairs that satisfy every one of several distance bands.
    MultiDistance {
        left: Box<SpanQuery>,
        right: Box<SpanQuery>,
        constraints: Vec<DistanceConstraint>,
        #[serde(default)]
        ordered: bool,
        #[serde(default)]
        exclusion: bool,
    },
    /// Tags each operand match with a class id.
    Class { id: u8, operand: Box<SpanQuery> },
    /// Re-anchors matches on the union of the given captured classes.
    Focus {
        ids: Vec<u8>,
        operand: Box<SpanQuery>,
        #[serde(default = "default_sorted")]
        sorted: bool,
        #[serde(default)]
        window: Option<usize>,
    },
    /// Back-to-back chains of the operand, all window lengths.
    Repetition {
        operand: Box<SpanQuery>,
        min: u32,
        max: u32,
    },
    /// Grows each match by a token window to one side.
    Expansion {
        operand: Box<SpanQuery>,
        direction: ExpandDirection,
        min: u32,
        max: u32,
        #[serde(default)]
        stop: Option<String>,
        #[serde(default)]
        class_id: Option<u8>,
    },
    /// Anchor spans of one relation label, on the chosen side.
    Relation {
        label: String,
        direction: RelationDirection,
    },
    /// Relation anchors joined with matching source and target operands.
    RelationMatch {
        label: String,
        direction: RelationDirection,
        source: Box<SpanQuery>,
        target: Box<SpanQuery>,
    },
    /// Single-class focus, the building block of relation chains.
    Reference {
        operand: Box<SpanQuery>,
        class_id: u8,
    },
    /// Spans filtered (or seeded) by attributes at their anchor.
    WithAttributes {
        base: Option<Box<SpanQuery>>,
        attributes: Vec<AttributeSpec>,
        #[serde(default = "default_sorted")]
        all_required: bool,
    },
}

impl SpanQuery {
    pub fn term(text: impl Into<String>) -> Self {
        SpanQuery::Term { text: text.into() }
    }

    pub fn element(name: impl Into<String>) -> Self {
        SpanQuery::Element { name: name.into() }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        SpanQuery::Attribute { name: name.into() }
    }

    pub fn or(operands: Vec<SpanQuery>) -> Self {
        SpanQuery::Or { operands }
    }

    pub fn next(left: SpanQuery, right: SpanQuery) -> Self {
        SpanQuery::Next {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn within(outer: SpanQuery, inner: SpanQuery, mode: WithinMode) -> Self {
        SpanQuery::Within {
            outer: Box::new(outer),
            inner: Box::new(inner),
            mode,
        }
    }

    pub fn class(id: u8, operand: SpanQuery) -> Self {
        SpanQuery::Class {
            id,
            operand: Box::new(operand),
        }
    }

    pub fn focus(id: u8, operand: SpanQuery) -> Self {
        SpanQuery::Focus {
            ids: vec![id],
            operand: Box::new(operand),
            sorted: true,
            window: None,
        }
    }

    pub fn repetition(operand: SpanQuery, min: u32, max: u32) -> Self {
        SpanQuery::Repetition {
            operand: Box::new(operand),
            min,
            max,
        }
    }

    /// Check structural rules of the whole tree.
    pub fn validate(&self) -> Result<()> {
        match self {
            SpanQuery::Term { text } => {
                if text.is_empty() {
                    return Err(Error::invalid_query("Term query requires a non-empty token"));
                }
            }
            SpanQuery::Element { name } => {
                if name.is_empty() {
                    return Err(Error::invalid_query(
                        "Element query requires a non-empty name",
                    ));
                }
            }
            SpanQuery::Attribute { name } => {
                if name.is_empty() {
                    return Err(Error::invalid_query(
                        "Attribute query requires a non-empty name",
                    ));
                }
            }
            SpanQuery::Or { operands } => {
                if operands.is_empty() {
                    return Err(Error::invalid_query("Or requires at least one operand"));
                }
                for operand in operands {
                    operand.validate()?;
                }
            }
            SpanQuery::Next { left, right } => {
                left.validate()?;
                right.validate()?;
            }
            SpanQuery::Within { outer, inner, .. } => {
                outer.validate()?;
                inner.validate()?;
            }
            SpanQuery::Distance {
                left,
                right,
                constraint,
                ..
            } => {
                check_band(constraint)?;
                left.validate()?;
                right.validate()?;
            }
            SpanQuery::MultiDistance {
                left,
                right,
                constraints,
                ..
            } => {
                if constraints.is_empty() {
                    return Err(Error::invalid_query(
                        "Distance requires at least one constraint",
                    ));
                }
                for constraint in constraints {
                    check_band(constraint)?;
                }
                left.validate()?;
                right.validate()?;
            }
            SpanQuery::Class { id, operand } => {
                check_user_class(*id)?;
                operand.validate()?;
            }
            SpanQuery::Focus {
                ids,
                operand,
                window,
                ..
            } => {
                if ids.is_empty() {
                    return Err(Error::invalid_query("Focus requires at least one class id"));
                }
                for id in ids {
                    check_focusable_class(*id)?;
                }
                if *window == Some(0) {
                    return Err(Error::invalid_query("Focus window must be at least 1"));
                }
                operand.validate()?;
            }
            SpanQuery::Repetition { operand, min, max } => {
                if *min < 1 {
                    return Err(Error::invalid_query(
                        "minimum repetition must not be lower than 1",
                    ));
                }
                if min > max {
                    return Err(Error::invalid_query(format!(
                        "maximum repetition {max} must not be lower than the minimum {min}"
                    )));
                }
                operand.validate()?;
            }
            SpanQuery::Expansion {
                operand,
                min,
                max,
                class_id,
                ..
            } => {
                if min > max {
                    return Err(Error::invalid_query(format!(
                        "maximum expansion {max} must not be lower than the minimum {min}"
                    )));
                }
                if let Some(id) = class_id {
                    check_user_class(*id)?;
                }
                operand.validate()?;
            }
            SpanQuery::Relation { label, .. } => {
                if label.is_empty() {
                    return Err(Error::invalid_query(
                        "Relation query requires a non-empty label",
                    ));
                }
            }
            SpanQuery::RelationMatch {
                label,
                source,
                target,
                ..
            } => {
                if label.is_empty() {
                    return Err(Error::invalid_query(
                        "Relation query requires a non-empty label",
                    ));
                }
                source.validate()?;
                target.validate()?;
            }
            SpanQuery::Reference { operand, class_id } => {
                check_focusable_class(*class_id)?;
                operand.validate()?;
            }
            SpanQuery::WithAttributes {
                base,
                attributes,
                all_required,
            } => {
                if attributes.is_empty() {
                    return Err(Error::invalid_query(
                        "Attribute filter requires at least one attribute",
                    ));
                }
                if base.is_none() {
                    if attributes.iter().all(|a| a.negated) {
                        return Err(Error::invalid_query(
                            "Attribute filter with only negated attributes requires a base query",
                        ));
                    }
                    if !all_required && attributes.iter().any(|a| a.negated) {
                        return Err(Error::invalid_query(
                            "Disjunctive attribute filter without a base cannot hold negated attributes",
                        ));
                    }
                }
                if let Some(base) = base {
                    base.validate()?;
                }
            }
        }
        Ok(())
    }
}

fn check_band(constraint: &DistanceConstraint) -> Result<()> {
    if constraint.min > constraint.max {
        return Err(Error::invalid_query(format!(
            "Distance maximum {} must not be lower than the minimum {}",
            constraint.max, constraint.min
        )));
    }
    Ok(())
}

/// Ids a query may assign: the user range, exclusive of the reserved 0.
fn check_user_class(id: u8) -> Result<()> {
    if id == 0 || id > MAX_USER_CLASS {
        return Err(Error::invalid_query(format!(
            "Class id {id} out of range 1..={MAX_USER_CLASS}"
        )));
    }
    Ok(())
}

/// Ids a query may focus on: user ids plus the internal range, since
/// relation chains re-anchor on scaffolding classes.
fn check_focusable_class(id: u8) -> Result<()> {
    if id == 0 || (id > MAX_USER_CLASS && id < TEMP_CLASS_MIN) {
        return Err(Error::invalid_query(format!("Class id {id} is reserved")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(q: &SpanQuery) -> String {
        q.validate().unwrap_err().to_string()
    }

    #[test]
    fn test_validates_repetition_bounds() {
        let q = SpanQuery::repetition(SpanQuery::term("a"), 0, 2);
        assert!(message(&q).contains("minimum repetition must not be lower than 1"));
        let q = SpanQuery::repetition(SpanQuery::term("a"), 3, 2);
        assert!(message(&q).contains("maximum repetition 2 must not be lower than the minimum 3"));
        assert!(SpanQuery::repetition(SpanQuery::term("a"), 1, 1).validate().is_ok());
    }

    #[test]
    fn test_validates_class_ids() {
        assert!(message(&SpanQuery::class(0, SpanQuery::term("a"))).contains("out of range"));
        assert!(message(&SpanQuery::class(128, SpanQuery::term("a"))).contains("out of range"));
        assert!(message(&SpanQuery::class(200, SpanQuery::term("a"))).contains("out of range"));
        assert!(SpanQuery::class(127, SpanQuery::term("a")).validate().is_ok());
        // Focusing may reach into the internal range, but not the gap.
        assert!(SpanQuery::focus(130, SpanQuery::term("a")).validate().is_ok());
        assert!(message(&SpanQuery::focus(128, SpanQuery::term("a"))).contains("reserved"));
    }

    #[test]
    fn test_validates_nested_operands() {
        let q = SpanQuery::next(
            SpanQuery::term("a"),
            SpanQuery::or(vec![SpanQuery::term(""), SpanQuery::term("b")]),
        );
        assert!(message(&q).contains("non-empty token"));
        assert!(message(&SpanQuery::or(vec![])).contains("at least one operand"));
    }

    #[test]
    fn test_validates_attribute_seeding() {
        let only_negated = SpanQuery::WithAttributes {
            base: None,
            attributes: vec![AttributeSpec::forbidden("lang=en")],
            all_required: true,
        };
        assert!(message(&only_negated).contains("requires a base query"));

        let disjunctive_negated = SpanQuery::WithAttributes {
            base: None,
            attributes: vec![
                AttributeSpec::required("class=a"),
                AttributeSpec::forbidden("class=b"),
            ],
            all_required: false,
        };
        assert!(message(&disjunctive_negated).contains("cannot hold negated attributes"));

        let with_base = SpanQuery::WithAttributes {
            base: Some(Box::new(SpanQuery::element("div"))),
            attributes: vec![AttributeSpec::forbidden("lang=en")],
            all_required: true,
        };
        assert!(with_base.validate().is_ok());
    }

    #[test]
    fn test_validates_focus_window() {
        let q = SpanQuery::Focus {
            ids: vec![1],
            operand: Box::new(SpanQuery::term("a")),
            sorted: true,
            window: Some(0),
        };
        assert!(message(&q).contains("window must be at least 1"));
    }

    #[test]
    fn test_query_json_round_trip() {
        let q = SpanQuery::next(
            SpanQuery::term("s:walk"),
            SpanQuery::within(
                SpanQuery::element("s"),
                SpanQuery::class(1, SpanQuery::term("i:fast")),
                WithinMode::Within,
            ),
        );
        let json = serde_json::to_string(&q).unwrap();
        let back: SpanQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
        assert!(json.contains("\"op\""));
    }

    #[test]
    fn test_defaults_in_json_form() {
        let json = r#"{
            "op": "distance",
            "left": {"op": "term", "text": "a"},
            "right": {"op": "term", "text": "b"},
            "constraint": {"unit": "Words", "min": 0, "max": 2}
        }"#;
        let q: SpanQuery = serde_json::from_str(json).unwrap();
        match q {
            SpanQuery::Distance {
                ordered, exclusion, ..
            } => {
                assert!(!ordered);
                assert!(!exclusion);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
