//! Per-row visibility evaluation.
//!
//! Rules split into two categories: `Enable`/`Disable` decide whether a row
//! is editable, `Show`/`Hide` decide whether it is visible. Within one poll
//! the rules run in declaration order and the categories short-circuit
//! independently: enable-category rules only run while the row is still
//! enabled, hide-category rules only while it is still visible. This is NOT
//! a conjunction across rules. A later enable rule can never re-enable a row
//! a former one disabled, but rules of the other category keep running.
//! Forced disablement (a read-only member or an accessor without a writer)
//! always wins.

use std::rc::Rc;

use crate::descriptor::{MemberKind, TypeDescriptor, TypeRegistry};
use crate::metadata::{Operand, Rule};
use crate::value::{TypeRef, Value};

/// What a rule does when its condition holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Show,
    Hide,
    Enable,
    Disable,
}

impl Visibility {
    pub fn changes_enabled(self) -> bool {
        matches!(self, Visibility::Enable | Visibility::Disable)
    }

    pub fn changes_hidden(self) -> bool {
        matches!(self, Visibility::Show | Visibility::Hide)
    }
}

/// Host execution state, read once per poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Editing,
    Running,
}

/// External boolean preference storage consulted by flag rules.
pub trait FlagStore {
    fn get(&self, key: &str) -> bool;
}

/// A flag store with every flag off.
pub struct NoFlags;

impl FlagStore for NoFlags {
    fn get(&self, _key: &str) -> bool {
        false
    }
}

/// Per-poll inputs to rule evaluation.
pub struct EvalContext<'a> {
    pub run_mode: RunMode,
    pub flags: &'a dyn FlagStore,
}

/// Row state after one evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowState {
    pub enabled: bool,
    pub hidden: bool,
}

type OperandFn = Rc<dyn Fn(&Value) -> Value>;

enum CompiledRule {
    ReadOnly,
    DisableWhenRunning,
    DisableWhenEditing,
    HideWhenRunning,
    HideWhenEditing,
    Compare {
        lhs: OperandFn,
        rhs: OperandFn,
        visibility: Visibility,
    },
    Flag {
        key: &'static str,
        visibility: Visibility,
    },
}

/// A member's rules, compiled once when the row first evaluates. Compiling
/// resolves operand members against the declaring type's descriptor, which
/// is why it is deferred until the descriptor is certainly available.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

fn member_operand(owner: &TypeDescriptor, name: &'static str) -> (OperandFn, Option<TypeRef>) {
    match owner.member(name) {
        Some(member) => match &member.kind {
            MemberKind::Field { index } => {
                let index = *index;
                let f: OperandFn = Rc::new(move |owner_value: &Value| {
                    owner_value
                        .as_struct()
                        .and_then(|s| s.fields.get(index).cloned())
                        .unwrap_or(Value::Null)
                });
                (f, Some(member.ty.clone()))
            }
            MemberKind::Computed { get: Some(get), .. } => {
                let get = Rc::clone(get);
                let f: OperandFn = Rc::new(move |owner_value: &Value| get(owner_value));
                (f, Some(member.ty.clone()))
            }
            _ => {
                log::warn!(
                    "visibility operand `{name}` on `{}` has no readable value",
                    owner.name
                );
                (Rc::new(|_: &Value| Value::Null), None)
            }
        },
        None => {
            log::warn!("visibility operand `{name}` not found on `{}`", owner.name);
            (Rc::new(|_: &Value| Value::Null), None)
        }
    }
}

fn literal_operand(value: Value) -> OperandFn {
    Rc::new(move |_: &Value| value.clone())
}

impl RuleSet {
    pub fn compile(rules: &[Rule], owner: &TypeDescriptor, registry: &TypeRegistry) -> RuleSet {
        let compiled = rules
            .iter()
            .map(|rule| match rule {
                Rule::ReadOnly => CompiledRule::ReadOnly,
                Rule::DisableWhenRunning => CompiledRule::DisableWhenRunning,
                Rule::DisableWhenEditing => CompiledRule::DisableWhenEditing,
                Rule::HideWhenRunning => CompiledRule::HideWhenRunning,
                Rule::HideWhenEditing => CompiledRule::HideWhenEditing,
                Rule::Flag { key, visibility } => CompiledRule::Flag {
                    key: *key,
                    visibility: *visibility,
                },
                Rule::Compare {
                    lhs,
                    rhs,
                    visibility,
                } => {
                    let (lhs_fn, lhs_ty) = match lhs {
                        Operand::Member(name) => member_operand(owner, *name),
                        Operand::Literal(value) => (literal_operand(value.clone()), None),
                    };
                    let rhs_fn = match rhs {
                        Some(Operand::Member(name)) => member_operand(owner, *name).0,
                        Some(Operand::Literal(value)) => literal_operand(value.clone()),
                        // Single operand: booleans compare against true,
                        // everything else against its declared default.
                        None => match lhs_ty {
                            Some(TypeRef::Bool) => literal_operand(Value::Bool(true)),
                            Some(ty) => literal_operand(registry.default_value(&ty)),
                            None => literal_operand(Value::Bool(true)),
                        },
                    };
                    CompiledRule::Compare {
                        lhs: lhs_fn,
                        rhs: rhs_fn,
                        visibility: *visibility,
                    }
                }
            })
            .collect();
        RuleSet { rules: compiled }
    }

    /// Evaluates all rules against the owner's current value.
    pub fn evaluate(
        &self,
        owner_value: &Value,
        ctx: &EvalContext<'_>,
        force_disabled: bool,
    ) -> RowState {
        let mut enabled = !force_disabled;
        let mut hidden = false;
        for rule in &self.rules {
            if enabled {
                if let Some(outcome) = rule.enabled_outcome(owner_value, ctx) {
                    enabled = outcome;
                    continue;
                }
            }
            if !hidden {
                if let Some(outcome) = rule.hidden_outcome(owner_value, ctx) {
                    hidden = outcome;
                }
            }
        }
        RowState { enabled, hidden }
    }
}

/// Comparison semantics for rule operands: two nulls are equal, a null never
/// equals a value, everything else uses natural equality.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => a == b,
    }
}

impl CompiledRule {
    fn enabled_outcome(&self, owner_value: &Value, ctx: &EvalContext<'_>) -> Option<bool> {
        match self {
            CompiledRule::ReadOnly => Some(false),
            CompiledRule::DisableWhenRunning if ctx.run_mode == RunMode::Running => Some(false),
            CompiledRule::DisableWhenEditing if ctx.run_mode == RunMode::Editing => Some(false),
            CompiledRule::Compare {
                lhs,
                rhs,
                visibility,
            } if visibility.changes_enabled() => {
                let equal = values_equal(&lhs(owner_value), &rhs(owner_value));
                match visibility {
                    Visibility::Enable => Some(equal),
                    _ => Some(!equal),
                }
            }
            CompiledRule::Flag { key, visibility } if visibility.changes_enabled() => {
                let set = ctx.flags.get(key);
                match visibility {
                    Visibility::Enable => Some(set),
                    _ => Some(!set),
                }
            }
            _ => None,
        }
    }

    fn hidden_outcome(&self, owner_value: &Value, ctx: &EvalContext<'_>) -> Option<bool> {
        match self {
            CompiledRule::HideWhenRunning if ctx.run_mode == RunMode::Running => Some(true),
            CompiledRule::HideWhenEditing if ctx.run_mode == RunMode::Editing => Some(true),
            CompiledRule::Compare {
                lhs,
                rhs,
                visibility,
            } if visibility.changes_hidden() => {
                let equal = values_equal(&lhs(owner_value), &rhs(owner_value));
                match visibility {
                    Visibility::Show => Some(!equal),
                    _ => Some(equal),
                }
            }
            CompiledRule::Flag { key, visibility } if visibility.changes_hidden() => {
                let set = ctx.flags.get(key);
                match visibility {
                    Visibility::Show => Some(!set),
                    _ => Some(set),
                }
            }
            _ => None,
        }
    }
}

#[path = "tests/visibility_tests.rs"]
#[cfg(test)]
mod tests;
