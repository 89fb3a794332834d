//! Declarative per-member metadata.

use crate::value::Value;
use crate::visibility::Visibility;

/// One side of a comparison rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// Another member of the same declaring type, read per poll.
    Member(&'static str),
    Literal(Value),
}

/// A visibility rule declaration. Rules evaluate per poll, in declaration
/// order, with first-applicable-wins per category (see
/// [`crate::visibility`]).
#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
    /// Unconditionally disables editing.
    ReadOnly,
    DisableWhenRunning,
    DisableWhenEditing,
    HideWhenRunning,
    HideWhenEditing,
    /// Applies `visibility` when `lhs` equals `rhs`. A missing `rhs`
    /// compares against `true` for booleans, else the declared type's
    /// default value.
    Compare {
        lhs: Operand,
        rhs: Option<Operand>,
        visibility: Visibility,
    },
    /// Applies `visibility` from an external boolean flag.
    Flag {
        key: &'static str,
        visibility: Visibility,
    },
}

/// Units a time-span field can surface for editing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

/// Inclusive upper bound on a time-span value, expressed in one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub unit: TimeUnit,
    pub max: u64,
}

impl TimeRange {
    pub fn clamp(&self, millis: i64) -> i64 {
        let unit_millis: i64 = match self.unit {
            TimeUnit::Millis => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
        };
        let max = (self.max as i64).saturating_mul(unit_millis);
        millis.clamp(0, max)
    }
}

/// Rendering hint for millisecond-valued members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeSpanHint {
    pub units: &'static [TimeUnit],
    pub range: Option<TimeRange>,
}

/// Group a member is placed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSpec {
    pub id: &'static str,
    /// Display label; empty falls back to the id text.
    pub label: &'static str,
    pub expanded: bool,
}

impl GroupSpec {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            label: "",
            expanded: true,
        }
    }

    pub fn labeled(id: &'static str, label: &'static str) -> Self {
        Self {
            id,
            label,
            expanded: true,
        }
    }

    pub fn collapsed(mut self) -> Self {
        self.expanded = false;
        self
    }

    pub fn display_label(&self) -> &'static str {
        if self.label.is_empty() {
            self.id
        } else {
            self.label
        }
    }
}

/// Action button presentation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ButtonMeta {
    pub label: &'static str,
    pub icon: Option<&'static str>,
}

/// Everything a member declares about how it wants to be shown.
#[derive(Clone, Debug, Default)]
pub struct MemberMeta {
    pub order: i32,
    pub group: Option<GroupSpec>,
    pub rules: Vec<Rule>,
    pub read_only: bool,
    /// Included even though not plain serialized data.
    pub opt_in: bool,
    /// Excluded even though serialized.
    pub skip: bool,
    /// Nested compositions render inline instead of inside a foldout.
    pub inline: bool,
    /// Initial expansion state of a nested composition's foldout.
    pub expanded: bool,
    /// Poll interval override in milliseconds.
    pub tick_interval: Option<u64>,
    pub time_span: Option<TimeSpanHint>,
    /// Numeric slider bounds.
    pub range: Option<(f64, f64)>,
    pub button: Option<ButtonMeta>,
}

/// Default poll interval for opted-in members, which refresh on a slower
/// cadence than serialized fields.
pub const OPT_IN_TICK_INTERVAL: u64 = 1_000;

impl MemberMeta {
    pub fn ordered(order: i32) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    /// Metadata for a member opted into display, on the slower default tick.
    pub fn opted_in() -> Self {
        Self {
            opt_in: true,
            tick_interval: Some(OPT_IN_TICK_INTERVAL),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_group(mut self, group: GroupSpec) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }

    pub fn with_tick_interval(mut self, millis: u64) -> Self {
        self.tick_interval = Some(millis);
        self
    }

    pub fn with_button(mut self, button: ButtonMeta) -> Self {
        self.button = Some(button);
        self
    }
}
