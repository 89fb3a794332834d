//! Member enumeration and classification.

use thiserror::Error;

use crate::descriptor::{MemberDescriptor, MemberKind, TypeDescriptor};
use crate::order::{member_identity, OrderKey};

/// How an includable member renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RenderMode {
    /// Readable, and writable when an accessor writer exists.
    Direct,
    /// Readable but never writable; renders force-disabled.
    Readout,
    /// Invocable.
    Action,
}

/// A member that made it through inclusion, with its resolved order and
/// either a render mode or the configuration error to surface in its place.
pub(crate) struct MemberBinding<'a> {
    pub member: &'a MemberDescriptor,
    pub order: OrderKey,
    pub mode: Result<RenderMode, ConfigError>,
}

/// A member declaration the engine cannot draw. Never fatal: the member
/// renders as an inline error row and its siblings are unaffected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("`{0}` cannot be drawn because it is not readable")]
    NotReadable(String),
    #[error("`{0}` cannot be drawn because it takes parameters")]
    TakesParameters(String),
    #[error("`{0}` cannot be drawn because it returns a value")]
    ReturnsValue(String),
    #[error("`{0}` cannot be drawn because it has no body to invoke")]
    NotInvocable(String),
    #[error("`{0}` has no renderer and no known structure")]
    UnknownType(String),
}

/// Walks a type's members in declaration order and yields the includable
/// ones. With `extended` false (the engine toggle off) only plain
/// serialized data fields pass; opted-in members, computed readouts, and
/// actions are suppressed.
pub(crate) fn enumerate(ty: &TypeDescriptor, extended: bool) -> Vec<MemberBinding<'_>> {
    let mut out = Vec::new();
    for (position, member) in ty.members.iter().enumerate() {
        let included = match &member.kind {
            MemberKind::Field { .. } => {
                if extended {
                    !member.meta.skip || member.meta.opt_in
                } else {
                    !member.meta.skip
                }
            }
            MemberKind::Computed { .. } => extended && member.meta.opt_in,
            MemberKind::Action { .. } => {
                extended && (member.meta.button.is_some() || member.meta.opt_in)
            }
        };
        if !included {
            continue;
        }
        let mode = classify(member);
        out.push(MemberBinding {
            member,
            order: OrderKey::new(
                member.meta.order,
                member_identity(position, ty.name, member.name),
            ),
            mode,
        });
    }
    out
}

fn classify(member: &MemberDescriptor) -> Result<RenderMode, ConfigError> {
    match &member.kind {
        MemberKind::Field { .. } => Ok(RenderMode::Direct),
        MemberKind::Computed { get, set, params } => {
            if get.is_none() {
                return Err(ConfigError::NotReadable(member.name.to_string()));
            }
            if *params != 0 {
                return Err(ConfigError::TakesParameters(member.name.to_string()));
            }
            if set.is_none() {
                Ok(RenderMode::Readout)
            } else {
                Ok(RenderMode::Direct)
            }
        }
        MemberKind::Action {
            run,
            params,
            returns_value,
        } => {
            if *returns_value {
                return Err(ConfigError::ReturnsValue(member.name.to_string()));
            }
            if *params != 0 {
                return Err(ConfigError::TakesParameters(member.name.to_string()));
            }
            if run.is_none() {
                return Err(ConfigError::NotInvocable(member.name.to_string()));
            }
            Ok(RenderMode::Action)
        }
    }
}

#[path = "tests/enumerate_tests.rs"]
#[cfg(test)]
mod tests;
