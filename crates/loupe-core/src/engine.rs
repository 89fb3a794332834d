//! Composition: from a typed accessor to a live row tree.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::accessor::Accessor;
use crate::bridge::{child_path, store_accessor, PathStore};
use crate::collections::CollectionView;
use crate::descriptor::{MemberDescriptor, MemberKind, TypeDescriptor, TypeRegistry};
use crate::enumerate::{enumerate, ConfigError, RenderMode};
use crate::group::GroupSet;
use crate::metadata::{MemberMeta, TimeSpanHint};
use crate::order::OrderKey;
use crate::row::{RowBinding, RowContent, ViewRow, Widget};
use crate::ticker::{Ticker, DEFAULT_TICK_INTERVAL};
use crate::value::{nicify, TypeRef, Value};
use crate::visibility::{values_equal, EvalContext, FlagStore, NoFlags, RunMode};

/// How deep nested compositions recurse before rendering opaque leaves.
pub const MAX_DEPTH: usize = 10;

#[derive(Clone, Debug)]
pub struct InspectorOptions {
    /// Engine toggle: when off, only plain serialized data fields compose.
    pub enabled: bool,
    /// Default poll interval in ms for rows without an override.
    pub tick_interval: u64,
    pub max_depth: usize,
}

impl Default for InspectorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_depth: MAX_DEPTH,
        }
    }
}

/// Inputs a composition environment takes beyond registry and factory.
pub struct EnvironmentConfig {
    pub flags: Rc<dyn FlagStore>,
    pub bridge: Option<Rc<dyn PathStore>>,
    pub options: InspectorOptions,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            flags: Rc::new(NoFlags),
            bridge: None,
            options: InspectorOptions::default(),
        }
    }
}

/// Options handed to the widget factory for a terminal leaf.
#[derive(Clone, Debug)]
pub struct FieldOptions {
    pub tick_interval: u64,
    pub time_span: Option<TimeSpanHint>,
    pub range: Option<(f64, f64)>,
    /// Multiple targets disagree on the current value.
    pub mixed: bool,
}

/// Produces host widgets for terminal leaves. The engine never looks inside
/// a widget; it only stores and hands it back.
pub trait WidgetFactory {
    fn scalar(
        &self,
        ty: &TypeRef,
        accessor: &Accessor,
        label: &str,
        options: &FieldOptions,
    ) -> Widget;
}

pub(crate) struct EnvInner {
    registry: TypeRegistry,
    factory: Rc<dyn WidgetFactory>,
    pub(crate) flags: Rc<dyn FlagStore>,
    bridge: Option<Rc<dyn PathStore>>,
    pub(crate) run_mode: Cell<RunMode>,
    options: InspectorOptions,
    ticker: Ticker,
}

/// Shared composition context: registry, widget factory, flag store,
/// optional persistence bridge, run mode, and the poll scheduler.
#[derive(Clone)]
pub struct Environment {
    pub(crate) inner: Rc<EnvInner>,
}

impl Environment {
    pub fn new(registry: TypeRegistry, factory: Rc<dyn WidgetFactory>) -> Self {
        Self::with_config(registry, factory, EnvironmentConfig::default())
    }

    pub fn with_config(
        registry: TypeRegistry,
        factory: Rc<dyn WidgetFactory>,
        config: EnvironmentConfig,
    ) -> Self {
        Self {
            inner: Rc::new(EnvInner {
                registry,
                factory,
                flags: config.flags,
                bridge: config.bridge,
                run_mode: Cell::new(RunMode::default()),
                options: config.options,
                ticker: Ticker::new(),
            }),
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.inner.ticker
    }

    /// Advances the poll scheduler; the usual way hosts drive the view.
    pub fn tick(&self, elapsed_ms: u64) {
        self.inner.ticker.advance(elapsed_ms);
    }

    pub fn run_mode(&self) -> RunMode {
        self.inner.run_mode.get()
    }

    pub fn set_run_mode(&self, mode: RunMode) {
        self.inner.run_mode.set(mode);
    }

    pub fn options(&self) -> &InspectorOptions {
        &self.inner.options
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    pub(crate) fn factory(&self) -> &Rc<dyn WidgetFactory> {
        &self.inner.factory
    }

    pub(crate) fn bridge(&self) -> Option<Rc<dyn PathStore>> {
        self.inner.bridge.clone()
    }
}

/// Composes a live view over `accessor`, polled through the environment's
/// ticker. The returned row owns the registrations that keep it fresh;
/// dropping it detaches the whole subtree from the scheduler.
pub fn compose(env: &Environment, ty: &TypeRef, accessor: Accessor) -> ViewRow {
    let label = match ty {
        TypeRef::Named(name) | TypeRef::Opaque(name) => nicify(name),
        other => other.display_name(),
    };
    let meta = MemberMeta {
        expanded: true,
        ..MemberMeta::default()
    };
    compose_value(
        env,
        ty,
        accessor,
        Placement {
            label,
            order: OrderKey::new(0, 0),
            meta,
            binding: None,
            depth: 0,
            path: None,
            own_tick: true,
            readout: false,
        },
    )
}

/// Composes a view routed through the environment's persistence bridge at
/// `path`. `None` when no bridge is configured.
pub fn compose_bound(env: &Environment, ty: &TypeRef, path: &str) -> Option<ViewRow> {
    let store = env.bridge()?;
    let accessor = store_accessor(store, path);
    let label = match ty {
        TypeRef::Named(name) | TypeRef::Opaque(name) => nicify(name),
        other => other.display_name(),
    };
    let meta = MemberMeta {
        expanded: true,
        ..MemberMeta::default()
    };
    Some(compose_value(
        env,
        ty,
        accessor,
        Placement {
            label,
            order: OrderKey::new(0, 0),
            meta,
            binding: None,
            depth: 0,
            path: Some(path.to_string()),
            own_tick: true,
            readout: false,
        },
    ))
}

/// True when the accessors disagree on the current value; feeds the
/// factory's mixed-values flag when several targets share one view.
pub fn values_differ(accessors: &[Accessor]) -> bool {
    let mut iter = accessors.iter();
    let Some(first) = iter.next() else {
        return false;
    };
    let Ok(reference) = first.try_get() else {
        return false;
    };
    for accessor in iter {
        match accessor.try_get() {
            Ok(value) => {
                if !values_equal(&value, &reference) {
                    return true;
                }
            }
            Err(_) => return false,
        }
    }
    false
}

struct Placement {
    label: String,
    order: OrderKey,
    meta: MemberMeta,
    binding: Option<RowBinding>,
    depth: usize,
    path: Option<String>,
    /// Whether an object composition registers its own visibility tick.
    /// Roots and collection elements do; nested member compositions are
    /// covered by their parent's recursion.
    own_tick: bool,
    readout: bool,
}

/// Element row factory used by collection views.
pub(crate) fn compose_element(
    env: &Environment,
    ty: &TypeRef,
    accessor: Accessor,
    label: String,
    index: usize,
    depth: usize,
    path: Option<String>,
) -> ViewRow {
    compose_value(
        env,
        ty,
        accessor,
        Placement {
            label,
            order: OrderKey::new(index as i32, index as u64),
            meta: MemberMeta::default(),
            binding: None,
            depth: depth + 1,
            path,
            own_tick: true,
            readout: false,
        },
    )
}

/// Bare group row; map entries use this for their key/value pair.
pub(crate) fn group_row(label: String, index: usize, inline: bool) -> ViewRow {
    ViewRow::new(
        label,
        OrderKey::new(index as i32, index as u64),
        RowContent::Group {
            children: BTreeMap::new(),
            inline,
        },
        false,
        None,
    )
}

fn compose_value(env: &Environment, ty: &TypeRef, accessor: Accessor, p: Placement) -> ViewRow {
    if ty.collection_shape().is_some() {
        let force_disabled = p.readout || p.meta.read_only || accessor.is_read_only();
        let view = CollectionView::create(
            env,
            ty,
            if p.readout {
                accessor.without_writer()
            } else {
                accessor
            },
            p.path,
            p.depth,
            p.meta.tick_interval.unwrap_or(env.options().tick_interval),
            p.meta.read_only,
        );
        let row = ViewRow::new(
            p.label,
            p.order,
            RowContent::Collection { view },
            force_disabled,
            p.binding,
        );
        row.set_expanded(p.meta.expanded);
        return row;
    }
    if let TypeRef::Named(name) = ty {
        match env.registry().describe(name) {
            Some(descriptor) => {
                if p.depth < env.options().max_depth {
                    // Read-onlyness propagates: children derive their
                    // accessors from this one, so strip the writer here.
                    let accessor = if p.readout || p.meta.read_only {
                        accessor.without_writer()
                    } else {
                        accessor
                    };
                    return compose_object(env, &descriptor, accessor, p);
                }
                // Depth exhausted: not an error, just a flat leaf.
            }
            None => {
                return ViewRow::new(
                    p.label,
                    p.order,
                    RowContent::Error {
                        message: ConfigError::UnknownType(name.to_string()).to_string(),
                    },
                    true,
                    None,
                );
            }
        }
    }
    scalar_row(env, ty, accessor, p)
}

fn scalar_row(env: &Environment, ty: &TypeRef, accessor: Accessor, p: Placement) -> ViewRow {
    let accessor = if p.readout || p.meta.read_only {
        accessor.without_writer()
    } else {
        accessor
    };
    let force_disabled = accessor.is_read_only();
    let options = FieldOptions {
        tick_interval: p.meta.tick_interval.unwrap_or(env.options().tick_interval),
        time_span: p.meta.time_span.clone(),
        range: p.meta.range,
        mixed: false,
    };
    let widget = env.factory().scalar(ty, &accessor, &p.label, &options);
    let content = if p.readout {
        RowContent::Readout { widget }
    } else {
        RowContent::Scalar { widget }
    };
    ViewRow::new(p.label, p.order, content, force_disabled, p.binding)
}

fn compose_object(
    env: &Environment,
    descriptor: &Rc<TypeDescriptor>,
    accessor: Accessor,
    p: Placement,
) -> ViewRow {
    let force_disabled = p.readout || p.meta.read_only;
    let Placement {
        label,
        order,
        meta,
        binding: row_binding,
        depth,
        path,
        own_tick,
        ..
    } = p;
    let root = ViewRow::new(
        label,
        order,
        RowContent::Group {
            children: BTreeMap::new(),
            inline: meta.inline,
        },
        force_disabled,
        row_binding,
    );
    root.set_expanded(meta.expanded);

    let mut groups = GroupSet::new();
    for binding in enumerate(descriptor, env.options().enabled) {
        let member = binding.member;
        let child = match binding.mode {
            Err(err) => ViewRow::new(
                nicify(member.name),
                binding.order,
                RowContent::Error {
                    message: err.to_string(),
                },
                true,
                None,
            ),
            Ok(mode) => compose_member(
                env,
                descriptor,
                &accessor,
                member,
                binding.order,
                mode,
                depth,
                &path,
            ),
        };
        let target = match &member.meta.group {
            Some(spec) => groups.resolve(spec, binding.order, &mut |group| {
                root.attach_child(group);
            }),
            None => root.clone(),
        };
        target.attach_child(child);
    }

    if own_tick {
        register_visibility_tick(env, &root);
    }
    root
}

fn compose_member(
    env: &Environment,
    descriptor: &Rc<TypeDescriptor>,
    owner: &Accessor,
    member: &MemberDescriptor,
    order: OrderKey,
    mode: RenderMode,
    depth: usize,
    parent_path: &Option<String>,
) -> ViewRow {
    let binding = RowBinding {
        owner: owner.clone(),
        owner_ty: Rc::clone(descriptor),
        rules: member.meta.rules.clone(),
        registry: env.registry().clone(),
    };
    let label = nicify(member.name);

    if mode == RenderMode::Action {
        return action_row(owner, member, label, order, binding);
    }

    let (accessor, member_path) = match &member.kind {
        MemberKind::Field { index } => match (parent_path, env.bridge()) {
            (Some(path), Some(store)) => {
                let field_path = child_path(path, member.name);
                (store_accessor(store, field_path.clone()), Some(field_path))
            }
            _ => (owner.field(*index), None),
        },
        MemberKind::Computed { get, set, .. } => (computed_accessor(owner, get, set), None),
        MemberKind::Action { .. } => (owner.clone().without_writer(), None),
    };

    compose_value(
        env,
        &member.ty,
        accessor,
        Placement {
            label,
            order,
            meta: member.meta.clone(),
            binding: Some(binding),
            depth: depth + 1,
            path: member_path,
            own_tick: false,
            readout: mode == RenderMode::Readout,
        },
    )
}

fn computed_accessor(
    owner: &Accessor,
    get: &Option<crate::descriptor::Getter>,
    set: &Option<crate::descriptor::Setter>,
) -> Accessor {
    let read = {
        let owner = owner.clone();
        let get = get.clone();
        move || {
            let target = owner.try_get()?;
            Ok(match &get {
                Some(get) => get(&target),
                None => Value::Null,
            })
        }
    };
    let write = match (set, owner.is_read_only()) {
        (Some(set), false) => {
            let owner = owner.clone();
            let set = Rc::clone(set);
            let f: Rc<dyn Fn(Value)> = Rc::new(move |value: Value| {
                let mut target = owner.get();
                set(&mut target, value);
                owner.set(target);
            });
            Some(f)
        }
        _ => None,
    };
    Accessor::new(Rc::new(read), write)
}

fn action_row(
    owner: &Accessor,
    member: &MemberDescriptor,
    label: String,
    order: OrderKey,
    binding: RowBinding,
) -> ViewRow {
    let MemberKind::Action { run: Some(run), .. } = &member.kind else {
        // Classification already rejected anything else.
        return ViewRow::new(
            label,
            order,
            RowContent::Error {
                message: ConfigError::NotInvocable(member.name.to_string()).to_string(),
            },
            true,
            None,
        );
    };
    let button = member.meta.button.clone().unwrap_or_default();
    ViewRow::new(
        label,
        order,
        RowContent::Action {
            run: Rc::clone(run),
            owner: owner.clone(),
            button,
        },
        false,
        Some(binding),
    )
}

fn register_visibility_tick(env: &Environment, row: &ViewRow) {
    let weak_row = row.downgrade();
    let weak_env = Rc::downgrade(&env.inner);
    let registration = env
        .ticker()
        .register(env.options().tick_interval, move || {
            let (Some(row_inner), Some(env_inner)) = (weak_row.upgrade(), weak_env.upgrade())
            else {
                return;
            };
            let row = ViewRow::from_inner(row_inner);
            let ctx = EvalContext {
                run_mode: env_inner.run_mode.get(),
                flags: &*env_inner.flags,
            };
            row.update_visibility(&ctx);
        });
    row.set_tick(registration);
}

#[path = "tests/engine_tests.rs"]
#[cfg(test)]
mod tests;
