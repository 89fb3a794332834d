use super::*;
use crate::metadata::{ButtonMeta, GroupSpec, Operand, Rule};
use crate::row::RowKind;
use crate::value::StructValue;
use crate::visibility::Visibility;

/// Widget factory that hands the accessor back for inspection.
struct Probe;

impl WidgetFactory for Probe {
    fn scalar(
        &self,
        _ty: &TypeRef,
        accessor: &Accessor,
        _label: &str,
        options: &FieldOptions,
    ) -> Widget {
        Box::new((accessor.clone(), options.clone()))
    }
}

fn probe_env(registry: TypeRegistry) -> Environment {
    Environment::new(registry, Rc::new(Probe))
}

fn probe_env_with(registry: TypeRegistry, options: InspectorOptions) -> Environment {
    Environment::with_config(
        registry,
        Rc::new(Probe),
        EnvironmentConfig {
            options,
            ..EnvironmentConfig::default()
        },
    )
}

fn field_accessor(row: &ViewRow) -> Accessor {
    row.with_widget(|widget| {
        widget
            .downcast_ref::<(Accessor, FieldOptions)>()
            .map(|(accessor, _)| accessor.clone())
    })
    .flatten()
    .expect("scalar row")
}

fn player_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Player",
        vec![
            MemberDescriptor::field("name", 0, TypeRef::Text),
            MemberDescriptor::field("health", 1, TypeRef::Int),
            MemberDescriptor::field("alive", 2, TypeRef::Bool),
        ],
    ));
    registry
}

fn player(name: &str, health: i64, alive: bool) -> Value {
    Value::Struct(StructValue::new(
        "Player",
        vec![
            Value::Text(name.to_string()),
            Value::Int(health),
            Value::Bool(alive),
        ],
    ))
}

fn labels(rows: &[ViewRow]) -> Vec<String> {
    rows.iter().map(ViewRow::label).collect()
}

#[test]
fn rows_follow_declaration_order() {
    let env = probe_env(player_registry());
    let root = compose(
        &env,
        &TypeRef::Named("Player"),
        Accessor::slot(player("Ada", 100, true)),
    );
    assert_eq!(labels(&root.children()), vec!["Name", "Health", "Alive"]);
}

#[test]
fn explicit_order_overrides_declaration_order() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Ordered",
        vec![
            MemberDescriptor::field("second", 0, TypeRef::Int)
                .with_meta(MemberMeta::ordered(5)),
            MemberDescriptor::field("first", 1, TypeRef::Int)
                .with_meta(MemberMeta::ordered(-5)),
        ],
    ));
    let env = probe_env(registry);
    let root = compose(
        &env,
        &TypeRef::Named("Ordered"),
        Accessor::slot(Value::Struct(StructValue::new(
            "Ordered",
            vec![Value::Int(0), Value::Int(0)],
        ))),
    );
    assert_eq!(labels(&root.children()), vec!["First", "Second"]);
}

#[test]
fn equal_orders_keep_a_stable_relative_position() {
    let env = probe_env(player_registry());
    let target = Accessor::slot(player("Ada", 100, true));
    let first = compose(&env, &TypeRef::Named("Player"), target.clone());
    let second = compose(&env, &TypeRef::Named("Player"), target);
    assert_eq!(labels(&first.children()), labels(&second.children()));
}

#[test]
fn widget_accessors_write_through_to_the_target() {
    let env = probe_env(player_registry());
    let target = Accessor::slot(player("Ada", 100, true));
    let root = compose(&env, &TypeRef::Named("Player"), target.clone());
    let health = field_accessor(&root.children()[1]);
    assert_eq!(health.get(), Value::Int(100));
    health.set(Value::Int(55));
    assert_eq!(health.get(), Value::Int(55));
    assert_eq!(
        target.get().as_struct().unwrap().fields[1],
        Value::Int(55)
    );
}

#[test]
fn grouped_members_share_one_renamable_group() {
    // Two members name the same group id; the second carries the pretty
    // label. One group row results, renamed in place, holding both.
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Monster",
        vec![
            MemberDescriptor::field("name", 0, TypeRef::Text),
            MemberDescriptor::field("attack", 1, TypeRef::Int)
                .with_meta(MemberMeta::default().with_group(GroupSpec::new("stats"))),
            MemberDescriptor::field("defense", 2, TypeRef::Int).with_meta(
                MemberMeta::default().with_group(GroupSpec::labeled("stats", "Statistics")),
            ),
        ],
    ));
    let env = probe_env(registry);
    let root = compose(
        &env,
        &TypeRef::Named("Monster"),
        Accessor::slot(Value::Struct(StructValue::new(
            "Monster",
            vec![Value::Text("imp".into()), Value::Int(3), Value::Int(2)],
        ))),
    );
    let children = root.children();
    assert_eq!(children.len(), 2);
    let group = children
        .iter()
        .find(|row| row.kind() == RowKind::Group)
        .expect("group row");
    assert_eq!(group.label(), "Statistics");
    assert_eq!(labels(&group.children()), vec!["Attack", "Defense"]);
}

#[test]
fn setterless_computed_stays_disabled_despite_enable_rules() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Gauge",
        vec![
            MemberDescriptor::field("alive", 0, TypeRef::Bool),
            MemberDescriptor {
                name: "pressure",
                ty: TypeRef::Float,
                kind: MemberKind::Computed {
                    get: Some(Rc::new(|_| Value::Float(2.5))),
                    set: None,
                    params: 0,
                },
                meta: MemberMeta {
                    opt_in: true,
                    rules: vec![Rule::Compare {
                        lhs: Operand::Member("alive"),
                        rhs: Some(Operand::Literal(Value::Bool(true))),
                        visibility: Visibility::Enable,
                    }],
                    ..MemberMeta::default()
                },
            },
        ],
    ));
    let env = probe_env(registry);
    let root = compose(
        &env,
        &TypeRef::Named("Gauge"),
        Accessor::slot(Value::Struct(StructValue::new(
            "Gauge",
            vec![Value::Bool(true)],
        ))),
    );
    let pressure = &root.children()[1];
    assert_eq!(pressure.kind(), RowKind::Readout);
    assert!(pressure.is_read_only());
    assert!(!pressure.is_enabled());
    env.tick(500);
    assert!(!pressure.is_enabled());
    assert_eq!(field_accessor(pressure).get(), Value::Float(2.5));
}

#[test]
fn misdeclared_members_become_error_rows_without_breaking_siblings() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Tool",
        vec![
            MemberDescriptor::field("name", 0, TypeRef::Text),
            MemberDescriptor {
                name: "calibrate",
                ty: TypeRef::Int,
                kind: MemberKind::Action {
                    run: Some(Rc::new(|_| {})),
                    params: 2,
                    returns_value: false,
                },
                meta: MemberMeta::default().with_button(ButtonMeta::default()),
            },
            MemberDescriptor::field("size", 1, TypeRef::Int),
        ],
    ));
    let env = probe_env(registry);
    let root = compose(
        &env,
        &TypeRef::Named("Tool"),
        Accessor::slot(Value::Struct(StructValue::new(
            "Tool",
            vec![Value::Text("saw".into()), Value::Int(3)],
        ))),
    );
    let children = root.children();
    assert_eq!(children.len(), 3);
    let error = children
        .iter()
        .find(|row| row.kind() == RowKind::Error)
        .expect("error row");
    assert!(error
        .error_message()
        .unwrap()
        .contains("takes parameters"));
    assert!(!error.is_enabled());
}

#[test]
fn unresolvable_named_type_renders_an_error_row() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Holder",
        vec![MemberDescriptor::field("mystery", 0, TypeRef::Named("Ghost"))],
    ));
    let env = probe_env(registry);
    let root = compose(
        &env,
        &TypeRef::Named("Holder"),
        Accessor::slot(Value::Struct(StructValue::new("Holder", vec![Value::Null]))),
    );
    let mystery = &root.children()[0];
    assert_eq!(mystery.kind(), RowKind::Error);
    assert!(mystery.error_message().unwrap().contains("Ghost"));
}

#[test]
fn recursion_stops_at_the_depth_bound() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Node",
        vec![
            MemberDescriptor::field("value", 0, TypeRef::Int),
            MemberDescriptor::field("next", 1, TypeRef::Named("Node")),
        ],
    ));
    let env = probe_env_with(
        registry,
        InspectorOptions {
            max_depth: 3,
            ..InspectorOptions::default()
        },
    );
    // Deep value chain so the bound, not the data, stops recursion.
    let mut value = Value::Null;
    for depth in 0..8 {
        value = Value::Struct(StructValue::new("Node", vec![Value::Int(depth), value]));
    }
    let root = compose(&env, &TypeRef::Named("Node"), Accessor::slot(value));

    let mut group_levels = 0;
    let mut row = root;
    loop {
        assert_eq!(row.kind(), RowKind::Group);
        group_levels += 1;
        let next = row
            .children()
            .into_iter()
            .find(|child| child.label() == "Next")
            .expect("next row");
        if next.kind() != RowKind::Group {
            // Depth exhausted: rendered as an opaque leaf, not an error.
            assert_eq!(next.kind(), RowKind::Scalar);
            break;
        }
        row = next;
    }
    assert_eq!(group_levels, 3);
}

#[test]
fn disabled_engine_composes_only_plain_fields() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Mixed",
        vec![
            MemberDescriptor::field("plain", 0, TypeRef::Int),
            MemberDescriptor {
                name: "speed",
                ty: TypeRef::Float,
                kind: MemberKind::Computed {
                    get: Some(Rc::new(|_| Value::Float(0.0))),
                    set: None,
                    params: 0,
                },
                meta: MemberMeta::opted_in(),
            },
            MemberDescriptor {
                name: "reset",
                ty: TypeRef::Int,
                kind: MemberKind::Action {
                    run: Some(Rc::new(|_| {})),
                    params: 0,
                    returns_value: false,
                },
                meta: MemberMeta::default().with_button(ButtonMeta::default()),
            },
        ],
    ));
    let env = probe_env_with(
        registry,
        InspectorOptions {
            enabled: false,
            ..InspectorOptions::default()
        },
    );
    let root = compose(
        &env,
        &TypeRef::Named("Mixed"),
        Accessor::slot(Value::Struct(StructValue::new("Mixed", vec![Value::Int(1)]))),
    );
    assert_eq!(labels(&root.children()), vec!["Plain"]);
}

#[test]
fn actions_invoke_against_the_owner() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Counter",
        vec![
            MemberDescriptor::field("count", 0, TypeRef::Int),
            MemberDescriptor {
                name: "bump",
                ty: TypeRef::Int,
                kind: MemberKind::Action {
                    run: Some(Rc::new(|owner: &mut Value| {
                        if let Some(s) = owner.as_struct_mut() {
                            if let Value::Int(n) = &mut s.fields[0] {
                                *n += 1;
                            }
                        }
                    })),
                    params: 0,
                    returns_value: false,
                },
                meta: MemberMeta::default().with_button(ButtonMeta {
                    label: "Bump",
                    icon: None,
                }),
            },
        ],
    ));
    let env = probe_env(registry);
    let target = Accessor::slot(Value::Struct(StructValue::new(
        "Counter",
        vec![Value::Int(0)],
    )));
    let root = compose(&env, &TypeRef::Named("Counter"), target.clone());
    let bump = &root.children()[1];
    assert_eq!(bump.kind(), RowKind::Action);
    assert_eq!(bump.button().unwrap().label, "Bump");
    bump.invoke();
    bump.invoke();
    assert_eq!(target.get().as_struct().unwrap().fields[0], Value::Int(2));
}

#[test]
fn run_mode_rules_update_on_tick() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Config",
        vec![MemberDescriptor::field("seed", 0, TypeRef::Int)
            .with_meta(MemberMeta::default().with_rule(Rule::DisableWhenRunning))],
    ));
    let env = probe_env(registry);
    let root = compose(
        &env,
        &TypeRef::Named("Config"),
        Accessor::slot(Value::Struct(StructValue::new("Config", vec![Value::Int(1)]))),
    );
    let seed = &root.children()[0];
    assert!(seed.is_enabled());
    env.set_run_mode(RunMode::Running);
    env.tick(500);
    assert!(!seed.is_enabled());
    env.set_run_mode(RunMode::Editing);
    env.tick(500);
    assert!(seed.is_enabled());
}

#[test]
fn hide_rules_track_the_gate_field_across_ticks() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Panel",
        vec![
            MemberDescriptor::field("advanced", 0, TypeRef::Bool),
            MemberDescriptor::field("threshold", 1, TypeRef::Int).with_meta(
                MemberMeta::default().with_rule(Rule::Compare {
                    lhs: Operand::Member("advanced"),
                    rhs: Some(Operand::Literal(Value::Bool(false))),
                    visibility: Visibility::Hide,
                }),
            ),
        ],
    ));
    let env = probe_env(registry);
    let target = Accessor::slot(Value::Struct(StructValue::new(
        "Panel",
        vec![Value::Bool(false), Value::Int(10)],
    )));
    let root = compose(&env, &TypeRef::Named("Panel"), target.clone());
    let threshold = &root.children()[1];
    env.tick(500);
    assert!(threshold.is_hidden());

    let mut value = target.get();
    value.as_struct_mut().unwrap().fields[0] = Value::Bool(true);
    target.set(value);
    env.tick(500);
    assert!(!threshold.is_hidden());
}

#[test]
fn inline_members_compose_without_a_foldout() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Point",
        vec![
            MemberDescriptor::field("x", 0, TypeRef::Int),
            MemberDescriptor::field("y", 1, TypeRef::Int),
        ],
    ));
    registry.register(TypeDescriptor::new(
        "Shape",
        vec![
            MemberDescriptor::field("center", 0, TypeRef::Named("Point"))
                .with_meta(MemberMeta::default().inline()),
            MemberDescriptor::field("origin", 1, TypeRef::Named("Point")),
        ],
    ));
    let env = probe_env(registry);
    let point = Value::Struct(StructValue::new(
        "Point",
        vec![Value::Int(0), Value::Int(0)],
    ));
    let root = compose(
        &env,
        &TypeRef::Named("Shape"),
        Accessor::slot(Value::Struct(StructValue::new(
            "Shape",
            vec![point.clone(), point],
        ))),
    );
    let children = root.children();
    assert!(children[0].is_inline());
    assert!(!children[1].is_inline());
    assert!(!children[1].is_expanded());
}

#[test]
fn read_only_members_disable_their_nested_rows() {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "Point",
        vec![MemberDescriptor::field("x", 0, TypeRef::Int)],
    ));
    registry.register(TypeDescriptor::new(
        "Anchor",
        vec![MemberDescriptor::field("position", 0, TypeRef::Named("Point"))
            .with_meta(MemberMeta::default().read_only())],
    ));
    let env = probe_env(registry);
    let target = Accessor::slot(Value::Struct(StructValue::new(
        "Anchor",
        vec![Value::Struct(StructValue::new("Point", vec![Value::Int(1)]))],
    )));
    let root = compose(&env, &TypeRef::Named("Anchor"), target.clone());
    let position = &root.children()[0];
    assert!(position.is_read_only());

    // The nested composition derives its accessors from the member's, so
    // read-onlyness reaches every leaf below it.
    let x = &position.children()[0];
    assert!(x.is_read_only());
    assert!(!x.is_enabled());
    let accessor = field_accessor(x);
    assert!(accessor.is_read_only());
    accessor.set(Value::Int(99));
    assert_eq!(
        target.get().as_struct().unwrap().fields[0],
        Value::Struct(StructValue::new("Point", vec![Value::Int(1)]))
    );
}

#[test]
fn dropping_the_root_detaches_every_registration() {
    let env = probe_env(player_registry());
    let root = compose(
        &env,
        &TypeRef::Named("Player"),
        Accessor::slot(player("Ada", 1, true)),
    );
    assert!(!env.ticker().is_empty());
    drop(root);
    assert!(env.ticker().is_empty());
}

#[test]
fn values_differ_compares_across_targets() {
    let a = Accessor::slot(Value::Int(1));
    let b = Accessor::slot(Value::Int(1));
    let c = Accessor::slot(Value::Int(2));
    assert!(!values_differ(&[a.clone(), b.clone()]));
    assert!(values_differ(&[a.clone(), c]));
    assert!(!values_differ(&[a]));
    assert!(!values_differ(&[]));
}
