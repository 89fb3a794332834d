//! View rows: the nodes of the composed tree.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::accessor::Accessor;
use crate::collections::CollectionView;
use crate::descriptor::{ActionFn, TypeDescriptor, TypeRegistry};
use crate::metadata::{ButtonMeta, Rule};
use crate::order::OrderKey;
use crate::ticker::TickRegistration;
use crate::visibility::{EvalContext, RowState, RuleSet};

/// Opaque widget handle produced by the host's factory.
pub type Widget = Box<dyn Any>;

/// Discriminates what a row renders as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    Scalar,
    Readout,
    Action,
    Error,
    Group,
    Collection,
}

pub(crate) enum RowContent {
    /// Editable terminal leaf.
    Scalar { widget: Widget },
    /// Read-only computed leaf.
    Readout { widget: Widget },
    /// Invocable member rendered as a button.
    Action {
        run: ActionFn,
        owner: Accessor,
        button: ButtonMeta,
    },
    /// Misdeclared member placeholder; siblings are unaffected.
    Error { message: String },
    /// Group or nested composition; children ordered by their keys.
    Group {
        children: BTreeMap<OrderKey, ViewRow>,
        inline: bool,
    },
    Collection { view: CollectionView },
}

/// Ties a row back to the member declaration it renders, so its rules can
/// be compiled (once) and evaluated (per poll) against the owning object.
pub(crate) struct RowBinding {
    pub owner: Accessor,
    pub owner_ty: Rc<TypeDescriptor>,
    pub rules: Vec<Rule>,
    pub registry: TypeRegistry,
}

pub(crate) struct RowInner {
    label: RefCell<String>,
    order: OrderKey,
    content: RefCell<RowContent>,
    enabled: Cell<bool>,
    hidden: Cell<bool>,
    force_disabled: Cell<bool>,
    hovered: Cell<bool>,
    expanded: Cell<bool>,
    binding: Option<RowBinding>,
    compiled_rules: RefCell<Option<Rc<RuleSet>>>,
    tick: RefCell<Option<TickRegistration>>,
}

#[derive(Clone)]
pub struct ViewRow {
    inner: Rc<RowInner>,
}

impl ViewRow {
    pub(crate) fn new(
        label: String,
        order: OrderKey,
        content: RowContent,
        force_disabled: bool,
        binding: Option<RowBinding>,
    ) -> Self {
        Self {
            inner: Rc::new(RowInner {
                label: RefCell::new(label),
                order,
                content: RefCell::new(content),
                enabled: Cell::new(!force_disabled),
                hidden: Cell::new(false),
                force_disabled: Cell::new(force_disabled),
                hovered: Cell::new(false),
                expanded: Cell::new(true),
                binding,
                compiled_rules: RefCell::new(None),
                tick: RefCell::new(None),
            }),
        }
    }

    pub fn label(&self) -> String {
        self.inner.label.borrow().clone()
    }

    pub fn set_label(&self, label: &str) {
        let mut current = self.inner.label.borrow_mut();
        if *current != label {
            *current = label.to_string();
        }
    }

    pub fn order_key(&self) -> OrderKey {
        self.inner.order
    }

    pub fn kind(&self) -> RowKind {
        match &*self.inner.content.borrow() {
            RowContent::Scalar { .. } => RowKind::Scalar,
            RowContent::Readout { .. } => RowKind::Readout,
            RowContent::Action { .. } => RowKind::Action,
            RowContent::Error { .. } => RowKind::Error,
            RowContent::Group { .. } => RowKind::Group,
            RowContent::Collection { .. } => RowKind::Collection,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.hidden.get()
    }

    /// True when the row can never be edited, regardless of rules.
    pub fn is_read_only(&self) -> bool {
        self.inner.force_disabled.get()
    }

    pub fn is_hovered(&self) -> bool {
        self.inner.hovered.get()
    }

    pub fn set_hovered(&self, hovered: bool) {
        self.inner.hovered.set(hovered);
    }

    /// True when this row or any row beneath it is hovered. Collection
    /// add/remove targeting scans with this, so hovering a map entry's key
    /// still targets the entry.
    pub fn subtree_hovered(&self) -> bool {
        if self.is_hovered() {
            return true;
        }
        self.children().iter().any(ViewRow::subtree_hovered)
    }

    pub fn is_expanded(&self) -> bool {
        self.inner.expanded.get()
    }

    pub fn set_expanded(&self, expanded: bool) {
        self.inner.expanded.set(expanded);
    }

    /// Children of a group row, in display order. Empty for other kinds.
    pub fn children(&self) -> Vec<ViewRow> {
        match &*self.inner.content.borrow() {
            RowContent::Group { children, .. } => children.values().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// True for nested compositions rendered without a foldout.
    pub fn is_inline(&self) -> bool {
        matches!(
            &*self.inner.content.borrow(),
            RowContent::Group { inline: true, .. }
        )
    }

    pub fn collection(&self) -> Option<CollectionView> {
        match &*self.inner.content.borrow() {
            RowContent::Collection { view } => Some(view.clone()),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match &*self.inner.content.borrow() {
            RowContent::Error { message } => Some(message.clone()),
            _ => None,
        }
    }

    pub fn button(&self) -> Option<ButtonMeta> {
        match &*self.inner.content.borrow() {
            RowContent::Action { button, .. } => Some(button.clone()),
            _ => None,
        }
    }

    /// Borrows the host widget of a scalar or readout row.
    pub fn with_widget<R>(&self, f: impl FnOnce(&mut dyn Any) -> R) -> Option<R> {
        match &mut *self.inner.content.borrow_mut() {
            RowContent::Scalar { widget } | RowContent::Readout { widget } => {
                Some(f(widget.as_mut()))
            }
            _ => None,
        }
    }

    /// Runs an action row against its owner. Disabled rows do nothing.
    pub fn invoke(&self) {
        if !self.is_enabled() {
            return;
        }
        let action = match &*self.inner.content.borrow() {
            RowContent::Action { run, owner, .. } => Some((Rc::clone(run), owner.clone())),
            _ => None,
        };
        if let Some((run, owner)) = action {
            let mut target = owner.get();
            run(&mut target);
            owner.set(target);
        }
    }

    /// Identity comparison, used to assert row survival across polls.
    pub fn ptr_eq(&self, other: &ViewRow) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn attach_child(&self, child: ViewRow) {
        if let RowContent::Group { children, .. } = &mut *self.inner.content.borrow_mut() {
            children.insert(child.order_key(), child);
        }
    }

    pub(crate) fn set_tick(&self, registration: TickRegistration) {
        *self.inner.tick.borrow_mut() = Some(registration);
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<RowInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Rc<RowInner>) -> Self {
        Self { inner }
    }

    /// One visibility pass over this row and (for groups) its children.
    /// Hidden rows are still evaluated so they can reappear.
    pub(crate) fn update_visibility(&self, ctx: &EvalContext<'_>) {
        let child_rows = self.children();
        for child in child_rows {
            child.update_visibility(ctx);
        }
        let state = self.evaluate(ctx);
        self.inner.enabled.set(state.enabled);
        self.inner.hidden.set(state.hidden);
        if let RowContent::Collection { view } = &*self.inner.content.borrow() {
            view.set_editable(state.enabled);
        }
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> RowState {
        let force_disabled = self.inner.force_disabled.get();
        let binding = match &self.inner.binding {
            Some(binding) if !binding.rules.is_empty() => binding,
            _ => {
                return RowState {
                    enabled: !force_disabled,
                    hidden: false,
                }
            }
        };
        let rules = {
            let mut compiled = self.inner.compiled_rules.borrow_mut();
            match &*compiled {
                Some(rules) => Rc::clone(rules),
                None => {
                    let rules = Rc::new(RuleSet::compile(
                        &binding.rules,
                        &binding.owner_ty,
                        &binding.registry,
                    ));
                    *compiled = Some(Rc::clone(&rules));
                    rules
                }
            }
        };
        rules.evaluate(&binding.owner.get(), ctx, force_disabled)
    }
}
