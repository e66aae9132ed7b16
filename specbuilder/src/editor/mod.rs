//! Editors and the event routing between them.
//!
//! The tree alternates between [`TypeDispatcher`]s, which choose a node kind
//! from a type tag, and [`NodeEditor`]s, which edit the fragment of that
//! kind. Forms host further dispatchers in single slots or in
//! [`ListEditor`] rows.
//!
//! No editor owns options. Every handler receives the current slice by
//! reference and returns the next full value; the parent places it in its own
//! slice and returns upward, until the root hands it to the host.

use std::fmt;

use serde_json::Value;

use crate::{
    data::{
        node::TYPE_KEY,
        options::{Options, Settings},
    },
    error::EditError,
};

/// Type dispatch over one fragment.
pub mod dispatcher;

/// Flat forms with nested slots.
pub mod form;

/// Ordered rows with stable identities.
pub mod list;

/// Tag to editor kind registry.
pub mod registry;

pub use dispatcher::{DispatchState, TypeDispatcher};
pub use form::{FormEditor, SlotEditor};
pub use list::{ListEditor, ListRow, RowId};
pub use registry::{EditorKind, SelectOption, TypeRegistry};

/// One step from an editor to a hosted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// From a dispatcher into its selected node editor.
    Child,
    /// From a form into the dispatcher of a single slot.
    Slot(String),
    /// From a form into the dispatcher of a list row, by identity.
    Row { list: String, id: RowId },
}

/// Path from the root dispatcher to the editor an action targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address(Vec<Step>);

impl Address {
    /// The root dispatcher.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(mut self) -> Self {
        self.0.push(Step::Child);
        self
    }

    pub fn slot(mut self, key: impl Into<String>) -> Self {
        self.0.push(Step::Slot(key.into()));
        self
    }

    pub fn row(mut self, list: impl Into<String>, id: RowId) -> Self {
        self.0.push(Step::Row {
            list: list.into(),
            id,
        });
        self
    }

    pub fn push(&mut self, step: Step) {
        self.0.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Child => write!(f, "*"),
            Step::Slot(key) => write!(f, "{key}"),
            Step::Row { list, id } => write!(f, "{list}[{id}]"),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// A user edit, delivered to the editor at an [`Address`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Select a tag from the dispatcher's selectable set.
    Pick(String),
    /// Reset the dispatcher's builder to `null`.
    Clear,
    /// Add a free-text tag to the selectable set and pick it.
    RegisterCustom(String),
    /// Write one scalar field; `null` removes it.
    SetField { name: String, value: Value },
    AddRow { list: String },
    RemoveRow { list: String, row: RowId },
    /// Move a row, by identity, to position `to`.
    MoveRow { list: String, row: RowId, to: usize },
    /// Merge keys into the shared settings.
    MergeSettings(Settings),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Pick(_) => "pick",
            Action::Clear => "clear",
            Action::RegisterCustom(_) => "register-custom",
            Action::SetField { .. } => "set-field",
            Action::AddRow { .. } => "add-row",
            Action::RemoveRow { .. } => "remove-row",
            Action::MoveRow { .. } => "move-row",
            Action::MergeSettings(_) => "merge-settings",
        }
    }
}

/// The editor mounted for a selected tag.
#[derive(Debug, Clone)]
pub enum NodeEditor {
    Form(FormEditor),
    Custom(CustomEditor),
}

impl NodeEditor {
    /// Instantiate the editor for `kind` over `options.builder`.
    ///
    /// Mounting is the node's first write: the returned options carry the
    /// builder pruned to the kind's legal keys and stamped with its tag.
    pub fn mount(kind: EditorKind, tag: &str, options: &Options) -> (Self, Options) {
        match kind {
            EditorKind::Form(schema) => {
                let (editor, options) = FormEditor::mount(schema, options);
                (NodeEditor::Form(editor), options)
            }
            EditorKind::Custom => {
                let (editor, options) = CustomEditor::mount(tag, options);
                (NodeEditor::Custom(editor), options)
            }
        }
    }

    /// The tag this editor writes.
    pub fn tag(&self) -> &str {
        match self {
            NodeEditor::Form(form) => form.tag(),
            NodeEditor::Custom(custom) => &custom.tag,
        }
    }

    pub fn as_form(&self) -> Option<&FormEditor> {
        match self {
            NodeEditor::Form(form) => Some(form),
            NodeEditor::Custom(_) => None,
        }
    }

    pub fn handle(
        &mut self,
        options: &Options,
        steps: &[Step],
        action: &Action,
    ) -> Result<Options, EditError> {
        match self {
            NodeEditor::Form(form) => form.handle(options, steps, action),
            NodeEditor::Custom(custom) => custom.handle(options, steps, action),
        }
    }
}

/// Editor for a tag registered from free text.
#[derive(Debug, Clone)]
pub struct CustomEditor {
    tag: String,
}

impl CustomEditor {
    pub fn mount(tag: &str, options: &Options) -> (Self, Options) {
        let mut builder = options.builder_or_empty();
        builder.prune(&[TYPE_KEY]);
        builder.set_type(tag);
        (
            Self {
                tag: tag.to_string(),
            },
            options.with_builder(Some(builder)),
        )
    }

    pub fn handle(
        &mut self,
        options: &Options,
        steps: &[Step],
        action: &Action,
    ) -> Result<Options, EditError> {
        if let Some(step) = steps.first() {
            return Err(EditError::StaleAddress(step.to_string()));
        }
        match action {
            Action::MergeSettings(settings) => Ok(options.with_settings(settings.clone())),
            other => Err(EditError::Unsupported {
                action: other.name(),
                target: "custom node",
            }),
        }
    }
}
