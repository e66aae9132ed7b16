use serde_json::Value;

use crate::{
    data::{
        catalog::{FormSchema, SlotKind},
        node::ConfigNode,
        options::Options,
    },
    editor::{Action, ListEditor, Step, TypeDispatcher},
    error::EditError,
};

/// Editor of a nested slot.
#[derive(Debug, Clone)]
pub enum SlotEditor {
    Single {
        key: &'static str,
        dispatcher: TypeDispatcher,
    },
    List(ListEditor),
}

/// Editor for a fragment of a declared kind.
#[derive(Debug, Clone)]
pub struct FormEditor {
    schema: &'static FormSchema,
    slots: Vec<SlotEditor>,
}

impl FormEditor {
    /// Fix the fragment to `schema`: prune it to the legal keys, stamp the
    /// tag, then mount every nested slot.
    pub fn mount(schema: &'static FormSchema, options: &Options) -> (Self, Options) {
        let mut builder = options.builder_or_empty();
        builder.prune(&schema.legal_keys());
        builder.set_type(schema.tag);
        let mut next = options.with_builder(Some(builder));

        let mut slots = Vec::with_capacity(schema.slots.len());
        for slot in schema.slots {
            match slot.kind {
                SlotKind::Single(family) => {
                    let slice = single_slice(&next, slot.key);
                    let (dispatcher, pushed) = TypeDispatcher::mount(family.registry(), &slice);
                    if pushed.builder != slice.builder {
                        next = place_single(&next, slot.key, pushed);
                    }
                    slots.push(SlotEditor::Single {
                        key: slot.key,
                        dispatcher,
                    });
                }
                SlotKind::List(family) => {
                    let (list, pushed) = ListEditor::mount(slot.key, family, &next);
                    next = pushed;
                    slots.push(SlotEditor::List(list));
                }
            }
        }
        (Self { schema, slots }, next)
    }

    pub fn schema(&self) -> &'static FormSchema {
        self.schema
    }

    pub fn tag(&self) -> &'static str {
        self.schema.tag
    }

    /// Dispatcher of the single slot `key`.
    pub fn single(&self, key: &str) -> Option<&TypeDispatcher> {
        self.slots.iter().find_map(|slot| match slot {
            SlotEditor::Single { key: k, dispatcher } if *k == key => Some(dispatcher),
            _ => None,
        })
    }

    fn single_mut(&mut self, key: &str) -> Option<&mut TypeDispatcher> {
        self.slots.iter_mut().find_map(|slot| match slot {
            SlotEditor::Single { key: k, dispatcher } if *k == key => Some(dispatcher),
            _ => None,
        })
    }

    /// Editor of the list slot `key`.
    pub fn list(&self, key: &str) -> Option<&ListEditor> {
        self.slots.iter().find_map(|slot| match slot {
            SlotEditor::List(list) if list.key() == key => Some(list),
            _ => None,
        })
    }

    fn list_mut(&mut self, key: &str) -> Option<&mut ListEditor> {
        self.slots.iter_mut().find_map(|slot| match slot {
            SlotEditor::List(list) if list.key() == key => Some(list),
            _ => None,
        })
    }

    pub fn handle(
        &mut self,
        options: &Options,
        steps: &[Step],
        action: &Action,
    ) -> Result<Options, EditError> {
        let Some((step, rest)) = steps.split_first() else {
            return self.apply(options, action);
        };
        let tag = self.schema.tag;
        let stale = || EditError::StaleAddress(format!("{tag}/{step}"));
        match step {
            Step::Slot(key) => {
                let stale = stale();
                let dispatcher = self.single_mut(key).ok_or(stale)?;
                let slice = single_slice(options, key);
                let pushed = dispatcher.handle(&slice, rest, action)?;
                Ok(place_single(options, key, pushed))
            }
            Step::Row { list, id } => {
                let stale = stale();
                let list = self.list_mut(list).ok_or(stale)?;
                list.handle_row(options, *id, rest, action)
            }
            Step::Child => Err(stale()),
        }
    }

    fn apply(&mut self, options: &Options, action: &Action) -> Result<Options, EditError> {
        let tag = self.schema.tag;
        let unknown = |field: &str| EditError::UnknownField {
            tag: tag.to_string(),
            field: field.to_string(),
        };
        match action {
            Action::SetField { name, value } => self.set_field(options, name, value),
            Action::AddRow { list } => {
                let editor = self.list_mut(list).ok_or_else(|| unknown(list))?;
                Ok(editor.add(options))
            }
            Action::RemoveRow { list, row } => {
                let editor = self.list_mut(list).ok_or_else(|| unknown(list))?;
                let index = editor
                    .index_of(*row)
                    .ok_or_else(|| EditError::StaleAddress(format!("{list}[{row}]")))?;
                Ok(editor.remove(options, index))
            }
            Action::MoveRow { list, row, to } => {
                let editor = self.list_mut(list).ok_or_else(|| unknown(list))?;
                let from = editor
                    .index_of(*row)
                    .ok_or_else(|| EditError::StaleAddress(format!("{list}[{row}]")))?;
                Ok(editor.move_row(options, from, *to))
            }
            Action::MergeSettings(settings) => Ok(options.with_settings(settings.clone())),
            other => Err(EditError::Unsupported {
                action: other.name(),
                target: "form",
            }),
        }
    }

    fn set_field(&self, options: &Options, name: &str, value: &Value) -> Result<Options, EditError> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| EditError::UnknownField {
                tag: self.schema.tag.to_string(),
                field: name.to_string(),
            })?;
        let mut builder = options.builder_or_empty();
        if value.is_null() {
            builder.remove(name);
        } else {
            let path = format!("{}.{}", self.schema.tag, name);
            builder.insert(name, field.kind.coerce(value, &path)?);
        }
        Ok(options.with_builder(Some(builder)))
    }
}

/// The slice of a single slot: the nested fragment, if it is an object.
fn single_slice(options: &Options, key: &str) -> Options {
    let node = options
        .builder
        .as_ref()
        .and_then(|b| b.get(key))
        .and_then(ConfigNode::from_value);
    options.slice(node)
}

/// Place a single slot's push; a cleared slot is stored as `null`.
fn place_single(options: &Options, key: &str, pushed: Options) -> Options {
    let mut next = options.clone();
    let node = next.absorb(pushed);
    let builder = next.builder.get_or_insert_with(ConfigNode::new);
    builder.insert(key, node.map(Value::from).unwrap_or(Value::Null));
    next
}
