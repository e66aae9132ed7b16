use crate::{
    data::options::Options,
    editor::{Action, EditorKind, NodeEditor, SelectOption, Step, TypeRegistry},
    error::EditError,
};

/// Observable state of a [`TypeDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState<'a> {
    /// No child editor is rendered.
    Unselected,
    /// The child editor for this tag is rendered.
    Selected(&'a str),
}

/// Chooses which editor exists for one fragment.
///
/// The dispatcher never writes the fragment itself: picking a tag mounts the
/// matching child, and it is the child's mount that prunes and stamps the
/// builder. `clear` is the exception and resets the builder to `null`.
#[derive(Debug, Clone)]
pub struct TypeDispatcher {
    registry: TypeRegistry,
    selected: Option<SelectOption>,
    child: Option<Box<NodeEditor>>,
}

impl TypeDispatcher {
    /// Build a dispatcher over `options.builder`.
    ///
    /// A stored `type` found in the selectable set starts the dispatcher in
    /// the selected state. A stored tag that is not selectable leaves it
    /// unselected and the tag untouched.
    pub fn mount(registry: TypeRegistry, options: &Options) -> (Self, Options) {
        let mut dispatcher = Self {
            registry,
            selected: None,
            child: None,
        };
        let stored = options.builder.as_ref().and_then(|b| b.type_tag());
        let Some(tag) = stored else {
            return (dispatcher, options.clone());
        };
        match dispatcher.registry.find(tag).cloned() {
            Some(option) => {
                dispatcher.selected = Some(option);
                let options = dispatcher.mount_child(options);
                (dispatcher, options)
            }
            None => {
                debug!("stored type `{tag}` is not selectable, leaving it unselected");
                (dispatcher, options.clone())
            }
        }
    }

    pub fn state(&self) -> DispatchState<'_> {
        match &self.selected {
            Some(option) => DispatchState::Selected(&option.value),
            None => DispatchState::Unselected,
        }
    }

    /// The selected tag, if any.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_ref().map(|o| o.value.as_str())
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The mounted child editor. `None` when unselected or when the selected
    /// tag resolves to no editor.
    pub fn child(&self) -> Option<&NodeEditor> {
        self.child.as_deref()
    }

    /// Select `tag` and mount its editor. Picking the current tag is a no-op.
    pub fn pick(&mut self, options: &Options, tag: &str) -> Options {
        let Some(option) = self.registry.find(tag).cloned() else {
            warn!("`{tag}` is not a selectable type");
            return options.clone();
        };
        if self.selected.as_ref() == Some(&option) {
            return options.clone();
        }
        debug!("type switched to `{}`", option.value);
        self.selected = Some(option);
        self.mount_child(options)
    }

    /// Drop the selection and reset the builder to `null`.
    pub fn clear(&mut self, options: &Options) -> Options {
        debug!("builder cleared");
        self.selected = None;
        self.child = None;
        options.with_builder(None)
    }

    /// Add a free-text tag to the selectable set, then pick it.
    pub fn register_custom(&mut self, options: &Options, tag: &str) -> Options {
        let tag = tag.trim();
        if tag.is_empty() {
            warn!("ignoring empty custom type");
            return options.clone();
        }
        if !self.registry.contains(tag) {
            info!("registered custom type `{tag}`");
            self.registry.register(tag, EditorKind::Custom);
        }
        self.pick(options, tag)
    }

    fn mount_child(&mut self, options: &Options) -> Options {
        let Some(option) = &self.selected else {
            self.child = None;
            return options.clone();
        };
        match self.registry.resolve(&option.value) {
            Some(kind) => {
                let slice = options.slice(Some(options.builder_or_empty()));
                let (editor, pushed) = NodeEditor::mount(kind, &option.value, &slice);
                self.child = Some(Box::new(editor));
                options.adopt(pushed)
            }
            None => {
                self.child = None;
                options.clone()
            }
        }
    }

    /// Route `action` to this dispatcher or, through [`Step::Child`], below it.
    pub fn handle(
        &mut self,
        options: &Options,
        steps: &[Step],
        action: &Action,
    ) -> Result<Options, EditError> {
        let Some((step, rest)) = steps.split_first() else {
            return match action {
                Action::Pick(tag) => Ok(self.pick(options, tag)),
                Action::Clear => Ok(self.clear(options)),
                Action::RegisterCustom(tag) => Ok(self.register_custom(options, tag)),
                Action::MergeSettings(settings) => Ok(options.with_settings(settings.clone())),
                other => Err(EditError::Unsupported {
                    action: other.name(),
                    target: "type dispatcher",
                }),
            };
        };
        match (step, self.child.as_mut()) {
            (Step::Child, Some(child)) => {
                let slice = options.slice(Some(options.builder_or_empty()));
                let pushed = child.handle(&slice, rest, action)?;
                Ok(options.adopt(pushed))
            }
            _ => Err(EditError::StaleAddress(step.to_string())),
        }
    }

    /// The dispatcher `steps` lead to, starting here.
    pub fn find(&self, steps: &[Step]) -> Option<&TypeDispatcher> {
        let Some((step, rest)) = steps.split_first() else {
            return Some(self);
        };
        if *step != Step::Child {
            return None;
        }
        let form = self.child()?.as_form()?;
        let (next, rest) = rest.split_first()?;
        let dispatcher = match next {
            Step::Slot(key) => form.single(key)?,
            Step::Row { list, id } => &form.list(list)?.row(*id)?.editor,
            Step::Child => return None,
        };
        dispatcher.find(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{catalog::Family, node::ConfigNode, options::Settings};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn options(builder: Value) -> Options {
        Options::new(ConfigNode::from_value(&builder), Settings::new())
    }

    fn builder(options: &Options) -> Value {
        options.builder.clone().map(Value::from).unwrap_or(Value::Null)
    }

    #[test]
    fn test_starts_unselected_without_type() {
        let (dispatcher, out) = TypeDispatcher::mount(Family::Search.registry(), &options(json!({})));
        assert_eq!(dispatcher.state(), DispatchState::Unselected);
        assert!(dispatcher.child().is_none());
        assert_eq!(builder(&out), json!({}));
    }

    #[test]
    fn test_reload_restores_selection() {
        let stored = options(json!({"type": "contains", "value": "x"}));
        let (dispatcher, out) = TypeDispatcher::mount(Family::Search.registry(), &stored);
        assert_eq!(dispatcher.state(), DispatchState::Selected("contains"));
        assert_eq!(dispatcher.child().map(NodeEditor::tag), Some("contains"));
        assert_eq!(out, stored);
    }

    #[test]
    fn test_unknown_stored_tag_stays_unselected() {
        let stored = options(json!({"type": "unheardOf", "value": "x"}));
        let (dispatcher, out) = TypeDispatcher::mount(Family::Search.registry(), &stored);
        assert_eq!(dispatcher.state(), DispatchState::Unselected);
        assert_eq!(builder(&out), json!({"type": "unheardOf", "value": "x"}));
    }

    #[test]
    fn test_switch_prunes_fields_of_previous_type() {
        let (mut dispatcher, out) = TypeDispatcher::mount(Family::Search.registry(), &options(json!({})));
        let out = dispatcher.pick(&out, "contains");
        let out = dispatcher
            .handle(
                &out,
                &[Step::Child],
                &Action::SetField {
                    name: "value".into(),
                    value: json!("x"),
                },
            )
            .unwrap();
        assert_eq!(builder(&out), json!({"type": "contains", "value": "x"}));

        let out = dispatcher.pick(&out, "regex");
        assert_eq!(dispatcher.state(), DispatchState::Selected("regex"));
        assert_eq!(builder(&out), json!({"type": "regex"}));
    }

    #[test]
    fn test_pick_same_tag_is_noop() {
        let stored = options(json!({"type": "contains", "value": "x"}));
        let (mut dispatcher, out) = TypeDispatcher::mount(Family::Search.registry(), &stored);
        assert_eq!(dispatcher.pick(&out, "Contains"), out);
    }

    #[test]
    fn test_pick_unknown_tag_changes_nothing() {
        let (mut dispatcher, out) = TypeDispatcher::mount(Family::Search.registry(), &options(json!({})));
        assert_eq!(dispatcher.pick(&out, "cardinality"), out);
        assert_eq!(dispatcher.state(), DispatchState::Unselected);
    }

    #[test]
    fn test_clear_nulls_builder() {
        let stored = options(json!({"type": "regex", "pattern": "^a"}));
        let (mut dispatcher, out) = TypeDispatcher::mount(Family::Search.registry(), &stored);
        let out = dispatcher.handle(&out, &[], &Action::Clear).unwrap();
        assert_eq!(out.builder, None);
        assert_eq!(dispatcher.state(), DispatchState::Unselected);
    }

    #[test]
    fn test_register_custom_then_pick_again() {
        let (mut dispatcher, out) =
            TypeDispatcher::mount(Family::Aggregation.registry(), &options(json!({})));
        let out = dispatcher.pick(&out, "cardinality");
        let out = dispatcher.register_custom(&out, "MyCustomTag");
        let out = dispatcher.pick(&out, "MyCustomTag");

        assert_eq!(dispatcher.state(), DispatchState::Selected("MyCustomTag"));
        assert!(dispatcher.registry().contains("MyCustomTag"));
        assert_eq!(builder(&out), json!({"type": "MyCustomTag"}));

        let out = dispatcher.pick(&out, "count");
        let out = dispatcher.pick(&out, "MyCustomTag");
        assert_eq!(dispatcher.state(), DispatchState::Selected("MyCustomTag"));
        assert_eq!(builder(&out), json!({"type": "MyCustomTag"}));
    }

    #[test]
    fn test_child_step_without_child_is_stale() {
        let (mut dispatcher, out) = TypeDispatcher::mount(Family::Search.registry(), &options(json!({})));
        let err = dispatcher
            .handle(&out, &[Step::Child], &Action::Clear)
            .unwrap_err();
        assert_eq!(err, EditError::StaleAddress("*".to_string()));
    }
}
