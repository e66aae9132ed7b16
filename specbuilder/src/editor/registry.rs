use crate::data::catalog::FormSchema;

/// The kinds of editor a tag can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    /// A declared node kind.
    Form(&'static FormSchema),
    /// A tag typed in by the user; only `type` is legal.
    Custom,
}

/// An entry of the selectable set, as shown by a picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone)]
struct Entry {
    option: SelectOption,
    kind: EditorKind,
}

/// Maps type tags to editor kinds and keeps the ordered selectable set.
///
/// Lookups ignore ASCII case, so a stored `longSum` finds the `longsum`
/// entry and vice versa.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: Vec<Entry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins(schemas: &[&'static FormSchema]) -> Self {
        let mut registry = Self::new();
        for &schema in schemas {
            registry.insert(
                SelectOption {
                    label: schema.label.to_string(),
                    value: schema.tag.to_string(),
                },
                EditorKind::Form(schema),
            );
        }
        registry
    }

    /// Register `tag`, replacing the kind of an existing entry with the same tag.
    pub fn register(&mut self, tag: &str, kind: EditorKind) {
        self.insert(
            SelectOption {
                label: tag.to_string(),
                value: tag.to_string(),
            },
            kind,
        );
    }

    fn insert(&mut self, option: SelectOption, kind: EditorKind) {
        match self.position(&option.value) {
            Some(idx) => self.entries[idx].kind = kind,
            None => self.entries.push(Entry { option, kind }),
        }
    }

    fn position(&self, tag: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.option.value.eq_ignore_ascii_case(tag))
    }

    /// The editor kind for `tag`; `None` means render nothing.
    pub fn resolve(&self, tag: &str) -> Option<EditorKind> {
        self.position(tag).map(|idx| self.entries[idx].kind)
    }

    /// The selectable entry for `tag`.
    pub fn find(&self, tag: &str) -> Option<&SelectOption> {
        self.position(tag).map(|idx| &self.entries[idx].option)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.position(tag).is_some()
    }

    pub fn options(&self) -> impl Iterator<Item = &SelectOption> {
        self.entries.iter().map(|e| &e.option)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
