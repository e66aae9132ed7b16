use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde_json::{Map, Value};

use crate::{
    data::{catalog::Family, node::ConfigNode, options::Options},
    editor::{Action, Step, TypeDispatcher},
    error::EditError,
};

static NEXT_ROW_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a list row, independent of its position.
///
/// Issued once when the row is created and never reused. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    pub fn next() -> Self {
        Self(NEXT_ROW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A row: its identity and the dispatcher editing its fragment.
#[derive(Debug, Clone)]
pub struct ListRow {
    pub id: RowId,
    pub editor: TypeDispatcher,
}

/// Edits the list stored at `builder[key]`.
///
/// Row `i` of `rows` always belongs to element `i` of the stored list: every
/// operation changes both sequences at the same positions.
#[derive(Debug, Clone)]
pub struct ListEditor {
    key: &'static str,
    family: Family,
    rows: Vec<ListRow>,
}

impl ListEditor {
    /// Mount over the list at `options.builder[key]`, creating it when missing.
    pub fn mount(key: &'static str, family: Family, options: &Options) -> (Self, Options) {
        let mut rows = Vec::new();
        let next = with_items(options, key, |items| {
            for item in items.iter_mut() {
                let slice = options.slice(Some(ConfigNode::from_value(item).unwrap_or_default()));
                let (editor, pushed) = TypeDispatcher::mount(family.registry(), &slice);
                if pushed.builder != slice.builder {
                    *item = node_value(pushed.builder);
                }
                rows.push(ListRow {
                    id: RowId::next(),
                    editor,
                });
            }
        });
        (Self { key, family, rows }, next)
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    pub fn index_of(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    pub fn row(&self, id: RowId) -> Option<&ListRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Append `{}` with a fresh identity.
    pub fn add(&mut self, options: &Options) -> Options {
        let next = with_items(options, self.key, |items| {
            items.push(Value::Object(Map::new()));
        });
        let (editor, _) = TypeDispatcher::mount(self.family.registry(), &options.slice(None));
        let id = RowId::next();
        debug!("{}: added row {id}", self.key);
        self.rows.push(ListRow { id, editor });
        next
    }

    /// Remove the row at `index`; out of range is a no-op.
    pub fn remove(&mut self, options: &Options, index: usize) -> Options {
        if index >= self.rows.len() {
            debug!("{}: no row at {index} to remove", self.key);
            return options.clone();
        }
        let row = self.rows.remove(index);
        debug!("{}: removed row {} at {index}", self.key, row.id);
        with_items(options, self.key, |items| {
            if index < items.len() {
                items.remove(index);
            }
        })
    }

    /// Move the row at `from` to `to`; out of range is a no-op.
    pub fn move_row(&mut self, options: &Options, from: usize, to: usize) -> Options {
        let len = self.rows.len();
        if from >= len || to >= len {
            debug!("{}: cannot move row {from} to {to} of {len}", self.key);
            return options.clone();
        }
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
        with_items(options, self.key, |items| {
            if from < items.len() && to < items.len() {
                let item = items.remove(from);
                items.insert(to, item);
            }
        })
    }

    /// The slice row `index` may see: its fragment, or `{}` past the end.
    pub fn child_options(&self, options: &Options, index: usize) -> Options {
        let node = options
            .builder
            .as_ref()
            .and_then(|b| b.list(self.key).get(index))
            .and_then(ConfigNode::from_value)
            .unwrap_or_default();
        options.slice(Some(node))
    }

    /// Place row `index`'s push: its builder replaces the element, its settings
    /// are merged into the shared ones.
    pub fn on_child_change(&self, options: &Options, index: usize, child: Options) -> Options {
        let mut next = options.clone();
        let node = next.absorb(child);
        with_items(&next, self.key, |items| match items.get_mut(index) {
            Some(item) => *item = node_value(node),
            None => debug!("{}: push from missing row {index} dropped", self.key),
        })
    }

    /// Route an action to the row identified by `id`.
    pub fn handle_row(
        &mut self,
        options: &Options,
        id: RowId,
        steps: &[Step],
        action: &Action,
    ) -> Result<Options, EditError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| EditError::StaleAddress(format!("{}[{id}]", self.key)))?;
        let slice = self.child_options(options, index);
        let pushed = self.rows[index].editor.handle(&slice, steps, action)?;
        Ok(self.on_child_change(options, index, pushed))
    }
}

/// Apply `f` to the list at `builder[key]` of a copy of `options`.
fn with_items(options: &Options, key: &str, f: impl FnOnce(&mut Vec<Value>)) -> Options {
    let mut next = options.clone();
    let builder = next.builder.get_or_insert_with(ConfigNode::new);
    let mut items = builder.take_list(key);
    f(&mut items);
    builder.insert(key, Value::Array(items));
    next
}

fn node_value(node: Option<ConfigNode>) -> Value {
    node.map(Value::from).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::options::Settings;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options(builder: Value) -> Options {
        Options::new(ConfigNode::from_value(&builder), Settings::new())
    }

    fn fields(options: &Options) -> Value {
        options
            .builder
            .as_ref()
            .and_then(|b| b.get("fields"))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn stored_len(options: &Options) -> usize {
        options.builder.as_ref().map_or(0, |b| b.list("fields").len())
    }

    #[test]
    fn test_mount_initialises_missing_list() {
        let (list, out) = ListEditor::mount("fields", Family::Dimension, &options(json!({})));
        assert!(list.is_empty());
        assert_eq!(fields(&out), json!([]));
    }

    #[test]
    fn test_mount_assigns_identity_per_row() {
        let stored = options(json!({"fields": [{"type": "default", "dimension": "a"}, {}]}));
        let (list, out) = ListEditor::mount("fields", Family::Dimension, &stored);
        assert_eq!(list.len(), 2);
        assert_ne!(list.rows()[0].id, list.rows()[1].id);
        assert_eq!(list.rows()[0].editor.selected(), Some("default"));
        assert_eq!(out, stored);
    }

    #[test]
    fn test_length_invariant_over_add_and_remove() {
        let (mut list, mut out) = ListEditor::mount("fields", Family::Dimension, &options(json!({})));
        for op in [0, 0, 1, 0, 9, 1, 1, 0, 2, 1, 1, 1] {
            out = match op {
                0 => list.add(&out),
                index => list.remove(&out, index - 1),
            };
            assert_eq!(list.len(), stored_len(&out));
        }
    }

    #[test]
    fn test_remove_keeps_identities_of_other_rows() {
        let (mut list, mut out) = ListEditor::mount("fields", Family::Dimension, &options(json!({})));
        for _ in 0..4 {
            out = list.add(&out);
        }
        let before = list.ids();
        let out = list.remove(&out, 1);
        assert_eq!(list.ids(), vec![before[0], before[2], before[3]]);
        assert_eq!(stored_len(&out), 3);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let (mut list, out) = ListEditor::mount("fields", Family::Dimension, &options(json!({})));
        let out = list.add(&out);
        let ids = list.ids();
        assert_eq!(list.remove(&out, 5), out);
        assert_eq!(list.ids(), ids);
    }

    #[test]
    fn test_move_row_moves_identity_with_data() {
        let stored = options(json!({"fields": [{"type": "default", "dimension": "a"}, {"type": "default", "dimension": "b"}]}));
        let (mut list, out) = ListEditor::mount("fields", Family::Dimension, &stored);
        let ids = list.ids();
        let out = list.move_row(&out, 0, 1);
        assert_eq!(list.ids(), vec![ids[1], ids[0]]);
        assert_eq!(
            fields(&out),
            json!([{"type": "default", "dimension": "b"}, {"type": "default", "dimension": "a"}])
        );
    }

    #[test]
    fn test_move_row_out_of_range_is_noop() {
        let (mut list, mut out) = ListEditor::mount("fields", Family::Dimension, &options(json!({})));
        out = list.add(&out);
        out = list.add(&out);
        let ids = list.ids();
        assert_eq!(list.move_row(&out, 2, 0), out);
        assert_eq!(list.move_row(&out, 0, 2), out);
        assert_eq!(list.ids(), ids);
    }

    #[test]
    fn test_push_from_missing_row_keeps_only_settings() {
        let (mut list, out) = ListEditor::mount("fields", Family::Dimension, &options(json!({})));
        let out = list.add(&out);
        let stray = Options::new(
            ConfigNode::from_value(&json!({"type": "default"})),
            json!({"granularity": "day"}).as_object().cloned().unwrap(),
        );
        let out = list.on_child_change(&out, 4, stray);
        assert_eq!(fields(&out), json!([{}]));
        assert_eq!(out.settings.get("granularity"), Some(&json!("day")));
    }

    #[test]
    fn test_child_options_past_end_is_empty() {
        let (list, out) = ListEditor::mount("fields", Family::Dimension, &options(json!({})));
        let slice = list.child_options(&out, 3);
        assert_eq!(slice.builder, Some(ConfigNode::new()));
    }

    #[test]
    fn test_child_changes_merge_settings() {
        let (mut list, mut out) = ListEditor::mount("fields", Family::Dimension, &options(json!({})));
        out = list.add(&out);
        out = list.add(&out);

        let first = list
            .child_options(&out, 0)
            .with_settings(json!({"left": 1}).as_object().cloned().unwrap());
        out = list.on_child_change(&out, 0, first);
        let second = list
            .child_options(&out, 1)
            .with_settings(json!({"right": 2}).as_object().cloned().unwrap());
        out = list.on_child_change(&out, 1, second);

        assert_eq!(Value::Object(out.settings), json!({"left": 1, "right": 2}));
    }
}
