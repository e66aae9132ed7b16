//! Host side of the protocol: the persisted options, the mounted editor tree
//! and the change listeners.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, anyhow, bail};
use serde_json::Value;

use crate::{
    data::{catalog::Family, node::ConfigNode, options::Options},
    editor::{Action, Address, NodeEditor, Step, TypeDispatcher},
};

/// Listener invoked with the new options after every handled action.
pub type ChangeCallback = Box<dyn FnMut(&Options)>;

/// Options under edit plus the editor tree mounted over them.
pub struct Session {
    /// Family offered by the root dispatcher.
    pub family: Family,
    /// Whether the options have changed since they were loaded or saved.
    pub needs_save: bool,
    /// File the options are persisted to.
    pub path: Option<PathBuf>,
    options: Options,
    root: TypeDispatcher,
    listeners: Vec<ChangeCallback>,
}

impl Session {
    /// Mount a tree over already loaded options.
    ///
    /// Mounting may normalise the value (stale keys pruned, missing lists
    /// created); that is persisted together with the next edit.
    pub fn new(family: Family, options: Options) -> Self {
        let (root, options) = TypeDispatcher::mount(family.registry(), &options);
        Self {
            family,
            needs_save: false,
            path: None,
            options,
            root,
            listeners: Vec::new(),
        }
    }

    /// Load options from a `.json` or `.toml` file.
    ///
    /// A missing or blank file yields `{ builder: null, settings: {} }`.
    pub fn load(path: impl AsRef<Path>, family: Family) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let ext = extension(path);
        if !matches!(ext, "json" | "toml") {
            bail!("Unsupported options file extension: {ext:?}");
        }

        let mut options = Options::default();
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if !content.trim().is_empty() {
                options = match ext {
                    "json" => serde_json::from_str(&content)?,
                    _ => {
                        let v: toml::Value = toml::from_str(&content)?;
                        serde_json::from_value(serde_json::to_value(v)?)?
                    }
                };
            }
        }

        let mut session = Self::new(family, options);
        session.path = Some(path.to_path_buf());
        Ok(session)
    }

    /// Write pending changes, backing up the previous file first.
    ///
    /// Returns whether anything was written.
    pub fn save(&mut self) -> anyhow::Result<bool> {
        if !self.needs_save {
            return Ok(false);
        }
        let Some(path) = &self.path else {
            bail!("Session has no options file");
        };
        let ext = extension(path);
        let content = match ext {
            "json" => serde_json::to_string_pretty(&self.options)?,
            "toml" => {
                if let Some(slot) = self.options.builder.as_ref().and_then(cleared_slot) {
                    bail!("cleared slot `{slot}` cannot be stored in TOML, use .json");
                }
                toml::to_string_pretty(&self.options)
                    .context("Options cannot be represented as TOML")?
            }
            _ => bail!("Unsupported options file extension: {ext:?}"),
        };

        if path.exists() {
            let bk = format!(
                "bk-{:?}.{ext}",
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)?
                    .as_secs()
            );
            let backup_path = path.with_extension(bk);
            fs::copy(path, &backup_path)?;
            debug!("backed up {} to {}", path.display(), backup_path.display());
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("saved {}", path.display());
        self.needs_save = false;
        Ok(true)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn root(&self) -> &TypeDispatcher {
        &self.root
    }

    /// The dispatcher at `address`, if it addresses one.
    pub fn dispatcher(&self, address: &Address) -> Option<&TypeDispatcher> {
        self.root.find(address.steps())
    }

    /// Register an `onOptionsChange` listener.
    pub fn on_options_change(&mut self, callback: impl FnMut(&Options) + 'static) {
        self.listeners.push(Box::new(callback));
    }

    /// Deliver one action and notify the listeners.
    ///
    /// A rejected action is logged and leaves the options unchanged; the
    /// listeners are not called.
    pub fn apply(&mut self, address: &Address, action: Action) -> &Options {
        match self.root.handle(&self.options, address.steps(), &action) {
            Ok(next) => {
                if next != self.options {
                    self.needs_save = true;
                }
                self.options = next;
                for listener in &mut self.listeners {
                    listener(&self.options);
                }
            }
            Err(e) => warn!("{address}: {} ignored: {e}", action.name()),
        }
        &self.options
    }

    /// Address of the dispatcher at a dot-separated path.
    ///
    /// Segments name single slots or list slots; a list slot is followed by
    /// a row index, which is mapped to the identity of the row currently at
    /// that position. The empty path is the root dispatcher.
    pub fn resolve(&self, path: &str) -> anyhow::Result<Address> {
        let mut address = Address::root();
        let mut dispatcher = &self.root;
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        while let Some(segment) = segments.next() {
            let form = dispatcher
                .child()
                .and_then(NodeEditor::as_form)
                .ok_or_else(|| anyhow!("`{segment}`: nothing with slots is selected at {address}"))?;
            address.push(Step::Child);
            if let Some(single) = form.single(segment) {
                address.push(Step::Slot(segment.to_string()));
                dispatcher = single;
            } else if let Some(list) = form.list(segment) {
                let index: usize = segments
                    .next()
                    .ok_or_else(|| anyhow!("`{segment}` needs a row index"))?
                    .parse()
                    .with_context(|| format!("Invalid row index for `{segment}`"))?;
                let row = list
                    .rows()
                    .get(index)
                    .ok_or_else(|| anyhow!("`{segment}` has no row {index}"))?;
                address.push(Step::Row {
                    list: segment.to_string(),
                    id: row.id,
                });
                dispatcher = &row.editor;
            } else {
                bail!("`{}` has no slot `{segment}`", form.tag());
            }
        }
        Ok(address)
    }

    /// Address of the node editor selected at a dot-separated path.
    pub fn resolve_node(&self, path: &str) -> anyhow::Result<Address> {
        Ok(self.resolve(path)?.child())
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|s| s.to_str()).unwrap_or("")
}

/// Dot path of the first `null` below `node`.
fn cleared_slot(node: &ConfigNode) -> Option<String> {
    fn find(value: &Value) -> Option<String> {
        let children: Vec<(String, &Value)> = match value {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
            _ => return None,
        };
        children.into_iter().find_map(|(key, child)| match child {
            Value::Null => Some(key),
            _ => find(child).map(|rest| format!("{key}.{rest}")),
        })
    }
    find(&Value::from(node.clone()))
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn builder(session: &Session) -> Value {
        serde_json::to_value(session.options()).unwrap()["builder"].clone()
    }

    #[test]
    fn test_listeners_see_every_push() {
        let mut session = Session::new(Family::Search, Options::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        session.on_options_change(move |options| sink.borrow_mut().push(options.clone()));

        session.apply(&Address::root(), Action::Pick("regex".into()));
        session.apply(
            &Address::root().child(),
            Action::SetField {
                name: "pattern".into(),
                value: json!("^a"),
            },
        );

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(&seen[1], session.options());
        assert!(session.needs_save);
    }

    #[test]
    fn test_rejected_action_keeps_options() {
        let mut session = Session::new(Family::Search, Options::default());
        session.apply(&Address::root(), Action::Pick("contains".into()));
        let before = session.options().clone();
        session.apply(
            &Address::root().child(),
            Action::SetField {
                name: "nope".into(),
                value: json!(1),
            },
        );
        assert_eq!(session.options(), &before);
    }

    #[test]
    fn test_resolve_maps_indices_to_identities() {
        let options: Options = serde_json::from_value(json!({
            "builder": {
                "type": "cardinality",
                "fields": [
                    {"type": "default", "dimension": "a"},
                    {"type": "prefixFiltered", "prefix": "p", "delegate": {"type": "default"}}
                ]
            },
            "settings": {}
        }))
        .unwrap();
        let session = Session::new(Family::Aggregation, options);
        let rows = session.root().child().unwrap().as_form().unwrap().list("fields").unwrap().ids();

        let address = session.resolve("fields.1.delegate").unwrap();
        assert_eq!(
            address,
            Address::root().child().row("fields", rows[1]).child().slot("delegate")
        );
        assert_eq!(
            session.dispatcher(&address).and_then(TypeDispatcher::selected),
            Some("default")
        );
        assert!(session.resolve("fields.7").is_err());
        assert!(session.resolve("nothing").is_err());
        assert_eq!(session.resolve_node("").unwrap(), Address::root().child());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(dir.path().join("query.json"), Family::Search).unwrap();
        assert_eq!(session.options(), &Options::default());
        assert!(session.root().child().is_none());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        assert!(Session::load("query.yaml", Family::Search).is_err());
    }

    #[test]
    fn test_save_json_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.json");
        fs::write(&path, r#"{"builder": {"type": "all"}, "settings": {"x": 1}}"#).unwrap();

        let mut session = Session::load(&path, Family::Search).unwrap();
        assert!(!session.save().unwrap());
        session.apply(&Address::root(), Action::Pick("regex".into()));
        assert!(session.save().unwrap());
        assert!(!session.needs_save);

        let reloaded = Session::load(&path, Family::Search).unwrap();
        assert_eq!(builder(&reloaded), json!({"type": "regex"}));
        assert_eq!(reloaded.options().settings["x"], json!(1));

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".bk-"))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_save_and_reload_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.toml");
        let mut session = Session::load(&path, Family::Search).unwrap();
        session.apply(&Address::root(), Action::Pick("fragment".into()));
        session.apply(
            &Address::root().child(),
            Action::SetField {
                name: "values".into(),
                value: json!("a, b"),
            },
        );
        assert!(session.save().unwrap());

        let reloaded = Session::load(&path, Family::Search).unwrap();
        assert_eq!(reloaded.root().selected(), Some("fragment"));
        assert_eq!(
            builder(&reloaded),
            json!({"type": "fragment", "values": ["a", "b"]})
        );
    }

    #[test]
    fn test_load_blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.toml");
        fs::write(&path, "  \n").unwrap();
        let session = Session::load(&path, Family::Aggregation).unwrap();
        assert_eq!(session.options(), &Options::default());
        assert!(!session.needs_save);
    }

    #[test]
    fn test_toml_save_names_cleared_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::load(dir.path().join("query.toml"), Family::Aggregation).unwrap();
        session.apply(&Address::root(), Action::Pick("cardinality".into()));
        session.apply(&Address::root().child(), Action::AddRow { list: "fields".into() });
        let row = session.resolve("fields.0").unwrap();
        session.apply(&row, Action::Pick("default".into()));
        session.apply(&row, Action::Clear);
        assert_eq!(builder(&session)["fields"], json!([null]));

        let err = session.save().unwrap_err();
        assert_eq!(
            err.to_string(),
            "cleared slot `fields.0` cannot be stored in TOML, use .json"
        );
        assert!(session.needs_save);
    }

    #[test]
    fn test_move_row_by_identity() {
        let mut session = Session::new(Family::Aggregation, Options::default());
        let form = Address::root().child();
        session.apply(&Address::root(), Action::Pick("cardinality".into()));
        for (i, tag) in ["default", "listFiltered", "prefixFiltered"].iter().enumerate() {
            session.apply(&form, Action::AddRow { list: "fields".into() });
            let row = session.resolve(&format!("fields.{i}")).unwrap();
            session.apply(&row, Action::Pick(tag.to_string()));
        }
        let ids = session.root().child().unwrap().as_form().unwrap().list("fields").unwrap().ids();

        session.apply(&form, Action::RemoveRow { list: "fields".into(), row: ids[0] });
        session.apply(&form, Action::MoveRow { list: "fields".into(), row: ids[2], to: 0 });
        assert_eq!(
            builder(&session)["fields"],
            json!([{"type": "prefixFiltered"}, {"type": "listFiltered"}])
        );

        let before = session.options().clone();
        session.apply(&form, Action::MoveRow { list: "fields".into(), row: ids[0], to: 1 });
        assert_eq!(session.options(), &before);
    }
}
