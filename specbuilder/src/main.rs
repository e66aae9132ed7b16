use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use log::info;
use specbuilder::{
    Action, Address, Family, RowId, Session, TypeDispatcher, Value, data::options,
    editor::NodeEditor,
};

#[derive(Parser)]
#[command(name = "specbuilder", version)]
#[command(about = "Compose query spec options stored in a JSON or TOML file", long_about = None)]
struct Cli {
    /// Options file (`.json` or `.toml`).
    #[arg(short, long)]
    file: PathBuf,

    /// Tags offered by the root dispatcher.
    #[arg(long, value_enum, default_value_t = Family::Search)]
    family: Family,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the options.
    Show,
    /// Print the JSON Schema of the options value.
    Schema,
    /// List the selectable tags of a dispatcher.
    Tags {
        #[arg(default_value = "")]
        path: String,
    },
    /// Select a tag.
    Pick { path: String, tag: String },
    /// Register a free-text tag and select it.
    Custom { path: String, tag: String },
    /// Reset a builder to null.
    Clear { path: String },
    /// Set a field; the value is parsed as JSON, falling back to text.
    Set {
        path: String,
        field: String,
        value: String,
    },
    /// Append an empty row to a list.
    Add { path: String, list: String },
    /// Remove the row at an index.
    Remove {
        path: String,
        list: String,
        index: usize,
    },
    /// Move a row to another position.
    Move {
        path: String,
        list: String,
        from: usize,
        to: usize,
    },
    /// Merge one key into the shared settings.
    Setting { key: String, value: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut session = Session::load(&cli.file, cli.family)?;

    match cli.cmd {
        Commands::Show => print_options(&session)?,
        Commands::Schema => println!("{}", serde_json::to_string_pretty(&options::schema()?)?),
        Commands::Tags { path } => {
            let address = session.resolve(&path)?;
            let dispatcher = session
                .dispatcher(&address)
                .ok_or_else(|| anyhow!("no dispatcher at `{path}`"))?;
            for option in dispatcher.registry().options() {
                let mark = if dispatcher.selected() == Some(option.value.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{mark} {:<24}{}", option.value, option.label);
            }
        }
        Commands::Pick { path, tag } => {
            let address = session.resolve(&path)?;
            edit(&mut session, &address, Action::Pick(tag))?;
        }
        Commands::Custom { path, tag } => {
            let address = session.resolve(&path)?;
            edit(&mut session, &address, Action::RegisterCustom(tag))?;
        }
        Commands::Clear { path } => {
            let address = session.resolve(&path)?;
            edit(&mut session, &address, Action::Clear)?;
        }
        Commands::Set { path, field, value } => {
            let address = session.resolve_node(&path)?;
            let action = Action::SetField {
                name: field,
                value: parse_value(value),
            };
            edit(&mut session, &address, action)?;
        }
        Commands::Add { path, list } => {
            let address = session.resolve_node(&path)?;
            edit(&mut session, &address, Action::AddRow { list })?;
        }
        Commands::Remove { path, list, index } => {
            let address = session.resolve_node(&path)?;
            match row_id(&session, &path, &list, index)? {
                Some(row) => edit(&mut session, &address, Action::RemoveRow { list, row })?,
                None => no_change(&session)?,
            }
        }
        Commands::Move {
            path,
            list,
            from,
            to,
        } => {
            let address = session.resolve_node(&path)?;
            match row_id(&session, &path, &list, from)? {
                Some(row) => edit(&mut session, &address, Action::MoveRow { list, row, to })?,
                None => no_change(&session)?,
            }
        }
        Commands::Setting { key, value } => {
            let mut settings = specbuilder::Settings::new();
            settings.insert(key, parse_value(value));
            edit(&mut session, &Address::root(), Action::MergeSettings(settings))?;
        }
    }

    Ok(())
}

fn edit(session: &mut Session, address: &Address, action: Action) -> Result<()> {
    session.apply(address, action);
    if session.save()? {
        info!("options written");
        print_options(session)
    } else {
        no_change(session)
    }
}

fn no_change(session: &Session) -> Result<()> {
    println!("No change.");
    print_options(session)
}

/// Identity of the row at `index` of the list slot `list` under `path`.
fn row_id(session: &Session, path: &str, list: &str, index: usize) -> Result<Option<RowId>> {
    let editor = session
        .dispatcher(&session.resolve(path)?)
        .and_then(TypeDispatcher::child)
        .and_then(NodeEditor::as_form)
        .and_then(|form| form.list(list))
        .ok_or_else(|| anyhow!("`{list}` is not a list"))?;
    Ok(editor.rows().get(index).map(|row| row.id))
}

fn print_options(session: &Session) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(session.options())?);
    Ok(())
}

fn parse_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}
