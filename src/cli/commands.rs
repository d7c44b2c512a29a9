use std::fmt::Write as _;
use std::io::{self, BufRead, Read};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use crossbeam_channel::Sender;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::app::actions::parse_line;
use crate::app::event_loop::{self, FLUSH_TIMEOUT};
use crate::app::{ConsoleNotifier, EditorEvent, Session};
use crate::config::{AppConfig, ConfigLoader, SettingsHandle};
use crate::storage::{NoteId, NoteStore, NoteSummary, StoreHealth};

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Open an existing note instead of starting a new one
    #[arg(long)]
    pub open: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Note identifier
    pub id: i64,
}

#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    /// Title for the note
    #[arg(long)]
    pub title: String,
    /// Provide the note body inline. If omitted, reads from stdin.
    #[arg(long)]
    pub body: Option<String>,
    /// Update this note instead of creating a new one
    #[arg(long)]
    pub id: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier
    pub id: i64,
}

#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Turn autosave on
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,
    /// Turn autosave off
    #[arg(long)]
    pub disable: bool,
    /// Seconds of inactivity before an autosave fires
    #[arg(long)]
    pub delay: Option<u64>,
}

const EDIT_HELP: &str = "\
Type lines to append them to the body.
  :title <text>   set the title        :body <text>   replace the body
  :save           save now             :new           start a new note
  :open <id>      open a note          :delete <id>   delete a note
  :status         show draft status    :quit          leave (pending save is flushed)
Start a line with \\: to type a literal colon.";

pub fn run_edit(config: &AppConfig, store: Arc<dyn NoteStore>, args: EditArgs) -> Result<()> {
    if store.health() != StoreHealth::Connected {
        bail!("Cannot connect to the note store");
    }

    let settings = SettingsHandle::new(config.auto_save.clone());
    let mut session = Session::new(store, Arc::new(ConsoleNotifier), Arc::new(settings))?
        .with_switch_policy(config.session.switch_policy)
        .with_save_status(config.editor.show_save_status);
    if let Some(id) = args.open {
        session
            .open(NoteId(id))
            .with_context(|| format!("opening note {id}"))?;
    }

    println!("{EDIT_HELP}");
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("notesync-input".into())
        .spawn(move || forward_stdin(io::stdin().lock(), &tx))
        .context("spawning input thread")?;

    event_loop::run(&mut session, &rx, &mut io::stdout())
}

/// Feeds parsed input lines into the editing loop. Ends with `Quit` on EOF.
fn forward_stdin<R: BufRead>(input: R, tx: &Sender<EditorEvent>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(%err, "reading input failed");
                break;
            }
        };
        match parse_line(&line) {
            Ok(event) => {
                let quit = event == EditorEvent::Quit;
                if tx.send(event).is_err() || quit {
                    return;
                }
            }
            Err(err) => eprintln!("{err}"),
        }
    }
    let _ = tx.send(EditorEvent::Quit);
}

pub fn list_notes(store: &dyn NoteStore, args: ListArgs) -> Result<()> {
    let notes = store.list();
    if args.json {
        let json = serde_json::to_string_pretty(&notes).context("serializing note list")?;
        println!("{json}");
    } else {
        print!("{}", format_listing(&notes));
    }
    Ok(())
}

fn format_listing(notes: &[NoteSummary]) -> String {
    if notes.is_empty() {
        return "No notes yet.\n".to_string();
    }
    let mut out = String::new();
    for note in notes {
        let _ = writeln!(&mut out, "#{}  {}", note.id, note.title);
        let _ = writeln!(
            &mut out,
            "    {} bytes, modified {}",
            note.size,
            format_timestamp(note.last_modified)
        );
    }
    out
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

pub fn show_note(store: &dyn NoteStore, args: ShowArgs) -> Result<()> {
    let record = store
        .fetch(NoteId(args.id))
        .with_context(|| format!("fetching note {}", args.id))?;
    println!("# {}", record.title);
    println!("modified {}", format_timestamp(record.last_modified));
    println!();
    print!("{}", record.body);
    if !record.body.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// One-shot save through a session so it follows the same validation and
/// single-save rules as the editor.
pub fn save_note(config: &AppConfig, store: Arc<dyn NoteStore>, args: SaveArgs) -> Result<()> {
    let body = match args.body {
        Some(body) => body,
        None => read_stdin()?.unwrap_or_default(),
    };

    let mut session = Session::new(
        store,
        Arc::new(ConsoleNotifier),
        Arc::new(config.auto_save.settings()),
    )?;
    if let Some(id) = args.id {
        session
            .open(NoteId(id))
            .with_context(|| format!("opening note {id}"))?;
    }
    session.set_title(args.title);
    session.set_body(body);
    session.manual_save()?;

    if !session.settle(FLUSH_TIMEOUT) {
        bail!("save did not complete within {}s", FLUSH_TIMEOUT.as_secs());
    }
    match session.draft().id() {
        Some(id) if !session.is_dirty() => {
            println!("Saved note #{id}");
            Ok(())
        }
        _ => bail!("note was not saved"),
    }
}

pub fn delete_note(store: &dyn NoteStore, args: DeleteArgs) -> Result<()> {
    store
        .delete(NoteId(args.id))
        .with_context(|| format!("deleting note {}", args.id))?;
    println!("Deleted note #{}", args.id);
    Ok(())
}

pub fn check_health(store: &dyn NoteStore) -> Result<()> {
    let health = store.health();
    println!("store: {health}");
    if health != StoreHealth::Connected {
        bail!("Cannot connect to the note store");
    }
    Ok(())
}

pub fn update_settings(
    loader: &ConfigLoader,
    mut config: AppConfig,
    args: SettingsArgs,
) -> Result<()> {
    let changed = args.enable || args.disable || args.delay.is_some();
    if args.enable {
        config.auto_save.enabled = true;
    }
    if args.disable {
        config.auto_save.enabled = false;
    }
    if let Some(secs) = args.delay {
        if secs == 0 {
            bail!("autosave delay must be at least one second");
        }
        config.auto_save.delay = Duration::from_secs(secs);
    }
    if changed {
        loader.save(&config)?;
    }

    println!(
        "autosave: {}, delay {}s",
        if config.auto_save.enabled { "on" } else { "off" },
        config.auto_save.delay.as_secs()
    );
    Ok(())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}
