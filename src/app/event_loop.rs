use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{select, Receiver};

use super::{EditorEvent, Session};

/// How long a save still in flight at shutdown is waited for.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the editing loop until `events` yields [`EditorEvent::Quit`] or closes.
///
/// User events, store replies and the autosave deadline are handled one at a
/// time on the calling thread; only the store call itself runs elsewhere.
pub fn run<W: Write>(
    session: &mut Session,
    events: &Receiver<EditorEvent>,
    out: &mut W,
) -> Result<()> {
    let replies = session.save_replies();
    loop {
        let timer = match session.next_deadline() {
            Some(due_at) => crossbeam_channel::at(due_at),
            None => crossbeam_channel::never(),
        };
        select! {
            recv(events) -> event => match event {
                Ok(EditorEvent::Quit) | Err(_) => break,
                Ok(event) => apply(session, event, out)?,
            },
            recv(replies) -> reply => match reply {
                Ok(reply) => session.handle_reply(reply),
                Err(_) => bail!("save worker stopped unexpectedly"),
            },
            recv(timer) -> _ => session.tick(),
        }
    }

    if !session.settle(FLUSH_TIMEOUT) {
        tracing::warn!("exiting with a save still in flight");
    }
    if session.is_dirty() {
        tracing::warn!(note_id = ?session.draft().id(), "exiting with unsaved changes");
    }
    Ok(())
}

/// Applies one user event to the session.
pub fn apply<W: Write>(session: &mut Session, event: EditorEvent, out: &mut W) -> Result<()> {
    match event {
        EditorEvent::SetTitle(title) => session.set_title(title),
        EditorEvent::SetBody(body) => session.set_body(body),
        EditorEvent::AppendLine(line) => {
            let mut body = session.draft().body().to_string();
            body.push_str(&line);
            body.push('\n');
            session.set_body(body);
        }
        EditorEvent::ManualSave => {
            // refusal is already reported through the notifier
            let _ = session.manual_save();
        }
        EditorEvent::NewNote => session.start_new(),
        EditorEvent::Open(id) => {
            let _ = session.open(id);
        }
        EditorEvent::Delete(id) => {
            let _ = session.delete(id);
        }
        EditorEvent::Status => {
            let draft = session.draft();
            let id = draft
                .id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "new".to_string());
            let mut line = format!("[{id}] {:?} ({} bytes)", draft.title(), draft.body().len());
            if let Some(status) = session.status_line() {
                line.push_str(" - ");
                line.push_str(&status);
            }
            writeln!(out, "{line}").context("writing status line")?;
        }
        EditorEvent::Quit => {}
    }
    Ok(())
}
