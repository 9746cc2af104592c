//! Line-oriented operator shell.
//!
//! Keeps one [`SearchSession`] and one scene alive so "run search" and
//! "create anchors" stay independent triggers with the operator as scheduler.
//! Completions are applied as soon as they land, between input lines.

use std::collections::VecDeque;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::materialize::materialize_results;
use crate::places::{CompletionOutcome, PlacesTransport, SearchSession, SessionState};
use crate::scene::SceneDocument;

pub const HELP: &str = "\
commands:
  search [text]   start a search (cancels any pending one)
  wait            hold later commands until the pending search finishes
  cancel          abort the pending search
  materialize     create anchors from the last results
  results         list the last results
  status          show session state
  save            write the scene back to disk
  help            show this help
  quit            leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Search(Option<String>),
    Wait,
    Cancel,
    Materialize,
    Results,
    Status,
    Save,
    Help,
    Quit,
    /// Unparseable line, reported in its turn.
    Invalid(String),
}

impl ShellCommand {
    /// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let cmd = match word.to_ascii_lowercase().as_str() {
            "search" | "run" => Self::Search((!rest.is_empty()).then(|| rest.to_string())),
            "wait" => Self::Wait,
            "cancel" => Self::Cancel,
            "materialize" | "anchors" => Self::Materialize,
            "results" | "ls" => Self::Results,
            "status" => Self::Status,
            "save" => Self::Save,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command '{other}' (try 'help')")),
        };
        Ok(Some(cmd))
    }
}

/// Run the shell until `quit` or end of input.
///
/// Commands run in input order. After `wait`, later commands are held until
/// the pending search lands; input is still read meanwhile and `cancel`
/// skips the queue. A search still pending at exit is cancelled with the
/// session.
pub async fn run_shell<T, R, W>(
    session: &mut SearchSession<T>,
    scene: &mut SceneDocument,
    template: Option<&str>,
    input: R,
    output: &mut W,
) -> Result<()>
where
    T: PlacesTransport,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut input_open = true;
    let mut waiting = false;
    let mut held: VecDeque<ShellCommand> = VecDeque::new();

    'shell: loop {
        while !waiting {
            let Some(cmd) = held.pop_front() else { break };
            if cmd == ShellCommand::Quit {
                break 'shell;
            }
            waiting = execute(cmd, session, scene, template, output).await?;
        }
        if !input_open && !waiting {
            break;
        }

        tokio::select! {
            biased;
            Some(done) = session.next_completion() => {
                let outcome = session.handle_completion(done);
                say(output, &describe(&outcome)).await?;
                waiting = false;
            }
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                match ShellCommand::parse(&line) {
                    Ok(Some(ShellCommand::Cancel)) if waiting => {
                        execute(ShellCommand::Cancel, session, scene, template, output).await?;
                        waiting = false;
                    }
                    Ok(Some(cmd)) => held.push_back(cmd),
                    Ok(None) => {}
                    Err(msg) => held.push_back(ShellCommand::Invalid(msg)),
                }
            }
            else => break,
        }
    }

    output.flush().await?;
    Ok(())
}

/// Returns `true` when `cmd` was a `wait` on a pending search.
async fn execute<T, W>(
    cmd: ShellCommand,
    session: &mut SearchSession<T>,
    scene: &mut SceneDocument,
    template: Option<&str>,
    output: &mut W,
) -> Result<bool>
where
    T: PlacesTransport,
    W: AsyncWrite + Unpin,
{
    match cmd {
        ShellCommand::Search(text) => match session.start_search_with(&*scene, text.as_deref()) {
            Ok(id) => say(output, &format!("{id}: searching")).await?,
            Err(e) => say(output, &format!("error: {e}")).await?,
        },
        ShellCommand::Wait => match session.state() {
            SessionState::Pending(id) => {
                say(output, &format!("{id}: waiting (cancel to abort)")).await?;
                return Ok(true);
            }
            SessionState::Idle => say(output, "nothing pending").await?,
        },
        ShellCommand::Cancel => match session.cancel() {
            Some(id) => say(output, &format!("{id}: cancelled")).await?,
            None => say(output, "nothing pending").await?,
        },
        ShellCommand::Materialize => {
            match materialize_results(session.last_results(), scene, template) {
                Ok(report) => {
                    for anchor in &report.created {
                        say(
                            output,
                            &format!(
                                "created {} {} ({}, {})",
                                anchor.id, anchor.name, anchor.latitude, anchor.longitude
                            ),
                        )
                        .await?;
                    }
                    say(output, &format!("{} anchors created", report.len())).await?;
                }
                Err(e) => say(output, &format!("error: {e}")).await?,
            }
        }
        ShellCommand::Results => match session.last_results() {
            Some(results) => {
                say(output, &format!("{} results", results.len())).await?;
                for place in results {
                    say(output, &format!("  {place}")).await?;
                }
            }
            None => say(output, "no results yet").await?,
        },
        ShellCommand::Status => {
            if let Some(outcome) = session.poll_completion() {
                say(output, &describe(&outcome)).await?;
            }
            let state = match session.state() {
                SessionState::Idle => "idle".to_string(),
                SessionState::Pending(id) => format!("pending {id}"),
            };
            let stats = session.stats();
            let cached = session.last_results().map_or(0, <[_]>::len);
            say(
                output,
                &format!(
                    "{state}; {cached} cached results; dispatched={} succeeded={} failed={} cancelled={}",
                    stats.dispatched, stats.succeeded, stats.failed, stats.cancelled
                ),
            )
            .await?;
        }
        ShellCommand::Save => match scene.save() {
            Ok(path) => say(output, &format!("saved {}", path.display())).await?,
            Err(e) => say(output, &format!("error: {e}")).await?,
        },
        ShellCommand::Help => say(output, HELP).await?,
        ShellCommand::Invalid(msg) => say(output, &format!("error: {msg}")).await?,
        ShellCommand::Quit => {}
    }
    Ok(false)
}

fn describe(outcome: &CompletionOutcome) -> String {
    match outcome {
        CompletionOutcome::Succeeded { id, count } => format!("{id}: {count} results"),
        CompletionOutcome::Failed { id, error } => format!("{id}: failed: {error}"),
        CompletionOutcome::Stale { id } => format!("{id}: superseded"),
    }
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
