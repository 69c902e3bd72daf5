use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use super::commands::PageOptions;
use super::page::{PageCommand, PAGE_HELP};
use crate::config::WidgetConfig;
use crate::entity::NoteId;
use crate::error::Result;
use crate::render::Board;
use crate::session::{PageMode, Session};
use crate::storage::{KeyValueStore, SqliteStore};

const ORIGIN_DIR: &str = ".tabnotes";

/// Origin directory from `--origin`, or `.tabnotes` in the current directory.
fn resolve_origin(options: &PageOptions) -> PathBuf {
    match &options.origin {
        Some(dir) => dir.clone(),
        None => env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(ORIGIN_DIR),
    }
}

/// `config.json` from the origin with command-line overrides applied.
fn load_config(origin: &Path, options: &PageOptions) -> Result<WidgetConfig> {
    let mut config = WidgetConfig::load(origin)?;
    if let Some(ms) = options.save_interval_ms {
        config.save_interval_ms = ms;
    }
    if let Some(ms) = options.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

/// Capability check: a store that cannot be opened leaves the page running
/// without persistence.
fn open_store(origin: &Path) -> Option<SqliteStore> {
    match SqliteStore::open(origin) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::error!(origin = %origin.display(), error = %e, "cannot open storage");
            None
        }
    }
}

#[derive(Serialize)]
struct ListedNote<'a> {
    id: NoteId,
    text: &'a str,
}

pub fn handle_list(options: &PageOptions, json: bool) -> Result<()> {
    let origin = resolve_origin(options);
    let config = load_config(&origin, options)?;
    let store = open_store(&origin);
    let session = Session::start(PageMode::Reader, store, Board::reader(), config);

    if json {
        let notes: Vec<ListedNote> = session
            .renderer()
            .fragments()
            .iter()
            .map(|f| ListedNote {
                id: f.id,
                text: &f.text,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else {
        print!("{}", session.renderer());
    }

    Ok(())
}

pub fn handle_write(options: &PageOptions) -> Result<()> {
    run(PageMode::Writer, options)
}

pub fn handle_read(options: &PageOptions) -> Result<()> {
    run(PageMode::Reader, options)
}

fn run(mode: PageMode, options: &PageOptions) -> Result<()> {
    let origin = resolve_origin(options);
    let config = load_config(&origin, options)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_page(mode, &origin, config))
}

/// Page event loop: stdin lines, the debounce deadline, cross-tab polling
/// and Ctrl-C, one at a time on the current thread.
async fn run_page(mode: PageMode, origin: &Path, config: WidgetConfig) -> Result<()> {
    let board = match mode {
        PageMode::Writer => Board::writer(),
        PageMode::Reader => Board::reader(),
    };
    let mut session = Session::start(mode, open_store(origin), board, config);

    let interactive = atty::is(atty::Stream::Stdin);
    show(&session, interactive)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(session.config().poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // One listener for the whole page so an interrupt during a handler is kept.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match PageCommand::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(PageCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = apply(&mut session, command, interactive) {
                            eprintln!("Error: {}", e);
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            _ = wait_until(deadline) => {
                if session.poll_timer(Instant::now()) {
                    show(&session, interactive)?;
                }
            }
            _ = poll.tick() => {
                if session.pump_storage_events() > 0 {
                    show(&session, interactive)?;
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    if session.mode() == PageMode::Writer && session.flush_now() > 0 {
        println!("Saved pending notes");
    }
    Ok(())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

fn apply<S: KeyValueStore>(
    session: &mut Session<S, Board>,
    command: PageCommand,
    interactive: bool,
) -> Result<()> {
    match command {
        PageCommand::Add(text) => {
            if let Some(id) = session.add_note(&text, Instant::now())? {
                println!("Added note {}", id);
            }
        }
        PageCommand::Edit(id, text) => session.edit_note(id, &text, Instant::now())?,
        PageCommand::Remove(id) => {
            session.remove_note(id)?;
            println!("Removed note {}", id);
        }
        PageCommand::Save => {
            let written = session.flush_now();
            println!("Saved {} note(s)", written);
        }
        PageCommand::Show => show(session, interactive)?,
        PageCommand::Help => println!("{}", PAGE_HELP),
        PageCommand::Quit => {}
    }
    Ok(())
}

fn show<S: KeyValueStore>(session: &Session<S, Board>, interactive: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "{}", session.renderer())?;
    if interactive {
        write!(out, "> ")?;
    }
    out.flush()?;
    Ok(())
}
