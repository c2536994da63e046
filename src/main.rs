use std::io::{self, BufRead, Write};

use tfm_core::cli::{Cli, EXIT_OK, EXIT_STARTUP_FAILURE, EXIT_USAGE};
use tfm_core::logging::{Level, LogManager, LogPaneForwarder, RemoteHandler, StreamHandler, DEFAULT_RING_BUFFER_CAPACITY};
use tfm_core::path::Path;
use tfm_core::pane::PaneState;
use tfm_core::state::{PaneSnapshot, Preferences, StateManager, StateSnapshot, WindowGeometry};
use tfm_core::ui::layers::file_manager::FileManagerLayer;
use tfm_core::ui::{CharEvent, Key, KeyEvent, Modifiers, UILayerStack};

fn main() {
    let cli = Cli::parse_args();

    if cli.color_test {
        run_color_test();
        std::process::exit(EXIT_OK);
    }

    let log_manager = LogManager::new(if cli.debug { Level::Debug } else { Level::Info });
    log_manager.add_handler(Box::new(StreamHandler::new(io::stderr())));
    let (log_pane_forwarder, shared_log_pane) = LogPaneForwarder::new(DEFAULT_RING_BUFFER_CAPACITY);
    log_manager.add_handler(Box::new(log_pane_forwarder));
    if let Some(port) = cli.remote_log_port {
        match RemoteHandler::bind(port) {
            Ok(handler) => {
                log_manager.log("startup", Level::Info, format!("remote log listening on 127.0.0.1:{}", handler.port()));
                log_manager.add_handler(Box::new(handler));
            }
            Err(e) => {
                log_manager.log("startup", Level::Error, format!("failed to bind remote log port {port}: {e}"));
            }
        }
    }

    let state_path = cli.state_file.clone().unwrap_or_else(StateManager::default_path);
    let state_manager = StateManager::new(state_path);
    let mut loaded_state = state_manager.load();
    loaded_state.purge_stale_local_history();

    // CLI flags win over persisted state; the default `local:.` means
    // "nothing explicit was asked for" so the saved directory applies.
    let left = resolve_pane_start(&cli.left, &loaded_state.left.directory);
    let right = resolve_pane_start(&cli.right, &loaded_state.right.directory);

    let mut layer = FileManagerLayer::new(left, right);
    layer.set_log_pane(shared_log_pane);
    layer.panes.left.manager.set_config(show_hidden_config(loaded_state.preferences.show_hidden));
    layer.panes.right.manager.set_config(show_hidden_config(loaded_state.preferences.show_hidden));

    if let Err(e) = layer.panes.left.reload() {
        log_manager.log("startup", Level::Warn, format!("left pane failed to load: {e}"));
    }
    if let Err(e) = layer.panes.right.reload() {
        log_manager.log("startup", Level::Warn, format!("right pane failed to load: {e}"));
    }
    restore_cursor(&mut layer.panes.left, &loaded_state.left);
    restore_cursor(&mut layer.panes.right, &loaded_state.right);

    let mut stack = UILayerStack::new();
    stack.push(Box::new(layer));

    if let Err(e) = run_event_loop(&mut stack, &log_manager) {
        log_manager.log("main", Level::Critical, format!("event loop aborted: {e}"));
        std::process::exit(EXIT_STARTUP_FAILURE);
    }

    let snapshot = snapshot_from_stack(&stack);
    if let Err(e) = state_manager.save_now(&snapshot) {
        log_manager.log("shutdown", Level::Warn, format!("failed to persist state: {e}"));
    }
}

fn snapshot_from_stack(stack: &UILayerStack) -> StateSnapshot {
    let Some(layer) = stack.top_as::<FileManagerLayer>() else {
        return StateSnapshot::default();
    };
    let mut snapshot = StateSnapshot {
        version: tfm_core::state::STATE_VERSION,
        window: WindowGeometry::default(),
        left: pane_snapshot(&layer.panes.left),
        right: pane_snapshot(&layer.panes.right),
        preferences: Preferences {
            show_hidden: layer.panes.left.manager.config().show_hidden,
            sort_by: layer.panes.left.manager.config().sort_key,
            ..Preferences::default()
        },
    };
    snapshot.purge_stale_local_history();
    snapshot
}

/// The CLI default (`local:.`) means "nothing explicit was asked for", so
/// a previously persisted directory wins; any other `--left`/`--right`
/// value always overrides what was saved.
fn resolve_pane_start(cli_value: &str, persisted_directory: &str) -> Path {
    if cli_value == "local:." {
        if let Ok(path) = Path::parse(persisted_directory) {
            return path;
        }
    }
    match Path::parse(cli_value) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("invalid path {cli_value:?}: {e}");
            std::process::exit(EXIT_USAGE);
        }
    }
}

fn show_hidden_config(show_hidden: bool) -> tfm_core::entry::ListConfig {
    tfm_core::entry::ListConfig { show_hidden, ..tfm_core::entry::ListConfig::default() }
}

/// Restores cursor and scroll only when the pane actually landed in the
/// directory the snapshot was taken in -- a removed or renamed directory
/// falls back to whatever `reload()` already set (row 0).
fn restore_cursor(pane: &mut PaneState, snapshot: &PaneSnapshot) {
    if pane.path.render() != snapshot.directory {
        return;
    }
    let entry_count = pane.manager.entries().len();
    if entry_count == 0 {
        return;
    }
    pane.cursor = snapshot.cursor.min(entry_count - 1);
    pane.scroll_offset = snapshot.scroll.min(entry_count - 1);
}

fn pane_snapshot(pane: &PaneState) -> PaneSnapshot {
    PaneSnapshot {
        directory: pane.path.render(),
        cursor: pane.cursor,
        scroll: pane.scroll_offset,
        sort_key: pane.manager.config().sort_key,
        sort_order: pane.manager.config().sort_order,
        history: pane.persisted_history().to_vec(),
    }
}

/// Reads one line of input per frame and maps it to a key/char event.
/// There is no raw-mode terminal dependency in this build, so navigation
/// is line-oriented: `j`/`k` move the cursor, `enter`/`up`/`b` act as
/// named keys, anything else is typed as characters, and `q` exits.
fn run_event_loop(stack: &mut UILayerStack, log_manager: &LogManager) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    render(stack, &mut stdout)?;
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed == "q" || trimmed == "quit" {
            break;
        }
        dispatch_line(stack, trimmed);
        log_manager.log("input", Level::Debug, format!("handled: {trimmed}"));
        render(stack, &mut stdout)?;
    }
    Ok(())
}

fn dispatch_line(stack: &mut UILayerStack, line: &str) {
    let no_mods = Modifiers { shift: false, ctrl: false, alt: false };
    match line {
        "j" | "down" => stack.dispatch_key(KeyEvent { key: Key::Down, modifiers: no_mods }),
        "k" | "up" => stack.dispatch_key(KeyEvent { key: Key::Up, modifiers: no_mods }),
        "enter" => stack.dispatch_key(KeyEvent { key: Key::Enter, modifiers: no_mods }),
        "b" | "back" => stack.dispatch_key(KeyEvent { key: Key::Backspace, modifiers: no_mods }),
        "tab" => stack.dispatch_key(KeyEvent { key: Key::Tab, modifiers: no_mods }),
        " " => stack.dispatch_key(KeyEvent { key: Key::Char(' '), modifiers: no_mods }),
        single if single.chars().count() == 1 => {
            stack.dispatch_char(CharEvent { ch: single.chars().next().unwrap() })
        }
        _ => tfm_core::ui::EventOutcome::Ignored,
    };
}

fn render(stack: &UILayerStack, out: &mut impl Write) -> io::Result<()> {
    let mut frame = String::new();
    for &index in &stack.dirty_render_range() {
        if let Some(layer) = stack.layer_at(index) {
            layer.render(&mut frame);
        }
    }
    write!(out, "{frame}")?;
    out.flush()
}

fn run_color_test() {
    println!("ANSI foreground colors:");
    for code in 30..=37 {
        print!("\x1b[{code}m{code}\x1b[0m ");
    }
    println!("\n\nANSI background colors:");
    for code in 40..=47 {
        print!("\x1b[{code}m{code}\x1b[0m ");
    }
    println!("\x1b[0m");
}
