//! Command-line surface. The binary's `--left`/`--right` pick the two
//! starting directories; everything else configures the ambient
//! subsystems (log level, remote log broadcaster, state persistence).

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "tfm", about = "A dual-pane, cross-storage terminal file manager")]
pub struct Cli {
    /// Starting path for the left pane. Accepts `local:`, `s3://bucket/key`,
    /// or `user@host:/path` forms; bare paths are treated as local.
    #[arg(long, default_value = "local:.")]
    pub left: String,

    /// Starting path for the right pane.
    #[arg(long, default_value = "local:.")]
    pub right: String,

    /// Raise every logger to Debug and attach a stderr stream handler.
    #[arg(long)]
    pub debug: bool,

    /// Bind the remote log broadcaster on 127.0.0.1:<port> instead of
    /// leaving it off.
    #[arg(long)]
    pub remote_log_port: Option<u16>,

    /// Print each ANSI color pair this build knows how to render, then
    /// exit -- a terminal capability smoke test, not a file-manager session.
    #[arg(long)]
    pub color_test: bool,

    /// Path to the persisted session-state file. Defaults to `~/.tfm/state.json`.
    #[arg(long)]
    pub state_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 64;
pub const EXIT_STARTUP_FAILURE: i32 = 70;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_both_panes_at_the_current_directory() {
        let cli = Cli::parse_from(["tfm"]);
        assert_eq!(cli.left, "local:.");
        assert_eq!(cli.right, "local:.");
        assert!(!cli.debug);
        assert!(cli.remote_log_port.is_none());
    }

    #[test]
    fn flags_parse_into_their_fields() {
        let cli = Cli::parse_from([
            "tfm",
            "--left",
            "s3://bucket/photos",
            "--right",
            "me@host:/srv",
            "--debug",
            "--remote-log-port",
            "9000",
        ]);
        assert_eq!(cli.left, "s3://bucket/photos");
        assert_eq!(cli.right, "me@host:/srv");
        assert!(cli.debug);
        assert_eq!(cli.remote_log_port, Some(9000));
    }
}
