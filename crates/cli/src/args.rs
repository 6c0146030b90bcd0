use clap::Parser;

/// `ub-backup` — the client.
#[derive(Debug, Parser)]
#[command(name = "ub-backup", version)]
pub struct ClientArgs {
    /// Root directory SRC_DIR paths are reported relative to; defaults to `/`.
    #[arg(long)]
    pub root: Option<String>,

    /// Transport command template. Defaults to `ssh {hostname} {ubts_path}
    /// {dest_dir}`, or `{ubts_path} {dest_dir}` under `--local`.
    #[arg(long = "command")]
    pub command: Option<String>,

    /// Remote host to pass into the `{hostname}` template placeholder.
    #[arg(long)]
    pub hostname: Option<String>,

    /// Path to the server binary on the remote (or local) host.
    #[arg(long = "ubts-path", default_value = "ubackuper")]
    pub ubts_path: String,

    /// Run the server directly instead of over `ssh`.
    #[arg(long)]
    pub local: bool,

    /// Print a human-readable statistics summary to standard output.
    #[arg(long = "print-statistics")]
    pub print_statistics: bool,

    /// Suppress the warning normally logged when a Unix-domain socket is
    /// skipped.
    #[arg(long = "disable-skipped-socket-warning")]
    pub disable_skipped_socket_warning: bool,

    /// One or more source directories, followed by the destination directory.
    #[arg(required = true, num_args = 2..)]
    pub paths: Vec<String>,
}

/// `ubackuper` — the server.
#[derive(Debug, Parser)]
#[command(name = "ubackuper", version)]
pub struct ServerArgs {
    /// Directory holding this host's snapshots as its immediate children.
    pub backup_dir: String,
}
