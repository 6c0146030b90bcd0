use std::io::{BufRead, Write};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use protocol::{Record, Reply};
use walk::{backup_tree, normalize, Peer, SessionStats, WalkOptions};

use crate::args::ClientArgs;
use crate::error::CliError;
use crate::transport::{render_command, ChildTransport};

struct StreamPeer<'a> {
    reader: &'a mut dyn BufRead,
    writer: &'a mut dyn Write,
}

impl Peer for StreamPeer<'_> {
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), walk::WalkError> {
        self.writer.write_all(bytes).map_err(walk::WalkError::from)
    }

    fn recv_reply(&mut self) -> Result<Reply, walk::WalkError> {
        let mut line = Vec::new();
        let n = self.reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Err(walk::WalkError::Transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "server closed the connection without replying",
            )));
        }
        let (reply, _) = Reply::decode(&line)?;
        Ok(reply)
    }
}

pub fn run_client(args: ClientArgs) -> Result<i32, CliError> {
    logging::init_client();

    if args.paths.len() < 2 {
        return Err(CliError::Args("expected at least one SRC_DIR and a DEST_DIR".to_string()));
    }
    let dest_dir = args.paths.last().expect("length checked above").clone();
    let src_dirs = &args.paths[..args.paths.len() - 1];

    let cwd = std::env::current_dir()?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|p| CliError::Args(format!("cwd {p:?} is not UTF-8")))?;

    let root = args.root.clone().unwrap_or_else(|| "/".to_string());
    let root = normalize(Utf8Path::new(&root), &cwd)?;

    let hostname = args.hostname.clone().unwrap_or_default();
    let default_template =
        if args.local { "{ubts_path} {dest_dir}".to_string() } else { "ssh {hostname} {ubts_path} {dest_dir}".to_string() };
    let template = args.command.clone().unwrap_or(default_template);

    let vars: Vec<(&str, &str)> = if args.local {
        vec![("ubts_path", args.ubts_path.as_str()), ("dest_dir", dest_dir.as_str())]
    } else {
        vec![("hostname", hostname.as_str()), ("ubts_path", args.ubts_path.as_str()), ("dest_dir", dest_dir.as_str())]
    };
    let command_line = render_command(&template, &vars)?;

    let mut transport = ChildTransport::spawn(&command_line)?;
    let mut stats = SessionStats::new();
    let mut had_failure = false;

    {
        let mut peer = StreamPeer { reader: &mut transport.stdout, writer: &mut transport.stdin };

        let options = WalkOptions { root: root.clone(), disable_skipped_socket_warning: args.disable_skipped_socket_warning };

        for src in src_dirs {
            let abs = normalize(Utf8Path::new(src), &cwd)?;
            backup_tree(&abs, &options, &mut peer, &mut stats)?;
        }

        if args.print_statistics {
            print_statistics(&mut peer, &stats)?;
        }

        let reply = peer.request(&Record::RemoveOld)?;
        if !matches!(reply, Reply::Ok(_)) {
            tracing::warn!("REMOVE_OLD was not acknowledged with OK");
            had_failure = true;
        }

        peer.send_raw(&Record::ThankYou.encode())?;
    }

    let status = transport.wait()?;
    if !status.success() {
        had_failure = true;
    }

    tracing::info!(
        files_seen = stats.files_seen,
        files_changed = stats.files_changed,
        skipped = stats.skipped,
        bytes_sent = stats.bytes_sent,
        "backup session complete"
    );

    Ok(if had_failure { 1 } else { 0 })
}

fn print_statistics(peer: &mut StreamPeer<'_>, stats: &SessionStats) -> Result<(), CliError> {
    let name = expect_payload(peer.request(&Record::Name)?);
    let total = expect_payload(peer.request(&Record::DiskTotal)?);
    let usage = expect_payload(peer.request(&Record::DiskUsage)?);
    let elapsed = Instant::now().saturating_duration_since(stats.started_at);

    println!("snapshot:          {}", name.unwrap_or_else(|| "?".to_string()));
    println!("directories:       {}", stats.directories);
    println!("symlinks:          {}", stats.symlinks);
    println!("files seen:        {}", stats.files_seen);
    println!("files changed:     {}", stats.files_changed);
    println!("entries skipped:   {}", stats.skipped);
    println!("bytes sent:        {}", stats.bytes_sent);
    println!("disk total:        {}", total.unwrap_or_else(|| "?".to_string()));
    println!("disk used:         {}", usage.unwrap_or_else(|| "?".to_string()));
    println!("elapsed:           {:.1}s", elapsed.as_secs_f64());
    Ok(())
}

fn expect_payload(reply: Reply) -> Option<String> {
    match reply {
        Reply::Ok(payload) => payload,
        _ => None,
    }
}
