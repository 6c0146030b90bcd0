use std::io::BufReader;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

use crate::error::CliError;

/// A running peer process, reached via whatever command line the transport
/// template rendered to — `ssh host ubackuper dest`, a bare local exec, or
/// anything else the operator configures. The client only ever talks to its
/// stdin/stdout.
pub struct ChildTransport {
    child: Child,
    pub stdin: ChildStdin,
    pub stdout: BufReader<ChildStdout>,
}

impl ChildTransport {
    pub fn spawn(command_line: &str) -> Result<Self, CliError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = BufReader::new(child.stdout.take().expect("stdout was piped"));
        Ok(ChildTransport { child, stdin, stdout })
    }

    pub fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait()
    }
}

/// Renders `template`, substituting each `{name}` placeholder from `vars`.
///
/// Every placeholder found in `template` must appear in `vars` (else
/// [`CliError::Template`] for an unknown variable), and every name in `vars`
/// must actually be used by `template` (else for a missing required
/// substitution) — both are rejected before the transport is spawned.
pub fn render_command(template: &str, vars: &[(&str, &str)]) -> Result<String, CliError> {
    let mut rendered = String::with_capacity(template.len());
    let mut used = vec![false; vars.len()];
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close_rel) = rest[open..].find('}') else {
            return Err(CliError::Template(format!("unterminated placeholder in {template:?}")));
        };
        let close = open + close_rel;
        let name = &rest[open + 1..close];

        rendered.push_str(&rest[..open]);
        match vars.iter().position(|(k, _)| *k == name) {
            Some(idx) => {
                rendered.push_str(vars[idx].1);
                used[idx] = true;
            }
            None => return Err(CliError::Template(format!("unknown placeholder {{{name}}}"))),
        }
        rest = &rest[close + 1..];
    }
    rendered.push_str(rest);

    for (i, (name, _)) in vars.iter().enumerate() {
        if !used[i] {
            return Err(CliError::Template(format!("template does not use required {{{name}}}")));
        }
    }

    Ok(rendered)
}
