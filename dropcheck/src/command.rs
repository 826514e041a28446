use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use log::Level::Debug;
use log::{debug, log_enabled};

pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CmdOutput {
    /// Converts to a `Result` object that is `Ok` only if the [ExitStatus] is
    /// success.
    pub fn err_on_status(self) -> crate::Result<Self> {
        if self.status.success() {
            return Ok(self);
        }

        let code = self.status.code().unwrap_or(-1);

        Err(crate::Error::CommandError(
            code,
            self.stderr_utf8_lossy().to_string(),
        ))
    }
}

impl From<Output> for CmdOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

impl CmdOutput {
    #[inline]
    pub fn ok(&self) -> bool {
        self.status.success()
    }

    #[inline]
    pub fn stdout_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[inline]
    pub fn stderr_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Splits a string for use as a shell command
pub fn split<'a>(s: &'a str) -> Option<Vec<String>> {
    let mut escaped = false;
    let mut single_quote = false;
    let mut double_quote = false;

    let mut into = String::new();

    let mut sp = Vec::new();

    macro_rules! finish {
        () => {
            sp.push(into.clone());
            into.clear();
        };
    }

    for c in s.chars() {
        if escaped {
            escaped = false;
            into.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
            }

            '\'' if single_quote => {
                single_quote = false;
                finish!();
            }

            '\'' if !double_quote => {
                single_quote = true;
            }

            '"' if double_quote => {
                double_quote = false;
                finish!();
            }

            '"' if !single_quote => {
                double_quote = true;
            }

            _ => {
                if single_quote || double_quote || !c.is_whitespace() {
                    into.push(c);
                } else if into.len() > 0 {
                    finish!();
                }
            }
        }
    }

    if escaped | single_quote | double_quote {
        return None;
    }

    if into.len() > 0 {
        sp.push(into);
    }

    Some(sp)
}

/// Quotes a string with single quotes
pub fn quote(s: &str) -> String {
    let mut new = String::with_capacity(s.len() + 2);
    new.push('\'');
    for c in s.chars() {
        if c == '\'' {
            new.push_str("'\"'\"'");
        } else {
            new.push(c);
        }
    }
    new.push('\'');
    new
}

pub fn run_cmd<C, S>(cmd: C, args: &[S]) -> io::Result<CmdOutput>
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    if log_enabled!(Debug) {
        log_cmd(&cmd, args);
    }
    Command::new(cmd)
        .args(args)
        .output()
        .map(|output| output.into())
}

/// Run a command, killing it if it doesn't finish within [timeout].
///
/// The child's stdout and stderr are drained on helper threads so a chatty
/// child can't wedge itself on a full pipe. A kill due to the deadline is
/// reported as an [io::ErrorKind::TimedOut] error.
pub fn run_cmd_timeout<C, S>(cmd: C, args: &[S], timeout: Duration) -> io::Result<CmdOutput>
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    if log_enabled!(Debug) {
        log_cmd(&cmd, args);
    }

    let mut child = Command::new(cmd)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .spawn()?;

    let mut out_pipe = child.stdout.take().unwrap();
    let mut err_pipe = child.stderr.take().unwrap();

    let out_handle = thread::spawn(move || -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        out_pipe.read_to_end(&mut buf)?;
        Ok(buf)
    });
    let err_handle = thread::spawn(move || -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        err_pipe.read_to_end(&mut buf)?;
        Ok(buf)
    });

    let deadline = channel::after(timeout);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }

        if deadline.try_recv().is_ok() {
            kill_and_reap(&mut child);
            // Readers hit EOF once the child is gone
            let _ = out_handle.join();
            let _ = err_handle.join();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("command didn't finish within {:?}", timeout),
            ));
        }

        thread::sleep(Duration::from_millis(20));
    };

    let stdout = out_handle
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "stdout reader panicked"))??;
    let stderr = err_handle
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "stderr reader panicked"))??;

    Ok(CmdOutput {
        status,
        stdout,
        stderr,
    })
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::error!("failed to kill child: {}", e);
    }
    if let Err(e) = child.wait() {
        log::error!("failed to reap killed child: {}", e);
    }
}

pub fn log_cmd<C, S>(cmd: &C, args: &[S])
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    let nargs = args.len();
    if nargs > 0 {
        let mut args_string = String::new();
        for (i, e) in args.iter().enumerate() {
            args_string.push_str(&e.as_ref().to_string_lossy());
            if i < nargs - 1 {
                args_string.push(' ');
            }
        }
        debug!(
            "Running command: `{} {}`",
            cmd.as_ref().to_string_lossy(),
            args_string
        );
    } else {
        debug!("Running command: `{}`", cmd.as_ref().to_string_lossy());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(&quote("simple"), "'simple'");
        assert_eq!(&quote("with'tick"), "'with'\"'\"'tick'");
    }

    #[test]
    fn test_split() {
        assert_eq!(
            split("simple whitespace split").unwrap().as_slice(),
            &["simple", "whitespace", "split"]
        );
        assert_eq!(
            split("'quoted split\\' with escapes' and \"double quotes\" \\\\")
                .unwrap()
                .as_slice(),
            &["quoted split\' with escapes", "and", "double quotes", "\\"]
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_run_cmd_timeout_finishes() {
        let out = run_cmd_timeout("echo", &["hello"], Duration::from_secs(5))
            .expect("echo should succeed");
        assert!(out.ok());
        assert_eq!(out.stdout_utf8_lossy().trim(), "hello");
    }

    #[test]
    #[cfg(unix)]
    fn test_run_cmd_timeout_kills() {
        let res = run_cmd_timeout("sleep", &["5"], Duration::from_millis(100));
        match res {
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            Ok(_) => panic!("sleep should have been killed"),
        }
    }
}
