//! Syntax validation of proposed patches
//!
//! A proposed fix is only trusted if it parses. The real check shells out
//! to the Python interpreter (`ast.parse` over stdin), same subprocess
//! idiom as the analyzers; when no interpreter is on PATH a conservative
//! delimiter-balance scan stands in, so validation always returns an
//! answer.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

const AST_CHECK: &str = "import ast, sys; ast.parse(sys.stdin.read())";

/// Outcome of one syntax validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxCheck {
    pub valid: bool,
    pub detail: String,
}

impl SyntaxCheck {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            valid: true,
            detail: detail.into(),
        }
    }

    fn invalid(detail: impl Into<String>) -> Self {
        Self {
            valid: false,
            detail: detail.into(),
        }
    }
}

/// Validate that `code` parses as Python source.
pub async fn validate_python(code: &str, timeout: Duration) -> SyntaxCheck {
    for interpreter in ["python3", "python"] {
        if which::which(interpreter).is_err() {
            continue;
        }
        match run_interpreter(interpreter, code, timeout).await {
            Some(check) => return check,
            // Interpreter misbehaved; try the next one
            None => continue,
        }
    }
    debug!("no python interpreter available, using delimiter scan");
    balance_check(code)
}

async fn run_interpreter(interpreter: &str, code: &str, timeout: Duration) -> Option<SyntaxCheck> {
    let mut child = Command::new(interpreter)
        .arg("-c")
        .arg(AST_CHECK)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| warn!("failed to spawn {interpreter}: {e}"))
        .ok()?;

    if let Some(mut stdin) = child.stdin.take() {
        if stdin.write_all(code.as_bytes()).await.is_err() {
            return None;
        }
        drop(stdin);
    }

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => Some(SyntaxCheck::ok("ast.parse succeeded")),
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("parse failed")
                .trim()
                .to_string();
            Some(SyntaxCheck::invalid(detail))
        }
        Ok(Err(e)) => {
            warn!("{interpreter} I/O failure during validation: {e}");
            None
        }
        Err(_) => {
            warn!("syntax validation timed out");
            Some(SyntaxCheck::invalid("validation timed out"))
        }
    }
}

/// Offline fallback: strings and comments stripped, brackets must balance
/// and the code must not end inside an open delimiter.
fn balance_check(code: &str) -> SyntaxCheck {
    let mut stack: Vec<char> = Vec::new();
    let mut chars = code.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            if c == '\\' {
                chars.next();
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '#' => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '\'' | '"' => in_string = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return SyntaxCheck::invalid(format!("unbalanced '{c}'"));
                }
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return SyntaxCheck::invalid(format!("unclosed '{open}'"));
    }
    if in_string.is_some() {
        return SyntaxCheck::invalid("unterminated string literal");
    }
    SyntaxCheck::ok("delimiter scan passed")
}
