//! Interactive command shell.
//!
//! Reads one command line per prompt and dispatches it with the session's
//! global options. With `--process-isolation` every line runs in a fresh
//! subprocess of this binary, so a crashing command never takes the shell
//! down with it.

use crate::commands::{CommandError, GlobalOptions, EXIT_FAILURE, EXIT_SUCCESS};
use crate::{dispatch, Cli};
use clap::{CommandFactory, Parser};
use console::Style;
use std::io::{BufRead, Write};

pub fn run(options: &GlobalOptions, process_isolation: bool) -> Result<u8, CommandError> {
    let prompt = Style::new().cyan().apply_to("atriumctl> ").to_string();
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{prompt}");
        std::io::stdout().flush().map_err(|e| e.to_string())?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|e| e.to_string())?;

        let tokens = match split_line(&line) {
            Ok(tokens) => tokens,
            Err(msg) => {
                eprintln!("error: {msg}");
                continue;
            }
        };
        if tokens.is_empty() {
            continue;
        }
        match tokens[0].as_str() {
            "exit" | "quit" => break,
            "help" => {
                let _ = Cli::command().print_help();
                continue;
            }
            _ => {}
        }

        let outcome = if process_isolation {
            run_isolated(options, &tokens)
        } else {
            run_inline(options, &tokens)
        };
        match outcome {
            Ok(code) if code != EXIT_SUCCESS => eprintln!("command exited with code {code}"),
            Ok(_) => {}
            Err(msg) => eprintln!("error: {msg}"),
        }
    }
    Ok(EXIT_SUCCESS)
}

/// Parses the line as an atriumctl invocation and runs it in-process,
/// inheriting the session's global options unless the line overrides them.
fn run_inline(options: &GlobalOptions, tokens: &[String]) -> Result<u8, CommandError> {
    let argv = std::iter::once("atriumctl".to_owned()).chain(tokens.iter().cloned());
    let parsed = match Cli::try_parse_from(argv) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}");
            return Ok(EXIT_FAILURE);
        }
    };
    if parsed.shell {
        return Err(CommandError::failure("already inside a shell"));
    }
    let merged = GlobalOptions {
        path: parsed.path.or_else(|| options.path.clone()),
        debug: parsed.debug || options.debug,
        user: if parsed.user.is_empty() {
            options.user.clone()
        } else {
            parsed.user
        },
    };
    match parsed.command {
        Some(command) => dispatch(&command, &merged),
        None => {
            let _ = Cli::command().print_help();
            Ok(EXIT_FAILURE)
        }
    }
}

/// Re-executes this binary with the session's global options plus the
/// line's tokens and waits for it. A session flag is only forwarded when
/// the line does not set it itself, so line flags override the session.
fn run_isolated(options: &GlobalOptions, tokens: &[String]) -> Result<u8, CommandError> {
    let exe = std::env::current_exe().map_err(|e| format!("cannot locate own binary: {e}"))?;
    let mut cmd = std::process::Command::new(exe);
    if let Some(path) = &options.path {
        if !has_flag(tokens, "--path", "-p") {
            cmd.arg("--path").arg(path);
        }
    }
    if !options.user.is_empty() && !has_flag(tokens, "--user", "-u") {
        cmd.arg("--user").arg(&options.user);
    }
    if options.debug && !has_flag(tokens, "--debug", "-d") {
        cmd.arg("--debug");
    }
    cmd.args(tokens);
    let status = cmd
        .status()
        .map_err(|e| format!("failed to spawn subprocess: {e}"))?;
    match status.code() {
        Some(code) => Ok(u8::try_from(code).unwrap_or(EXIT_FAILURE)),
        None => Err(CommandError::failure("subprocess terminated by signal")),
    }
}

fn has_flag(tokens: &[String], long: &str, short: &str) -> bool {
    tokens
        .iter()
        .any(|t| t == long || t == short || t.starts_with(&format!("{long}=")))
}

/// Whitespace tokenizer with single and double quoting.
fn split_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }
    if quote.is_some() {
        return Err(format!("unterminated quote in '{line}'"));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
