use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcOverride {
    pub key: String,
    pub value: String,
}

impl RcOverride {
    // `rc.default.route=/active` or `rc.default.route:/active`
    pub fn from_positional(token: &str) -> Option<Self> {
        let rest = token.strip_prefix("rc.")?;
        let (key, value) = rest.split_once('=').or_else(|| rest.split_once(':'))?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl std::str::FromStr for RcOverride {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected setting=value, got: {s}"))?;
        let key = key.trim();
        Ok(Self {
            key: key.strip_prefix("rc.").unwrap_or(key).to_string(),
            value: value.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SplitArgs {
    pub argv: Vec<OsString>,
    pub overrides: Vec<RcOverride>,
}

const VALUE_FLAGS: [&str; 4] = ["--rc", "--todorc", "--data", "--route"];

#[derive(Parser, Debug, Clone)]
#[command(
    name = "todo",
    version,
    about = "A TodoMVC-style todo list for the terminal",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<RcOverride>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<RcOverride>,

    #[arg(long = "todorc")]
    pub todorc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[arg(long = "route")]
    pub route: Option<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

fn default_directive(verbose: u8, quiet: u8) -> String {
    let level = match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        _ => "trace",
    };
    format!("warn,todomvc_core={level}")
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let directive = default_directive(verbose, quiet);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    // stdout carries the todo list itself
    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

// Only arguments before the command can be overrides; the rest is todo text.
#[tracing::instrument(skip_all)]
pub fn split_rc_overrides(raw: &[OsString]) -> SplitArgs {
    let mut argv = Vec::with_capacity(raw.len());
    let mut overrides = Vec::new();

    let mut iter = raw.iter().cloned();
    argv.extend(iter.next());

    while let Some(arg) = iter.next() {
        let text = arg.to_string_lossy().into_owned();

        if VALUE_FLAGS.contains(&text.as_str()) {
            argv.push(arg);
            argv.extend(iter.next());
            continue;
        }

        if text.starts_with('-') && text != "--" {
            argv.push(arg);
            continue;
        }

        if let Some(rc) = RcOverride::from_positional(&text) {
            debug!(key = %rc.key, value = %rc.value, "captured positional rc override");
            overrides.push(rc);
            continue;
        }

        debug!(command = %text, "command reached; remaining arguments are literal");
        argv.push(arg);
        argv.extend(iter.by_ref());
        break;
    }

    SplitArgs { argv, overrides }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let mut tokens = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string());

        let Some(first) = tokens.next() else {
            let cmd = cfg.default_command();
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                command: cmd,
                command_args: vec![],
            });
        };

        let known = crate::commands::known_command_names();
        let command = crate::commands::expand_command_abbrev(&first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?;
        if command != first {
            debug!(token = %first, expanded = %command, "resolved command abbreviation");
        }

        Ok(Self {
            command: command.to_string(),
            command_args: tokens.collect(),
        })
    }
}
