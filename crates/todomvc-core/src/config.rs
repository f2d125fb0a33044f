use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

const DEFAULTS: [(&str, &str); 4] = [
  ("data.location", "~/.todo"),
  ("default.command", "list"),
  ("default.route", "#/"),
  ("color", "on")
];

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str)
}

impl Config {
  pub fn defaults() -> Self {
    Config {
      map:          DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: vec![]
    }
  }

  #[tracing::instrument(skip(
    todorc_override
  ))]
  pub fn load(
    todorc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    match locate_todorc(todorc_override)?
    {
      | Some(path) => {
        info!(todorc = %path.display(), "loading todorc");
        cfg.load_file(&path)?;
      }
      | None => {
        warn!(
          "no todorc found; using \
           defaults"
        )
      }
    }

    Ok(cfg)
  }

  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      self.map.insert(key, value);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn default_command(
    &self
  ) -> String {
    self
      .get("default.command")
      .unwrap_or_else(|| {
        "list".to_string()
      })
  }

  pub fn default_route(
    &self
  ) -> String {
    self
      .get("default.route")
      .unwrap_or_default()
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    let raw = self
      .get("color")
      .unwrap_or_else(|| "on".to_string());
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        Ok(true)
      }
      | "off" | "no" | "false" | "0" => {
        Ok(false)
      }
      | other => {
        bail!(
          "invalid color setting: \
           {other}"
        )
      }
    }
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let line = classify_line(raw_line)
        .with_context(|| {
          format!(
            "invalid config line \
             {}:{}",
            path.display(),
            idx + 1
          )
        })?;

      match line {
        | RcLine::Blank => {}
        | RcLine::Include(target) => {
          let include =
            resolve_include_path(
              &base_dir, target
            )?;
          if include.exists() {
            self.load_file(&include)?;
          } else {
            warn!(include = %include.display(), "include file does not exist; skipping");
          }
        }
        | RcLine::Setting(key, value) => {
          trace!(key, value, "loaded config key");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
      }
    }

    Ok(())
  }
}

// A `#` opens a comment at the start of a line or after whitespace when it
// is not glued to the text that follows, so `#/active` survives as a value.
fn strip_comment(
  line: &str
) -> &str {
  let bytes = line.as_bytes();
  for (idx, ch) in line.char_indices() {
    if ch != '#' {
      continue;
    }
    let after_space = idx == 0
      || bytes[idx - 1]
        .is_ascii_whitespace();
    let before_space = bytes
      .get(idx + 1)
      .is_none_or(|b| {
        b.is_ascii_whitespace()
      });
    if after_space && before_space {
      return &line[..idx];
    }
  }
  line
}

fn classify_line(
  raw: &str
) -> anyhow::Result<RcLine<'_>> {
  let line = strip_comment(raw).trim();
  if line.is_empty() {
    return Ok(RcLine::Blank);
  }

  if let Some(target) =
    line.strip_prefix("include ")
  {
    return Ok(RcLine::Include(
      target.trim()
    ));
  }

  let (key, value) = line
    .split_once('=')
    .ok_or_else(|| {
      anyhow!(
        "expected setting = value, \
         got: {line}"
      )
    })?;
  let key = key.trim();
  if key.is_empty() {
    bail!("setting name is empty");
  }
  Ok(RcLine::Setting(key, value.trim()))
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = match (
    override_dir,
    cfg.get("data.location")
  ) {
    | (Some(path), _) => {
      path.to_path_buf()
    }
    | (None, Some(location)) => {
      expand_tilde(Path::new(&location))
    }
    | (None, None) => {
      home_dir()?.join(".todo")
    }
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

// --todorc, then $TODORC (/dev/null disables), then ~/.todorc.
fn locate_todorc(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(env_path) =
    std::env::var("TODORC")
  {
    return Ok(
      (env_path != "/dev/null")
        .then(|| PathBuf::from(env_path))
    );
  }

  let candidate =
    home_dir()?.join(".todorc");
  Ok(candidate
    .exists()
    .then_some(candidate))
}

fn home_dir() -> anyhow::Result<PathBuf>
{
  dirs::home_dir().ok_or_else(|| {
    anyhow!(
      "cannot determine home directory"
    )
  })
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.is_empty() {
    bail!(
      "include path cannot be empty"
    );
  }

  let expanded =
    expand_tilde(Path::new(include));
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
