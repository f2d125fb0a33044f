use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::{
  trace,
  warn
};

use crate::router::Route;
use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq
)]
pub enum Visibility {
  #[default]
  All,
  Active,
  Completed
}

impl Visibility {
  pub const ALL: [Visibility; 3] = [
    Visibility::All,
    Visibility::Active,
    Visibility::Completed
  ];

  pub fn as_str(
    &self
  ) -> &'static str {
    match self {
      | Visibility::All => "all",
      | Visibility::Active => "active",
      | Visibility::Completed => {
        "completed"
      }
    }
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    match self {
      | Visibility::All => true,
      | Visibility::Active => {
        !task.completed
      }
      | Visibility::Completed => {
        task.completed
      }
    }
  }

  #[tracing::instrument(skip(tasks))]
  pub fn apply<'a>(
    &self,
    tasks: &'a [Task]
  ) -> Vec<&'a Task> {
    let out: Vec<&Task> = tasks
      .iter()
      .filter(|task| self.matches(task))
      .collect();
    trace!(
      total = tasks.len(),
      visible = out.len(),
      "applied visibility filter"
    );
    out
  }

  pub fn from_route(
    route: &Route
  ) -> Self {
    let Some(param) =
      route.filter_by.as_deref()
    else {
      return Self::All;
    };

    match param.parse::<Visibility>() {
      | Ok(mode) => mode,
      | Err(err) => {
        warn!(
          filter_by = %param,
          error = %err,
          "unrecognized route filter; showing all"
        );
        Self::All
      }
    }
  }
}

impl fmt::Display for Visibility {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Visibility {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|mode| mode.as_str() == s)
      .ok_or_else(|| {
        anyhow!(
          "unknown visibility: {s} \
           (expected all, active or \
           completed)"
        )
      })
  }
}

pub fn remaining(
  tasks: &[Task]
) -> usize {
  tasks
    .iter()
    .filter(|task| !task.completed)
    .count()
}

pub fn all_checked(
  tasks: &[Task]
) -> bool {
  tasks.iter().all(|task| task.completed)
}

pub fn pluralize(
  n: usize
) -> &'static str {
  if n == 1 { "item" } else { "items" }
}
