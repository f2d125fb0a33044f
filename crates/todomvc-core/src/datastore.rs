use std::cell::RefCell;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::Task;

pub trait Storage {
    fn load(&self) -> anyhow::Result<Vec<Task>>;

    fn save(&self, tasks: &[Task]) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub todos_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let todos_path = data_dir.join("todos.data");
        if !todos_path.exists() {
            fs::write(&todos_path, "")
                .with_context(|| format!("failed to create {}", todos_path.display()))?;
        }

        info!(
            data_dir = %data_dir.display(),
            todos = %todos_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            todos_path,
        })
    }
}

impl Storage for DataStore {
    #[tracing::instrument(skip(self))]
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.todos_path).context("failed to load todos.data")
    }

    #[tracing::instrument(skip(self, tasks))]
    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.todos_path, tasks).context("failed to save todos.data")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tasks: Rc<RefCell<Vec<Task>>>,
}

impl MemoryStorage {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Rc::new(RefCell::new(tasks)),
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.borrow().clone()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        Ok(self.snapshot())
    }

    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        *self.tasks.borrow_mut() = tasks.to_vec();
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Task>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(task);
    }

    debug!(count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
