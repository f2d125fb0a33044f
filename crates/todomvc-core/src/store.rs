use anyhow::{Context, anyhow, bail};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::datastore::Storage;
use crate::task::{Task, TaskDraft};

pub struct Store {
    items: Vec<Task>,
    active_item: Option<Uuid>,
    error: String,
    storage: Box<dyn Storage>,
}

impl Store {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            items: Vec::new(),
            active_item: None,
            error: String::new(),
            storage: Box::new(storage),
        }
    }

    pub fn items(&self) -> &[Task] {
        &self.items
    }

    pub fn active_item(&self) -> Option<Uuid> {
        self.active_item
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn find(&self, uuid: Uuid) -> Option<&Task> {
        self.items.iter().find(|task| task.uuid == uuid)
    }

    #[tracing::instrument(skip(self))]
    pub fn list(&mut self) {
        match self.storage.load() {
            Ok(items) => {
                info!(count = items.len(), "loaded todos");
                self.items = items;
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "could not load todos; starting empty");
                self.items.clear();
            }
        }
    }

    #[tracing::instrument(skip(self, task), fields(uuid = %task.uuid))]
    pub fn insert(&mut self, task: Task) -> anyhow::Result<()> {
        let mut next = self.items.clone();
        next.push(task);
        self.commit(next)
    }

    #[tracing::instrument(skip(self, changes))]
    pub fn update(&mut self, item: Uuid, changes: &TaskDraft) -> anyhow::Result<()> {
        let title = changes.title.trim();
        if title.is_empty() {
            bail!("title cannot be empty");
        }

        let mut next = self.items.clone();
        let task = next
            .iter_mut()
            .find(|task| task.uuid == item)
            .ok_or_else(|| anyhow!("todo not found: {item}"))?;
        task.apply(&TaskDraft {
            title: title.to_string(),
            completed: changes.completed,
        });
        self.commit(next)
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, item: Uuid) -> anyhow::Result<()> {
        let mut next = self.items.clone();
        let idx = next
            .iter()
            .position(|task| task.uuid == item)
            .ok_or_else(|| anyhow!("todo not found: {item}"))?;
        next.remove(idx);
        self.commit(next)
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_completed(&mut self) -> anyhow::Result<()> {
        let next: Vec<Task> = self
            .items
            .iter()
            .filter(|task| !task.completed)
            .cloned()
            .collect();
        debug!(
            before = self.items.len(),
            after = next.len(),
            "removing completed todos"
        );
        self.commit(next)
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_all(&mut self, value: bool) -> anyhow::Result<()> {
        let mut next = self.items.clone();
        for task in &mut next {
            task.completed = value;
        }
        self.commit(next)
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_completed(&mut self, item: Uuid) -> anyhow::Result<()> {
        let mut next = self.items.clone();
        let task = next
            .iter_mut()
            .find(|task| task.uuid == item)
            .ok_or_else(|| anyhow!("todo not found: {item}"))?;
        task.completed = !task.completed;
        self.commit(next)
    }

    pub fn set_active_item(&mut self, item: Option<Uuid>) {
        debug!(?item, "active item");
        self.active_item = item;
    }

    pub fn update_errors(&mut self, message: impl Into<String>) {
        self.error = message.into();
        if !self.error.is_empty() {
            warn!(message = %self.error, "store error");
        }
    }

    // Persist first; memory only changes once the save succeeded.
    fn commit(&mut self, next: Vec<Task>) -> anyhow::Result<()> {
        self.storage
            .save(&next)
            .context("failed to persist todos")?;
        debug!(count = next.len(), "persisted todos");
        self.items = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::Store;
    use crate::datastore::{MemoryStorage, Storage};
    use crate::task::{Task, TaskDraft};

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn load(&self) -> anyhow::Result<Vec<Task>> {
            Err(anyhow!("corrupt"))
        }

        fn save(&self, _tasks: &[Task]) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    fn seeded(titles: &[(&str, bool)]) -> (Store, MemoryStorage) {
        let tasks = titles
            .iter()
            .map(|(title, completed)| {
                let mut task = Task::new(*title);
                task.completed = *completed;
                task
            })
            .collect();
        let storage = MemoryStorage::with_tasks(tasks);
        let mut store = Store::new(storage.clone());
        store.list();
        (store, storage)
    }

    #[test]
    fn list_loads_persisted_tasks() {
        let (store, _) = seeded(&[("Wash car", false), ("Pay bills", true)]);
        assert_eq!(store.items().len(), 2);
        assert_eq!(store.items()[1].title, "Pay bills");
    }

    #[test]
    fn list_falls_back_to_empty() {
        let mut store = Store::new(BrokenStorage);
        store.list();
        assert!(store.items().is_empty());
    }

    #[test]
    fn insert_appends_and_persists() {
        let (mut store, storage) = seeded(&[("Wash car", false)]);
        store.insert(Task::new("Buy milk")).expect("insert");

        assert_eq!(store.items().len(), 2);
        assert_eq!(store.items()[1].title, "Buy milk");
        assert_eq!(storage.snapshot(), store.items());
    }

    #[test]
    fn update_merges_trimmed_title() {
        let (mut store, storage) = seeded(&[("Buy milk", false)]);
        let uuid = store.items()[0].uuid;
        store
            .update(
                uuid,
                &TaskDraft {
                    title: "  Buy bread ".to_string(),
                    completed: true,
                },
            )
            .expect("update");

        let task = store.find(uuid).expect("task present");
        assert_eq!(task.title, "Buy bread");
        assert!(task.completed);
        assert_eq!(storage.snapshot()[0].title, "Buy bread");
    }

    #[test]
    fn update_rejects_blank_title_and_unknown_target() {
        let (mut store, _) = seeded(&[("Buy milk", false)]);
        let uuid = store.items()[0].uuid;

        assert!(store.update(uuid, &TaskDraft::default()).is_err());
        let missing = Task::new("ghost");
        assert!(store.update(missing.uuid, &missing.draft()).is_err());
        assert_eq!(store.items()[0].title, "Buy milk");
    }

    #[test]
    fn remove_and_remove_completed() {
        let (mut store, storage) =
            seeded(&[("a", false), ("b", true), ("c", true), ("d", false)]);
        let first = store.items()[0].uuid;

        store.remove(first).expect("remove");
        assert_eq!(store.items().len(), 3);

        store.remove_completed().expect("remove completed");
        let titles: Vec<&str> = store.items().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["d"]);
        assert_eq!(storage.snapshot().len(), 1);
    }

    #[test]
    fn toggles() {
        let (mut store, _) = seeded(&[("Wash car", false), ("Pay bills", true)]);
        let wash = store.items()[0].uuid;

        store.toggle_completed(wash).expect("toggle");
        assert!(store.items()[0].completed);

        store.toggle_all(false).expect("toggle all");
        assert!(store.items().iter().all(|t| !t.completed));
    }

    #[test]
    fn failed_persist_leaves_state_untouched() {
        let mut store = Store::new(BrokenStorage);
        let err = store.insert(Task::new("Buy milk")).expect_err("save fails");

        assert!(format!("{err:#}").contains("disk full"));
        assert!(store.items().is_empty());
    }

    #[test]
    fn mutations_set_pointer_and_message() {
        let (mut store, _) = seeded(&[("a", false)]);
        let uuid = store.items()[0].uuid;

        store.set_active_item(Some(uuid));
        store.update_errors("boom");
        assert_eq!(store.active_item(), Some(uuid));
        assert_eq!(store.error(), "boom");

        store.set_active_item(None);
        store.update_errors("");
        assert_eq!(store.active_item(), None);
        assert!(store.error().is_empty());
    }
}
