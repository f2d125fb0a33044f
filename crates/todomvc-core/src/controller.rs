use tracing::{debug, info};
use uuid::Uuid;

use crate::filter::{self, Visibility};
use crate::router::Route;
use crate::store::Store;
use crate::task::{Task, TaskDraft};

type FocusHook = Box<dyn FnMut(Uuid)>;

pub struct Controller<'s> {
    store: &'s mut Store,
    visibility: Visibility,
    editing_draft: Option<TaskDraft>,
    focus_hook: Option<FocusHook>,
}

impl<'s> Controller<'s> {
    pub fn new(store: &'s mut Store, initial_route: Option<&Route>) -> Self {
        let visibility = initial_route
            .map(Visibility::from_route)
            .unwrap_or_default();
        debug!(%visibility, "controller ready");
        Self {
            store,
            visibility,
            editing_draft: None,
            focus_hook: None,
        }
    }

    pub fn with_focus_hook(mut self, hook: impl FnMut(Uuid) + 'static) -> Self {
        self.focus_hook = Some(Box::new(hook));
        self
    }

    pub fn store(&self) -> &Store {
        &*self.store
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn editing_draft(&self) -> Option<&TaskDraft> {
        self.editing_draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut TaskDraft> {
        self.editing_draft.as_mut()
    }

    pub fn is_editing(&self) -> bool {
        self.editing_draft.is_some()
    }

    pub fn filtered_tasks(&self) -> Vec<&Task> {
        self.visibility.apply(self.store.items())
    }

    pub fn remaining(&self) -> usize {
        filter::remaining(self.store.items())
    }

    pub fn all_checked(&self) -> bool {
        filter::all_checked(self.store.items())
    }

    pub fn on_route_change(&mut self, route: &Route) {
        debug!(filter_by = ?route.filter_by, "route changed");
        self.visibility = Visibility::from_route(route);
    }

    #[tracing::instrument(skip(self, input))]
    pub fn add_todo(&mut self, input: &mut String) {
        let title = input.trim();
        if title.is_empty() {
            return;
        }

        let task = Task::new(title);
        match self.store.insert(task) {
            Ok(()) => {
                info!(remaining = self.remaining(), "todo added");
                input.clear();
            }
            Err(err) => self.surface(err),
        }
    }

    pub fn edit_todo(&mut self, task: &Task) {
        self.editing_draft = Some(task.draft());
        self.store.set_active_item(Some(task.uuid));
        debug!(uuid = %task.uuid, "editing todo");
        if let Some(hook) = self.focus_hook.as_mut() {
            hook(task.uuid);
        }
    }

    // No active item means an earlier trigger already committed.
    #[tracing::instrument(skip(self))]
    pub fn done_edit(&mut self) {
        let Some(item) = self.store.active_item() else {
            debug!("no active item; ignoring commit");
            return;
        };
        let Some(draft) = self.editing_draft.clone() else {
            debug!("no draft; ignoring commit");
            return;
        };

        match self.store.update(item, &draft) {
            Ok(()) => self.reset_edit(),
            Err(err) => self.surface(err),
        }
    }

    pub fn reset_edit(&mut self) {
        self.editing_draft = None;
        self.store.set_active_item(None);
        self.store.update_errors("");
    }

    pub fn remove_todo(&mut self, item: Uuid) {
        if let Err(err) = self.store.remove(item) {
            self.surface(err);
        }
    }

    pub fn remove_completed(&mut self) {
        if let Err(err) = self.store.remove_completed() {
            self.surface(err);
        }
    }

    pub fn toggle_all(&mut self, value: bool) {
        if let Err(err) = self.store.toggle_all(value) {
            self.surface(err);
        }
    }

    pub fn toggle_completed(&mut self, item: Uuid) {
        if let Err(err) = self.store.toggle_completed(item) {
            self.surface(err);
        }
    }

    fn surface(&mut self, err: anyhow::Error) {
        self.store.update_errors(format!("{err:#}"));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::anyhow;

    use super::Controller;
    use crate::datastore::{MemoryStorage, Storage};
    use crate::filter::Visibility;
    use crate::router::Route;
    use crate::store::Store;
    use crate::task::Task;

    fn store_with(titles: &[(&str, bool)]) -> Store {
        let tasks = titles
            .iter()
            .map(|(title, completed)| {
                let mut task = Task::new(*title);
                task.completed = *completed;
                task
            })
            .collect();
        let mut store = Store::new(MemoryStorage::with_tasks(tasks));
        store.list();
        store
    }

    struct ReadOnlyStorage(Vec<Task>);

    impl Storage for ReadOnlyStorage {
        fn load(&self) -> anyhow::Result<Vec<Task>> {
            Ok(self.0.clone())
        }

        fn save(&self, _tasks: &[Task]) -> anyhow::Result<()> {
            Err(anyhow!("storage is read-only"))
        }
    }

    #[test]
    fn add_trims_and_clears_input() {
        let mut store = store_with(&[]);
        let mut ctl = Controller::new(&mut store, None);

        let mut input = "  Buy milk  ".to_string();
        ctl.add_todo(&mut input);

        assert!(input.is_empty());
        let items = ctl.store().items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Buy milk");
        assert!(!items[0].completed);
    }

    #[test]
    fn add_ignores_blank_input() {
        let mut store = store_with(&[]);
        let mut ctl = Controller::new(&mut store, None);

        let mut input = "   ".to_string();
        ctl.add_todo(&mut input);

        assert_eq!(input, "   ");
        assert!(ctl.store().items().is_empty());
        assert!(ctl.store().error().is_empty());
    }

    #[test]
    fn failed_add_keeps_input_and_records_error() {
        let mut store = Store::new(ReadOnlyStorage(vec![]));
        let mut ctl = Controller::new(&mut store, None);

        let mut input = "Buy milk".to_string();
        ctl.add_todo(&mut input);

        assert_eq!(input, "Buy milk");
        assert!(ctl.store().items().is_empty());
        assert!(ctl.store().error().contains("read-only"));
    }

    #[test]
    fn edit_cycle_commits_and_returns_to_idle() {
        let mut store = store_with(&[("Buy milk", false)]);
        let task = store.items()[0].clone();
        let mut ctl = Controller::new(&mut store, None);

        ctl.edit_todo(&task);
        assert!(ctl.is_editing());
        assert_eq!(ctl.store().active_item(), Some(task.uuid));

        ctl.draft_mut().expect("draft").title = "Buy bread".to_string();
        assert_eq!(ctl.store().items()[0].title, "Buy milk");

        ctl.done_edit();
        assert_eq!(ctl.store().items()[0].title, "Buy bread");
        assert!(!ctl.is_editing());
        assert_eq!(ctl.store().active_item(), None);
    }

    #[test]
    fn done_edit_without_edit_is_noop() {
        let mut store = store_with(&[("Buy milk", false)]);
        let before = store.items().to_vec();
        let mut ctl = Controller::new(&mut store, None);

        ctl.done_edit();
        assert_eq!(ctl.store().items(), before.as_slice());
        assert!(ctl.store().error().is_empty());
    }

    #[test]
    fn repeated_commit_only_applies_once() {
        let mut store = store_with(&[("Buy milk", false)]);
        let task = store.items()[0].clone();
        let mut ctl = Controller::new(&mut store, None);

        ctl.edit_todo(&task);
        ctl.draft_mut().expect("draft").title = "Buy bread".to_string();
        ctl.done_edit();
        ctl.done_edit();

        assert_eq!(ctl.store().items()[0].title, "Buy bread");
        assert!(ctl.store().error().is_empty());
    }

    #[test]
    fn failed_update_keeps_draft_and_pointer() {
        let task = Task::new("Buy milk");
        let mut store = Store::new(ReadOnlyStorage(vec![task.clone()]));
        store.list();
        let mut ctl = Controller::new(&mut store, None);

        ctl.edit_todo(&task);
        ctl.draft_mut().expect("draft").title = "Buy bread".to_string();
        ctl.done_edit();

        assert_eq!(
            ctl.editing_draft().map(|d| d.title.as_str()),
            Some("Buy bread")
        );
        assert_eq!(ctl.store().active_item(), Some(task.uuid));
        assert!(!ctl.store().error().is_empty());
        assert_eq!(ctl.store().items()[0].title, "Buy milk");
    }

    #[test]
    fn blank_edit_is_rejected_then_cancel_clears_everything() {
        let mut store = store_with(&[("Buy milk", false)]);
        let task = store.items()[0].clone();
        let mut ctl = Controller::new(&mut store, None);

        ctl.edit_todo(&task);
        ctl.draft_mut().expect("draft").title = "  ".to_string();
        ctl.done_edit();
        assert!(ctl.is_editing());
        assert!(!ctl.store().error().is_empty());

        ctl.reset_edit();
        assert!(!ctl.is_editing());
        assert_eq!(ctl.store().active_item(), None);
        assert!(ctl.store().error().is_empty());
        assert_eq!(ctl.store().items()[0].title, "Buy milk");
    }

    #[test]
    fn scenario_filters_and_toggle_all() {
        let mut store = store_with(&[("Wash car", false), ("Pay bills", true)]);
        let mut ctl = Controller::new(&mut store, None);
        assert_eq!(ctl.visibility(), Visibility::All);
        assert_eq!(ctl.remaining(), 1);
        assert!(!ctl.all_checked());

        ctl.on_route_change(&Route::from_fragment("#/active"));
        let active: Vec<String> = ctl.filtered_tasks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(active, vec!["Wash car"]);

        ctl.on_route_change(&Route::from_fragment("#/completed"));
        let done: Vec<String> = ctl.filtered_tasks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(done, vec!["Pay bills"]);

        ctl.toggle_all(true);
        assert!(ctl.store().items().iter().all(|t| t.completed));
        assert!(ctl.all_checked());
        assert_eq!(ctl.remaining(), 0);
        assert_eq!(ctl.filtered_tasks().len(), 2);
    }

    #[test]
    fn initial_route_seeds_visibility() {
        let mut store = store_with(&[]);
        let route = Route::from_fragment("#/completed");
        let ctl = Controller::new(&mut store, Some(&route));
        assert_eq!(ctl.visibility(), Visibility::Completed);
    }

    #[test]
    fn unknown_route_shows_everything() {
        let mut store = store_with(&[("Wash car", false), ("Pay bills", true)]);
        let mut ctl = Controller::new(&mut store, None);
        ctl.on_route_change(&Route::from_fragment("#/someday"));
        assert_eq!(ctl.visibility(), Visibility::All);
        assert_eq!(ctl.filtered_tasks().len(), 2);
    }

    #[test]
    fn edit_requests_focus() {
        let focused = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&focused);

        let mut store = store_with(&[("Buy milk", false)]);
        let task = store.items()[0].clone();
        let mut ctl =
            Controller::new(&mut store, None).with_focus_hook(move |uuid| sink.borrow_mut().push(uuid));

        ctl.edit_todo(&task);
        assert_eq!(*focused.borrow(), vec![task.uuid]);
    }

    #[test]
    fn store_failures_surface_as_message() {
        let mut store = store_with(&[("Buy milk", false)]);
        let ghost = Task::new("ghost");
        let mut ctl = Controller::new(&mut store, None);

        ctl.toggle_completed(ghost.uuid);
        assert!(ctl.store().error().contains("not found"));

        ctl.reset_edit();
        ctl.remove_todo(ghost.uuid);
        assert!(ctl.store().error().contains("not found"));
        assert_eq!(ctl.store().items().len(), 1);
    }

    #[test]
    fn remove_and_clear_completed() {
        let mut store = store_with(&[("a", false), ("b", true)]);
        let first = store.items()[0].uuid;
        let mut ctl = Controller::new(&mut store, None);

        ctl.remove_completed();
        assert_eq!(ctl.store().items().len(), 1);
        ctl.remove_todo(first);
        assert!(ctl.store().items().is_empty());
        assert!(ctl.all_checked());
    }
}
