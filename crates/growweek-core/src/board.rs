use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::api::TaskApi;
use crate::cache::{NewTask, TaskCache, TaskPatch};
use crate::clock::Clock;
use crate::columns::BoardColumns;
use crate::config::ClientConfig;
use crate::drag::{DragSession, DropTarget, GestureOutcome, Point};
use crate::error::BoardError;
use crate::status::Status;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(TaskId),
}

/// Form contents of the edit surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub is_sensitive: bool,
    pub status: Status,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            is_sensitive: false,
            status: Status::NotStarted,
        }
    }
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            is_sensitive: task.is_sensitive,
            status: task.status().unwrap_or(Status::NotStarted),
        }
    }

    fn patch_against(&self, task: &Task) -> TaskPatch {
        let description = self.description.trim();
        let current_description = task.description.as_deref().unwrap_or("");
        TaskPatch {
            title: (self.title.trim() != task.title).then(|| self.title.clone()),
            description: (description != current_description).then(|| description.to_string()),
            is_sensitive: (self.is_sensitive != task.is_sensitive).then_some(self.is_sensitive),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub mode: EditorMode,
    /// Locked tasks open for viewing only.
    pub read_only: bool,
    pub draft: TaskDraft,
}

/// Ties the cache, the drag session and the edit surface together for the
/// view layer.
pub struct BoardController<A, C> {
    cache: Rc<TaskCache<A, C>>,
    drag: RefCell<DragSession>,
    editor: RefCell<Option<EditorState>>,
}

impl<A, C> BoardController<A, C>
where
    A: TaskApi,
    C: Clock,
{
    pub fn new(cache: Rc<TaskCache<A, C>>, config: &ClientConfig) -> Self {
        Self {
            cache,
            drag: RefCell::new(DragSession::from_config(config)),
            editor: RefCell::new(None),
        }
    }

    pub fn cache(&self) -> &Rc<TaskCache<A, C>> {
        &self.cache
    }

    /// Columns as they should render right now, drag preview included.
    pub fn columns(&self) -> BoardColumns {
        self.drag.borrow().preview(&self.cache.columns())
    }

    pub fn dragging(&self) -> Option<TaskId> {
        self.drag.borrow().active().map(|drag| drag.active_task_id)
    }

    pub fn editor(&self) -> Option<EditorState> {
        self.editor.borrow().clone()
    }

    pub fn pointer_down(&self, task_id: TaskId, at: Point) -> GestureOutcome {
        self.drag.borrow_mut().pointer_down(task_id, at)
    }

    pub fn pointer_move(&self, at: Point, target: Option<DropTarget>) -> GestureOutcome {
        self.drag
            .borrow_mut()
            .pointer_move(self.cache.as_ref(), at, target)
    }

    pub async fn pointer_up(&self, target: Option<DropTarget>) -> Result<GestureOutcome, BoardError> {
        let outcome = self
            .drag
            .borrow_mut()
            .pointer_up(self.cache.as_ref(), target);
        self.apply_outcome(outcome).await
    }

    pub fn pick_up(&self, task_id: TaskId) -> GestureOutcome {
        self.drag.borrow_mut().pick_up(self.cache.as_ref(), task_id)
    }

    pub fn move_left(&self) -> GestureOutcome {
        self.drag.borrow_mut().move_left(self.cache.as_ref())
    }

    pub fn move_right(&self) -> GestureOutcome {
        self.drag.borrow_mut().move_right(self.cache.as_ref())
    }

    pub async fn key_drop(&self) -> Result<GestureOutcome, BoardError> {
        let outcome = self.drag.borrow_mut().drop_here(self.cache.as_ref());
        self.apply_outcome(outcome).await
    }

    pub fn cancel_drag(&self) -> GestureOutcome {
        self.drag.borrow_mut().escape()
    }

    async fn apply_outcome(&self, outcome: GestureOutcome) -> Result<GestureOutcome, BoardError> {
        match outcome {
            GestureOutcome::Select(task_id) => self.open_editor(task_id)?,
            GestureOutcome::Dropped(Some(change)) => {
                info!(task = %change.task_id, from = change.from.as_str(), to = change.to.as_str(), "task dropped");
                self.cache.change_status(change.task_id, change.to).await?;
            }
            _ => {}
        }
        Ok(outcome)
    }

    pub fn open_editor(&self, task_id: TaskId) -> Result<(), BoardError> {
        let task = self.cache.get(&task_id).ok_or(BoardError::NotFound(task_id))?;
        let read_only = self.cache.is_task_locked(&task_id);
        debug!(task = %task_id, read_only, "opening editor");
        *self.editor.borrow_mut() = Some(EditorState {
            mode: EditorMode::Edit(task_id),
            read_only,
            draft: TaskDraft::from_task(&task),
        });
        Ok(())
    }

    pub fn open_create_editor(&self) {
        let read_only = self
            .cache
            .current_week()
            .is_some_and(|week| self.cache.is_week_locked(week));
        *self.editor.borrow_mut() = Some(EditorState {
            mode: EditorMode::Create,
            read_only,
            draft: TaskDraft::default(),
        });
    }

    pub fn close_editor(&self) {
        self.editor.borrow_mut().take();
    }

    /// Saves the open editor. The editor closes on success and stays open
    /// with the user's draft on failure.
    #[tracing::instrument(skip(self, draft))]
    pub async fn submit_editor(&self, draft: TaskDraft) -> Result<Task, BoardError> {
        let Some(editor) = self.editor() else {
            return Err(BoardError::Validation("no editor is open".to_string()));
        };
        if editor.read_only {
            let week = self.cache.current_week().map(|week| week.0);
            return Err(BoardError::week_locked(week));
        }
        if let Some(open) = self.editor.borrow_mut().as_mut() {
            open.draft = draft.clone();
        }

        let saved = match editor.mode {
            EditorMode::Create => self.submit_create(draft).await?,
            EditorMode::Edit(task_id) => self.submit_edit(task_id, draft).await?,
        };
        self.close_editor();
        Ok(saved)
    }

    /// Creates the task, then moves it if another column was picked. Once the
    /// create confirms the editor points at the new task, so a failed move is
    /// retried as an edit rather than a second create.
    async fn submit_create(&self, draft: TaskDraft) -> Result<Task, BoardError> {
        let status = draft.status;
        let created = self
            .cache
            .create(NewTask {
                title: draft.title.clone(),
                description: Some(draft.description.clone()),
                is_sensitive: draft.is_sensitive,
                week_id: None,
            })
            .await?;
        if let Some(open) = self.editor.borrow_mut().as_mut() {
            open.mode = EditorMode::Edit(created.id);
            open.draft = draft;
        }
        if status == Status::NotStarted {
            return Ok(created);
        }
        self.cache.change_status(created.id, status).await
    }

    async fn submit_edit(&self, task_id: TaskId, draft: TaskDraft) -> Result<Task, BoardError> {
        let current = self.cache.get(&task_id).ok_or(BoardError::NotFound(task_id))?;
        let patch = draft.patch_against(&current);

        let mut saved = current;
        if !patch.is_empty() {
            saved = self.cache.update_fields(task_id, patch).await?;
        }
        if saved.status() != Some(draft.status) {
            saved = self.cache.change_status(task_id, draft.status).await?;
        }
        Ok(saved)
    }

    /// Deletes the task open in the editor and closes it. Locked tasks and
    /// the create form have nothing to delete.
    #[tracing::instrument(skip(self))]
    pub async fn delete_editor_task(&self) -> Result<(), BoardError> {
        let Some(editor) = self.editor() else {
            return Err(BoardError::Validation("no editor is open".to_string()));
        };
        let EditorMode::Edit(task_id) = editor.mode else {
            return Err(BoardError::Validation("task has not been saved yet".to_string()));
        };
        if editor.read_only {
            let week = self.cache.get(&task_id).and_then(|task| task.week_id);
            return Err(BoardError::week_locked(week.map(|week| week.0)));
        }

        self.cache.delete(task_id).await?;
        info!(task = %task_id, "task deleted");
        self.close_editor();
        Ok(())
    }

    /// Reloads the week on screen, abandoning any drag in progress.
    pub async fn refresh(&self) -> Result<usize, BoardError> {
        self.drag.borrow_mut().cancel();
        match self.cache.current_week() {
            Some(week) => self.cache.load_week(week).await,
            None => self.cache.load_current_week().await,
        }
    }
}
