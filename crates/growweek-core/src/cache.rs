use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared, TryFutureExt};
use growweek_shared::{ChangeTaskStatusRequest, CreateTaskRequest, TaskDto, UpdateTaskRequest};
use tracing::{debug, info, warn};

use crate::api::TaskApi;
use crate::clock::Clock;
use crate::columns::BoardColumns;
use crate::error::{BoardError, WEEK_LOCKED_CODE};
use crate::status::{NormalizedStatus, Status};
use crate::task::{Task, TaskId, Week, WeekId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub is_sensitive: bool,
    /// Falls back to the loaded week when unset.
    pub week_id: Option<WeekId>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            is_sensitive: false,
            week_id: None,
        }
    }
}

/// Field edits. `None` leaves a field alone; an empty description clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_sensitive: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_sensitive.is_none()
    }

    fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            task.description = non_blank(description);
        }
        if let Some(sensitive) = self.is_sensitive {
            task.is_sensitive = sensitive;
        }
    }

    fn to_request(&self) -> UpdateTaskRequest {
        UpdateTaskRequest {
            title: self.title.as_ref().map(|title| title.trim().to_string()),
            description: self.description.clone(),
            is_sensitive: self.is_sensitive,
        }
    }
}

type SettledSignal = Shared<oneshot::Receiver<()>>;

struct PendingMutation {
    seq: u64,
    /// What the entry reverts to if this is the last mutation standing and
    /// it fails. `None` for creates. A reload of the same week rebases the
    /// oldest one onto the fetched row.
    snapshot: Option<Task>,
    settled: SettledSignal,
}

struct MutationTicket {
    id: TaskId,
    seq: u64,
    epoch: u64,
    predecessor: Option<SettledSignal>,
    done: oneshot::Sender<()>,
}

enum Settlement {
    /// `None` once the server has removed the task.
    Confirmed(Option<Task>),
    Failed,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<TaskId, Task>,
    weeks: HashMap<WeekId, Week>,
    locked_weeks: HashSet<WeekId>,
    current_week: Option<WeekId>,
    /// Bumped on `reset` and when a load switches to another week.
    epoch: u64,
    next_seq: u64,
    pending: HashMap<TaskId, Vec<PendingMutation>>,
    reported_statuses: HashSet<String>,
}

impl CacheState {
    /// The task endpoints carry no week record, so in practice a week locks
    /// through `is_locked` on one of its tasks or a `WEEK_LOCKED` rejection.
    /// Week metadata handed to `register_week` adds review completion.
    fn is_week_locked(&self, week: WeekId) -> bool {
        self.locked_weeks.contains(&week)
            || self
                .weeks
                .get(&week)
                .is_some_and(|known| known.is_review_completed)
    }

    fn is_locked(&self, task: &Task) -> bool {
        task.is_locked || task.week_id.is_some_and(|week| self.is_week_locked(week))
    }

    fn absorb(&mut self, task: Task) {
        if task.is_locked
            && let Some(week) = task.week_id
        {
            self.locked_weeks.insert(week);
        }
        if let NormalizedStatus::Unrecognized(raw) = &task.status
            && self.reported_statuses.insert(raw.clone())
        {
            warn!(task = %task.id, status = %raw, "unrecognized task status; hiding task from the board");
        }
        self.entries.insert(task.id, task);
    }

    /// Entry that may be edited, plus its server id.
    fn editable(&self, id: TaskId) -> Result<(Task, i64), BoardError> {
        let current = self.entries.get(&id).cloned().ok_or(BoardError::NotFound(id))?;
        let Some(remote_id) = id.remote() else {
            return Err(BoardError::Validation(
                "task is still being created".to_string(),
            ));
        };
        if self.is_locked(&current) {
            return Err(BoardError::week_locked(current.week_id.map(|week| week.0)));
        }
        Ok((current, remote_id))
    }

    /// Applies `optimistic` (`None` hides the entry) and queues the mutation
    /// behind any earlier one for the same task.
    fn begin(&mut self, id: TaskId, snapshot: Option<Task>, optimistic: Option<Task>) -> MutationTicket {
        self.next_seq += 1;
        let seq = self.next_seq;
        let (done, settled) = oneshot::channel();

        let chain = self.pending.entry(id).or_default();
        let predecessor = chain.last().map(|earlier| earlier.settled.clone());
        chain.push(PendingMutation {
            seq,
            snapshot,
            settled: settled.shared(),
        });
        match optimistic {
            Some(task) => {
                self.entries.insert(id, task);
            }
            None => {
                self.entries.remove(&id);
            }
        }

        MutationTicket {
            id,
            seq,
            epoch: self.epoch,
            predecessor,
            done,
        }
    }

    fn settle(&mut self, id: TaskId, seq: u64, epoch: u64, settlement: Settlement) {
        if epoch != self.epoch {
            debug!(task = %id, seq, "settling against a discarded scope; ignoring");
            return;
        }

        let (visible, exhausted) = {
            let Some(chain) = self.pending.get_mut(&id) else {
                return;
            };
            let Some(position) = chain.iter().position(|mutation| mutation.seq == seq) else {
                return;
            };
            let finished = chain.remove(position);
            let replacement = match settlement {
                Settlement::Confirmed(task) => task,
                Settlement::Failed => finished.snapshot,
            };
            let visible = match chain.get_mut(position) {
                // A later mutation still owns the visible entry; hand it the
                // value to fall back to.
                Some(next) => {
                    next.snapshot = replacement;
                    None
                }
                None => Some(replacement),
            };
            (visible, chain.is_empty())
        };

        if exhausted {
            self.pending.remove(&id);
        }
        match visible {
            Some(Some(task)) => {
                if task.id != id {
                    self.entries.remove(&id);
                }
                self.absorb(task);
            }
            Some(None) => {
                self.entries.remove(&id);
            }
            None => {}
        }
    }
}

/// Removes the optimistic state if a mutation future is dropped before the
/// server answered.
struct InFlight<'a> {
    state: &'a RefCell<CacheState>,
    id: TaskId,
    seq: u64,
    epoch: u64,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(task = %self.id, seq = self.seq, "mutation abandoned before settling; rolling back");
            if let Ok(mut state) = self.state.try_borrow_mut() {
                state.settle(self.id, self.seq, self.epoch, Settlement::Failed);
            }
        }
    }
}

/// Client-side copy of the loaded week's tasks with optimistic mutations.
pub struct TaskCache<A, C> {
    api: A,
    clock: C,
    state: RefCell<CacheState>,
}

impl<A, C> TaskCache<A, C>
where
    A: TaskApi,
    C: Clock,
{
    pub fn new(api: A, clock: C) -> Self {
        Self {
            api,
            clock,
            state: RefCell::new(CacheState::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.state.borrow().entries.get(id).cloned()
    }

    /// Every cached task, unrecognized statuses included.
    pub fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.state.borrow().entries.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> BoardColumns {
        BoardColumns::from_tasks(self.state.borrow().entries.values().cloned())
    }

    pub fn current_week(&self) -> Option<WeekId> {
        self.state.borrow().current_week
    }

    pub fn week(&self, id: WeekId) -> Option<Week> {
        self.state.borrow().weeks.get(&id).cloned()
    }

    pub fn is_week_locked(&self, week: WeekId) -> bool {
        self.state.borrow().is_week_locked(week)
    }

    pub fn is_task_locked(&self, id: &TaskId) -> bool {
        let state = self.state.borrow();
        state.entries.get(id).is_some_and(|task| state.is_locked(task))
    }

    pub fn has_pending(&self, id: &TaskId) -> bool {
        self.state.borrow().pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.values().map(Vec::len).sum()
    }

    /// Records week metadata. A completed review is never un-completed by a
    /// later, staler copy.
    pub fn register_week(&self, week: Week) {
        let mut state = self.state.borrow_mut();
        let mut week = week;
        if let Some(known) = state.weeks.get(&week.id)
            && known.is_review_completed
            && !week.is_review_completed
        {
            warn!(week = %week.id, "server reports a reviewed week as open; keeping it locked");
            week.is_review_completed = true;
            week.review_completed_at = known.review_completed_at;
        }
        if week.is_review_completed {
            state.locked_weeks.insert(week.id);
        }
        state.weeks.insert(week.id, week);
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_current_week(&self) -> Result<usize, BoardError> {
        let fetched = self.api.current_week_tasks().await?;
        Ok(self.replace_scope(None, fetched))
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_week(&self, week: WeekId) -> Result<usize, BoardError> {
        let fetched = self.api.week_tasks(week).await?;
        Ok(self.replace_scope(Some(week), fetched))
    }

    /// Drops the loaded scope. Mutations still in flight settle into nothing.
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.epoch += 1;
        state.entries.clear();
        state.pending.clear();
        state.current_week = None;
        debug!(epoch = state.epoch, "task cache reset");
    }

    /// Swaps in a fresh server listing. Loading the week already on screen
    /// keeps in-flight mutations: their optimistic values stay visible and the
    /// oldest snapshot per task rebases onto the fetched row. Loading another
    /// week discards them.
    fn replace_scope(&self, week: Option<WeekId>, fetched: Vec<TaskDto>) -> usize {
        let now = self.clock.now();
        let mut tasks = Vec::with_capacity(fetched.len());
        let mut skipped = 0usize;
        for dto in fetched {
            if dto.is_deleted {
                continue;
            }
            let id = dto.id;
            match Task::from_dto(dto, now) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    skipped += 1;
                    warn!(task = id, error = %err, "skipping undecodable task");
                }
            }
        }
        let latest_week = tasks.iter().filter_map(|task| task.week_id).max();
        let scope = week.or(latest_week);

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let switching = matches!(
            (state.current_week, scope),
            (Some(shown), Some(next)) if shown != next
        );
        if switching {
            state.epoch += 1;
            state.pending.clear();
        }

        let owed: Vec<(TaskId, Option<Task>)> = state
            .pending
            .keys()
            .map(|id| (*id, state.entries.get(id).cloned()))
            .collect();
        state.entries.clear();
        for task in tasks {
            state.absorb(task);
        }
        for (id, optimistic) in &owed {
            let fetched_row = state.entries.get(id).cloned();
            if id.remote().is_some()
                && let Some(oldest) = state.pending.get_mut(id).and_then(|chain| chain.first_mut())
            {
                oldest.snapshot = fetched_row;
            }
            match optimistic {
                Some(task) => {
                    state.entries.insert(*id, task.clone());
                }
                None => {
                    state.entries.remove(id);
                }
            }
        }

        state.current_week = scope;
        let loaded = state.entries.len();
        info!(
            loaded,
            skipped,
            kept_in_flight = owed.len(),
            week = ?state.current_week,
            epoch = state.epoch,
            "task scope loaded"
        );
        loaded
    }

    /// Inserts an optimistic NOT_STARTED entry under a pending id and
    /// swaps it for the server's task once confirmed.
    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: NewTask) -> Result<Task, BoardError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(BoardError::Validation("title must not be empty".to_string()));
        }

        let now = self.clock.now();
        let (ticket, request) = {
            let mut state = self.state.borrow_mut();
            let week = input.week_id.or(state.current_week);
            if let Some(week) = week
                && state.is_week_locked(week)
            {
                return Err(BoardError::week_locked(Some(week.0)));
            }

            let description = input.description.as_deref().and_then(non_blank);
            let optimistic = Task {
                id: TaskId::new_pending(),
                title: title.clone(),
                description: description.clone(),
                status: NormalizedStatus::Known(Status::NotStarted),
                is_sensitive: input.is_sensitive,
                is_carried_over: false,
                is_locked: false,
                locked_at: None,
                created_at: now,
                updated_at: now,
                week_id: week,
                original_task_id: None,
            };
            let request = CreateTaskRequest {
                title,
                description,
                is_sensitive: input.is_sensitive,
                week_id: week.map(|week| week.0),
                created_date: now.date_naive().format("%Y-%m-%d").to_string(),
            };
            (state.begin(optimistic.id, None, Some(optimistic)), request)
        };

        let id = ticket.id;
        debug!(task = %id, "optimistic create applied");
        let created = self
            .run_mutation(ticket, || self.api.create_task(request).map_ok(Some))
            .await?;
        confirmed(id, created)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_fields(&self, id: TaskId, patch: TaskPatch) -> Result<Task, BoardError> {
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            return Err(BoardError::Validation("title must not be empty".to_string()));
        }

        let now = self.clock.now();
        let (ticket, remote_id) = {
            let mut state = self.state.borrow_mut();
            let (current, remote_id) = state.editable(id)?;
            let mut next = current.clone();
            patch.apply_to(&mut next);
            next.updated_at = now;
            (state.begin(id, Some(current), Some(next)), remote_id)
        };

        let request = patch.to_request();
        let updated = self
            .run_mutation(ticket, || self.api.update_task(remote_id, request).map_ok(Some))
            .await?;
        confirmed(id, updated)
    }

    /// Moving a task to the status it already has is a local no-op.
    #[tracing::instrument(skip(self))]
    pub async fn change_status(&self, id: TaskId, status: Status) -> Result<Task, BoardError> {
        let now = self.clock.now();
        let (ticket, remote_id) = {
            let mut state = self.state.borrow_mut();
            let (current, remote_id) = state.editable(id)?;
            if current.status() == Some(status) && !state.pending.contains_key(&id) {
                debug!(task = %id, status = status.as_str(), "status unchanged; skipping request");
                return Ok(current);
            }
            let mut next = current.clone();
            next.status = NormalizedStatus::Known(status);
            next.updated_at = now;
            (state.begin(id, Some(current), Some(next)), remote_id)
        };

        let request = ChangeTaskStatusRequest {
            status: status.as_str().to_string(),
        };
        let moved = self
            .run_mutation(ticket, || self.api.change_status(remote_id, request).map_ok(Some))
            .await?;
        confirmed(id, moved)
    }

    /// Hides the task at once and puts it back if the server refuses.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: TaskId) -> Result<(), BoardError> {
        let (ticket, remote_id) = {
            let mut state = self.state.borrow_mut();
            let (current, remote_id) = state.editable(id)?;
            (state.begin(id, Some(current), None), remote_id)
        };

        debug!(task = %id, "optimistic delete applied");
        self.run_mutation(ticket, || self.api.delete_task(remote_id).map_ok(|()| None))
            .await?;
        Ok(())
    }

    async fn run_mutation<F, Fut>(&self, ticket: MutationTicket, call: F) -> Result<Option<Task>, BoardError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<TaskDto>, BoardError>>,
    {
        let MutationTicket {
            id,
            seq,
            epoch,
            predecessor,
            done,
        } = ticket;
        let mut in_flight = InFlight {
            state: &self.state,
            id,
            seq,
            epoch,
            armed: true,
        };

        if let Some(earlier) = predecessor {
            debug!(task = %id, seq, "waiting for earlier mutation on the same task");
            let _ = earlier.await;
        }

        let outcome = match call().await {
            Ok(Some(dto)) => Task::from_dto(dto, self.clock.now()).map(Some),
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };
        in_flight.disarm();

        let result = match outcome {
            Ok(task) => {
                self.state
                    .borrow_mut()
                    .settle(id, seq, epoch, Settlement::Confirmed(task.clone()));
                debug!(task = %id, seq, removed = task.is_none(), "mutation confirmed");
                Ok(task)
            }
            Err(err) => {
                let err = self.classify_rejection(id, err);
                warn!(task = %id, seq, error = %err, "mutation failed; rolling back");
                self.state
                    .borrow_mut()
                    .settle(id, seq, epoch, Settlement::Failed);
                Err(err)
            }
        };

        let _ = done.send(());
        result
    }

    /// A server-side week lock becomes a policy violation and locks the week
    /// locally so later edits fail fast.
    fn classify_rejection(&self, id: TaskId, err: BoardError) -> BoardError {
        match err {
            BoardError::ServerRejected(failure) if failure.code == WEEK_LOCKED_CODE => {
                let mut state = self.state.borrow_mut();
                let week = state
                    .entries
                    .get(&id)
                    .and_then(|task| task.week_id)
                    .or(state.current_week);
                if let Some(week) = week {
                    state.locked_weeks.insert(week);
                }
                BoardError::PolicyViolation(failure)
            }
            other => other,
        }
    }
}

fn confirmed(id: TaskId, task: Option<Task>) -> Result<Task, BoardError> {
    task.ok_or_else(|| BoardError::malformed(None, format!("no task returned for {id}")))
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
