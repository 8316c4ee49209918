use tracing::debug;

use crate::api::TaskApi;
use crate::cache::TaskCache;
use crate::clock::Clock;
use crate::columns::BoardColumns;
use crate::config::ClientConfig;
use crate::status::{NormalizedStatus, Status};
use crate::task::TaskId;

/// What a drag session needs to know about the board.
pub trait BoardLookup {
    /// Status of a task shown in a column. `None` for unknown tasks and
    /// tasks with an unrecognized status.
    fn task_status(&self, id: &TaskId) -> Option<Status>;

    fn is_task_locked(&self, id: &TaskId) -> bool;
}

impl<A, C> BoardLookup for TaskCache<A, C>
where
    A: TaskApi,
    C: Clock,
{
    fn task_status(&self, id: &TaskId) -> Option<Status> {
        self.get(id).and_then(|task| task.status())
    }

    fn is_task_locked(&self, id: &TaskId) -> bool {
        TaskCache::is_task_locked(self, id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Column(Status),
    Task(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveDrag {
    pub active_task_id: TaskId,
    pub origin_status: Status,
    pub current_hover_target: Option<DropTarget>,
}

/// The single intent a finished drag produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub task_id: TaskId,
    pub from: Status,
    pub to: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Ignored,
    /// Press recorded; the pointer has not yet travelled far enough.
    Armed,
    Started(TaskId),
    Hovering(Option<DropTarget>),
    /// Released before the activation threshold: open the task instead.
    Select(TaskId),
    Dropped(Option<StatusChange>),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Armed { task_id: TaskId, origin: Point },
    Active(ActiveDrag),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    phase: Phase,
    activation_distance: f64,
}

impl DragSession {
    pub fn new(activation_distance: f64) -> Self {
        Self {
            phase: Phase::Idle,
            activation_distance,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.drag_activation_distance)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match &self.phase {
            Phase::Active(drag) => Some(drag),
            _ => None,
        }
    }

    /// Starts a drag. Returns `false`, leaving the session untouched, if a
    /// drag is already running or the task cannot move.
    pub fn begin(&mut self, board: &impl BoardLookup, task_id: TaskId) -> bool {
        if self.is_active() {
            debug!(task = %task_id, "drag already active; ignoring begin");
            return false;
        }
        if task_id.is_pending() || board.is_task_locked(&task_id) {
            debug!(task = %task_id, "task cannot be dragged");
            return false;
        }
        let Some(origin_status) = board.task_status(&task_id) else {
            debug!(task = %task_id, "task not on the board; ignoring begin");
            return false;
        };

        self.phase = Phase::Active(ActiveDrag {
            active_task_id: task_id,
            origin_status,
            current_hover_target: None,
        });
        debug!(task = %task_id, origin = origin_status.as_str(), "drag started");
        true
    }

    pub fn hover(&mut self, target: Option<DropTarget>) {
        if let Phase::Active(drag) = &mut self.phase {
            drag.current_hover_target = target;
        }
    }

    /// Ends the drag and yields a status change only when the drop target
    /// resolves to a status other than the origin.
    pub fn commit(&mut self, board: &impl BoardLookup) -> Option<StatusChange> {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        let Phase::Active(drag) = phase else {
            return None;
        };

        let target_status = match drag.current_hover_target? {
            DropTarget::Column(status) => Some(status),
            DropTarget::Task(over) => board.task_status(&over),
        }?;
        if target_status == drag.origin_status {
            debug!(task = %drag.active_task_id, "dropped in origin column; nothing to do");
            return None;
        }

        Some(StatusChange {
            task_id: drag.active_task_id,
            from: drag.origin_status,
            to: target_status,
        })
    }

    pub fn cancel(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            debug!("drag cancelled");
        }
        self.phase = Phase::Idle;
    }

    pub fn pointer_down(&mut self, task_id: TaskId, at: Point) -> GestureOutcome {
        if !matches!(self.phase, Phase::Idle) {
            return GestureOutcome::Ignored;
        }
        self.phase = Phase::Armed {
            task_id,
            origin: at,
        };
        GestureOutcome::Armed
    }

    pub fn pointer_move(
        &mut self,
        board: &impl BoardLookup,
        at: Point,
        target: Option<DropTarget>,
    ) -> GestureOutcome {
        match self.phase {
            Phase::Idle => GestureOutcome::Ignored,
            Phase::Armed { task_id, origin } => {
                if origin.distance_to(at) < self.activation_distance {
                    return GestureOutcome::Armed;
                }
                self.phase = Phase::Idle;
                if !self.begin(board, task_id) {
                    return GestureOutcome::Ignored;
                }
                self.hover(target);
                GestureOutcome::Started(task_id)
            }
            Phase::Active(_) => {
                self.hover(target);
                GestureOutcome::Hovering(target)
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        board: &impl BoardLookup,
        target: Option<DropTarget>,
    ) -> GestureOutcome {
        match self.phase {
            Phase::Idle => GestureOutcome::Ignored,
            Phase::Armed { task_id, .. } => {
                self.phase = Phase::Idle;
                GestureOutcome::Select(task_id)
            }
            Phase::Active(_) => {
                self.hover(target);
                GestureOutcome::Dropped(self.commit(board))
            }
        }
    }

    /// Keyboard pick-up; no activation threshold.
    pub fn pick_up(&mut self, board: &impl BoardLookup, task_id: TaskId) -> GestureOutcome {
        if !matches!(self.phase, Phase::Idle) {
            return GestureOutcome::Ignored;
        }
        if !self.begin(board, task_id) {
            return GestureOutcome::Ignored;
        }
        if let Some(drag) = self.active() {
            let origin = drag.origin_status;
            self.hover(Some(DropTarget::Column(origin)));
        }
        GestureOutcome::Started(task_id)
    }

    pub fn move_left(&mut self, board: &impl BoardLookup) -> GestureOutcome {
        self.shift_column(board, -1)
    }

    pub fn move_right(&mut self, board: &impl BoardLookup) -> GestureOutcome {
        self.shift_column(board, 1)
    }

    pub fn drop_here(&mut self, board: &impl BoardLookup) -> GestureOutcome {
        if !self.is_active() {
            return GestureOutcome::Ignored;
        }
        GestureOutcome::Dropped(self.commit(board))
    }

    pub fn escape(&mut self) -> GestureOutcome {
        if matches!(self.phase, Phase::Idle) {
            return GestureOutcome::Ignored;
        }
        self.cancel();
        GestureOutcome::Cancelled
    }

    fn shift_column(&mut self, board: &impl BoardLookup, step: isize) -> GestureOutcome {
        let Some(drag) = self.active() else {
            return GestureOutcome::Ignored;
        };
        let current = match drag.current_hover_target {
            Some(DropTarget::Column(status)) => status,
            Some(DropTarget::Task(over)) => board.task_status(&over).unwrap_or(drag.origin_status),
            None => drag.origin_status,
        };
        let next = current
            .column_index()
            .checked_add_signed(step)
            .and_then(Status::from_column_index)
            .unwrap_or(current);
        let target = Some(DropTarget::Column(next));
        self.hover(target);
        GestureOutcome::Hovering(target)
    }

    /// `columns` with the dragged card moved to where it is hovering.
    pub fn preview(&self, columns: &BoardColumns) -> BoardColumns {
        let mut preview = columns.clone();
        let Some(drag) = self.active() else {
            return preview;
        };
        let Some(target) = drag.current_hover_target else {
            return preview;
        };
        if target == DropTarget::Task(drag.active_task_id) {
            return preview;
        }
        let Some((from, index)) = preview.position(&drag.active_task_id) else {
            return preview;
        };

        let mut card = preview.column_mut(from).remove(index);
        match target {
            DropTarget::Column(status) => {
                card.status = NormalizedStatus::Known(status);
                preview.column_mut(status).push(card);
            }
            DropTarget::Task(over) => match preview.position(&over) {
                Some((status, at)) => {
                    card.status = NormalizedStatus::Known(status);
                    preview.column_mut(status).insert(at, card);
                }
                None => preview.column_mut(from).insert(index, card),
            },
        }
        preview
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::task::Task;

    #[derive(Default)]
    struct Board {
        statuses: HashMap<TaskId, Status>,
        locked: Vec<TaskId>,
    }

    impl Board {
        fn with(tasks: &[(i64, Status)]) -> Self {
            Self {
                statuses: tasks
                    .iter()
                    .map(|(id, status)| (TaskId::Remote(*id), *status))
                    .collect(),
                locked: vec![],
            }
        }
    }

    impl BoardLookup for Board {
        fn task_status(&self, id: &TaskId) -> Option<Status> {
            self.statuses.get(id).copied()
        }

        fn is_task_locked(&self, id: &TaskId) -> bool {
            self.locked.contains(id)
        }
    }

    fn id(raw: i64) -> TaskId {
        TaskId::Remote(raw)
    }

    #[test]
    fn drop_on_other_column_emits_one_change() {
        let board = Board::with(&[(1, Status::NotStarted)]);
        let mut drag = DragSession::new(8.0);

        assert!(drag.begin(&board, id(1)));
        drag.hover(Some(DropTarget::Column(Status::InProgress)));
        let change = drag.commit(&board);

        assert_eq!(
            change,
            Some(StatusChange {
                task_id: id(1),
                from: Status::NotStarted,
                to: Status::InProgress,
            })
        );
        assert!(!drag.is_active());
    }

    #[test]
    fn drop_on_task_uses_that_tasks_status() {
        let board = Board::with(&[(1, Status::NotStarted), (2, Status::Completed)]);
        let mut drag = DragSession::new(8.0);

        drag.begin(&board, id(1));
        drag.hover(Some(DropTarget::Task(id(2))));
        let change = drag.commit(&board).expect("change");
        assert_eq!(change.to, Status::Completed);
    }

    #[test]
    fn drop_in_origin_or_nowhere_is_a_noop() {
        let board = Board::with(&[(1, Status::InProgress), (2, Status::InProgress)]);
        let mut drag = DragSession::new(8.0);

        drag.begin(&board, id(1));
        drag.hover(Some(DropTarget::Task(id(2))));
        assert_eq!(drag.commit(&board), None);

        drag.begin(&board, id(1));
        assert_eq!(drag.commit(&board), None);
        assert!(!drag.is_active());
    }

    #[test]
    fn begin_rejects_locked_unknown_and_second_sessions() {
        let mut board = Board::with(&[(1, Status::NotStarted), (2, Status::NotStarted)]);
        board.locked.push(id(2));
        let mut drag = DragSession::new(8.0);

        assert!(!drag.begin(&board, id(2)));
        assert!(!drag.begin(&board, id(99)));
        assert!(!drag.begin(&board, TaskId::new_pending()));
        assert!(drag.begin(&board, id(1)));
        assert!(!drag.begin(&board, id(1)));
        assert_eq!(drag.active().map(|d| d.active_task_id), Some(id(1)));
    }

    #[test]
    fn cancel_discards_without_change() {
        let board = Board::with(&[(1, Status::NotStarted)]);
        let mut drag = DragSession::new(8.0);

        drag.begin(&board, id(1));
        drag.hover(Some(DropTarget::Column(Status::Completed)));
        drag.cancel();
        assert!(!drag.is_active());
        assert_eq!(drag.commit(&board), None);
    }

    #[test]
    fn short_press_selects_instead_of_dragging() {
        let board = Board::with(&[(1, Status::NotStarted)]);
        let mut drag = DragSession::new(8.0);

        assert_eq!(
            drag.pointer_down(id(1), Point::new(10.0, 10.0)),
            GestureOutcome::Armed
        );
        assert_eq!(
            drag.pointer_move(&board, Point::new(13.0, 14.0), None),
            GestureOutcome::Armed
        );
        assert_eq!(drag.pointer_up(&board, None), GestureOutcome::Select(id(1)));
        assert!(!drag.is_active());
    }

    #[test]
    fn pointer_past_threshold_drags_and_drops() {
        let board = Board::with(&[(1, Status::NotStarted)]);
        let mut drag = DragSession::new(8.0);
        let target = Some(DropTarget::Column(Status::Completed));

        drag.pointer_down(id(1), Point::new(0.0, 0.0));
        assert_eq!(
            drag.pointer_move(&board, Point::new(6.0, 8.0), target),
            GestureOutcome::Started(id(1))
        );
        let outcome = drag.pointer_up(&board, target);

        assert!(matches!(
            outcome,
            GestureOutcome::Dropped(Some(StatusChange { to: Status::Completed, .. }))
        ));
    }

    #[test]
    fn locked_task_never_activates_on_pointer() {
        let mut board = Board::with(&[(1, Status::NotStarted)]);
        board.locked.push(id(1));
        let mut drag = DragSession::new(8.0);

        drag.pointer_down(id(1), Point::new(0.0, 0.0));
        assert_eq!(
            drag.pointer_move(&board, Point::new(50.0, 0.0), None),
            GestureOutcome::Ignored
        );
        assert_eq!(drag.pointer_up(&board, None), GestureOutcome::Ignored);
    }

    #[test]
    fn keyboard_moves_across_columns_and_clamps() {
        let board = Board::with(&[(1, Status::NotStarted)]);
        let mut drag = DragSession::new(8.0);

        assert_eq!(drag.pick_up(&board, id(1)), GestureOutcome::Started(id(1)));
        drag.move_left(&board);
        assert_eq!(
            drag.active().and_then(|d| d.current_hover_target),
            Some(DropTarget::Column(Status::NotStarted))
        );
        drag.move_right(&board);
        drag.move_right(&board);
        drag.move_right(&board);

        let outcome = drag.drop_here(&board);
        assert!(matches!(
            outcome,
            GestureOutcome::Dropped(Some(StatusChange { to: Status::Completed, .. }))
        ));
    }

    #[test]
    fn escape_cancels_keyboard_drag() {
        let board = Board::with(&[(1, Status::InProgress)]);
        let mut drag = DragSession::new(8.0);

        drag.pick_up(&board, id(1));
        drag.move_right(&board);
        assert_eq!(drag.escape(), GestureOutcome::Cancelled);
        assert_eq!(drag.drop_here(&board), GestureOutcome::Ignored);
    }

    #[test]
    fn preview_moves_card_to_hover_target() {
        let created = Utc
            .with_ymd_and_hms(2024, 11, 18, 9, 0, 0)
            .single()
            .expect("ts");
        let card = |raw: i64, status: Status| Task {
            id: id(raw),
            title: format!("t{raw}"),
            description: None,
            status: NormalizedStatus::Known(status),
            is_sensitive: false,
            is_carried_over: false,
            is_locked: false,
            locked_at: None,
            created_at: created,
            updated_at: created,
            week_id: None,
            original_task_id: None,
        };
        let columns = BoardColumns::from_tasks(vec![
            card(1, Status::NotStarted),
            card(2, Status::Completed),
            card(3, Status::Completed),
        ]);
        let board = Board::with(&[
            (1, Status::NotStarted),
            (2, Status::Completed),
            (3, Status::Completed),
        ]);
        let mut drag = DragSession::new(8.0);

        drag.begin(&board, id(1));
        drag.hover(Some(DropTarget::Task(id(3))));
        let preview = drag.preview(&columns);

        assert!(preview.not_started.is_empty());
        let ids: Vec<TaskId> = preview.completed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![id(2), id(1), id(3)]);
        // Underlying columns are untouched.
        assert_eq!(columns.not_started.len(), 1);
    }
}
