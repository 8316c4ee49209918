use crate::status::{NormalizedStatus, Status};
use crate::task::{Task, TaskId};

/// Tasks grouped for rendering. Tasks whose status could not be normalized
/// sit in `unrecognized` and never in a status column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardColumns {
    pub not_started: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
    pub unrecognized: Vec<Task>,
}

impl BoardColumns {
    pub fn from_tasks<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = Task>,
    {
        let mut columns = BoardColumns::default();
        for task in tasks {
            match task.status {
                NormalizedStatus::Known(status) => columns.column_mut(status).push(task),
                NormalizedStatus::Unrecognized(_) => columns.unrecognized.push(task),
            }
        }
        for status in Status::ALL {
            columns
                .column_mut(status)
                .sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        }
        columns
    }

    pub fn column(&self, status: Status) -> &[Task] {
        match status {
            Status::NotStarted => &self.not_started,
            Status::InProgress => &self.in_progress,
            Status::Completed => &self.completed,
        }
    }

    pub fn column_mut(&mut self, status: Status) -> &mut Vec<Task> {
        match status {
            Status::NotStarted => &mut self.not_started,
            Status::InProgress => &mut self.in_progress,
            Status::Completed => &mut self.completed,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Status, &[Task])> {
        Status::ALL
            .into_iter()
            .map(move |status| (status, self.column(status)))
    }

    /// Column and index of `id` among the status columns.
    pub fn position(&self, id: &TaskId) -> Option<(Status, usize)> {
        self.iter().find_map(|(status, tasks)| {
            tasks
                .iter()
                .position(|task| task.id == *id)
                .map(|index| (status, index))
        })
    }

    pub fn grouped_len(&self) -> usize {
        self.not_started.len() + self.in_progress.len() + self.completed.len()
    }
}
