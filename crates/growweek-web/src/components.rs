mod kanban_card;
mod kanban_column;
mod login_form;
mod task_modal;

pub use kanban_card::{
  CardKey,
  KanbanCard
};
pub use kanban_column::KanbanColumn;
pub use login_form::{
  Credentials,
  LoginForm
};
pub use task_modal::TaskModal;
