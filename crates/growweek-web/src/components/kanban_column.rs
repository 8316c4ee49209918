use growweek_core::{
  DropTarget,
  Point,
  Status,
  Task,
  TaskId
};
use web_sys::PointerEvent;
use yew::{
  Callback,
  Html,
  Properties,
  classes,
  function_component,
  html
};

use super::{
  CardKey,
  KanbanCard
};

#[derive(Properties, PartialEq)]
pub struct KanbanColumnProps {
  pub status:          Status,
  pub cards:           Vec<Task>,
  pub locked:          Vec<TaskId>,
  pub dragging_task:   Option<TaskId>,
  pub is_drop_hint:    bool,
  pub on_pointer_down:
    Callback<(TaskId, Point)>,
  pub on_hover: Callback<DropTarget>,
  pub on_key:
    Callback<(TaskId, CardKey)>
}

#[function_component(KanbanColumn)]
pub fn kanban_column(
  props: &KanbanColumnProps
) -> Html {
  let status = props.status;

  let onpointerover = {
    let on_hover =
      props.on_hover.clone();
    Callback::from(
      move |_: PointerEvent| {
        on_hover.emit(
          DropTarget::Column(status)
        );
      }
    )
  };

  html! {
      <div
          class={classes!("kanban-column", props.is_drop_hint.then_some("drop-hint"))}
          data-status={status.as_str()}
          {onpointerover}
      >
          <div class="kanban-column-header">
              <span>{ status.label() }</span>
              <span class="badge">{ props.cards.len() }</span>
          </div>
          <div class="kanban-column-body">
              if props.cards.is_empty() {
                  <div class="kanban-empty">{ "No tasks" }</div>
              } else {
                  {
                      for props.cards.iter().cloned().map(|task| {
                          let task_id = task.id;
                          html! {
                              <KanbanCard
                                  key={task_id.to_string()}
                                  task={task}
                                  is_dragging={props.dragging_task == Some(task_id)}
                                  locked={props.locked.contains(&task_id)}
                                  on_pointer_down={props.on_pointer_down.clone()}
                                  on_hover={props.on_hover.clone()}
                                  on_key={props.on_key.clone()}
                              />
                          }
                      })
                  }
              }
          </div>
      </div>
  }
}
