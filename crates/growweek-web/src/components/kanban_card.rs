use growweek_core::{
  DropTarget,
  Point,
  Task,
  TaskId
};
use web_sys::{
  KeyboardEvent,
  PointerEvent
};
use yew::{
  Callback,
  Html,
  Properties,
  classes,
  function_component,
  html
};

/// Keys a focused card understands
/// while picking up or carrying it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum CardKey {
  Toggle,
  Left,
  Right,
  Escape
}

impl CardKey {
  fn from_event(
    event: &KeyboardEvent
  ) -> Option<Self> {
    match event.key().as_str() {
      | " " | "Enter" => {
        Some(Self::Toggle)
      }
      | "ArrowLeft" => Some(Self::Left),
      | "ArrowRight" => {
        Some(Self::Right)
      }
      | "Escape" => Some(Self::Escape),
      | _ => None
    }
  }
}

#[derive(Properties, PartialEq)]
pub struct KanbanCardProps {
  pub task:            Task,
  pub is_dragging:     bool,
  pub locked:          bool,
  pub on_pointer_down:
    Callback<(TaskId, Point)>,
  pub on_hover: Callback<DropTarget>,
  pub on_key:
    Callback<(TaskId, CardKey)>
}

#[function_component(KanbanCard)]
pub fn kanban_card(
  props: &KanbanCardProps
) -> Html {
  let task_id = props.task.id;

  let onpointerdown = {
    let on_pointer_down =
      props.on_pointer_down.clone();
    Callback::from(
      move |event: PointerEvent| {
        if event.button() != 0 {
          return;
        }
        event.prevent_default();
        on_pointer_down.emit((
          task_id,
          Point::new(
            f64::from(event.client_x()),
            f64::from(event.client_y())
          )
        ));
      }
    )
  };

  let onpointerover = {
    let on_hover =
      props.on_hover.clone();
    Callback::from(
      move |event: PointerEvent| {
        event.stop_propagation();
        on_hover.emit(
          DropTarget::Task(task_id)
        );
      }
    )
  };

  let onkeydown = {
    let on_key = props.on_key.clone();
    Callback::from(
      move |event: KeyboardEvent| {
        if let Some(key) =
          CardKey::from_event(&event)
        {
          event.prevent_default();
          on_key.emit((task_id, key));
        }
      }
    )
  };

  let description =
    props.task.description.clone();

  html! {
      <div
          class={classes!(
              "kanban-card",
              props.is_dragging.then_some("dragging"),
              props.locked.then_some("locked"),
              task_id.is_pending().then_some("saving"),
          )}
          tabindex="0"
          role="button"
          aria-grabbed={props.is_dragging.to_string()}
          {onpointerdown}
          {onpointerover}
          {onkeydown}
      >
          <div class="kanban-card-title">
              if props.task.is_sensitive {
                  <span class="badge sensitive">{ "private" }</span>
              }
              { &props.task.title }
          </div>
          if let Some(text) = description {
              <div class="task-subtitle">{ text }</div>
          }
          <div class="kanban-card-meta">
              if props.task.is_carried_over {
                  <span class="badge">{ "carried over" }</span>
              }
              if props.locked {
                  <span class="badge">{ "locked" }</span>
              }
              <span class="muted">{ props.task.updated_at.format("%b %-d, %H:%M").to_string() }</span>
          </div>
      </div>
  }
}
