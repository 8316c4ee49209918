use growweek_core::{
  EditorMode,
  EditorState,
  Status,
  TaskDraft
};
use web_sys::{
  HtmlInputElement,
  HtmlSelectElement,
  HtmlTextAreaElement,
  SubmitEvent
};
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  function_component,
  html,
  use_state
};

#[derive(Properties, PartialEq)]
pub struct TaskModalProps {
  pub editor:    EditorState,
  pub busy:      bool,
  pub error:     Option<String>,
  pub on_submit: Callback<TaskDraft>,
  pub on_delete: Callback<()>,
  pub on_close:  Callback<()>
}

#[function_component(TaskModal)]
pub fn task_modal(
  props: &TaskModalProps
) -> Html {
  let draft = {
    let initial =
      props.editor.draft.clone();
    use_state(move || initial)
  };
  let read_only = props.editor.read_only;
  let disabled = read_only || props.busy;

  let heading = match (
    props.editor.mode,
    read_only
  ) {
    | (EditorMode::Create, _) => {
      "New task"
    }
    | (EditorMode::Edit(_), true) => {
      "Task (week locked)"
    }
    | (EditorMode::Edit(_), false) => {
      "Edit task"
    }
  };

  let on_title = {
    let draft = draft.clone();
    Callback::from(
      move |event: yew::InputEvent| {
        let input: HtmlInputElement =
          event.target_unchecked_into();
        let mut next = (*draft).clone();
        next.title = input.value();
        draft.set(next);
      }
    )
  };

  let on_description = {
    let draft = draft.clone();
    Callback::from(
      move |event: yew::InputEvent| {
        let input: HtmlTextAreaElement =
          event.target_unchecked_into();
        let mut next = (*draft).clone();
        next.description = input.value();
        draft.set(next);
      }
    )
  };

  let on_sensitive = {
    let draft = draft.clone();
    Callback::from(
      move |event: yew::Event| {
        let input: HtmlInputElement =
          event.target_unchecked_into();
        let mut next = (*draft).clone();
        next.is_sensitive =
          input.checked();
        draft.set(next);
      }
    )
  };

  let on_status = {
    let draft = draft.clone();
    Callback::from(
      move |event: yew::Event| {
        let select: HtmlSelectElement =
          event.target_unchecked_into();
        let picked = select
          .value()
          .parse::<usize>()
          .ok()
          .and_then(
            Status::from_column_index
          );
        if let Some(status) = picked {
          let mut next =
            (*draft).clone();
          next.status = status;
          draft.set(next);
        }
      }
    )
  };

  let onsubmit = {
    let draft = draft.clone();
    let on_submit =
      props.on_submit.clone();
    Callback::from(
      move |event: SubmitEvent| {
        event.prevent_default();
        on_submit.emit((*draft).clone());
      }
    )
  };

  let delete = {
    let on_delete =
      props.on_delete.clone();
    Callback::from(move |_| {
      on_delete.emit(())
    })
  };
  let can_delete = !read_only
    && matches!(
      props.editor.mode,
      EditorMode::Edit(_)
    );

  let close = {
    let on_close =
      props.on_close.clone();
    Callback::from(move |_| {
      on_close.emit(())
    })
  };

  html! {
      <div class="modal-backdrop">
          <form class="modal" {onsubmit}>
              <div class="header">{ heading }</div>
              if let Some(message) = props.error.clone() {
                  <div class="modal-error">{ message }</div>
              }
              <label>
                  { "Title" }
                  <input
                      type="text"
                      value={draft.title.clone()}
                      oninput={on_title}
                      disabled={disabled}
                      required=true
                  />
              </label>
              <label>
                  { "Description" }
                  <textarea
                      value={draft.description.clone()}
                      oninput={on_description}
                      disabled={disabled}
                  />
              </label>
              <label class="inline">
                  <input
                      type="checkbox"
                      checked={draft.is_sensitive}
                      onchange={on_sensitive}
                      disabled={disabled}
                  />
                  { "Private" }
              </label>
              <label>
                  { "Status" }
                  <select onchange={on_status} disabled={disabled}>
                      {
                          for Status::ALL.iter().map(|status| html! {
                              <option
                                  value={status.column_index().to_string()}
                                  selected={*status == draft.status}
                              >
                                  { status.label() }
                              </option>
                          })
                      }
                  </select>
              </label>
              <div class="modal-actions">
                  if can_delete {
                      <button
                          type="button"
                          class="danger"
                          onclick={delete}
                          disabled={props.busy}
                      >
                          { "Delete" }
                      </button>
                  }
                  <button type="button" class="ghost" onclick={close}>
                      { if read_only { "Close" } else { "Cancel" } }
                  </button>
                  if !read_only {
                      <button type="submit" disabled={props.busy}>
                          { if props.busy { "Saving…" } else { "Save" } }
                      </button>
                  }
              </div>
          </form>
      </div>
  }
}
