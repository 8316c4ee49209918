use std::future::Future;
use std::rc::Rc;

use gloo::timers::future::TimeoutFuture;

use growweek_core::{
  BoardError,
  Client,
  ClientConfig,
  DropTarget,
  EditorMode,
  GestureOutcome,
  Navigator,
  Point,
  SystemClock,
  TaskDraft,
  TaskId,
  connect
};
use wasm_bindgen_futures::spawn_local;
use web_sys::PointerEvent;
use yew::{
  Callback,
  Html,
  UseForceUpdateHandle,
  UseStateHandle,
  function_component,
  html,
  use_effect_with,
  use_force_update,
  use_memo,
  use_mut_ref,
  use_state
};

use crate::browser::{
  BrowserNavigator,
  FetchBackend,
  LocalStorageCredentialStore
};
use crate::components::{
  CardKey,
  Credentials,
  KanbanColumn,
  LoginForm,
  TaskModal
};

const EMBEDDED_CONFIG: &str =
  include_str!("../growweek.toml");

type WebClient = Client<
  FetchBackend,
  LocalStorageCredentialStore,
  BrowserNavigator,
  SystemClock
>;

/// Embedded config, then
/// `?growweek.<key>=<value>` query
/// overrides.
fn load_config() -> ClientConfig {
  let mut config =
    match ClientConfig::from_toml_str(
      EMBEDDED_CONFIG
    ) {
      | Ok(config) => config,
      | Err(err) => {
        tracing::warn!(
          error = %err,
          "embedded config invalid; \
           using defaults"
        );
        ClientConfig::default()
      }
    };

  let search = web_sys::window()
    .and_then(|window| {
      window.location().search().ok()
    })
    .unwrap_or_default();
  let overrides = search
    .trim_start_matches('?')
    .split('&')
    .filter_map(|pair| {
      pair.split_once('=')
    })
    .filter(|(key, _)| {
      key.starts_with("growweek.")
    })
    .map(|(key, value)| {
      (key.to_string(), value.to_string())
    })
    .collect::<Vec<_>>();

  if !overrides.is_empty()
    && let Err(err) =
      config.apply_overrides(overrides)
  {
    tracing::warn!(
      error = %err,
      "ignoring invalid query \
       overrides"
    );
  }
  config
}

fn build_client() -> WebClient {
  let config = load_config();
  connect(
    FetchBackend,
    LocalStorageCredentialStore::new(
      &config.credential_key
    ),
    BrowserNavigator,
    SystemClock,
    &config
  )
}

fn report(
  error: &UseStateHandle<Option<String>>,
  err: &BoardError
) {
  tracing::warn!(
    kind = ?err.kind(),
    error = %err,
    "board operation failed"
  );
  if matches!(
    err,
    BoardError::AuthorizationTerminal
  ) {
    return;
  }
  error.set(Some(err.user_message()));
}

/// Runs `work` in the background and
/// repaints twice: once after its
/// optimistic step, once when it
/// settles.
fn run_then_redraw<F, T>(
  work: F,
  redraw: &UseForceUpdateHandle,
  error: &UseStateHandle<Option<String>>
) where
  F: Future<Output = Result<T, BoardError>>
    + 'static,
  T: 'static
{
  {
    let redraw = redraw.clone();
    let error = error.clone();
    spawn_local(async move {
      if let Err(err) = work.await {
        report(&error, &err);
      }
      redraw.force_update();
    });
  }

  let redraw = redraw.clone();
  spawn_local(async move {
    TimeoutFuture::new(0).await;
    redraw.force_update();
  });
}

#[function_component(App)]
pub fn app() -> Html {
  let client = use_memo((), |_| {
    build_client()
  });
  let redraw = use_force_update();
  let error =
    use_state(|| None::<String>);
  let busy = use_state(|| false);
  let hover =
    use_mut_ref(|| None::<DropTarget>);

  let path =
    BrowserNavigator.current_path();
  let on_auth_page = client
    .session
    .config()
    .is_auth_path(&path);

  {
    let client = client.clone();
    let redraw = redraw.clone();
    let error = error.clone();
    use_effect_with(
      on_auth_page,
      move |on_auth_page| {
        if !*on_auth_page
          && client.auth.is_signed_in()
        {
          spawn_local(async move {
            match client
              .board
              .refresh()
              .await
            {
              | Ok(count) => {
                tracing::info!(
                  count,
                  "board loaded"
                )
              }
              | Err(err) => {
                report(&error, &err)
              }
            }
            redraw.force_update();
          });
        }
        || ()
      }
    );
  }

  if let Some(target) =
    client.auth.route_guard(&path)
  {
    BrowserNavigator.navigate(&target);
    return html! {};
  }

  if on_auth_page {
    let register = path.starts_with(
      &client.session.config().register_path
    );
    let on_submit = {
      let client = client.clone();
      let error = error.clone();
      let busy = busy.clone();
      Callback::from(
        move |form: Credentials| {
          let client = client.clone();
          let error = error.clone();
          let busy = busy.clone();
          busy.set(true);
          spawn_local(async move {
            let result = async {
              if register {
                client
                  .auth
                  .register(
                    &form.email,
                    &form.password,
                    &form.name
                  )
                  .await?;
              }
              client
                .auth
                .login(
                  &form.email,
                  &form.password
                )
                .await
            }
            .await;
            busy.set(false);
            match result {
              | Ok(login) => {
                tracing::info!(
                  user = %login.email,
                  "signed in"
                );
                BrowserNavigator.navigate(
                  &client
                    .session
                    .config()
                    .home_path
                );
              }
              | Err(err) => {
                report(&error, &err)
              }
            }
          });
        }
      )
    };

    return html! {
        <LoginForm
            register={register}
            busy={*busy}
            error={(*error).clone()}
            on_submit={on_submit}
        />
    };
  }

  let board = Rc::clone(&client.board);
  let columns = board.columns();
  let dragging = board.dragging();
  let editor = board.editor();
  let current_week =
    board.cache().current_week();
  let week_locked = current_week
    .is_some_and(|week| {
      board.cache().is_week_locked(week)
    });
  let drop_hint = dragging.and_then(|_| {
    match *hover.borrow() {
      | Some(DropTarget::Column(status)) => {
        Some(status)
      }
      | Some(DropTarget::Task(over)) => {
        board
          .cache()
          .get(&over)
          .and_then(|task| task.status())
      }
      | None => None
    }
  });

  let on_hover = {
    let hover = hover.clone();
    Callback::from(
      move |target: DropTarget| {
        *hover.borrow_mut() =
          Some(target);
      }
    )
  };

  let on_pointer_down = {
    let board = board.clone();
    let hover = hover.clone();
    Callback::from(
      move |(task_id, at): (
        TaskId,
        Point
      )| {
        hover.borrow_mut().take();
        board.pointer_down(task_id, at);
      }
    )
  };

  let onpointermove = {
    let board = board.clone();
    let hover = hover.clone();
    let redraw = redraw.clone();
    Callback::from(
      move |event: PointerEvent| {
        let at = Point::new(
          f64::from(event.client_x()),
          f64::from(event.client_y())
        );
        let target = *hover.borrow();
        match board
          .pointer_move(at, target)
        {
          | GestureOutcome::Started(_)
          | GestureOutcome::Hovering(_) => {
            redraw.force_update()
          }
          | _ => {}
        }
      }
    )
  };

  let onpointerup = {
    let board = board.clone();
    let hover = hover.clone();
    let redraw = redraw.clone();
    let error = error.clone();
    Callback::from(
      move |_: PointerEvent| {
        let board = board.clone();
        let target =
          hover.borrow_mut().take();
        run_then_redraw(
          async move {
            board.pointer_up(target).await
          },
          &redraw,
          &error
        );
      }
    )
  };

  let onpointerleave = {
    let board = board.clone();
    let redraw = redraw.clone();
    Callback::from(
      move |_: PointerEvent| {
        if board.cancel_drag()
          == GestureOutcome::Cancelled
        {
          redraw.force_update();
        }
      }
    )
  };

  let on_key = {
    let board = board.clone();
    let redraw = redraw.clone();
    let error = error.clone();
    Callback::from(
      move |(task_id, key): (
        TaskId,
        CardKey
      )| {
        match key {
          | CardKey::Toggle
            if board
              .dragging()
              .is_some() =>
          {
            let board = board.clone();
            run_then_redraw(
              async move {
                board.key_drop().await
              },
              &redraw,
              &error
            );
          }
          | CardKey::Toggle => {
            board.pick_up(task_id);
          }
          | CardKey::Left => {
            board.move_left();
          }
          | CardKey::Right => {
            board.move_right();
          }
          | CardKey::Escape => {
            board.cancel_drag();
          }
        }
        redraw.force_update();
      }
    )
  };

  let on_new_task = {
    let board = board.clone();
    let redraw = redraw.clone();
    Callback::from(move |_| {
      board.open_create_editor();
      redraw.force_update();
    })
  };

  let on_refresh = {
    let board = board.clone();
    let redraw = redraw.clone();
    let error = error.clone();
    Callback::from(move |_| {
      let board = board.clone();
      run_then_redraw(
        async move {
          board.refresh().await
        },
        &redraw,
        &error
      );
    })
  };

  let on_logout = {
    let client = client.clone();
    let error = error.clone();
    Callback::from(move |_| {
      let client = client.clone();
      let error = error.clone();
      spawn_local(async move {
        if let Err(err) =
          client.auth.logout().await
        {
          report(&error, &err);
        }
        client.board.cache().reset();
      });
    })
  };

  let on_submit_editor = {
    let board = board.clone();
    let redraw = redraw.clone();
    let error = error.clone();
    let busy = busy.clone();
    Callback::from(
      move |draft: TaskDraft| {
        let board = board.clone();
        let busy = busy.clone();
        busy.set(true);
        error.set(None);
        run_then_redraw(
          async move {
            let saved = board
              .submit_editor(draft)
              .await;
            busy.set(false);
            saved
          },
          &redraw,
          &error
        );
      }
    )
  };

  let on_delete_editor = {
    let board = board.clone();
    let redraw = redraw.clone();
    let error = error.clone();
    let busy = busy.clone();
    Callback::from(move |_| {
      let board = board.clone();
      let busy = busy.clone();
      busy.set(true);
      error.set(None);
      run_then_redraw(
        async move {
          let deleted =
            board.delete_editor_task().await;
          busy.set(false);
          deleted
        },
        &redraw,
        &error
      );
    })
  };

  let on_close_editor = {
    let board = board.clone();
    let redraw = redraw.clone();
    let error = error.clone();
    Callback::from(move |_| {
      board.close_editor();
      error.set(None);
      redraw.force_update();
    })
  };

  let dismiss_error = {
    let error = error.clone();
    Callback::from(move |_| {
      error.set(None)
    })
  };

  html! {
      <div class="board-page">
          <div class="panel toolbar">
              <div class="header">
                  {
                      match current_week {
                          Some(week) => format!("Week {week}"),
                          None => "This week".to_string(),
                      }
                  }
                  if week_locked {
                      <span class="badge">{ "review completed" }</span>
                  }
              </div>
              <button onclick={on_new_task} disabled={week_locked}>{ "New task" }</button>
              <button class="ghost" onclick={on_refresh}>{ "Refresh" }</button>
              <button class="ghost" onclick={on_logout}>{ "Sign out" }</button>
          </div>
          if let Some(message) = (*error).clone() {
              <div class="banner error" onclick={dismiss_error}>{ message }</div>
          }
          <div class="kanban-board" {onpointermove} {onpointerup} {onpointerleave}>
              {
                  for columns.iter().map(|(status, cards)| {
                      let locked = cards
                          .iter()
                          .filter(|task| board.cache().is_task_locked(&task.id))
                          .map(|task| task.id)
                          .collect::<Vec<_>>();
                      html! {
                          <KanbanColumn
                              key={status.as_str()}
                              status={status}
                              cards={cards.to_vec()}
                              locked={locked}
                              dragging_task={dragging}
                              is_drop_hint={drop_hint == Some(status)}
                              on_pointer_down={on_pointer_down.clone()}
                              on_hover={on_hover.clone()}
                              on_key={on_key.clone()}
                          />
                      }
                  })
              }
          </div>
          if let Some(editor) = editor {
              <TaskModal
                  key={editor_key(editor.mode)}
                  editor={editor.clone()}
                  busy={*busy}
                  error={(*error).clone()}
                  on_submit={on_submit_editor}
                  on_delete={on_delete_editor}
                  on_close={on_close_editor}
              />
          }
      </div>
  }
}

fn editor_key(mode: EditorMode) -> String {
  match mode {
    | EditorMode::Create => {
      "create".to_string()
    }
    | EditorMode::Edit(id) => {
      format!("edit-{id}")
    }
  }
}
