pub mod api;
pub mod auth;
pub mod board;
pub mod cache;
pub mod clock;
pub mod columns;
pub mod config;
pub mod credential;
pub mod drag;
pub mod error;
pub mod session;
pub mod status;
pub mod task;
pub mod transport;

use std::rc::Rc;

use tracing::info;

pub use crate::api::{
  RemoteTaskApi,
  TaskApi
};
pub use crate::auth::AuthClient;
pub use crate::board::{
  BoardController,
  EditorMode,
  EditorState,
  TaskDraft
};
pub use crate::cache::{
  NewTask,
  TaskCache,
  TaskPatch
};
pub use crate::clock::{
  Clock,
  SystemClock
};
pub use crate::columns::BoardColumns;
pub use crate::config::ClientConfig;
pub use crate::credential::{
  CredentialStore,
  MemoryCredentialStore
};
pub use crate::drag::{
  DragSession,
  DropTarget,
  GestureOutcome,
  Point,
  StatusChange
};
pub use crate::error::{
  ApiFailure,
  BoardError,
  ErrorKind
};
pub use crate::session::{
  Navigator,
  SessionManager
};
pub use crate::status::{
  NormalizedStatus,
  Status
};
pub use crate::task::{
  Task,
  TaskId,
  Week,
  WeekId
};
pub use crate::transport::{
  HttpBackend,
  Transport
};

pub type RemoteBoard<B, S, N, C> =
  BoardController<
    RemoteTaskApi<B, S, N>,
    C
  >;

/// Everything the view layer talks
/// to, sharing one session.
pub struct Client<B, S, N, C> {
  pub session:
    SessionManager<B, S, N>,
  pub auth: AuthClient<B, S, N>,
  pub board:
    Rc<RemoteBoard<B, S, N, C>>
}

#[tracing::instrument(skip_all)]
pub fn connect<B, S, N, C>(
  backend: B,
  credentials: S,
  navigator: N,
  clock: C,
  config: &ClientConfig
) -> Client<B, S, N, C>
where
  B: HttpBackend + 'static,
  S: CredentialStore + 'static,
  N: Navigator + 'static,
  C: Clock
{
  let api_root = config.api_root();
  info!(
    %api_root,
    signed_in =
      credentials.get().is_some(),
    "connecting growweek client"
  );

  let transport = Transport::new(
    backend,
    credentials,
    api_root
  );
  let session = SessionManager::new(
    transport, navigator, config
  );
  let cache = Rc::new(
    TaskCache::new(
      RemoteTaskApi::new(
        session.clone()
      ),
      clock
    )
  );
  let board = Rc::new(
    BoardController::new(
      cache, config
    )
  );

  Client {
    auth: AuthClient::new(
      session.clone()
    ),
    session,
    board
  }
}
