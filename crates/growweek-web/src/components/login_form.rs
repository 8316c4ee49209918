use web_sys::{
  HtmlInputElement,
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

#[derive(Clone, PartialEq)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
  pub name:     String
}

#[derive(Properties, PartialEq)]
pub struct LoginFormProps {
  /// Shows the name field and
  /// submits as a sign-up.
  pub register:  bool,
  pub busy:      bool,
  pub error:     Option<String>,
  pub on_submit: Callback<Credentials>
}

#[function_component(LoginForm)]
pub fn login_form(
  props: &LoginFormProps
) -> Html {
  let email = use_state(String::new);
  let password = use_state(String::new);
  let name = use_state(String::new);

  let bind = |handle: &yew::UseStateHandle<String>| {
    let handle = handle.clone();
    Callback::from(
      move |event: yew::InputEvent| {
        let input: HtmlInputElement =
          event.target_unchecked_into();
        handle.set(input.value());
      }
    )
  };

  let onsubmit = {
    let (email, password, name) = (
      email.clone(),
      password.clone(),
      name.clone()
    );
    let on_submit =
      props.on_submit.clone();
    Callback::from(
      move |event: SubmitEvent| {
        event.prevent_default();
        on_submit.emit(Credentials {
          email:    (*email).clone(),
          password: (*password).clone(),
          name:     (*name).clone()
        });
      }
    )
  };

  let (heading, action, other, other_label) =
    if props.register {
      (
        "Create account",
        "Sign up",
        "/login",
        "Already registered? Sign in"
      )
    } else {
      (
        "Sign in",
        "Sign in",
        "/register",
        "No account yet? Sign up"
      )
    };

  html! {
      <div class="auth-page">
          <form class="panel auth-form" {onsubmit}>
              <div class="header">{ heading }</div>
              if let Some(message) = props.error.clone() {
                  <div class="modal-error">{ message }</div>
              }
              if props.register {
                  <label>
                      { "Name" }
                      <input type="text" value={(*name).clone()} oninput={bind(&name)} />
                  </label>
              }
              <label>
                  { "Email" }
                  <input type="email" value={(*email).clone()} oninput={bind(&email)} />
              </label>
              <label>
                  { "Password" }
                  <input type="password" value={(*password).clone()} oninput={bind(&password)} />
              </label>
              <button type="submit" disabled={props.busy}>{ action }</button>
              <a href={other}>{ other_label }</a>
          </form>
      </div>
  }
}
