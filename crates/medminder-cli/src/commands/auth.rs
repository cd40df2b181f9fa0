use clap::Subcommand;
use medminder_core::{AuthState, AuthViewModel};

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        /// Password (falls back to MEDMINDER_PASSWORD)
        #[arg(long, env = "MEDMINDER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MEDMINDER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the current session and which screen it leads to
    Status {
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: AuthAction) -> CliResult {
    let ctx = Context::open()?;
    let mut vm = AuthViewModel::new(ctx.backend.clone(), ctx.prefs());

    match action {
        AuthAction::Login { email, password } => {
            let state = vm.sign_in(&email, &password).await.clone();
            ctx.persist_token();
            report(&state)?;
        }
        AuthAction::Signup { email, password } => {
            let state = vm.sign_up(&email, &password).await.clone();
            ctx.persist_token();
            report(&state)?;
        }
        AuthAction::Logout => {
            vm.sign_out().await;
            ctx.persist_token();
            println!("signed out");
        }
        AuthAction::Status { json } => {
            let state = vm.check_session().await.clone();
            if json {
                let out = serde_json::json!({ "state": state, "screen": state.screen() });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                match &state {
                    AuthState::Success(user) => println!("signed in as {} ({})", user.email, user.id),
                    AuthState::Error(msg) => println!("{msg}"),
                    other => println!("{other:?}"),
                }
                println!("screen: {:?}", state.screen());
            }
        }
    }
    Ok(())
}

fn report(state: &AuthState) -> CliResult {
    match state {
        AuthState::Success(user) => {
            println!("signed in as {} ({})", user.email, user.id);
            Ok(())
        }
        AuthState::Error(msg) => Err(msg.clone().into()),
        other => Err(format!("unexpected auth state: {other:?}").into()),
    }
}
