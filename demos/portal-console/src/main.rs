use std::sync::atomic::{AtomicU64, Ordering};

use farmgate::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

// ---------------------------------------------------------------------------
// Console commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login { username: String, password: String },
    Logout,
    Delete,
    Check,
    Status,
    Help,
    Quit,
    /// Anything else is fed to the guard as a DOM event name.
    Event(String),
}

fn parse(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    let command = match first {
        "login" => {
            let username = words.next()?.to_string();
            let password = words.next()?.to_string();
            Command::Login { username, password }
        }
        "logout" => Command::Logout,
        "delete" => Command::Delete,
        "check" => Command::Check,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Event(other.to_string()),
    };
    Some(command)
}

const HELP: &str = "\
commands:
  login <user> <password>   log in (demo backend: any user, password 'farm')
  logout                    log out
  delete                    delete the account
  check                     revalidate now
  status                    show the session
  quit                      tear down and exit
  <event>                   user activity: keydown, scroll, wheel, mousedown, touchstart...";

// ---------------------------------------------------------------------------
// Demo backend and console presenter
// ---------------------------------------------------------------------------

/// Accepts any user whose password is `farm`.
struct DemoBackend {
    issued: AtomicU64,
}

impl AuthBackend for DemoBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, SessionError> {
        if credentials.password != "farm" {
            return Err(SessionError::AuthFailed("wrong password".into()));
        }
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(LoginGrant::new(format!("demo-{}-{n}", credentials.username))
            .with_user_id(credentials.username.clone()))
    }

    async fn check_session(&self, token: &str) -> Result<bool, SessionError> {
        Ok(token.starts_with("demo-"))
    }

    async fn delete_account(&self, _token: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    async fn show_notice(&self, notice: &Notice) {
        println!();
        println!("==== {} ====", notice.title);
        println!("{}", notice.message);
        println!();
    }

    fn redirect_to_login(&self) {
        println!("-> login view");
    }
}

fn describe(session: &Session) -> String {
    match (&session.user_id, session.expires_at_ms) {
        (Some(user), Some(expires)) if session.is_authenticated => {
            format!("{} as {user} (token expires at {expires} ms)", session.state)
        }
        _ => session.state.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    farmgate::telemetry::init("info");

    // Optional first argument: a GuardConfig JSON file.
    let mut config = match std::env::args().nth(1) {
        Some(path) => GuardConfig::from_json_file(path)?,
        None => GuardConfig::default(),
    };
    let storage_path = config
        .storage_path
        .get_or_insert_with(|| "portal-session.json".into())
        .clone();

    let builder = Farmgate::builder().config(config.clone());
    let guard = if config.backend.is_some() {
        builder.start_http(ConsolePresenter)?
    } else {
        eprintln!("no backend configured, using the demo backend");
        builder.start(
            FileStorage::open(&storage_path)?,
            DemoBackend {
                issued: AtomicU64::new(0),
            },
            ConsolePresenter,
        )?
    };
    eprintln!("session file: {}", storage_path.display());
    eprintln!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse(&line) else {
            continue;
        };
        match run(&guard, command).await {
            Ok(()) => {}
            Err(RunError::Quit) => break,
            Err(RunError::Failed(e)) => eprintln!("error: {e}"),
        }
    }

    guard.teardown().await?;
    Ok(())
}

enum RunError {
    Quit,
    Failed(FarmgateError),
}

impl From<FarmgateError> for RunError {
    fn from(err: FarmgateError) -> Self {
        Self::Failed(err)
    }
}

async fn run(guard: &GuardHandle, command: Command) -> Result<(), RunError> {
    match command {
        Command::Login { username, password } => {
            let session = guard.login(Credentials::new(username, password)).await?;
            println!("logged in: {}", describe(&session));
        }
        Command::Logout => {
            println!("{:?}", guard.logout().await?);
        }
        Command::Delete => {
            println!("{:?}", guard.delete_account().await?);
        }
        Command::Check => {
            println!("{:?}", guard.check_now().await?);
        }
        Command::Status => println!("{}", describe(&guard.snapshot())),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Err(RunError::Quit),
        Command::Event(name) => {
            if !guard.activity_event(&name)? {
                println!("'{name}' is not user activity (try 'help')");
            }
        }
    }
    Ok(())
}
