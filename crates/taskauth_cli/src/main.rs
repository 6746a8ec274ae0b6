//! `taskauth` command-line driver.
//!
//! # Responsibility
//! - Load configuration from `TASKAUTH_*` variables and open the store.
//! - Call one HTTP-facing handler per invocation and print its response.
//!
//! Exit status is non-zero when the handler answers with status >= 400.

use clap::{Parser, Subcommand};
use log::error;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use taskauth_core::db::open_db;
use taskauth_core::{init_logging, Api, ApiResponse, AppConfig, TaskListQuery};

#[derive(Parser, Debug)]
#[command(name = "taskauth", version, about = "Multi-session auth and owner-scoped tasks")]
struct Cli {
    /// SQLite store path; overrides TASKAUTH_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Session token for protected commands.
    #[arg(long, global = true, env = "TASKAUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and open a session.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        age: Option<f64>,
    },
    /// Open a new session for an existing account.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the session identified by --token.
    Logout,
    /// End every session of the --token owner.
    LogoutAll,
    /// Show the authenticated account.
    Me,
    /// Change profile fields of the authenticated account.
    UpdateMe {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        age: Option<f64>,
    },
    /// Remove the authenticated account and its tasks.
    DeleteMe,
    /// Task commands, always scoped to the --token owner.
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    Add {
        description: String,
    },
    List {
        /// Only completed (true) or open (false) tasks.
        #[arg(long)]
        completed: Option<bool>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    Get {
        id: String,
    },
    /// Mark a task completed (or open again with --undo).
    Done {
        id: String,
        #[arg(long)]
        undo: bool,
    },
    Delete {
        id: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("taskauth: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }

    if let Err(err) = init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("taskauth: {err}");
        return ExitCode::from(2);
    }

    let conn = match open_db(&config.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={err}");
            eprintln!("taskauth: cannot open store `{}`: {err}", config.db_path.display());
            return ExitCode::FAILURE;
        }
    };
    let api = match Api::new(&conn, &config.auth) {
        Ok(api) => api.with_maintenance(config.maintenance),
        Err(err) => {
            eprintln!("taskauth: {err}");
            return ExitCode::from(2);
        }
    };

    let authorization = cli.token.as_deref().map(|token| format!("Bearer {token}"));
    let response = dispatch(&api, authorization.as_deref(), cli.command);
    print_response(&response);

    if response.status >= 400 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn dispatch(api: &Api<'_>, authorization: Option<&str>, command: Command) -> ApiResponse {
    match command {
        Command::Register {
            name,
            email,
            password,
            age,
        } => api.register(&json!({
            "name": name,
            "email": email,
            "password": password,
            "age": age,
        })),
        Command::Login { email, password } => {
            api.login(&json!({ "email": email, "password": password }))
        }
        Command::Logout => api.logout(authorization),
        Command::LogoutAll => api.logout_all(authorization),
        Command::Me => api.profile(authorization),
        Command::UpdateMe {
            name,
            email,
            password,
            age,
        } => {
            let mut patch = Map::new();
            if let Some(name) = name {
                patch.insert("name".to_string(), Value::from(name));
            }
            if let Some(email) = email {
                patch.insert("email".to_string(), Value::from(email));
            }
            if let Some(password) = password {
                patch.insert("password".to_string(), Value::from(password));
            }
            if let Some(age) = age {
                patch.insert("age".to_string(), Value::from(age));
            }
            api.update_profile(authorization, &Value::Object(patch))
        }
        Command::DeleteMe => api.delete_account(authorization),
        Command::Task(TaskCommand::Add { description }) => {
            api.create_task(authorization, &json!({ "description": description }))
        }
        Command::Task(TaskCommand::List {
            completed,
            limit,
            offset,
        }) => api.list_tasks(
            authorization,
            &TaskListQuery {
                completed,
                limit,
                offset,
            },
        ),
        Command::Task(TaskCommand::Get { id }) => api.get_task(authorization, &id),
        Command::Task(TaskCommand::Done { id, undo }) => {
            api.update_task(authorization, &id, &json!({ "completed": !undo }))
        }
        Command::Task(TaskCommand::Delete { id }) => api.delete_task(authorization, &id),
    }
}

fn print_response(response: &ApiResponse) {
    let body = serde_json::to_string_pretty(&response.body)
        .unwrap_or_else(|_| response.body.to_string());
    println!("status={}", response.status);
    println!("{body}");
}
