use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use time::{Date, Duration};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use workpilot::{
    client::{
        filter::local_today, ApiClient, Dashboard, NoticeKind, Session, SessionStore, TaskFilter,
    },
    tasks::{dto::TaskFields, model::Task},
};

#[derive(Parser)]
#[command(name = "workpilot", about = "Manage your WorkPilot tasks from the terminal")]
struct Cli {
    /// Base URL of the WorkPilot API.
    #[arg(long, env = "WORKPILOT_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Where the session (token and cached profile) is kept.
    #[arg(long, env = "WORKPILOT_SESSION")]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "WORKPILOT_PASSWORD")]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "WORKPILOT_PASSWORD")]
        password: String,
    },
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// Change display name or email.
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// List tasks: all, today, week, high, medium, low, pending, completed.
    List {
        #[arg(long, short, default_value = "all")]
        filter: String,
    },
    Stats,
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        /// YYYY-MM-DD, `today` or `tomorrow`.
        #[arg(long, default_value = "today")]
        due: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Edit a task by id or unique id prefix.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Pass an empty string to clear it.
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Toggle completion.
    Done { id: String },
    #[command(alias = "delete")]
    Rm { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let path = cli
        .session
        .or_else(SessionStore::default_path)
        .context("cannot determine a session file location; pass --session")?;
    let store = SessionStore::new(path);
    let mut api = ApiClient::new(cli.api_url);

    match cli.command {
        Command::Register {
            name,
            email,
            password,
        } => {
            let user = api.register(&name, &email, &password).await?;
            println!("Registered {} <{}>. Log in to continue.", user.name, user.email);
        }
        Command::Login { email, password } => {
            let login = api.login(&email, &password).await?;
            let session = Session::new(login.token, &login.user);
            store.save(&session)?;
            println!("Logged in as {} <{}>", session.user.name, session.user.email);
        }
        Command::Logout => {
            store.clear()?;
            println!("Logged out");
        }
        command => {
            let session = store
                .restore(&mut api)
                .await?
                .context("not logged in; run `workpilot login` first")?;
            run_authenticated(command, &api, &store, session).await?;
        }
    }
    Ok(())
}

async fn run_authenticated(
    command: Command,
    api: &ApiClient,
    store: &SessionStore,
    mut session: Session,
) -> anyhow::Result<()> {
    let today = local_today();
    let mut dashboard = Dashboard::new();

    match command {
        Command::Whoami => {
            println!("{} <{}>", session.user.name, session.user.email);
            println!("id:     {}", session.user_id);
            println!("avatar: {}", session.user.avatar);
        }
        Command::Profile { name, email } => {
            if name.is_none() && email.is_none() {
                bail!("nothing to change; pass --name and/or --email");
            }
            let user = api.update_profile(name.as_deref(), email.as_deref()).await?;
            session = Session::new(session.token, &user);
            store.save(&session)?;
            println!("Profile updated: {} <{}>", session.user.name, session.user.email);
        }
        Command::Password { current, new } => {
            api.change_password(&current, &new).await?;
            println!("Password updated");
        }
        Command::List { filter } => {
            dashboard.set_filter(TaskFilter::from_key(&filter));
            if dashboard.refresh(api).await {
                print_tasks(&dashboard, today);
            }
        }
        Command::Stats => {
            if dashboard.refresh(api).await {
                let s = dashboard.stats();
                println!("Total Tasks      {}", s.total);
                println!("Completed        {}", s.completed);
                println!("High Priority    {}", s.high_priority);
                println!("Medium Priority  {}", s.medium_priority);
                println!("Low Priority     {}", s.low_priority);
            }
        }
        Command::Add {
            title,
            priority,
            due,
            description,
        } => {
            let fields = TaskFields {
                title: Some(title),
                description: description.map(Some),
                priority: Some(priority),
                due_date: Some(due_date_arg(&due, today)?),
                completed: None,
            };
            dashboard.open_create();
            dashboard.save(api, fields).await;
        }
        Command::Edit {
            id,
            title,
            priority,
            due,
            description,
            completed,
        } => {
            let id = resolve(&mut dashboard, api, &id).await?;
            let fields = TaskFields {
                title,
                description: description.map(Some),
                priority,
                due_date: due.map(|d| due_date_arg(&d, today)).transpose()?,
                completed,
            };
            if !dashboard.open_edit(id) {
                bail!("no task with id {id}");
            }
            dashboard.save(api, fields).await;
        }
        Command::Done { id } => {
            let id = resolve(&mut dashboard, api, &id).await?;
            dashboard.toggle(api, id).await;
        }
        Command::Rm { id } => {
            let id = resolve(&mut dashboard, api, &id).await?;
            dashboard.delete(api, id).await;
        }
        Command::Register { .. } | Command::Login { .. } | Command::Logout => {
            unreachable!("handled before the session is restored")
        }
    }

    let mut failed = false;
    for notice in dashboard.take_notices() {
        match notice.kind {
            NoticeKind::Success => println!("{}", notice.message),
            NoticeKind::Error => {
                failed = true;
                eprintln!("error: {}", notice.message);
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Loads the list and resolves a full id or unique id prefix against it.
async fn resolve(dashboard: &mut Dashboard, api: &ApiClient, raw: &str) -> anyhow::Result<Uuid> {
    if !dashboard.refresh(api).await {
        let reasons: Vec<_> = dashboard
            .take_notices()
            .into_iter()
            .map(|n| n.message)
            .collect();
        bail!("{}", reasons.join("; "));
    }
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }
    dashboard
        .find_by_prefix(raw)
        .with_context(|| format!("no single task id starts with '{raw}'"))
}

fn due_date_arg(raw: &str, today: Date) -> anyhow::Result<String> {
    let date = match raw.trim().to_ascii_lowercase().as_str() {
        "today" => today,
        "tomorrow" => today.saturating_add(Duration::days(1)),
        _ => return Ok(raw.trim().to_string()),
    };
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Ok(date.format(format)?)
}

fn print_tasks(dashboard: &Dashboard, today: Date) {
    let filter = dashboard.filter();
    let visible = dashboard.visible(today);
    println!("{} ({})", filter.label(), visible.len());
    if visible.is_empty() {
        if filter == TaskFilter::All {
            println!("  No tasks found. Create your first task to get started.");
        } else {
            println!("  No tasks match this filter.");
        }
        return;
    }
    for task in visible {
        println!("  {}", task_line(task));
    }
}

fn task_line(task: &Task) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let id = task.id.to_string();
    let mut line = format!(
        "{check} {}  {:<6}  {}  {}",
        &id[..8],
        task.priority,
        task.due_date,
        task.title
    );
    if let Some(desc) = &task.description {
        line.push_str(&format!(" - {desc}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn unreachable_api() -> ApiClient {
        let mut api = ApiClient::new("http://127.0.0.1:9");
        api.set_token(Some("token".into()));
        api
    }

    #[tokio::test]
    async fn resolve_reports_load_failure_for_full_ids() {
        let mut dashboard = Dashboard::new();
        let id = Uuid::new_v4().to_string();
        let err = resolve(&mut dashboard, &unreachable_api(), &id)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Could not load tasks"), "{err}");
        assert!(dashboard.take_notices().is_empty());
    }

    #[tokio::test]
    async fn resolve_reports_load_failure_for_prefixes() {
        let mut dashboard = Dashboard::new();
        let err = resolve(&mut dashboard, &unreachable_api(), "ab12")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Could not load tasks"), "{err}");
    }

    #[test]
    fn due_date_keywords() {
        let today = date!(2026 - 10 - 18);
        assert_eq!(due_date_arg("today", today).unwrap(), "2026-10-18");
        assert_eq!(due_date_arg(" Tomorrow ", today).unwrap(), "2026-10-19");
        assert_eq!(due_date_arg("2026-12-01", today).unwrap(), "2026-12-01");
    }
}
