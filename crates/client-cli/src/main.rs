use anyhow::Result;
use clap::{Parser, Subcommand};
use coursedesk::actions::{Actions, GradeEntry};
use coursedesk::auth::{self, RegisterForm};
use coursedesk::config::Config;
use coursedesk::{
    bootstrap, views, BootstrapOutcome, Bootstrapper, FileSessionStore, HttpApi, Session, SessionStore,
};
use shared::Role;
use std::io::BufRead;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "coursedesk")]
#[command(about = "Course manager client - dashboards, enrollment and grading from the terminal")]
#[command(version)]
struct Cli {
    /// API base URL (overrides config)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and cache the session
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        username: String,
        #[arg(long, value_parser = parse_role)]
        role: Role,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
        /// Defaults to the password
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Clear the cached session
    Logout,
    /// Show current login status
    Whoami,
    /// Show the dashboard for a role
    Dashboard {
        /// Defaults to the role of the signed-in user
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },
    /// List courses visible to a role
    Courses {
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },
    /// Create a course (instructor)
    CreateCourse { name: String, description: String },
    /// Enroll in a course (student)
    Enroll { course_id: u64 },
    /// Show grades visible to a role
    Grades {
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },
    /// List enrolled students still waiting for a grade (instructor)
    Pending,
    /// Grade students (instructor), entries as ENROLLMENT=SCORE[:COMMENT]
    Grade {
        #[arg(required = true)]
        entries: Vec<GradeEntry>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (api.base_url, api.timeout_secs)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursedesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Config { action } = cli.command {
        return handle_config_command(action);
    }

    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config.api.base_url = server;
    }
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::default_location()?);
    let api = HttpApi::new(&config.api, store.clone())?;
    let store = store.as_ref();

    match cli.command {
        Commands::Login { username, password } => {
            let password = password.map_or_else(|| read_secret("Password"), Ok)?;
            let user = auth::login(&api, store, &username, &password).await?;
            println!("\x1b[1;32m✅ Login successful!\x1b[0m");
            println!("Welcome back, {} ({})", user.username, user.role);
        }
        Commands::Register { username, role, password, confirm_password } => {
            let password = password.map_or_else(|| read_secret("Password"), Ok)?;
            let form = RegisterForm {
                username,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                role,
            };
            auth::register(&api, &form).await?;
            println!("\x1b[32m✅ Registered. Run '\x1b[1mcoursedesk login {}\x1b[0m\x1b[32m' to sign in.\x1b[0m", form.username);
        }
        Commands::Logout => {
            auth::logout(store)?;
            println!("\x1b[32m✅ Logged out successfully\x1b[0m");
        }
        Commands::Whoami => match auth::whoami(store)? {
            Some(user) => {
                println!("\x1b[32m✓ Logged in\x1b[0m as {} ({})", user.username, user.role);
                println!("Server: {}", config.api.base_url);
            }
            None => print_login_hint("Not logged in."),
        },
        Commands::Dashboard { role } => {
            let Some(session) = open_session(&api, store, role).await? else {
                return Ok(());
            };
            print!("{}", views::when_ready(&session, views::dashboard));
        }
        Commands::Courses { role } => {
            let Some(session) = open_session(&api, store, role).await? else {
                return Ok(());
            };
            print!("{}", views::when_ready(&session, views::course_list));
        }
        Commands::Grades { role } => {
            let Some(session) = open_session(&api, store, role).await? else {
                return Ok(());
            };
            print!("{}", views::when_ready(&session, views::grade_table));
        }
        Commands::Pending => {
            let Some(session) = open_session(&api, store, Some(Role::Instructor)).await? else {
                return Ok(());
            };
            print!("{}", views::when_ready(&session, views::pending_grades));
        }
        Commands::CreateCourse { name, description } => {
            let Some(mut session) = open_session(&api, store, Some(Role::Instructor)).await? else {
                return Ok(());
            };
            if let Some(state) = session.state_mut() {
                let course = Actions::new(&api, store)
                    .create_course(state, &name, &description)
                    .await?;
                println!("\x1b[32m✅ Created course {} ({})\x1b[0m", course.name, course.id);
            }
        }
        Commands::Enroll { course_id } => {
            let Some(mut session) = open_session(&api, store, Some(Role::Student)).await? else {
                return Ok(());
            };
            if let Some(state) = session.state_mut() {
                Actions::new(&api, store).enroll(state, course_id).await?;
                println!("\x1b[32m✅ Enrolled successfully!\x1b[0m");
            }
        }
        Commands::Grade { entries } => {
            let Some(mut session) = open_session(&api, store, Some(Role::Instructor)).await? else {
                return Ok(());
            };
            if let Some(state) = session.state_mut() {
                let report = Actions::new(&api, store).submit_grades(state, entries).await?;
                for (enrollment, error) in &report.failed {
                    eprintln!("\x1b[31mFailed to create grade for enrollment {}: {}\x1b[0m", enrollment, error);
                }
                if !report.created.is_empty() {
                    println!("\x1b[32m✅ {} grade(s) created\x1b[0m", report.created.len());
                }
                if !report.all_succeeded() {
                    anyhow::bail!("{} grade(s) were not saved", report.failed.len());
                }
            }
        }
        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Bootstrap the protected area for `role`, or for the signed-in user's own
/// role when none is given; `None` means the user was sent back to login.
async fn open_session(api: &HttpApi, store: &dyn SessionStore, role: Option<Role>) -> Result<Option<Session>> {
    if role.is_none() && store.load()?.is_empty() {
        print_login_hint("Not logged in.");
        return Ok(None);
    }

    eprintln!("\x1b[90m{}\x1b[0m", views::LOADING);
    let outcome = match role {
        Some(role) => bootstrap(api, store, role).await,
        None => Bootstrapper::for_own_role(api, store).run().await,
    };
    match outcome {
        BootstrapOutcome::Ready(state) => Ok(Some(Session::ready(state))),
        BootstrapOutcome::Redirect(reason) => {
            print_login_hint(&format!("Error: {}", reason));
            Ok(None)
        }
    }
}

fn print_login_hint(message: &str) {
    eprintln!("\x1b[33m🔐 {}\x1b[0m", message);
    eprintln!("   Run '\x1b[1mcoursedesk login <username>\x1b[0m' to authenticate.");
}

fn read_secret(prompt: &str) -> Result<String> {
    eprint!("{}: ", prompt);
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from_path(&Config::config_path()?)?;
            config.set(&key, value)?;
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("api.base_url: {}", config.api.base_url);
            println!("api.timeout_secs: {}", config.api.timeout_secs);
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
