// crates/xornet-client/src/main.rs

mod app;
mod components;
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{fs::OpenOptions, io, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use xornet_client::{
    ClientConfig, FileTokenHolder, LogBridge, SignupForm, SyncStatus, WsConnector, XornetClient,
};
use xornet_core::{EntityId, StoreEvent};

use crate::app::App;

#[derive(Parser)]
#[clap(name = "xornet")]
#[clap(about = "Live dashboard for machines reporting to Xornet")]
struct Cli {
    /// TOML config file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config and XORNET_BASE_URL)
    #[clap(short, long)]
    base_url: Option<String>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Log file for the dashboard
    #[clap(long, default_value = "xornet.log")]
    log_file: PathBuf,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the token
    Login {
        #[clap(short, long)]
        username: String,
        #[clap(short, long)]
        password: String,
    },
    /// Create an account and store the token
    Signup {
        #[clap(short, long)]
        username: String,
        #[clap(short, long)]
        password: String,
        #[clap(short, long)]
        email: String,
    },
    /// Forget the stored token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Set the avatar URL of the logged-in user
    Avatar { url: String },
    /// Show one machine
    Machine { uuid: String },
    /// Log live telemetry to stderr instead of drawing the dashboard
    Watch,
    /// Terminal dashboard (default)
    Dashboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Dashboard);
    let dashboard = matches!(command, Command::Dashboard);

    // Setup logging
    init_tracing(cli.debug, dashboard.then_some(cli.log_file.as_path()))?;

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let token = Arc::new(FileTokenHolder::open(&config.token_path)?);
    let client = XornetClient::new(config, token, Arc::new(WsConnector), Arc::new(LogBridge))?;

    let res = match command {
        Command::Login { username, password } => client
            .login(&username, &password)
            .await
            .map(|user| println!("Logged in as {}", user.username))
            .context("login failed"),
        Command::Signup { username, password, email } => client
            .signup(&SignupForm { username, password, email })
            .await
            .map(|user| println!("Signed up as {}", user.username))
            .context("signup failed"),
        Command::Logout => client.logout().map_err(anyhow::Error::from),
        Command::Whoami => whoami(&client).await,
        Command::Avatar { url } => set_avatar(&client, &url).await,
        Command::Machine { uuid } => show_machine(&client, &uuid).await,
        Command::Watch => run_watch(&client).await,
        Command::Dashboard => run_dashboard(&client).await,
    };

    client.shutdown().await;
    res
}

fn init_tracing(debug: bool, log_file: Option<&std::path::Path>) -> Result<()> {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    match log_file {
        // The terminal belongs to the dashboard; only log when asked to.
        Some(path) if debug => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        Some(_) => {}
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn whoami(client: &XornetClient) -> Result<()> {
    let me = client.users().fetch_me().await.context("not logged in?")?;
    println!("{}", serde_json::to_string_pretty(&me)?);
    Ok(())
}

async fn set_avatar(client: &XornetClient, url: &str) -> Result<()> {
    client.users().fetch_me().await.context("not logged in?")?;
    match client.users().update_avatar(url).await? {
        Some(user) => println!("Avatar of {} set to {}", user.username, url),
        None => bail!("not logged in"),
    }
    Ok(())
}

async fn show_machine(client: &XornetClient, uuid: &str) -> Result<()> {
    let machine = client.ensure_machine(&EntityId::from(uuid)).await?;
    println!("{}", serde_json::to_string_pretty(&machine)?);
    Ok(())
}

async fn run_watch(client: &XornetClient) -> Result<()> {
    if !client.is_logged_in() {
        warn!("No token stored; the backend will not send telemetry until you log in");
    }

    let mut changes = client.machines().subscribe();
    let mut status = client.sync().subscribe();
    client.start_sync();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let s: SyncStatus = status.borrow_and_update().clone();
                info!(state = %s.state, session = %s.generation, reconnects = s.reconnects, "Connection");
            }
            event = changes.recv() => match event {
                Ok(StoreEvent::Upserted(id)) => {
                    if let Some(machine) = client.machines().get(&id) {
                        let data = machine.dynamic_data.as_ref();
                        info!(
                            machine = machine.display_name(),
                            cpu = ?data.and_then(|d| d.cau),
                            ram = ?data.and_then(|d| d.ram.as_ref()).and_then(|r| r.usage_percent()),
                            download = ?data.and_then(|d| d.td),
                            upload = ?data.and_then(|d| d.tu),
                            "Telemetry"
                        );
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("Skipped {} store notifications", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

async fn run_dashboard(client: &XornetClient) -> Result<()> {
    if !client.is_logged_in() {
        bail!("no token stored, run `xornet login` first");
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, client).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, client: &XornetClient) -> Result<()> {
    let mut app = App::new();

    if let Err(e) = client.users().fetch_me().await {
        app.status_message = Some(format!("Could not load profile: {}", e));
    }
    client.start_sync();

    loop {
        app.me = client.users().me();
        app.refresh(client.machines().get_all(), client.sync().status());

        terminal.draw(|f| ui::draw(f, &app))?;

        // Handle events with timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                        app.should_quit = true;
                    }
                    KeyCode::Up | KeyCode::Char('k') => app.move_selection_up(),
                    KeyCode::Down | KeyCode::Char('j') => app.move_selection_down(),
                    KeyCode::Char('s') | KeyCode::Char('S') => app.cycle_sort(),
                    KeyCode::Char('d') | KeyCode::Char('D') => app.toggle_details(),
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        client.start_sync();
                        app.status_message = Some("Connect requested".to_string());
                    }
                    KeyCode::Char('l') | KeyCode::Char('L') => {
                        client.logout()?;
                        app.should_quit = true;
                    }
                    KeyCode::F(1) => app.toggle_help(),
                    _ => {}
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
