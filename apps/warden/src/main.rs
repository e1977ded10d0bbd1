use anyhow::Result;
use clap::{Parser, Subcommand};

use warden_core::proto::{
    BackupInterval, BackupSettings, CommandDelivery, Reply, Request, RequesterId, TimeOfDay,
};

mod client;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Admin client for the wardend game-server daemon", long_about = None)]
struct Cli {
    /// Identity to make requests as (defaults to WARDEN_REQUESTER_ID or the
    /// admin id from the daemon config)
    #[arg(long, value_name = "ID", global = true)]
    requester: Option<RequesterId>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the daemon is alive
    Ping,
    /// Show whether the game server is running
    Status,
    /// Host and server report
    Info,
    /// Tail the server logs
    Logs {
        #[arg(short = 'n', long = "lines", default_value_t = 50)]
        lines: usize,
    },
    /// Start the game server
    Start,
    /// Stop the game server (warns players first)
    Stop,
    /// Restart the game server (warns players first)
    Restart,
    /// Manage the player allow-list
    Allowlist {
        #[command(subcommand)]
        command: AllowlistCommands,
    },
    /// Relay one raw command line to the server console
    Exec { command: String },
    /// Broadcast a chat message to players
    Say { text: String },
    /// World backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Stop the daemon itself
    Shutdown,
}

#[derive(Subcommand)]
enum AllowlistCommands {
    /// List entries
    Show,
    /// Add a player by name
    Add { name: String },
    /// Remove a player by name
    Remove { name: String },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Run a backup right now
    Now,
    /// Show the current schedule
    Settings,
    /// Change the schedule; unspecified options keep their current value
    Configure {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        /// 15min, 30min, hourly, daily or weekly
        #[arg(long)]
        interval: Option<String>,
        /// HH:MM, used by daily and weekly schedules
        #[arg(long)]
        time: Option<String>,
        /// How many backups to keep on disk (1-50)
        #[arg(long)]
        keep: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let requester = client::resolve_requester(cli.requester)?;

    let request = match &cli.command {
        Commands::Ping => Request::Ping {},
        Commands::Status => Request::ServerStatus {},
        Commands::Info => Request::ServerInfo {},
        Commands::Logs { lines } => Request::TailLogs { lines: *lines },
        Commands::Start => Request::StartServer {},
        Commands::Stop => Request::StopServer {},
        Commands::Restart => Request::RestartServer {},
        Commands::Allowlist { command } => match command {
            AllowlistCommands::Show => Request::ShowAllowList {},
            AllowlistCommands::Add { name } => Request::AddPlayer { name: name.clone() },
            AllowlistCommands::Remove { name } => Request::RemovePlayer { name: name.clone() },
        },
        Commands::Exec { command } => Request::Exec {
            command: command.clone(),
        },
        Commands::Say { text } => Request::Say { text: text.clone() },
        Commands::Backup { command } => match command {
            BackupCommands::Now => Request::BackupNow {},
            BackupCommands::Settings => Request::GetBackupSettings {},
            BackupCommands::Configure {
                enable,
                disable,
                interval,
                time,
                keep,
            } => {
                let settings =
                    configured_settings(requester, *enable, *disable, interval, time, keep).await?;
                Request::ConfigureBackups { settings }
            }
        },
        Commands::Shutdown => Request::Shutdown {},
    };

    let reply = client::roundtrip(requester, request).await?;
    render(reply);
    Ok(())
}

/// Start from the daemon's current settings so one flag can be changed
/// without restating the rest.
async fn configured_settings(
    requester: RequesterId,
    enable: bool,
    disable: bool,
    interval: &Option<String>,
    time: &Option<String>,
    keep: &Option<u32>,
) -> Result<BackupSettings> {
    let mut settings = match client::roundtrip(requester, Request::GetBackupSettings {}).await? {
        Reply::BackupSchedule { settings, .. } => settings,
        Reply::Error(err) => anyhow::bail!("{}", err.message),
        other => anyhow::bail!("unexpected reply: {other:?}"),
    };

    if enable {
        settings.enabled = true;
    }
    if disable {
        settings.enabled = false;
    }
    if let Some(interval) = interval {
        settings.interval = parse_interval(interval)?;
    }
    if let Some(time) = time {
        settings.time = time.parse::<TimeOfDay>().map_err(anyhow::Error::msg)?;
    }
    if let Some(keep) = keep {
        settings.keep_count = *keep;
    }
    Ok(settings)
}

fn parse_interval(value: &str) -> Result<BackupInterval> {
    match value {
        "15min" => Ok(BackupInterval::Every15Min),
        "30min" => Ok(BackupInterval::Every30Min),
        "hourly" => Ok(BackupInterval::Hourly),
        "daily" => Ok(BackupInterval::Daily),
        "weekly" => Ok(BackupInterval::Weekly),
        other => anyhow::bail!("unknown interval '{other}' (use 15min, 30min, hourly, daily or weekly)"),
    }
}

fn render(reply: Reply) {
    match reply {
        Reply::Pong {
            daemon_version,
            uptime_ms,
        } => println!("wardend {daemon_version}, up {}s", uptime_ms / 1000),
        Reply::ShutdownAck {} => println!("wardend is shutting down"),
        Reply::Status { health } => println!("server: {health}"),
        Reply::Info { report } => println!("{report}"),
        Reply::Started {} => println!("server start requested"),
        Reply::Stopped {} => println!("server stopped"),
        Reply::Restarted {} => println!("server restarted"),
        Reply::Logs { text } => println!("{text}"),
        Reply::AllowList { entries } => {
            if entries.is_empty() {
                println!("allow-list is empty");
                return;
            }
            println!("allow-list ({} players):", entries.len());
            for entry in entries {
                if entry.uuid.is_empty() {
                    println!("  {}", entry.name);
                } else {
                    println!("  {} ({})", entry.name, entry.uuid);
                }
            }
        }
        Reply::PlayerAdded { name, delivery } => {
            println!("'{name}' added to the allow-list");
            render_delivery(&delivery);
        }
        Reply::PlayerRemoved { name, delivery } => {
            println!("'{name}' removed from the allow-list");
            render_delivery(&delivery);
        }
        Reply::CommandSent { delivery } => render_delivery(&delivery),
        Reply::BackupFinished { outcome } => {
            println!("{}", outcome.message);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Reply::BackupSchedule {
            settings,
            next_fire,
        } => {
            println!(
                "scheduled backups: {}",
                if settings.enabled { "enabled" } else { "disabled" }
            );
            if settings.enabled {
                println!("  interval: {}", settings.interval);
                if settings.interval.aligned_minutes().is_none() {
                    println!("  time: {}", settings.time);
                }
            }
            println!("  keep: {} backups", settings.keep_count);
            if let Some(at) = next_fire {
                println!("  next backup: {at}");
            }
        }
        Reply::Error(err) => {
            eprintln!("error: {}", err.message);
            std::process::exit(1);
        }
    }
}

fn render_delivery(delivery: &CommandDelivery) {
    match delivery {
        CommandDelivery::Executed { response } => {
            if response.trim().is_empty() {
                println!("command executed on the server");
            } else {
                println!("server: {}", response.trim());
            }
        }
        CommandDelivery::Recorded {} => {
            println!("command recorded locally only (RCON is not available)");
        }
    }
}
