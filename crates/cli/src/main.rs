// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod client;
mod error;

use clap::{Parser, Subcommand};
use client::DaemonClient;
use foreman_core::WorkerId;
use foreman_wire::{PatchRequest, Request, Response, SettingsRequest, SpawnFromTemplateRequest, SpawnRequest};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "foreman",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")"),
    about = "Control the foreman worker orchestrator daemon"
)]
struct Cli {
    /// Override the daemon's Unix socket path (defaults to $FOREMAN_STATE_DIR/foremand.sock)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new worker
    Spawn {
        label: String,
        project: String,
        command: String,
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
        #[arg(long)]
        cwd: Option<String>,
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        ralph_mode: bool,
        #[arg(long)]
        allow_duplicate: bool,
        #[arg(long)]
        auto_accept: Option<bool>,
    },
    /// List the fixed spawn-from-template catalog
    Templates,
    /// Spawn a worker from a named template
    SpawnFromTemplate { template: String, label: String, project: String, task: String },
    /// Show one worker
    Get { worker_id: String },
    /// List workers, optionally filtered by project
    List {
        #[arg(long)]
        project: Option<String>,
    },
    /// Rename a worker's label
    Patch { worker_id: String, label: String },
    /// Send raw input to a worker's stdin
    SendInput { worker_id: String, input: String },
    /// Toggle a worker's auto-accept settings
    Settings {
        worker_id: String,
        #[arg(long)]
        auto_accept: Option<bool>,
        #[arg(long)]
        auto_accept_paused: Option<bool>,
    },
    /// Mark a running worker awaiting_review
    Complete { worker_id: String },
    /// Signal completion for a ralph-mode worker with its token
    RalphSignal { worker_id: String, ralph_token: String },
    /// Dismiss a worker that's awaiting_review
    Dismiss { worker_id: String },
    /// Kill a worker's session
    Kill {
        worker_id: String,
        #[arg(long)]
        force: bool,
    },
    /// List a worker's children
    Children { worker_id: String },
    /// List a worker's siblings
    Siblings { worker_id: String },
    /// List a worker's transitive dependencies
    Dependencies { worker_id: String },
    /// Print the live in-memory output tail
    Tail { worker_id: String },
    /// Page through a worker's durable output history
    History {
        worker_id: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 4096)]
        limit: usize,
    },
    /// List known checkpoints
    ListCheckpoints,
    /// Check daemon liveness
    Health,
    /// Stream live events
    Watch {
        #[arg(long)]
        project: Option<String>,
        /// Resume a single worker's output stream from this sequence number
        #[arg(long)]
        worker_id: Option<String>,
        #[arg(long)]
        since_seq: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let socket_path = cli.socket.unwrap_or_else(client::default_socket_path);
    let mut client = DaemonClient::connect(&socket_path).await?;

    match cli.command {
        Command::Spawn { label, project, command, args, cwd, depends_on, parent, ralph_mode, allow_duplicate, auto_accept } => {
            let request = Request::Spawn(SpawnRequest {
                label,
                project,
                command,
                args,
                cwd,
                depends_on: depends_on.into_iter().map(WorkerId::new).collect(),
                parent_worker_id: parent.map(WorkerId::new),
                ralph_mode,
                initial_input: None,
                allow_duplicate,
                auto_accept,
                task: None,
            });
            print_worker(client.send(&request).await?)?;
        }
        Command::Templates => match client.send(&Request::Templates).await? {
            Response::Templates(templates) => println!("{}", serde_json::to_string_pretty(&templates)?),
            other => DaemonClient::reject(other)?,
        },
        Command::SpawnFromTemplate { template, label, project, task } => {
            let request = Request::SpawnFromTemplate(SpawnFromTemplateRequest { template, label, project, task });
            print_worker(client.send(&request).await?)?;
        }
        Command::Get { worker_id } => {
            print_worker(client.send(&Request::Get { worker_id: WorkerId::new(worker_id) }).await?)?;
        }
        Command::List { project } => {
            print_workers(client.send(&Request::List { project }).await?)?;
        }
        Command::Patch { worker_id, label } => {
            let request = Request::Patch(PatchRequest { worker_id: WorkerId::new(worker_id), label: Some(label) });
            print_worker(client.send(&request).await?)?;
        }
        Command::SendInput { worker_id, input } => {
            let request = Request::SendInput { worker_id: WorkerId::new(worker_id), input: input.into_bytes() };
            client.send_simple(&request).await?;
        }
        Command::Settings { worker_id, auto_accept, auto_accept_paused } => {
            let request = Request::Settings(SettingsRequest { worker_id: WorkerId::new(worker_id), auto_accept, auto_accept_paused });
            print_worker(client.send(&request).await?)?;
        }
        Command::Complete { worker_id } => {
            print_worker(client.send(&Request::Complete { worker_id: WorkerId::new(worker_id) }).await?)?;
        }
        Command::RalphSignal { worker_id, ralph_token } => {
            let request = Request::RalphSignal { worker_id: WorkerId::new(worker_id), ralph_token };
            print_worker(client.send(&request).await?)?;
        }
        Command::Dismiss { worker_id } => {
            print_worker(client.send(&Request::Dismiss { worker_id: WorkerId::new(worker_id) }).await?)?;
        }
        Command::Kill { worker_id, force } => {
            print_worker(client.send(&Request::Kill { worker_id: WorkerId::new(worker_id), force }).await?)?;
        }
        Command::Children { worker_id } => {
            print_workers(client.send(&Request::Children { worker_id: WorkerId::new(worker_id) }).await?)?;
        }
        Command::Siblings { worker_id } => {
            print_workers(client.send(&Request::Siblings { worker_id: WorkerId::new(worker_id) }).await?)?;
        }
        Command::Dependencies { worker_id } => {
            print_workers(client.send(&Request::Dependencies { worker_id: WorkerId::new(worker_id) }).await?)?;
        }
        Command::Tail { worker_id } => {
            print_bytes(client.send(&Request::Tail { worker_id: WorkerId::new(worker_id) }).await?)?;
        }
        Command::History { worker_id, offset, limit } => {
            let request = Request::History { worker_id: WorkerId::new(worker_id), offset, limit };
            print_bytes(client.send(&request).await?)?;
        }
        Command::ListCheckpoints => match client.send(&Request::ListCheckpoints).await? {
            Response::Checkpoints(checkpoints) => println!("{}", serde_json::to_string_pretty(&checkpoints)?),
            other => DaemonClient::reject(other)?,
        },
        Command::Health => match client.send(&Request::Health).await? {
            Response::Health { status } => println!("{status}"),
            other => DaemonClient::reject(other)?,
        },
        Command::Watch { project, worker_id, since_seq } => watch(&mut client, project, worker_id, since_seq).await?,
    }

    Ok(())
}

async fn watch(
    client: &mut DaemonClient,
    project: Option<String>,
    worker_id: Option<String>,
    since_seq: Option<u64>,
) -> anyhow::Result<()> {
    client
        .watch(project, worker_id.map(WorkerId::new), since_seq, |event| {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
        })
        .await?;
    Ok(())
}

fn print_worker(response: Response) -> anyhow::Result<()> {
    match response {
        Response::Worker(worker) => {
            println!("{}", serde_json::to_string_pretty(&worker)?);
            Ok(())
        }
        other => Ok(DaemonClient::reject(other)?),
    }
}

fn print_workers(response: Response) -> anyhow::Result<()> {
    match response {
        Response::Workers(workers) => {
            println!("{}", serde_json::to_string_pretty(&workers)?);
            Ok(())
        }
        other => Ok(DaemonClient::reject(other)?),
    }
}

fn print_bytes(response: Response) -> anyhow::Result<()> {
    match response {
        Response::Output { bytes } => {
            use std::io::Write;
            std::io::stdout().write_all(&bytes)?;
            Ok(())
        }
        other => Ok(DaemonClient::reject(other)?),
    }
}
