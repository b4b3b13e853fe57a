// SPDX-License-Identifier: MIT

use anyhow::Context;
use chatflow_rs::adk::model::Part;
use chatflow_rs::chatflow::config::AppConfig;
use chatflow_rs::chatflow::server;
use chatflow_rs::chatflow::workflow::WorkflowCatalog;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available workflows and their models
    Workflows,
    /// Chat with a workflow from the terminal
    Chat {
        /// Workflow name (defaults to the default profile)
        #[arg(short, long)]
        workflow: Option<String>,

        /// Model to use instead of the workflow's default
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Start the HTTP chat server
    Serve {
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;
    let catalog = Arc::new(WorkflowCatalog::from_config(&config)?);

    match args.command {
        Commands::Workflows => {
            for (profile, settings) in catalog.profiles() {
                let marker = if profile.default { " (default)" } else { "" };
                println!("{}{}", profile.name, marker);
                println!("  {}", profile.markdown_description);
                for select in &settings.inputs {
                    println!(
                        "  {}: {} [initial: {}]",
                        select.label,
                        select.values.join(", "),
                        select.initial_value().unwrap_or("-")
                    );
                }
                for starter in &profile.starters {
                    println!("  > {}", starter.message);
                }
            }
        }
        Commands::Chat { workflow, model } => {
            let name = match workflow {
                Some(name) => name,
                None => catalog
                    .default_workflow()
                    .map(|e| e.workflow.name().to_string())
                    .context("no workflows registered")?,
            };
            chat(&catalog, &name, model.as_deref()).await?;
        }
        Commands::Serve { port } => {
            server::serve(catalog, port).await?;
        }
    }

    Ok(())
}

async fn chat(catalog: &WorkflowCatalog, name: &str, model: Option<&str>) -> anyhow::Result<()> {
    let mut session = catalog.start_session(name, model)?;
    println!(
        "{} ({}). Type a message, or /quit to exit.",
        name,
        session.state().model_selector
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        // Ctrl-C aborts the running turn instead of the process
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let result = session.send(line, cancel).await;
        watcher.abort();

        match result {
            Ok(messages) => {
                for message in messages {
                    for part in &message.parts {
                        match part {
                            Part::Text { text } => println!("{}", text),
                            Part::ToolCall { name, .. } => println!("[calling {}]", name),
                            Part::ToolResult { name, is_error, .. } => {
                                let status = if *is_error { "failed" } else { "done" };
                                println!("[{} {}]", name, status);
                            }
                        }
                    }
                }
            }
            Err(e) => eprintln!("Turn failed ({}): {}. Your message was not kept; try again.", e.kind(), e),
        }
    }
    Ok(())
}
