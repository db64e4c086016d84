//! Command-line client for the Dual Chain Agent API

use clap::{Parser, Subcommand};
use skywire_agent::client::{ApiClient, ClientError, DEFAULT_API_URL};
use skywire_agent::router::{TaskResult, TaskStatus};
use std::process::ExitCode;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_WAIT: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "agent-api-client")]
#[command(about = "Client for the Dual Chain Agent API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL
    #[arg(long, env = "AGENT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an instruction
    Submit {
        /// The instruction to submit
        instruction: String,

        /// Chain ID (84532 for Base, 11155420 for Optimism)
        #[arg(long = "chain", alias = "chain-id")]
        chain_id: Option<String>,

        /// Timeout in seconds for the instruction
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        /// Wait for the result instead of just returning the task ID
        #[arg(long)]
        wait: bool,
    },

    /// Get a task result
    Get {
        /// The task ID to check
        task_id: String,
    },

    /// List all tasks
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.api_url);

    match run(&client, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &ApiClient, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Submit {
            instruction,
            chain_id,
            timeout,
            wait,
        } => {
            let task = client
                .submit_instruction(&instruction, chain_id.as_deref(), timeout)
                .await?;
            println!("Submitted task: {}", task.task_id);

            if wait {
                println!("Waiting for result...");
                let result = client
                    .wait_for_completion(&task.task_id, POLL_INTERVAL, MAX_WAIT, |t| {
                        println!(
                            "Task {} is still {}... waiting {}s",
                            t.task_id,
                            status_name(t.status),
                            POLL_INTERVAL.as_secs()
                        )
                    })
                    .await?;
                if result.status == TaskStatus::Completed {
                    print_result(&result);
                } else {
                    println!("\nTask failed: {}", result.error.as_deref().unwrap_or(""));
                }
            } else {
                println!("To check result: agent-api-client get {}", task.task_id);
            }
        }
        Commands::Get { task_id } => {
            let result = client.get_task(&task_id).await?;
            println!("Task ID: {}", result.task_id);
            println!("Status: {}", status_name(result.status));
            println!("Chain ID: {}", result.chain_id);
            println!("Instruction: {}", result.instruction);
            match result.status {
                TaskStatus::Completed => print_result(&result),
                TaskStatus::Failed => {
                    println!("\nError: {}", result.error.as_deref().unwrap_or(""))
                }
                TaskStatus::Pending => {}
            }
        }
        Commands::List => {
            let tasks = client.list_tasks().await?;
            if tasks.is_empty() {
                println!("No tasks found");
                return Ok(());
            }
            println!("Found {} tasks:", tasks.len());
            for task in &tasks {
                println!(
                    "- {}: {} (Chain: {})",
                    task.task_id,
                    status_name(task.status),
                    task.chain_id
                );
            }
        }
    }
    Ok(())
}

fn print_result(result: &TaskResult) {
    println!("\n=== RESULT ===");
    println!("{}", result.result.as_deref().unwrap_or(""));
}

fn status_name(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
    }
}

fn describe(err: &ClientError) -> String {
    match err {
        ClientError::Api { body, .. } => format!("Error from API: {}", body),
        other => format!("Error: {}", other),
    }
}
