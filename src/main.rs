use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use health_assistant::chat::{self, ChatClient, Conversation};
use health_assistant::config::Cli;
use health_assistant::{ExerciseStore, MealStore, Toolbox};

const HELP: &str = "
Available commands:

Exercise commands:
- show exercises: List all exercises
- next exercise: Get the next recommended exercise
- complete [id]: Mark an exercise as completed
- add exercise: Add a new exercise
- remove exercise [id]: Remove an exercise
- details exercise [id]: Show exercise details

Food commands:
- show meals: List all meals
- suggest meal: Get a meal suggestion
- log meal [id]: Mark a meal as consumed
- add meal: Add a new meal
- remove meal [id]: Remove a meal
- details meal [id]: Show meal details

- exit: Quit the program
";

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // Logs go to stderr so they do not interleave with the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match cli.chat_settings() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to configure chat service: {}", e);
            eprintln!("An error occurred: {e}");
            return ExitCode::FAILURE;
        }
    };

    let client = ChatClient::new(&settings);
    info!("Chat service configured for deployment {}", settings.deployment);

    let mut toolbox = Toolbox::new(
        MealStore::open(&cli.meals_file),
        ExerciseStore::open(&cli.exercises_file),
    );
    let today = chrono::Local::now().date_naive();
    let mut conversation = Conversation::new(chat::system_prompt(today));

    println!("\nWelcome to your Health Assistant!");
    println!("Type 'help' for commands or 'exit' to quit.\n");
    println!("Available categories:");
    println!("- Exercise: Manage workouts and exercises");
    println!("- Food: Manage meals and nutrition\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if stdout.write_all(b"You: ").await.is_err() || stdout.flush().await.is_err() {
            break;
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.eq_ignore_ascii_case("help") {
            println!("{HELP}");
            continue;
        }

        match conversation.send(&client, &mut toolbox, input).await {
            Ok(answer) => println!("\nAssistant: {answer}\n"),
            Err(e) => {
                error!("Chat request failed: {}", e);
                println!("\nError occurred: {e}\n");
            }
        }
    }

    ExitCode::SUCCESS
}
