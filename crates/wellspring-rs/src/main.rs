//! Command-line entry point for the Wellspring assistant.

use anyhow::{Context, bail};
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use wellspring_rs::config::WellspringConfig;
use wellspring_rs::core::Orchestrator;
use wellspring_rs::profile::ProfileStore;
use wellspring_rs::protocol::{Conversation, Message, ResponseEnvelope, UserProfile};

const DEFAULT_USER: &str = "local";

/// Command-line options for the assistant.
#[derive(Parser)]
#[command(name = "wellspring", version)]
struct Cli {
    /// Optional path to a wellspring.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// OpenAI model name; overrides the config
    #[arg(long, global = true)]
    model: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message, or start an interactive session when none is given
    Chat {
        /// Profile owner for this conversation
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
        /// Write the conversation to this path as JSON lines on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Message to send
        message: Option<String>,
    },
    /// Comprehensive information on a health topic
    Topic {
        /// Topic name
        name: String,
    },
    /// Inspect or replace a stored profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the stored profile as JSON
    Show {
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
    },
    /// Replace the stored profile with a JSON object
    Set {
        #[arg(long, default_value = DEFAULT_USER)]
        user: String,
        /// Profile JSON, e.g. '{"age": 30, "fitness_goals": ["run a 10k"]}'
        json: String,
    },
}

/// Entry point for the Wellspring CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wellspring_rs::init_logging();

    let cli = Cli::parse();
    info!(
        "starting wellspring (config_set={}, model_set={})",
        cli.config.is_some(),
        cli.model.is_some()
    );
    let config = load_config(cli.config.as_ref())?;
    let store = wellspring_rs::profile_store(&config.profile.store)
        .context("failed to open profile store")?;

    match cli.command {
        Command::Chat {
            user,
            transcript,
            message,
        } => {
            let orchestrator = build_orchestrator(&config, cli.model, store)?;
            chat(&orchestrator, &user, message, transcript).await
        }
        Command::Topic { name } => {
            let orchestrator = build_orchestrator(&config, cli.model, store)?;
            let bundle = orchestrator.topic(&name).await;
            print_json(&bundle)
        }
        Command::Profile { action } => match action {
            ProfileAction::Show { user } => {
                let profile = store.get(&user).await.context("failed to read profile")?;
                print_json(&profile)
            }
            ProfileAction::Set { user, json } => {
                let profile: UserProfile =
                    serde_json::from_str(&json).context("profile must be a JSON object")?;
                let stored = wellspring_rs::replace_profile(store.as_ref(), &user, profile)
                    .await
                    .context("failed to write profile")?;
                print_json(&stored)
            }
        },
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<WellspringConfig> {
    if let Some(path) = path {
        info!("loading config from path: {}", path.display());
        return WellspringConfig::load_from_path(path).context("failed to load config");
    }
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    info!("loading layered config from cwd: {}", cwd.display());
    let layered = WellspringConfig::load_layered(&cwd).context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    Ok(layered.config)
}

fn build_orchestrator(
    config: &WellspringConfig,
    model: Option<String>,
    store: Arc<dyn ProfileStore>,
) -> anyhow::Result<Orchestrator> {
    if config.model.provider != "openai" {
        bail!("unsupported model provider: {}", config.model.provider);
    }
    let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
        bail!("OPENAI_API_KEY is required to run wellspring");
    };
    let model_name = model
        .or_else(|| std::env::var("OPENAI_MODEL").ok())
        .unwrap_or_else(|| config.model.name.clone());
    info!("building LLM providers (model={})", model_name);

    let client = wellspring_rs::generation_client(config, |temperature| {
        let mut builder = LLMBuilder::<OpenAI>::new()
            .api_key(api_key.clone())
            .model(model_name.clone());
        if let Some(temperature) = temperature {
            builder = builder.temperature(temperature);
        }
        let provider: Arc<dyn LLMProvider> = builder
            .build()
            .context("failed to build OpenAI LLM provider")?;
        Ok::<_, anyhow::Error>(provider)
    })?;

    Ok(Orchestrator::builder(Arc::new(client), store)
        .config(config.clone())
        .build())
}

async fn chat(
    orchestrator: &Orchestrator,
    user: &str,
    message: Option<String>,
    transcript: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut conversation = Conversation::new();
    if let Some(message) = message {
        conversation.push(Message::user(message.clone()));
        let envelope = orchestrator.handle(&message, user).await;
        conversation.push(Message::assistant(envelope.chat_response.clone()));
        print_json(&envelope)?;
    } else {
        interactive(orchestrator, user, &mut conversation).await?;
    }

    if let Some(path) = transcript {
        let jsonl = conversation.to_jsonl().context("failed to encode transcript")?;
        tokio::fs::write(&path, jsonl)
            .await
            .with_context(|| format!("failed to write transcript to {}", path.display()))?;
        info!(
            "transcript written (path={}, messages={})",
            path.display(),
            conversation.len()
        );
    }
    Ok(())
}

async fn interactive(
    orchestrator: &Orchestrator,
    user: &str,
    conversation: &mut Conversation,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await.context("stdout")?;
        stdout.flush().await.context("stdout")?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        conversation.push(Message::user(line));
        let envelope = orchestrator.handle(line, user).await;
        conversation.push(Message::assistant(envelope.chat_response.clone()));
        stdout
            .write_all(render(&envelope).as_bytes())
            .await
            .context("stdout")?;
    }
    Ok(())
}

/// Plain-text rendering for the interactive loop.
fn render(envelope: &ResponseEnvelope) -> String {
    let mut out = format!("{}\n", envelope.chat_response);
    if let Some(knowledge) = &envelope.knowledge {
        for (domain, answer) in &knowledge.answers {
            out.push_str(&format!("\n[{}] {}\n{}\n", domain.title(), answer.title, answer.content));
        }
    }
    if let Some(diet) = &envelope.diet_plan {
        out.push_str(&format!("\nDiet plan: {}\n", diet.goal));
        for meal in &diet.meals {
            out.push_str(&format!("  {}: {}\n", meal.meal_type, meal.food_items.join(", ")));
        }
    }
    if let Some(fitness) = &envelope.fitness_plan {
        out.push_str(&format!("\nFitness plan: {}\n", fitness.goal));
        for day in &fitness.workout_schedule {
            out.push_str(&format!("  {}: {}\n", day.day, day.focus));
        }
    }
    for recommendation in &envelope.lifestyle_recommendations {
        out.push_str(&format!("  - {recommendation}\n"));
    }
    if !envelope.follow_up_suggestions.is_empty() {
        out.push_str("\nYou could also ask:\n");
        for suggestion in &envelope.follow_up_suggestions {
            out.push_str(&format!("  * {suggestion}\n"));
        }
    }
    for disclaimer in &envelope.disclaimers {
        out.push_str(&format!("\n{disclaimer}"));
    }
    out.push('\n');
    out
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}
