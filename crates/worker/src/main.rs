mod adapters;
mod bootstrap;
mod consumers;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use acontext_domain::config::{Config, ConfigSeverity};
use acontext_domain::envelope::{topology, InsertNewMessage, SkillLearnDistilled, SkillLearnTask};

use bootstrap::AppContext;
use consumers::run_consumer;

#[derive(Parser)]
#[command(name = "acontext-worker", about = "Acontext session-context worker")]
struct Cli {
    /// Path to a TOML config file; defaults are used for anything absent.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all MQ consumers until terminated.
    Serve,
    /// Print the effective config as TOML and exit.
    ConfigShow,
    /// Validate the effective config and exit non-zero on any error-severity issue.
    ConfigValidate,
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)?;
            Ok(Config::from_toml_str(&raw)?)
        }
        None => Ok(Config::default()),
    }
}

fn print_validation(config: &Config) -> bool {
    let issues = config.validate();
    let mut has_error = false;
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Error => {
                has_error = true;
                tracing::error!("{}", issue.message);
            }
            ConfigSeverity::Warning => tracing::warn!("{}", issue.message),
        }
    }
    !has_error
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    acontext_lifecycle::templates::validate_templates()?;

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::ConfigShow => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Command::ConfigValidate => {
            if print_validation(&config) {
                println!("config OK");
                Ok(())
            } else {
                anyhow::bail!("config has error-severity issues, see logs above");
            }
        }
        Command::Serve => {
            if !print_validation(&config) {
                anyhow::bail!("refusing to start with an invalid config");
            }
            serve(config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // §5/§6: `mq_consumer_handler_timeout` bounds every consumer's handler
    // call, except skill-agent, whose handler can hold the per-Learning-Space
    // lock for up to `skill_learn_lock_ttl_seconds` and is given that plus a
    // 60s margin instead (§4.5).
    let default_handler_timeout = Duration::from_secs(config.broker.mq_consumer_handler_timeout_seconds);
    let skill_agent_handler_timeout = Duration::from_secs(config.skill_agent.skill_learn_lock_ttl_seconds + 60);

    let ctx = Arc::new(AppContext::build(config).await?);

    let buffer = ctx.buffer_service();
    let buffer_insert = buffer.clone();
    let insert_handle = tokio::spawn(run_consumer::<InsertNewMessage, _, _>(
        ctx.broker.clone(),
        topology::SESSION_MESSAGE_INSERT_QUEUE,
        default_handler_timeout,
        move |envelope| {
            let buffer = buffer_insert.clone();
            async move { buffer.handle_insert_new_message(envelope).await }
        },
    ));

    let buffer_timer = buffer.clone();
    let buffer_handle = tokio::spawn(run_consumer::<InsertNewMessage, _, _>(
        ctx.broker.clone(),
        topology::SESSION_MESSAGE_BUFFER_PROCESS_QUEUE,
        default_handler_timeout,
        move |envelope| {
            let buffer = buffer_timer.clone();
            async move { buffer.handle_buffer_new_message(envelope).await }
        },
    ));

    let distill = Arc::new(ctx.distill_consumer());
    let distill_handle = tokio::spawn(run_consumer::<SkillLearnTask, _, _>(
        ctx.broker.clone(),
        topology::LEARNING_SKILL_DISTILL_QUEUE,
        default_handler_timeout,
        move |envelope| {
            let distill = distill.clone();
            async move { distill.handle(envelope).await.map(|_| ()) }
        },
    ));

    // `LEARNING_SKILL_AGENT_RETRY_QUEUE` (like `SESSION_MESSAGE_INSERT_RETRY_QUEUE`)
    // is a DLX holding queue only: the broker redelivers to the primary
    // routing key once each message's TTL elapses. No handler ever consumes
    // it directly, or the delay it exists to enforce would be bypassed.
    let skill_agent = Arc::new(ctx.skill_agent_consumer());
    let skill_agent_handle = tokio::spawn(run_consumer::<SkillLearnDistilled, _, _>(
        ctx.broker.clone(),
        topology::LEARNING_SKILL_AGENT_QUEUE,
        skill_agent_handler_timeout,
        move |envelope| {
            let skill_agent = skill_agent.clone();
            async move { skill_agent.handle(envelope).await.map(|_| ()) }
        },
    ));

    tracing::info!("acontext-worker started, consuming all queues");

    let _ = tokio::join!(insert_handle, buffer_handle, distill_handle, skill_agent_handle,);
    Ok(())
}
