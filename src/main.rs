mod chat_log;
mod commands;
mod config;
mod forwarder;
mod telegram;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use commands::Command;
use config::Config;
use forwarder::{ForwardPlan, JobEvent, Sessions, StopSignal};
use telegram::TelegramChannel;

struct BotState {
    config: Config,
    sessions: Sessions,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "batchfwd.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "batchfwd.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        registry.with(chat_log::ChatLogLayer::new(bot.clone(), log_chat_id)).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting batchfwd...");
    info!("Loaded config from {config_path}");
    info!(
        "Defaults: batch size {}, delay {}s, source {:?}, target {:?}",
        config.default_batch_size, config.default_delay_seconds, config.source_channel, config.target_channel
    );

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register command list: {e}");
    }

    let state = Arc::new(BotState {
        config,
        sessions: Sessions::new(),
    });

    let handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handle_command);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    info!("📨 {:?} from chat {}", cmd, chat_id);

    let reply = match cmd {
        Command::Forward => {
            match state.sessions.begin_forward(chat_id.0, &state.config.defaults()).await {
                Ok((plan, stop)) => {
                    let reply = format!(
                        "Forwarding messages {}..{} from {} to {} ({} total).",
                        plan.start,
                        plan.end,
                        plan.source,
                        plan.target,
                        plan.total()
                    );
                    spawn_forward(bot.clone(), chat_id, plan, stop, state.clone());
                    reply
                }
                Err(reply) => reply,
            }
        }
        Command::Stop => state.sessions.stop(chat_id.0).await,
        Command::Status => state.sessions.status(chat_id.0, &state.config.defaults()).await,
        Command::Help => Command::descriptions().to_string(),
        setting => match setting.setting() {
            Some(change) => state.sessions.apply(chat_id.0, change).await,
            None => return Ok(()),
        },
    };

    send_reply(&bot, chat_id, &reply).await;
    Ok(())
}

/// Run the job on its own task and relay its events back to `chat_id`.
fn spawn_forward(bot: Bot, chat_id: ChatId, plan: ForwardPlan, stop: StopSignal, state: Arc<BotState>) {
    let staging_chat = state.config.staging_chat_id.unwrap_or(chat_id);
    let client = TelegramChannel::new(bot.clone(), staging_chat);
    let (tx, mut rx) = mpsc::unbounded_channel::<JobEvent>();

    let relay = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(text) = event.message() {
                send_reply(&bot, chat_id, &text).await;
            }
        }
    });

    tokio::spawn(async move {
        let outcome = forwarder::job::run(&client, &plan, &stop, &tx).await;
        drop(tx);
        if let Err(e) = relay.await {
            warn!("Progress relay for chat {chat_id} failed: {e}");
        }
        state.sessions.finish(chat_id.0, &stop).await;
        info!("Chat {chat_id}: job ended with {outcome:?}");
    });
}

async fn send_reply(bot: &Bot, chat_id: ChatId, text: &str) {
    if let Err(e) = bot.send_message(chat_id, text).await {
        warn!("Failed to reply in chat {chat_id}: {e}");
    }
}
