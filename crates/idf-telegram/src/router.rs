use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};
use tracing::{info, warn};

use idf_core::{
    access::AccessGuard,
    broadcast::Broadcaster,
    config::Config,
    messaging::port::{MessagingPort, ModerationPort},
    ports::{AdminRegistry, Directory, JobLedger, RecipientStore},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub directory: Arc<dyn Directory>,
    pub admins: Arc<dyn AdminRegistry>,
    pub messenger: Arc<dyn MessagingPort>,
    pub moderation: Arc<dyn ModerationPort>,
    pub broadcaster: Broadcaster,
    pub guard: AccessGuard,
    /// Our own username, used to skip `/cmd@other_bot` commands.
    pub bot_username: Option<String>,
}

/// Storage ports the bot runs against. One backend usually fills all four.
#[derive(Clone)]
pub struct Storage {
    pub recipients: Arc<dyn RecipientStore>,
    pub ledger: Arc<dyn JobLedger>,
    pub directory: Arc<dyn Directory>,
    pub admins: Arc<dyn AdminRegistry>,
}

fn bot_commands() -> Vec<BotCommand> {
    [
        ("start", "Start the bot"),
        ("help", "Show help"),
        ("myid", "Show your user ID and chat ID"),
        ("whoami", "Full details about you"),
        ("ping", "Test bot response"),
        ("stats", "Bot statistics (admins)"),
        ("listusers", "Recent known users (admins)"),
        ("export", "Export users to CSV (admins)"),
        ("ban", "Ban the replied user (admins)"),
        ("unban", "Unban a user (admins)"),
        ("kick", "Kick the replied user (admins)"),
        ("broadcasts", "Recent broadcasts (admins)"),
        ("broadcast", "Send to all users (owner)"),
        ("addadmin", "Add an admin (owner)"),
        ("removeadmin", "Remove an admin (owner)"),
        ("listadmins", "List admins (owner)"),
    ]
    .into_iter()
    .map(|(cmd, desc)| BotCommand::new(cmd, desc))
    .collect()
}

pub async fn run_polling(cfg: Arc<Config>, storage: Storage) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!(username = %me.username(), "idf started");
            me.user.username.clone()
        }
        Err(e) => {
            warn!(error = %e, "get_me failed");
            None
        }
    };
    info!(
        db = %cfg.db_file.display(),
        owner = %cfg.owner_id,
        "configuration loaded"
    );

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        warn!(error = %e, "failed to register bot commands");
    }

    let telegram = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = telegram.clone();
    let moderation: Arc<dyn ModerationPort> = telegram;

    let broadcaster = Broadcaster::new(
        cfg.broadcast(),
        storage.recipients,
        storage.ledger,
        messenger.clone(),
    );
    let guard = AccessGuard::new(cfg.owner_id, storage.admins.clone());
    if let Err(e) = guard.register_owner().await {
        warn!(error = %e, "failed to register owner as admin");
    }

    let state = Arc::new(AppState {
        cfg,
        directory: storage.directory,
        admins: storage.admins,
        messenger,
        moderation,
        broadcaster: broadcaster.clone(),
        guard,
        bot_username,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    broadcaster.shutdown().await;
    Ok(())
}
