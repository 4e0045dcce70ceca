pub mod callback;
pub mod message;

use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::ledger::Ledger;
use crate::services::payment::PaymentFlow;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Shared context for all update handlers. Cheap to clone; everything inside
/// is a handle.
#[derive(Clone)]
pub struct BotHandler {
    pub db: DatabaseManager,
    pub ledger: Ledger,
    pub config: Config,
    pub payments: PaymentFlow,
}

impl BotHandler {
    pub fn new(db: DatabaseManager, config: Config) -> Self {
        let ledger = Ledger::new(db.pool.clone());
        let payments = PaymentFlow::from_config(&config);

        Self {
            db,
            ledger,
            config,
            payments,
        }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let commands = self.clone();
        let callbacks = self.clone();
        let texts = self.clone();

        // Command branch first so the text branch only sees form input.
        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<crate::bot::commands::Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: crate::bot::commands::Command| {
                        let handler = commands.clone();
                        async move { message::command_handler(bot, msg, cmd, handler).await }
                    }),
            )
            .branch(
                Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                    let handler = callbacks.clone();
                    async move { callback::callback_handler(bot, q, handler).await }
                }),
            )
            .branch(Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let handler = texts.clone();
                async move { message::text_handler(bot, msg, handler).await }
            }))
    }
}
