pub mod admin;
pub mod menu;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Language school bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot / open the main menu")]
    Start,
    #[command(description = "Open the admin panel")]
    Admin,
}
