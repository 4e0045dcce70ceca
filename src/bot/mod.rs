/// Command definitions and keyboard/message renderers
pub mod commands;
/// Update handlers and the callback routing table
pub mod handlers;
