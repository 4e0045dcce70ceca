//! Command and free-text handling. Free text is only meaningful while a
//! durable session row says a form is in progress; everything else gets a
//! pointer back to the menu.

use super::{BotHandler, HandlerResult};
use crate::bot::commands::{admin, menu, Command};
use crate::database::models::{RegistrationSession, Slot, Student, Teacher};
use crate::utils::validation::{parse_slot_form, parse_teacher_form, validate_date, validate_email};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::info;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    handler: BotHandler,
) -> HandlerResult {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Start => {
            let telegram_id = match msg.from() {
                Some(user) => user.id.0 as i64,
                None => return Ok(()),
            };

            // A fresh /start abandons any half-finished form.
            RegistrationSession::clear(&handler.db.pool, telegram_id).await?;

            let student = Student::find_by_telegram_id(&handler.db.pool, telegram_id).await?;

            let text = match &student {
                Some(student) => format!(
                    "👋 Welcome back, {}!\n\nLessons on balance: {}",
                    student.name, student.lessons_balance
                ),
                None => "👋 Welcome to the language school!\n\n\
                         Register to buy lessons and book a time with a teacher."
                    .to_string(),
            };

            bot.send_message(msg.chat.id, text)
                .reply_markup(menu::main_menu(student.is_some()))
                .await?;
        }
        Command::Admin => {
            if msg.chat.id.0 != handler.config.admin_chat_id {
                bot.send_message(msg.chat.id, "This command is not available here.")
                    .await?;
                return Ok(());
            }

            bot.send_message(msg.chat.id, "🛠 Admin panel")
                .reply_markup(admin::admin_menu())
                .await?;
        }
    }

    Ok(())
}

pub async fn text_handler(bot: Bot, msg: Message, handler: BotHandler) -> HandlerResult {
    let text = match msg.text() {
        Some(text) => text.trim().to_string(),
        None => return Ok(()),
    };
    let telegram_id = match msg.from() {
        Some(user) => user.id.0 as i64,
        None => return Ok(()),
    };

    if text.is_empty() {
        return Ok(());
    }

    let pool = &handler.db.pool;

    let session = match RegistrationSession::get(pool, telegram_id).await? {
        Some(session) => session,
        None => {
            bot.send_message(msg.chat.id, "Use /start to open the menu.")
                .await?;
            return Ok(());
        }
    };

    match session.step.as_str() {
        "name" => {
            if text.len() > 100 {
                bot.send_message(msg.chat.id, "That name is too long, please shorten it.")
                    .await?;
                return Ok(());
            }

            RegistrationSession::save_step(
                pool,
                telegram_id,
                "email",
                Some(text.as_str()),
                None,
                None,
                None,
            )
            .await?;

            bot.send_message(
                msg.chat.id,
                format!("Nice to meet you, {text}!\n\n📧 Now send your email address."),
            )
            .await?;
        }
        "email" => {
            if let Err(e) = validate_email(&text) {
                bot.send_message(msg.chat.id, format!("❌ {e}. Please send it again."))
                    .await?;
                return Ok(());
            }

            RegistrationSession::save_step(
                pool,
                telegram_id,
                "timezone",
                None,
                Some(text.as_str()),
                None,
                None,
            )
            .await?;

            bot.send_message(
                msg.chat.id,
                "🕐 Send your timezone (for example Europe/Berlin), or \"-\" to skip.",
            )
            .await?;
        }
        "timezone" => {
            let timezone = if text == "-" { "UTC" } else { text.as_str() };

            RegistrationSession::save_step(
                pool,
                telegram_id,
                "tariff",
                None,
                None,
                Some(timezone),
                None,
            )
            .await?;

            bot.send_message(msg.chat.id, "💳 Choose a tariff:")
                .reply_markup(menu::tariff_keyboard(&handler.config.tariffs()))
                .await?;
        }
        "payment" => {
            bot.send_message(
                msg.chat.id,
                "Finish the payment using the buttons above, or /start to begin over.",
            )
            .await?;
        }
        "admin_slot_form" => {
            if msg.chat.id.0 != handler.config.admin_chat_id {
                return Ok(());
            }
            handle_slot_form(&bot, &msg, &handler, telegram_id, &text).await?;
        }
        "admin_teacher_form" => {
            if msg.chat.id.0 != handler.config.admin_chat_id {
                return Ok(());
            }
            handle_teacher_form(&bot, &msg, &handler, telegram_id, &text).await?;
        }
        "admin_date_filter" => {
            if msg.chat.id.0 != handler.config.admin_chat_id {
                return Ok(());
            }
            handle_date_filter(&bot, &msg, &handler, telegram_id, &text).await?;
        }
        other => {
            info!("Ignoring text from {} at unexpected step '{}'", telegram_id, other);
            bot.send_message(msg.chat.id, "Use /start to open the menu.")
                .await?;
        }
    }

    Ok(())
}

async fn handle_slot_form(
    bot: &Bot,
    msg: &Message,
    handler: &BotHandler,
    telegram_id: i64,
    text: &str,
) -> HandlerResult {
    let pool = &handler.db.pool;

    let form = match parse_slot_form(text) {
        Ok(form) => form,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("❌ {e}\n\nSend the form again."))
                .await?;
            return Ok(());
        }
    };

    // Missing link falls back to the default of an active teacher only.
    let meeting_link = match form.meeting_link {
        Some(link) => link,
        None => match Teacher::find_active_by_name(pool, &form.teacher).await? {
            Some(teacher) => teacher.meeting_link,
            None => {
                bot.send_message(
                    msg.chat.id,
                    format!(
                        "❌ '{}' is not an active teacher, so a meeting link is required.",
                        form.teacher
                    ),
                )
                .await?;
                return Ok(());
            }
        },
    };

    for time in &form.times {
        handler
            .ledger
            .add_slot(&form.teacher, &form.date, time, &meeting_link)
            .await?;
    }

    RegistrationSession::clear(pool, telegram_id).await?;

    info!(
        "Admin added {} slot(s) for {} on {}",
        form.times.len(),
        form.teacher,
        form.date
    );

    bot.send_message(
        msg.chat.id,
        format!(
            "✅ Added {} slot(s) for {} on {}.",
            form.times.len(),
            form.teacher,
            form.date
        ),
    )
    .await?;

    Ok(())
}

async fn handle_teacher_form(
    bot: &Bot,
    msg: &Message,
    handler: &BotHandler,
    telegram_id: i64,
    text: &str,
) -> HandlerResult {
    let pool = &handler.db.pool;

    let (name, link) = match parse_teacher_form(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("❌ {e}\n\nSend the form again."))
                .await?;
            return Ok(());
        }
    };

    if Teacher::find_by_name(pool, &name).await?.is_some() {
        bot.send_message(msg.chat.id, format!("❌ Teacher '{name}' already exists."))
            .await?;
        return Ok(());
    }

    let teacher = Teacher::create(pool, &name, &link).await?;
    RegistrationSession::clear(pool, telegram_id).await?;

    bot.send_message(
        msg.chat.id,
        format!("✅ Teacher {} added (id {}).", teacher.name, teacher.id),
    )
    .await?;

    Ok(())
}

async fn handle_date_filter(
    bot: &Bot,
    msg: &Message,
    handler: &BotHandler,
    telegram_id: i64,
    text: &str,
) -> HandlerResult {
    let pool = &handler.db.pool;

    if let Err(e) = validate_date(text) {
        bot.send_message(msg.chat.id, format!("❌ {e}\n\nSend the date again."))
            .await?;
        return Ok(());
    }

    let bookings = Slot::bookings_on_date(pool, text).await?;
    RegistrationSession::clear(pool, telegram_id).await?;

    if bookings.is_empty() {
        bot.send_message(msg.chat.id, format!("No bookings on {text}."))
            .await?;
        return Ok(());
    }

    let mut report = format!("📅 Bookings on {text}:\n\n");
    for booking in &bookings {
        report.push_str(&admin::booking_line(booking));
    }

    bot.send_message(msg.chat.id, report)
        .reply_markup(admin::bookings_keyboard(&bookings))
        .await?;

    Ok(())
}
