//! Callback-query routing. Every inline button carries `tag:payload` data;
//! [`CallbackAction::parse`] turns it into a typed action and the handler
//! dispatches on that. Unknown or malformed data is answered and dropped.

use super::{BotHandler, HandlerResult};
use crate::bot::commands::{admin, menu};
use crate::database::models::{LessonRecord, Payment, RegistrationSession, Slot, Student, Teacher};
use crate::services::payment::notify_settled;
use crate::services::stats::SchoolStats;
use crate::utils::datetime::{outside_lead_time, parse_slot_datetime};
use chrono::Local;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuSection {
    Register,
    Slots,
    Lessons,
    Profile,
    Buy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminSection {
    AddSlot,
    Slots,
    Students,
    Bookings,
    BookingsDate,
    Teachers,
    AddTeacher,
    History,
    Stats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Menu(MenuSection),
    Admin(AdminSection),
    Book(i64),
    CancelOwn(i64),
    Tariff(String),
    Paid(i64),
    ConfirmPayment(i64),
    AddLesson(i64),
    RemoveLesson(i64),
    ToggleBlock(i64),
    CancelBooking(i64),
    MarkDone(i64),
    DeleteSlot(i64),
    DeactivateTeacher(i64),
}

impl MenuSection {
    fn parse(payload: &str) -> Option<Self> {
        match payload {
            "register" => Some(Self::Register),
            "slots" => Some(Self::Slots),
            "lessons" => Some(Self::Lessons),
            "profile" => Some(Self::Profile),
            "buy" => Some(Self::Buy),
            _ => None,
        }
    }
}

impl AdminSection {
    fn parse(payload: &str) -> Option<Self> {
        match payload {
            "addslot" => Some(Self::AddSlot),
            "slots" => Some(Self::Slots),
            "students" => Some(Self::Students),
            "bookings" => Some(Self::Bookings),
            "bookingsdate" => Some(Self::BookingsDate),
            "teachers" => Some(Self::Teachers),
            "addteacher" => Some(Self::AddTeacher),
            "history" => Some(Self::History),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let (tag, payload) = data.split_once(':')?;

        match tag {
            "menu" => MenuSection::parse(payload).map(Self::Menu),
            "admin" => AdminSection::parse(payload).map(Self::Admin),
            "book" => payload.parse().ok().map(Self::Book),
            "cancelown" => payload.parse().ok().map(Self::CancelOwn),
            "tariff" if !payload.is_empty() => Some(Self::Tariff(payload.to_string())),
            "paid" => payload.parse().ok().map(Self::Paid),
            "payconfirm" => payload.parse().ok().map(Self::ConfirmPayment),
            "addlesson" => payload.parse().ok().map(Self::AddLesson),
            "rmlesson" => payload.parse().ok().map(Self::RemoveLesson),
            "block" => payload.parse().ok().map(Self::ToggleBlock),
            "cancelbook" => payload.parse().ok().map(Self::CancelBooking),
            "done" => payload.parse().ok().map(Self::MarkDone),
            "delslot" => payload.parse().ok().map(Self::DeleteSlot),
            "deactteacher" => payload.parse().ok().map(Self::DeactivateTeacher),
            _ => None,
        }
    }

    /// Actions reserved for the admin chat.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::Admin(_)
                | Self::ConfirmPayment(_)
                | Self::AddLesson(_)
                | Self::RemoveLesson(_)
                | Self::ToggleBlock(_)
                | Self::CancelBooking(_)
                | Self::MarkDone(_)
                | Self::DeleteSlot(_)
                | Self::DeactivateTeacher(_)
        )
    }
}

pub async fn callback_handler(bot: Bot, q: CallbackQuery, handler: BotHandler) -> HandlerResult {
    let data = match q.data.clone() {
        Some(data) => data,
        None => {
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };

    let user_id = q.from.id.0 as i64;
    let chat = q
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .unwrap_or(ChatId(user_id));

    info!("Callback '{}' from {}", data, user_id);

    let toast = match CallbackAction::parse(&data) {
        None => {
            warn!("Unroutable callback data '{}' from {}", data, user_id);
            Some("Unknown action".to_string())
        }
        Some(action) if action.requires_admin() => {
            if user_id == handler.config.admin_chat_id {
                admin_action(&bot, chat, user_id, &handler, action).await?
            } else {
                warn!("Admin action '{}' refused for {}", data, user_id);
                Some("Not allowed".to_string())
            }
        }
        Some(action) => student_action(&bot, chat, user_id, &handler, action).await?,
    };

    // Every callback gets answered so the client stops its spinner.
    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(text) = toast {
        answer = answer.text(text);
    }
    answer.await?;

    Ok(())
}

async fn student_action(
    bot: &Bot,
    chat: ChatId,
    user_id: i64,
    handler: &BotHandler,
    action: CallbackAction,
) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
    let pool = &handler.db.pool;

    let toast = match action {
        CallbackAction::Menu(MenuSection::Register) => {
            if Student::find_by_telegram_id(pool, user_id).await?.is_some() {
                Some("You are already registered.".to_string())
            } else {
                RegistrationSession::save_step(pool, user_id, "name", None, None, None, None)
                    .await?;
                bot.send_message(chat, "📝 Let's get you registered!\n\nWhat's your name?")
                    .await?;
                None
            }
        }
        CallbackAction::Menu(MenuSection::Slots) => {
            if Student::find_by_telegram_id(pool, user_id).await?.is_none() {
                return Ok(Some("Register first with /start.".to_string()));
            }

            let slots = Slot::free(pool).await?;
            if slots.is_empty() {
                bot.send_message(chat, "No free slots right now, check back later.")
                    .await?;
            } else {
                bot.send_message(chat, "📅 Available slots:")
                    .reply_markup(menu::free_slots_keyboard(&slots))
                    .await?;
            }
            None
        }
        CallbackAction::Menu(MenuSection::Lessons) => {
            let student = match Student::find_by_telegram_id(pool, user_id).await? {
                Some(student) => student,
                None => return Ok(Some("Register first with /start.".to_string())),
            };

            let slots = Slot::by_student(pool, student.id).await?;
            bot.send_message(chat, menu::my_lessons_text(&student, &slots))
                .reply_markup(menu::my_lessons_keyboard(&slots))
                .await?;
            None
        }
        CallbackAction::Menu(MenuSection::Profile) => {
            let student = match Student::find_by_telegram_id(pool, user_id).await? {
                Some(student) => student,
                None => return Ok(Some("Register first with /start.".to_string())),
            };

            let tariff_title = handler
                .config
                .find_tariff(&student.tariff)
                .map(|t| t.title)
                .unwrap_or_else(|| student.tariff.clone());

            bot.send_message(chat, menu::profile_text(&student, &tariff_title))
                .await?;
            None
        }
        CallbackAction::Menu(MenuSection::Buy) => {
            bot.send_message(chat, "💳 Choose a tariff:")
                .reply_markup(menu::tariff_keyboard(&handler.config.tariffs()))
                .await?;
            None
        }
        CallbackAction::Book(slot_id) => {
            let student = match Student::find_by_telegram_id(pool, user_id).await? {
                Some(student) => student,
                None => return Ok(Some("Register first with /start.".to_string())),
            };

            if !student.is_active() {
                return Ok(Some("Your account is blocked.".to_string()));
            }

            if student.lessons_balance <= 0 {
                bot.send_message(chat, "You have no lessons on balance. Buy a tariff first:")
                    .reply_markup(menu::tariff_keyboard(&handler.config.tariffs()))
                    .await?;
                return Ok(None);
            }

            if handler.ledger.book_slot(slot_id, student.id).await? {
                if let Some(slot) = Slot::find_by_id(pool, slot_id).await? {
                    bot.send_message(chat, menu::booked_text(&slot)).await?;
                }
                None
            } else {
                Some("The slot is taken or your balance ran out.".to_string())
            }
        }
        CallbackAction::CancelOwn(slot_id) => {
            let student = match Student::find_by_telegram_id(pool, user_id).await? {
                Some(student) => student,
                None => return Ok(Some("Register first with /start.".to_string())),
            };

            let slot = match Slot::find_by_id(pool, slot_id).await? {
                Some(slot) => slot,
                None => return Ok(Some("This booking no longer exists.".to_string())),
            };

            match parse_slot_datetime(&slot.date, &slot.time) {
                Ok(lesson) => {
                    let now = Local::now().naive_local();
                    if !outside_lead_time(lesson, now, handler.config.cancel_lead_hours) {
                        return Ok(Some(format!(
                            "Lessons can only be cancelled at least {} hours before the start.",
                            handler.config.cancel_lead_hours
                        )));
                    }
                }
                Err(e) => warn!("Slot #{} has unparseable datetime: {}", slot.id, e),
            }

            if handler
                .ledger
                .cancel_booking_by_owner(slot_id, student.id)
                .await?
            {
                bot.send_message(
                    chat,
                    "✅ Booking cancelled, the lesson credit is back on your balance.",
                )
                .await?;
                None
            } else {
                Some("Could not cancel this booking.".to_string())
            }
        }
        CallbackAction::Tariff(code) => {
            let invoice = match handler.payments.create_invoice(pool, user_id, &code).await? {
                Some(invoice) => invoice,
                None => return Ok(Some("Unknown tariff.".to_string())),
            };

            RegistrationSession::save_step(
                pool,
                user_id,
                "payment",
                None,
                None,
                None,
                Some(invoice.tariff.code.as_str()),
            )
            .await?;

            let price = format!(
                "{:.2} {}",
                invoice.payment.amount as f64 / 100.0,
                invoice.payment.currency
            );

            match invoice.pay_url {
                Some(url) => {
                    bot.send_message(
                        chat,
                        format!(
                            "💳 {}\nPrice: {}\n\nPay here: {}\n\n\
                             Lessons are credited automatically once the payment goes through.",
                            invoice.tariff.title, price, url
                        ),
                    )
                    .await?;
                }
                None => {
                    let keyboard = InlineKeyboardMarkup::new(vec![vec![
                        InlineKeyboardButton::callback(
                            "✅ I have paid",
                            format!("paid:{}", invoice.payment.id),
                        ),
                    ]]);

                    bot.send_message(
                        chat,
                        format!(
                            "💳 {}\nPrice: {}\n\n\
                             Transfer the amount and press the button below.",
                            invoice.tariff.title, price
                        ),
                    )
                    .reply_markup(keyboard)
                    .await?;
                }
            }
            None
        }
        CallbackAction::Paid(payment_id) => {
            match Payment::find_by_id(pool, payment_id).await? {
                Some(payment) if payment.telegram_id == user_id && payment.status == "pending" => {
                    let keyboard = InlineKeyboardMarkup::new(vec![vec![
                        InlineKeyboardButton::callback(
                            "✅ Confirm payment",
                            format!("payconfirm:{}", payment.id),
                        ),
                    ]]);

                    bot.send_message(
                        ChatId(handler.config.admin_chat_id),
                        format!(
                            "💳 Payment #{} reported as paid\n\n\
                             👤 telegram {}\n📚 {}\n💰 {:.2} {}",
                            payment.id,
                            payment.telegram_id,
                            payment.tariff,
                            payment.amount as f64 / 100.0,
                            payment.currency
                        ),
                    )
                    .reply_markup(keyboard)
                    .await?;

                    bot.send_message(chat, "Thanks! We will confirm your payment shortly.")
                        .await?;
                    None
                }
                Some(_) => Some("This payment cannot be reported.".to_string()),
                None => Some("Payment not found.".to_string()),
            }
        }
        // Admin actions are dispatched before this function is reached.
        _ => None,
    };

    Ok(toast)
}

async fn admin_action(
    bot: &Bot,
    chat: ChatId,
    user_id: i64,
    handler: &BotHandler,
    action: CallbackAction,
) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
    let pool = &handler.db.pool;

    let toast = match action {
        CallbackAction::Admin(AdminSection::AddSlot) => {
            RegistrationSession::save_step(pool, user_id, "admin_slot_form", None, None, None, None)
                .await?;
            bot.send_message(chat, admin::slot_form_help()).await?;
            None
        }
        CallbackAction::Admin(AdminSection::Slots) => {
            let slots = Slot::free(pool).await?;
            if slots.is_empty() {
                bot.send_message(chat, "No free slots.").await?;
            } else {
                bot.send_message(chat, "🗑 Tap a slot to delete it:")
                    .reply_markup(admin::free_slots_delete_keyboard(&slots))
                    .await?;
            }
            None
        }
        CallbackAction::Admin(AdminSection::Students) => {
            let students = Student::all(pool).await?;
            if students.is_empty() {
                bot.send_message(chat, "No students yet.").await?;
            }
            for student in &students {
                bot.send_message(chat, admin::student_card_text(student))
                    .reply_markup(admin::student_card_keyboard(student))
                    .await?;
            }
            None
        }
        CallbackAction::Admin(AdminSection::Bookings) => {
            let bookings = Slot::bookings(pool).await?;
            if bookings.is_empty() {
                bot.send_message(chat, "No bookings.").await?;
            } else {
                let mut report = String::from("📅 All bookings:\n\n");
                for booking in &bookings {
                    report.push_str(&admin::booking_line(booking));
                }
                bot.send_message(chat, report)
                    .reply_markup(admin::bookings_keyboard(&bookings))
                    .await?;
            }
            None
        }
        CallbackAction::Admin(AdminSection::BookingsDate) => {
            RegistrationSession::save_step(
                pool,
                user_id,
                "admin_date_filter",
                None,
                None,
                None,
                None,
            )
            .await?;
            bot.send_message(chat, "Send the date as DD.MM.YYYY.").await?;
            None
        }
        CallbackAction::Admin(AdminSection::Teachers) => {
            let teachers = Teacher::list_active(pool).await?;
            if teachers.is_empty() {
                bot.send_message(chat, "No active teachers.").await?;
            } else {
                bot.send_message(chat, admin::teachers_text(&teachers))
                    .reply_markup(admin::teachers_keyboard(&teachers))
                    .await?;
            }
            None
        }
        CallbackAction::Admin(AdminSection::AddTeacher) => {
            RegistrationSession::save_step(
                pool,
                user_id,
                "admin_teacher_form",
                None,
                None,
                None,
                None,
            )
            .await?;
            bot.send_message(chat, admin::teacher_form_help()).await?;
            None
        }
        CallbackAction::Admin(AdminSection::History) => {
            let records = LessonRecord::recent(pool, 20).await?;
            bot.send_message(chat, admin::history_text(&records)).await?;
            None
        }
        CallbackAction::Admin(AdminSection::Stats) => {
            let stats = SchoolStats::collect(pool).await?;
            bot.send_message(chat, admin::stats_text(&stats)).await?;
            None
        }
        CallbackAction::ConfirmPayment(payment_id) => {
            match handler
                .payments
                .confirm(pool, &handler.ledger, payment_id, None)
                .await?
            {
                Some(settled) => {
                    notify_settled(bot, handler.config.admin_chat_id, &settled).await;
                    Some("Payment confirmed.".to_string())
                }
                None => Some("Nothing to settle: unknown or already completed.".to_string()),
            }
        }
        CallbackAction::AddLesson(student_id) => {
            if handler.ledger.adjust_balance(student_id, 1).await? {
                Some(balance_toast(pool, student_id, "➕ Lesson added").await?)
            } else {
                Some("Student not found.".to_string())
            }
        }
        CallbackAction::RemoveLesson(student_id) => {
            if handler.ledger.adjust_balance(student_id, -1).await? {
                Some(balance_toast(pool, student_id, "➖ Lesson removed").await?)
            } else {
                Some("The balance is already zero.".to_string())
            }
        }
        CallbackAction::ToggleBlock(student_id) => match Student::toggle_status(pool, student_id)
            .await?
        {
            Some(status) => Some(format!("Status: {status}")),
            None => Some("Student not found.".to_string()),
        },
        CallbackAction::CancelBooking(slot_id) => {
            if handler.ledger.cancel_booking(slot_id).await? {
                Some("Booking cancelled, the credit is refunded.".to_string())
            } else {
                Some("The slot is not booked.".to_string())
            }
        }
        CallbackAction::MarkDone(slot_id) => {
            if handler.ledger.mark_done(slot_id).await? {
                Some("✅ Lesson marked as done.".to_string())
            } else {
                Some("The slot is not booked.".to_string())
            }
        }
        CallbackAction::DeleteSlot(slot_id) => {
            if handler.ledger.delete_slot(slot_id).await? {
                Some("Slot deleted.".to_string())
            } else {
                Some("The slot is booked or missing.".to_string())
            }
        }
        CallbackAction::DeactivateTeacher(teacher_id) => {
            if Teacher::deactivate(pool, teacher_id).await? {
                Some("Teacher deactivated.".to_string())
            } else {
                Some("Teacher not found.".to_string())
            }
        }
        // Student actions are dispatched before this function is reached.
        _ => None,
    };

    Ok(toast)
}

async fn balance_toast(
    pool: &sqlx::SqlitePool,
    student_id: i64,
    prefix: &str,
) -> Result<String, sqlx::Error> {
    let toast = match Student::find_by_id(pool, student_id).await? {
        Some(student) => format!("{} (balance {}).", prefix, student.lessons_balance),
        None => format!("{prefix}."),
    };
    Ok(toast)
}
