//! Student-facing keyboards and message texts. All buttons carry explicit
//! `tag:payload` callback data routed by
//! [`CallbackAction`](crate::bot::handlers::callback::CallbackAction).

use crate::config::Tariff;
use crate::database::models::{Slot, Student};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub fn main_menu(registered: bool) -> InlineKeyboardMarkup {
    let rows = if registered {
        vec![
            vec![InlineKeyboardButton::callback("📅 Schedule", "menu:slots")],
            vec![InlineKeyboardButton::callback("📚 My lessons", "menu:lessons")],
            vec![InlineKeyboardButton::callback("👤 Profile", "menu:profile")],
            vec![InlineKeyboardButton::callback("💳 Buy lessons", "menu:buy")],
        ]
    } else {
        vec![vec![InlineKeyboardButton::callback(
            "📝 Register",
            "menu:register",
        )]]
    };

    InlineKeyboardMarkup::new(rows)
}

pub fn tariff_keyboard(tariffs: &[Tariff]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = tariffs
        .iter()
        .map(|t| {
            vec![InlineKeyboardButton::callback(
                t.title.clone(),
                format!("tariff:{}", t.code),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

pub fn free_slots_keyboard(slots: &[Slot]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = slots
        .iter()
        .map(|s| {
            vec![InlineKeyboardButton::callback(
                format!("📅 {} {} — {}", s.date, s.time, s.teacher),
                format!("book:{}", s.id),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

pub fn my_lessons_keyboard(slots: &[Slot]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = slots
        .iter()
        .map(|s| {
            vec![InlineKeyboardButton::callback(
                format!("❌ Cancel {} {}", s.date, s.time),
                format!("cancelown:{}", s.id),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

pub fn my_lessons_text(student: &Student, slots: &[Slot]) -> String {
    let mut text = format!(
        "📚 My lessons\n\nLessons on balance: {}\n\n",
        student.lessons_balance
    );

    if slots.is_empty() {
        text.push_str("No bookings yet.\nOpen 📅 Schedule to book a lesson.");
    } else {
        text.push_str("Upcoming lessons:\n\n");
        for s in slots {
            text.push_str(&format!(
                "📅 {} at {} — {}\n🔗 {}\n\n",
                s.date, s.time, s.teacher, s.meeting_link
            ));
        }
    }

    text
}

pub fn profile_text(student: &Student, tariff_title: &str) -> String {
    let status = if student.is_active() {
        "✅ Active"
    } else {
        "❌ Blocked"
    };

    format!(
        "👤 Profile\n\n\
         Name: {}\n\
         Email: {}\n\
         Tariff: {}\n\
         Timezone: {}\n\
         Lessons on balance: {}\n\
         Status: {}",
        student.name, student.email, tariff_title, student.timezone, student.lessons_balance, status
    )
}

pub fn booked_text(slot: &Slot) -> String {
    format!(
        "✅ You are booked!\n\n\
         📅 Date: {}\n\
         🕐 Time: {}\n\
         👩‍🏫 Teacher: {}\n\
         🔗 Link: {}",
        slot.date, slot.time, slot.teacher, slot.meeting_link
    )
}
