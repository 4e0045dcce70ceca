//! Admin-panel keyboards and message texts.

use crate::database::models::{BookingView, LessonRecord, Slot, Student, Teacher};
use crate::services::stats::SchoolStats;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub fn admin_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("➕ Add slots", "admin:addslot"),
            InlineKeyboardButton::callback("🗑 Delete slot", "admin:slots"),
        ],
        vec![
            InlineKeyboardButton::callback("👥 Students", "admin:students"),
            InlineKeyboardButton::callback("📊 Statistics", "admin:stats"),
        ],
        vec![
            InlineKeyboardButton::callback("📅 All bookings", "admin:bookings"),
            InlineKeyboardButton::callback("📅 Bookings by date", "admin:bookingsdate"),
        ],
        vec![
            InlineKeyboardButton::callback("👩‍🏫 Teachers", "admin:teachers"),
            InlineKeyboardButton::callback("➕ Add teacher", "admin:addteacher"),
        ],
        vec![InlineKeyboardButton::callback(
            "✅ Completed lessons",
            "admin:history",
        )],
    ])
}

pub fn student_card_text(student: &Student) -> String {
    let status = if student.is_active() {
        "✅ Active"
    } else {
        "❌ Blocked"
    };

    format!(
        "👤 {}  (id {})\n📧 {}\n📚 {}\nBalance: {}   Status: {}",
        student.name, student.id, student.email, student.tariff, student.lessons_balance, status
    )
}

pub fn student_card_keyboard(student: &Student) -> InlineKeyboardMarkup {
    let block_label = if student.is_active() {
        "🚫 Block"
    } else {
        "✅ Unblock"
    };

    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("➕ Lesson", format!("addlesson:{}", student.id)),
            InlineKeyboardButton::callback("➖ Lesson", format!("rmlesson:{}", student.id)),
        ],
        vec![InlineKeyboardButton::callback(
            block_label,
            format!("block:{}", student.id),
        )],
    ])
}

pub fn booking_line(b: &BookingView) -> String {
    format!(
        "[#{}] 👤 {} — 👩‍🏫 {}\n📅 {} {}  🔗 {}\n",
        b.slot_id, b.student_name, b.teacher, b.date, b.time, b.meeting_link
    )
}

pub fn bookings_keyboard(bookings: &[BookingView]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = bookings
        .iter()
        .map(|b| {
            vec![
                InlineKeyboardButton::callback(
                    format!("❌ Cancel #{}", b.slot_id),
                    format!("cancelbook:{}", b.slot_id),
                ),
                InlineKeyboardButton::callback(
                    format!("✅ Done #{}", b.slot_id),
                    format!("done:{}", b.slot_id),
                ),
            ]
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

pub fn free_slots_delete_keyboard(slots: &[Slot]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = slots
        .iter()
        .map(|s| {
            vec![InlineKeyboardButton::callback(
                format!("🗑 #{} {} {} — {}", s.id, s.date, s.time, s.teacher),
                format!("delslot:{}", s.id),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

pub fn teachers_keyboard(teachers: &[Teacher]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = teachers
        .iter()
        .map(|t| {
            vec![InlineKeyboardButton::callback(
                format!("🚫 Deactivate {}", t.name),
                format!("deactteacher:{}", t.id),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

pub fn teachers_text(teachers: &[Teacher]) -> String {
    let mut text = String::from("👩‍🏫 Active teachers:\n\n");
    for t in teachers {
        text.push_str(&format!("• {} — {}\n", t.name, t.meeting_link));
    }
    text
}

pub fn history_text(records: &[LessonRecord]) -> String {
    if records.is_empty() {
        return "No completed lessons yet.".to_string();
    }

    let mut text = String::from("✅ Recently completed lessons:\n\n");
    for r in records {
        text.push_str(&format!(
            "student #{} — {} on {} at {}\n",
            r.student_id, r.teacher, r.date, r.time
        ));
    }
    text
}

pub fn stats_text(stats: &SchoolStats) -> String {
    format!(
        "📊 School statistics\n\n\
         👥 Students: {} total, {} active\n\
         💰 Revenue: {} total, {} this month (minor units)\n\
         ✅ Lessons completed: {}\n\
         💳 Paying students: {}\n\
         📈 Conversion: {:.1}%",
        stats.total_students,
        stats.active_students,
        stats.revenue_total,
        stats.revenue_month,
        stats.lessons_completed,
        stats.paying_students,
        stats.conversion_pct
    )
}

pub fn slot_form_help() -> &'static str {
    "Enter the slot details:\n\n\
     Teacher name\n\
     DD.MM.YYYY\n\
     HH:MM (or several: 09:00, 10:00, 11:00)\n\
     Meeting link (optional if the teacher has a default one)\n\n\
     Example:\n\
     Anna\n\
     28.02.2026\n\
     14:00\n\
     https://meet.example/j/123"
}

pub fn teacher_form_help() -> &'static str {
    "Enter the teacher details:\n\n\
     Name\n\
     Default meeting link\n\n\
     Example:\n\
     Anna\n\
     https://meet.example/anna"
}
