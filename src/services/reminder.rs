//! Background lesson reminders.
//!
//! A single recurring job scans claimed slots once per tick. Each threshold
//! (24h and 2h by default) has its own flag on the slot, so every reminder
//! is sent at most once per occupancy; cancellation resets the flags and a
//! rebooked slot gets fresh reminders. A failed delivery leaves the flag
//! unset and is retried on the next tick.

use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::{ReminderKind, UpcomingLesson};
use crate::utils::datetime::{parse_slot_datetime, within_window};
use chrono::Local;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

pub struct ReminderService {
    bot: Bot,
    db: Arc<DatabaseManager>,
    config: Config,
    scheduler: JobScheduler,
}

impl ReminderService {
    pub async fn new(
        bot: Bot,
        db: Arc<DatabaseManager>,
        config: Config,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            bot,
            db,
            config,
            scheduler,
        })
    }

    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bot = self.bot.clone();
        let db = self.db.clone();
        let config = self.config.clone();
        let schedule = format!("0 */{} * * * *", self.config.reminder_check_minutes);

        // The job must outlive any single failing iteration: errors are
        // logged and the next tick runs as usual.
        let reminder_job = Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let bot = bot.clone();
            let db = db.clone();
            let config = config.clone();
            Box::pin(async move {
                if let Err(e) = check_and_send_reminders(bot, db, &config).await {
                    tracing::error!("Reminder run failed: {}", e);
                }
            })
        })?;

        self.scheduler.add(reminder_job).await?;
        self.scheduler.start().await?;

        info!(
            "Reminder service started - checking every {} minutes (thresholds {}h and {}h)",
            self.config.reminder_check_minutes,
            self.config.reminder_first_hours,
            self.config.reminder_second_hours
        );
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    // Manual trigger for testing
    pub async fn check_reminders_now(
        &self,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        check_and_send_reminders(self.bot.clone(), self.db.clone(), &self.config).await
    }
}

async fn check_and_send_reminders(
    bot: Bot,
    db: Arc<DatabaseManager>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let now = Local::now().naive_local();

    let thresholds = [
        (ReminderKind::First, config.reminder_first_hours),
        (ReminderKind::Second, config.reminder_second_hours),
    ];

    for (kind, hours) in thresholds {
        let candidates = UpcomingLesson::unreminded(&db.pool, kind).await?;

        for lesson in candidates {
            let starts_at = match parse_slot_datetime(&lesson.date, &lesson.time) {
                Ok(dt) => dt,
                Err(e) => {
                    warn!("Skipping slot #{} with malformed datetime: {}", lesson.slot_id, e);
                    continue;
                }
            };

            if !within_window(starts_at, now, hours) {
                continue;
            }

            // The flag is only set after a successful send, so a failed
            // delivery is retried on the next tick.
            if send_lesson_reminder(&bot, &lesson, hours).await {
                UpcomingLesson::mark_reminded(&db.pool, lesson.slot_id, kind).await?;
                info!(
                    "Sent {}h reminder for slot #{} to {}",
                    hours, lesson.slot_id, lesson.telegram_id
                );
            }
        }
    }

    Ok(())
}

async fn send_lesson_reminder(bot: &Bot, lesson: &UpcomingLesson, hours: i64) -> bool {
    let message_text = format!(
        "⏰ Reminder!\n\n\
         Your lesson starts within {} hour{}:\n\
         📅 {} at {}\n\
         👩‍🏫 {}\n\
         🔗 {}",
        hours,
        if hours == 1 { "" } else { "s" },
        lesson.date,
        lesson.time,
        lesson.teacher,
        lesson.meeting_link
    );

    match bot
        .send_message(ChatId(lesson.telegram_id), message_text)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(
                "Failed to send reminder to {}: {}",
                lesson.telegram_id,
                e
            );
            false
        }
    }
}
