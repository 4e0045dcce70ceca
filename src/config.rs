use anyhow::{anyhow, Result};
use std::env;

/// A named bundle of prepaid lesson credits at a fixed price.
#[derive(Debug, Clone)]
pub struct Tariff {
    /// Stable identifier carried in callback payloads.
    pub code: String,
    /// Human-readable name shown in menus.
    pub title: String,
    /// Number of lesson credits the bundle grants.
    pub lessons: i64,
    /// Price in minor currency units.
    pub price: i64,
    /// ISO currency code.
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub admin_chat_id: i64,
    pub database_url: String,
    pub http_port: u16,
    /// Base URL of the external checkout page. When unset the bot runs the
    /// manual payment-confirmation flow instead.
    pub checkout_url: Option<String>,
    /// How often the reminder job runs, in minutes.
    pub reminder_check_minutes: u32,
    /// Lead times (hours before a lesson) for the two reminder thresholds.
    pub reminder_first_hours: i64,
    pub reminder_second_hours: i64,
    /// Minimum lead time (hours) for a student to cancel their own booking.
    pub cancel_lead_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let admin_chat_id = env::var("ADMIN_CHAT_ID")
            .map_err(|_| anyhow!("ADMIN_CHAT_ID must be set"))?
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid ADMIN_CHAT_ID"))?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/school.db".to_string());
        let database_url = if database_url.trim().is_empty() {
            "sqlite:./data/school.db".to_string()
        } else {
            database_url
        };

        let http_port = parse_or("HTTP_PORT", 3000u16)?;
        let checkout_url = env::var("CHECKOUT_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let reminder_check_minutes: u32 = parse_or("REMINDER_CHECK_MINUTES", 5)?;
        if reminder_check_minutes == 0 || reminder_check_minutes > 59 {
            return Err(anyhow!("REMINDER_CHECK_MINUTES must be between 1 and 59"));
        }

        let reminder_first_hours = parse_or("REMINDER_FIRST_HOURS", 24i64)?;
        let reminder_second_hours = parse_or("REMINDER_SECOND_HOURS", 2i64)?;
        if reminder_first_hours <= 0 || reminder_second_hours <= 0 {
            return Err(anyhow!("Reminder thresholds must be positive"));
        }

        let cancel_lead_hours = parse_or("CANCEL_LEAD_HOURS", 24i64)?;

        Ok(Config {
            telegram_bot_token: token,
            admin_chat_id,
            database_url,
            http_port,
            checkout_url,
            reminder_check_minutes,
            reminder_first_hours,
            reminder_second_hours,
            cancel_lead_hours,
        })
    }

    /// The tariff catalog offered during registration and repurchase.
    pub fn tariffs(&self) -> Vec<Tariff> {
        vec![
            Tariff {
                code: "start".to_string(),
                title: "🥉 Start — 8 lessons".to_string(),
                lessons: 8,
                price: 8000,
                currency: "EUR".to_string(),
            },
            Tariff {
                code: "standard".to_string(),
                title: "🥈 Standard — 16 lessons".to_string(),
                lessons: 16,
                price: 14000,
                currency: "EUR".to_string(),
            },
            Tariff {
                code: "premium".to_string(),
                title: "🥇 Premium — 24 lessons".to_string(),
                lessons: 24,
                price: 19000,
                currency: "EUR".to_string(),
            },
        ]
    }

    pub fn find_tariff(&self, code: &str) -> Option<Tariff> {
        self.tariffs().into_iter().find(|t| t.code == code)
    }
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> Result<T> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid {var}")),
        Err(_) => Ok(default),
    }
}
