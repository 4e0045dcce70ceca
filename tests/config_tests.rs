use langschool_bot::config::Config;
use std::env;
use std::sync::Mutex;

// Environment variables are process-wide, so these tests take turns.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const ALL_VARS: &[&str] = &[
    "TELEGRAM_BOT_TOKEN",
    "ADMIN_CHAT_ID",
    "DATABASE_URL",
    "HTTP_PORT",
    "CHECKOUT_URL",
    "REMINDER_CHECK_MINUTES",
    "REMINDER_FIRST_HOURS",
    "REMINDER_SECOND_HOURS",
    "CANCEL_LEAD_HOURS",
];

fn with_env(vars: &[(&str, &str)], check: impl FnOnce()) {
    let _guard = ENV_LOCK.lock().unwrap();

    for var in ALL_VARS {
        env::remove_var(var);
    }
    for (var, value) in vars {
        env::set_var(var, value);
    }

    check();

    for var in ALL_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_minimal_config_gets_defaults() {
    with_env(
        &[("TELEGRAM_BOT_TOKEN", "token"), ("ADMIN_CHAT_ID", "42")],
        || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.telegram_bot_token, "token");
            assert_eq!(config.admin_chat_id, 42);
            assert_eq!(config.database_url, "sqlite:./data/school.db");
            assert_eq!(config.http_port, 3000);
            assert_eq!(config.checkout_url, None);
            assert_eq!(config.reminder_check_minutes, 5);
            assert_eq!(config.reminder_first_hours, 24);
            assert_eq!(config.reminder_second_hours, 2);
            assert_eq!(config.cancel_lead_hours, 24);
        },
    );
}

#[test]
fn test_missing_required_vars_fail() {
    with_env(&[("ADMIN_CHAT_ID", "42")], || {
        assert!(Config::from_env().is_err());
    });
    with_env(&[("TELEGRAM_BOT_TOKEN", "token")], || {
        assert!(Config::from_env().is_err());
    });
    with_env(
        &[("TELEGRAM_BOT_TOKEN", "   "), ("ADMIN_CHAT_ID", "42")],
        || {
            assert!(Config::from_env().is_err());
        },
    );
}

#[test]
fn test_overrides_are_applied() {
    with_env(
        &[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("ADMIN_CHAT_ID", "42"),
            ("DATABASE_URL", "sqlite:./other.db"),
            ("HTTP_PORT", "8080"),
            ("CHECKOUT_URL", "https://pay.example/c"),
            ("REMINDER_CHECK_MINUTES", "10"),
            ("REMINDER_FIRST_HOURS", "48"),
            ("REMINDER_SECOND_HOURS", "1"),
            ("CANCEL_LEAD_HOURS", "12"),
        ],
        || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.database_url, "sqlite:./other.db");
            assert_eq!(config.http_port, 8080);
            assert_eq!(config.checkout_url.as_deref(), Some("https://pay.example/c"));
            assert_eq!(config.reminder_check_minutes, 10);
            assert_eq!(config.reminder_first_hours, 48);
            assert_eq!(config.reminder_second_hours, 1);
            assert_eq!(config.cancel_lead_hours, 12);
        },
    );
}

#[test]
fn test_reminder_interval_must_fit_cron_minutes() {
    for bad in ["0", "60", "oops"] {
        with_env(
            &[
                ("TELEGRAM_BOT_TOKEN", "token"),
                ("ADMIN_CHAT_ID", "42"),
                ("REMINDER_CHECK_MINUTES", bad),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}

#[test]
fn test_tariff_catalog_lookup() {
    with_env(
        &[("TELEGRAM_BOT_TOKEN", "token"), ("ADMIN_CHAT_ID", "42")],
        || {
            let config = Config::from_env().unwrap();
            let tariffs = config.tariffs();
            assert_eq!(tariffs.len(), 3);

            let standard = config.find_tariff("standard").unwrap();
            assert_eq!(standard.lessons, 16);
            assert_eq!(standard.price, 14000);
            assert_eq!(standard.currency, "EUR");

            assert!(config.find_tariff("platinum").is_none());
        },
    );
}
