//! Invoice creation and payment confirmation.
//!
//! One of two payment paths is selected at startup from configuration:
//! an external checkout provider (confirmation arrives on the webhook
//! below), or the manual path where the admin confirms a reported payment
//! with an inline button. Both paths create a pending payment row at
//! invoice time and credit lessons only through
//! [`Ledger::settle_payment`](crate::database::ledger::Ledger::settle_payment),
//! so a duplicate confirmation is a no-op.

use crate::config::{Config, Tariff};
use crate::database::connection::DatabaseManager;
use crate::database::ledger::{Ledger, SettledPayment};
use crate::database::models::Payment;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info, warn};

#[derive(Clone)]
enum PaymentMode {
    /// Students pay on an external checkout page; the provider calls the
    /// confirmation webhook.
    Provider { checkout_url: String },
    /// Students report the transfer; the admin confirms it in the chat.
    Manual,
}

#[derive(Clone)]
pub struct PaymentFlow {
    mode: PaymentMode,
    tariffs: Vec<Tariff>,
}

/// A freshly created pending payment plus everything the bot needs to show
/// payment instructions.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub payment: Payment,
    pub tariff: Tariff,
    /// Checkout URL in provider mode, `None` in manual mode.
    pub pay_url: Option<String>,
}

impl PaymentFlow {
    pub fn from_config(config: &Config) -> Self {
        let mode = match &config.checkout_url {
            Some(url) => PaymentMode::Provider {
                checkout_url: url.trim_end_matches('/').to_string(),
            },
            None => PaymentMode::Manual,
        };

        Self {
            mode,
            tariffs: config.tariffs(),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.mode, PaymentMode::Manual)
    }

    pub fn tariff(&self, code: &str) -> Option<&Tariff> {
        self.tariffs.iter().find(|t| t.code == code)
    }

    /// Create a pending payment for the chosen tariff. Returns `None` for an
    /// unknown tariff code.
    pub async fn create_invoice(
        &self,
        pool: &SqlitePool,
        telegram_id: i64,
        tariff_code: &str,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let tariff = match self.tariff(tariff_code) {
            Some(tariff) => tariff.clone(),
            None => {
                warn!("Unknown tariff code '{}' from {}", tariff_code, telegram_id);
                return Ok(None);
            }
        };

        let payment = Payment::create_pending(
            pool,
            telegram_id,
            &tariff.code,
            tariff.price,
            &tariff.currency,
        )
        .await?;

        let pay_url = match &self.mode {
            PaymentMode::Provider { checkout_url } => {
                Some(format!("{}/{}", checkout_url, payment.payload))
            }
            PaymentMode::Manual => None,
        };

        info!(
            "Created pending payment #{} ({} {}) for {}",
            payment.id, payment.amount, payment.currency, telegram_id
        );

        Ok(Some(Invoice {
            payment,
            tariff,
            pay_url,
        }))
    }

    /// Confirm a payment: resolve the purchased tariff and settle it through
    /// the ledger. `None` means nothing changed (unknown/duplicate payment
    /// or unknown tariff).
    pub async fn confirm(
        &self,
        pool: &SqlitePool,
        ledger: &Ledger,
        payment_id: i64,
        charge_id: Option<&str>,
    ) -> Result<Option<SettledPayment>, sqlx::Error> {
        let payment = match Payment::find_by_id(pool, payment_id).await? {
            Some(payment) => payment,
            None => return Ok(None),
        };

        let tariff = match self.tariff(&payment.tariff) {
            Some(tariff) => tariff,
            None => {
                warn!(
                    "Payment #{} references unknown tariff '{}'",
                    payment.id, payment.tariff
                );
                return Ok(None);
            }
        };

        let settled = ledger
            .settle_payment(payment_id, charge_id, tariff.lessons)
            .await?;

        if let Some(settled) = &settled {
            info!(
                "Payment #{} settled: {} lessons for {}",
                settled.payment_id, settled.lessons_added, settled.telegram_id
            );
        }

        Ok(settled)
    }
}

#[derive(Clone)]
struct WebhookState {
    bot: Bot,
    db: Arc<DatabaseManager>,
    ledger: Ledger,
    flow: PaymentFlow,
    admin_chat_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmRequest {
    /// The opaque token embedded in the checkout URL at invoice time.
    pub payload: String,
    pub charge_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub settled: bool,
}

/// Router for the payment-provider confirmation callback.
pub fn webhook_router(
    bot: Bot,
    db: Arc<DatabaseManager>,
    ledger: Ledger,
    flow: PaymentFlow,
    admin_chat_id: i64,
) -> Router {
    let state = WebhookState {
        bot,
        db,
        ledger,
        flow,
        admin_chat_id,
    };

    Router::new()
        .route("/payments/confirm", post(confirm_payment))
        .with_state(state)
}

async fn confirm_payment(
    State(state): State<WebhookState>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, StatusCode> {
    // The caller proves knowledge of the checkout token; payment ids never
    // cross this boundary.
    let payment = Payment::find_by_payload(&state.db.pool, &req.payload)
        .await
        .map_err(|e| {
            error!("Payment lookup failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    let payment = match payment {
        Some(payment) => payment,
        None => {
            warn!("Confirmation with unknown payload token");
            return Ok(Json(ConfirmResponse { settled: false }));
        }
    };

    let settled = state
        .flow
        .confirm(
            &state.db.pool,
            &state.ledger,
            payment.id,
            req.charge_id.as_deref(),
        )
        .await
        .map_err(|e| {
            error!("Payment confirmation failed for #{}: {}", payment.id, e);
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    match settled {
        Some(settled) => {
            notify_settled(&state.bot, state.admin_chat_id, &settled).await;
            Ok(Json(ConfirmResponse { settled: true }))
        }
        None => Ok(Json(ConfirmResponse { settled: false })),
    }
}

/// Tell the student and the admin about the credited purchase. Delivery
/// failures are logged and swallowed; the payment is already settled.
pub async fn notify_settled(bot: &Bot, admin_chat_id: i64, settled: &SettledPayment) {
    let student_text = format!(
        "✅ Payment received, {}!\n\n\
         Lessons added: {}\n\
         Your balance: {}\n\n\
         You can now book a lesson from the schedule.",
        settled.student_name, settled.lessons_added, settled.new_balance
    );

    if let Err(e) = bot
        .send_message(ChatId(settled.telegram_id), student_text)
        .await
    {
        warn!("Failed to notify student {}: {}", settled.telegram_id, e);
    }

    let admin_text = format!(
        "🎉 Payment #{} settled\n\n👤 {}\n📚 {}\n➕ {} lessons (balance {})",
        settled.payment_id,
        settled.student_name,
        settled.tariff,
        settled.lessons_added,
        settled.new_balance
    );

    if let Err(e) = bot.send_message(ChatId(admin_chat_id), admin_text).await {
        warn!("Failed to notify admin: {}", e);
    }
}
