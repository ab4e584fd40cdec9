use lambda_runtime::tracing;
use serde_json::Value;

use crate::AppState;
use crate::error::AppError;
use crate::metrics::NIGHTLY_EMAILS_SENT;
use crate::models::NightlyEmailResponse;

/// Sends the daily report to the admin address. Runs both from the scheduler
/// and from `POST /tasks/nightly-email`.
pub async fn nightly_email(state: &AppState) -> anyhow::Result<Value> {
    let config = state.config();
    let recipient = config
        .admin_email()
        .ok_or_else(|| AppError::validation("ADMIN_EMAIL is not configured"))?;

    let mail = state.connections().mail(config.from_email())?;
    let message_id = mail
        .send_daily_report(vec![recipient.to_string()], None)
        .await
        .map_err(|err| AppError::app(format!("Failed to send nightly email: {err}")))?;

    state.metrics().count(NIGHTLY_EMAILS_SENT);
    tracing::info!("Nightly email {} sent to {}", message_id, recipient);

    Ok(serde_json::to_value(NightlyEmailResponse {
        message: "Nightly email sent successfully",
        message_id,
        recipient: recipient.to_string(),
    })?)
}
