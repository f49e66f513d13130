//! Transaction endpoints: charge, authorize, and prior-auth capture with
//! its order-record write-back.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    dtos::{CaptureRequest, ChargeRequest, TransactionApiResponse},
    error::AppError,
    models::TransactionKind,
    services::authorizenet::TransactionOutcome,
    services::metrics::{CAPTURES_RECONCILED_TOTAL, TRANSACTIONS_TOTAL},
    AppState,
};

fn transaction_envelope(message: &str, kind: TransactionKind, outcome: TransactionOutcome) -> TransactionApiResponse {
    TransactionApiResponse {
        is_success: true,
        message: message.to_string(),
        action: Some(kind.as_str().to_string()),
        transaction_id: Some(outcome.trans_id.clone()),
        transaction: Some(outcome),
        order_recorded: None,
    }
}

fn record_transaction(kind: TransactionKind, outcome: &str) {
    TRANSACTIONS_TOTAL
        .with_label_values(&[kind.as_str(), outcome])
        .inc();
}

/// Charge a stored payment profile. Captures immediately unless the body
/// asks for authorization only.
pub async fn charge(
    State(state): State<AppState>,
    Json(payload): Json<ChargeRequest>,
) -> Result<(StatusCode, Json<TransactionApiResponse>), AppError> {
    payload.validate()?;

    let kind = match payload.transaction_type {
        Some(TransactionKind::AuthOnlyTransaction) => TransactionKind::AuthOnlyTransaction,
        _ => TransactionKind::AuthCaptureTransaction,
    };

    tracing::info!(
        profile_id = %payload.profile_id,
        payment_profile_id = %payload.payment_profile_id,
        amount = %payload.amount,
        kind = kind.as_str(),
        "Charging customer profile"
    );

    let outcome = state
        .gateway
        .charge_customer_profile(
            &payload.profile_id,
            &payload.payment_profile_id,
            &payload.amount,
            payload.invoice_number.as_deref(),
            payload.description.as_deref(),
            kind,
        )
        .await
        .map_err(|e| {
            record_transaction(kind, "error");
            e
        })?;
    record_transaction(kind, "ok");

    tracing::info!(trans_id = %outcome.trans_id, "Transaction successful");

    Ok((
        StatusCode::CREATED,
        Json(transaction_envelope("Transaction successful.", kind, outcome)),
    ))
}

/// Authorize without capturing; the storefront captures later through
/// `POST /transactions/capture`.
pub async fn authorize(
    State(state): State<AppState>,
    Json(payload): Json<ChargeRequest>,
) -> Result<(StatusCode, Json<TransactionApiResponse>), AppError> {
    payload.validate()?;

    let kind = TransactionKind::AuthOnlyTransaction;
    tracing::info!(
        profile_id = %payload.profile_id,
        payment_profile_id = %payload.payment_profile_id,
        amount = %payload.amount,
        "Authorizing customer profile"
    );

    let outcome = state
        .gateway
        .authorize_customer_profile(
            &payload.profile_id,
            &payload.payment_profile_id,
            &payload.amount,
        )
        .await
        .map_err(|e| {
            record_transaction(kind, "error");
            e
        })?;
    record_transaction(kind, "ok");

    tracing::info!(trans_id = %outcome.trans_id, "Transaction authorized");

    Ok((
        StatusCode::CREATED,
        Json(transaction_envelope(
            "Transaction authorized successfully.",
            kind,
            outcome,
        )),
    ))
}

/// Capture a previously authorized transaction, then record the outcome
/// on the matching order row.
///
/// The write-back is best effort and deliberately not transactional with
/// the gateway call: once the capture succeeds, funds have moved, so a
/// failed write must not turn the response into a payment failure. It is
/// reported as its own critical condition instead.
pub async fn capture(
    State(state): State<AppState>,
    Json(payload): Json<CaptureRequest>,
) -> Result<(StatusCode, Json<TransactionApiResponse>), AppError> {
    payload.validate()?;

    let kind = TransactionKind::PriorAuthCaptureTransaction;
    tracing::info!(
        ref_trans_id = %payload.ref_trans_id,
        amount = ?payload.amount,
        "Capturing prior-auth transaction"
    );

    let outcome = state
        .gateway
        .capture_prior_auth(&payload.ref_trans_id, payload.amount.as_deref())
        .await
        .map_err(|e| {
            record_transaction(kind, "error");
            e
        })?;
    record_transaction(kind, "ok");

    // Serialize the envelope before touching the database; the serialized
    // copy is what lands in the order row's result history.
    let envelope = transaction_envelope(
        "Previously authorized transaction captured successfully.",
        kind,
        outcome,
    );
    let serialized = serde_json::to_string(&envelope).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Failed to serialize capture response: {}", e))
    })?;

    let new_trans_id = envelope.transaction_id.clone().unwrap_or_default();
    match state
        .orders
        .record_capture(&payload.ref_trans_id, &new_trans_id, &serialized)
        .await
    {
        Ok(rows) => {
            if rows == 0 {
                tracing::warn!(
                    ref_trans_id = %payload.ref_trans_id,
                    "No order row matched the capture reference"
                );
            }
            CAPTURES_RECONCILED_TOTAL
                .with_label_values(&["recorded"])
                .inc();

            Ok((
                StatusCode::CREATED,
                Json(TransactionApiResponse {
                    order_recorded: Some(true),
                    ..envelope
                }),
            ))
        }
        Err(e) => {
            // Money has moved; the payment stays reported as successful
            // while the stale order record is flagged on its own.
            tracing::error!(
                ref_trans_id = %payload.ref_trans_id,
                new_trans_id = %new_trans_id,
                error = %e,
                "Capture succeeded but order record update failed"
            );
            CAPTURES_RECONCILED_TOTAL
                .with_label_values(&["failed"])
                .inc();

            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TransactionApiResponse {
                    message: "CRITICAL: payment was processed but the order record was not updated"
                        .to_string(),
                    order_recorded: Some(false),
                    ..envelope
                }),
            ))
        }
    }
}
