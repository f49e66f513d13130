//! Request/response shapes for the local HTTP surface.
//!
//! Field names stay aligned with what the storefront already sends; the
//! wire shapes of the gateway itself live with the client in
//! `services::authorizenet`.

use crate::models::{TransactionKind, ValidationMode};
use crate::services::authorizenet::{CreditCard, CustomerAddress, CustomerProfile, Payment, TransactionOutcome};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The legacy storefront escapes single quotes as `\'`, which is not valid
/// JSON string escaping. Undo it before decoding.
pub fn sanitize_storefront_body(body: &str) -> String {
    body.replace("\\'", "'")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub profile: CustomerProfile,
    /// Overrides the environment-derived validation mode when present.
    #[serde(default)]
    pub validation_mode: Option<ValidationMode>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileResponse {
    pub customer_profile_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub email: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct AddShippingAddressRequest {
    pub address: CustomerAddress,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShippingAddressResponse {
    pub customer_address_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentProfileRequest {
    pub credit_card: CreditCard,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentProfileResponse {
    pub customer_payment_profile_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentProfileRequest {
    pub payment: Payment,
    #[serde(default)]
    pub bill_to: Option<CustomerAddress>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBillingAddressRequest {
    pub address: CustomerAddress,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body for `POST /transactions` and `POST /transactions/authorize`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ChargeRequest {
    #[validate(length(min = 1, message = "profileId is required"))]
    pub profile_id: String,
    #[validate(length(min = 1, message = "paymentProfileId is required"))]
    pub payment_profile_id: String,
    #[validate(length(min = 1, message = "amount is required"))]
    pub amount: String,
    pub invoice_number: Option<String>,
    pub description: Option<String>,
    /// Only `authOnlyTransaction` changes behavior; anything else charges
    /// and captures in one step.
    pub transaction_type: Option<TransactionKind>,
}

/// Body for `POST /transactions/capture`. Amount omitted means "capture
/// the full authorized amount".
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureRequest {
    #[validate(length(min = 1, message = "refTransId is required"))]
    pub ref_trans_id: String,
    pub amount: Option<String>,
}

/// Uniform envelope for transaction endpoints. `is_success` reflects the
/// payment itself; `order_recorded` reflects the capture write-back and is
/// only present on capture responses.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionApiResponse {
    pub is_success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_recorded: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizer_fixes_escaped_single_quotes() {
        let raw = r#"{"profile":{"description":"O\'Brien\'s order","email":"ob@example.com"}}"#;
        let sanitized = sanitize_storefront_body(raw);
        let parsed: serde_json::Value = serde_json::from_str(&sanitized).unwrap();
        assert_eq!(parsed["profile"]["description"], "O'Brien's order");
    }

    #[test]
    fn sanitizer_leaves_valid_bodies_alone() {
        let raw = r#"{"refTransId":"60123456789","amount":"10.00"}"#;
        assert_eq!(sanitize_storefront_body(raw), raw);
    }

    #[test]
    fn charge_request_tolerates_missing_fields_for_validation() {
        let req: ChargeRequest = serde_json::from_str(r#"{"amount":"10.00"}"#).unwrap();
        assert!(req.validate().is_err());
        assert_eq!(req.amount, "10.00");
        assert!(req.profile_id.is_empty());
    }

    #[test]
    fn capture_request_requires_ref_trans_id() {
        let req: CaptureRequest = serde_json::from_str(r#"{"amount":"10.00"}"#).unwrap();
        assert!(req.validate().is_err());

        let req: CaptureRequest =
            serde_json::from_str(r#"{"refTransId":"60123456789"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.amount.is_none());
    }

    #[test]
    fn transaction_envelope_omits_absent_fields() {
        let envelope = TransactionApiResponse {
            is_success: true,
            message: "Transaction successful.".to_string(),
            ..TransactionApiResponse::default()
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["is_success"], true);
        assert!(json.get("transaction").is_none());
        assert!(json.get("order_recorded").is_none());
    }
}
