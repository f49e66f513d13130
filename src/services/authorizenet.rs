//! Authorize.Net gateway client.
//!
//! Every operation serializes one named request envelope, POSTs it as JSON
//! to the configured endpoint, and decodes the gateway's response envelope.
//! Outcomes are classified once, at decode time, via the `messages.resultCode`
//! field that every response carries.

use crate::config::AuthorizeNetConfig;
use crate::models::{TransactionKind, ValidationMode};
use crate::services::metrics::{GATEWAY_REQUESTS_TOTAL, GATEWAY_REQUEST_DURATION};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const SANDBOX_ENDPOINT: &str = "https://apitest.authorize.net/xml/v1/request.api";
pub const PRODUCTION_ENDPOINT: &str = "https://api.authorize.net/xml/v1/request.api";

/// Page size used when enumerating customer profile ids.
const PROFILE_IDS_PAGE_LIMIT: usize = 1000;

/// Fallback when the gateway reports failure without any message.
const UNKNOWN_ERROR_TEXT: &str = "unknown error from gateway";

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// Errors surfaced by gateway calls. Never retried here.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to reach payment gateway: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode gateway response: {source}. Body received: {body}")]
    Decode {
        source: serde_json::Error,
        body: String,
    },

    #[error("gateway rejected request: {text} (code {code})")]
    Rejected { code: String, text: String },
}

/// Gateway result status, decoded once at the boundary.
///
/// The live Authorize.Net JSON contract uses the literal `"Ok"`; anything
/// else (including the `"OK"` spelling some client libraries emit) is a
/// failure. The default covers empty response bodies, which the gateway
/// sends for some successful mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResultCode {
    #[default]
    Ok,
    #[serde(other)]
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseMessages {
    pub result_code: ResultCode,
    pub message: Vec<ResponseMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseMessage {
    pub code: String,
    pub text: String,
}

impl ResponseMessages {
    /// Classify the envelope, surfacing the first message on failure.
    pub fn into_result(self) -> Result<(), GatewayError> {
        match self.result_code {
            ResultCode::Ok => Ok(()),
            ResultCode::Error => {
                let (code, text) = self
                    .message
                    .into_iter()
                    .next()
                    .map(|m| (m.code, m.text))
                    .unwrap_or_else(|| ("unknown".to_string(), UNKNOWN_ERROR_TEXT.to_string()));
                Err(GatewayError::Rejected { code, text })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAuthentication {
    pub name: String,
    pub transaction_key: String,
}

// ---------------------------------------------------------------------------
// Customer profile wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerProfile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub customer_profile_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub merchant_customer_id: String,
    pub description: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub profile_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payment_profiles: Vec<PaymentProfile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ship_to_list: Vec<CustomerAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentProfile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub customer_payment_profile_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub customer_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_to: Option<CustomerAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payment {
    pub credit_card: CreditCard,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreditCard {
    pub card_number: String,
    pub expiration_date: String,
}

/// Postal address attached to a profile, as billing or shipping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerAddress {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub customer_address_id: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

// ---------------------------------------------------------------------------
// Request envelopes (one named type per operation)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCustomerProfileRequest {
    merchant_authentication: MerchantAuthentication,
    profile: CustomerProfile,
    validation_mode: ValidationMode,
}

#[derive(Serialize)]
struct CreateCustomerProfileEnvelope {
    #[serde(rename = "createCustomerProfileRequest")]
    request: CreateCustomerProfileRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetCustomerProfileRequest {
    merchant_authentication: MerchantAuthentication,
    customer_profile_id: String,
}

#[derive(Serialize)]
struct GetCustomerProfileEnvelope {
    #[serde(rename = "getCustomerProfileRequest")]
    request: GetCustomerProfileRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Paging {
    limit: usize,
    offset: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetCustomerProfileIdsRequest {
    merchant_authentication: MerchantAuthentication,
    paging: Paging,
}

#[derive(Serialize)]
struct GetCustomerProfileIdsEnvelope {
    #[serde(rename = "getCustomerProfileIdsRequest")]
    request: GetCustomerProfileIdsRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateableProfile {
    customer_profile_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCustomerProfileRequest {
    merchant_authentication: MerchantAuthentication,
    profile: UpdateableProfile,
}

#[derive(Serialize)]
struct UpdateCustomerProfileEnvelope {
    #[serde(rename = "updateCustomerProfileRequest")]
    request: UpdateCustomerProfileRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCustomerShippingAddressRequest {
    merchant_authentication: MerchantAuthentication,
    customer_profile_id: String,
    address: CustomerAddress,
}

#[derive(Serialize)]
struct CreateCustomerShippingAddressEnvelope {
    #[serde(rename = "createCustomerShippingAddressRequest")]
    request: CreateCustomerShippingAddressRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteCustomerShippingAddressRequest {
    merchant_authentication: MerchantAuthentication,
    customer_profile_id: String,
    customer_address_id: String,
}

#[derive(Serialize)]
struct DeleteCustomerShippingAddressEnvelope {
    #[serde(rename = "deleteCustomerShippingAddressRequest")]
    request: DeleteCustomerShippingAddressRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCustomerPaymentProfileRequest {
    merchant_authentication: MerchantAuthentication,
    customer_profile_id: String,
    payment_profile: PaymentProfile,
}

#[derive(Serialize)]
struct CreateCustomerPaymentProfileEnvelope {
    #[serde(rename = "createCustomerPaymentProfileRequest")]
    request: CreateCustomerPaymentProfileRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCustomerPaymentProfileRequest {
    merchant_authentication: MerchantAuthentication,
    customer_profile_id: String,
    payment_profile: PaymentProfile,
}

#[derive(Serialize)]
struct UpdateCustomerPaymentProfileEnvelope {
    #[serde(rename = "updateCustomerPaymentProfileRequest")]
    request: UpdateCustomerPaymentProfileRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteCustomerPaymentProfileRequest {
    merchant_authentication: MerchantAuthentication,
    customer_profile_id: String,
    customer_payment_profile_id: String,
}

#[derive(Serialize)]
struct DeleteCustomerPaymentProfileEnvelope {
    #[serde(rename = "deleteCustomerPaymentProfileRequest")]
    request: DeleteCustomerPaymentProfileRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderFields {
    #[serde(skip_serializing_if = "String::is_empty")]
    invoice_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentProfileRef {
    payment_profile_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePaymentRef {
    customer_profile_id: String,
    payment_profile: PaymentProfileRef,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest {
    transaction_type: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<ProfilePaymentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<OrderFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_trans_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTransactionRequest {
    merchant_authentication: MerchantAuthentication,
    transaction_request: TransactionRequest,
}

#[derive(Serialize)]
struct CreateTransactionEnvelope {
    #[serde(rename = "createTransactionRequest")]
    request: CreateTransactionRequest,
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateCustomerProfileResponse {
    customer_profile_id: String,
    messages: ResponseMessages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GetCustomerProfileResponse {
    profile: CustomerProfile,
    messages: ResponseMessages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GetCustomerProfileIdsResponse {
    ids: Vec<String>,
    #[allow(dead_code)]
    total_num_in_result_set: i64,
    messages: ResponseMessages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateCustomerShippingAddressResponse {
    customer_address_id: String,
    messages: ResponseMessages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateCustomerPaymentProfileResponse {
    customer_payment_profile_id: String,
    messages: ResponseMessages,
}

/// Envelope for operations whose only interesting payload is the status.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BareResponse {
    messages: ResponseMessages,
}

/// Transaction detail returned alongside the outer result envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionOutcome {
    pub response_code: String,
    pub auth_code: String,
    pub avs_result_code: String,
    pub cvv_result_code: String,
    pub trans_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<TransactionMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TransactionErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionMessage {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionErrorDetail {
    pub error_code: String,
    pub error_text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateTransactionResponse {
    transaction_response: TransactionOutcome,
    messages: ResponseMessages,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authorize.Net client. Stateless beyond the credential and endpoint
/// fixed at startup; cheap to clone.
#[derive(Clone)]
pub struct AuthorizeNetClient {
    http: reqwest::Client,
    auth: MerchantAuthentication,
    endpoint: String,
}

impl AuthorizeNetClient {
    pub fn new(config: &AuthorizeNetConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            auth: MerchantAuthentication {
                name: config.login_id.clone(),
                transaction_key: config.transaction_key.expose_secret().clone(),
            },
            endpoint: config.endpoint.clone(),
        })
    }

    /// Create a customer profile, returning the gateway-assigned id.
    pub async fn create_customer_profile(
        &self,
        profile: &CustomerProfile,
        validation_mode: ValidationMode,
    ) -> Result<String, GatewayError> {
        let envelope = CreateCustomerProfileEnvelope {
            request: CreateCustomerProfileRequest {
                merchant_authentication: self.auth.clone(),
                profile: profile.clone(),
                validation_mode,
            },
        };

        let response: CreateCustomerProfileResponse =
            self.send("createCustomerProfile", &envelope).await?;
        response.messages.into_result()?;

        tracing::info!(
            customer_profile_id = %response.customer_profile_id,
            validation_mode = validation_mode.as_str(),
            "Customer profile created"
        );
        Ok(response.customer_profile_id)
    }

    pub async fn get_customer_profile(
        &self,
        profile_id: &str,
    ) -> Result<CustomerProfile, GatewayError> {
        let envelope = GetCustomerProfileEnvelope {
            request: GetCustomerProfileRequest {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
            },
        };

        let response: GetCustomerProfileResponse =
            self.send("getCustomerProfile", &envelope).await?;
        response.messages.into_result()?;
        Ok(response.profile)
    }

    /// Enumerate every customer profile id, paging through the gateway
    /// until a short page signals the end of the result set. Any page
    /// failing aborts the whole enumeration.
    pub async fn get_all_customer_profile_ids(&self) -> Result<Vec<String>, GatewayError> {
        let mut all_ids = Vec::new();
        let limit = PROFILE_IDS_PAGE_LIMIT;
        let mut offset = 1;

        loop {
            let envelope = GetCustomerProfileIdsEnvelope {
                request: GetCustomerProfileIdsRequest {
                    merchant_authentication: self.auth.clone(),
                    paging: Paging { limit, offset },
                },
            };

            let response: GetCustomerProfileIdsResponse =
                self.send("getCustomerProfileIds", &envelope).await?;
            response.messages.into_result()?;

            let page_len = response.ids.len();
            all_ids.extend(response.ids);

            if page_len < limit {
                break;
            }
            offset += limit;
        }

        Ok(all_ids)
    }

    /// Fetch every profile in full: ids first, then one get per id,
    /// sequentially. The first failure aborts the aggregate.
    pub async fn get_all_customer_profiles(&self) -> Result<Vec<CustomerProfile>, GatewayError> {
        let ids = self.get_all_customer_profile_ids().await?;

        let mut profiles = Vec::with_capacity(ids.len());
        for id in &ids {
            profiles.push(self.get_customer_profile(id).await?);
        }
        Ok(profiles)
    }

    pub async fn update_customer_profile(
        &self,
        profile_id: &str,
        email: &str,
        description: &str,
    ) -> Result<(), GatewayError> {
        let envelope = UpdateCustomerProfileEnvelope {
            request: UpdateCustomerProfileRequest {
                merchant_authentication: self.auth.clone(),
                profile: UpdateableProfile {
                    customer_profile_id: profile_id.to_string(),
                    email: email.to_string(),
                    description: description.to_string(),
                },
            },
        };

        let response: BareResponse = self.send("updateCustomerProfile", &envelope).await?;
        response.messages.into_result()
    }

    /// Attach a shipping address, returning the gateway-assigned address id.
    pub async fn create_shipping_address(
        &self,
        profile_id: &str,
        address: &CustomerAddress,
    ) -> Result<String, GatewayError> {
        let envelope = CreateCustomerShippingAddressEnvelope {
            request: CreateCustomerShippingAddressRequest {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
                address: address.clone(),
            },
        };

        let response: CreateCustomerShippingAddressResponse =
            self.send("createCustomerShippingAddress", &envelope).await?;
        response.messages.into_result()?;
        Ok(response.customer_address_id)
    }

    pub async fn delete_shipping_address(
        &self,
        profile_id: &str,
        address_id: &str,
    ) -> Result<(), GatewayError> {
        let envelope = DeleteCustomerShippingAddressEnvelope {
            request: DeleteCustomerShippingAddressRequest {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
                customer_address_id: address_id.to_string(),
            },
        };

        let response: BareResponse = self.send("deleteCustomerShippingAddress", &envelope).await?;
        response.messages.into_result()
    }

    /// Store a card against a profile, returning the gateway-assigned
    /// payment profile id. Raw card data is not retained locally.
    pub async fn create_payment_profile(
        &self,
        profile_id: &str,
        credit_card: &CreditCard,
    ) -> Result<String, GatewayError> {
        let envelope = CreateCustomerPaymentProfileEnvelope {
            request: CreateCustomerPaymentProfileRequest {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
                payment_profile: PaymentProfile {
                    payment: Some(Payment {
                        credit_card: credit_card.clone(),
                    }),
                    ..PaymentProfile::default()
                },
            },
        };

        let response: CreateCustomerPaymentProfileResponse = self
            .send("createCustomerPaymentProfile", &envelope)
            .await?;
        response.messages.into_result()?;
        Ok(response.customer_payment_profile_id)
    }

    /// Replace a stored payment profile (card and billing address).
    pub async fn update_payment_profile(
        &self,
        profile_id: &str,
        payment_profile: PaymentProfile,
    ) -> Result<(), GatewayError> {
        let envelope = UpdateCustomerPaymentProfileEnvelope {
            request: UpdateCustomerPaymentProfileRequest {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
                payment_profile,
            },
        };

        let response: BareResponse = self.send("updateCustomerPaymentProfile", &envelope).await?;
        response.messages.into_result()
    }

    /// Update only the billing address of a stored payment profile.
    pub async fn update_billing_address(
        &self,
        profile_id: &str,
        payment_profile_id: &str,
        address: &CustomerAddress,
    ) -> Result<(), GatewayError> {
        self.update_payment_profile(
            profile_id,
            PaymentProfile {
                customer_payment_profile_id: payment_profile_id.to_string(),
                bill_to: Some(address.clone()),
                ..PaymentProfile::default()
            },
        )
        .await
    }

    pub async fn delete_payment_profile(
        &self,
        profile_id: &str,
        payment_profile_id: &str,
    ) -> Result<(), GatewayError> {
        let envelope = DeleteCustomerPaymentProfileEnvelope {
            request: DeleteCustomerPaymentProfileRequest {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
                customer_payment_profile_id: payment_profile_id.to_string(),
            },
        };

        let response: BareResponse = self.send("deleteCustomerPaymentProfile", &envelope).await?;
        response.messages.into_result()
    }

    /// Charge a stored payment profile. `kind` selects immediate capture
    /// or authorization only.
    pub async fn charge_customer_profile(
        &self,
        profile_id: &str,
        payment_profile_id: &str,
        amount: &str,
        invoice_number: Option<&str>,
        description: Option<&str>,
        kind: TransactionKind,
    ) -> Result<TransactionOutcome, GatewayError> {
        let order = invoice_number.map(|invoice| OrderFields {
            invoice_number: invoice.to_string(),
            description: description.unwrap_or_default().to_string(),
        });

        self.submit_transaction(TransactionRequest {
            transaction_type: kind,
            amount: Some(amount.to_string()),
            profile: Some(ProfilePaymentRef {
                customer_profile_id: profile_id.to_string(),
                payment_profile: PaymentProfileRef {
                    payment_profile_id: payment_profile_id.to_string(),
                },
            }),
            order,
            ref_trans_id: None,
        })
        .await
    }

    /// Authorize without capturing; settlement happens later via
    /// [`capture_prior_auth`](Self::capture_prior_auth).
    pub async fn authorize_customer_profile(
        &self,
        profile_id: &str,
        payment_profile_id: &str,
        amount: &str,
    ) -> Result<TransactionOutcome, GatewayError> {
        self.charge_customer_profile(
            profile_id,
            payment_profile_id,
            amount,
            None,
            None,
            TransactionKind::AuthOnlyTransaction,
        )
        .await
    }

    /// Settle a previously authorized transaction. Omitting the amount
    /// captures the full authorized amount.
    pub async fn capture_prior_auth(
        &self,
        ref_trans_id: &str,
        amount: Option<&str>,
    ) -> Result<TransactionOutcome, GatewayError> {
        self.submit_transaction(TransactionRequest {
            transaction_type: TransactionKind::PriorAuthCaptureTransaction,
            amount: amount.map(str::to_string),
            profile: None,
            order: None,
            ref_trans_id: Some(ref_trans_id.to_string()),
        })
        .await
    }

    async fn submit_transaction(
        &self,
        transaction: TransactionRequest,
    ) -> Result<TransactionOutcome, GatewayError> {
        let operation = transaction.transaction_type.as_str();
        let envelope = CreateTransactionEnvelope {
            request: CreateTransactionRequest {
                merchant_authentication: self.auth.clone(),
                transaction_request: transaction,
            },
        };

        let response: CreateTransactionResponse = self.send(operation, &envelope).await?;
        response.messages.into_result()?;
        Ok(response.transaction_response)
    }

    /// POST one envelope and decode the reply.
    ///
    /// The HTTP status is logged but never short-circuits decoding: the
    /// gateway reports failure through `messages.resultCode`, sometimes on
    /// non-2xx responses. An empty or all-whitespace body decodes as the
    /// zero value of the expected envelope.
    async fn send<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp, GatewayError>
    where
        Req: Serialize,
        Resp: DeserializeOwned + Default,
    {
        let timer = GATEWAY_REQUEST_DURATION
            .with_label_values(&[operation])
            .start_timer();
        let result = self.dispatch(operation, body).await;
        timer.observe_duration();

        let outcome = match &result {
            Ok(_) => "ok",
            Err(GatewayError::Transport(_)) => "transport_error",
            Err(GatewayError::Decode { .. }) => "decode_error",
            Err(GatewayError::Rejected { .. }) => "rejected",
        };
        GATEWAY_REQUESTS_TOTAL
            .with_label_values(&[operation, outcome])
            .inc();

        result
    }

    async fn dispatch<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp, GatewayError>
    where
        Req: Serialize,
        Resp: DeserializeOwned + Default,
    {
        let response = self.http.post(&self.endpoint).json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let payload = normalize_body(&bytes);

        tracing::debug!(
            operation = operation,
            status = %status,
            body_len = payload.len(),
            "Gateway response received"
        );

        if payload.is_empty() {
            return Ok(Resp::default());
        }

        serde_json::from_slice(payload).map_err(|source| GatewayError::Decode {
            source,
            body: String::from_utf8_lossy(payload).into_owned(),
        })
    }
}

/// Trim surrounding whitespace, then a leading UTF-8 byte-order mark the
/// gateway prepends to some responses.
fn normalize_body(body: &[u8]) -> &[u8] {
    let trimmed = body.trim_ascii();
    trimmed.strip_prefix(UTF8_BOM).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(endpoint: &str) -> AuthorizeNetClient {
        AuthorizeNetClient::new(&AuthorizeNetConfig {
            login_id: "test-login".to_string(),
            transaction_key: Secret::new("test-key".to_string()),
            endpoint: endpoint.to_string(),
            validation_mode: ValidationMode::TestMode,
            request_timeout_secs: 5,
        })
        .expect("failed to build test client")
    }

    fn ok_messages() -> serde_json::Value {
        json!({ "resultCode": "Ok", "message": [] })
    }

    #[test]
    fn result_code_accepts_only_the_ok_literal() {
        let ok: ResultCode = serde_json::from_str("\"Ok\"").unwrap();
        assert_eq!(ok, ResultCode::Ok);

        // The uppercase spelling seen in some client libraries is not the
        // live contract and must classify as a failure.
        let uppercase: ResultCode = serde_json::from_str("\"OK\"").unwrap();
        assert_eq!(uppercase, ResultCode::Error);

        let error: ResultCode = serde_json::from_str("\"Error\"").unwrap();
        assert_eq!(error, ResultCode::Error);
    }

    #[test]
    fn rejection_carries_first_message() {
        let messages = ResponseMessages {
            result_code: ResultCode::Error,
            message: vec![
                ResponseMessage {
                    code: "E00039".to_string(),
                    text: "A duplicate record already exists.".to_string(),
                },
                ResponseMessage {
                    code: "E00001".to_string(),
                    text: "ignored".to_string(),
                },
            ],
        };

        match messages.into_result() {
            Err(GatewayError::Rejected { code, text }) => {
                assert_eq!(code, "E00039");
                assert_eq!(text, "A duplicate record already exists.");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn rejection_without_messages_uses_fallback_text() {
        let messages = ResponseMessages {
            result_code: ResultCode::Error,
            message: vec![],
        };

        match messages.into_result() {
            Err(GatewayError::Rejected { text, .. }) => {
                assert_eq!(text, UNKNOWN_ERROR_TEXT);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn normalize_body_strips_whitespace_then_bom() {
        assert_eq!(normalize_body(b"  \n  "), b"");
        assert_eq!(normalize_body(b"\xef\xbb\xbf{}"), b"{}");
        assert_eq!(normalize_body(b"  \xef\xbb\xbf{\"a\":1}\n"), b"{\"a\":1}");
        assert_eq!(normalize_body(b"{}"), b"{}");
    }

    #[tokio::test]
    async fn empty_body_is_a_zero_valued_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("", "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client
            .delete_shipping_address("123", "456")
            .await
            .expect("empty body should decode as success");
    }

    #[tokio::test]
    async fn whitespace_only_body_is_a_zero_valued_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("   \r\n", "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client
            .delete_payment_profile("123", "456")
            .await
            .expect("whitespace body should decode as success");
    }

    #[tokio::test]
    async fn bom_prefixed_body_decodes_identically() {
        let profile_json = json!({
            "profile": {
                "customerProfileId": "9000123",
                "description": "Test customer",
                "email": "test@example.com"
            },
            "messages": ok_messages()
        })
        .to_string();

        let plain = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(profile_json.clone(), "application/json"),
            )
            .mount(&plain)
            .await;

        let with_bom = MockServer::start().await;
        let mut bom_body = Vec::from(UTF8_BOM);
        bom_body.extend_from_slice(profile_json.as_bytes());
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(bom_body, "application/json"))
            .mount(&with_bom)
            .await;

        let a = test_client(&plain.uri())
            .get_customer_profile("9000123")
            .await
            .unwrap();
        let b = test_client(&with_bom.uri())
            .get_customer_profile("9000123")
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(b.customer_profile_id, "9000123");
    }

    #[tokio::test]
    async fn profile_id_enumeration_pages_until_a_short_page() {
        let server = MockServer::start().await;

        let page_one: Vec<String> = (0..PROFILE_IDS_PAGE_LIMIT)
            .map(|i| format!("id-{i:04}"))
            .collect();
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "getCustomerProfileIdsRequest": { "paging": { "limit": 1000, "offset": 1 } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": page_one,
                "totalNumInResultSet": 1002,
                "messages": ok_messages()
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "getCustomerProfileIdsRequest": { "paging": { "limit": 1000, "offset": 1001 } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": ["id-1000", "id-1001"],
                "totalNumInResultSet": 1002,
                "messages": ok_messages()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ids = test_client(&server.uri())
            .get_all_customer_profile_ids()
            .await
            .unwrap();

        // Exact in-order concatenation of both pages.
        assert_eq!(ids.len(), 1002);
        assert_eq!(ids[0], "id-0000");
        assert_eq!(ids[999], "id-0999");
        assert_eq!(ids[1000], "id-1000");
        assert_eq!(ids[1001], "id-1001");
    }

    #[tokio::test]
    async fn short_first_page_stops_enumeration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": ["id-1", "id-2"],
                "totalNumInResultSet": 2,
                "messages": ok_messages()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ids = test_client(&server.uri())
            .get_all_customer_profile_ids()
            .await
            .unwrap();
        assert_eq!(ids, vec!["id-1", "id-2"]);
    }

    #[tokio::test]
    async fn create_profile_surfaces_gateway_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": {
                    "resultCode": "Error",
                    "message": [{ "code": "E00039", "text": "A duplicate record already exists." }]
                }
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .create_customer_profile(&CustomerProfile::default(), ValidationMode::TestMode)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("A duplicate record already exists."));
        assert!(err.to_string().contains("E00039"));
    }

    #[tokio::test]
    async fn malformed_body_surfaces_decode_error_with_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .get_customer_profile("1")
            .await
            .unwrap_err();

        match err {
            GatewayError::Decode { body, .. } => assert!(body.contains("<html>oops</html>")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
