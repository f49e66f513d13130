//! Customer profile endpoints: the profile itself, its shipping
//! addresses, and its stored payment profiles.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    dtos::{
        sanitize_storefront_body, AddPaymentProfileRequest, AddShippingAddressRequest,
        CreatePaymentProfileResponse, CreateProfileRequest, CreateProfileResponse,
        CreateShippingAddressResponse, MessageResponse, UpdateBillingAddressRequest,
        UpdatePaymentProfileRequest, UpdateProfileRequest,
    },
    error::AppError,
    services::authorizenet::{CustomerProfile, PaymentProfile},
    AppState,
};

/// Create a customer profile.
///
/// The body arrives as raw text because one storefront caller emits
/// invalid `\'` escapes; it is sanitized before JSON decoding.
pub async fn create_profile(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<CreateProfileResponse>), AppError> {
    let sanitized = sanitize_storefront_body(&body);
    let payload: CreateProfileRequest = serde_json::from_str(&sanitized).map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed create-profile body");
        AppError::BadRequest(anyhow::anyhow!("Invalid request body"))
    })?;

    let validation_mode = payload
        .validation_mode
        .unwrap_or(state.config.authorizenet.validation_mode);

    tracing::info!(
        email = %payload.profile.email,
        validation_mode = validation_mode.as_str(),
        "Creating customer profile"
    );

    let customer_profile_id = state
        .gateway
        .create_customer_profile(&payload.profile, validation_mode)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateProfileResponse {
            customer_profile_id,
        }),
    ))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> Result<Json<CustomerProfile>, AppError> {
    tracing::info!(profile_id = %profile_id, "Fetching customer profile");

    let profile = state.gateway.get_customer_profile(&profile_id).await?;
    Ok(Json(profile))
}

pub async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerProfile>>, AppError> {
    tracing::info!("Fetching all customer profiles");

    let profiles = state.gateway.get_all_customer_profiles().await?;
    Ok(Json(profiles))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<StatusCode, AppError> {
    tracing::info!(profile_id = %profile_id, "Updating customer profile");

    state
        .gateway
        .update_customer_profile(&profile_id, &payload.email, &payload.description)
        .await?;

    Ok(StatusCode::OK)
}

pub async fn add_shipping_address(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    Json(payload): Json<AddShippingAddressRequest>,
) -> Result<(StatusCode, Json<CreateShippingAddressResponse>), AppError> {
    tracing::info!(profile_id = %profile_id, "Adding shipping address");

    let customer_address_id = state
        .gateway
        .create_shipping_address(&profile_id, &payload.address)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateShippingAddressResponse {
            customer_address_id,
        }),
    ))
}

pub async fn delete_shipping_address(
    State(state): State<AppState>,
    Path((profile_id, address_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    tracing::info!(
        profile_id = %profile_id,
        address_id = %address_id,
        "Deleting shipping address"
    );

    state
        .gateway
        .delete_shipping_address(&profile_id, &address_id)
        .await?;

    Ok(StatusCode::OK)
}

pub async fn add_payment_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    Json(payload): Json<AddPaymentProfileRequest>,
) -> Result<(StatusCode, Json<CreatePaymentProfileResponse>), AppError> {
    tracing::info!(profile_id = %profile_id, "Adding payment profile");

    let customer_payment_profile_id = state
        .gateway
        .create_payment_profile(&profile_id, &payload.credit_card)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentProfileResponse {
            customer_payment_profile_id,
        }),
    ))
}

/// Replace a stored payment profile's card and billing address.
pub async fn update_payment_profile(
    State(state): State<AppState>,
    Path((profile_id, payment_profile_id)): Path<(String, String)>,
    Json(payload): Json<UpdatePaymentProfileRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    tracing::info!(
        profile_id = %profile_id,
        payment_profile_id = %payment_profile_id,
        "Updating payment profile"
    );

    state
        .gateway
        .update_payment_profile(
            &profile_id,
            PaymentProfile {
                customer_payment_profile_id: payment_profile_id,
                bill_to: payload.bill_to,
                payment: Some(payload.payment),
                ..PaymentProfile::default()
            },
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "Payment profile updated successfully".to_string(),
    }))
}

pub async fn update_billing_address(
    State(state): State<AppState>,
    Path((profile_id, payment_profile_id)): Path<(String, String)>,
    Json(payload): Json<UpdateBillingAddressRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    tracing::info!(
        profile_id = %profile_id,
        payment_profile_id = %payment_profile_id,
        "Updating billing address"
    );

    state
        .gateway
        .update_billing_address(&profile_id, &payment_profile_id, &payload.address)
        .await?;

    Ok(Json(MessageResponse {
        message: "Billing address updated successfully".to_string(),
    }))
}

pub async fn delete_payment_profile(
    State(state): State<AppState>,
    Path((profile_id, payment_profile_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    tracing::info!(
        profile_id = %profile_id,
        payment_profile_id = %payment_profile_id,
        "Deleting payment profile"
    );

    state
        .gateway
        .delete_payment_profile(&profile_id, &payment_profile_id)
        .await?;

    Ok(StatusCode::OK)
}
