use serde::{Deserialize, Serialize};

/// Kind of transaction submitted to the gateway.
///
/// Serializes to the gateway's `transactionType` literals.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    AuthCaptureTransaction,
    AuthOnlyTransaction,
    PriorAuthCaptureTransaction,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::AuthCaptureTransaction => "authCaptureTransaction",
            TransactionKind::AuthOnlyTransaction => "authOnlyTransaction",
            TransactionKind::PriorAuthCaptureTransaction => "priorAuthCaptureTransaction",
        }
    }
}

/// Profile validation mode requested from the gateway when storing
/// customer or payment data. `TestMode` runs a zero-dollar validation
/// against the sandbox, `LiveMode` against the real card networks.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ValidationMode {
    TestMode,
    LiveMode,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::TestMode => "testMode",
            ValidationMode::LiveMode => "liveMode",
        }
    }
}
