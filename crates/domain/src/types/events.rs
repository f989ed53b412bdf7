//! Overlay channel events
//!
//! Messages exchanged with an optional overlay process. The SDK itself only
//! emits [`OverlayEvent::Token`]; the rest are relayed for the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-chain payloads of a signing result; the overlay fills the chain used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainResults {
    pub evm: Option<Value>,
    pub solana: Option<Value>,
    pub eos: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OverlayEvent {
    Token { token: String },
    #[serde(rename_all = "camelCase")]
    OpenStateChange { is_open: bool },
    Checkout { sku: String },
    CheckoutResult { success: bool, sku: String },
    SetVisibility { visible: bool },
    Language { code: String },
    GetWallet,
    #[serde(rename_all = "camelCase")]
    GetWalletResult {
        status: String,
        eth_address: String,
        sol_address: String,
        eos_address: String,
    },
    SignTypedData { message: String, reason: String },
    SignTypedDataResult { status: String, signature: String, r: String, s: String, v: String },
    SignMessage { message: String, reason: String },
    SignMessageResult {
        status: String,
        #[serde(flatten)]
        results: ChainResults,
    },
    SignTransaction { message: String, reason: String },
    SignTransactionResult {
        status: String,
        #[serde(flatten)]
        results: ChainResults,
    },
}

impl OverlayEvent {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Token { .. } => "token",
            Self::OpenStateChange { .. } => "openStateChange",
            Self::Checkout { .. } => "checkout",
            Self::CheckoutResult { .. } => "checkoutResult",
            Self::SetVisibility { .. } => "setVisibility",
            Self::Language { .. } => "language",
            Self::GetWallet => "getWallet",
            Self::GetWalletResult { .. } => "getWalletResult",
            Self::SignTypedData { .. } => "signTypedData",
            Self::SignTypedDataResult { .. } => "signTypedDataResult",
            Self::SignMessage { .. } => "signMessage",
            Self::SignMessageResult { .. } => "signMessageResult",
            Self::SignTransaction { .. } => "signTransaction",
            Self::SignTransactionResult { .. } => "signTransactionResult",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_serialization() {
        let json = serde_json::to_value(OverlayEvent::OpenStateChange { is_open: true }).unwrap();
        assert_eq!(json["type"], "openStateChange");
        assert_eq!(json["isOpen"], true);

        let back: OverlayEvent =
            serde_json::from_str(r#"{"type":"checkoutResult","success":false,"sku":"gem"}"#).unwrap();
        assert_eq!(back, OverlayEvent::CheckoutResult { success: false, sku: "gem".into() });
        assert_eq!(back.kind(), "checkoutResult");
    }

    #[test]
    fn wallet_and_signing_results() {
        let wallet: OverlayEvent = serde_json::from_str(
            r#"{"type":"getWalletResult","status":"ok","ethAddress":"0x1","solAddress":"So1","eosAddress":"eos1"}"#,
        )
        .unwrap();
        assert_eq!(wallet.kind(), "getWalletResult");

        let signed: OverlayEvent = serde_json::from_str(
            r#"{"type":"signMessageResult","status":"ok","solana":{"signature":"abc"}}"#,
        )
        .unwrap();
        let OverlayEvent::SignMessageResult { status, results } = signed else {
            panic!("unexpected event");
        };
        assert_eq!(status, "ok");
        assert_eq!(results.solana, Some(serde_json::json!({"signature":"abc"})));
        assert!(results.evm.is_none());

        let request = serde_json::to_value(OverlayEvent::GetWallet).unwrap();
        assert_eq!(request, serde_json::json!({"type":"getWallet"}));
    }
}
