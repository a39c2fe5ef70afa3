//! Integration tests for the RPC-backed ledger client
//!
//! Runs `RpcLedgerClient` against a mocked JSON-RPC endpoint so mint checks
//! and confirmation polling are exercised through the real Solana client.

use mockito::{Matcher, Mock, ServerGuard};
use multisend::ledger::{ConfirmPolicy, LedgerClient, RpcLedgerClient};
use multisend::{BatchError, Pubkey, Signature};
use serde_json::{json, Value};
use solana_sdk::commitment_config::CommitmentConfig;
use spl_token::solana_program::{program_option::COption, program_pack::Pack};
use spl_token::state::Mint;
use std::time::Duration;

fn ledger_for(server: &ServerGuard, confirm_policy: ConfirmPolicy) -> RpcLedgerClient {
    RpcLedgerClient::from_url(
        server.url(),
        Duration::from_secs(5),
        CommitmentConfig::confirmed(),
        confirm_policy,
    )
}

async fn mock_method(server: &mut ServerGuard, method: &str, result: Value) -> Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": method })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "jsonrpc": "2.0", "result": result, "id": 1 }).to_string())
        .create_async()
        .await
}

fn account_info(owner: &Pubkey, data: &[u8]) -> Value {
    json!({
        "context": { "slot": 1 },
        "value": {
            "lamports": 1_461_600,
            "data": [bs58::encode(data).into_string(), "base58"],
            "owner": owner.to_string(),
            "executable": false,
            "rentEpoch": 0,
            "space": data.len()
        }
    })
}

fn mint_data(decimals: u8, is_initialized: bool) -> Vec<u8> {
    let mut data = vec![0u8; Mint::LEN];
    let mint = Mint {
        mint_authority: COption::None,
        supply: 0,
        decimals,
        is_initialized,
        freeze_authority: COption::None,
    };
    Mint::pack_into_slice(&mint, &mut data);
    data
}

fn signature_status(status: Value) -> Value {
    json!({ "context": { "slot": 5 }, "value": [status] })
}

fn fast_policy() -> ConfirmPolicy {
    ConfirmPolicy {
        timeout: Duration::from_millis(150),
        poll_interval: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn test_mint_decimals_read_from_token_account() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(
        &mut server,
        "getAccountInfo",
        account_info(&spl_token::id(), &mint_data(6, true)),
    )
    .await;
    let ledger = ledger_for(&server, ConfirmPolicy::default());

    let decimals = ledger.mint_decimals(&Pubkey::new_unique()).await.unwrap();
    assert_eq!(decimals, 6);
}

#[tokio::test]
async fn test_mint_owned_by_other_program_is_unresolved() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(
        &mut server,
        "getAccountInfo",
        account_info(&Pubkey::new_unique(), &mint_data(6, true)),
    )
    .await;
    let ledger = ledger_for(&server, ConfirmPolicy::default());

    let err = ledger.mint_decimals(&Pubkey::new_unique()).await.unwrap_err();
    assert!(matches!(err, BatchError::UnresolvedAsset(_)));
    assert!(err.to_string().contains("not owned by the token program"));
}

#[tokio::test]
async fn test_short_mint_account_is_unresolved() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(
        &mut server,
        "getAccountInfo",
        account_info(&spl_token::id(), &[1u8; 10]),
    )
    .await;
    let ledger = ledger_for(&server, ConfirmPolicy::default());

    let err = ledger.mint_decimals(&Pubkey::new_unique()).await.unwrap_err();
    assert!(matches!(err, BatchError::UnresolvedAsset(_)));
    assert!(err.to_string().contains("too small to be a mint"));
}

#[tokio::test]
async fn test_uninitialized_mint_is_unresolved() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(
        &mut server,
        "getAccountInfo",
        account_info(&spl_token::id(), &mint_data(6, false)),
    )
    .await;
    let ledger = ledger_for(&server, ConfirmPolicy::default());

    let err = ledger.mint_decimals(&Pubkey::new_unique()).await.unwrap_err();
    assert!(matches!(err, BatchError::UnresolvedAsset(_)));
}

#[tokio::test]
async fn test_missing_account() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(
        &mut server,
        "getAccountInfo",
        json!({ "context": { "slot": 1 }, "value": null }),
    )
    .await;
    let ledger = ledger_for(&server, ConfirmPolicy::default());
    let address = Pubkey::new_unique();

    assert!(!ledger.account_exists(&address).await.unwrap());
    let err = ledger.mint_decimals(&address).await.unwrap_err();
    assert!(matches!(err, BatchError::UnresolvedAsset(_)));
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_confirmed_signature() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(
        &mut server,
        "getSignatureStatuses",
        signature_status(json!({
            "slot": 5,
            "confirmations": null,
            "status": { "Ok": null },
            "err": null,
            "confirmationStatus": "finalized"
        })),
    )
    .await;
    let ledger = ledger_for(&server, fast_policy());

    ledger
        .confirm(&Signature::from([3u8; 64]), CommitmentConfig::confirmed())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_transaction_is_confirmation_failure() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(
        &mut server,
        "getSignatureStatuses",
        signature_status(json!({
            "slot": 5,
            "confirmations": null,
            "status": { "Err": "AccountInUse" },
            "err": "AccountInUse",
            "confirmationStatus": "finalized"
        })),
    )
    .await;
    let ledger = ledger_for(&server, fast_policy());

    let err = ledger
        .confirm(&Signature::from([3u8; 64]), CommitmentConfig::confirmed())
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::ConfirmationFailed(_)));
    assert!(err.to_string().contains("failed on chain"));
}

#[tokio::test]
async fn test_unseen_signature_times_out() {
    let mut server = mockito::Server::new_async().await;
    let status = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": "getSignatureStatuses" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "jsonrpc": "2.0", "result": signature_status(Value::Null), "id": 1 })
                .to_string(),
        )
        .expect_at_least(2)
        .create_async()
        .await;
    let ledger = ledger_for(&server, fast_policy());

    let err = ledger
        .confirm(&Signature::from([3u8; 64]), CommitmentConfig::confirmed())
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::ConfirmationFailed(_)));
    assert!(err.to_string().contains("not confirmed within"));
    // Polled repeatedly until the deadline
    status.assert_async().await;
}
