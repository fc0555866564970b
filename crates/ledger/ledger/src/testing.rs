//! Conformance suite shared by every [`GrantLedger`] backend.

use chrono::TimeDelta;

use ephemera_core::{Denial, NewGrant, PinHash, Token, ViewLimit};

use crate::error::LedgerError;
use crate::ledger::{ConsumeOutcome, GrantLedger};

fn grant(key: &str, limit: ViewLimit) -> NewGrant {
    NewGrant::new(key, "image/png", limit)
}

/// Run the full ledger conformance test suite.
///
/// Call this from your backend's test module with a fresh ledger instance.
///
/// # Errors
///
/// Returns an error if any ledger operation fails.
pub async fn run_ledger_conformance_tests(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    test_create_then_get(ledger).await?;
    test_get_missing(ledger).await?;
    test_create_then_consume_returns_blob(ledger).await?;
    test_single_view_then_not_found(ledger).await?;
    test_wrong_pin_does_not_consume(ledger).await?;
    test_pin_required(ledger).await?;
    test_unlimited_until_expiry(ledger).await?;
    test_remove_is_idempotent(ledger).await?;
    test_snapshot_expired(ledger).await?;
    Ok(())
}

async fn test_create_then_get(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let record = ledger.create(grant("get.png", ViewLimit::Limited(2))).await?;
    assert_eq!(record.views_remaining, Some(2));
    assert!(record.expires_at > record.created_at);

    let fetched = ledger.get(&record.token).await?.expect("record should exist");
    assert_eq!(fetched.blob_key, "get.png");
    assert_eq!(fetched.views_remaining, Some(2));
    Ok(())
}

async fn test_get_missing(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let missing = ledger.get(&Token::new("never-issued")).await?;
    assert!(missing.is_none(), "get on unknown token should return None");
    let outcome = ledger
        .try_consume(&Token::new("never-issued"), None, chrono::Utc::now())
        .await?;
    assert_eq!(outcome, ConsumeOutcome::NotFound);
    Ok(())
}

async fn test_create_then_consume_returns_blob(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let record = ledger
        .create(grant("roundtrip.png", ViewLimit::Limited(2)).with_pin(PinHash::digest("4321")))
        .await?;

    let outcome = ledger
        .try_consume(&record.token, Some("4321"), record.created_at)
        .await?;
    let ConsumeOutcome::Allowed(consumed) = outcome else {
        panic!("expected Allowed, got {outcome:?}");
    };
    assert_eq!(consumed.blob_key, "roundtrip.png");
    assert_eq!(consumed.views_remaining, Some(1));
    assert!(!consumed.exhausted);
    Ok(())
}

async fn test_single_view_then_not_found(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let record = ledger.create(grant("once.png", ViewLimit::Limited(1))).await?;

    let first = ledger.try_consume(&record.token, None, record.created_at).await?;
    let ConsumeOutcome::Allowed(consumed) = first else {
        panic!("first consume should be allowed, got {first:?}");
    };
    assert!(consumed.exhausted, "last view should exhaust the grant");
    assert_eq!(consumed.views_remaining, Some(0));

    let second = ledger.try_consume(&record.token, None, record.created_at).await?;
    assert_eq!(second, ConsumeOutcome::NotFound);
    assert!(ledger.get(&record.token).await?.is_none());
    Ok(())
}

async fn test_wrong_pin_does_not_consume(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let record = ledger
        .create(grant("pinned.png", ViewLimit::Limited(3)).with_pin(PinHash::digest("1234")))
        .await?;
    let now = record.created_at;

    for _ in 0..2 {
        let outcome = ledger.try_consume(&record.token, Some("0000"), now).await?;
        assert_eq!(
            outcome,
            ConsumeOutcome::Denied {
                reason: Denial::PinMismatch,
                reclaimed: None
            }
        );
    }
    let untouched = ledger.get(&record.token).await?.expect("record should survive");
    assert_eq!(untouched.views_remaining, Some(3));

    let outcome = ledger.try_consume(&record.token, Some("1234"), now).await?;
    let ConsumeOutcome::Allowed(consumed) = outcome else {
        panic!("correct PIN should be allowed, got {outcome:?}");
    };
    assert_eq!(consumed.views_remaining, Some(2));
    Ok(())
}

async fn test_pin_required(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let record = ledger
        .create(grant("needs-pin.png", ViewLimit::Limited(1)).with_pin(PinHash::digest("1111")))
        .await?;
    let outcome = ledger.try_consume(&record.token, None, record.created_at).await?;
    assert_eq!(
        outcome,
        ConsumeOutcome::Denied {
            reason: Denial::PinRequired,
            reclaimed: None
        }
    );
    assert!(ledger.get(&record.token).await?.is_some());
    Ok(())
}

async fn test_unlimited_until_expiry(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let record = ledger.create(grant("forever.png", ViewLimit::Unlimited)).await?;

    for _ in 0..25 {
        let outcome = ledger.try_consume(&record.token, None, record.created_at).await?;
        let ConsumeOutcome::Allowed(consumed) = outcome else {
            panic!("unlimited grant should allow, got {outcome:?}");
        };
        assert_eq!(consumed.views_remaining, None);
        assert!(!consumed.exhausted);
    }

    let outcome = ledger.try_consume(&record.token, None, record.expires_at).await?;
    assert_eq!(
        outcome,
        ConsumeOutcome::Denied {
            reason: Denial::Expired,
            reclaimed: Some("forever.png".to_owned())
        }
    );
    let after = ledger.try_consume(&record.token, None, record.expires_at).await?;
    assert_eq!(after, ConsumeOutcome::NotFound);
    Ok(())
}

async fn test_remove_is_idempotent(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let record = ledger.create(grant("remove.png", ViewLimit::Limited(5))).await?;
    let removed = ledger.remove(&record.token).await?;
    assert_eq!(removed.map(|r| r.blob_key).as_deref(), Some("remove.png"));
    assert!(ledger.remove(&record.token).await?.is_none());
    assert!(ledger.get(&record.token).await?.is_none());
    Ok(())
}

async fn test_snapshot_expired(ledger: &dyn GrantLedger) -> Result<(), LedgerError> {
    let record = ledger.create(grant("sweep.png", ViewLimit::Limited(1))).await?;

    let before = ledger
        .snapshot_expired(record.expires_at - TimeDelta::seconds(1))
        .await?;
    assert!(!before.iter().any(|g| g.token == record.token));

    let at = ledger.snapshot_expired(record.expires_at).await?;
    let found = at
        .iter()
        .find(|g| g.token == record.token)
        .expect("expired grant should be listed");
    assert_eq!(found.blob_key, "sweep.png");

    // Read-only: the record is still there and a second snapshot sees it again.
    assert!(ledger.get(&record.token).await?.is_some());
    let again = ledger.snapshot_expired(record.expires_at).await?;
    assert!(again.iter().any(|g| g.token == record.token));

    ledger.remove(&record.token).await?;
    Ok(())
}
