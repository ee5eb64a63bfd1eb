//! End-to-end ledger behaviour against real SQLite databases.

use std::path::PathBuf;

use tpv_core::{CloseRequest, CoreError, ExpectedState, Money, SaleTender};
use tpv_db::{CashierLedger, Database, DbConfig, LedgerError};
use uuid::Uuid;

fn eur(cents: i64) -> Money {
    Money::from_cents(cents)
}

async fn in_memory() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A database file in the temp dir, removed on drop.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        TempDb {
            path: std::env::temp_dir().join(format!("tpv-test-{}.db", Uuid::new_v4())),
        }
    }

    async fn connect(&self) -> Database {
        Database::new(DbConfig::new(self.path.clone()).max_connections(4))
            .await
            .unwrap()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

fn assert_invalid_state(err: LedgerError, expected_state: ExpectedState) {
    match err {
        LedgerError::Domain(CoreError::InvalidState { expected, .. }) => {
            assert_eq!(expected, expected_state)
        }
        other => panic!("expected InvalidState, got {other:?}"),
    }
}

// =============================================================================
// Example scenarios
// =============================================================================

#[tokio::test]
async fn test_scenario_full_day() {
    let db = in_memory().await;
    let ledger = db.ledger();

    // 1. First open starts at zero; one sale.
    let first = ledger.open().await.unwrap();
    assert_eq!(first.initial_cash, Money::zero());

    ledger
        .record_sale(SaleTender::new(eur(2500), eur(1000), Money::zero()))
        .await
        .unwrap();
    let state = ledger.read_state().await.unwrap();
    assert_eq!(state.sales_total, eur(3500));
    assert_eq!(state.sales_card, eur(1000));
    assert_eq!(state.final_cash_projected, eur(2500));
    assert_eq!(state.used_vouchers, Money::zero());

    // 2. Float top-up.
    ledger.deposit(eur(5000), Some("float top-up")).await.unwrap();
    assert_eq!(ledger.read_state().await.unwrap().final_cash_projected, eur(7500));

    // 3. Over-withdrawal names the maximum; exact withdrawal empties the drawer.
    let err = ledger.withdraw(eur(8000), Some("bank")).await.unwrap_err();
    assert_eq!(err.to_string(), "Not enough cash, you can only withdraw 75.00€");
    ledger.withdraw(eur(7500), Some("bank")).await.unwrap();
    assert_eq!(ledger.read_state().await.unwrap().final_cash_projected, Money::zero());

    // 4. Close, then mutations are refused.
    let last = ledger
        .close(&CloseRequest::new(eur(1000), Money::zero(), Some("EOD")))
        .await
        .unwrap();
    assert!(last.closed);
    assert_eq!(last.comment.as_deref(), Some("EOD"));
    assert!(last.closing_date.is_some());

    let err = ledger.deposit(eur(100), None).await.unwrap_err();
    assert!(err.is_client_error());
    assert_invalid_state(err, ExpectedState::Open);

    // 5. Next period carries the declared cash (zero).
    let second = ledger.open().await.unwrap();
    assert_eq!(second.initial_cash, Money::zero());
    assert_ne!(second.id, first.id);

    let last = ledger.read_last().await.unwrap();
    assert_eq!(last.id, second.id);
    assert!(!last.closed);
}

#[tokio::test]
async fn test_non_positive_deposit_is_a_validation_error() {
    let db = in_memory().await;
    let ledger = db.ledger();
    ledger.open().await.unwrap();

    let err = ledger.deposit(Money::zero(), None).await.unwrap_err();
    assert!(matches!(err, LedgerError::Domain(CoreError::Validation(_))));
    let err = ledger.withdraw(eur(-100), None).await.unwrap_err();
    assert!(matches!(err, LedgerError::Domain(CoreError::Validation(_))));
}

// =============================================================================
// P1: single open
// =============================================================================

#[tokio::test]
async fn test_at_most_one_open_period() {
    let db = in_memory().await;
    let ledger = db.ledger();

    for round in 0..3 {
        ledger.open().await.unwrap();
        assert_invalid_state(ledger.open().await.unwrap_err(), ExpectedState::Closed);
        assert_eq!(db.closures().count_open().await.unwrap(), 1);

        ledger
            .close(&CloseRequest::new(Money::zero(), eur(round * 100), None))
            .await
            .unwrap();
        assert_eq!(db.closures().count_open().await.unwrap(), 0);
        assert_invalid_state(
            ledger
                .close(&CloseRequest::new(Money::zero(), Money::zero(), None))
                .await
                .unwrap_err(),
            ExpectedState::Open,
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opens_from_two_processes_yield_one_period() {
    let file = TempDb::new();
    let a = file.connect().await;
    let b = file.connect().await;

    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.ledger().open().await }),
        tokio::spawn(async move { b.ledger().open().await }),
    );
    let results = [ra.unwrap(), rb.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert_invalid_state(err, ExpectedState::Closed);
    }

    let check = file.connect().await;
    assert_eq!(check.closures().count_open().await.unwrap(), 1);
}

// =============================================================================
// P2: carry-forward
// =============================================================================

#[tokio::test]
async fn test_each_period_starts_with_previous_declared_cash() {
    let db = in_memory().await;
    let ledger = db.ledger();

    for declared in [0, 12_345, 700, 99] {
        ledger.open().await.unwrap();
        ledger
            .record_sale(SaleTender::new(eur(1000), eur(500), Money::zero()))
            .await
            .unwrap();
        ledger
            .close(&CloseRequest::new(eur(500), eur(declared), None))
            .await
            .unwrap();
    }
    ledger.open().await.unwrap();

    let closures = db.closures().list().await.unwrap();
    assert_eq!(closures.len(), 5);
    assert_eq!(closures[0].initial_cash, Money::zero());
    for pair in closures.windows(2) {
        assert_eq!(Some(pair[1].initial_cash), pair[0].final_cash);
    }
}

// =============================================================================
// P3 / P4: running cash bound
// =============================================================================

#[tokio::test]
async fn test_withdrawals_never_overdraw() {
    let db = in_memory().await;
    let ledger = db.ledger();
    ledger.open().await.unwrap();

    let steps: [(i64, i64, i64); 6] = [
        // (cash sale, deposit, withdrawal attempt)
        (1000, 0, 1500),
        (0, 2000, 3000),
        (250, 0, 3250),
        (0, 0, 1),
        (499, 1, 400),
        (0, 0, 101),
    ];

    for (sale, deposit, withdrawal) in steps {
        if sale > 0 {
            ledger
                .record_sale(SaleTender::new(eur(sale), Money::zero(), Money::zero()))
                .await
                .unwrap();
        }
        if deposit > 0 {
            ledger.deposit(eur(deposit), None).await.unwrap();
        }

        let before = db.closures().latest().await.unwrap().unwrap();
        let available = before.running_cash();
        let result = ledger.withdraw(eur(withdrawal), None).await;
        let after = db.closures().latest().await.unwrap().unwrap();

        if eur(withdrawal) <= available {
            assert!(result.is_ok());
            assert_eq!(after.running_cash(), available - eur(withdrawal));
        } else {
            match result {
                Err(LedgerError::Domain(CoreError::InsufficientFunds { max_withdrawable })) => {
                    assert_eq!(max_withdrawable, available)
                }
                other => panic!("expected InsufficientFunds, got {other:?}"),
            }
            assert_eq!(after, before);
        }
        assert!(!after.running_cash().is_negative());
    }
}

// =============================================================================
// P5: close terminality
// =============================================================================

#[tokio::test]
async fn test_closed_period_is_frozen() {
    let db = in_memory().await;
    let ledger = db.ledger();
    ledger.open().await.unwrap();
    ledger.deposit(eur(1000), None).await.unwrap();
    ledger
        .close(&CloseRequest::new(Money::zero(), eur(1000), Some("EOD")))
        .await
        .unwrap();
    let frozen = db.closures().latest().await.unwrap().unwrap();

    assert_invalid_state(ledger.deposit(eur(1), None).await.unwrap_err(), ExpectedState::Open);
    assert_invalid_state(ledger.withdraw(eur(1), None).await.unwrap_err(), ExpectedState::Open);
    assert_invalid_state(
        ledger
            .record_sale(SaleTender::new(eur(1), eur(1), eur(1)))
            .await
            .unwrap_err(),
        ExpectedState::Open,
    );
    assert_invalid_state(
        ledger
            .close(&CloseRequest::new(eur(5), eur(5), Some("again")))
            .await
            .unwrap_err(),
        ExpectedState::Open,
    );

    assert_eq!(db.closures().latest().await.unwrap().unwrap(), frozen);
}

// =============================================================================
// P6: concurrent withdrawal safety
// =============================================================================

async fn race_two_withdrawals(first: CashierLedger, second: CashierLedger) -> Vec<LedgerError> {
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { first.withdraw(eur(6000), None).await }),
        tokio::spawn(async move { second.withdraw(eur(6000), None).await }),
    );
    let results = [ra.unwrap(), rb.unwrap()];
    assert_eq!(
        results.iter().filter(|r| r.is_ok()).count(),
        1,
        "exactly one withdrawal must succeed"
    );
    results.into_iter().filter_map(Result::err).collect()
}

fn assert_single_insufficient(errors: Vec<LedgerError>) {
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        LedgerError::Domain(CoreError::InsufficientFunds { max_withdrawable }) => {
            assert_eq!(*max_withdrawable, eur(4000))
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_share_one_writer() {
    let file = TempDb::new();
    let db = file.connect().await;
    db.ledger().open().await.unwrap();
    db.ledger().deposit(eur(10_000), None).await.unwrap();

    let errors = race_two_withdrawals(db.ledger(), db.ledger()).await;
    assert_single_insufficient(errors);

    let closure = db.closures().latest().await.unwrap().unwrap();
    assert_eq!(closure.withdrawal, eur(6000));
    assert_eq!(closure.running_cash(), eur(4000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_across_processes() {
    let file = TempDb::new();
    let a = file.connect().await;
    let b = file.connect().await;
    a.ledger().open().await.unwrap();
    a.ledger().deposit(eur(10_000), None).await.unwrap();

    // Separate handles share no lock; only the version check protects them.
    let errors = race_two_withdrawals(a.ledger(), b.ledger()).await;
    assert_single_insufficient(errors);

    let closure = a.closures().latest().await.unwrap().unwrap();
    assert_eq!(closure.withdrawal, eur(6000));
    assert_eq!(a.closures().movements(&closure.id).await.unwrap().len(), 2);
}
