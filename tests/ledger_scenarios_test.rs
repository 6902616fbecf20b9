use chrono::{TimeZone, Utc};
use fincore::application::clock::ManualClock;
use fincore::application::scheduler::PaymentScheduler;
use fincore::domain::currency::Currency;
use fincore::domain::ports::ScheduleStoreRef;
use fincore::domain::schedule::{Frequency, ScheduledPayment};
use fincore::domain::transaction::TransactionKind;
use fincore::error::LedgerError;
use fincore::infrastructure::in_memory::InMemoryScheduleStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

mod common;

#[tokio::test]
async fn test_same_currency_transfer() {
    let (engine, ledger) = common::engine();
    let (_, alice) = common::funded_wallet(&engine, Currency::Ngn, dec!(1000)).await;
    let (bob_user, bob) = common::funded_wallet(&engine, Currency::Ngn, Decimal::ZERO).await;

    let record = engine.transfer(alice, bob, dec!(300)).await.unwrap();

    assert_eq!(record.amount, dec!(300));
    assert_eq!(record.kind, TransactionKind::Transfer);
    assert_eq!(ledger.load_wallet(alice).await.unwrap().unwrap().balance.value(), dec!(700));
    assert_eq!(engine.balance(bob_user).await.unwrap().value(), dec!(300));

    let transfers: Vec<_> = ledger
        .history(bob)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.kind == TransactionKind::Transfer)
        .collect();
    assert_eq!(transfers, vec![record]);
}

#[tokio::test]
async fn test_failed_transfer_leaves_no_trace() {
    let (engine, ledger) = common::engine();
    let (_, alice) = common::funded_wallet(&engine, Currency::Ngn, dec!(100)).await;
    let (_, bob) = common::funded_wallet(&engine, Currency::Ngn, Decimal::ZERO).await;

    let err = engine.transfer(alice, bob, dec!(500)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    assert_eq!(ledger.load_wallet(alice).await.unwrap().unwrap().balance.value(), dec!(100));
    assert_eq!(ledger.load_wallet(bob).await.unwrap().unwrap().balance.value(), dec!(0));
    assert!(ledger.history(bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cross_currency_transfer() {
    let (engine, ledger) = common::engine();
    let (_, usd) = common::funded_wallet(&engine, Currency::Usd, dec!(50)).await;
    let (_, ngn) = common::funded_wallet(&engine, Currency::Ngn, Decimal::ZERO).await;

    let record = engine.transfer(usd, ngn, dec!(10)).await.unwrap();

    assert_eq!(ledger.load_wallet(usd).await.unwrap().unwrap().balance.value(), dec!(40));
    assert_eq!(ledger.load_wallet(ngn).await.unwrap().unwrap().balance.value(), dec!(8400));
    assert_eq!(record.amount, dec!(10));
    assert_eq!(
        record.credited_amount(engine.converter(), Currency::Usd, Currency::Ngn).unwrap(),
        dec!(8400)
    );
}

#[tokio::test]
async fn test_monthly_schedule_clamps_to_leap_day() {
    let (engine, ledger) = common::engine();
    let (alice_user, alice) = common::funded_wallet(&engine, Currency::Ngn, dec!(1000)).await;
    let (_, bob) = common::funded_wallet(&engine, Currency::Ngn, Decimal::ZERO).await;

    let jan_31 = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
    let clock = ManualClock::new(jan_31);
    let schedules: ScheduleStoreRef = Arc::new(InMemoryScheduleStore::new());
    let schedule = schedules
        .create_schedule(
            ScheduledPayment::new(alice_user, bob, dec!(100), Frequency::Monthly, jan_31).unwrap(),
        )
        .await
        .unwrap();
    let scheduler = PaymentScheduler::new(schedules.clone(), engine.clone(), Arc::new(clock.clone()));

    let report = scheduler.tick().await.unwrap();
    assert_eq!(report.executed, 1);

    let stored = schedules.get_schedule(schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.next_due, Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap());

    // Same instant again: nothing left to pay.
    assert_eq!(scheduler.tick().await.unwrap().executed, 0);

    clock.set(Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap());
    assert_eq!(scheduler.tick().await.unwrap().executed, 1);
    let stored = schedules.get_schedule(schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.next_due, Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap());

    assert_eq!(ledger.load_wallet(alice).await.unwrap().unwrap().balance.value(), dec!(800));
    assert_eq!(ledger.load_wallet(bob).await.unwrap().unwrap().balance.value(), dec!(200));
}

#[tokio::test]
async fn test_concurrent_overdraft_attempts() {
    let (engine, ledger) = common::engine();
    let (_, alice) = common::funded_wallet(&engine, Currency::Ngn, dec!(100)).await;
    let (_, bob) = common::funded_wallet(&engine, Currency::Ngn, Decimal::ZERO).await;
    let (_, carol) = common::funded_wallet(&engine, Currency::Ngn, Decimal::ZERO).await;

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.transfer(alice, bob, dec!(80)).await })
    };
    let second = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.transfer(alice, carol, dec!(80)).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. }))));

    let remaining = ledger.load_wallet(alice).await.unwrap().unwrap().balance.value();
    let received = ledger.load_wallet(bob).await.unwrap().unwrap().balance.value()
        + ledger.load_wallet(carol).await.unwrap().unwrap().balance.value();
    assert_eq!(remaining, dec!(20));
    assert_eq!(received, dec!(80));
}
