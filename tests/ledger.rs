mod common;

use carwash_bot::database::{BookingLedger, CancelOutcome, Requester, ReserveOutcome};
use carwash_bot::models::BookingStatus;

use common::{at, register, request, slot, test_db, ymd};

#[tokio::test]
async fn capacity_is_shared_and_freed_by_cancel() {
    let test = test_db().await;
    let ledger = BookingLedger::new(test.db.clone(), 2);
    let date = ymd(2024, 1, 2);
    let time = slot("10:00");
    for id in [1, 2, 3] {
        register(&test.db, id).await;
    }

    let a = match ledger.reserve(&request(1, date, "10:00")).await.unwrap() {
        ReserveOutcome::Reserved(booking) => booking,
        other => panic!("expected reservation, got {other:?}"),
    };
    assert_eq!(a.status, BookingStatus::Active);
    assert_eq!(a.service, "Седан - Однофазная мойка");
    assert_eq!(ledger.remaining_capacity(date, time).await.unwrap(), 1);

    assert!(matches!(
        ledger.reserve(&request(2, date, "10:00")).await.unwrap(),
        ReserveOutcome::Reserved(_)
    ));
    assert_eq!(ledger.remaining_capacity(date, time).await.unwrap(), 0);

    assert_eq!(
        ledger.reserve(&request(3, date, "10:00")).await.unwrap(),
        ReserveOutcome::SlotFull
    );

    assert!(matches!(
        ledger.cancel(a.id, Requester::User(1)).await.unwrap(),
        CancelOutcome::Cancelled(_)
    ));
    assert_eq!(ledger.remaining_capacity(date, time).await.unwrap(), 1);

    assert!(matches!(
        ledger.reserve(&request(3, date, "10:00")).await.unwrap(),
        ReserveOutcome::Reserved(_)
    ));
    assert_eq!(ledger.remaining_capacity(date, time).await.unwrap(), 0);
}

#[tokio::test]
async fn same_user_cannot_hold_a_slot_twice() {
    let test = test_db().await;
    let ledger = BookingLedger::new(test.db.clone(), 3);
    let date = ymd(2024, 1, 2);
    register(&test.db, 1).await;

    assert!(matches!(
        ledger.reserve(&request(1, date, "12:00")).await.unwrap(),
        ReserveOutcome::Reserved(_)
    ));
    assert_eq!(
        ledger.reserve(&request(1, date, "12:00")).await.unwrap(),
        ReserveOutcome::AlreadyBooked
    );
    assert_eq!(ledger.remaining_capacity(date, slot("12:00")).await.unwrap(), 2);
}

#[tokio::test]
async fn rebooking_after_cancel_is_allowed() {
    let test = test_db().await;
    let ledger = BookingLedger::new(test.db.clone(), 1);
    let date = ymd(2024, 1, 2);
    register(&test.db, 1).await;

    let ReserveOutcome::Reserved(first) = ledger.reserve(&request(1, date, "12:00")).await.unwrap() else {
        panic!("first reservation failed");
    };
    ledger.cancel(first.id, Requester::User(1)).await.unwrap();

    assert!(matches!(
        ledger.reserve(&request(1, date, "12:00")).await.unwrap(),
        ReserveOutcome::Reserved(_)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_exceed_capacity() {
    let test = test_db().await;
    let ledger = BookingLedger::new(test.db.clone(), 3);
    let date = ymd(2024, 1, 2);
    for id in 1..=12 {
        register(&test.db, id).await;
    }

    let mut handles = Vec::new();
    for id in 1..=12 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.reserve(&request(id, date, "13:30")).await.unwrap()
        }));
    }

    let mut reserved = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ReserveOutcome::Reserved(_) => reserved += 1,
            ReserveOutcome::SlotFull => full += 1,
            ReserveOutcome::AlreadyBooked => panic!("distinct users cannot collide"),
        }
    }

    assert_eq!(reserved, 3);
    assert_eq!(full, 9);
    assert_eq!(ledger.remaining_capacity(date, slot("13:30")).await.unwrap(), 0);
}

#[tokio::test]
async fn cancel_checks_ownership() {
    let test = test_db().await;
    let ledger = BookingLedger::new(test.db.clone(), 2);
    let date = ymd(2024, 1, 2);
    register(&test.db, 1).await;

    let ReserveOutcome::Reserved(booking) = ledger.reserve(&request(1, date, "09:00")).await.unwrap() else {
        panic!("reservation failed");
    };

    assert_eq!(ledger.cancel(999, Requester::User(1)).await.unwrap(), CancelOutcome::NotFound);
    assert_eq!(
        ledger.cancel(booking.id, Requester::User(2)).await.unwrap(),
        CancelOutcome::Forbidden
    );

    let CancelOutcome::Cancelled(cancelled) = ledger.cancel(booking.id, Requester::Admin).await.unwrap() else {
        panic!("admin cancel failed");
    };
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.user_id, 1);

    // Повторная отмена уже неактивной брони
    assert_eq!(
        ledger.cancel(booking.id, Requester::User(1)).await.unwrap(),
        CancelOutcome::NotFound
    );
    assert_eq!(
        ledger.find(booking.id).await.unwrap().map(|b| b.status),
        Some(BookingStatus::Cancelled)
    );
}

#[tokio::test]
async fn expire_completes_past_bookings_once() {
    let test = test_db().await;
    let ledger = BookingLedger::new(test.db.clone(), 2);
    register(&test.db, 1).await;

    let ReserveOutcome::Reserved(past) = ledger.reserve(&request(1, ymd(2024, 1, 2), "09:00")).await.unwrap() else {
        panic!("reservation failed");
    };
    let ReserveOutcome::Reserved(later) = ledger.reserve(&request(1, ymd(2024, 1, 2), "16:30")).await.unwrap() else {
        panic!("reservation failed");
    };
    let ReserveOutcome::Reserved(future) = ledger.reserve(&request(1, ymd(2024, 1, 3), "09:00")).await.unwrap() else {
        panic!("reservation failed");
    };

    let now = at(ymd(2024, 1, 2), 12, 0);
    assert_eq!(ledger.expire_stale_past_bookings(now).await.unwrap(), 1);
    assert_eq!(ledger.expire_stale_past_bookings(now).await.unwrap(), 0);

    let status = |id| {
        let ledger = ledger.clone();
        async move { ledger.find(id).await.unwrap().unwrap().status }
    };
    assert_eq!(status(past.id).await, BookingStatus::Completed);
    assert_eq!(status(later.id).await, BookingStatus::Active);
    assert_eq!(status(future.id).await, BookingStatus::Active);

    // Слот, начавшийся ровно сейчас, ещё не прошёл
    assert_eq!(
        ledger.expire_stale_past_bookings(at(ymd(2024, 1, 2), 16, 30)).await.unwrap(),
        0
    );
    assert_eq!(
        ledger.expire_stale_past_bookings(at(ymd(2024, 1, 2), 16, 31)).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn listings_are_chronological_and_active_only() {
    let test = test_db().await;
    let ledger = BookingLedger::new(test.db.clone(), 2);
    register(&test.db, 1).await;
    register(&test.db, 2).await;

    for (user, date, time) in [
        (1, ymd(2024, 1, 4), "09:00"),
        (1, ymd(2024, 1, 2), "15:00"),
        (2, ymd(2024, 1, 2), "10:30"),
        (1, ymd(2024, 1, 2), "10:30"),
    ] {
        assert!(matches!(
            ledger.reserve(&request(user, date, time)).await.unwrap(),
            ReserveOutcome::Reserved(_)
        ));
    }
    let ReserveOutcome::Reserved(dropped) = ledger.reserve(&request(2, ymd(2024, 1, 3), "12:00")).await.unwrap() else {
        panic!("reservation failed");
    };
    ledger.cancel(dropped.id, Requester::User(2)).await.unwrap();

    let mine: Vec<_> = ledger
        .active_bookings_for_user(1)
        .await
        .unwrap()
        .into_iter()
        .map(|b| (b.date, b.time.to_string()))
        .collect();
    assert_eq!(
        mine,
        vec![
            (ymd(2024, 1, 2), "10:30".to_string()),
            (ymd(2024, 1, 2), "15:00".to_string()),
            (ymd(2024, 1, 4), "09:00".to_string()),
        ]
    );

    let all = ledger.all_active_bookings().await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| (w[0].booking.date, w[0].booking.time) <= (w[1].booking.date, w[1].booking.time)));
    assert!(all.iter().all(|owned| owned.first_name.is_some()));
    assert!(ledger.active_bookings_for_user(2).await.unwrap().len() == 1);
}

#[tokio::test]
async fn remaining_capacities_cover_every_requested_slot() {
    let test = test_db().await;
    let ledger = BookingLedger::new(test.db.clone(), 2);
    let date = ymd(2024, 1, 2);
    register(&test.db, 1).await;
    ledger.reserve(&request(1, date, "10:30")).await.unwrap();

    let slots = [slot("09:00"), slot("10:30"), slot("12:00")];
    let remaining = ledger.remaining_capacities(date, &slots).await.unwrap();
    assert_eq!(remaining, vec![(slots[0], 2), (slots[1], 1), (slots[2], 2)]);
}
