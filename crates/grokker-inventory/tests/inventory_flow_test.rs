//! End-to-end inventory session flows.

mod common;

use common::{Notification, assert_well_formed, epc, start_session, start_session_with};
use grokker_core::{Error, TagRead, TagReadState};
use grokker_inventory::{EpcFilter, FilterLocation, InventoryConfig, InventorySession, StopReason};
use std::thread;

#[test]
fn test_found_updated_lost_found_scenario() {
    let (session, observer) = start_session(EpcFilter::all());
    let e1 = epc(0xE1);

    session.on_read(TagRead::new(e1.clone(), 0)).unwrap();
    session.on_read(TagRead::new(e1.clone(), 100)).unwrap();
    for t in (500..10_100).step_by(500) {
        session.on_tick(t).unwrap();
    }
    assert_eq!(observer.states_for(&e1), vec![TagReadState::Found, TagReadState::Updated]);

    session.on_tick(10_100).unwrap();
    session.on_read(TagRead::new(e1.clone(), 10_200)).unwrap();

    assert_eq!(
        observer.states_for(&e1),
        vec![
            TagReadState::Found,
            TagReadState::Updated,
            TagReadState::Lost,
            TagReadState::Found,
        ]
    );
}

#[test]
fn test_notification_order() {
    let (session, observer) = start_session(EpcFilter::all());
    session.on_read(TagRead::new(epc(1), 0)).unwrap();
    session.on_tick(500).unwrap();
    session.stop();

    let notifications = observer.notifications();
    assert_eq!(notifications.len(), 4);
    assert_eq!(notifications[0], Notification::Started);
    assert!(matches!(notifications[1], Notification::Tag(_)));
    assert_eq!(
        notifications[2],
        Notification::HistoryInterval { at: 500, visible: 1 }
    );
    assert_eq!(notifications[3], Notification::Stopped(StopReason::Stopped));
}

#[test]
fn test_staggered_tags_lost_independently() {
    let (session, observer) = start_session(EpcFilter::all());
    let (a, b) = (epc(0xA), epc(0xB));

    session.on_read(TagRead::new(a.clone(), 0)).unwrap();
    session.on_read(TagRead::new(b.clone(), 5_000)).unwrap();

    assert_eq!(session.on_tick(10_000).unwrap(), vec![a.clone()]);
    assert_eq!(session.tags().unwrap().len(), 1);
    assert_eq!(session.on_tick(15_000).unwrap(), vec![b.clone()]);
    assert!(session.tags().unwrap().is_empty());

    assert_eq!(observer.states_for(&a), vec![TagReadState::Found, TagReadState::Lost]);
    assert_eq!(observer.states_for(&b), vec![TagReadState::Found, TagReadState::Lost]);
}

#[test]
fn test_steady_reads_never_lost() {
    let config = InventoryConfig::default().with_history(100, 10);
    let (session, observer) = start_session_with(config, EpcFilter::all());
    let tag = epc(7);

    for t in (0..20_000).step_by(250) {
        session.on_read(TagRead::new(tag.clone(), t)).unwrap();
        if t % 100 == 0 {
            assert!(session.on_tick(t).unwrap().is_empty());
        }
    }

    let states = observer.states_for(&tag);
    assert_eq!(states[0], TagReadState::Found);
    assert!(states[1..].iter().all(|s| *s == TagReadState::Updated));
    assert_well_formed(&states);
}

#[test]
fn test_find_rate_reported_in_events() {
    let config = InventoryConfig::default().with_history(1_000, 4);
    let (session, observer) = start_session_with(config, EpcFilter::all());
    let tag = epc(3);

    for t in [0, 1_000, 1_500, 2_000, 2_500] {
        session.on_read(TagRead::new(tag.clone(), t)).unwrap();
    }

    let events = observer.tag_events();
    assert_eq!(events[0].find_rate, 0.0);
    let last = events.last().unwrap();
    assert_eq!(last.total_reads, 5);
    assert_eq!(last.find_rate, 5.0 * 1000.0 / 2_500.0);
    assert!(events.iter().all(|e| e.find_rate >= 0.0));
}

#[test]
fn test_single_epc_filter() {
    let target = epc(42);
    let (session, observer) = start_session(EpcFilter::single(target.clone()));
    assert_eq!(session.filter_location(), FilterLocation::Reader);

    for n in 40..45 {
        session.on_read(TagRead::new(epc(n), 0)).unwrap();
    }
    assert_eq!(observer.transitions(), vec![(target, TagReadState::Found)]);
}

#[test]
fn test_large_allow_list_filtered_on_host() {
    let allow = (0..20).map(epc);
    let config = InventoryConfig::default().with_max_epcs_sent_to_reader(8);
    let (session, observer) = start_session_with(config, EpcFilter::allow(allow));
    assert_eq!(session.filter_location(), FilterLocation::Host);

    session.on_read(TagRead::new(epc(19), 0)).unwrap();
    session.on_read(TagRead::new(epc(20), 0)).unwrap();
    assert_eq!(observer.transitions(), vec![(epc(19), TagReadState::Found)]);
}

#[test]
fn test_conflicting_filter_creates_no_session() {
    let observer = common::RecordingObserver::new();
    let result = InventorySession::start(
        observer.clone(),
        InventoryConfig::default(),
        EpcFilter::new([epc(1)], [epc(2)]),
    );
    assert!(matches!(result, Err(Error::Configuration { .. })));
    assert!(observer.notifications().is_empty());
}

#[test]
fn test_stop_twice_same_as_once() {
    let (session, observer) = start_session(EpcFilter::all());
    session.on_read(TagRead::new(epc(1), 0)).unwrap();
    session.stop();
    let after_first = observer.notifications();

    session.stop();
    assert_eq!(observer.notifications(), after_first);
    assert_eq!(observer.stop_reasons(), vec![StopReason::Stopped]);
}

#[test]
fn test_no_notifications_after_concurrent_stop() {
    let (session, observer) = start_session(EpcFilter::all());

    let readers: Vec<_> = (0..4u32)
        .map(|worker| {
            let session = session.clone();
            thread::spawn(move || {
                for i in 0..500u64 {
                    let read = TagRead::new(epc(worker * 1_000 + (i % 50) as u32), i);
                    if session.on_read(read).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();

    thread::sleep(std::time::Duration::from_millis(1));
    session.stop();
    let at_stop = observer.notifications().len();

    for reader in readers {
        reader.join().unwrap();
    }

    let notifications = observer.notifications();
    assert_eq!(notifications.len(), at_stop);
    assert_eq!(
        notifications.last(),
        Some(&Notification::Stopped(StopReason::Stopped))
    );
    for n in 0..4u32 {
        for i in 0..50u32 {
            assert_well_formed(&observer.states_for(&epc(n * 1_000 + i)));
        }
    }
}

#[test]
fn test_sessions_are_independent() {
    let (first, first_observer) = start_session(EpcFilter::all());
    let (second, second_observer) = start_session(EpcFilter::all());
    assert_ne!(first.id(), second.id());

    first.on_read(TagRead::new(epc(1), 0)).unwrap();
    first.stop();
    second.on_read(TagRead::new(epc(1), 0)).unwrap();

    assert_eq!(first_observer.transitions().len(), 1);
    assert_eq!(second_observer.transitions().len(), 1);
    assert!(second.is_active());
}
