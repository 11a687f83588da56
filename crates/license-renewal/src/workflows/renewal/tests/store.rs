use super::common::*;
use crate::workflows::renewal::domain::{
    ProcessDraft, ProcessId, ProcessStatus, ProcessType, UserProfile, UserProfilePatch,
};
use crate::workflows::renewal::events::StoreEvent;
use chrono::Duration;
use std::collections::BTreeSet;

#[tokio::test]
async fn fresh_store_starts_empty() {
    let (store, _, _) = open_store().await;

    assert_eq!(store.user_profile(), UserProfile::default());
    assert_eq!(store.process_data(), ProcessDraft::default());
    assert!(store.completed_processes().is_empty());
    assert!(!store.has_active_processes());
}

#[tokio::test]
async fn profile_updates_merge_shallowly() {
    let (store, _, _) = open_store().await;

    store
        .update_user_profile(UserProfilePatch {
            email: Some("ana@example.com".to_string()),
            country_code: Some("+502".to_string()),
            ..UserProfilePatch::default()
        })
        .await;
    store
        .update_user_profile(UserProfilePatch {
            phone_number: Some("5555-0101".to_string()),
            ..UserProfilePatch::default()
        })
        .await;

    assert_eq!(
        store.user_profile(),
        UserProfile {
            email: "ana@example.com".to_string(),
            phone_number: "5555-0101".to_string(),
            country_code: "+502".to_string(),
        }
    );
}

#[tokio::test]
async fn submitting_snapshots_and_resets_the_draft() {
    let (store, _, _) = open_store().await;
    store
        .update_process_types(BTreeSet::from([ProcessType::Renewal]))
        .await;
    store.update_license_information(license_patch()).await;
    store.update_delivery_address(address_patch()).await;
    let draft = store.process_data();

    let id = store
        .add_completed_process(100.0)
        .await
        .expect("process submitted");

    let process = store.completed_process(&id).expect("process recorded");
    assert_eq!(process.amount, 100.0);
    assert_eq!(process.status, ProcessStatus::Pending);
    assert_eq!(process.draft, draft);
    assert_eq!(process.payment_date, payment_time());
    assert_eq!(
        process.estimated_delivery_date,
        process.payment_date + Duration::days(14)
    );
    assert!(!process.visual_test_completed);
    assert!(!process.document_verification_completed);
    assert!(!process.transit_verification_completed);
    assert!(process.test_results.colorblind.is_none());

    assert_eq!(store.process_data(), ProcessDraft::default());
    assert!(store.process_data().process_types.is_empty());
}

#[tokio::test]
async fn ids_are_unique_even_within_the_same_millisecond() {
    let (store, _, clock) = open_store().await;

    let first = submitted(&store).await;
    let second = submitted(&store).await;
    clock.advance(Duration::milliseconds(1));
    let third = submitted(&store).await;

    assert_eq!(first.as_str(), payment_time().timestamp_millis().to_string());
    assert_eq!(second.as_str(), format!("{}-1", first));
    assert_ne!(third, first);
    assert_ne!(third, second);
    assert_eq!(store.completed_processes().len(), 3);
}

#[tokio::test]
async fn any_submission_counts_as_active_regardless_of_status() {
    let (store, _, _) = open_store().await;
    assert!(!store.has_active_processes());

    let id = submitted(&store).await;
    assert!(store.has_active_processes());

    store
        .update_completed_process_status(&id, ProcessStatus::Completed)
        .await;
    assert!(store.has_active_processes());
}

#[tokio::test]
async fn status_updates_accept_any_transition_and_are_idempotent() {
    let (store, _, _) = open_store().await;
    let id = submitted(&store).await;

    store
        .update_completed_process_status(&id, ProcessStatus::Completed)
        .await;
    let once = store.completed_processes();
    store
        .update_completed_process_status(&id, ProcessStatus::Completed)
        .await;
    assert_eq!(store.completed_processes(), once);

    store
        .update_completed_process_status(&id, ProcessStatus::Pending)
        .await;
    assert_eq!(
        store.completed_process(&id).expect("present").status,
        ProcessStatus::Pending
    );
}

#[tokio::test]
async fn status_update_for_unknown_id_is_ignored() {
    let (store, _, _) = open_store().await;
    let id = submitted(&store).await;
    let before = store.completed_processes();

    store
        .update_completed_process_status(&ProcessId::from("nope"), ProcessStatus::Processing)
        .await;

    assert_eq!(store.completed_processes(), before);
    assert_eq!(
        store.completed_process(&id).expect("present").status,
        ProcessStatus::Pending
    );
}

#[tokio::test]
async fn process_types_are_replaced_wholesale() {
    let (store, _, _) = open_store().await;
    store
        .update_process_types(BTreeSet::from([ProcessType::Renewal, ProcessType::Replacement]))
        .await;
    store
        .update_process_types(BTreeSet::from([ProcessType::Replacement]))
        .await;

    assert_eq!(
        store.process_data().process_types,
        BTreeSet::from([ProcessType::Replacement])
    );
}

#[tokio::test]
async fn subscribers_see_each_mutation() {
    let (store, _, _) = open_store().await;
    let mut events = store.subscribe();

    store.update_license_information(license_patch()).await;
    let id = submitted(&store).await;
    store
        .update_completed_process_status(&ProcessId::from("missing"), ProcessStatus::Completed)
        .await;
    store.logout().await;

    assert_eq!(events.recv().await.expect("event"), StoreEvent::DraftUpdated);
    assert_eq!(
        events.recv().await.expect("event"),
        StoreEvent::ProcessSubmitted { id }
    );
    assert_eq!(events.recv().await.expect("event"), StoreEvent::DraftUpdated);
    assert_eq!(events.recv().await.expect("event"), StoreEvent::LoggedOut);
    assert!(events.try_recv().is_err());
}
