//! End-to-end tests for the directory identity fragment
//!
//! Runs the HTTP fragment against the fake directory and checks what ends up on
//! the directory side.

mod common;

use common::{DirectoryRoute, FakeDirectory, DIRECTORY_DOMAIN};
use serde_json::{json, Value};
use song_director_store::fragment::{DirectoryFragment, Fragment, FragmentError, PartialRecord};
use song_director_store::{Property, PropertyValue, Rank};

fn fragment(directory: &FakeDirectory) -> DirectoryFragment {
    DirectoryFragment::new(directory.fragment_config()).unwrap()
}

fn ana() -> PartialRecord {
    PartialRecord {
        full_name: Some("Ana Lopez".to_string()),
        email_address: Some("ana@example.com".to_string()),
        phone_number: Some("5551234567".to_string()),
        rank_name: Some("Master".to_string()),
        is_active: Some(true),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_add_creates_directory_user() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);

    let id = fragment.try_add(&ana()).await.unwrap();
    assert_eq!(id.as_deref(), Some("user-1"));

    let user = directory.user("user-1").unwrap();
    assert_eq!(user["displayName"], "Ana Lopez");
    assert_eq!(user["mail"], "ana@example.com");
    assert_eq!(user["mobilePhone"], "5551234567");
    assert_eq!(user["jobTitle"], "Song Director");
    assert_eq!(user["mailNickname"], "ana.lopez");
    assert_eq!(
        user["userPrincipalName"],
        format!("ana.lopez@{}", DIRECTORY_DOMAIN)
    );
    assert_eq!(user["extension_Roles"], "SongDirector.Rank:Master");
    assert!(user.get("isActive").is_none());
}

#[tokio::test]
async fn test_get_by_id_reads_identity_fields() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);
    fragment.try_add(&ana()).await.unwrap();

    let record = fragment.try_get_by_id("user-1").await.unwrap();

    assert_eq!(record.id.as_deref(), Some("user-1"));
    assert_eq!(record.full_name.as_deref(), Some("Ana Lopez"));
    assert_eq!(record.phone_number.as_deref(), Some("5551234567"));
    assert_eq!(record.rank_name.as_deref(), Some("Master"));
    assert_eq!(record.is_active, None);
}

#[tokio::test]
async fn test_get_by_id_unknown_user_is_not_found() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);

    let result = fragment.try_get_by_id("user-404").await;

    assert!(matches!(result, Err(FragmentError::NotFound(id)) if id == "user-404"));
}

#[tokio::test]
async fn test_find_property() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);
    fragment.try_add(&ana()).await.unwrap();

    let rank = fragment
        .try_find_property_by_id("user-1", Property::Rank)
        .await
        .unwrap();
    assert_eq!(rank, Some(PropertyValue::Rank(Rank::Master)));

    let active = fragment
        .try_find_property_by_id("user-1", Property::IsActive)
        .await;
    assert!(matches!(
        active,
        Err(FragmentError::PropertyNotStored {
            property: Property::IsActive,
            ..
        })
    ));
}

#[tokio::test]
async fn test_find_property_with_unknown_rank() {
    let directory = FakeDirectory::spawn().await;
    directory.insert_user(
        "legacy",
        json!({
            "displayName": "Old Timer",
            "mail": "old@example.com",
            "jobTitle": "Song Director",
            "extension_Roles": "SongDirector.Rank:Emperor",
        }),
    );
    let fragment = fragment(&directory);

    let result = fragment
        .try_find_property_by_id("legacy", Property::Rank)
        .await;

    assert!(matches!(
        result,
        Err(FragmentError::InvalidValue { value, .. }) if value == "Emperor"
    ));
}

#[tokio::test]
async fn test_update_clears_phone_and_rank() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);
    fragment.try_add(&ana()).await.unwrap();

    let update = PartialRecord {
        id: Some("user-1".to_string()),
        full_name: Some("Ana Lopez".to_string()),
        email_address: Some("ana.lopez@example.com".to_string()),
        phone_number: None,
        rank_name: None,
        is_active: Some(false),
    };
    fragment.try_update(&update).await.unwrap();

    let user = directory.user("user-1").unwrap();
    assert_eq!(user["mail"], "ana.lopez@example.com");
    assert_eq!(user["mobilePhone"], Value::Null);
    assert_eq!(user["extension_Roles"], Value::Null);

    let record = fragment.try_get_by_id("user-1").await.unwrap();
    assert_eq!(record.phone_number, None);
    assert_eq!(record.rank_name, None);
}

#[tokio::test]
async fn test_update_requires_id() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);

    let result = fragment.try_update(&ana()).await;

    assert!(matches!(result, Err(FragmentError::MissingId(_))));
}

#[tokio::test]
async fn test_remove_then_restore() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);
    fragment.try_add(&ana()).await.unwrap();
    let snapshot = fragment.try_get_by_id("user-1").await.unwrap();

    fragment.try_remove_by_id("user-1").await.unwrap();
    assert!(directory.user("user-1").is_none());
    assert!(directory.is_deleted("user-1"));

    fragment.try_rollback_remove(&snapshot).await.unwrap();
    assert!(!directory.is_deleted("user-1"));
    assert_eq!(fragment.try_get_by_id("user-1").await.unwrap(), snapshot);
}

#[tokio::test]
async fn test_get_all_lists_song_directors_only() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);
    fragment.try_add(&ana()).await.unwrap();
    directory.insert_user(
        "accountant",
        json!({
            "displayName": "Carla Numbers",
            "mail": "carla@example.com",
            "jobTitle": "Accountant",
        }),
    );

    let records = fragment.try_get_all().await.unwrap();

    assert_eq!(directory.user_count(), 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn test_server_error_is_store_error() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);
    directory.fail(DirectoryRoute::Create);

    let result = fragment.try_add(&ana()).await;
    assert!(matches!(result, Err(FragmentError::Store(_))));
    assert_eq!(directory.user_count(), 0);

    directory.recover(DirectoryRoute::Create);
    assert_eq!(
        fragment.try_add(&ana()).await.unwrap().as_deref(),
        Some("user-1")
    );
}

#[tokio::test]
async fn test_path_like_id_does_not_reach_another_user() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);
    fragment.try_add(&ana()).await.unwrap();

    let intruder = PartialRecord {
        id: Some("nobody/../user-1".to_string()),
        full_name: Some("Bruno Diaz".to_string()),
        email_address: Some("bruno@example.com".to_string()),
        ..Default::default()
    };
    let update = fragment.try_update(&intruder).await;
    assert!(matches!(update, Err(FragmentError::NotFound(id)) if id == "nobody/../user-1"));

    let name = fragment
        .try_find_property_by_id("nobody/../user-1", Property::FullName)
        .await;
    assert!(matches!(name, Err(FragmentError::NotFound(_))));

    let removed = fragment.try_remove_by_id("nobody/../user-1").await;
    assert!(matches!(removed, Err(FragmentError::NotFound(_))));

    let user = directory.user("user-1").unwrap();
    assert_eq!(user["displayName"], "Ana Lopez");
    assert_eq!(user["mail"], "ana@example.com");
}

#[tokio::test]
async fn test_dot_segment_ids_are_rejected() {
    let directory = FakeDirectory::spawn().await;
    let fragment = fragment(&directory);
    fragment.try_add(&ana()).await.unwrap();

    for id in ["", ".", ".."] {
        assert!(matches!(
            fragment.try_get_by_id(id).await,
            Err(FragmentError::InvalidId(_))
        ));
        assert!(matches!(
            fragment.try_remove_by_id(id).await,
            Err(FragmentError::InvalidId(_))
        ));
    }
    assert!(directory.user("user-1").is_some());
}

#[tokio::test]
async fn test_id_with_reserved_characters_round_trips() {
    let directory = FakeDirectory::spawn().await;
    directory.insert_user(
        "a b?c#d",
        json!({
            "displayName": "Odd Id",
            "mail": "odd@example.com",
            "jobTitle": "Song Director",
        }),
    );
    let fragment = fragment(&directory);

    let record = fragment.try_get_by_id("a b?c#d").await.unwrap();
    assert_eq!(record.id.as_deref(), Some("a b?c#d"));
    assert_eq!(record.full_name.as_deref(), Some("Odd Id"));

    fragment.try_remove_by_id("a b?c#d").await.unwrap();
    assert!(directory.is_deleted("a b?c#d"));
}
