//! The keyring over a persistent key store.

use std::sync::Arc;

use proptest::prelude::*;

use embargo::keyring::{CollectionKeyring, KeyringCache, StoreBackedCache};
use embargo::store::{SecretKeyStore, SqliteKeyStore};
use embargo::{Collection, CollectionDescription, User};
use embargo_testkit::{KeyringParams, StaticPermissions};

fn collection(id: &str) -> Collection {
    Collection::new(CollectionDescription::new(id, id))
}

#[tokio::test]
async fn test_populated_keys_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keys.db");
    let permissions = Arc::new(StaticPermissions::allow_all());

    let key = embargo::SecretKey::generate();
    let user = embargo_testkit::user_with_keys("a@example.com", [("c-1".to_string(), key.clone())]);
    {
        let store = Arc::new(SqliteKeyStore::open(&db).unwrap());
        let keyring = CollectionKeyring::new(Arc::new(StoreBackedCache::new(store)), permissions.clone());
        keyring.populate_from_user(Some(&user)).await.unwrap();
    }

    let store = Arc::new(SqliteKeyStore::open(&db).unwrap());
    assert_eq!(store.load("c-1").await.unwrap(), Some(key.clone()));

    let cache = Arc::new(StoreBackedCache::new(store));
    let keyring = CollectionKeyring::new(cache.clone(), permissions);
    let stranger = User::new("b@example.com");
    assert_eq!(
        keyring.get(Some(&stranger), Some(&collection("c-1"))).await.unwrap(),
        Some(key)
    );
    assert!(cache.contains("c-1").await);
}

#[tokio::test]
async fn test_removed_key_is_gone_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteKeyStore::open(dir.path().join("keys.db")).unwrap());
    let cache = Arc::new(StoreBackedCache::new(store.clone()));
    let keyring = CollectionKeyring::new(cache, Arc::new(StaticPermissions::allow_all()));
    let user = User::new("a@example.com");

    keyring
        .add(Some(&user), Some(&collection("c-1")), &embargo::SecretKey::generate())
        .await
        .unwrap();
    keyring.remove(Some(&user), Some(&collection("c-1"))).await.unwrap();
    keyring.remove(Some(&user), Some(&collection("c-1"))).await.unwrap();

    assert!(store.load("c-1").await.unwrap().is_none());
    assert!(keyring.get(Some(&user), Some(&collection("c-1"))).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_and_writers() {
    let cache = Arc::new(StoreBackedCache::new(Arc::new(SqliteKeyStore::open_memory().unwrap())));
    let keyring = Arc::new(CollectionKeyring::new(
        cache.clone(),
        Arc::new(StaticPermissions::allow_all()),
    ));

    let mut handles = Vec::new();
    for i in 0..16 {
        let keyring = keyring.clone();
        handles.push(tokio::spawn(async move {
            let user = User::new(format!("u{i}@example.com"));
            let target = collection(&format!("c-{}", i % 4));
            let key = embargo::SecretKey::from_bytes([(i % 4) as u8; 32]);
            keyring.add(Some(&user), Some(&target), &key).await.unwrap();
            keyring.get(Some(&user), Some(&target)).await.unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let got = handle.await.unwrap();
        assert_eq!(got, Some(embargo::SecretKey::from_bytes([(i % 4) as u8; 32])));
    }
    assert_eq!(cache.len().await, 4);
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn test_login_then_lookup_round_trips(params: KeyringParams) {
        let got = block_on(async {
            let store = Arc::new(SqliteKeyStore::open_memory().unwrap());
            let cache = Arc::new(StoreBackedCache::new(store));
            let keyring = CollectionKeyring::new(
                cache.clone(),
                Arc::new(StaticPermissions::allow_all()),
            );

            let user = params.user();
            keyring.populate_from_user(Some(&user)).await.unwrap();

            let mut found = Vec::new();
            for id in params.keys.keys() {
                found.push((id.clone(), cache.get(id).await.unwrap()));
            }
            found
        });

        for (id, key) in got {
            prop_assert_eq!(key.as_ref(), params.keys.get(&id));
        }
    }
}
