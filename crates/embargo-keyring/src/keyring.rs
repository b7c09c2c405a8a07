//! The access-gated keyring.

use std::sync::Arc;

use embargo_core::{Collection, CollectionDescription, SecretKey, User, UserKeyring};

use crate::cache::KeyringCache;
use crate::error::{InvalidInput, KeyringError, Result};
use crate::permissions::PermissionService;

/// Hands out collection keys to permitted users.
///
/// Both collaborators are required at construction, so a `CollectionKeyring`
/// value is always usable.
pub struct CollectionKeyring {
    cache: Arc<dyn KeyringCache>,
    permissions: Arc<dyn PermissionService>,
}

impl CollectionKeyring {
    pub fn new(cache: Arc<dyn KeyringCache>, permissions: Arc<dyn PermissionService>) -> Self {
        Self { cache, permissions }
    }

    /// Get the key for a collection.
    ///
    /// Returns `Ok(None)` when the user lacks access (the cache is not
    /// consulted) or when no key is held for the collection.
    pub async fn get(
        &self,
        user: Option<&User>,
        collection: Option<&Collection>,
    ) -> Result<Option<SecretKey>> {
        let (user, collection, description) = validate(user, collection)?;

        let permitted = self
            .permissions
            .has_access(user, collection)
            .await
            .map_err(|source| KeyringError::PermissionCheckFailed {
                collection_id: description.id.clone(),
                email: user.email.clone(),
                source,
            })?;

        if !permitted {
            tracing::debug!(
                collection_id = %description.id,
                user = %user.email,
                "key request denied"
            );
            return Ok(None);
        }

        self.cache
            .get(&description.id)
            .await
            .map_err(|source| KeyringError::CacheFailure {
                collection_id: description.id.clone(),
                source,
            })
    }

    /// Remove the key for a collection. Requires edit permission; without it
    /// this does nothing. Removing an absent key succeeds.
    pub async fn remove(&self, user: Option<&User>, collection: Option<&Collection>) -> Result<()> {
        let (user, _, description) = validate(user, collection)?;

        if !self.can_edit(user, description).await? {
            tracing::debug!(
                collection_id = %description.id,
                user = %user.email,
                "key removal denied"
            );
            return Ok(());
        }

        self.cache
            .remove(&description.id)
            .await
            .map_err(|source| KeyringError::CacheFailure {
                collection_id: description.id.clone(),
                source,
            })?;

        tracing::info!(collection_id = %description.id, user = %user.email, "removed collection key");
        Ok(())
    }

    /// Register the key of a newly created collection.
    ///
    /// Requires edit permission. Returns `false` if the user is not permitted.
    pub async fn add(
        &self,
        user: Option<&User>,
        collection: Option<&Collection>,
        key: &SecretKey,
    ) -> Result<bool> {
        let (user, _, description) = validate(user, collection)?;

        if !self.can_edit(user, description).await? {
            return Ok(false);
        }

        self.cache
            .add(&description.id, key)
            .await
            .map_err(|source| KeyringError::CacheFailure {
                collection_id: description.id.clone(),
                source,
            })?;
        Ok(true)
    }

    /// Copy every key in the user's unlocked keyring into the cache.
    ///
    /// Stops at the first failing add; keys added before it remain cached.
    pub async fn populate_from_user(&self, user: Option<&User>) -> Result<()> {
        let user = user.ok_or(InvalidInput::UserMissing)?;
        let keys = match &user.keyring {
            None => return Err(InvalidInput::UserKeyringMissing.into()),
            Some(UserKeyring::Locked) => return Err(InvalidInput::UserKeyringLocked.into()),
            Some(UserKeyring::Unlocked(keys)) => keys,
        };

        if keys.is_empty() {
            return Ok(());
        }

        for (collection_id, key) in keys {
            self.cache
                .add(collection_id, key)
                .await
                .map_err(|source| KeyringError::CacheFailure {
                    collection_id: collection_id.clone(),
                    source,
                })?;
        }

        tracing::info!(user = %user.email, keys = keys.len(), "populated keyring cache from user");
        Ok(())
    }

    async fn can_edit(&self, user: &User, description: &CollectionDescription) -> Result<bool> {
        self.permissions
            .can_edit(user, description)
            .await
            .map_err(|source| KeyringError::PermissionCheckFailed {
                collection_id: description.id.clone(),
                email: user.email.clone(),
                source,
            })
    }
}

/// Check the arguments of a per-collection call, in order.
fn validate<'a>(
    user: Option<&'a User>,
    collection: Option<&'a Collection>,
) -> std::result::Result<(&'a User, &'a Collection, &'a CollectionDescription), InvalidInput> {
    let user = user.ok_or(InvalidInput::UserMissing)?;
    let collection = collection.ok_or(InvalidInput::CollectionMissing)?;
    let description = collection
        .description
        .as_ref()
        .ok_or(InvalidInput::DescriptionMissing)?;
    if description.id.is_empty() {
        return Err(InvalidInput::CollectionIdMissing);
    }
    Ok((user, collection, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use proptest::prelude::*;

    use crate::error::{CacheError, PermissionError};

    /// In-memory cache that counts every call and can be told to fail adds.
    #[derive(Default)]
    struct CountingCache {
        entries: Mutex<HashMap<String, SecretKey>>,
        gets: AtomicUsize,
        adds: AtomicUsize,
        removes: AtomicUsize,
        fail_add_after: Option<usize>,
    }

    impl CountingCache {
        fn failing_after(n: usize) -> Self {
            Self {
                fail_add_after: Some(n),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
                + self.adds.load(Ordering::SeqCst)
                + self.removes.load(Ordering::SeqCst)
        }

        fn insert(&self, id: &str, key: SecretKey) {
            self.entries.lock().unwrap().insert(id.to_string(), key);
        }

        fn contains(&self, id: &str) -> bool {
            self.entries.lock().unwrap().contains_key(id)
        }

        fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl KeyringCache for CountingCache {
        async fn get(&self, id: &str) -> std::result::Result<Option<SecretKey>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.lock().unwrap().get(id).cloned())
        }

        async fn add(&self, id: &str, key: &SecretKey) -> std::result::Result<(), CacheError> {
            let n = self.adds.fetch_add(1, Ordering::SeqCst);
            if self.fail_add_after.is_some_and(|limit| n >= limit) {
                return Err(CacheError::KeyMismatch {
                    collection_id: id.to_string(),
                });
            }
            self.insert(id, key.clone());
            Ok(())
        }

        async fn remove(&self, id: &str) -> std::result::Result<(), CacheError> {
            self.removes.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().unwrap().remove(id);
            Ok(())
        }
    }

    /// Answers every question the same way.
    struct StaticPermissions {
        access: bool,
        edit: bool,
        fail: bool,
    }

    impl StaticPermissions {
        fn grant(access: bool, edit: bool) -> Arc<Self> {
            Arc::new(Self {
                access,
                edit,
                fail: false,
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                access: true,
                edit: true,
                fail: true,
            })
        }

        fn answer(&self, value: bool) -> std::result::Result<bool, PermissionError> {
            if self.fail {
                Err(PermissionError::Backend("permissions offline".into()))
            } else {
                Ok(value)
            }
        }
    }

    #[async_trait]
    impl PermissionService for StaticPermissions {
        async fn has_access(
            &self,
            _user: &User,
            _collection: &Collection,
        ) -> std::result::Result<bool, PermissionError> {
            self.answer(self.access)
        }

        async fn can_edit(
            &self,
            _user: &User,
            _description: &CollectionDescription,
        ) -> std::result::Result<bool, PermissionError> {
            self.answer(self.edit)
        }
    }

    fn keyring(cache: Arc<CountingCache>, permissions: Arc<StaticPermissions>) -> CollectionKeyring {
        CollectionKeyring::new(cache, permissions)
    }

    fn collection(id: &str) -> Collection {
        Collection::new(CollectionDescription::new(id, "Test collection"))
    }

    fn user() -> User {
        User::new("publisher@example.com")
    }

    #[tokio::test]
    async fn test_get_returns_cached_key() {
        let cache = Arc::new(CountingCache::default());
        let key = SecretKey::generate();
        cache.insert("c-1", key.clone());

        let keyring = keyring(cache, StaticPermissions::grant(true, false));
        let got = keyring.get(Some(&user()), Some(&collection("c-1"))).await.unwrap();

        assert_eq!(got, Some(key));
    }

    #[tokio::test]
    async fn test_get_miss_is_none() {
        let keyring = keyring(
            Arc::new(CountingCache::default()),
            StaticPermissions::grant(true, true),
        );
        let got = keyring.get(Some(&user()), Some(&collection("c-1"))).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_get_denied_does_not_touch_cache() {
        let cache = Arc::new(CountingCache::default());
        cache.insert("c-1", SecretKey::generate());

        let keyring = keyring(cache.clone(), StaticPermissions::grant(false, false));
        let got = keyring.get(Some(&user()), Some(&collection("c-1"))).await.unwrap();

        assert!(got.is_none());
        assert_eq!(cache.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_distinct() {
        let keyring = keyring(
            Arc::new(CountingCache::default()),
            StaticPermissions::grant(true, true),
        );
        let user = user();
        let no_description = Collection::default();
        let empty_id = collection("");

        let cases = [
            (None, Some(collection("c-1")), InvalidInput::UserMissing),
            (Some(&user), None, InvalidInput::CollectionMissing),
            (Some(&user), Some(no_description), InvalidInput::DescriptionMissing),
            (Some(&user), Some(empty_id), InvalidInput::CollectionIdMissing),
        ];

        for (user, collection, expected) in cases {
            let err = keyring.get(user, collection.as_ref()).await.unwrap_err();
            assert!(
                matches!(err, KeyringError::InvalidInput(got) if got == expected),
                "expected {expected:?}, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_permission_fault_is_surfaced() {
        let keyring = keyring(Arc::new(CountingCache::default()), StaticPermissions::broken());

        let err = keyring
            .get(Some(&user()), Some(&collection("c-1")))
            .await
            .unwrap_err();
        match err {
            KeyringError::PermissionCheckFailed {
                collection_id,
                email,
                ..
            } => {
                assert_eq!(collection_id, "c-1");
                assert_eq!(email, "publisher@example.com");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remove_requires_edit() {
        let cache = Arc::new(CountingCache::default());
        cache.insert("c-1", SecretKey::generate());

        // Access alone is not enough.
        let viewer = keyring(cache.clone(), StaticPermissions::grant(true, false));
        viewer.remove(Some(&user()), Some(&collection("c-1"))).await.unwrap();
        assert!(cache.contains("c-1"));

        let editor = keyring(cache.clone(), StaticPermissions::grant(true, true));
        editor.remove(Some(&user()), Some(&collection("c-1"))).await.unwrap();
        assert!(!cache.contains("c-1"));

        // Idempotent.
        editor.remove(Some(&user()), Some(&collection("c-1"))).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_requires_edit() {
        let cache = Arc::new(CountingCache::default());
        let key = SecretKey::generate();

        let viewer = keyring(cache.clone(), StaticPermissions::grant(true, false));
        assert!(!viewer.add(Some(&user()), Some(&collection("c-1")), &key).await.unwrap());
        assert_eq!(cache.len(), 0);

        let editor = keyring(cache.clone(), StaticPermissions::grant(true, true));
        assert!(editor.add(Some(&user()), Some(&collection("c-1")), &key).await.unwrap());
        assert!(cache.contains("c-1"));
    }

    #[tokio::test]
    async fn test_populate_rejects_bad_users() {
        let keyring = keyring(
            Arc::new(CountingCache::default()),
            StaticPermissions::grant(true, true),
        );

        let cases = [
            (None, InvalidInput::UserMissing),
            (Some(user()), InvalidInput::UserKeyringMissing),
            (
                Some(user().with_keyring(UserKeyring::Locked)),
                InvalidInput::UserKeyringLocked,
            ),
        ];

        for (user, expected) in cases {
            let err = keyring.populate_from_user(user.as_ref()).await.unwrap_err();
            assert!(matches!(err, KeyringError::InvalidInput(got) if got == expected));
        }
    }

    #[tokio::test]
    async fn test_populate_empty_keyring_is_noop() {
        let cache = Arc::new(CountingCache::default());
        let keyring = keyring(cache.clone(), StaticPermissions::grant(true, true));

        let user = user().with_keyring(UserKeyring::unlocked());
        keyring.populate_from_user(Some(&user)).await.unwrap();

        assert_eq!(cache.calls(), 0);
    }

    #[tokio::test]
    async fn test_populate_aborts_on_first_failure() {
        let cache = Arc::new(CountingCache::failing_after(1));
        let keyring = keyring(cache.clone(), StaticPermissions::grant(true, true));

        let mut user_keyring = UserKeyring::unlocked();
        for i in 0..4 {
            user_keyring.put(format!("c-{i}"), SecretKey::generate());
        }
        let user = user().with_keyring(user_keyring);

        let err = keyring.populate_from_user(Some(&user)).await.unwrap_err();
        assert!(matches!(err, KeyringError::CacheFailure { .. }));

        // One add succeeded, the second failed, the rest never ran.
        assert_eq!(cache.adds.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    fn keyring_strategy() -> impl Strategy<Value = HashMap<String, [u8; 32]>> {
        prop::collection::hash_map("[a-z0-9]{1,12}", any::<[u8; 32]>(), 1..8)
    }

    proptest! {
        #[test]
        fn prop_populated_keys_are_retrievable(entries in keyring_strategy()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let cache = Arc::new(CountingCache::default());
                let keyring = keyring(cache, StaticPermissions::grant(true, true));

                let mut user_keyring = UserKeyring::unlocked();
                for (id, bytes) in &entries {
                    user_keyring.put(id.clone(), SecretKey::from_bytes(*bytes));
                }
                let user = user().with_keyring(user_keyring);
                keyring.populate_from_user(Some(&user)).await.unwrap();

                for (id, bytes) in &entries {
                    let got = keyring.get(Some(&user), Some(&collection(id))).await.unwrap();
                    prop_assert_eq!(got, Some(SecretKey::from_bytes(*bytes)));
                }
                Ok(())
            })?;
        }

        #[test]
        fn prop_denied_user_never_sees_a_key(entries in keyring_strategy()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let cache = Arc::new(CountingCache::default());
                for (id, bytes) in &entries {
                    cache.insert(id, SecretKey::from_bytes(*bytes));
                }
                let keyring = keyring(cache.clone(), StaticPermissions::grant(false, false));

                for id in entries.keys() {
                    let got = keyring.get(Some(&user()), Some(&collection(id))).await.unwrap();
                    prop_assert!(got.is_none());
                }
                prop_assert_eq!(cache.calls(), 0);
                Ok(())
            })?;
        }
    }
}
