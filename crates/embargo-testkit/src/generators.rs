//! Proptest generators for property-based testing.

use std::collections::HashMap;

use proptest::prelude::*;

use embargo_core::{SecretKey, User, UserKeyring, KEY_LEN};

/// Generate a collection id.
pub fn collection_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,23}".prop_map(String::from)
}

/// Generate a CDID: four upper-case alphanumerics.
pub fn cdid() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9]{3}".prop_map(String::from)
}

/// Generate a random secret key.
pub fn secret_key() -> impl Strategy<Value = SecretKey> {
    any::<[u8; KEY_LEN]>().prop_map(SecretKey::from_bytes)
}

/// Generate a user email.
pub fn email() -> impl Strategy<Value = String> {
    "[a-z]{1,12}@example\\.com".prop_map(String::from)
}

/// Generate up to `max` collection keys.
pub fn keyring_entries(max: usize) -> impl Strategy<Value = HashMap<String, SecretKey>> {
    prop::collection::hash_map(collection_id(), secret_key(), 0..=max)
}

/// A user and the keys their unlocked keyring holds.
#[derive(Debug, Clone)]
pub struct KeyringParams {
    pub email: String,
    pub keys: HashMap<String, SecretKey>,
}

impl KeyringParams {
    pub fn user(&self) -> User {
        User::new(self.email.as_str()).with_keyring(UserKeyring::Unlocked(self.keys.clone()))
    }
}

impl Arbitrary for KeyringParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (email(), keyring_entries(8))
            .prop_map(|(email, keys)| KeyringParams { email, keys })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_keyring_params_user_is_unlocked(params: KeyringParams) {
            let user = params.user();
            let keyring = user.keyring.unwrap();
            prop_assert!(keyring.is_unlocked());
            prop_assert_eq!(keyring.keys().map(|k| k.len()), Some(params.keys.len()));
        }

        #[test]
        fn test_cdid_lowercases_to_index_form(cdid in cdid()) {
            prop_assert_eq!(cdid.len(), 4);
            prop_assert!(cdid.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}
