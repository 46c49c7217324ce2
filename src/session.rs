//! Session/access controller.
//!
//! Owns the current identity, derives the administrator role from it and
//! persists the identity under a single storage key. Restore and persist
//! failures never reach the caller: the session falls back to anonymous.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Storage key holding the serialized identity
pub const SESSION_KEY: &str = "picsword_user";

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(alias = "image")]
    pub avatar_url: String,
}

impl User {
    /// First letter of the display name, used where no avatar can be shown
    pub fn initial(&self) -> char {
        self.name.chars().next().unwrap_or('U')
    }
}

/// Durable string key/value storage, the client-side equivalent of localStorage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store: one `<key>.json` file per key
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(anyhow!("Invalid storage key: {}", key));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!("Failed to read {}: {}", path.display(), e)),
        }
    }

    /// Whole-record replace: write a sibling temp file, then rename over the key
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!("Failed to remove {}: {}", path.display(), e)),
        }
    }
}

/// In-memory store for `--ephemeral` runs and tests
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Source of identities for sign-in.
/// The demo provider stands in for an external OAuth flow.
pub trait IdentityProvider {
    fn authenticate(&self) -> Result<User>;
}

/// Always yields the configured demo identity
pub struct DemoIdentityProvider {
    user: User,
}

impl DemoIdentityProvider {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

impl IdentityProvider for DemoIdentityProvider {
    fn authenticate(&self) -> Result<User> {
        Ok(self.user.clone())
    }
}

/// Result of restoring a persisted session at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No persisted identity
    Anonymous,
    /// Persisted identity restored
    Restored,
    /// Storage or parse failure; the session stays anonymous
    Recovered(String),
}

/// Result of a sign-in attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn,
    AlreadySignedIn,
    /// Provider refused; the session is unchanged
    Failed(String),
}

/// Single source of truth for the current actor
pub struct SessionController {
    store: Box<dyn KeyValueStore>,
    provider: Box<dyn IdentityProvider>,
    admin_email: String,
    user: Option<User>,
    loading: bool,
    persist_warnings: Vec<String>,
}

impl SessionController {
    pub fn new(
        store: Box<dyn KeyValueStore>,
        provider: Box<dyn IdentityProvider>,
        admin_email: &str,
    ) -> Self {
        Self {
            store,
            provider,
            admin_email: admin_email.to_string(),
            user: None,
            loading: true,
            persist_warnings: Vec::new(),
        }
    }

    /// Read the persisted identity. Never fails; clears `loading` once resolved.
    pub fn restore(&mut self) -> RestoreOutcome {
        let outcome = match self.store.get(SESSION_KEY) {
            Ok(None) => {
                self.user = None;
                RestoreOutcome::Anonymous
            }
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    self.user = Some(user);
                    RestoreOutcome::Restored
                }
                Err(e) => {
                    self.user = None;
                    RestoreOutcome::Recovered(format!("invalid session record: {}", e))
                }
            },
            Err(e) => {
                self.user = None;
                RestoreOutcome::Recovered(e.to_string())
            }
        };
        self.loading = false;
        outcome
    }

    /// Establish the provider's identity. No-op when already signed in.
    pub fn sign_in(&mut self) -> SignInOutcome {
        if self.user.is_some() {
            return SignInOutcome::AlreadySignedIn;
        }
        let user = match self.provider.authenticate() {
            Ok(user) => user,
            Err(e) => return SignInOutcome::Failed(e.to_string()),
        };
        self.persist(Some(&user));
        self.user = Some(user);
        SignInOutcome::SignedIn
    }

    /// Clear identity and the persisted record. Always succeeds.
    pub fn sign_out(&mut self) {
        self.user = None;
        self.persist(None);
    }

    fn persist(&mut self, user: Option<&User>) {
        let result = match user {
            Some(user) => serde_json::to_string(user)
                .map_err(anyhow::Error::from)
                .and_then(|json| self.store.set(SESSION_KEY, &json)),
            None => self.store.remove(SESSION_KEY),
        };
        if let Err(e) = result {
            self.persist_warnings.push(e.to_string());
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Derived from the current identity on every call
    pub fn is_admin(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| user.email == self.admin_email)
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    /// Drain storage failures swallowed while persisting
    pub fn take_persist_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.persist_warnings)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::rc::Rc;

    pub const ADMIN: &str = "admin@picsword.in";

    pub fn demo_user() -> User {
        User {
            id: "1".to_string(),
            name: "Demo User".to_string(),
            email: "demo@example.com".to_string(),
            avatar_url: "/placeholder.svg?height=40&width=40".to_string(),
        }
    }

    pub fn admin_user() -> User {
        User {
            id: "0".to_string(),
            name: "Admin".to_string(),
            email: ADMIN.to_string(),
            avatar_url: "/placeholder.svg?height=40&width=40".to_string(),
        }
    }

    /// Anonymous, restored controller backed by memory
    pub fn anonymous() -> SessionController {
        let mut session = SessionController::new(
            Box::new(MemoryStore::new()),
            Box::new(DemoIdentityProvider::new(demo_user())),
            ADMIN,
        );
        session.restore();
        session
    }

    /// Controller signed in as the given user
    pub fn signed_in_as(user: User) -> SessionController {
        let mut session = SessionController::new(
            Box::new(MemoryStore::new()),
            Box::new(DemoIdentityProvider::new(user)),
            ADMIN,
        );
        session.restore();
        session.sign_in();
        session
    }

    /// Shares one MemoryStore between controllers to simulate reloads
    struct SharedStore(Rc<MemoryStore>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<()> {
            self.0.remove(key)
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("storage unavailable"))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("storage unavailable"))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("storage unavailable"))
        }
    }

    struct RefusingProvider;

    impl IdentityProvider for RefusingProvider {
        fn authenticate(&self) -> Result<User> {
            Err(anyhow!("popup closed"))
        }
    }

    fn controller_on(store: &Rc<MemoryStore>, user: User) -> SessionController {
        SessionController::new(
            Box::new(SharedStore(store.clone())),
            Box::new(DemoIdentityProvider::new(user)),
            ADMIN,
        )
    }

    #[test]
    fn test_fresh_start_is_anonymous() {
        let store = Rc::new(MemoryStore::new());
        let mut session = controller_on(&store, demo_user());
        assert!(session.loading());
        assert_eq!(session.restore(), RestoreOutcome::Anonymous);
        assert!(!session.loading());
        assert!(session.user().is_none());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_restore_admin_identity() {
        let store = Rc::new(MemoryStore::new());
        store
            .set(SESSION_KEY, &serde_json::to_string(&admin_user()).unwrap())
            .unwrap();
        let mut session = controller_on(&store, demo_user());
        assert_eq!(session.restore(), RestoreOutcome::Restored);
        assert!(session.is_admin());
    }

    #[test]
    fn test_restore_accepts_image_field() {
        let store = Rc::new(MemoryStore::new());
        store
            .set(
                SESSION_KEY,
                r#"{"id":"1","name":"Demo User","email":"demo@example.com","image":"/a.svg"}"#,
            )
            .unwrap();
        let mut session = controller_on(&store, demo_user());
        assert_eq!(session.restore(), RestoreOutcome::Restored);
        assert_eq!(session.user().unwrap().avatar_url, "/a.svg");
    }

    #[test]
    fn test_sign_in_persists_and_survives_reload() {
        let store = Rc::new(MemoryStore::new());
        let mut session = controller_on(&store, demo_user());
        session.restore();
        assert_eq!(session.sign_in(), SignInOutcome::SignedIn);
        assert_eq!(session.user(), Some(&demo_user()));

        let raw = store.get(SESSION_KEY).unwrap().unwrap();
        assert!(raw.contains("\"avatarUrl\""));

        let mut reloaded = controller_on(&store, demo_user());
        assert_eq!(reloaded.restore(), RestoreOutcome::Restored);
        assert_eq!(reloaded.user(), Some(&demo_user()));
    }

    #[test]
    fn test_sign_in_is_idempotent() {
        let store = Rc::new(MemoryStore::new());
        store
            .set(SESSION_KEY, &serde_json::to_string(&admin_user()).unwrap())
            .unwrap();
        let mut session = controller_on(&store, demo_user());
        session.restore();
        assert_eq!(session.sign_in(), SignInOutcome::AlreadySignedIn);
        // Existing identity is kept, not replaced by the demo one
        assert_eq!(session.user(), Some(&admin_user()));
    }

    #[test]
    fn test_sign_out_then_reload_is_anonymous() {
        let store = Rc::new(MemoryStore::new());
        let mut session = controller_on(&store, demo_user());
        session.restore();
        session.sign_in();
        session.sign_out();
        assert!(session.user().is_none());

        let mut reloaded = controller_on(&store, demo_user());
        assert_eq!(reloaded.restore(), RestoreOutcome::Anonymous);
        assert!(reloaded.user().is_none());
    }

    #[test]
    fn test_corrupt_record_recovers_anonymous() {
        let store = Rc::new(MemoryStore::new());
        store.set(SESSION_KEY, "{not json").unwrap();
        let mut session = controller_on(&store, demo_user());
        assert!(matches!(session.restore(), RestoreOutcome::Recovered(_)));
        assert!(session.user().is_none());
        assert!(!session.loading());
    }

    #[test]
    fn test_broken_storage_is_swallowed() {
        let mut session = SessionController::new(
            Box::new(BrokenStore),
            Box::new(DemoIdentityProvider::new(demo_user())),
            ADMIN,
        );
        assert!(matches!(session.restore(), RestoreOutcome::Recovered(_)));
        assert_eq!(session.sign_in(), SignInOutcome::SignedIn);
        assert!(session.is_signed_in());
        session.sign_out();
        assert!(!session.is_signed_in());
        assert_eq!(session.take_persist_warnings().len(), 2);
        assert!(session.take_persist_warnings().is_empty());
    }

    #[test]
    fn test_refused_sign_in_leaves_session_anonymous() {
        let mut session = SessionController::new(
            Box::new(MemoryStore::new()),
            Box::new(RefusingProvider),
            ADMIN,
        );
        session.restore();
        assert_eq!(
            session.sign_in(),
            SignInOutcome::Failed("popup closed".to_string())
        );
        assert!(session.user().is_none());
    }

    #[test]
    fn test_is_admin_tracks_user() {
        for user in [None, Some(demo_user()), Some(admin_user())] {
            let session = match user.clone() {
                Some(u) => signed_in_as(u),
                None => anonymous(),
            };
            let expected = user.as_ref().is_some_and(|u| u.email == ADMIN);
            assert_eq!(session.is_admin(), expected);
        }
    }

    #[test]
    fn test_file_store_roundtrip_and_remove() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::new(&dir.path().join("storage"));
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);

        store.set(SESSION_KEY, "{\"a\":1}").unwrap();
        assert_eq!(store.get(SESSION_KEY).unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("storage/picsword_user.json").exists());
        assert!(!dir.path().join("storage/.picsword_user.json.tmp").exists());

        store.remove(SESSION_KEY).unwrap();
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        // Removing twice is fine
        store.remove(SESSION_KEY).unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }
}
