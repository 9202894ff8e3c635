//! The `user-profile` workload: a social-site shaped mix over realistic
//! profile documents: fetches (login, viewing someone), status updates,
//! account lockouts, an email lookup through a secondary index, and a
//! related-profile search over status text.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, OpError};
use crate::executor::ExecutionContext;
use crate::matrix::Matrix;
use crate::store::DocumentStore;
use crate::workload::{Document, Runctx, Workload};

use super::{create_query_index, document_rng, ensure_search_index, fake};

pub const NAME: &str = "user-profile";

const OPERATIONS: &[&str] = &[
    "fetch-profile",
    "update-profile",
    "lock-profile",
    "find-profile",
    "find-related-profiles",
];
const EMAIL_INDEX: &str = "profile-email";
const STATUS_INDEX: &str = "profile-statuses";

const MAX_STATUS_WORDS: usize = 12;

#[derive(Debug, Serialize, Deserialize)]
struct Profile {
    name: String,
    email: String,
    created: String,
    status: String,
    enabled: bool,
}

pub struct UserProfile {
    store: Arc<dyn DocumentStore>,
    num_items: u64,
    seed: u64,
}

impl UserProfile {
    pub fn new(store: Arc<dyn DocumentStore>, num_items: u64, seed: u64) -> Self {
        Self {
            store,
            num_items,
            seed,
        }
    }

    fn random_name(&self, rctx: &mut Runctx) -> String {
        format!("u{}", rctx.rng().gen_range(0..self.num_items.max(1)))
    }

    async fn load(&self, name: &str, action: &str) -> Result<Profile, OpError> {
        let value = self
            .store
            .get(name)
            .await
            .map_err(|e| format!("profile fetch during {action} failed: {e}"))?;
        serde_json::from_value(value)
            .map_err(|e| format!("unable to load profile into struct: {e}").into())
    }

    async fn save(&self, name: &str, profile: &Profile) -> Result<(), OpError> {
        let value = serde_json::to_value(profile)
            .map_err(|e| format!("unable to serialize profile: {e}"))?;
        self.store
            .upsert(name, value)
            .await
            .map_err(|e| format!("profile upsert failed: {e}"))?;
        Ok(())
    }

    /// Fetch a random profile in the range of profiles.
    async fn fetch_profile(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let name = self.random_name(rctx);
        self.store
            .get(&name)
            .await
            .map_err(|e| format!("profile fetch failed: {e}"))?;
        Ok(())
    }

    /// Replace the status text on a random profile.
    async fn update_profile(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let name = self.random_name(rctx);
        let mut profile = self.load(&name, "update").await?;
        profile.status = fake::status_text(rctx.rng(), MAX_STATUS_WORDS);
        self.save(&name, &profile).await
    }

    /// Disable a random profile (account lockout).
    async fn lock_profile(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let name = self.random_name(rctx);
        let mut profile = self.load(&name, "lock").await?;
        profile.enabled = false;
        self.save(&name, &profile).await
    }

    /// Look a profile up through the secondary index on email.
    async fn find_profile(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let prefix = fake::letter(rctx.rng()).to_string();
        self.store
            .find_by_prefix("email", &prefix, 1)
            .await
            .map_err(|e| format!("find-profile query failed: {e}"))?;
        Ok(())
    }

    /// Search status text for people with similar interests.
    async fn find_related_profiles(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let term = fake::word(rctx.rng());
        self.store
            .search(STATUS_INDEX, term)
            .await
            .map_err(|e| format!("related-profile search failed: {e}"))?;
        Ok(())
    }
}

#[async_trait]
impl Workload for UserProfile {
    fn operations(&self) -> &'static [&'static str] {
        OPERATIONS
    }

    fn probabilities(&self) -> Matrix {
        Matrix(vec![
            vec![0.0, 0.8, 0.1, 0.05, 0.05],
            vec![0.6, 0.0, 0.2, 0.1, 0.1],
            vec![0.5, 0.3, 0.0, 0.15, 0.05],
            vec![0.4, 0.3, 0.2, 0.0, 0.1],
            vec![0.3, 0.3, 0.2, 0.2, 0.0],
        ])
    }

    /// A profile of realistic size: name, derived email, creation date,
    /// status text, and an enabled flag.
    fn generate_document(&self, id: u64) -> Document {
        let mut rng = document_rng(self.seed, id);
        let name = fake::full_name(&mut rng);
        let email = fake::email(&mut rng, &name);
        let profile = Profile {
            name,
            email,
            created: fake::date(&mut rng),
            status: fake::status_text(&mut rng, MAX_STATUS_WORDS),
            enabled: true,
        };
        Document {
            name: format!("u{id}"),
            data: serde_json::to_value(profile).expect("profile serializes"),
        }
    }

    async fn execute(
        &self,
        operation: &str,
        _ctx: &ExecutionContext,
        rctx: &mut Runctx,
    ) -> Result<(), OpError> {
        match operation {
            "fetch-profile" => self.fetch_profile(rctx).await,
            "update-profile" => self.update_profile(rctx).await,
            "lock-profile" => self.lock_profile(rctx).await,
            "find-profile" => self.find_profile(rctx).await,
            "find-related-profiles" => self.find_related_profiles(rctx).await,
            other => Err(format!("unknown operation: {other}").into()),
        }
    }

    async fn setup(&self) -> Result<(), Error> {
        create_query_index(self.store.as_ref(), EMAIL_INDEX, "email").await?;
        ensure_search_index(self.store.as_ref(), STATUS_INDEX, "status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::Value;

    fn workload(store: Arc<MemoryStore>) -> UserProfile {
        UserProfile::new(store, 10, 11211)
    }

    async fn seeded() -> (Arc<MemoryStore>, UserProfile) {
        let store = Arc::new(MemoryStore::new());
        let w = workload(store.clone());
        for id in 0..10 {
            let doc = w.generate_document(id);
            store.upsert(&doc.name, doc.data).await.unwrap();
        }
        w.setup().await.unwrap();
        (store, w)
    }

    #[test]
    fn matrix_is_square_with_a_zero_diagonal() {
        let w = workload(Arc::new(MemoryStore::new()));
        let m = w.probabilities();
        assert_eq!(m.len(), w.operations().len());
        for (i, row) in m.0.iter().enumerate() {
            assert_eq!(row.len(), w.operations().len());
            assert_eq!(row[i], 0.0);
        }
    }

    #[test]
    fn profiles_are_deterministic_and_well_formed() {
        let w = workload(Arc::new(MemoryStore::new()));
        assert_eq!(w.generate_document(4), w.generate_document(4));

        let doc = w.generate_document(4);
        assert_eq!(doc.name, "u4");
        let profile: Profile = serde_json::from_value(doc.data).unwrap();
        assert!(profile.enabled);
        assert!(profile.email.contains('@'));
        assert!(!profile.status.is_empty());
    }

    #[tokio::test]
    async fn every_operation_runs_against_a_seeded_store() {
        let (_store, w) = seeded().await;
        let (ctx, _control) = ExecutionContext::new();
        let mut rctx = Runctx::new(0, 11211);
        for op in w.operations() {
            w.execute(op, &ctx, &mut rctx).await.unwrap();
        }
    }

    #[tokio::test]
    async fn lock_profile_disables_the_account() {
        let (store, _) = seeded().await;
        let (ctx, _control) = ExecutionContext::new();
        // One document in range: the lock must land on u0.
        let narrow = UserProfile::new(store.clone(), 1, 11211);
        let mut rctx = Runctx::new(0, 11211);
        narrow.execute("lock-profile", &ctx, &mut rctx).await.unwrap();

        let value: Value = store.get("u0").await.unwrap();
        assert_eq!(value["enabled"], Value::Bool(false));
    }
}
