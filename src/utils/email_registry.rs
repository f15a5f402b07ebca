use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::store::{Store, StoreError};

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn looks_like_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email.trim())
}

/// Answers "is this email already registered" without a database round trip
/// in the common cases.
///
/// 1. Cuckoo filter: a miss means the email is definitely free.
/// 2. Moka cache: a hit means the email is definitely taken.
/// 3. Otherwise the store decides.
pub struct EmailRegistry {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, bool>,
}

impl Default for EmailRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailRegistry {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(500_000)
                .time_to_live(Duration::from_secs(86400))
                .build(),
        }
    }

    /// Check if an email might be registered (false positives possible)
    pub fn might_exist(&self, email: &str) -> bool {
        let email = normalize(email);
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&email)
    }

    pub async fn mark_taken(&self, email: &str) {
        let email = normalize(email);
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&email);
        self.taken.insert(email, true).await;
    }

    /// Forget an email after its owner was deleted or changed address.
    pub async fn release(&self, email: &str) {
        let email = normalize(email);
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&email);
        self.taken.invalidate(&email).await;
    }

    pub async fn is_available(&self, email: &str, store: &dyn Store) -> Result<bool, StoreError> {
        // 1️⃣ Cuckoo filter: fast negative
        if !self.might_exist(email) {
            return Ok(true);
        }

        // 2️⃣ Moka cache: fast positive
        let key = normalize(email);
        if self.taken.get(&key).await.unwrap_or(false) {
            return Ok(false);
        }

        // 3️⃣ Database fallback
        let exists = store.email_exists(email.trim()).await?;
        if exists {
            self.taken.insert(key, true).await;
        }
        Ok(!exists)
    }

    /// Load every registered email into the filter, in batches.
    pub async fn warmup(&self, store: &dyn Store, batch_size: usize) -> Result<usize, StoreError> {
        let mut stream = store.emails();
        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(email) = stream.next().await {
            batch.push(normalize(&email?));
            total += 1;

            if batch.len() >= batch_size {
                self.add_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.add_batch(&batch);
        }

        info!(total, "Email registry warmup complete");
        Ok(total)
    }

    fn add_batch(&self, emails: &[String]) {
        let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
        for email in emails {
            filter.add(email);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::NewEmployee;
    use crate::store::{EmployeeStore, memory::MemoryStore};

    fn new_employee(email: &str) -> NewEmployee {
        NewEmployee {
            name: "Budi".into(),
            gender: "male".into(),
            email: email.into(),
            phone_number: "0812".into(),
            photo_profile: None,
        }
    }

    #[actix_web::test]
    async fn unknown_email_is_available_without_store_lookup() {
        let registry = EmailRegistry::new();
        let store = MemoryStore::new();
        assert!(registry.is_available("new@company.com", &store).await.unwrap());
    }

    #[actix_web::test]
    async fn warmed_up_email_is_taken() {
        let store = MemoryStore::new();
        store
            .create_employee("hash", &new_employee("budi@company.com"))
            .await
            .unwrap();

        let registry = EmailRegistry::new();
        let loaded = registry.warmup(&store, 1).await.unwrap();

        // identity + employee contact
        assert_eq!(loaded, 2);
        assert!(registry.might_exist("BUDI@company.com"));
        assert!(!registry.is_available("budi@company.com", &store).await.unwrap());
    }

    #[actix_web::test]
    async fn released_email_becomes_available_again() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();
        registry.mark_taken("gone@company.com").await;
        assert!(!registry.is_available("gone@company.com", &store).await.unwrap());

        registry.release("gone@company.com").await;
        assert!(registry.is_available("gone@company.com", &store).await.unwrap());
    }

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("no-at.example.com"));
    }
}
