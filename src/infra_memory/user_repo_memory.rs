use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI64, Ordering};

/// User store kept in process memory. Email uniqueness is enforced through
/// the `emails` index, mirroring the unique constraint of the SQL schema.
#[derive(Debug)]
pub struct MemoryUserRepo {
    users: DashMap<UserId, UserRecord>,
    emails: DashMap<String, UserId>,
    next_id: AtomicI64,
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        MemoryUserRepo {
            users: DashMap::new(),
            emails: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserRepoError> {
        let Some(user_id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(user_id).await
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, UserRepoError> {
        Ok(self.users.get(&user_id).map(|rec| rec.clone()))
    }

    async fn exists(&self, email: &str) -> Result<bool, UserRepoError> {
        Ok(self.emails.contains_key(email))
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, UserRepoError> {
        // Lock order is always `users` then `emails`.
        let id = UserId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let Entry::Vacant(user_slot) = self.users.entry(id) else {
            return Err(UserRepoError::Store(format!("user id {id} already taken")));
        };

        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(UserRepoError::DuplicateEmail),
            Entry::Vacant(email_slot) => {
                email_slot.insert(id);
                let now = Utc::now();
                let rec = UserRecord {
                    id,
                    name: user.name,
                    email: user.email,
                    password_hash: user.password_hash,
                    created_at: now,
                    updated_at: now,
                };
                user_slot.insert(rec.clone());
                Ok(rec)
            }
        }
    }

    async fn list(&self) -> Result<Vec<UserRecord>, UserRepoError> {
        let mut users: Vec<UserRecord> = self.users.iter().map(|rec| rec.clone()).collect();
        users.sort_by_key(|rec| rec.id);
        Ok(users)
    }

    async fn update(
        &self,
        user_id: UserId,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, UserRepoError> {
        // The row stays locked until the email index agrees with it.
        let Some(mut rec) = self.users.get_mut(&user_id) else {
            return Ok(None);
        };

        if let Some(email) = changes.email {
            if email != rec.email {
                match self.emails.entry(email.clone()) {
                    Entry::Occupied(_) => return Err(UserRepoError::DuplicateEmail),
                    Entry::Vacant(slot) => {
                        slot.insert(user_id);
                    }
                }
                self.emails.remove(&rec.email);
                rec.email = email;
            }
        }
        if let Some(name) = changes.name {
            rec.name = name;
        }
        rec.updated_at = Utc::now();

        Ok(Some(rec.value().clone()))
    }

    async fn delete(&self, user_id: UserId) -> Result<Option<UserRecord>, UserRepoError> {
        let removed = self.users.remove(&user_id).map(|(_, rec)| rec);
        if let Some(rec) = &removed {
            self.emails.remove(&rec.email);
        }
        Ok(removed)
    }
}
