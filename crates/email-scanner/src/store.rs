//! Contact store abstraction.
//!
//! The persisted table lives in an external system; higher layers depend on
//! this trait, not on any concrete backend.

use anyhow::Result;
use shared_types::{Contact, ContactStatus, NewContact};

#[allow(async_fn_in_trait)]
pub trait ContactStore {
    async fn list_all(&self) -> Result<Vec<Contact>>;

    /// Case-insensitive lookup by address.
    async fn find_by_email(&self, email: &str) -> Result<Option<Contact>>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Contact>>;

    /// Append a contact. Returns `Ok(false)` when the email already exists;
    /// callers dedupe first, but the store re-verifies uniqueness itself.
    async fn append(&self, contact: NewContact) -> Result<bool>;

    /// Flip a contact's status. Returns `Ok(false)` when the email is not in
    /// the store.
    async fn set_status(&self, email: &str, status: ContactStatus) -> Result<bool>;
}
