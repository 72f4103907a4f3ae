//! In-memory fakes for the capability traits, shared by the engine and
//! importer tests.

use anyhow::{bail, Result};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::classifier::Classifier;
use crate::source::{MailSource, MessageRef, MessageSummary};
use crate::store::ContactStore;
use shared_types::{
    ClassifierVerdict, Contact, ContactStatus, NewContact, TokenGenerator,
};

pub fn summary(id: &str, name: &str, email: &str, subject: &str, excerpt: &str) -> MessageSummary {
    MessageSummary {
        id: id.to_string(),
        sender_name: name.to_string(),
        sender_email: email.to_string(),
        subject: subject.to_string(),
        excerpt: excerpt.to_string(),
        internal_date: Some(Utc::now()),
    }
}

#[derive(Default)]
pub struct MemoryMailSource {
    inbox: Vec<MessageSummary>,
    unsubscribe_inbox: Vec<MessageSummary>,
    failing_fetches: HashSet<String>,
}

impl MemoryMailSource {
    pub fn with_inbox(inbox: Vec<MessageSummary>) -> Self {
        Self {
            inbox,
            ..Default::default()
        }
    }

    pub fn with_inboxes(inbox: Vec<MessageSummary>, unsubscribe_inbox: Vec<MessageSummary>) -> Self {
        Self {
            inbox,
            unsubscribe_inbox,
            ..Default::default()
        }
    }

    pub fn fail_fetch(&mut self, id: &str) {
        self.failing_fetches.insert(id.to_string());
    }
}

impl MailSource for MemoryMailSource {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<MessageRef>> {
        let pool = if query.contains("{unsubscribe") {
            &self.unsubscribe_inbox
        } else {
            &self.inbox
        };
        Ok(pool
            .iter()
            .take(limit as usize)
            .map(|m| MessageRef { id: m.id.clone() })
            .collect())
    }

    async fn fetch(&self, message: &MessageRef) -> Result<MessageSummary> {
        if self.failing_fetches.contains(&message.id) {
            bail!("simulated fetch failure for {}", message.id);
        }
        self.inbox
            .iter()
            .chain(self.unsubscribe_inbox.iter())
            .find(|m| m.id == message.id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such message {}", message.id))
    }
}

#[derive(Default)]
pub struct ScriptedClassifier {
    verdicts: HashMap<String, ClassifierVerdict>,
    failing_senders: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn with_verdict(sender_email: &str, verdict: ClassifierVerdict) -> Self {
        let mut classifier = Self::default();
        classifier.set_verdict(sender_email, verdict);
        classifier
    }

    pub fn set_verdict(&mut self, sender_email: &str, verdict: ClassifierVerdict) {
        self.verdicts.insert(sender_email.to_string(), verdict);
    }

    pub fn fail_for(&mut self, sender_email: &str) {
        self.failing_senders.insert(sender_email.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    async fn classify(
        &self,
        _sender_name: &str,
        sender_email: &str,
        _subject: &str,
        _excerpt: &str,
    ) -> Result<ClassifierVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_senders.contains(sender_email) {
            bail!("simulated classifier failure for {sender_email}");
        }
        Ok(self
            .verdicts
            .get(sender_email)
            .cloned()
            .unwrap_or_default())
    }
}

pub struct MemoryContactStore {
    contacts: Mutex<Vec<Contact>>,
    tokens: TokenGenerator,
    mutations: AtomicUsize,
    appends_fail_as_duplicate: Mutex<bool>,
}

impl MemoryContactStore {
    pub fn new(tokens: TokenGenerator) -> Self {
        Self {
            contacts: Mutex::new(Vec::new()),
            tokens,
            mutations: AtomicUsize::new(0),
            appends_fail_as_duplicate: Mutex::new(false),
        }
    }

    /// Insert a contact directly, bypassing the mutation counter.
    pub async fn seed(&self, email: &str, name: &str, status: ContactStatus) {
        let token = self.tokens.token(email);
        self.contacts.lock().expect("lock").push(Contact {
            email: email.to_string(),
            name: name.to_string(),
            source: "manual".to_string(),
            date_added: Some(Utc::now()),
            classification: None,
            status,
            unsubscribe_token: token,
            notes: String::new(),
        });
    }

    pub async fn len(&self) -> usize {
        self.contacts.lock().expect("lock").len()
    }

    /// Number of mutating calls (append / set_status) that reached the store.
    pub async fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Make every append report a duplicate, as if another writer inserted
    /// the address between the caller's dedupe check and the append.
    pub async fn set_appends_fail_as_duplicate(&self, value: bool) {
        *self.appends_fail_as_duplicate.lock().expect("lock") = value;
    }
}

impl ContactStore for MemoryContactStore {
    async fn list_all(&self) -> Result<Vec<Contact>> {
        Ok(self.contacts.lock().expect("lock").clone())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Contact>> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .contacts
            .lock()
            .expect("lock")
            .iter()
            .find(|c| c.email_key() == needle)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Contact>> {
        Ok(self
            .contacts
            .lock()
            .expect("lock")
            .iter()
            .find(|c| c.unsubscribe_token == token)
            .cloned())
    }

    async fn append(&self, contact: NewContact) -> Result<bool> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if *self.appends_fail_as_duplicate.lock().expect("lock") {
            return Ok(false);
        }
        let key = contact.email.trim().to_lowercase();
        let mut contacts = self.contacts.lock().expect("lock");
        if contacts.iter().any(|c| c.email_key() == key) {
            return Ok(false);
        }
        let token = self.tokens.token(&contact.email);
        contacts.push(Contact {
            email: contact.email,
            name: contact.name,
            source: contact.source.as_str().to_string(),
            date_added: Some(Utc::now()),
            classification: contact.classification,
            status: ContactStatus::Active,
            unsubscribe_token: token,
            notes: contact.notes,
        });
        Ok(true)
    }

    async fn set_status(&self, email: &str, status: ContactStatus) -> Result<bool> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let needle = email.trim().to_lowercase();
        let mut contacts = self.contacts.lock().expect("lock");
        match contacts.iter_mut().find(|c| c.email_key() == needle) {
            Some(contact) => {
                contact.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
