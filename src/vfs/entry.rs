use std::time::SystemTime;

use crate::core::utils;

/// A stored file of the in-memory backend: raw bytes plus modification time.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    content: Vec<u8>,
    modified: u64, // seconds since the Unix epoch
}

impl Entry {
    pub fn new(content: &[u8]) -> Entry {
        Entry {
            content: content.to_vec(),
            modified: now(),
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn modified(&self) -> u64 {
        self.modified
    }

    pub fn set_content(&mut self, content: &[u8]) {
        self.content = content.to_vec();
        self.touch();
    }

    pub fn append_content(&mut self, content: &[u8]) {
        self.content.extend_from_slice(content);
        self.touch();
    }

    pub fn prepend_content(&mut self, content: &[u8]) {
        self.content.splice(0..0, content.iter().copied());
        self.touch();
    }

    pub fn touch(&mut self) {
        self.modified = now();
    }
}

fn now() -> u64 {
    utils::unix_timestamp(SystemTime::now())
}
