use crate::page::Page;
use crc32fast::Hasher;

/// Derive a short, stable seed from a namespace string using CRC32
pub fn namespace_seed(namespace: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(namespace.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for blocks created during an editing session
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(namespace: &str) -> Self {
        Self {
            seed: namespace_seed(namespace),
            count: 0,
        }
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Generate the next ID not already used by a block in `page`
    pub fn new_block_id(&mut self, page: &Page) -> String {
        loop {
            let id = self.new_id();
            if !page.contains(&id) {
                return id;
            }
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("pagecraft")
    }
}
