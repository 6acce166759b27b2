use std::{
	num::NonZeroUsize,
	sync::{
		Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use lru::LruCache;

use sift_config::EmbeddingProviderConfig;

use crate::{EmbeddingProvider, Error, Result, text, vector};

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	pub len: usize,
}

/// Process-wide LRU of normalized question text to unit-length embedding.
///
/// Only single question embeddings go through here. Chunk content is embedded in batches
/// without touching the cache.
pub struct EmbeddingCache {
	entries: Mutex<LruCache<String, Vec<f32>>>,
	hits: AtomicU64,
	misses: AtomicU64,
}
impl EmbeddingCache {
	pub fn new(capacity: NonZeroUsize) -> Self {
		Self {
			entries: Mutex::new(LruCache::new(capacity)),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
		}
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
	}

	pub fn from_config(cfg: &sift_config::Cache) -> Self {
		Self::with_capacity(cfg.embedding_capacity as usize)
	}

	/// Returns the cached vector for `text` (marking it most recently used) or embeds it and
	/// stores the unit-length result.
	pub async fn get_or_embed(
		&self,
		provider: &dyn EmbeddingProvider,
		cfg: &EmbeddingProviderConfig,
		text: &str,
	) -> Result<Vec<f32>> {
		let key = text::normalize_query(text);

		if let Some(hit) = self.lookup(&key) {
			self.hits.fetch_add(1, Ordering::Relaxed);

			tracing::debug!(key_len = key.len(), "Embedding cache hit.");

			return Ok(hit);
		}

		self.misses.fetch_add(1, Ordering::Relaxed);

		// The lock is not held across the provider call.
		let input = [text.trim().to_string()];
		let embedded = provider.embed(cfg, &input).await?;
		let raw = embedded.into_iter().next().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;
		let unit = vector::normalize(&raw).ok_or_else(|| Error::Provider {
			message: "Embedding provider returned a zero or non-finite vector.".to_string(),
		})?;

		self.store(key, unit.clone());

		Ok(unit)
	}

	/// Cached vector for `text`, if any. A hit becomes the most recently used entry.
	pub fn get(&self, text: &str) -> Option<Vec<f32>> {
		self.lookup(&text::normalize_query(text))
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.lock().cap().get()
	}

	pub fn stats(&self) -> CacheStats {
		CacheStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			len: self.len(),
		}
	}

	pub fn reset(&self) {
		self.lock().clear();
		self.hits.store(0, Ordering::Relaxed);
		self.misses.store(0, Ordering::Relaxed);
	}

	fn lookup(&self, key: &str) -> Option<Vec<f32>> {
		self.lock().get(key).cloned()
	}

	fn store(&self, key: String, vector: Vec<f32>) {
		// `put` evicts the least recently used entry once capacity is reached.
		self.lock().put(key, vector);
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Vec<f32>>> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner())
	}
}
impl Default for EmbeddingCache {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}
}
