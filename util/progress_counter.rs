use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc,
};

/// A shared counter tracking how far a long running step has gotten, for example how many bytes of a csv file have been read.
#[derive(Clone, Debug)]
pub struct ProgressCounter {
	current: Arc<AtomicU64>,
	total: u64,
}

impl ProgressCounter {
	pub fn new(total: u64) -> Self {
		Self {
			current: Arc::new(AtomicU64::new(0)),
			total,
		}
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn get(&self) -> u64 {
		self.current.load(Ordering::Relaxed)
	}

	pub fn set(&self, value: u64) {
		self.current.store(value, Ordering::Relaxed);
	}
}

#[test]
fn test_progress_counter() {
	let counter = ProgressCounter::new(200);
	let clone = counter.clone();
	clone.set(50);
	assert_eq!(counter.get(), 50);
	counter.set(75);
	assert_eq!(clone.get(), 75);
	assert_eq!(counter.total(), 200);
}
