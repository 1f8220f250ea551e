/// Routes canonical keys to reducer indices.
///
/// Pure and lock-free: the result depends only on the key bytes and the
/// partition count, so it is stable across runs, builds and thread schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partitioner {
    partitions: usize,
}

impl Partitioner {
    /// Panics if `partitions` is zero.
    pub fn new(partitions: usize) -> Self {
        assert!(partitions > 0, "partition count must be non-zero");
        Self { partitions }
    }

    pub fn partitions(&self) -> usize { self.partitions }

    pub fn partition(&self, key: &str) -> usize { hash_to_partition(key, self.partitions) }
}

// djb2: h = h * 33 + byte, seeded with 5381
pub fn djb2(bytes: &[u8]) -> u64 {
    bytes.iter().fold(5381u64, |h, &b| h.wrapping_mul(33).wrapping_add(u64::from(b)))
}

pub fn hash_to_partition(key: &str, num_partitions: usize) -> usize {
    (djb2(key.as_bytes()) % num_partitions as u64) as usize
}
