use crate::{Result, SyncError};

/// Splits a sequence into consecutive batches of at most `size` items.
///
/// Concatenating the batches reproduces the input exactly; only the last
/// batch may be shorter than `size`, and an empty input yields no batches.
///
/// # Examples
///
/// ```rust
/// use tracklist_sync::Chunker;
///
/// let batches: Vec<Vec<u32>> = Chunker::new(1..=5, 2).unwrap().collect();
/// assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
/// ```
#[derive(Debug, Clone)]
pub struct Chunker<I: Iterator> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Chunker<I> {
    /// Create a chunker. A size of zero is a configuration error.
    pub fn new(items: impl IntoIterator<IntoIter = I>, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(SyncError::Config("chunk size must be positive".to_string()));
        }
        Ok(Self {
            inner: items.into_iter(),
            size,
        })
    }
}

impl<I: Iterator> Iterator for Chunker<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<_> = self.inner.by_ref().take(self.size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}
