use std::slice::Iter;

/// Append-only queue read one frontier ("window") at a time.
///
/// Pushes land after the current window and become visible on the next
/// `slide_window`.
pub struct SlidingQueue<T> {
    inner: Vec<T>,
    shared_out_start: usize,
    shared_out_end: usize,
}

impl<T> SlidingQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(size_hint: usize) -> Self {
        Self {
            inner: Vec::with_capacity(size_hint),
            shared_out_start: 0,
            shared_out_end: 0,
        }
    }

    pub fn push_back(&mut self, entry: T) {
        self.inner.push(entry);
    }

    /// Number of entries in the current window.
    pub fn size(&self) -> usize {
        self.shared_out_end - self.shared_out_start
    }

    pub fn empty(&self) -> bool {
        self.shared_out_start == self.shared_out_end
    }

    pub fn reset(&mut self) {
        self.inner.clear();
        self.shared_out_start = 0;
        self.shared_out_end = 0;
    }

    pub fn slide_window(&mut self) {
        self.shared_out_start = self.shared_out_end;
        self.shared_out_end = self.inner.len();
    }

    pub fn window(&self) -> &[T] {
        &self.inner[self.shared_out_start..self.shared_out_end]
    }
}

impl<T> Default for SlidingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a SlidingQueue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.window().iter()
    }
}
