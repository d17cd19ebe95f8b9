/// A dense, growable bitset over resource indices.
///
/// In a requirement mask a set bit means "needed"; in the availability mask a
/// set bit means "free".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMask {
    words: Vec<u64>,
    len: usize,
}

const WORD_BITS: usize = 64;

impl ResourceMask {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// A mask of `len` bits, all set
    pub fn full(len: usize) -> Self {
        let mut mask = Self::new(len);
        mask.set_all();
        mask
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grows (or shrinks) to `len` bits; new bits take `fill`.
    pub fn resize(&mut self, len: usize, fill: bool) {
        let old = self.len;
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        self.len = len;
        if fill {
            for i in old..len {
                self.set(i, true);
            }
        }
        self.clear_tail();
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    pub fn set(&mut self, index: usize, value: bool) {
        if index >= self.len {
            return;
        }
        let bit = 1u64 << (index % WORD_BITS);
        if value {
            self.words[index / WORD_BITS] |= bit;
        } else {
            self.words[index / WORD_BITS] &= !bit;
        }
    }

    pub fn set_all(&mut self) {
        for w in &mut self.words {
            *w = u64::MAX;
        }
        self.clear_tail();
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn none(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// True if every bit set in `self` is also set in `other`.
    /// Bits beyond `other`'s length count as unset.
    pub fn is_subset_of(&self, other: &ResourceMask) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    /// Clears every bit that is set in `other`
    pub fn clear_bits(&mut self, other: &ResourceMask) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w &= !o;
        }
    }

    /// Sets every bit that is set in `other`
    pub fn union_with(&mut self, other: &ResourceMask) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
        self.clear_tail();
    }

    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |i| self.get(*i))
    }

    fn clear_tail(&mut self) {
        let rem = self.len % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

impl std::fmt::Display for ResourceMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Highest index first, like a bitset printout
        for i in (0..self.len).rev() {
            write!(f, "{}", if self.get(i) { '1' } else { '0' })?;
        }
        Ok(())
    }
}
