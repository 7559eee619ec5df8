//! Word-addressed backing store with bit-level field access.
//!
//! The word array is treated as one contiguous bit stream: stream bit `p`
//! is bit `p % 64` (least significant first) of word `p / 64`. A field may
//! straddle two words. Writes only touch the bits of the target field.

pub type Word = u64;

pub const WORD_BITS: u32 = Word::BITS;

#[inline]
fn mask(n: u32) -> Word {
    if n >= WORD_BITS {
        Word::MAX
    } else {
        (1 << n) - 1
    }
}

#[derive(Debug, Clone)]
pub struct Memory {
    words: Vec<Word>,
}

impl Memory {
    /// Zero-filled memory of `len` words.
    pub fn new(len: usize) -> Self {
        Self { words: vec![0; len] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[inline]
    pub fn get_word(&self, addr: usize) -> Word {
        self.words[addr]
    }

    #[inline]
    pub fn set_word(&mut self, val: Word, addr: usize) {
        self.words[addr] = val;
    }

    /// Read `n` bits starting `offset` bits into word `addr`.
    ///
    /// Panics if `n` is not in `1..=64` or the span leaves the buffer.
    pub fn get_bits(&self, addr: usize, n: u32, offset: u32) -> Word {
        assert!(
            (1..=WORD_BITS).contains(&n),
            "bit count {} out of range 1..={}",
            n,
            WORD_BITS
        );
        let mut pos = addr as u64 * WORD_BITS as u64 + offset as u64;
        let mut remaining = n;
        let mut filled = 0;
        let mut out: Word = 0;
        while remaining > 0 {
            let word = (pos / WORD_BITS as u64) as usize;
            let bit = (pos % WORD_BITS as u64) as u32;
            let take = remaining.min(WORD_BITS - bit);
            let chunk = (self.words[word] >> bit) & mask(take);
            out |= chunk << filled;
            filled += take;
            remaining -= take;
            pos += take as u64;
        }
        out
    }

    /// Write the low `n` bits of `val` starting `offset` bits into word `addr`.
    /// Bits outside the field are left untouched; bits of `val` above `n` are
    /// ignored.
    ///
    /// Panics if `n` is not in `1..=64` or the span leaves the buffer.
    pub fn set_bits(&mut self, val: Word, addr: usize, n: u32, offset: u32) {
        assert!(
            (1..=WORD_BITS).contains(&n),
            "bit count {} out of range 1..={}",
            n,
            WORD_BITS
        );
        let mut pos = addr as u64 * WORD_BITS as u64 + offset as u64;
        let mut remaining = n;
        let mut written = 0;
        while remaining > 0 {
            let word = (pos / WORD_BITS as u64) as usize;
            let bit = (pos % WORD_BITS as u64) as u32;
            let take = remaining.min(WORD_BITS - bit);
            let chunk = (val >> written) & mask(take);
            let field = mask(take) << bit;
            self.words[word] = (self.words[word] & !field) | (chunk << bit);
            written += take;
            remaining -= take;
            pos += take as u64;
        }
    }
}
