use crate::stats::record_alloc;
use crate::{Error, Result, Word, WordBitAddr, BITS_PER_BLOCK, BLOCK_WORDS, WORD_BITS};
use std::rc::Rc;

type Words = Box<[Word; BLOCK_WORDS]>;

const BLOCK_BYTES: usize = BLOCK_WORDS * core::mem::size_of::<Word>();
// Rc keeps a strong and a weak count in front of the value
const RC_BYTES: usize = core::mem::size_of::<Block>() + 2 * core::mem::size_of::<usize>();

/// BITS_PER_BLOCK contiguous bits plus a cached population count.
///
/// Blocks are held behind `Rc` by every bitset that refers to them. All mutating
/// operations take `&mut Block`, which the bitset only obtains through
/// `Rc::get_mut`, i.e. when it is the sole holder.
#[derive(Debug)]
pub(crate) struct Block {
    words: Words,
    // invariant: == sum of words[i].count_ones()
    set_count: usize,
}

/// Bookkeeping of one present block slot of a [`Bitset`](crate::Bitset).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlockStats {
    /// Number of 1-bits in the block.
    pub set_count: usize,
    /// Number of bitsets currently referring to the block.
    pub share_count: usize,
}

fn alloc_words(fill: Word) -> Result<Words> {
    let mut words = Vec::new();
    words.try_reserve_exact(BLOCK_WORDS).map_err(|_| Error::OutOfMemory { bytes: BLOCK_BYTES })?;
    words.resize(BLOCK_WORDS, fill);
    record_alloc(BLOCK_BYTES);
    // capacity and length are exactly BLOCK_WORDS, so neither step reallocates
    let Ok(words) = Words::try_from(words.into_boxed_slice()) else { unreachable!() };
    Ok(words)
}

/// Zeroes every bit at or beyond `valid_bits`.
fn clear_tail(words: &mut [Word], valid_bits: usize) {
    let full_words = valid_bits / WORD_BITS;
    let rem = valid_bits % WORD_BITS;
    for (idx_of_word, word) in words.iter_mut().enumerate().skip(full_words) {
        if idx_of_word == full_words && rem != 0 {
            *word &= Word::MAX >> (WORD_BITS - rem);
        } else {
            *word = 0;
        }
    }
}

impl Block {
    pub fn try_zeroed() -> Result<Self> {
        Ok(Self { words: alloc_words(0)?, set_count: 0 })
    }
    /// A block with bits `0..valid_bits` set and the rest clear.
    pub fn try_full(valid_bits: usize) -> Result<Self> {
        debug_assert!(valid_bits <= BITS_PER_BLOCK);
        let mut words = alloc_words(Word::MAX)?;
        clear_tail(&mut words[..], valid_bits);
        Ok(Self { words, set_count: valid_bits })
    }
    /// Deep copy of the words and the cached count.
    pub fn try_clone(&self) -> Result<Self> {
        let mut words = alloc_words(0)?;
        words.copy_from_slice(&self.words[..]);
        Ok(Self { words, set_count: self.set_count })
    }
    /// Moves the block behind a fresh `Rc`, the form in which bitsets hold it.
    pub fn into_shared(self) -> Rc<Block> {
        record_alloc(RC_BYTES);
        Rc::new(self)
    }

    pub fn set_count(&self) -> usize {
        self.set_count
    }
    pub fn words(&self) -> &[Word] {
        &self.words[..]
    }

    pub fn test_bit(&self, idx_in_block: usize) -> bool {
        let wba = WordBitAddr::from_bit_idx(idx_in_block);
        self.words[wba.idx_of_word] & wba.word_mask() != 0
    }
    /// Returns whether the block has changed.
    pub fn set_bit(&mut self, idx_in_block: usize) -> bool {
        let wba = WordBitAddr::from_bit_idx(idx_in_block);
        let word = &mut self.words[wba.idx_of_word];
        let was_unset = *word & wba.word_mask() == 0;
        *word |= wba.word_mask();
        self.set_count += was_unset as usize;
        was_unset
    }
    /// Returns whether the block has changed.
    pub fn clear_bit(&mut self, idx_in_block: usize) -> bool {
        let wba = WordBitAddr::from_bit_idx(idx_in_block);
        let word = &mut self.words[wba.idx_of_word];
        let was_set = *word & wba.word_mask() != 0;
        *word &= !wba.word_mask();
        self.set_count -= was_set as usize;
        was_set
    }
    /// Flips the bit and returns its new value.
    pub fn toggle_bit(&mut self, idx_in_block: usize) -> bool {
        let wba = WordBitAddr::from_bit_idx(idx_in_block);
        let word = &mut self.words[wba.idx_of_word];
        *word ^= wba.word_mask();
        let now_set = *word & wba.word_mask() != 0;
        if now_set {
            self.set_count += 1;
        } else {
            self.set_count -= 1;
        }
        now_set
    }

    fn combine_words(&mut self, other: &Block, op: impl Fn(Word, Word) -> Word) {
        let mut set_count = 0;
        for (dest, src) in self.words.iter_mut().zip(other.words.iter()) {
            *dest = op(*dest, *src);
            set_count += dest.count_ones() as usize;
        }
        self.set_count = set_count;
    }
    pub fn or(&mut self, other: &Block) {
        self.combine_words(other, |a, b| a | b)
    }
    pub fn and(&mut self, other: &Block) {
        self.combine_words(other, |a, b| a & b)
    }
    pub fn subtract(&mut self, other: &Block) {
        self.combine_words(other, |a, b| a & !b)
    }
    /// Complements bits `0..valid_bits`; bits beyond stay clear.
    pub fn invert(&mut self, valid_bits: usize) {
        debug_assert!(self.set_count <= valid_bits);
        for word in self.words.iter_mut() {
            *word = !*word;
        }
        clear_tail(&mut self.words[..], valid_bits);
        self.set_count = valid_bits - self.set_count;
    }

    /// Position of the first 1-bit at or after `idx_in_block`, if any.
    pub fn find_next_set_bit(&self, idx_in_block: usize) -> Option<usize> {
        let wba = WordBitAddr::from_bit_idx(idx_in_block);
        let first = self.words[wba.idx_of_word] & (Word::MAX << wba.idx_in_word);
        if first != 0 {
            let idx_in_word = first.trailing_zeros();
            return Some(WordBitAddr { idx_in_word, ..wba }.to_bit_idx());
        }
        self.words
            .iter()
            .enumerate()
            .skip(wba.idx_of_word + 1)
            .find(|(_, word)| **word != 0)
            .map(|(idx_of_word, word)| {
                WordBitAddr { idx_of_word, idx_in_word: word.trailing_zeros() }.to_bit_idx()
            })
    }
}
