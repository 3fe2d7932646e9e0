//! A sparse, copy-on-write bitset over a fixed universe of identifiers.
//!
//! Bits are stored in fixed-size blocks which are only allocated once they
//! hold a 1-bit. [`Bitset::duplicate`] shares blocks between bitsets, and a
//! shared block is copied the first time one of its holders mutates it.

mod block;
pub use block::BlockStats;

mod bitset;
pub use bitset::Bitset;

mod error;
pub use error::{Error, ErrorKind, Result};

pub mod iterators;
pub use iterators::{Cursor, IterMode, Ones};

pub mod stats;
pub use stats::{alloc_stats, AllocStats};


/////////////////////////////////////////////
pub type Word = u64; // stores up to Word::BITS Indexes
pub type Index = usize; // BIT index

pub const WORD_BITS: usize = Word::BITS as usize;
/// Number of words in one block.
pub const BLOCK_WORDS: usize = 1024;
/// Number of bits (identifiers) covered by one block.
pub const BITS_PER_BLOCK: usize = BLOCK_WORDS * WORD_BITS;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct BlockBitAddr {
    idx_of_block: usize, // BLOCK index not BIT index
    idx_in_block: usize, // invariant: in 0..BITS_PER_BLOCK
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct WordBitAddr {
    idx_of_word: usize, // invariant: in 0..BLOCK_WORDS
    idx_in_word: u32,   // invariant: in 0..Word::BITS
}
///////////////////////////////////////////////////////////////////////

/// Number of blocks needed to hold `bit_count` bits.
pub const fn bit_count_to_block_count(bit_count: usize) -> usize {
    bit_count.div_ceil(BITS_PER_BLOCK)
}

impl BlockBitAddr {
    fn from_bit_idx(bit_idx: Index) -> Self {
        Self { idx_of_block: bit_idx / BITS_PER_BLOCK, idx_in_block: bit_idx % BITS_PER_BLOCK }
    }
    fn to_bit_idx(self) -> Index {
        self.idx_of_block * BITS_PER_BLOCK + self.idx_in_block
    }
}
impl WordBitAddr {
    fn from_bit_idx(idx_in_block: usize) -> Self {
        debug_assert!(idx_in_block < BITS_PER_BLOCK);
        Self { idx_of_word: idx_in_block / WORD_BITS, idx_in_word: (idx_in_block % WORD_BITS) as u32 }
    }
    const fn word_mask(&self) -> Word {
        1 << self.idx_in_word
    }
    fn to_bit_idx(self) -> usize {
        self.idx_of_word * WORD_BITS + self.idx_in_word as usize
    }
}
