//! Movement genomes.
//!
//! A genome is a short string over `N`, `E`, `S`, `W`, and `_`. Each tick
//! a cell that neither ate nor cloned reads the gene under its state
//! pointer, steps in that direction (or stays put on `_`), and advances
//! the pointer, wrapping at the end of the genome.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use selfsim_types::Direction;

/// Errors parsing a genome or gene alphabet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenomeError {
    /// The genome string had no genes.
    #[error("genome is empty")]
    Empty,

    /// A symbol other than `N`, `E`, `S`, `W`, or `_`.
    #[error("unknown gene {symbol:?} at position {position}")]
    UnknownGene {
        /// The offending symbol.
        symbol: char,
        /// Zero-based position in the input.
        position: usize,
    },
}

/// One instruction in a genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gene {
    /// Step one cell in this direction.
    Step(Direction),
    /// Stay put.
    Stay,
}

impl Gene {
    /// Parse a single gene symbol.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        if symbol == '_' {
            return Some(Self::Stay);
        }
        let mut buf = [0_u8; 4];
        Direction::from_str(symbol.encode_utf8(&mut buf))
            .ok()
            .filter(|direction| direction.is_orthogonal())
            .map(Self::Step)
    }

    /// The symbol this gene is written as.
    pub const fn symbol(self) -> char {
        match self {
            Self::Step(Direction::North) => 'N',
            Self::Step(Direction::East) => 'E',
            Self::Step(Direction::South) => 'S',
            Self::Step(Direction::West) => 'W',
            Self::Step(_) | Self::Stay => '_',
        }
    }
}

/// Parse a string of gene symbols.
///
/// # Errors
///
/// Returns [`GenomeError`] for an empty string or an unknown symbol.
pub fn parse_genes(input: &str) -> Result<Vec<Gene>, GenomeError> {
    let genes = input
        .chars()
        .enumerate()
        .map(|(position, symbol)| {
            Gene::from_symbol(symbol).ok_or(GenomeError::UnknownGene { symbol, position })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if genes.is_empty() {
        return Err(GenomeError::Empty);
    }
    Ok(genes)
}

/// A non-empty sequence of genes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genome(Vec<Gene>);

impl Genome {
    /// Number of genes. Never zero.
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// The gene at `index`, modulo the genome length.
    pub fn gene(&self, index: usize) -> Option<Gene> {
        self.0.get(index.checked_rem(self.len())?).copied()
    }

    /// A copy with one random position rewritten from `alphabet`.
    ///
    /// The draw may pick the gene already there, so a mutated genome can
    /// equal its parent.
    #[must_use]
    pub fn mutated(&self, rng: &mut impl Rng, alphabet: &[Gene]) -> Self {
        let mut genes = self.0.clone();
        let position = rng.random_range(0..genes.len());
        if !alphabet.is_empty() {
            let replacement = alphabet
                .get(rng.random_range(0..alphabet.len()))
                .copied();
            if let (Some(slot), Some(gene)) = (genes.get_mut(position), replacement) {
                *slot = gene;
            }
        }
        Self(genes)
    }
}

impl FromStr for Genome {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_genes(s).map(Self)
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for gene in &self.0 {
            write!(f, "{}", gene.symbol())?;
        }
        Ok(())
    }
}
