//! Program images: parsing, loading from disk and fingerprinting.
//!
//! A [`Program`] is the immutable baseline a [`crate::vm::VM`] loads. It is
//! shared behind an `Arc`, so loading the same program into many engines
//! (pipelines, networks) does not copy it, and loading never mutates the
//! caller's copy.

use crate::values::Word;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program is empty")]
    Empty,
    #[error("invalid word #{index}: '{token}'")]
    InvalidWord { index: usize, token: String },
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// An immutable program image addressable from 0.
#[derive(Clone, PartialEq, Eq)]
pub struct Program {
    words: Arc<[Word]>,
    fingerprint: Arc<str>,
}

impl Program {
    pub fn new(words: Vec<Word>) -> Self {
        let fingerprint = fingerprint_of(&words);
        Self {
            words: words.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Parse comma-separated integers. Surrounding whitespace (including a
    /// trailing newline) is ignored; empty fields are rejected.
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(ProgramError::Empty);
        }
        let words = source
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                let token = token.trim();
                token.parse::<Word>().map_err(|_| ProgramError::InvalidWord {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(words))
    }

    /// Read and parse a program file.
    pub fn from_file(path: &Path) -> Result<Self, ProgramError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProgramError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub(crate) fn shared_words(&self) -> Arc<[Word]> {
        Arc::clone(&self.words)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// SHA-256 of the image, hex encoded. Snapshots carry it so they can
    /// only be restored onto the image they were taken from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint_of(words: &[Word]) -> String {
    let mut hasher = Sha256::new();
    for (i, w) in words.iter().enumerate() {
        if i > 0 {
            hasher.update(b",");
        }
        hasher.update(w.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("len", &self.words.len())
            .field("fingerprint", &&self.fingerprint[..12])
            .finish()
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<Word>> for Program {
    fn from(words: Vec<Word>) -> Self {
        Self::new(words)
    }
}

impl From<Vec<i64>> for Program {
    fn from(words: Vec<i64>) -> Self {
        Self::new(words.into_iter().map(Word::from).collect())
    }
}

impl From<&[i64]> for Program {
    fn from(words: &[i64]) -> Self {
        Self::new(words.iter().copied().map(Word::from).collect())
    }
}
