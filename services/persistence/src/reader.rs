//! Journal reader: sequential replay with corruption detection
//!
//! Reads every journal file in index order, validating the CRC32C of each
//! entry. A truncated tail (a crash mid-write) is tolerated: the valid
//! prefix is returned and the remainder logged. A checksum mismatch in the
//! middle of the stream is an error; the journal is the source of truth
//! and the engine must not continue from a corrupt prefix.

use crate::journal::{JournalEntry, JournalError, JournalWriter};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use types::msg::Msg;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("checksum mismatch at byte offset {offset}: entry seq={sequence}")]
    ChecksumMismatch { offset: u64, sequence: u64 },

    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("record decode failed at seq={sequence}: {detail}")]
    Decode { sequence: u64, detail: String },
}

// ── Journal reader ──────────────────────────────────────────────────

/// Sequential reader over all journal files in a directory.
pub struct JournalReader {
    files: Vec<PathBuf>,
    current_file_idx: usize,
    data: Vec<u8>,
    pos: usize,
    global_offset: u64,
    last_sequence: Option<u64>,
}

impl JournalReader {
    pub fn open(dir: &Path) -> Result<Self, ReaderError> {
        let files = if dir.exists() {
            JournalWriter::find_indices(dir)
                .into_iter()
                .map(|idx| JournalWriter::journal_path(dir, idx))
                .collect()
        } else {
            Vec::new()
        };
        let mut reader = Self {
            files,
            current_file_idx: 0,
            data: Vec::new(),
            pos: 0,
            global_offset: 0,
            last_sequence: None,
        };
        reader.load_current_file()?;
        Ok(reader)
    }

    /// Next checksum-valid entry, or `None` once all files are exhausted.
    /// A truncated tail ends the stream; mid-stream corruption errors.
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>, ReaderError> {
        loop {
            if self.pos >= self.data.len() {
                if !self.advance_file()? {
                    return Ok(None);
                }
            }

            let offset = self.global_offset;
            match JournalEntry::from_bytes(&self.data[self.pos..]) {
                Ok((entry, consumed)) => {
                    self.pos += consumed;
                    self.global_offset += consumed as u64;
                    if !entry.verify_checksum() {
                        return Err(ReaderError::ChecksumMismatch {
                            offset,
                            sequence: entry.sequence,
                        });
                    }
                    self.last_sequence = Some(entry.sequence);
                    return Ok(Some(entry));
                }
                Err(_) => {
                    let remaining = self.data.len() - self.pos;
                    if remaining > 0 {
                        warn!(
                            offset,
                            remaining, "truncated journal tail; dropping partial entry"
                        );
                    }
                    self.pos = self.data.len();
                }
            }
        }
    }

    /// All valid entries in journal order.
    pub fn read_all(&mut self) -> Result<Vec<JournalEntry>, ReaderError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// All records with gapless-sequence validation and payload decode.
    pub fn read_msgs(&mut self) -> Result<Vec<Msg>, ReaderError> {
        let entries = self.read_all()?;
        Self::validate_sequences(&entries)?;
        entries
            .iter()
            .map(|entry| {
                serde_json::from_slice(&entry.payload).map_err(|err| ReaderError::Decode {
                    sequence: entry.sequence,
                    detail: err.to_string(),
                })
            })
            .collect()
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// The writer assigns gapless, monotonic sequences; anything else is
    /// evidence of a lost or reordered file.
    pub fn validate_sequences(entries: &[JournalEntry]) -> Result<(), ReaderError> {
        for window in entries.windows(2) {
            if window[1].sequence != window[0].sequence + 1 {
                return Err(ReaderError::SequenceGap {
                    expected: window[0].sequence + 1,
                    got: window[1].sequence,
                });
            }
        }
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn load_current_file(&mut self) -> Result<(), ReaderError> {
        self.data.clear();
        self.pos = 0;
        if self.current_file_idx < self.files.len() {
            let mut file = File::open(&self.files[self.current_file_idx])?;
            file.read_to_end(&mut self.data)?;
        }
        Ok(())
    }

    fn advance_file(&mut self) -> Result<bool, ReaderError> {
        self.current_file_idx += 1;
        if self.current_file_idx < self.files.len() {
            self.load_current_file()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
