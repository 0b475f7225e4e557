//! Journal writer: append-only record log with checksums
//!
//! # Binary format (per entry)
//! ```text
//! [body_len: u32]
//! [sequence: u64]
//! [time:     i64]
//! [kind_len: u16][kind: bytes]
//! [payload_len: u32][payload: bytes]
//! [checksum: u32]  // CRC32C over sequence ++ time ++ kind ++ payload
//! ```
//!
//! The payload is the JSON-serialized record. Files rotate at a size
//! threshold; flush and fsync cadence are policy-controlled, with fsync on
//! every write as the durable default.

use crc32c::crc32c;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use types::date::Time;
use types::msg::Msg;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

// ── Journal entry ───────────────────────────────────────────────────

/// One framed record.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Monotonic, gapless sequence assigned by the writer.
    pub sequence: u64,
    /// Record time in milliseconds, zero where the record carries none.
    pub time: Time,
    /// Record kind tag, e.g. `create_exec`.
    pub kind: String,
    /// JSON-serialized record.
    pub payload: Vec<u8>,
    /// CRC32C over (sequence ++ time ++ kind ++ payload).
    pub checksum: u32,
}

impl JournalEntry {
    pub fn new(sequence: u64, time: Time, kind: String, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(sequence, time, &kind, &payload);
        Self {
            sequence,
            time,
            kind,
            payload,
            checksum,
        }
    }

    pub fn compute_checksum(sequence: u64, time: Time, kind: &str, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(8 + 8 + kind.len() + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&time.to_le_bytes());
        buf.extend_from_slice(kind.as_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum
            == Self::compute_checksum(self.sequence, self.time, &self.kind, &self.payload)
    }

    /// Serialize to the binary wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let kind = self.kind.as_bytes();
        let body_len: u32 = 8 + 8 + 2 + kind.len() as u32 + 4 + self.payload.len() as u32 + 4;

        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&(kind.len() as u16).to_le_bytes());
        buf.extend_from_slice(kind);
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Deserialize one entry, returning `(entry, bytes_consumed)`.
    /// Corrupted or truncated data yields an error, never a panic.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), JournalError> {
        if data.len() < 4 {
            return Err(JournalError::Serialization(
                "not enough data for length prefix".into(),
            ));
        }
        let body_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        // Minimum body: 8 + 8 + 2 + 0 + 4 + 0 + 4.
        if body_len < 26 || body_len > 100_000_000 {
            return Err(JournalError::Serialization(format!(
                "implausible body length {body_len}"
            )));
        }
        let total = 4 + body_len;
        if data.len() < total {
            return Err(JournalError::Serialization(format!(
                "incomplete entry: need {total} bytes, have {}",
                data.len()
            )));
        }

        let body = &data[4..total];
        let mut pos = 0usize;

        let sequence = u64::from_le_bytes(body[pos..pos + 8].try_into().unwrap());
        pos += 8;
        let time = i64::from_le_bytes(body[pos..pos + 8].try_into().unwrap());
        pos += 8;

        let kind_len = u16::from_le_bytes(body[pos..pos + 2].try_into().unwrap()) as usize;
        pos += 2;
        if pos + kind_len + 4 + 4 > body.len() {
            return Err(JournalError::Serialization(format!(
                "kind length {kind_len} exceeds body"
            )));
        }
        let kind = String::from_utf8(body[pos..pos + kind_len].to_vec())
            .map_err(|err| JournalError::Serialization(err.to_string()))?;
        pos += kind_len;

        let payload_len = u32::from_le_bytes(body[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        if pos + payload_len + 4 > body.len() {
            return Err(JournalError::Serialization(format!(
                "payload length {payload_len} exceeds body"
            )));
        }
        let payload = body[pos..pos + payload_len].to_vec();
        pos += payload_len;

        let checksum = u32::from_le_bytes(body[pos..pos + 4].try_into().unwrap());

        Ok((
            Self {
                sequence,
                time,
                kind,
                payload,
                checksum,
            },
            total,
        ))
    }
}

// ── Flush / fsync policies ──────────────────────────────────────────

/// Controls when buffered data is flushed to the OS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlushPolicy {
    EveryWrite,
    EveryN(usize),
}

/// Controls when `fsync` is called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    EveryWrite,
    EveryN(usize),
    OnRotation,
}

// ── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Directory for journal files.
    pub dir: PathBuf,
    /// Maximum file size in bytes before rotation.
    pub max_file_size: u64,
    pub flush_policy: FlushPolicy,
    pub fsync_policy: FsyncPolicy,
}

impl JournalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_file_size: 64 * 1024 * 1024,
            flush_policy: FlushPolicy::EveryWrite,
            fsync_policy: FsyncPolicy::EveryWrite,
        }
    }
}

// ── Journal writer ──────────────────────────────────────────────────

/// Append-only writer with checksums, rotation and fsync control. The
/// writer assigns gapless sequence numbers, resuming past any entries
/// already on disk.
pub struct JournalWriter {
    config: JournalConfig,
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_file_size: u64,
    next_sequence: u64,
    writes_since_flush: usize,
    writes_since_fsync: usize,
    file_index: u64,
}

impl JournalWriter {
    /// Open a writer, creating the directory if needed and recovering the
    /// next sequence from the newest file on disk.
    pub fn open(config: JournalConfig) -> Result<Self, JournalError> {
        fs::create_dir_all(&config.dir)?;

        let file_index = Self::find_latest_index(&config.dir);
        let current_file = Self::journal_path(&config.dir, file_index);
        let next_sequence = Self::recover_next_sequence(&config.dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current_file)?;
        let current_file_size = file.metadata()?.len();

        Ok(Self {
            config,
            writer: BufWriter::new(file),
            current_file,
            current_file_size,
            next_sequence,
            writes_since_flush: 0,
            writes_since_fsync: 0,
            file_index,
        })
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn current_file_path(&self) -> &Path {
        &self.current_file
    }

    /// Frame and append one record. Returns its sequence number.
    pub fn append_msg(&mut self, msg: &Msg, time: Time) -> Result<u64, JournalError> {
        let payload = serde_json::to_vec(msg)
            .map_err(|err| JournalError::Serialization(err.to_string()))?;
        let entry = JournalEntry::new(self.next_sequence, time, msg.kind().to_string(), payload);
        self.append(&entry)?;
        Ok(entry.sequence)
    }

    /// Append a pre-built entry. The entry's sequence must match the
    /// writer's next sequence.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), JournalError> {
        debug_assert_eq!(entry.sequence, self.next_sequence);

        if self.current_file_size >= self.config.max_file_size {
            self.rotate()?;
        }

        let bytes = entry.to_bytes();
        self.writer.write_all(&bytes)?;
        self.current_file_size += bytes.len() as u64;
        self.next_sequence = entry.sequence + 1;
        self.writes_since_flush += 1;
        self.writes_since_fsync += 1;

        self.apply_flush_policy()?;
        self.apply_fsync_policy()?;
        Ok(())
    }

    /// Force flush + fsync: used at the commit boundary and before
    /// rotation.
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_flush = 0;
        self.writes_since_fsync = 0;
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn apply_flush_policy(&mut self) -> Result<(), JournalError> {
        let should_flush = match self.config.flush_policy {
            FlushPolicy::EveryWrite => true,
            FlushPolicy::EveryN(n) => self.writes_since_flush >= n,
        };
        if should_flush {
            self.writer.flush()?;
            self.writes_since_flush = 0;
        }
        Ok(())
    }

    fn apply_fsync_policy(&mut self) -> Result<(), JournalError> {
        let should_fsync = match self.config.fsync_policy {
            FsyncPolicy::EveryWrite => true,
            FsyncPolicy::EveryN(n) => self.writes_since_fsync >= n,
            FsyncPolicy::OnRotation => false,
        };
        if should_fsync {
            self.writer.flush()?;
            self.writer.get_ref().sync_all()?;
            self.writes_since_fsync = 0;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), JournalError> {
        self.sync()?;
        self.file_index += 1;
        self.current_file = Self::journal_path(&self.config.dir, self.file_index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.current_file)?;
        self.writer = BufWriter::new(file);
        self.current_file_size = 0;
        Ok(())
    }

    pub(crate) fn journal_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("journal-{index:06}.bin"))
    }

    pub(crate) fn find_indices(dir: &Path) -> Vec<u64> {
        let mut indices: Vec<u64> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        let name = entry.file_name().to_string_lossy().to_string();
                        name.strip_prefix("journal-")?
                            .strip_suffix(".bin")?
                            .parse::<u64>()
                            .ok()
                    })
                    .collect()
            })
            .unwrap_or_default();
        indices.sort_unstable();
        indices
    }

    fn find_latest_index(dir: &Path) -> u64 {
        Self::find_indices(dir).last().copied().unwrap_or(0)
    }

    /// Scan backwards from the newest file for the last valid sequence. A
    /// crash between rotation and first write leaves an empty newest file;
    /// older files still carry the counter.
    fn recover_next_sequence(dir: &Path) -> Result<u64, JournalError> {
        for index in Self::find_indices(dir).into_iter().rev() {
            let data = fs::read(Self::journal_path(dir, index))?;
            let mut pos = 0usize;
            let mut last = None;
            while pos < data.len() {
                match JournalEntry::from_bytes(&data[pos..]) {
                    Ok((entry, consumed)) => {
                        last = Some(entry.sequence);
                        pos += consumed;
                    }
                    Err(_) => break, // truncated tail
                }
            }
            if let Some(seq) = last {
                return Ok(seq + 1);
            }
        }
        Ok(0)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
