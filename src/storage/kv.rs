use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::tariff::{StoreCommand, TariffBook};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::PathBuf;
use tracing::debug;

fn storage_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{}: {}", context, e))
}

/// File-based storage using an append-only command log and book snapshots.
///
/// Files:
/// - `commands.log`: length-prefixed (u64 LE) bincode `StoreCommand` records
/// - `book.bin`: bincode `TariffBook` followed by the next command id (u64 LE)
/// - `book.bin.tmp`: temporary file for atomic snapshot writes
/// - `LOCK`: advisory lock file; writers hold it from replay through snapshot
pub struct FileStorage {
    command_log_path: PathBuf,
    book_path: PathBuf,
    book_tmp_path: PathBuf,
    lock_path: PathBuf,
}

/// Exclusive hold on a data directory. Released on drop.
#[derive(Debug)]
pub struct StorageLock {
    _file: File,
}

impl FileStorage {
    /// Create a new FileStorage with paths from config
    pub fn new(config: &Config) -> Self {
        FileStorage::with_paths(config.get_command_log_path(), config.get_book_path())
    }

    /// Create FileStorage with custom paths (for testing)
    pub fn with_paths(command_log_path: PathBuf, book_path: PathBuf) -> Self {
        let book_tmp_path = book_path.with_extension("bin.tmp");
        let lock_path = command_log_path.with_file_name("LOCK");
        FileStorage {
            command_log_path,
            book_path,
            book_tmp_path,
            lock_path,
        }
    }

    fn open_lock_file(&self) -> Result<File> {
        self.ensure_dir()?;
        OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| storage_err("Failed to open lock file", e))
    }

    /// Block until this process holds the data directory exclusively.
    ///
    /// Take it before `replay_to_tip` and keep it until the snapshot is persisted:
    /// a second writer that replayed a stale log would append commands the
    /// snapshot already claims to cover.
    pub fn lock(&self) -> Result<StorageLock> {
        let file = self.open_lock_file()?;
        file.lock_exclusive()
            .map_err(|e| storage_err("Failed to lock data directory", e))?;
        debug!(path = %self.lock_path.display(), "data directory locked");
        Ok(StorageLock { _file: file })
    }

    /// Like `lock`, but returns `None` instead of waiting when another holder exists.
    pub fn try_lock(&self) -> Result<Option<StorageLock>> {
        let file = self.open_lock_file()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(StorageLock { _file: file })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(storage_err("Failed to lock data directory", e)),
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.command_log_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| storage_err("Failed to create data directory", e))?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn append_command(&mut self, cmd: &StoreCommand) -> Result<()> {
        self.ensure_dir()?;

        let bytes =
            bincode::serialize(cmd).map_err(|e| storage_err("Failed to serialize command", e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.command_log_path)
            .map_err(|e| storage_err("Failed to open command log for append", e))?;

        let len = bytes.len() as u64;
        file.write_all(&len.to_le_bytes())
            .map_err(|e| storage_err("Failed to write command length", e))?;
        file.write_all(&bytes)
            .map_err(|e| storage_err("Failed to write command data", e))?;
        file.sync_all()
            .map_err(|e| storage_err("Failed to fsync command log", e))?;

        debug!(operation = cmd.kind.operation(), "command appended");
        Ok(())
    }

    fn load_book(&self) -> Result<Option<(TariffBook, u64)>> {
        if !self.book_path.exists() {
            return Ok(None);
        }

        let mut data = Vec::new();
        File::open(&self.book_path)
            .and_then(|mut f| f.read_to_end(&mut data))
            .map_err(|e| storage_err("Failed to read book snapshot", e))?;

        // Format: [TariffBook bytes][next_command_id: u64]
        if data.len() < 8 {
            return Err(Error::Storage("Book snapshot too short".to_string()));
        }
        let (book_bytes, id_bytes) = data.split_at(data.len() - 8);
        let mut id_buf = [0u8; 8];
        id_buf.copy_from_slice(id_bytes);
        let next_command_id = u64::from_le_bytes(id_buf);

        let book: TariffBook = bincode::deserialize(book_bytes)
            .map_err(|e| storage_err("Failed to deserialize book", e))?;

        Ok(Some((book, next_command_id)))
    }

    fn persist_book(&mut self, book: &TariffBook, next_command_id: u64) -> Result<()> {
        self.ensure_dir()?;

        let book_bytes =
            bincode::serialize(book).map_err(|e| storage_err("Failed to serialize book", e))?;

        let mut file = File::create(&self.book_tmp_path)
            .map_err(|e| storage_err("Failed to create temp book file", e))?;
        file.write_all(&book_bytes)
            .map_err(|e| storage_err("Failed to write book", e))?;
        file.write_all(&next_command_id.to_le_bytes())
            .map_err(|e| storage_err("Failed to write next command id", e))?;
        file.sync_all()
            .map_err(|e| storage_err("Failed to fsync temp book file", e))?;
        drop(file);

        fs::rename(&self.book_tmp_path, &self.book_path)
            .map_err(|e| storage_err("Failed to rename temp book file", e))?;

        // make the rename durable
        if let Some(parent) = self.book_path.parent() {
            File::open(parent)
                .and_then(|dir| dir.sync_all())
                .map_err(|e| storage_err("Failed to fsync data directory", e))?;
        }

        Ok(())
    }

    fn load_commands_from(&self, from_command_id: u64) -> Result<Vec<StoreCommand>> {
        if !self.command_log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.command_log_path)
            .map_err(|e| storage_err("Failed to open command log", e))?;
        let mut reader = BufReader::new(file);

        let mut commands = Vec::new();
        let mut current_id = 0u64;

        loop {
            let mut len_buf = [0u8; 8];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {
                    let len = u64::from_le_bytes(len_buf) as usize;
                    let mut buf = vec![0u8; len];
                    reader
                        .read_exact(&mut buf)
                        .map_err(|e| storage_err("Failed to read command data", e))?;

                    if current_id >= from_command_id {
                        let cmd: StoreCommand = bincode::deserialize(&buf)
                            .map_err(|e| storage_err("Failed to deserialize command", e))?;
                        commands.push(cmd);
                    }
                    current_id += 1;
                }
                Err(ref e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(storage_err("Failed to read command log", e)),
            }
        }

        Ok(commands)
    }
}
