use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::BlockId;
use crate::storage::page::Page;

#[derive(Error, Debug)]
pub enum FileManagerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FileManagerError>;

/// Block-level file storage: maps a [`BlockId`] to a byte range inside a
/// named file under the data directory. Every file shares one block size,
/// fixed at construction. No caching and no WAL awareness live here.
pub struct FileManager {
    db_directory: PathBuf,
    block_size: usize,
    is_new: bool,
    open_files: Mutex<HashMap<String, File>>,
}

impl FileManager {
    /// Open (or create) the data directory. A missing directory marks the
    /// database as new; an existing one gets its stray `temp*` files purged.
    pub fn new(db_directory: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        let db_directory = db_directory.as_ref().to_path_buf();
        let is_new = !db_directory.exists();
        if is_new {
            fs::create_dir_all(&db_directory)?;
        } else {
            for entry in fs::read_dir(&db_directory)? {
                let entry = entry?;
                let name = entry.file_name();
                if entry.file_type()?.is_file()
                    && name.to_string_lossy().starts_with("temp")
                {
                    debug!("removing leftover temp file {:?}", name);
                    fs::remove_file(entry.path())?;
                }
            }
        }

        Ok(Self {
            db_directory,
            block_size,
            is_new,
            open_files: Mutex::new(HashMap::new()),
        })
    }

    /// Read one block into `page`. A block past the end of the file (or a
    /// partially written tail) reads back zero-filled. Returns the number of
    /// bytes actually present on disk.
    pub fn read(&self, blk: &BlockId, page: &mut Page) -> Result<usize> {
        let mut files = self.open_files.lock();
        let file = self.get_file(&mut files, blk.file_name())?;
        file.seek(SeekFrom::Start(blk.number() * self.block_size as u64))?;

        let buf = page.contents_mut();
        let mut total = 0;
        while total < buf.len() {
            let n = file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        buf[total..].fill(0);
        Ok(total)
    }

    /// Write one block from `page`. Returns the number of bytes written.
    pub fn write(&self, blk: &BlockId, page: &Page) -> Result<usize> {
        let mut files = self.open_files.lock();
        let file = self.get_file(&mut files, blk.file_name())?;
        file.seek(SeekFrom::Start(blk.number() * self.block_size as u64))?;
        file.write_all(page.contents())?;
        file.flush()?;
        Ok(page.size())
    }

    /// Number of blocks currently in `file_name`.
    pub fn size(&self, file_name: &str) -> Result<u64> {
        let mut files = self.open_files.lock();
        let file = self.get_file(&mut files, file_name)?;
        Ok(file.metadata()?.len() / self.block_size as u64)
    }

    /// Extend `file_name` by one zero-filled block and return its id.
    pub fn append(&self, file_name: &str) -> Result<BlockId> {
        let mut files = self.open_files.lock();
        let file = self.get_file(&mut files, file_name)?;
        let new_block_num = file.metadata()?.len() / self.block_size as u64;
        let blk = BlockId::new(file_name, new_block_num);

        file.seek(SeekFrom::Start(blk.number() * self.block_size as u64))?;
        file.write_all(&vec![0; self.block_size])?;
        file.flush()?;
        Ok(blk)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// True when the data directory did not exist before this manager
    /// created it.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    fn get_file<'a>(
        &self,
        files: &'a mut HashMap<String, File>,
        file_name: &str,
    ) -> Result<&'a mut File> {
        match files.entry(file_name.to_string()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(v) => {
                let path = self.db_directory.join(file_name);
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(path)?;
                Ok(v.insert(file))
            }
        }
    }
}
