//! blockfile
//!
//! Reader/writer for block-structured scene files.
//!
//! # Format
//!
//! ```text
//! header    : "SCNBLOCK" | version u16 | pointer size u8 | reserved u8
//! block     : code [u8; 4] | address u64 | field count u16 | payload length u32
//!             field count × (name length u8 | name | kind u8 | element count u32)
//!             payload
//! terminator: block with code "ENDB"
//! ```
//!
//! All integers are little endian. Blocks point at each other by storing the
//! target's `address`; [`BlockFile`] keeps the blocks in an arena and resolves
//! pointers through an address index, so a pointer that names no block
//! simply resolves to `None`.
//!
//! # Writes
//!
//! A file opened with [`OpenMode::ReadWrite`] mirrors every
//! [`BlockFile::set_bytes`] to disk immediately, at the field's offset.
//! Nothing else about the file changes, so edits are cheap and cumulative.

mod block;
mod builder;
mod code;

pub use block::{Address, Block, BlockIndex, FieldDef, FieldKind, POINTER_SIZE};
pub use builder::{BlockBuilder, BlockFileBuilder};
pub use code::BlockCode;

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File magic.
pub const MAGIC: &[u8; 8] = b"SCNBLOCK";

/// Current format version.
pub const VERSION: u16 = 1;

/// Errors from block file operations.
#[derive(Debug, Error)]
pub enum BlockFileError {
    #[error("failed to open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("i/o error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("'{path}' is not a block file")]
    BadMagic { path: PathBuf },

    #[error("'{path}': unsupported header (version {version}, pointer size {pointer_size})")]
    UnsupportedHeader {
        path: PathBuf,
        version: u16,
        pointer_size: u8,
    },

    #[error("'{path}' is truncated at byte {offset}")]
    Truncated { path: PathBuf, offset: usize },

    #[error("'{path}': unknown field kind {kind} in block {code}")]
    UnknownFieldKind {
        path: PathBuf,
        code: BlockCode,
        kind: u8,
    },

    #[error("'{path}': fields of block {code} overrun its payload")]
    BadLayout { path: PathBuf, code: BlockCode },

    #[error("block {code} has no byte field '{field}'")]
    FieldMissing { code: BlockCode, field: String },

    #[error("value of {len} bytes does not fit field '{field}' (capacity {capacity})")]
    ValueTooLong {
        field: String,
        capacity: usize,
        len: usize,
    },

    #[error("'{path}' is open read-only")]
    ReadOnly { path: PathBuf },
}

/// How a block file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// An open block file.
///
/// Blocks are loaded into memory on open. The handle is kept only in
/// read-write mode, for in-place field writes.
#[derive(Debug)]
pub struct BlockFile {
    path: PathBuf,
    handle: Option<File>,
    blocks: Vec<Block>,
    /// Codes in first-seen order, with their blocks in file order.
    codes: Vec<(BlockCode, Vec<BlockIndex>)>,
    by_address: HashMap<u64, BlockIndex>,
}

impl BlockFile {
    /// Open and index a block file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or is not a well-formed block file.
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self, BlockFileError> {
        let mut file = match mode {
            OpenMode::ReadOnly => File::open(path),
            OpenMode::ReadWrite => OpenOptions::new().read(true).write(true).open(path),
        }
        .map_err(|source| BlockFileError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|source| BlockFileError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let blocks = parse(path, &buf)?;

        let mut codes: Vec<(BlockCode, Vec<BlockIndex>)> = Vec::new();
        let mut code_slot: HashMap<BlockCode, usize> = HashMap::new();
        let mut by_address = HashMap::new();
        for (i, block) in blocks.iter().enumerate() {
            let index = BlockIndex(i);
            let slot = *code_slot.entry(block.code).or_insert_with(|| {
                codes.push((block.code, Vec::new()));
                codes.len() - 1
            });
            codes[slot].1.push(index);
            if block.address != 0 {
                by_address.entry(block.address).or_insert(index);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            handle: (mode == OpenMode::ReadWrite).then_some(file),
            blocks,
            codes,
            by_address,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block codes present in the file, in first-seen order.
    pub fn codes(&self) -> impl Iterator<Item = BlockCode> + '_ {
        self.codes.iter().map(|(code, _)| *code)
    }

    /// Blocks with the given code, in file order.
    pub fn blocks_of_code(&self, code: BlockCode) -> &[BlockIndex] {
        self.codes
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, blocks)| blocks.as_slice())
            .unwrap_or(&[])
    }

    pub fn block(&self, index: BlockIndex) -> &Block {
        &self.blocks[index.0]
    }

    /// The block stored at `address`, if any.
    pub fn block_at(&self, address: Address) -> Option<BlockIndex> {
        self.by_address.get(&address.get()).copied()
    }

    /// Resolve an optional pointer value.
    pub fn resolve(&self, pointer: Option<Address>) -> Option<BlockIndex> {
        pointer.and_then(|a| self.block_at(a))
    }

    /// Follow a pointer field of a block.
    pub fn pointer(&self, index: BlockIndex, field: &str) -> Option<BlockIndex> {
        self.resolve(self.block(index).pointer(field))
    }

    /// Follow element `i` of a pointer array field.
    pub fn pointer_at(&self, index: BlockIndex, field: &str, i: usize) -> Option<BlockIndex> {
        self.resolve(self.block(index).pointer_at(field, i))
    }

    /// Collect a singly linked list starting at `first`, following `next`.
    ///
    /// A list that loops back on itself ends at the first repeated block.
    pub fn list(&self, first: Option<BlockIndex>) -> Vec<BlockIndex> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut current = first;
        while let Some(index) = current {
            if !seen.insert(index) {
                break;
            }
            items.push(index);
            current = self.pointer(index, "next");
        }
        items
    }

    /// Overwrite a byte-string field.
    ///
    /// # Errors
    ///
    /// Fails on read-only files, missing fields, values that do not fit the
    /// field, or I/O errors while writing through.
    pub fn set_bytes(
        &mut self,
        index: BlockIndex,
        field: &str,
        value: &[u8],
    ) -> Result<(), BlockFileError> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(BlockFileError::ReadOnly {
                path: self.path.clone(),
            });
        };
        let block = &mut self.blocks[index.0];
        let (offset, padded) = block.store_bytes(field, value)?;
        let pos = block.payload_pos + offset as u64;

        handle
            .seek(SeekFrom::Start(pos))
            .and_then(|_| handle.write_all(&padded))
            .map_err(|source| BlockFileError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Check that `value` would fit byte field `field` of block `index`.
    pub fn check_bytes(
        &self,
        index: BlockIndex,
        field: &str,
        value: &[u8],
    ) -> Result<(), BlockFileError> {
        self.blocks[index.0].bytes_slot(field, value.len()).map(|_| ())
    }

    /// Flush pending writes and release the handle.
    pub fn close(self) -> Result<(), BlockFileError> {
        if let Some(handle) = self.handle {
            handle.sync_all().map_err(|source| BlockFileError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Bounds-checked little-endian reader over a byte slice.
struct Cursor<'a> {
    path: &'a Path,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], BlockFileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| BlockFileError::Truncated {
                path: self.path.to_path_buf(),
                offset: self.pos,
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], BlockFileError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, BlockFileError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, BlockFileError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, BlockFileError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, BlockFileError> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

fn parse(path: &Path, buf: &[u8]) -> Result<Vec<Block>, BlockFileError> {
    let mut cur = Cursor { path, buf, pos: 0 };

    if cur.take(MAGIC.len()).ok() != Some(&MAGIC[..]) {
        return Err(BlockFileError::BadMagic {
            path: path.to_path_buf(),
        });
    }
    let version = cur.u16()?;
    let pointer_size = cur.u8()?;
    let _reserved = cur.u8()?;
    if version != VERSION || pointer_size as usize != POINTER_SIZE {
        return Err(BlockFileError::UnsupportedHeader {
            path: path.to_path_buf(),
            version,
            pointer_size,
        });
    }

    let mut blocks = Vec::new();
    loop {
        let code = BlockCode::new(cur.array()?);
        let address = cur.u64()?;
        let field_count = cur.u16()?;
        let payload_len = cur.u32()? as usize;

        let mut fields = Vec::with_capacity(field_count as usize);
        let mut offset = 0usize;
        for _ in 0..field_count {
            let name_len = cur.u8()? as usize;
            let name = String::from_utf8_lossy(cur.take(name_len)?).into_owned();
            let tag = cur.u8()?;
            let kind = FieldKind::from_tag(tag).ok_or_else(|| BlockFileError::UnknownFieldKind {
                path: path.to_path_buf(),
                code,
                kind: tag,
            })?;
            let count = cur.u32()?;
            let field = FieldDef {
                name,
                kind,
                count,
                offset,
            };
            offset += field.size();
            fields.push(field);
        }
        if offset > payload_len {
            return Err(BlockFileError::BadLayout {
                path: path.to_path_buf(),
                code,
            });
        }

        let payload_pos = cur.pos as u64;
        let data = cur.take(payload_len)?.to_vec();

        if code == BlockCode::END {
            break;
        }
        blocks.push(Block {
            code,
            address,
            payload_pos,
            fields,
            data,
        });
    }

    Ok(blocks)
}
