//! blockfile::block
//!
//! Blocks, their field layout, and typed field access.
//!
//! A block's payload is a run of fields laid out back to back. Each field
//! has a kind and an element count; the layout is stored with the block so
//! readers never need an external schema.

use std::num::NonZeroU64;

use super::code::BlockCode;
use super::BlockFileError;

/// Width of a stored pointer in bytes.
pub const POINTER_SIZE: usize = 8;

/// A stored, non-null block address.
///
/// Blocks refer to each other by the address recorded in the target's
/// header. A zero pointer has no `Address`; it is represented as `None`
/// wherever a pointer is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(NonZeroU64);

impl Address {
    /// Wrap a raw pointer value. Zero yields `None`.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub(crate) fn from_nonzero(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// The raw pointer value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Position of a block in a file's block arena.
///
/// Only meaningful for the `BlockFile` that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockIndex(pub(crate) usize);

impl BlockIndex {
    /// The arena slot.
    pub fn get(self) -> usize {
        self.0
    }
}

/// Storage kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Signed 64-bit little-endian integers.
    Int,
    /// 64-bit little-endian block addresses (0 = null).
    Pointer,
    /// A fixed-capacity, NUL-terminated byte string.
    Bytes,
}

impl FieldKind {
    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FieldKind::Int),
            1 => Some(FieldKind::Pointer),
            2 => Some(FieldKind::Bytes),
            _ => None,
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            FieldKind::Int => 0,
            FieldKind::Pointer => 1,
            FieldKind::Bytes => 2,
        }
    }

    /// Size of one element in bytes.
    pub fn element_size(self) -> usize {
        match self {
            FieldKind::Int | FieldKind::Pointer => 8,
            FieldKind::Bytes => 1,
        }
    }
}

/// One field of a block's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// Number of elements (the capacity for byte strings).
    pub count: u32,
    /// Offset of the first element within the payload.
    pub offset: usize,
}

impl FieldDef {
    /// Declared size of the field in bytes.
    pub fn size(&self) -> usize {
        self.count as usize * self.kind.element_size()
    }
}

/// A block: header, field layout and payload.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) code: BlockCode,
    pub(crate) address: u64,
    /// Absolute file offset of the payload.
    pub(crate) payload_pos: u64,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) data: Vec<u8>,
}

impl Block {
    pub fn code(&self) -> BlockCode {
        self.code
    }

    /// The address other blocks use to point at this one.
    pub fn address(&self) -> Option<Address> {
        Address::new(self.address)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared size of a field in bytes.
    pub fn field_size(&self, name: &str) -> Option<usize> {
        self.field(name).map(FieldDef::size)
    }

    /// First element of an integer field.
    pub fn int(&self, name: &str) -> Option<i64> {
        let field = self.field(name)?;
        if field.kind != FieldKind::Int || field.count == 0 {
            return None;
        }
        self.word(field.offset).map(|w| w as i64)
    }

    /// First element of a pointer field.
    pub fn pointer(&self, name: &str) -> Option<Address> {
        self.pointer_at(name, 0)
    }

    /// Element `index` of a pointer array field.
    pub fn pointer_at(&self, name: &str, index: usize) -> Option<Address> {
        let field = self.field(name)?;
        if field.kind != FieldKind::Pointer || index >= field.count as usize {
            return None;
        }
        self.word(field.offset + index * POINTER_SIZE)
            .and_then(Address::new)
    }

    /// Raw pointer stored at a byte offset of the payload.
    ///
    /// Used for untyped pointer arrays held in `DATA` blocks.
    pub fn raw_pointer(&self, index: usize) -> Option<Address> {
        self.word(index * POINTER_SIZE).and_then(Address::new)
    }

    /// A byte-string field, up to (not including) the first NUL.
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        let field = self.field(name)?;
        if field.kind != FieldKind::Bytes {
            return None;
        }
        let raw = self.data.get(field.offset..field.offset + field.size())?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Some(&raw[..end])
    }

    /// The ID name (`id.name`) of an ID block, e.g. `b"IMsky.png"`.
    pub fn id_name(&self) -> Option<&[u8]> {
        self.bytes("id.name")
    }

    /// Store a byte string into a field of this in-memory block.
    ///
    /// Returns the payload offset and the padded bytes written, so the caller
    /// can mirror the change on disk.
    pub(crate) fn store_bytes(
        &mut self,
        name: &str,
        value: &[u8],
    ) -> Result<(usize, Vec<u8>), BlockFileError> {
        let (offset, capacity) = self.bytes_slot(name, value.len())?;
        let mut padded = vec![0u8; capacity];
        padded[..value.len()].copy_from_slice(value);
        self.data[offset..offset + capacity].copy_from_slice(&padded);
        Ok((offset, padded))
    }

    /// Offset and capacity of byte field `name`, if `len` bytes fit in it.
    pub(crate) fn bytes_slot(
        &self,
        name: &str,
        len: usize,
    ) -> Result<(usize, usize), BlockFileError> {
        let field = self
            .field(name)
            .filter(|f| f.kind == FieldKind::Bytes)
            .ok_or_else(|| BlockFileError::FieldMissing {
                code: self.code,
                field: name.to_string(),
            })?;
        let capacity = field.size();
        // One byte is kept for the terminator.
        if len >= capacity {
            return Err(BlockFileError::ValueTooLong {
                field: name.to_string(),
                capacity,
                len,
            });
        }
        Ok((field.offset, capacity))
    }

    fn word(&self, offset: usize) -> Option<u64> {
        let raw = self.data.get(offset..offset + 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Some(u64::from_le_bytes(buf))
    }
}
