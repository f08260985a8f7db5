//! blockfile::builder
//!
//! Authoring block files.
//!
//! # Example
//!
//! ```no_run
//! use scenepack::blockfile::{BlockCode, BlockFileBuilder};
//! use std::path::Path;
//!
//! let mut builder = BlockFileBuilder::new();
//! let lib = builder.block(BlockCode::LIBRARY, |b| b.bytes("name", b"//props.blend", 1024));
//! builder.id(BlockCode::IMAGE, "sky.png", |b| {
//!     b.bytes("name", b"//textures/sky.png", 1024)
//!         .int("source", 1)
//!         .pointer("packedfile", None)
//! });
//! builder.block(BlockCode::LINKED_ID, |b| b.bytes("name", b"OBChair", 66).pointer("lib", Some(lib)));
//! builder.write(Path::new("scene.blend")).unwrap();
//! ```

use std::fs;
use std::io;
use std::num::NonZeroU64;
use std::path::Path;

use super::block::{Address, FieldKind};
use super::code::BlockCode;
use super::{MAGIC, VERSION};

/// Capacity given to `id.name` fields by [`BlockFileBuilder::id`].
const ID_NAME_CAPACITY: u32 = 66;

#[derive(Debug, Clone)]
struct PendingField {
    name: String,
    kind: FieldKind,
    count: u32,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct PendingBlock {
    code: BlockCode,
    address: Address,
    fields: Vec<PendingField>,
}

/// Field list of a block under construction.
#[derive(Debug, Default, Clone)]
pub struct BlockBuilder {
    fields: Vec<PendingField>,
}

impl BlockBuilder {
    /// Add a single integer field.
    pub fn int(self, name: &str, value: i64) -> Self {
        self.push(name, FieldKind::Int, 1, value.to_le_bytes().to_vec())
    }

    /// Add a single pointer field.
    pub fn pointer(self, name: &str, value: Option<Address>) -> Self {
        self.pointers(name, &[value])
    }

    /// Add a fixed-size pointer array field.
    pub fn pointers(self, name: &str, values: &[Option<Address>]) -> Self {
        let data = values
            .iter()
            .flat_map(|v| v.map_or(0, Address::get).to_le_bytes())
            .collect();
        self.push(name, FieldKind::Pointer, values.len() as u32, data)
    }

    /// Add a byte-string field of the given capacity.
    ///
    /// The capacity grows to fit `value` plus its terminator.
    pub fn bytes(self, name: &str, value: &[u8], capacity: u32) -> Self {
        let capacity = capacity.max(value.len() as u32 + 1);
        let mut data = vec![0u8; capacity as usize];
        data[..value.len()].copy_from_slice(value);
        self.push(name, FieldKind::Bytes, capacity, data)
    }

    fn push(mut self, name: &str, kind: FieldKind, count: u32, data: Vec<u8>) -> Self {
        self.fields.push(PendingField {
            name: name.to_string(),
            kind,
            count,
            data,
        });
        self
    }
}

/// Builds a block file in memory and writes it out.
#[derive(Debug, Clone)]
pub struct BlockFileBuilder {
    next_address: NonZeroU64,
    blocks: Vec<PendingBlock>,
}

impl Default for BlockFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockFileBuilder {
    pub fn new() -> Self {
        Self {
            next_address: NonZeroU64::MIN.saturating_add(0xfff),
            blocks: Vec::new(),
        }
    }

    /// Allocate an address for a block defined later (forward references).
    pub fn reserve(&mut self) -> Address {
        let address = Address::from_nonzero(self.next_address);
        self.next_address = self.next_address.saturating_add(0x100);
        address
    }

    /// Append a block with a fresh address.
    pub fn block(
        &mut self,
        code: BlockCode,
        fields: impl FnOnce(BlockBuilder) -> BlockBuilder,
    ) -> Address {
        let address = self.reserve();
        self.block_at(address, code, fields)
    }

    /// Append a block at a previously reserved address.
    pub fn block_at(
        &mut self,
        address: Address,
        code: BlockCode,
        fields: impl FnOnce(BlockBuilder) -> BlockBuilder,
    ) -> Address {
        let built = fields(BlockBuilder::default());
        self.blocks.push(PendingBlock {
            code,
            address,
            fields: built.fields,
        });
        address
    }

    /// Append an ID block whose `id.name` is the code followed by `name`.
    pub fn id(
        &mut self,
        code: BlockCode,
        name: &str,
        fields: impl FnOnce(BlockBuilder) -> BlockBuilder,
    ) -> Address {
        let address = self.reserve();
        self.id_at(address, code, name, fields)
    }

    /// [`Self::id`] at a reserved address.
    pub fn id_at(
        &mut self,
        address: Address,
        code: BlockCode,
        name: &str,
        fields: impl FnOnce(BlockBuilder) -> BlockBuilder,
    ) -> Address {
        let mut id_name = code.as_bytes().to_vec();
        id_name.extend_from_slice(name.as_bytes());
        self.block_at(address, code, |b| {
            fields(b.bytes("id.name", &id_name, ID_NAME_CAPACITY))
        })
    }

    /// Append a `DATA` block.
    pub fn data(&mut self, fields: impl FnOnce(BlockBuilder) -> BlockBuilder) -> Address {
        self.block(BlockCode::DATA, fields)
    }

    /// Append a `DATA` block at a reserved address.
    pub fn data_at(
        &mut self,
        address: Address,
        fields: impl FnOnce(BlockBuilder) -> BlockBuilder,
    ) -> Address {
        self.block_at(address, BlockCode::DATA, fields)
    }

    /// Append a `DATA` block holding a bare pointer array.
    pub fn pointer_array(&mut self, items: &[Option<Address>]) -> Address {
        self.data(|b| b.pointers("array", items))
    }

    /// Serialize all blocks.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.push(super::POINTER_SIZE as u8);
        out.push(0);

        for block in &self.blocks {
            let payload_len: usize = block.fields.iter().map(|f| f.data.len()).sum();
            out.extend_from_slice(&block.code.raw());
            out.extend_from_slice(&block.address.get().to_le_bytes());
            out.extend_from_slice(&(block.fields.len() as u16).to_le_bytes());
            out.extend_from_slice(&(payload_len as u32).to_le_bytes());
            for field in &block.fields {
                let name = field.name.as_bytes();
                out.push(name.len() as u8);
                out.extend_from_slice(name);
                out.push(field.kind.tag());
                out.extend_from_slice(&field.count.to_le_bytes());
            }
            for field in &block.fields {
                out.extend_from_slice(&field.data);
            }
        }

        out.extend_from_slice(&BlockCode::END.raw());
        out.extend_from_slice(&0u64.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    /// Write the file to `path`, replacing any existing file.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_bytes())
    }
}
