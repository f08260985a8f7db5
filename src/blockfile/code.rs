//! blockfile::code
//!
//! Block type codes.
//!
//! Every block carries a 4-byte code. ID blocks (the user-visible data
//! kinds such as images, objects or scenes) use a 2-character code padded
//! with NUL bytes; structural blocks use all four characters (`DATA`,
//! `ENDB`).

use std::fmt;

/// A block type code.
///
/// # Example
///
/// ```
/// use scenepack::blockfile::BlockCode;
///
/// assert_eq!(BlockCode::IMAGE.as_str(), "IM");
/// assert!(BlockCode::IMAGE.is_id());
/// assert!(!BlockCode::DATA.is_id());
/// assert_eq!(BlockCode::new(*b"OB\0\0"), BlockCode::OBJECT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockCode([u8; 4]);

impl BlockCode {
    pub const IMAGE: BlockCode = BlockCode::id(*b"IM");
    pub const MOVIECLIP: BlockCode = BlockCode::id(*b"MC");
    pub const FONT: BlockCode = BlockCode::id(*b"VF");
    pub const SOUND: BlockCode = BlockCode::id(*b"SO");
    pub const MESH: BlockCode = BlockCode::id(*b"ME");
    pub const CURVE: BlockCode = BlockCode::id(*b"CU");
    pub const METABALL: BlockCode = BlockCode::id(*b"MB");
    pub const LAMP: BlockCode = BlockCode::id(*b"LA");
    pub const MATERIAL: BlockCode = BlockCode::id(*b"MA");
    pub const TEXTURE: BlockCode = BlockCode::id(*b"TE");
    pub const WORLD: BlockCode = BlockCode::id(*b"WO");
    pub const NODETREE: BlockCode = BlockCode::id(*b"NT");
    pub const SCENE: BlockCode = BlockCode::id(*b"SC");
    pub const GROUP: BlockCode = BlockCode::id(*b"GR");
    pub const OBJECT: BlockCode = BlockCode::id(*b"OB");
    pub const ACTION: BlockCode = BlockCode::id(*b"AC");
    pub const LIBRARY: BlockCode = BlockCode::id(*b"LI");
    /// Placeholder for an ID that lives in a library file.
    pub const LINKED_ID: BlockCode = BlockCode::id(*b"ID");
    pub const WINDOW_MANAGER: BlockCode = BlockCode::id(*b"WM");
    pub const SCREEN: BlockCode = BlockCode::id(*b"SN");
    pub const DATA: BlockCode = BlockCode(*b"DATA");
    pub const END: BlockCode = BlockCode(*b"ENDB");

    /// Create a code from its raw on-disk bytes.
    pub const fn new(raw: [u8; 4]) -> Self {
        Self(raw)
    }

    /// Create a 2-character ID code.
    pub const fn id(name: [u8; 2]) -> Self {
        Self([name[0], name[1], 0, 0])
    }

    /// Parse a code from a short string (at most 4 bytes).
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 || bytes.contains(&0) {
            return None;
        }
        let mut raw = [0u8; 4];
        raw[..bytes.len()].copy_from_slice(bytes);
        Some(Self(raw))
    }

    /// Raw bytes as stored on disk.
    pub fn raw(&self) -> [u8; 4] {
        self.0
    }

    /// The significant bytes (trailing NUL padding removed).
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(4);
        &self.0[..len]
    }

    /// The code as text. Non-ASCII codes render as `"????"`.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("????")
    }

    /// Length of the significant part of the code.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// True for the all-NUL code.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for 2-character ID codes.
    pub fn is_id(&self) -> bool {
        self.len() == 2
    }
}

impl fmt::Display for BlockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
