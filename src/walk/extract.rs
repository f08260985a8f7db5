//! walk::extract
//!
//! Path extraction: the file paths an ID block stores.
//!
//! | code | path                                   | when                         |
//! |------|----------------------------------------|------------------------------|
//! | `IM` | `name`                                 | file-backed and not packed   |
//! | `MC` | `name`                                 | always                       |
//! | `VF` | `name`                                 | not packed                   |
//! | `SO` | `name`                                 | not packed                   |
//! | `ME` | `ldata.external` → `filename`          | external data present        |
//! | `SC` | sequencer strips, `dir` + `name` split | image and movie strips       |
//! | `LI` | `name`                                 | not packed                   |

use std::collections::HashSet;
use std::path::Path;

use super::reference::{FilePathRef, PathRef};
use crate::blockfile::{BlockCode, BlockFile, BlockIndex};

/// Image sources backed by files: single image, sequence, movie.
const IMAGE_FILE_SOURCES: [i64; 3] = [1, 2, 3];

/// Sequencer strip types.
mod strip {
    pub const IMAGE: i64 = 0;
    pub const META: i64 = 1;
    pub const MOVIE: i64 = 3;
    /// Types from here up are effects, with no file of their own.
    pub const EFFECT: i64 = 8;
}

/// Append the path references stored by `block`.
pub fn extract(
    file: &BlockFile,
    block: BlockIndex,
    basedir: &Path,
    level: usize,
    out: &mut Vec<FilePathRef>,
) {
    let code = file.block(block).code();
    let mut emit = |target: PathRef| out.push(FilePathRef::new(target, basedir, level, code));
    let name = PathRef::Field {
        block,
        field: "name",
    };

    match code {
        BlockCode::IMAGE => {
            let b = file.block(block);
            let from_file = b
                .int("source")
                .is_some_and(|s| IMAGE_FILE_SOURCES.contains(&s));
            if from_file && b.pointer("packedfile").is_none() {
                emit(name);
            }
        }
        BlockCode::MOVIECLIP => emit(name),
        BlockCode::FONT | BlockCode::SOUND | BlockCode::LIBRARY => {
            if file.block(block).pointer("packedfile").is_none() {
                emit(name);
            }
        }
        BlockCode::MESH => {
            if let Some(external) = file.pointer(block, "ldata.external") {
                emit(PathRef::Field {
                    block: external,
                    field: "filename",
                });
            }
        }
        BlockCode::SCENE => {
            if let Some(editing) = file.pointer(block, "ed") {
                let mut seen = HashSet::new();
                sequences(file, file.pointer(editing, "seqbase.first"), &mut seen, &mut emit);
            }
        }
        _ => {}
    }
}

/// Strips of a sequence list; meta strips are descended into.
fn sequences(
    file: &BlockFile,
    first: Option<BlockIndex>,
    seen: &mut HashSet<BlockIndex>,
    emit: &mut impl FnMut(PathRef),
) {
    for seq in file.list(first) {
        if !seen.insert(seq) {
            continue;
        }
        let kind = file.block(seq).int("type").unwrap_or(strip::EFFECT);
        if kind >= strip::EFFECT {
            continue;
        }
        if kind == strip::META {
            sequences(file, file.pointer(seq, "seqbase.first"), seen, emit);
            continue;
        }
        if kind != strip::IMAGE && kind != strip::MOVIE {
            continue;
        }
        let Some(data) = file.pointer(seq, "strip") else {
            continue;
        };
        if let Some(element) = file.pointer(data, "stripdata") {
            emit(PathRef::Split {
                dir_block: data,
                dir_field: "dir",
                name_block: element,
                name_field: "name",
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockfile::{Address, BlockFileBuilder, OpenMode};
    use tempfile::TempDir;

    fn open(builder: &BlockFileBuilder, dir: &Path) -> BlockFile {
        let path = dir.join("extract.blend");
        builder.write(&path).unwrap();
        BlockFile::open(&path, OpenMode::ReadOnly).unwrap()
    }

    fn paths_of(file: &BlockFile, code: BlockCode) -> Vec<String> {
        let mut out = Vec::new();
        for &block in file.blocks_of_code(code) {
            extract(file, block, Path::new("/base"), 0, &mut out);
        }
        out.iter()
            .map(|r| String::from_utf8_lossy(&r.read(file)).into_owned())
            .collect()
    }

    #[test]
    fn images_need_a_file_source_and_no_packed_data() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        let packed = b.data(|f| f.int("size", 10));
        b.id(BlockCode::IMAGE, "a", |f| {
            f.bytes("name", b"//a.png", 64).int("source", 1).pointer("packedfile", None)
        });
        b.id(BlockCode::IMAGE, "b", |f| {
            f.bytes("name", b"//b.png", 64).int("source", 1).pointer("packedfile", Some(packed))
        });
        b.id(BlockCode::IMAGE, "c", |f| {
            f.bytes("name", b"", 64).int("source", 4).pointer("packedfile", None)
        });
        b.id(BlockCode::IMAGE, "d", |f| {
            f.bytes("name", b"//seq/d_001.png", 64).int("source", 2).pointer("packedfile", None)
        });

        let file = open(&b, temp.path());
        assert_eq!(
            paths_of(&file, BlockCode::IMAGE),
            vec!["//a.png", "//seq/d_001.png"]
        );
    }

    #[test]
    fn libraries_fonts_and_clips() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        b.block(BlockCode::LIBRARY, |f| f.bytes("name", b"//lib.blend", 64).pointer("packedfile", None));
        b.id(BlockCode::FONT, "Sans", |f| f.bytes("name", b"//sans.ttf", 64).pointer("packedfile", None));
        b.id(BlockCode::MOVIECLIP, "Shot", |f| f.bytes("name", b"//shot.mov", 64));

        let file = open(&b, temp.path());
        assert_eq!(paths_of(&file, BlockCode::LIBRARY), vec!["//lib.blend"]);
        assert_eq!(paths_of(&file, BlockCode::FONT), vec!["//sans.ttf"]);
        assert_eq!(paths_of(&file, BlockCode::MOVIECLIP), vec!["//shot.mov"]);

        let mut out = Vec::new();
        extract(&file, file.blocks_of_code(BlockCode::LIBRARY)[0], Path::new("/b"), 2, &mut out);
        assert!(out[0].is_library());
        assert_eq!(out[0].level(), 2);
    }

    #[test]
    fn mesh_external_data() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        let external = b.data(|f| f.bytes("filename", b"//cache.mdd", 64));
        b.id(BlockCode::MESH, "Cloth", |f| f.pointer("ldata.external", Some(external)));
        b.id(BlockCode::MESH, "Plain", |f| f.pointer("ldata.external", None));

        let file = open(&b, temp.path());
        assert_eq!(paths_of(&file, BlockCode::MESH), vec!["//cache.mdd"]);
    }

    fn add_strip(b: &mut BlockFileBuilder, kind: i64, dir: &[u8], name: &[u8], next: Option<Address>) -> Address {
        let element = b.data(|f| f.bytes("name", name, 64));
        let data = b.data(|f| f.bytes("dir", dir, 64).pointer("stripdata", Some(element)));
        b.data(|f| f.int("type", kind).pointer("strip", Some(data)).pointer("next", next))
    }

    #[test]
    fn sequencer_strips_descend_into_meta() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        let inner = add_strip(&mut b, strip::MOVIE, b"//clips/", b"b.mov", None);
        let effect = add_strip(&mut b, 9, b"//fx/", b"x.png", None);
        let sound = add_strip(&mut b, 4, b"//snd/", b"s.wav", Some(effect));
        let meta = b.data(|f| {
            f.int("type", strip::META)
                .pointer("seqbase.first", Some(inner))
                .pointer("next", Some(sound))
        });
        let first = add_strip(&mut b, strip::IMAGE, b"//frames/", b"a_0001.png", Some(meta));
        let editing = b.data(|f| f.pointer("seqbase.first", Some(first)));
        b.id(BlockCode::SCENE, "Edit", |f| f.pointer("ed", Some(editing)));

        let file = open(&b, temp.path());
        assert_eq!(
            paths_of(&file, BlockCode::SCENE),
            vec!["//frames/a_0001.png", "//clips/b.mov"]
        );
    }

    #[test]
    fn other_codes_have_no_paths() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        b.id(BlockCode::OBJECT, "Hero", |f| f.bytes("name", b"//nope", 64));
        let file = open(&b, temp.path());
        assert!(paths_of(&file, BlockCode::OBJECT).is_empty());
    }
}
