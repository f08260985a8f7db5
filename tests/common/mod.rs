//! Shared fixtures for the integration tests.
//!
//! Scene files are authored with [`BlockFileBuilder`]; nothing here depends
//! on files checked into the repository.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use scenepack::blockfile::{Address, BlockCode, BlockFileBuilder};
use scenepack::walk::{dependencies, Trace, WalkOptions};

/// Add an image block stored at `path`.
pub fn image(b: &mut BlockFileBuilder, name: &str, path: &str) -> Address {
    b.id(BlockCode::IMAGE, name, |f| {
        f.bytes("name", path.as_bytes(), 128)
            .int("source", 1)
            .pointer("packedfile", None)
    })
}

/// Add a library block stored at `path`.
pub fn library(b: &mut BlockFileBuilder, path: &str) -> Address {
    let name = format!("LI{}", path.rsplit('/').next().unwrap_or(path));
    b.block(BlockCode::LIBRARY, |f| {
        f.bytes("id.name", name.as_bytes(), 66)
            .bytes("name", path.as_bytes(), 128)
            .pointer("packedfile", None)
    })
}

/// Add a linked identity `id` (code included, e.g. `OBHero`) from `lib`.
pub fn linked(b: &mut BlockFileBuilder, lib: Address, id: &str) -> Address {
    b.block(BlockCode::LINKED_ID, |f| {
        f.bytes("name", id.as_bytes(), 66).pointer("lib", Some(lib))
    })
}

/// An object whose mesh uses a material with an image texture.
pub fn textured_object(b: &mut BlockFileBuilder, name: &str, image_path: &str) -> Address {
    let ima = image(b, &format!("{}.png", name), image_path);
    let tex = b.id(BlockCode::TEXTURE, name, |f| f.pointer("ima", Some(ima)));
    let slot = b.data(|f| f.pointer("tex", Some(tex)));
    let mat = b.id(BlockCode::MATERIAL, name, |f| f.pointers("mtex", &[Some(slot)]));
    let array = b.pointer_array(&[Some(mat)]);
    let mesh = b.id(BlockCode::MESH, name, |f| f.int("totcol", 1).pointer("mat", Some(array)));
    b.id(BlockCode::OBJECT, name, |f| f.pointer("data", Some(mesh)))
}

pub fn touch(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// A small project:
///
/// ```text
/// src/root.blend        IM //tex/sky.png, LI //libs/lib.blend (OBHero)
/// src/tex/sky.png
/// src/libs/lib.blend    OB Hero -> ME -> MA -> TE -> IM //tex/wood.png
///                       OB Extra -> ... -> IM //tex/unused.png
/// src/libs/tex/wood.png
/// ```
///
/// Returns the root path.
pub fn project(dir: &Path) -> PathBuf {
    let src = dir.join("src");
    touch(&src.join("tex/sky.png"), b"sky pixels");
    touch(&src.join("libs/tex/wood.png"), b"wood pixels");
    touch(&src.join("libs/tex/unused.png"), b"unused pixels");

    let mut lib = BlockFileBuilder::new();
    textured_object(&mut lib, "Hero", "//tex/wood.png");
    textured_object(&mut lib, "Extra", "//tex/unused.png");
    lib.write(&src.join("libs/lib.blend")).unwrap();

    let mut root = BlockFileBuilder::new();
    image(&mut root, "sky.png", "//tex/sky.png");
    let li = library(&mut root, "//libs/lib.blend");
    linked(&mut root, li, "OBHero");
    let path = src.join("root.blend");
    root.write(&path).unwrap();
    path
}

/// Stored paths of `file`, without following libraries.
pub fn stored_paths(file: &Path) -> Vec<String> {
    let options = WalkOptions {
        readonly: true,
        recursive: false,
    };
    dependencies(file, options, &mut Trace::silent())
        .unwrap()
        .into_iter()
        .map(|dep| dep.stored)
        .collect()
}

/// Every regular file under `dir`, relative and `/`-separated, sorted.
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let rel = path.strip_prefix(dir).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    out.sort();
    out
}

/// Contents of every file under `dir`, for before/after comparisons.
pub fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    files_under(dir)
        .into_iter()
        .map(|rel| {
            let data = fs::read(dir.join(&rel)).unwrap();
            (rel, data)
        })
        .collect()
}
