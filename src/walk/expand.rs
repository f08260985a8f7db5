//! walk::expand
//!
//! Identity expansion: given an ID block, the ID blocks it depends on.
//!
//! When a library is entered only for a few identities, everything those
//! identities use inside the same file must be visited too. [`ExpandIds`] is
//! the seam; [`StaticExpander`] is the built-in table keyed by block code.
//!
//! | code     | depends on                                                     |
//! |----------|----------------------------------------------------------------|
//! | `OB`     | animation data, `data`, `dup_group`, `proxy`, `proxy_group`    |
//! | `ME` `MB`| animation data, material array                                 |
//! | `CU`     | animation data, material array, fonts                          |
//! | `LA` `WO`| animation data, node tree, texture slots                       |
//! | `MA`     | as `LA`, plus `group`                                          |
//! | `TE`     | animation data, node tree, `ima`                               |
//! | `NT`     | animation data, the IDs used by its nodes                      |
//! | `SC`     | animation data, node tree, `world`, objects of its bases       |
//! | `GR`     | objects of its group entries                                   |
//!
//! Null pointers contribute nothing. Codes without an entry have no
//! dependencies.

use crate::blockfile::{BlockCode, BlockFile, BlockIndex, POINTER_SIZE};

/// Node type of render-layer nodes, whose `id` is the owning scene.
const NODE_RENDER_LAYERS: i64 = 221;

/// Source of same-file dependencies of an ID block.
pub trait ExpandIds {
    /// Blocks `block` depends on, in a stable order. May repeat.
    fn expand(&self, file: &BlockFile, block: BlockIndex) -> Vec<BlockIndex>;
}

/// Expansion function for one block code.
pub type ExpandFn = fn(&BlockFile, BlockIndex, &mut Vec<BlockIndex>);

/// The built-in expansion table.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticExpander;

impl ExpandIds for StaticExpander {
    fn expand(&self, file: &BlockFile, block: BlockIndex) -> Vec<BlockIndex> {
        let mut out = Vec::new();
        if let Some(expand) = expander_for(file.block(block).code()) {
            expand(file, block, &mut out);
        }
        out
    }
}

/// Look up the expansion function for a code.
pub fn expander_for(code: BlockCode) -> Option<ExpandFn> {
    let expand: ExpandFn = match code {
        BlockCode::OBJECT => expand_object,
        BlockCode::MESH | BlockCode::METABALL => expand_with_materials,
        BlockCode::CURVE => expand_curve,
        BlockCode::LAMP | BlockCode::WORLD => expand_shaded,
        BlockCode::MATERIAL => expand_material,
        BlockCode::TEXTURE => expand_texture,
        BlockCode::NODETREE => expand_nodetree,
        BlockCode::SCENE => expand_scene,
        BlockCode::GROUP => expand_group,
        _ => return None,
    };
    Some(expand)
}

fn push(out: &mut Vec<BlockIndex>, block: Option<BlockIndex>) {
    if let Some(block) = block {
        out.push(block);
    }
}

fn push_field(file: &BlockFile, block: BlockIndex, field: &str, out: &mut Vec<BlockIndex>) {
    push(out, file.pointer(block, field));
}

/// The action driving the block's animation data.
fn animdata(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    if let Some(adt) = file.pointer(block, "adt") {
        push_field(file, adt, "action", out);
    }
}

/// Materials listed in the `mat` pointer array, `totcol` entries long.
fn materials(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    let total = file.block(block).int("totcol").unwrap_or(0);
    if total <= 0 {
        return;
    }
    let Some(array) = file.pointer(block, "mat") else {
        return;
    };
    let array = file.block(array);
    let slots = (total as usize).min(array.payload().len() / POINTER_SIZE);
    for i in 0..slots {
        push(out, file.resolve(array.raw_pointer(i)));
    }
}

/// IDs used by the nodes of a node tree. Render-layer nodes are skipped.
fn nodes(file: &BlockFile, tree: BlockIndex, out: &mut Vec<BlockIndex>) {
    for node in file.list(file.pointer(tree, "nodes.first")) {
        if file.block(node).int("type") == Some(NODE_RENDER_LAYERS) {
            continue;
        }
        push_field(file, node, "id", out);
    }
}

/// The embedded node tree and what it uses.
fn nodetree(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    if let Some(tree) = file.pointer(block, "nodetree") {
        nodes(file, tree, out);
    }
}

/// Textures and mapping objects of the `mtex` slot array.
fn texture_slots(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    let slots = file.block(block).field_size("mtex").unwrap_or(0) / POINTER_SIZE;
    for i in 0..slots {
        if let Some(slot) = file.pointer_at(block, "mtex", i) {
            push_field(file, slot, "tex", out);
            push_field(file, slot, "object", out);
        }
    }
}

fn expand_object(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    animdata(file, block, out);
    for field in ["data", "dup_group", "proxy", "proxy_group"] {
        push_field(file, block, field, out);
    }
}

fn expand_with_materials(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    animdata(file, block, out);
    materials(file, block, out);
}

fn expand_curve(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    expand_with_materials(file, block, out);
    for field in ["vfont", "vfontb", "vfonti", "vfontbi"] {
        push_field(file, block, field, out);
    }
}

fn expand_shaded(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    animdata(file, block, out);
    nodetree(file, block, out);
    texture_slots(file, block, out);
}

fn expand_material(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    expand_shaded(file, block, out);
    push_field(file, block, "group", out);
}

fn expand_texture(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    animdata(file, block, out);
    nodetree(file, block, out);
    push_field(file, block, "ima", out);
}

fn expand_nodetree(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    animdata(file, block, out);
    nodes(file, block, out);
}

fn expand_scene(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    animdata(file, block, out);
    nodetree(file, block, out);
    push_field(file, block, "world", out);
    for base in file.list(file.pointer(block, "base.first")) {
        push_field(file, base, "object", out);
    }
}

fn expand_group(file: &BlockFile, block: BlockIndex, out: &mut Vec<BlockIndex>) {
    for entry in file.list(file.pointer(block, "gobject.first")) {
        push_field(file, entry, "ob", out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockfile::{BlockFileBuilder, OpenMode};
    use std::path::Path;
    use tempfile::TempDir;

    fn open(builder: &BlockFileBuilder, dir: &Path) -> BlockFile {
        let path = dir.join("expand.blend");
        builder.write(&path).unwrap();
        BlockFile::open(&path, OpenMode::ReadOnly).unwrap()
    }

    fn names(file: &BlockFile, blocks: &[BlockIndex]) -> Vec<String> {
        blocks
            .iter()
            .map(|&b| String::from_utf8_lossy(file.block(b).id_name().unwrap_or(b"?")).into_owned())
            .collect()
    }

    fn expand_first(file: &BlockFile, code: BlockCode) -> Vec<String> {
        let block = file.blocks_of_code(code)[0];
        names(file, &StaticExpander.expand(file, block))
    }

    #[test]
    fn object_follows_data_animation_and_groups() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        let action = b.id(BlockCode::ACTION, "Walk", |f| f);
        let adt = b.data(|f| f.pointer("action", Some(action)));
        let mesh = b.id(BlockCode::MESH, "Body", |f| f);
        let group = b.id(BlockCode::GROUP, "Rig", |f| f);
        b.id(BlockCode::OBJECT, "Hero", |f| {
            f.pointer("adt", Some(adt))
                .pointer("data", Some(mesh))
                .pointer("dup_group", Some(group))
                .pointer("proxy", None)
        });

        let file = open(&b, temp.path());
        assert_eq!(
            expand_first(&file, BlockCode::OBJECT),
            vec!["ACWalk", "MEBody", "GRRig"]
        );
    }

    #[test]
    fn mesh_material_array_honors_totcol() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        let red = b.id(BlockCode::MATERIAL, "Red", |f| f);
        let blue = b.id(BlockCode::MATERIAL, "Blue", |f| f);
        let array = b.pointer_array(&[Some(red), None, Some(blue)]);
        b.id(BlockCode::MESH, "Body", |f| f.int("totcol", 2).pointer("mat", Some(array)));

        let file = open(&b, temp.path());
        assert_eq!(expand_first(&file, BlockCode::MESH), vec!["MARed"]);
    }

    #[test]
    fn material_walks_nodes_and_texture_slots() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        let image = b.id(BlockCode::IMAGE, "wood.png", |f| f);
        let tex = b.id(BlockCode::TEXTURE, "Wood", |f| f.pointer("ima", Some(image)));
        let scene = b.id(BlockCode::SCENE, "Main", |f| f);
        let slot = b.data(|f| f.pointer("tex", Some(tex)).pointer("object", None));
        let layers = b.reserve();
        let node = b.data(|f| f.int("type", 1).pointer("id", Some(tex)).pointer("next", Some(layers)));
        b.data_at(layers, |f| {
            f.int("type", NODE_RENDER_LAYERS)
                .pointer("id", Some(scene))
                .pointer("next", None)
        });
        let tree = b.data(|f| f.pointer("nodes.first", Some(node)));
        let group = b.id(BlockCode::GROUP, "Props", |f| f);
        b.id(BlockCode::MATERIAL, "Varnish", |f| {
            f.pointer("nodetree", Some(tree))
                .pointers("mtex", &[Some(slot), None, None])
                .pointer("group", Some(group))
        });

        let file = open(&b, temp.path());
        assert_eq!(
            expand_first(&file, BlockCode::MATERIAL),
            vec!["TEWood", "TEWood", "GRProps"]
        );
        assert_eq!(expand_first(&file, BlockCode::TEXTURE), vec!["IMwood.png"]);
    }

    #[test]
    fn scene_and_group_follow_their_lists() {
        let temp = TempDir::new().unwrap();
        let mut b = BlockFileBuilder::new();
        let cam = b.id(BlockCode::OBJECT, "Cam", |f| f);
        let lamp = b.id(BlockCode::OBJECT, "Sun", |f| f);
        let world = b.id(BlockCode::WORLD, "Sky", |f| f);
        let second = b.data(|f| f.pointer("object", Some(lamp)).pointer("next", None));
        let first = b.data(|f| f.pointer("object", Some(cam)).pointer("next", Some(second)));
        b.id(BlockCode::SCENE, "Main", |f| {
            f.pointer("world", Some(world)).pointer("base.first", Some(first))
        });
        let entry = b.data(|f| f.pointer("ob", Some(cam)).pointer("next", None));
        b.id(BlockCode::GROUP, "Rig", |f| f.pointer("gobject.first", Some(entry)));

        let file = open(&b, temp.path());
        assert_eq!(
            expand_first(&file, BlockCode::SCENE),
            vec!["WOSky", "OBCam", "OBSun"]
        );
        assert_eq!(expand_first(&file, BlockCode::GROUP), vec!["OBCam"]);
    }

    #[test]
    fn unknown_codes_expand_to_nothing() {
        assert!(expander_for(BlockCode::IMAGE).is_none());
        assert!(expander_for(BlockCode::LIBRARY).is_none());
        assert!(expander_for(BlockCode::OBJECT).is_some());
    }
}
