//! scenepack - Dependency walker and packer for block-structured scene files
//!
//! Scene files link to images, fonts, sounds, caches and other scene files
//! by path. `scenepack` finds every such path, follows library links, and
//! repackages a scene with all its dependencies into a self-contained
//! directory or archive with the stored paths rewritten.
//!
//! # Architecture
//!
//! - [`blockfile`] - Reading and patching the block-structured file format
//! - [`walk`] - Recursive discovery of path references across libraries
//! - [`pack`] - Copy-on-first-touch repackaging with path rewriting
//! - [`remap`] - Rewriting the stored paths of a single file
//! - [`archive`] - Zip output and extraction
//! - [`wire`] - Checkout stream framing
//! - [`session`] - Checked-out sessions and commit staging
//! - [`core`] - Configuration and stored-path handling
//! - [`cli`] - Command-line interface layer
//! - [`ui`] - User interaction utilities
//!
//! # Correctness Invariants
//!
//! 1. Source files are never opened for writing
//! 2. Every identity is expanded at most once per walk
//! 3. A walk terminates on cyclic library links
//! 4. Every rewritten path is recorded against its original

pub mod archive;
pub mod blockfile;
pub mod cli;
pub mod core;
pub mod pack;
pub mod remap;
pub mod session;
pub mod ui;
pub mod walk;
pub mod wire;
