//! Property-based tests for path rewriting and pack layout.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use scenepack::core::paths::{absolute_path, normalize, project_relative, relative_between};
use scenepack::pack::Layout;

/// Strategy for one path component.
fn component() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}(\\.[a-z]{1,4})?"
}

/// Strategy for a `/`-separated relative path of 0..depth components.
fn rel_path(depth: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(component(), 0..depth).prop_map(|parts| parts.join("/"))
}

proptest! {
    /// Following the relative path from `from` lands on `to`.
    #[test]
    fn relative_between_resolves_to_target(from in rel_path(4), to in rel_path(5)) {
        let rel = relative_between(&from, &to);
        let landed = normalize(&Path::new("/out").join(&from).join(&rel));
        prop_assert_eq!(landed, normalize(&Path::new("/out").join(&to)));
    }

    /// A rewritten stored path resolves against its owner's directory.
    #[test]
    fn rewritten_reference_resolves(owner_dir in rel_path(3), target in rel_path(4)) {
        prop_assume!(!target.is_empty());
        let stored = project_relative(&relative_between(&owner_dir, &target));
        let basedir = Path::new("/out").join(&owner_dir);
        prop_assert_eq!(
            absolute_path(&stored, &basedir),
            normalize(&Path::new("/out").join(&target))
        );
    }

    /// Distinct sources never share a destination, and lookups are stable.
    #[test]
    fn layout_destinations_are_unique(
        sources in prop::collection::vec((rel_path(3), component()), 1..20)
    ) {
        let root = Path::new("/src/root.blend");
        let mut layout = Layout::new(root, "root.blend", "data");
        let sources: BTreeSet<PathBuf> = sources
            .into_iter()
            .map(|(dir, name)| Path::new("/src").join(dir).join(name))
            .filter(|p| p != root)
            .collect();

        let mut seen = BTreeSet::new();
        seen.insert("root.blend".to_string());
        for source in &sources {
            let dest = layout.destination(source);
            prop_assert!(dest.starts_with("data/"));
            prop_assert!(seen.insert(dest.clone()), "{} assigned twice", dest);
        }
        for source in &sources {
            let again = layout.destination(source);
            prop_assert_eq!(Some(again.as_str()), layout.get(source));
        }
    }
}
