//! Property tests for the resource registry

use bxporter_export::Registry;
use bxporter_scene::Mesh;
use proptest::prelude::*;

/// Helper to create meshes from names, duplicates included
fn make_meshes(names: &[String]) -> Vec<Mesh> {
    names.iter().map(|n| Mesh::new(n.as_str())).collect()
}

proptest! {
    #[test]
    fn test_ids_are_contiguous_in_first_seen_order(names in prop::collection::vec("[A-D][a-z]{0,2}", 0..40)) {
        let meshes = make_meshes(&names);
        let mut registry = Registry::new();
        let mut first_seen: Vec<&str> = Vec::new();

        for mesh in &meshes {
            let added = registry.insert(mesh);
            let fresh = !first_seen.contains(&mesh.name.as_str());
            prop_assert_eq!(added, fresh);
            if fresh {
                first_seen.push(mesh.name.as_str());
            }
        }

        prop_assert_eq!(registry.len(), first_seen.len());
        for (id, entry) in registry.iter().enumerate() {
            prop_assert_eq!(entry.id, id);
            prop_assert_eq!(entry.key.as_str(), first_seen[id]);
        }
    }

    #[test]
    fn test_insert_is_idempotent(names in prop::collection::vec("[a-z]{1,4}", 1..20)) {
        let meshes = make_meshes(&names);
        let mut registry = Registry::new();
        for mesh in &meshes {
            registry.insert(mesh);
        }
        let before: Vec<(usize, String)> = registry.iter().map(|e| (e.id, e.key.clone())).collect();

        for mesh in &meshes {
            prop_assert!(!registry.insert(mesh));
        }
        let after: Vec<(usize, String)> = registry.iter().map(|e| (e.id, e.key.clone())).collect();
        prop_assert_eq!(before, after);
    }
}
