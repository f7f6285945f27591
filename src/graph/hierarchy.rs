use crate::item::WorkItem;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

/// Parent -> child graph over a flat work item collection.
pub struct HierarchyGraph {
    pub graph: DiGraph<String, ()>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl HierarchyGraph {
    pub fn build(items: &[WorkItem]) -> Self {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut id_to_index: HashMap<String, NodeIndex> = HashMap::new();

        // Add nodes first
        for item in items {
            if !id_to_index.contains_key(&item.id) {
                let node_ix = graph.add_node(item.id.clone());
                id_to_index.insert(item.id.clone(), node_ix);
            }
        }

        // Add edges: parent -> child. Parents outside the collection are ignored.
        for item in items {
            if let Some(parent_id) = &item.parent_id {
                if let (Some(&u), Some(&v)) =
                    (id_to_index.get(parent_id), id_to_index.get(&item.id))
                {
                    graph.add_edge(u, v, ());
                }
            }
        }

        Self { graph, id_to_index }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// Every item reachable below `root_id`, excluding the root itself. The
    /// walk keeps a visited set, so malformed cyclic parent chains terminate.
    pub fn descendants(&self, root_id: &str) -> Vec<String> {
        let Some(&root) = self.id_to_index.get(root_id) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.graph, root);
        let mut found = Vec::new();
        while let Some(node_ix) = dfs.next(&self.graph) {
            if node_ix != root {
                found.push(self.graph[node_ix].clone());
            }
        }
        found
    }

    pub fn descendant_set(&self, root_id: &str) -> HashSet<String> {
        self.descendants(root_id).into_iter().collect()
    }

    pub fn children(&self, id: &str) -> Vec<&str> {
        let Some(&node_ix) = self.id_to_index.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(node_ix, Direction::Outgoing)
            .map(|child| self.graph[child].as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::WorkItemKind;

    fn item(id: &str, parent: Option<&str>) -> WorkItem {
        let item = WorkItem::new(id, WorkItemKind::Issue, id);
        match parent {
            Some(parent) => item.with_parent(parent),
            None => item,
        }
    }

    #[test]
    fn descendants_walk_nested_levels() {
        let items = vec![
            item("root", None),
            item("a", Some("root")),
            item("b", Some("a")),
            item("c", Some("b")),
            item("other", None),
        ];
        let graph = HierarchyGraph::build(&items);
        let mut found = graph.descendants("root");
        found.sort();
        assert_eq!(found, vec!["a", "b", "c"]);
        assert!(graph.descendants("missing").is_empty());
    }

    #[test]
    fn descendants_terminate_on_cycles() {
        let items = vec![
            item("root", Some("c")),
            item("a", Some("root")),
            item("c", Some("a")),
        ];
        let graph = HierarchyGraph::build(&items);
        let mut found = graph.descendants("root");
        found.sort();
        assert_eq!(found, vec!["a", "c"]);
    }

    #[test]
    fn children_lists_direct_children_only() {
        let items = vec![item("root", None), item("a", Some("root")), item("b", Some("a"))];
        let graph = HierarchyGraph::build(&items);
        assert_eq!(graph.children("root"), vec!["a"]);
    }
}
