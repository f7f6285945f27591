use crate::template::TemplateItem;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    OnStack,
    Done,
}

/// Indices of `items` ordered so every item comes after its parent.
///
/// Depth-first over `parent_ref` links with an explicit stack. A parent chain
/// that loops back onto the stack is cut at the back-edge with a warning; the
/// affected items still appear once, and replay will record them as failed
/// because their parent never gets an id.
pub fn creation_order(items: &[TemplateItem]) -> Vec<usize> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        index.entry(item.local_id.as_str()).or_insert(idx);
    }

    let mut state = vec![VisitState::Unvisited; items.len()];
    let mut order = Vec::with_capacity(items.len());

    for start in 0..items.len() {
        if state[start] != VisitState::Unvisited {
            continue;
        }
        state[start] = VisitState::OnStack;
        let mut stack = vec![start];

        while let Some(&current) = stack.last() {
            let parent = items[current]
                .parent_ref
                .local_id()
                .and_then(|local| index.get(local).copied());

            match parent {
                Some(parent) if state[parent] == VisitState::Unvisited => {
                    state[parent] = VisitState::OnStack;
                    stack.push(parent);
                    continue;
                }
                Some(parent) if state[parent] == VisitState::OnStack => {
                    warn!(
                        item = %items[current].local_id,
                        parent = %items[parent].local_id,
                        "parent cycle in template; skipping back-edge"
                    );
                }
                _ => {}
            }

            stack.pop();
            state[current] = VisitState::Done;
            order.push(current);
        }
    }
    order
}
