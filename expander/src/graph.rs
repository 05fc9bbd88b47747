use std::collections::HashMap;

use weave::ChunkMap;

use crate::error::{DiagnosticError, ExpandError};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path.
    Active,
    Done,
}

/// Check the reference graph before expanding: every reference must name a
/// chunk in the map and no chunk may reach itself.
///
/// Undefined references are reported before cycles, in store order.
pub fn validate(chunks: &ChunkMap) -> Result<(), DiagnosticError> {
    for chunk in chunks {
        if let Some(missing) = chunk.references().find(|r| !chunks.contains(r.name)) {
            return Err(DiagnosticError::at(
                ExpandError::UndefinedChunk {
                    chunk: chunk.name.clone(),
                    name: missing.name.to_string(),
                },
                &chunk.origin,
            ));
        }
    }

    if let Some(cycle) = find_cycle(chunks) {
        let origin = chunks.get(&cycle[0]).map(|c| c.origin.clone());
        let error = ExpandError::CycleDetected { cycle };
        return Err(match origin {
            Some(origin) => DiagnosticError::at(error, &origin),
            None => error.into(),
        });
    }

    Ok(())
}

/// The first reference cycle found, as a closed path (`a -> b -> a`).
///
/// Depth-first over references in document order, with an explicit stack so
/// long reference chains cannot exhaust the call stack.
pub fn find_cycle(chunks: &ChunkMap) -> Option<Vec<String>> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    for root in chunks.names() {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root, Mark::Active);
        // Each frame: a chunk on the current path and its references not yet visited.
        let mut stack: Vec<(&str, Vec<&str>)> = vec![(root, pending_references(chunks, root))];

        while let Some((_, pending)) = stack.last_mut() {
            let Some(next) = pending.pop() else {
                if let Some((done, _)) = stack.pop() {
                    marks.insert(done, Mark::Done);
                }
                continue;
            };
            match marks.get(next) {
                Some(Mark::Done) => {}
                Some(Mark::Active) => {
                    let start = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                    cycle.push(next.to_string());
                    return Some(cycle);
                }
                None => {
                    marks.insert(next, Mark::Active);
                    stack.push((next, pending_references(chunks, next)));
                }
            }
        }
    }
    None
}

/// Reference targets of `name`, reversed so popping yields document order.
fn pending_references<'a>(chunks: &'a ChunkMap, name: &str) -> Vec<&'a str> {
    let mut targets: Vec<&str> = chunks
        .get(name)
        .map(|chunk| chunk.references().map(|r| r.name).collect())
        .unwrap_or_default();
    targets.reverse();
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave::{RedefinePolicy, extract, merge};

    fn chunks(src: &str) -> ChunkMap {
        merge(extract(src, 0).fragments, RedefinePolicy::Replace).chunks
    }

    #[test]
    fn acyclic_graph_validates() {
        let map = chunks("<<a.py>>=\n<<b>>\n<<c>>\n@\n<<b>>=\n<<c>>\n@\n<<c>>=\nx\n@\n");
        assert!(validate(&map).is_ok());
        assert_eq!(find_cycle(&map), None);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let map = chunks("<<A>>=\n<<A>>\n@\n");
        assert_eq!(find_cycle(&map), Some(vec!["A".to_string(), "A".to_string()]));
    }

    #[test]
    fn indirect_cycle_reports_closed_path() {
        let map = chunks("<<root>>=\n<<a>>\n@\n<<a>>=\n  <<b>>\n@\n<<b>>=\n<<a>>\n@\n");
        let err = validate(&map).unwrap_err();
        assert_eq!(
            err.error,
            ExpandError::CycleDetected {
                cycle: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn shared_target_is_not_a_cycle() {
        let map = chunks("<<a.py>>=\n<<b>>\n<<c>>\n@\n<<b>>=\n<<d>>\n@\n<<c>>=\n<<d>>\n@\n<<d>>=\nx\n@\n");
        assert_eq!(find_cycle(&map), None);
    }

    #[test]
    fn deep_chain_is_walked_without_recursion() {
        let depth = 50_000;
        let mut src = String::new();
        for i in 0..depth {
            src.push_str(&format!("<<c{}>>=\n<<c{}>>\n@\n", i, i + 1));
        }
        src.push_str(&format!("<<c{}>>=\nleaf\n@\n", depth));
        let map = chunks(&src);
        assert!(validate(&map).is_ok());

        src.push_str(&format!("<<c{}>>+\n<<c0>>\n@\n", depth));
        let looped = chunks(&src);
        let cycle = find_cycle(&looped).unwrap();
        assert_eq!(cycle.len(), depth + 2);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn undefined_reference_wins_over_cycle() {
        let map = chunks("<<a>>=\n<<a>>\n@\n<<b>>=\n<<missing>>\n@\n");
        let err = validate(&map).unwrap_err();
        assert_eq!(
            err.error,
            ExpandError::UndefinedChunk {
                chunk: "b".into(),
                name: "missing".into()
            }
        );
    }
}
