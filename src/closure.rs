//! Reachability closure over an extracted archive.
//!
//! The engine owns the reachable set and the worklist. Each round drains the
//! worklist, reads and decodes that batch of class files in parallel, then
//! merges the discovered references one at a time. Only the merge mutates the
//! sets, so a name is queued at most once per traversal.
//!
//! Class files are decoded only once they are reached; nothing else in the
//! extraction root is read.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::names::{class_file_path, expand_nested, is_safe_binary_name, normalize_entry_class};
use crate::pool::decode_class_refs;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedClass {
    pub class_name: String,
    pub reason: String,
}

/// Result of a traversal: the closure plus what was pruned or could not be
/// decoded along the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReachableSet {
    pub classes: BTreeSet<String>,
    pub pruned: BTreeSet<String>,
    pub failed: Vec<FailedClass>,
    pub decoded: usize,
}

impl ReachableSet {
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }
}

enum Visit {
    Missing,
    Decoded(Vec<String>),
    Failed(String),
}

#[derive(Debug)]
pub struct ReachabilityEngine {
    root: PathBuf,
    reachable: HashSet<String>,
    pruned: HashSet<String>,
    worklist: Vec<String>,
    failed: Vec<FailedClass>,
    decoded: usize,
}

impl ReachabilityEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reachable: HashSet::new(),
            pruned: HashSet::new(),
            worklist: Vec::new(),
            failed: Vec::new(),
            decoded: 0,
        }
    }

    /// Seeds the traversal with dot-delimited entry class names. Duplicates
    /// collapse into a single entry.
    pub fn seed<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in entries {
            let name = normalize_entry_class(raw.as_ref());
            if !self.enqueue(name.clone()) {
                debug!("Duplicate entry class [{name}] ignored");
            }
        }
    }

    pub fn run(mut self) -> ReachableSet {
        let mut round = 0usize;
        while !self.worklist.is_empty() {
            round += 1;
            let batch = std::mem::take(&mut self.worklist);
            debug!("Round {round}: visiting {} classes", batch.len());

            let root = self.root.as_path();
            let visits: Vec<(String, Visit)> = batch
                .into_par_iter()
                .map(|name| {
                    let visit = visit(root, &name);
                    (name, visit)
                })
                .collect();

            for (name, visit) in visits {
                self.merge(name, visit);
            }
        }

        info!(
            "Resolved {} reachable classes ({} decoded, {} pruned, {} failed)",
            self.reachable.len(),
            self.decoded,
            self.pruned.len(),
            self.failed.len()
        );

        ReachableSet {
            classes: self.reachable.into_iter().collect(),
            pruned: self.pruned.into_iter().collect(),
            failed: self.failed,
            decoded: self.decoded,
        }
    }

    fn merge(&mut self, name: String, visit: Visit) {
        match visit {
            Visit::Missing => {
                debug!("Searching under [{name}]: not in archive, pruned");
                self.reachable.remove(&name);
                self.pruned.insert(name);
            }
            Visit::Failed(reason) => {
                warn!("Failed to decode [{name}]: {reason}");
                self.decoded += 1;
                self.failed.push(FailedClass {
                    class_name: name,
                    reason,
                });
            }
            Visit::Decoded(refs) => {
                debug!("Searching under [{name}]: {} class references", refs.len());
                self.decoded += 1;
                for reference in refs {
                    for candidate in expand_nested(&reference) {
                        if self.enqueue(candidate.clone()) {
                            debug!("Found [{candidate}] under [{name}]");
                        }
                    }
                }
            }
        }
    }

    /// Queues `name` unless it was already seen. Returns whether it was new.
    fn enqueue(&mut self, name: String) -> bool {
        if self.reachable.contains(&name) || self.pruned.contains(&name) {
            return false;
        }
        self.reachable.insert(name.clone());
        self.worklist.push(name);
        true
    }
}

fn visit(root: &Path, name: &str) -> Visit {
    if !is_safe_binary_name(name) {
        return Visit::Missing;
    }
    let path = class_file_path(root, name);
    if !path.is_file() {
        return Visit::Missing;
    }
    match std::fs::read(&path) {
        Ok(bytes) => match decode_class_refs(&bytes) {
            Ok(refs) => Visit::Decoded(refs),
            Err(e) => Visit::Failed(e.to_string()),
        },
        Err(e) => Visit::Failed(format!("read failed: {e}")),
    }
}

/// Computes the closure of `entries` over the class files under `root`.
pub fn resolve<I, S>(entries: I, root: &Path) -> ReachableSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut engine = ReachabilityEngine::new(root);
    engine.seed(entries);
    engine.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "jar_shrinker_closure_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn class_bytes(refs: &[&str]) -> Vec<u8> {
        let mut pool = Vec::new();
        let mut index = 1u16;
        for name in refs {
            pool.push(1);
            pool.extend_from_slice(&(name.len() as u16).to_be_bytes());
            pool.extend_from_slice(name.as_bytes());
            pool.push(7);
            pool.extend_from_slice(&index.to_be_bytes());
            index += 2;
        }
        let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
        out.extend_from_slice(&index.to_be_bytes());
        out.extend_from_slice(&pool);
        out
    }

    fn write_class(root: &Path, name: &str, bytes: &[u8]) {
        let path = class_file_path(root, name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    fn names(set: &ReachableSet) -> Vec<&str> {
        set.iter().collect()
    }

    #[test]
    fn resolves_scenario_with_nested_class() {
        let root = temp_dir("scenario");
        write_class(
            &root,
            "com/example/Main",
            &class_bytes(&[
                "com/example/Main",
                "java/lang/Object",
                "com/example/Util",
                "com/example/Outer$Inner",
            ]),
        );
        write_class(&root, "com/example/Util", &class_bytes(&["com/example/Util"]));
        write_class(&root, "com/example/Outer$Inner", &class_bytes(&[]));
        write_class(&root, "com/example/Outer", &class_bytes(&[]));
        write_class(&root, "com/example/Unused", &class_bytes(&[]));

        let set = resolve(["com.example.Main"], &root);
        assert_eq!(
            names(&set),
            vec![
                "com/example/Main",
                "com/example/Outer",
                "com/example/Outer$Inner",
                "com/example/Util",
            ]
        );
        assert!(set.pruned.contains("java/lang/Object"));
        assert_eq!(set.decoded, 4);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn cyclic_references_terminate() {
        let root = temp_dir("cycle");
        write_class(&root, "A", &class_bytes(&["A", "B"]));
        write_class(&root, "B", &class_bytes(&["B", "A"]));

        let set = resolve(["A"], &root);
        assert_eq!(names(&set), vec!["A", "B"]);
        assert_eq!(set.decoded, 2);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn missing_entry_and_references_are_pruned() {
        let root = temp_dir("prune");
        write_class(&root, "p/Main", &class_bytes(&["p/Gone", "p/Gone$Inner"]));

        let set = resolve(["p.Main", "p.Absent"], &root);
        assert_eq!(names(&set), vec!["p/Main"]);
        assert!(set.pruned.contains("p/Absent"));
        assert!(set.pruned.contains("p/Gone"));
        assert!(set.pruned.contains("p/Gone$Inner"));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn undecodable_class_is_kept_but_not_followed() {
        let root = temp_dir("broken");
        write_class(&root, "p/Main", &class_bytes(&["p/Broken"]));
        write_class(&root, "p/Broken", &[0xCA, 0xFE]);
        write_class(&root, "p/Hidden", &class_bytes(&[]));

        let set = resolve(["p.Main"], &root);
        assert_eq!(names(&set), vec!["p/Broken", "p/Main"]);
        assert_eq!(set.failed.len(), 1);
        assert_eq!(set.failed[0].class_name, "p/Broken");
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn traversal_outside_root_is_pruned() {
        let root = temp_dir("escape");
        write_class(&root, "p/Main", &class_bytes(&["../p/Main"]));

        let set = resolve(["p.Main"], &root);
        assert_eq!(names(&set), vec!["p/Main"]);
        assert!(set.pruned.contains("../p/Main"));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn repeated_runs_are_identical_and_dedupe_entries() {
        let root = temp_dir("repeat");
        write_class(&root, "a/A", &class_bytes(&["a/B$C"]));
        write_class(&root, "a/B$C", &class_bytes(&["a/A"]));
        write_class(&root, "a/B", &class_bytes(&[]));

        let first = resolve(["a.A", "a.A"], &root);
        let second = resolve(["a.A"], &root);
        assert_eq!(first.classes, second.classes);
        assert_eq!(names(&first), vec!["a/A", "a/B", "a/B$C"]);
        let _ = std::fs::remove_dir_all(root);
    }
}
