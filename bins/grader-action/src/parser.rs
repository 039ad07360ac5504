//! Hierarchy Parser - Nested Test Report Lines to a Tree
//!
//! Recognizes lines of the form `Suite > Case > check PASSED` (or `FAILED`)
//! anywhere in a command's stdout. Everything else is ordinary program output
//! and is skipped.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

lazy_static! {
    static ref RESULT_LINE: Regex = Regex::new(r"^(.+?)\s+(PASSED|FAILED)$").unwrap();
    static ref PATH_SEPARATOR: Regex = Regex::new(r"\s+>\s+").unwrap();
}

/// One level of parsed test results, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TestNode {
    children: BTreeMap<String, TestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TestEntry {
    Leaf(bool),
    Branch(TestNode),
}

impl TestNode {
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TestEntry> {
        self.children.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &TestEntry)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Store `passed` at `path`, creating branches on the way
    ///
    /// A leaf sitting where a branch is needed gets replaced by a branch, and
    /// the final segment always takes the new value.
    pub fn insert(&mut self, path: &[&str], passed: bool) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut node = self;
        for name in parents {
            let entry = node
                .children
                .entry(name.to_string())
                .or_insert_with(|| TestEntry::Branch(TestNode::default()));
            if let TestEntry::Leaf(_) = entry {
                *entry = TestEntry::Branch(TestNode::default());
            }
            node = match entry {
                TestEntry::Branch(child) => child,
                TestEntry::Leaf(_) => unreachable!("leaf replaced by branch above"),
            };
        }

        node.children.insert(last.to_string(), TestEntry::Leaf(passed));
    }
}

/// Build the result tree from raw command output
pub fn parse(text: &str) -> TestNode {
    let mut root = TestNode::default();

    for line in text.lines() {
        let Some(caps) = RESULT_LINE.captures(line.trim()) else {
            continue;
        };
        let path: Vec<&str> = PATH_SEPARATOR.split(&caps[1]).collect();
        root.insert(&path, &caps[2] == "PASSED");
    }

    root
}
