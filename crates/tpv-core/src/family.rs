//! # Article Families
//!
//! Hierarchical grouping of articles used by the sale screen: a family is
//! either a single article or a composite holding an ordered list of other
//! families.
//!
//! ```text
//!   root ──┬── drinks ──┬── 8400000000017 (article)
//!          │            └── 8400000000024 (article)
//!          └── various ──── 1 (article)
//! ```
//!
//! Nodes live in an arena and refer to each other by [`FamilyId`]. Cycles are
//! refused at attach time, so every walk terminates.

use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_article_code;

/// Handle to a node of a [`FamilyTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FamilyId(usize);

/// A node of the family tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyNode {
    Article {
        code: String,
    },
    Composite {
        reference: String,
        description: String,
        children: Vec<FamilyId>,
    },
}

impl FamilyNode {
    fn key(&self) -> &str {
        match self {
            FamilyNode::Article { code } => code,
            FamilyNode::Composite { reference, .. } => reference,
        }
    }
}

/// Arena of article families.
#[derive(Debug, Clone, Default)]
pub struct FamilyTree {
    nodes: Vec<FamilyNode>,
    articles: HashMap<String, FamilyId>,
    composites: HashMap<String, FamilyId>,
}

impl FamilyTree {
    pub fn new() -> Self {
        FamilyTree::default()
    }

    /// Registers an article leaf. Each code appears once in the arena but may
    /// be attached under several composites.
    pub fn add_article(&mut self, code: &str) -> CoreResult<FamilyId> {
        validate_article_code(code)?;
        if self.articles.contains_key(code) {
            return Err(duplicate("article", code));
        }
        let id = self.push(FamilyNode::Article {
            code: code.to_string(),
        });
        self.articles.insert(code.to_string(), id);
        Ok(id)
    }

    /// Registers an empty composite family.
    pub fn add_composite(&mut self, reference: &str, description: &str) -> CoreResult<FamilyId> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ValidationError::Required {
                field: "reference".to_string(),
            }
            .into());
        }
        if self.composites.contains_key(reference) {
            return Err(duplicate("reference", reference));
        }
        let id = self.push(FamilyNode::Composite {
            reference: reference.to_string(),
            description: description.trim().to_string(),
            children: Vec::new(),
        });
        self.composites.insert(reference.to_string(), id);
        Ok(id)
    }

    /// Appends `child` to the children of `parent`.
    ///
    /// ## Errors
    /// - `NotFound` for a handle that does not belong to this tree
    /// - `Validation` when `parent` is an article, `child` is already a
    ///   direct child, or the attachment would create a cycle
    pub fn attach(&mut self, parent: FamilyId, child: FamilyId) -> CoreResult<()> {
        let parent_key = self.node(parent)?.key().to_string();
        let child_key = self.node(child)?.key().to_string();

        match self.node(parent)? {
            FamilyNode::Article { .. } => {
                return Err(ValidationError::InvalidFormat {
                    field: "parent".to_string(),
                    reason: format!("article '{parent_key}' cannot hold children"),
                }
                .into());
            }
            FamilyNode::Composite { children, .. } if children.contains(&child) => {
                return Err(duplicate(&format!("child of {parent_key}"), &child_key));
            }
            FamilyNode::Composite { .. } => {}
        }

        if parent == child || self.reaches(child, parent) {
            return Err(ValidationError::WouldCreateCycle {
                parent: parent_key,
                child: child_key,
            }
            .into());
        }

        if let Some(FamilyNode::Composite { children, .. }) = self.nodes.get_mut(parent.0) {
            children.push(child);
        }
        Ok(())
    }

    pub fn composite(&self, reference: &str) -> Option<FamilyId> {
        self.composites.get(reference).copied()
    }

    pub fn article(&self, code: &str) -> Option<FamilyId> {
        self.articles.get(code).copied()
    }

    pub fn node(&self, id: FamilyId) -> CoreResult<&FamilyNode> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| CoreError::not_found("Family", id.0.to_string()))
    }

    /// Direct children of a composite, in insertion order.
    pub fn children(&self, reference: &str) -> CoreResult<Vec<&FamilyNode>> {
        let id = self
            .composite(reference)
            .ok_or_else(|| CoreError::not_found("Family", reference))?;
        match self.node(id)? {
            FamilyNode::Composite { children, .. } => {
                children.iter().map(|c| self.node(*c)).collect()
            }
            FamilyNode::Article { .. } => Ok(Vec::new()),
        }
    }

    /// Article codes reachable from a composite, depth-first, first
    /// occurrence wins.
    pub fn articles_under(&self, reference: &str) -> CoreResult<Vec<String>> {
        let root = self
            .composite(reference)
            .ok_or_else(|| CoreError::not_found("Family", reference))?;

        let mut codes = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            match self.node(id)? {
                FamilyNode::Article { code } => {
                    if seen.insert(code.as_str()) {
                        codes.push(code.clone());
                    }
                }
                FamilyNode::Composite { children, .. } => {
                    stack.extend(children.iter().rev().copied());
                }
            }
        }

        Ok(codes)
    }

    fn push(&mut self, node: FamilyNode) -> FamilyId {
        self.nodes.push(node);
        FamilyId(self.nodes.len() - 1)
    }

    /// True when `target` is reachable from `from` by following children.
    fn reaches(&self, from: FamilyId, target: FamilyId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(FamilyNode::Composite { children, .. }) = self.nodes.get(id.0) {
                stack.extend(children.iter().copied());
            }
        }
        false
    }
}

fn duplicate(field: &str, value: &str) -> CoreError {
    ValidationError::Duplicate {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (FamilyTree, FamilyId, FamilyId, FamilyId) {
        let mut tree = FamilyTree::new();
        let root = tree.add_composite("root", "All").unwrap();
        let drinks = tree.add_composite("drinks", "Drinks").unwrap();
        let various = tree.add_composite("various", "Various").unwrap();
        let water = tree.add_article("8400000000017").unwrap();
        let juice = tree.add_article("8400000000024").unwrap();
        let misc = tree.add_article("1").unwrap();

        tree.attach(root, drinks).unwrap();
        tree.attach(root, various).unwrap();
        tree.attach(drinks, water).unwrap();
        tree.attach(drinks, juice).unwrap();
        tree.attach(various, misc).unwrap();
        (tree, root, drinks, various)
    }

    #[test]
    fn test_articles_under_walks_depth_first_in_order() {
        let (tree, ..) = sample();
        assert_eq!(
            tree.articles_under("root").unwrap(),
            vec!["8400000000017", "8400000000024", "1"]
        );
        assert_eq!(tree.articles_under("various").unwrap(), vec!["1"]);
    }

    #[test]
    fn test_shared_articles_are_listed_once() {
        let (mut tree, _, _, various) = sample();
        let water = tree.article("8400000000017").unwrap();
        tree.attach(various, water).unwrap();
        assert_eq!(
            tree.articles_under("root").unwrap(),
            vec!["8400000000017", "8400000000024", "1"]
        );
    }

    #[test]
    fn test_children_lists_direct_members() {
        let (tree, ..) = sample();
        let children = tree.children("root").unwrap();
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], FamilyNode::Composite { reference, .. } if reference == "drinks"));
    }

    #[test]
    fn test_cycles_are_refused() {
        let (mut tree, root, drinks, _) = sample();

        let err = tree.attach(drinks, root).unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation(ValidationError::WouldCreateCycle {
                parent: "drinks".to_string(),
                child: "root".to_string(),
            })
        );

        assert!(tree.attach(root, root).is_err());
        assert_eq!(tree.articles_under("root").unwrap().len(), 3);
    }

    #[test]
    fn test_articles_cannot_hold_children() {
        let (mut tree, _, drinks, _) = sample();
        let water = tree.article("8400000000017").unwrap();
        assert!(tree.attach(water, drinks).is_err());
    }

    #[test]
    fn test_duplicates_are_refused() {
        let (mut tree, root, drinks, _) = sample();
        assert!(tree.attach(root, drinks).is_err());
        assert!(tree.add_article("1").is_err());
        assert!(tree.add_composite("drinks", "again").is_err());
    }

    #[test]
    fn test_unknown_reference_is_not_found() {
        let (tree, ..) = sample();
        assert!(matches!(
            tree.articles_under("nope"),
            Err(CoreError::NotFound { .. })
        ));
    }
}
