// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boolean trees built by the walker.
//!
//! A tree starts out with [`UnionTree::Region`] placeholders where region
//! tops were found. Once non-union operators have been pushed below the
//! region tops, every subtree hanging off the top-level unions can be
//! evaluated on its own, and the placeholders are replaced by the leaves
//! the caller's handler produced.

use std::fmt;

use crate::state::CombinedTreeState;

/// Binary boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeOp {
    Union,
    Subtract,
    Intersect,
    Xor,
}

impl TreeOp {
    fn symbol(self) -> char {
        match self {
            TreeOp::Union => 'u',
            TreeOp::Subtract => '-',
            TreeOp::Intersect => '+',
            TreeOp::Xor => '^',
        }
    }
}

impl From<crate::db::BoolOp> for TreeOp {
    fn from(op: crate::db::BoolOp) -> Self {
        match op {
            crate::db::BoolOp::Union => TreeOp::Union,
            crate::db::BoolOp::Subtract => TreeOp::Subtract,
            crate::db::BoolOp::Intersect => TreeOp::Intersect,
        }
    }
}

/// A node of a boolean tree with leaves of type `L`.
///
/// Cloning deep-copies the subtree, region states included.
#[derive(Debug, Clone, PartialEq)]
pub enum UnionTree<L> {
    /// Contributes nothing.
    Nop,
    /// A solid as produced by the leaf handler.
    Leaf(L),
    /// A region not yet walked down to its leaves.
    Region(Box<CombinedTreeState>),
    Binary {
        op: TreeOp,
        left: Box<UnionTree<L>>,
        right: Box<UnionTree<L>>,
    },
    Not(Box<UnionTree<L>>),
}

impl<L> Default for UnionTree<L> {
    fn default() -> Self {
        UnionTree::Nop
    }
}

impl<L> UnionTree<L> {
    pub fn binary(op: TreeOp, left: UnionTree<L>, right: UnionTree<L>) -> Self {
        UnionTree::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, UnionTree::Binary { op: TreeOp::Union, .. })
    }

    pub fn is_nop(&self) -> bool {
        matches!(self, UnionTree::Nop)
    }

    /// Number of nodes in the tree, this one included.
    pub fn count_tree_nodes(&self) -> usize {
        match self {
            UnionTree::Nop | UnionTree::Leaf(_) | UnionTree::Region(_) => 1,
            UnionTree::Binary { left, right, .. } => {
                1 + left.count_tree_nodes() + right.count_tree_nodes()
            }
            UnionTree::Not(sub) => 1 + sub.count_tree_nodes(),
        }
    }

    /// Number of independent subtrees hanging off the top-level unions.
    pub fn count_subtree_regions(&self) -> usize {
        match self {
            UnionTree::Binary {
                op: TreeOp::Union,
                left,
                right,
            } => left.count_subtree_regions() + right.count_subtree_regions(),
            _ => 1,
        }
    }

    /// Breaks the tree apart at its top-level unions.
    ///
    /// Empty subtrees are dropped; the union nodes themselves are consumed.
    pub fn tally_subtree_regions(self) -> Vec<UnionTree<L>> {
        let mut out = Vec::with_capacity(self.count_subtree_regions());
        self.tally_into(&mut out);
        out
    }

    fn tally_into(self, out: &mut Vec<UnionTree<L>>) {
        match self {
            UnionTree::Nop => {}
            UnionTree::Binary {
                op: TreeOp::Union,
                left,
                right,
            } => {
                left.tally_into(out);
                right.tally_into(out);
            }
            other => out.push(other),
        }
    }
}

impl<L: Clone> UnionTree<L> {
    /// Deep copy of the subtree.
    pub fn dup_subtree(&self) -> Self {
        self.clone()
    }

    /// Rewrites the tree so that only unions remain above the region tops.
    ///
    /// `(A u B) - C` becomes `(A - C) u (B - C)`, and the same for
    /// intersection, until no subtraction or intersection has a union as
    /// its left operand.
    pub fn non_union_push(&mut self) {
        loop {
            match self {
                UnionTree::Nop | UnionTree::Leaf(_) | UnionTree::Region(_) => return,
                UnionTree::Binary {
                    op: TreeOp::Union,
                    left,
                    right,
                } => {
                    left.non_union_push();
                    right.non_union_push();
                    return;
                }
                UnionTree::Binary {
                    op: op @ (TreeOp::Subtract | TreeOp::Intersect),
                    left,
                    right,
                } => {
                    if !left.is_union() {
                        left.non_union_push();
                        if !left.is_union() {
                            return;
                        }
                    }
                    let op = *op;
                    let UnionTree::Binary {
                        left: a, right: b, ..
                    } = std::mem::take(&mut **left)
                    else {
                        return;
                    };
                    let c = std::mem::take(&mut **right);
                    *self = UnionTree::binary(
                        TreeOp::Union,
                        UnionTree::Binary {
                            op,
                            left: a,
                            right: Box::new(c.clone()),
                        },
                        UnionTree::Binary {
                            op,
                            left: b,
                            right: Box::new(c),
                        },
                    );
                }
                UnionTree::Binary { op, .. } => {
                    tracing::error!(?op, "operator cannot be pushed below a union");
                    return;
                }
                UnionTree::Not(_) => {
                    tracing::error!("negation cannot be pushed below a union");
                    return;
                }
            }
        }
    }
}

/// Joins subtrees left to right with their operators.
///
/// The first operator is treated as a union whatever it says.
pub fn mkbool_tree<L>(items: Vec<(TreeOp, UnionTree<L>)>) -> Option<UnionTree<L>> {
    let mut iter = items.into_iter();
    let (first_op, mut tree) = iter.next()?;
    if first_op != TreeOp::Union {
        tracing::debug!(?first_op, "non-union first operation ignored");
    }
    for (op, next) in iter {
        tree = UnionTree::binary(op, tree, next);
    }
    Some(tree)
}

/// Builds the tree of a member list the way GIFT reads it.
///
/// Terms between unions are evaluated first, so `A - B u C - D` means
/// `(A - B) u (C - D)`. With `pure_boolean` the list is read strictly left
/// to right instead.
pub fn mkgift_tree<L>(items: Vec<(TreeOp, UnionTree<L>)>, pure_boolean: bool) -> Option<UnionTree<L>> {
    if pure_boolean {
        return mkbool_tree(items);
    }
    let mut terms = Vec::new();
    let mut current = Vec::new();
    for (op, tree) in items {
        if op == TreeOp::Union && !current.is_empty() {
            if let Some(term) = mkbool_tree(std::mem::take(&mut current)) {
                terms.push((TreeOp::Union, term));
            }
        }
        current.push((op, tree));
    }
    if let Some(term) = mkbool_tree(current) {
        terms.push((TreeOp::Union, term));
    }
    mkbool_tree(terms)
}

impl<L: fmt::Display> fmt::Display for UnionTree<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnionTree::Nop => f.write_str("nop"),
            UnionTree::Leaf(leaf) => write!(f, "{}", leaf),
            UnionTree::Region(cts) => write!(f, "region({})", cts.path),
            UnionTree::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            UnionTree::Not(sub) => write!(f, "!{}", sub),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> UnionTree<String> {
        UnionTree::Leaf(name.to_string())
    }

    fn list(spec: &[(TreeOp, &str)]) -> Vec<(TreeOp, UnionTree<String>)> {
        spec.iter().map(|&(op, n)| (op, leaf(n))).collect()
    }

    use TreeOp::{Intersect as I, Subtract as S, Union as U};

    #[test]
    fn mkbool_reads_left_to_right() {
        let tree = mkbool_tree(list(&[(S, "a"), (U, "b"), (S, "c")])).unwrap();
        assert_eq!(tree.to_string(), "((a u b) - c)");
        assert!(mkbool_tree::<String>(Vec::new()).is_none());
    }

    #[test]
    fn mkgift_groups_terms_between_unions() {
        let items = list(&[(U, "a"), (S, "b"), (S, "c"), (U, "d"), (S, "e"), (I, "f")]);
        let tree = mkgift_tree(items.clone(), false).unwrap();
        assert_eq!(tree.to_string(), "(((a - b) - c) u ((d - e) + f))");

        let pure = mkgift_tree(items, true).unwrap();
        assert_eq!(pure.to_string(), "(((((a - b) - c) u d) - e) + f)");
    }

    #[test]
    fn single_item_is_returned_as_is() {
        assert_eq!(mkgift_tree(list(&[(U, "a")]), false).unwrap(), leaf("a"));
    }

    #[test]
    fn subtraction_is_pushed_below_union() {
        let mut tree = UnionTree::binary(
            S,
            UnionTree::binary(U, leaf("a"), leaf("b")),
            leaf("c"),
        );
        tree.non_union_push();
        assert_eq!(tree.to_string(), "((a - c) u (b - c))");
        assert_eq!(tree.count_subtree_regions(), 2);
    }

    #[test]
    fn nested_pushes_reach_every_region() {
        // ((a u b) u c) + d
        let mut tree = UnionTree::binary(
            I,
            UnionTree::binary(U, UnionTree::binary(U, leaf("a"), leaf("b")), leaf("c")),
            leaf("d"),
        );
        tree.non_union_push();
        assert_eq!(tree.to_string(), "(((a + d) u (b + d)) u (c + d))");
        let regions = tree.tally_subtree_regions();
        let names: Vec<String> = regions.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["(a + d)", "(b + d)", "(c + d)"]);
    }

    #[test]
    fn left_operand_is_rewritten_first() {
        // ((a u b) - c) - d
        let mut tree = UnionTree::binary(
            S,
            UnionTree::binary(S, UnionTree::binary(U, leaf("a"), leaf("b")), leaf("c")),
            leaf("d"),
        );
        tree.non_union_push();
        assert_eq!(tree.to_string(), "(((a - c) - d) u ((b - c) - d))");
    }

    #[test]
    fn counting_and_tally() {
        let tree = UnionTree::binary(
            U,
            UnionTree::binary(S, leaf("a"), leaf("b")),
            UnionTree::binary(U, UnionTree::Nop, leaf("c")),
        );
        assert_eq!(tree.count_tree_nodes(), 7);
        assert_eq!(tree.count_subtree_regions(), 3);
        let copy = tree.dup_subtree();
        assert_eq!(copy, tree);
        let parts = tree.tally_subtree_regions();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], leaf("c"));
    }
}
