//! Comprehension-local placeholder detection
//!
//! `[$x for x in $xs]` binds `x` inside the brackets only, so the `$x` there
//! must render as a bare name while `$xs` still goes through the resolver.
//! The expression is flattened into Python tokens and placeholder markers;
//! every bracket group with a top-level `for` is split into its clauses and
//! each placeholder records the targets visible where it sits:
//!
//! - the element sees the targets of every clause
//! - the iterable of clause `k` sees the targets of clauses before `k`
//! - the target list and `if` filters of clause `k` see targets up to `k`
//!
//! Groups nest, and placeholder call/subscript suffixes inherit the names
//! visible at the placeholder.

use std::collections::{BTreeSet, HashMap};

use super::scanner::{is_ident_start, significant_tokens};
use crate::tokens::{ExprPart, Expression};

type Names = BTreeSet<String>;

enum Item {
    Token(String),
    /// Index of the placeholder in the expression's part list
    Var(usize),
}

impl Item {
    fn is(&self, text: &str) -> bool {
        matches!(self, Item::Token(token) if token == text)
    }

    fn is_open(&self) -> bool {
        self.is("(") || self.is("[") || self.is("{")
    }

    fn is_close(&self) -> bool {
        self.is(")") || self.is("]") || self.is("}")
    }
}

/// Flag every placeholder of `expr` whose head name is bound by an
/// enclosing comprehension
pub fn mark_locals(expr: &mut Expression) {
    mark_with(expr, &Names::new());
}

fn mark_with(expr: &mut Expression, inherited: &Names) {
    let items = flatten(expr);
    let mut scopes: HashMap<usize, Names> = HashMap::new();
    walk(&items, 0, items.len(), inherited, &mut scopes);

    for (index, part) in expr.parts.iter_mut().enumerate() {
        let ExprPart::Var(var) = part else {
            continue;
        };
        let visible = scopes.remove(&index).unwrap_or_else(|| inherited.clone());
        if visible.contains(var.head()) {
            var.comprehension_local = true;
        }
        for chunk in &mut var.chunks {
            mark_with(&mut chunk.suffix, &visible);
        }
    }
}

fn flatten(expr: &Expression) -> Vec<Item> {
    let mut items = Vec::new();
    for (index, part) in expr.parts.iter().enumerate() {
        match part {
            ExprPart::Var(_) => items.push(Item::Var(index)),
            ExprPart::Text(text) => items.extend(significant_tokens(text).into_iter().map(Item::Token)),
        }
    }
    items
}

/// Index of the closer matching the opener at `open`, or `end`
fn matching_close(items: &[Item], open: usize, end: usize) -> usize {
    let mut depth = 0usize;
    for (offset, item) in items[open..end].iter().enumerate() {
        if item.is_open() {
            depth += 1;
        } else if item.is_close() {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return open + offset;
            }
        }
    }
    end
}

/// Indices in `[start, end)` of `keyword` tokens outside nested brackets
fn top_level(items: &[Item], start: usize, end: usize, keyword: &str) -> Vec<usize> {
    let mut depth = 0usize;
    let mut found = Vec::new();
    for (index, item) in items.iter().enumerate().take(end).skip(start) {
        if item.is_open() {
            depth += 1;
        } else if item.is_close() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && item.is(keyword) {
            found.push(index);
        }
    }
    found
}

fn walk(items: &[Item], start: usize, end: usize, visible: &Names, scopes: &mut HashMap<usize, Names>) {
    let mut i = start;
    while i < end {
        match &items[i] {
            Item::Var(index) => {
                scopes.insert(*index, visible.clone());
                i += 1;
            }
            item if item.is_open() => {
                let close = matching_close(items, i, end);
                group(items, i + 1, close, visible, scopes);
                i = close + 1;
            }
            _ => i += 1,
        }
    }
}

struct Clause {
    target: (usize, usize),
    iter: (usize, usize),
    filters: Vec<(usize, usize)>,
    names: Names,
}

fn group(items: &[Item], start: usize, end: usize, visible: &Names, scopes: &mut HashMap<usize, Names>) {
    let fors = top_level(items, start, end, "for");
    let Some(&first_for) = fors.first() else {
        walk(items, start, end, visible, scopes);
        return;
    };

    let mut clauses = Vec::with_capacity(fors.len());
    for (k, &for_pos) in fors.iter().enumerate() {
        let clause_end = fors.get(k + 1).copied().unwrap_or(end);
        let in_pos = top_level(items, for_pos + 1, clause_end, "in")
            .first()
            .copied()
            .unwrap_or(clause_end);
        let rest = (in_pos + 1).min(clause_end);

        let ifs = top_level(items, rest, clause_end, "if");
        let iter_end = ifs.first().copied().unwrap_or(clause_end);
        let filters = ifs
            .iter()
            .enumerate()
            .map(|(j, &if_pos)| (if_pos + 1, ifs.get(j + 1).copied().unwrap_or(clause_end)))
            .collect();

        let names = items[for_pos + 1..in_pos]
            .iter()
            .filter_map(|item| match item {
                Item::Token(token) if token.starts_with(is_ident_start) => Some(token.clone()),
                _ => None,
            })
            .collect();

        clauses.push(Clause {
            target: (for_pos + 1, in_pos),
            iter: (rest, iter_end),
            filters,
            names,
        });
    }

    let mut everything = visible.clone();
    for clause in &clauses {
        everything.extend(clause.names.iter().cloned());
    }
    walk(items, start, first_for, &everything, scopes);

    let mut before = visible.clone();
    for clause in &clauses {
        let mut through = before.clone();
        through.extend(clause.names.iter().cloned());

        walk(items, clause.target.0, clause.target.1, &through, scopes);
        walk(items, clause.iter.0, clause.iter.1, &before, scopes);
        for &(filter_start, filter_end) in &clause.filters {
            walk(items, filter_start, filter_end, &through, scopes);
        }
        before = through;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CompilerSettings;
    use crate::lexical::expression::{ExpressionOptions, Lexer};
    use crate::tokens::Expression;

    fn expression(text: &str) -> Expression {
        Lexer::new(text, &CompilerSettings::default())
            .get_expression(ExpressionOptions::default())
            .unwrap()
    }

    fn locals(expr: &Expression) -> Vec<(String, bool)> {
        expr.vars()
            .map(|var| (var.head().to_string(), var.comprehension_local))
            .collect()
    }

    #[test]
    fn test_element_sees_target_but_iterable_does_not() {
        let expr = expression("[$x for x in $x]");
        assert_eq!(
            locals(&expr),
            vec![("x".to_string(), true), ("x".to_string(), false)]
        );
    }

    #[test]
    fn test_later_clauses_see_earlier_targets() {
        let expr = expression("[$a + $b for a in $outer for b in $a if $b]");
        assert_eq!(
            locals(&expr),
            vec![
                ("a".to_string(), true),
                ("b".to_string(), true),
                ("outer".to_string(), false),
                ("a".to_string(), true),
                ("b".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_nested_comprehension_and_dict_form() {
        let expr = expression("{$k: [$v for v in $k] for k in $keys}");
        assert_eq!(
            locals(&expr),
            vec![
                ("k".to_string(), true),
                ("v".to_string(), true),
                ("k".to_string(), true),
                ("keys".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_suffix_inherits_visible_names() {
        let expr = expression("[$f($x) for x in y]");
        let f = expr.vars().next().unwrap();
        assert!(!f.comprehension_local);
        let inner = f.chunks[0].suffix.vars().next().unwrap();
        assert!(inner.comprehension_local);
    }

    #[test]
    fn test_plain_brackets_bind_nothing() {
        let expr = expression("foo([$x, $y])");
        assert!(expr.vars().all(|var| !var.comprehension_local));
    }
}
