//! Tag query parser: turns a raw boolean expression over qualified-tag
//! selectors into the three-level normal form carried by [`TagQuery`].
//! `|` is OR, `:` is AND, parentheses group inner OR-lists. Whitespace
//! around the structural delimiters is insignificant.

use tracing::debug;

use super::TagQuery;
use crate::error::{AppError, AppResult};
use crate::selector::QualifiedTag;

/// Maximum parenthetical nesting depth accepted by the grammar: the outer
/// expression, one group level, and one redundant level of parentheses
/// inside a group (which flattens into the same OR-list). This is a
/// documented grammar limitation, not a parser accident; queries nested
/// deeper are rejected rather than mis-grouped.
pub const MAX_GROUP_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Or,
    And,
    Open,
    Close,
    Sel(String),
}

/// One AND-position inside an alternative: either a bare selector or a
/// parenthesized OR-list.
enum Term {
    Bare(QualifiedTag),
    Group(Vec<QualifiedTag>),
}

fn tokenize(raw: &str) -> AppResult<Vec<Tok>> {
    let mut toks: Vec<Tok> = Vec::new();
    let mut cur = String::new();
    for ch in raw.chars() {
        match ch {
            '|' | ':' | '(' | ')' => {
                if !cur.is_empty() {
                    toks.push(Tok::Sel(std::mem::take(&mut cur)));
                }
                toks.push(match ch {
                    '|' => Tok::Or,
                    ':' => Tok::And,
                    '(' => Tok::Open,
                    _ => Tok::Close,
                });
            }
            c if c.is_whitespace() => {
                if !cur.is_empty() {
                    toks.push(Tok::Sel(std::mem::take(&mut cur)));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        toks.push(Tok::Sel(cur));
    }
    // Two selectors with only whitespace between them have no operator.
    for w in toks.windows(2) {
        if matches!((&w[0], &w[1]), (Tok::Sel(_), Tok::Sel(_))) {
            return Err(AppError::invalid_query(
                "selectors must be joined by ':' or '|'",
            ));
        }
    }
    Ok(toks)
}

/// Split a token run on `op` at parenthesis depth zero, validating balance.
fn split_top(toks: &[Tok], op: &Tok) -> AppResult<Vec<Vec<Tok>>> {
    let mut parts: Vec<Vec<Tok>> = Vec::new();
    let mut cur: Vec<Tok> = Vec::new();
    let mut depth: i32 = 0;
    for t in toks {
        match t {
            Tok::Open => {
                depth += 1;
                cur.push(t.clone());
            }
            Tok::Close => {
                depth -= 1;
                if depth < 0 {
                    return Err(AppError::invalid_query("unbalanced ')' in query"));
                }
                cur.push(t.clone());
            }
            t2 if depth == 0 && t2 == op => parts.push(std::mem::take(&mut cur)),
            _ => cur.push(t.clone()),
        }
    }
    if depth != 0 {
        return Err(AppError::invalid_query("unbalanced '(' in query"));
    }
    parts.push(cur);
    Ok(parts)
}

fn parse_selector(tok: &str) -> AppResult<QualifiedTag> {
    QualifiedTag::parse(tok)
        .map_err(|e| AppError::invalid_query(format!("bad selector in query: {}", e.message())))
}

/// Parse the inside of a parenthesized group: an OR-list of selectors.
/// Redundant inner parentheses flatten into the same list; `:` has no
/// meaning inside a group.
fn parse_group(toks: &[Tok], depth: usize) -> AppResult<Vec<QualifiedTag>> {
    if depth > MAX_GROUP_DEPTH {
        return Err(AppError::invalid_query(format!(
            "group nesting deeper than {} levels",
            MAX_GROUP_DEPTH
        )));
    }
    let mut out: Vec<QualifiedTag> = Vec::new();
    for part in split_top(toks, &Tok::Or)? {
        match part.as_slice() {
            [Tok::Sel(s)] => out.push(parse_selector(s)?),
            [Tok::Open, inner @ .., Tok::Close] => out.extend(parse_group(inner, depth + 1)?),
            [] => return Err(AppError::invalid_query("empty group alternative")),
            other if other.contains(&Tok::And) => {
                return Err(AppError::invalid_query(
                    "':' is not supported inside a parenthesized group",
                ))
            }
            _ => return Err(AppError::invalid_query("malformed group")),
        }
    }
    Ok(out)
}

fn parse_term(toks: &[Tok]) -> AppResult<Term> {
    match toks {
        [Tok::Sel(s)] => Ok(Term::Bare(parse_selector(s)?)),
        // The group sits at level 2: level 1 is the outer expression.
        [Tok::Open, inner @ .., Tok::Close] => Ok(Term::Group(parse_group(inner, 2)?)),
        [] => Err(AppError::invalid_query("empty term in AND group")),
        _ => Err(AppError::invalid_query(
            "expected a selector or a parenthesized group",
        )),
    }
}

/// Parse a raw query string into normal form. The empty string compiles to
/// the empty query; whether that means match-all or match-none is the
/// caller's decision, never the query's.
pub(crate) fn parse_query(raw: &str) -> AppResult<TagQuery> {
    let toks = tokenize(raw)?;
    let mut q = TagQuery::default();
    if toks.is_empty() {
        return Ok(q);
    }
    for alt in split_top(&toks, &Tok::Or)? {
        if alt.is_empty() {
            return Err(AppError::invalid_query("empty alternative in query"));
        }
        let mut parsed: Vec<Term> = Vec::new();
        for term in split_top(&alt, &Tok::And)? {
            parsed.push(parse_term(&term)?);
        }
        if parsed.len() == 1 {
            match parsed.remove(0) {
                Term::Bare(s) => q.or_selectors.push(s),
                // A lone "(a|b)" alternative is just bare alternatives.
                Term::Group(sels) => q.or_selectors.extend(sels),
            }
        } else if parsed.iter().all(|t| matches!(t, Term::Bare(_))) {
            q.and_groups.push(
                parsed
                    .into_iter()
                    .map(|t| match t {
                        Term::Bare(s) => s,
                        Term::Group(_) => unreachable!(),
                    })
                    .collect(),
            );
        } else {
            // AND of OR-subgroups; bare terms become singleton subgroups.
            q.nested_groups.push(
                parsed
                    .into_iter()
                    .map(|t| match t {
                        Term::Bare(s) => vec![s],
                        Term::Group(g) => g,
                    })
                    .collect(),
            );
        }
    }
    debug!(
        "parsed query {:?}: {} bare, {} and-groups, {} nested groups",
        raw,
        q.or_selectors.len(),
        q.and_groups.len(),
        q.nested_groups.len()
    );
    Ok(q)
}
