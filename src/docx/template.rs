//! Template filling on top of [`DocxDocument`]: token substitution, model
//! tables repeated per item, signature blocks and rich inline clauses.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use super::package::DocxDocument;
use super::wordml::{
    cell_text, cells_mut, first_run_properties, new_paragraph, new_table, paragraph_text,
    rich_runs, set_cell_text, set_cell_vertical_alignment, set_paragraph_alignment,
    set_paragraph_runs, set_paragraph_text, signature_cell, new_run, RichText, CELL, PARAGRAPH,
    ROW, RUN, TABLE, TEXT,
};
use super::xml::{Element, Node};

lazy_static! {
    static ref BRACED_PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid");
}

/// Literal token → value pairs applied in a single pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    pairs: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            return;
        }
        let value = value.into();
        match self.pairs.iter_mut().find(|(t, _)| *t == token) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((token, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Leftmost-longest matches in `text` as byte ranges with their values.
    pub fn find(&self, text: &str) -> Vec<Edit> {
        let mut edits = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let rest = &text[pos..];
            let best = self
                .pairs
                .iter()
                .filter(|(token, _)| rest.starts_with(token.as_str()))
                .max_by_key(|(token, _)| token.len());

            match best {
                Some((token, value)) => {
                    edits.push((pos..pos + token.len(), value.clone()));
                    pos += token.len();
                }
                None => pos += rest.chars().next().map_or(1, char::len_utf8),
            }
        }
        edits
    }

    /// Inserted values are never rescanned, so a value that happens to
    /// contain another token stays as given. Returns `None` when no token
    /// occurs in `text`.
    pub fn apply(&self, text: &str) -> Option<String> {
        let edits = self.find(text);
        if edits.is_empty() {
            return None;
        }
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for (range, value) in &edits {
            out.push_str(&text[last..range.start]);
            out.push_str(value);
            last = range.end;
        }
        out.push_str(&text[last..]);
        Some(out)
    }
}

/// Byte range of a paragraph's text and what replaces it.
pub type Edit = (Range<usize>, String);

fn text_segments(p: &Element) -> Vec<String> {
    let mut segments = Vec::new();
    p.for_each_named(TEXT, &mut |t| segments.push(t.text()));
    segments
}

fn write_segments(p: &mut Element, segments: Vec<String>) {
    let mut segments = segments.into_iter();
    p.for_each_named_mut(TEXT, &mut |t| {
        if let Some(text) = segments.next() {
            if t.text() != text {
                t.set_text(text);
                t.set_attr("xml:space", "preserve");
            }
        }
    });
}

/// Apply non-overlapping, ordered `edits` over the concatenation of
/// `segments`. A replacement lands in the segment where its range starts;
/// the rest of the range is cut out of the following segments, which keep
/// their own text outside it.
fn splice_segments(segments: &mut [String], edits: &[Edit]) {
    let starts: Vec<usize> = segments
        .iter()
        .scan(0, |offset, s| {
            let start = *offset;
            *offset += s.len();
            Some(start)
        })
        .collect();
    let segment_at = |pos: usize| starts.partition_point(|&start| start <= pos) - 1;

    // Back to front, so text before each range is still at its original offset.
    for (range, value) in edits.iter().rev() {
        if range.is_empty() {
            continue;
        }
        let first = segment_at(range.start);
        let last = segment_at(range.end - 1);
        let tail = segments[last][range.end - starts[last]..].to_string();

        let mut merged = segments[first][..range.start - starts[first]].to_string();
        merged.push_str(value);
        if first == last {
            merged.push_str(&tail);
        } else {
            for middle in &mut segments[first + 1..last] {
                middle.clear();
            }
            segments[last] = tail;
        }
        segments[first] = merged;
    }
}

/// Rewrite the text of one paragraph in place. Runs, hyperlinks, drawings
/// and bookmarks stay where they are; a token split across runs takes the
/// formatting of the run it starts in.
fn rewrite_paragraph(p: &mut Element, find: &dyn Fn(&str) -> Vec<Edit>) -> bool {
    let mut segments = text_segments(p);
    let edits = find(&segments.concat());
    if edits.is_empty() {
        return false;
    }
    splice_segments(&mut segments, &edits);
    write_segments(p, segments);
    true
}

fn rewrite_paragraphs(scope: &mut Element, find: &dyn Fn(&str) -> Vec<Edit>) -> usize {
    let mut count = 0;
    scope.for_each_named_mut(PARAGRAPH, &mut |p| {
        if rewrite_paragraph(p, find) {
            count += 1;
        }
    });
    count
}

/// Replace every run whose text holds `placeholder` by plain runs around
/// the rich runs, all with that run's formatting.
fn expand_rich_runs(container: &mut Element, placeholder: &str, rich: &RichText) {
    let mut i = 0;
    while i < container.children.len() {
        let replacement = match &container.children[i] {
            Node::Element(run) if run.is(RUN) && paragraph_text(run).contains(placeholder) => {
                Some(split_run(run, placeholder, rich))
            }
            _ => None,
        };
        match replacement {
            Some(runs) => {
                let added = runs.len();
                container
                    .children
                    .splice(i..=i, runs.into_iter().map(Node::Element));
                i += added;
            }
            None => {
                if let Node::Element(child) = &mut container.children[i] {
                    expand_rich_runs(child, placeholder, rich);
                }
                i += 1;
            }
        }
    }
}

fn split_run(run: &Element, placeholder: &str, rich: &RichText) -> Vec<Element> {
    let rpr = run.child("w:rPr");
    let text = paragraph_text(run);
    let pieces: Vec<&str> = text.split(placeholder).collect();
    let mut runs = Vec::new();
    for (i, piece) in pieces.iter().enumerate() {
        if !piece.is_empty() {
            runs.push(new_run(piece, rpr, false, None));
        }
        if i + 1 < pieces.len() {
            runs.extend(rich_runs(rich, rpr));
        }
    }
    runs
}

fn is_element(node: &Node, name: &str) -> bool {
    matches!(node, Node::Element(el) if el.is(name))
}

fn paragraph_contains(node: &Node, placeholder: &str) -> bool {
    matches!(node, Node::Element(el) if el.is(PARAGRAPH) && paragraph_text(el).contains(placeholder))
}

/// Top-level index of the first paragraph containing `placeholder`.
fn find_paragraph(body: &Element, placeholder: &str) -> Option<usize> {
    body.children
        .iter()
        .position(|node| paragraph_contains(node, placeholder))
}

/// `(table, paragraph)` indices where a table is immediately followed by
/// the paragraph carrying `placeholder`.
fn table_before(body: &Element, placeholder: &str) -> Option<(usize, usize)> {
    let positions: Vec<usize> = body
        .children
        .iter()
        .enumerate()
        .filter(|(_, node)| matches!(node, Node::Element(_)))
        .map(|(i, _)| i)
        .collect();

    positions.windows(2).find_map(|pair| {
        let (table, paragraph) = (pair[0], pair[1]);
        (is_element(&body.children[table], TABLE)
            && paragraph_contains(&body.children[paragraph], placeholder))
        .then_some((table, paragraph))
    })
}

fn first_table(body: &Element) -> Option<usize> {
    body.children.iter().position(|node| is_element(node, TABLE))
}

fn remove_paragraph(body: &mut Element, placeholder: &str) {
    if let Some(index) = find_paragraph(body, placeholder) {
        body.children.remove(index);
    }
}

impl DocxDocument {
    /// Replace literal tokens in every paragraph of the body, tables
    /// included. Returns the number of paragraphs touched.
    pub fn replace_all(&mut self, substitutions: &Substitutions) -> usize {
        if substitutions.is_empty() {
            return 0;
        }
        let touched = rewrite_paragraphs(self.body_mut(), &|text| substitutions.find(text));
        debug!("Replaced {} token(s) across {} paragraph(s)", substitutions.len(), touched);
        touched
    }

    /// Fill `{{ key }}` placeholders. Keys without a value are left in the
    /// document and returned, sorted.
    pub fn fill_braced(&mut self, values: &HashMap<String, String>) -> Vec<String> {
        let mut missing = BTreeSet::new();
        for text in self.paragraphs() {
            for caps in BRACED_PLACEHOLDER.captures_iter(&text) {
                if !values.contains_key(&caps[1]) {
                    missing.insert(caps[1].to_string());
                }
            }
        }

        let find = |text: &str| -> Vec<Edit> {
            BRACED_PLACEHOLDER
                .captures_iter(text)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let value = values.get(&caps[1])?;
                    Some((whole.range(), value.clone()))
                })
                .collect()
        };
        rewrite_paragraphs(self.body_mut(), &find);

        missing.into_iter().collect()
    }

    /// Repeat the table right before the `placeholder` paragraph once per
    /// item, each copy filled with the item's tokens and followed by an
    /// empty paragraph. The model table and the placeholder go away.
    pub fn repeat_table(&mut self, placeholder: &str, items: &[Substitutions]) -> bool {
        let body = self.body_mut();
        let Some((table_index, paragraph_index)) = table_before(body, placeholder) else {
            warn!("No model table found before '{}'", placeholder);
            return false;
        };

        let model = body.children[table_index].clone();
        body.children[paragraph_index] = Node::Element(new_paragraph());

        let mut copies = Vec::with_capacity(items.len() * 2);
        for item in items {
            let mut copy = model.clone();
            if let Node::Element(table) = &mut copy {
                rewrite_paragraphs(table, &|text| item.find(text));
            }
            copies.push(copy);
            copies.push(Node::Element(new_paragraph()));
        }

        body.children.remove(table_index);
        let at = paragraph_index - 1;
        body.children.splice(at..at, copies);
        true
    }

    /// Expand the model row (the second row) of the table before
    /// `placeholder` into one row per item.
    pub fn expand_rows(&mut self, placeholder: &str, rows: &[Substitutions], size_pt: Option<u32>) -> bool {
        let table = table_before(self.body(), placeholder).map(|(t, _)| t);
        self.expand_rows_at(table, placeholder, rows, size_pt)
    }

    /// Same as [`expand_rows`](Self::expand_rows) but falls back to the
    /// first table of the document when no table precedes the placeholder.
    pub fn expand_rows_or_first(&mut self, placeholder: &str, rows: &[Substitutions], size_pt: Option<u32>) -> bool {
        let body = self.body();
        let table = table_before(body, placeholder)
            .map(|(t, _)| t)
            .or_else(|| first_table(body));
        self.expand_rows_at(table, placeholder, rows, size_pt)
    }

    fn expand_rows_at(
        &mut self,
        table_index: Option<usize>,
        placeholder: &str,
        rows: &[Substitutions],
        size_pt: Option<u32>,
    ) -> bool {
        let body = self.body_mut();
        let Some(table) = table_index.and_then(|i| body.children[i].as_element_mut()) else {
            warn!("No table found for '{}'", placeholder);
            return false;
        };

        let row_positions: Vec<usize> = table
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| is_element(node, ROW))
            .map(|(i, _)| i)
            .collect();
        let Some(&model_position) = row_positions.get(1) else {
            warn!("Table for '{}' has no model row", placeholder);
            return false;
        };

        let Some(model) = table.children[model_position].as_element().cloned() else {
            return false;
        };
        let model_texts: Vec<String> = model
            .elements()
            .filter(|el| el.is(CELL))
            .map(cell_text)
            .collect();

        let mut new_rows = Vec::with_capacity(rows.len());
        for substitutions in rows {
            let mut row = model.clone();
            for (cell, template_text) in cells_mut(&mut row).zip(model_texts.iter()) {
                let text = substitutions
                    .apply(template_text)
                    .unwrap_or_else(|| template_text.clone());
                set_cell_text(cell, &text, size_pt);
            }
            new_rows.push(Node::Element(row));
        }

        table
            .children
            .splice(model_position..=model_position, new_rows);
        remove_paragraph(body, placeholder);
        true
    }

    /// Empty the first top-level paragraph holding `placeholder` and put a
    /// two-column signature table after it.
    pub fn signature_block(&mut self, placeholder: &str, signers: &[Vec<String>]) -> bool {
        let body = self.body_mut();
        let Some(index) = find_paragraph(body, placeholder) else {
            return false;
        };

        if let Some(p) = body.children[index].as_element_mut() {
            set_paragraph_text(p, "");
        }
        if signers.is_empty() {
            return true;
        }

        let rows: Vec<Vec<Vec<Element>>> = signers
            .chunks(2)
            .map(|pair| pair.iter().map(|lines| signature_cell(lines)).collect())
            .collect();
        body.children
            .insert(index + 1, Node::Element(new_table(2, rows)));
        true
    }

    /// Put a centered "X" in each `(row, column)` of the table before
    /// `placeholder`, then clear the placeholder text.
    pub fn mark_cells(&mut self, placeholder: &str, marks: &[(usize, usize)]) -> bool {
        let body = self.body_mut();
        let Some((table_index, paragraph_index)) = table_before(body, placeholder) else {
            return false;
        };

        if let Some(table) = body.children[table_index].as_element_mut() {
            for &(row_index, column_index) in marks {
                let cell = table
                    .elements_mut()
                    .filter(|el| el.is(ROW))
                    .nth(row_index)
                    .and_then(|row| cells_mut(row).nth(column_index));
                let Some(cell) = cell else {
                    warn!("No cell at ({}, {}) for '{}'", row_index, column_index, placeholder);
                    continue;
                };
                set_cell_text(cell, "X", None);
                if let Some(p) = cell.child_mut(PARAGRAPH) {
                    set_paragraph_alignment(p, "center");
                }
                set_cell_vertical_alignment(cell, "center");
            }
        }

        if let Some(p) = body.children[paragraph_index].as_element_mut() {
            set_paragraph_text(p, "");
        }
        true
    }

    /// Replace `placeholder` inline with plain and bold runs carrying the
    /// formatting of the run it sits in. Other runs are left untouched.
    pub fn replace_with_rich(&mut self, placeholder: &str, rich: &RichText) -> usize {
        if placeholder.is_empty() {
            return 0;
        }
        let mut count = 0;
        self.body_mut().for_each_named_mut(PARAGRAPH, &mut |p| {
            let mut segments = text_segments(p);
            let full = segments.concat();
            let edits: Vec<Edit> = full
                .match_indices(placeholder)
                .map(|(at, token)| {
                    // Gather the token into one run, dropping the blanks before it if asked.
                    let start = if rich.trim_before { full[..at].trim_end().len() } else { at };
                    (start..at + token.len(), token.to_string())
                })
                .collect();
            if edits.is_empty() {
                return;
            }
            splice_segments(&mut segments, &edits);
            write_segments(p, segments);
            expand_rich_runs(p, placeholder, rich);
            count += 1;
        });
        count
    }

    /// Replace the whole content of every paragraph holding `placeholder`.
    pub fn replace_paragraph_with(&mut self, placeholder: &str, rich: &RichText) -> usize {
        let mut count = 0;
        self.body_mut().for_each_named_mut(PARAGRAPH, &mut |p| {
            if paragraph_text(p).contains(placeholder) {
                let rpr = first_run_properties(p);
                set_paragraph_runs(p, rich_runs(rich, rpr.as_ref()));
                count += 1;
            }
        });
        count
    }
}
