//! WordprocessingML building blocks: paragraphs, runs, tables and the
//! ordered property containers (`w:pPr`, `w:rPr`, `w:tcPr`).

use super::xml::{Element, Node};

pub const PARAGRAPH: &str = "w:p";
pub const RUN: &str = "w:r";
pub const TEXT: &str = "w:t";
pub const TABLE: &str = "w:tbl";
pub const ROW: &str = "w:tr";
pub const CELL: &str = "w:tc";

pub const SIGNATURE_LINE: &str = "__________________________________";

const RPR_ORDER: &[&str] = &[
    "w:rStyle", "w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:caps", "w:smallCaps",
    "w:strike", "w:dstrike", "w:outline", "w:shadow", "w:emboss", "w:imprint", "w:noProof",
    "w:snapToGrid", "w:vanish", "w:webHidden", "w:color", "w:spacing", "w:w", "w:kern",
    "w:position", "w:sz", "w:szCs", "w:highlight", "w:u", "w:effect", "w:bdr", "w:shd",
    "w:fitText", "w:vertAlign", "w:rtl", "w:cs", "w:em", "w:lang", "w:eastAsianLayout",
    "w:specVanish", "w:oMath",
];

const PPR_ORDER: &[&str] = &[
    "w:pStyle", "w:keepNext", "w:keepLines", "w:pageBreakBefore", "w:framePr",
    "w:widowControl", "w:numPr", "w:suppressLineNumbers", "w:pBdr", "w:shd", "w:tabs",
    "w:suppressAutoHyphens", "w:kinsoku", "w:wordWrap", "w:overflowPunct", "w:topLinePunct",
    "w:autoSpaceDE", "w:autoSpaceDN", "w:bidi", "w:adjustRightInd", "w:snapToGrid",
    "w:spacing", "w:ind", "w:contextualSpacing", "w:mirrorIndents", "w:suppressOverlap",
    "w:jc", "w:textDirection", "w:textAlignment", "w:textboxTightWrap", "w:outlineLvl",
    "w:divId", "w:cnfStyle", "w:rPr", "w:sectPr", "w:pPrChange",
];

const TCPR_ORDER: &[&str] = &[
    "w:cnfStyle", "w:tcW", "w:gridSpan", "w:hMerge", "w:vMerge", "w:tcBorders", "w:shd",
    "w:noWrap", "w:tcMar", "w:textDirection", "w:tcFitText", "w:vAlign", "w:hideMark",
];

/// One piece of inline text with its emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
}

/// A sequence of plain and bold segments that replaces a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub segments: Vec<Segment>,
    /// Strip whitespace immediately before the placeholder.
    pub trim_before: bool,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment {
            text: text.into(),
            bold: false,
        });
        self
    }

    pub fn bold(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment {
            text: text.into(),
            bold: true,
        });
        self
    }

    pub fn trimming_before(mut self) -> Self {
        self.trim_before = true;
        self
    }

    pub fn push_plain(&mut self, text: impl Into<String>) {
        self.segments.push(Segment {
            text: text.into(),
            bold: false,
        });
    }

    pub fn push_bold(&mut self, text: impl Into<String>) {
        self.segments.push(Segment {
            text: text.into(),
            bold: true,
        });
    }

    pub fn to_plain_string(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Visible text of a paragraph (the `w:t` descendants only).
pub fn paragraph_text(p: &Element) -> String {
    let mut out = String::new();
    p.for_each_named(TEXT, &mut |t| out.push_str(&t.text()));
    out
}

/// Run properties of the first run in the paragraph, used as the base
/// formatting when the paragraph is rebuilt.
pub fn first_run_properties(p: &Element) -> Option<Element> {
    let mut found = None;
    p.for_each_named(RUN, &mut |r| {
        if found.is_none() {
            found = Some(r.child("w:rPr").cloned());
        }
    });
    found.flatten()
}

/// Drop everything but `w:pPr`.
pub fn clear_paragraph(p: &mut Element) {
    p.children
        .retain(|node| matches!(node, Node::Element(el) if el.is("w:pPr")));
}

/// Replace a paragraph's content with a single run carrying `text`,
/// keeping the paragraph properties and the first run's formatting.
pub fn set_paragraph_text(p: &mut Element, text: &str) {
    let rpr = first_run_properties(p);
    clear_paragraph(p);
    if !text.is_empty() {
        p.push(new_run(text, rpr.as_ref(), false, None));
    }
}

/// Replace a paragraph's content with the given runs.
pub fn set_paragraph_runs(p: &mut Element, runs: Vec<Element>) {
    clear_paragraph(p);
    for run in runs {
        p.push(run);
    }
}

pub fn new_paragraph() -> Element {
    Element::new(PARAGRAPH)
}

pub fn paragraph_with_text(text: &str) -> Element {
    let mut p = new_paragraph();
    if !text.is_empty() {
        p.push(new_run(text, None, false, None));
    }
    p
}

/// Build a `w:r`. Line feeds become `w:br` and tabs become `w:tab`, the way
/// Word itself stores them.
pub fn new_run(text: &str, base_rpr: Option<&Element>, bold: bool, size_pt: Option<u32>) -> Element {
    let mut run = Element::new(RUN);

    let mut rpr = base_rpr.cloned().unwrap_or_else(|| Element::new("w:rPr"));
    if bold {
        set_ordered_child(&mut rpr, Element::new("w:b"), RPR_ORDER);
        set_ordered_child(&mut rpr, Element::new("w:bCs"), RPR_ORDER);
    }
    if let Some(size) = size_pt {
        let half_points = (size * 2).to_string();
        set_ordered_child(&mut rpr, Element::new("w:sz").with_attr("w:val", half_points.clone()), RPR_ORDER);
        set_ordered_child(&mut rpr, Element::new("w:szCs").with_attr("w:val", half_points), RPR_ORDER);
    }
    if !rpr.children.is_empty() {
        run.push(rpr);
    }

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run.push(Element::new("w:br"));
        }
        for (j, chunk) in line.split('\t').enumerate() {
            if j > 0 {
                run.push(Element::new("w:tab"));
            }
            if !chunk.is_empty() {
                run.push(text_element(chunk));
            }
        }
    }
    run
}

pub fn text_element(text: &str) -> Element {
    Element::new(TEXT)
        .with_attr("xml:space", "preserve")
        .with_text(text)
}

/// Runs for a rich text sequence on top of an optional base formatting.
pub fn rich_runs(rich: &RichText, base_rpr: Option<&Element>) -> Vec<Element> {
    rich.segments
        .iter()
        .filter(|s| !s.text.is_empty())
        .map(|s| new_run(&s.text, base_rpr, s.bold, None))
        .collect()
}

/// Insert or replace a property child keeping the schema order, which
/// Word enforces when opening the file.
pub fn set_ordered_child(parent: &mut Element, child: Element, order: &[&str]) {
    parent.remove_children(&child.name);
    let rank = |name: &str| order.iter().position(|n| *n == name).unwrap_or(order.len());
    let child_rank = rank(&child.name);
    let position = parent
        .children
        .iter()
        .position(|node| matches!(node, Node::Element(el) if rank(&el.name) > child_rank))
        .unwrap_or(parent.children.len());
    parent.children.insert(position, Node::Element(child));
}

/// Get or create a property container that must be the first child.
pub fn ensure_properties<'a>(parent: &'a mut Element, name: &str) -> &'a mut Element {
    let exists = parent.child(name).is_some();
    if !exists {
        parent.children.insert(0, Node::Element(Element::new(name)));
    }
    // Guaranteed present by the insertion above.
    parent
        .child_mut(name)
        .unwrap_or_else(|| unreachable!("property container was just inserted"))
}

pub fn set_paragraph_alignment(p: &mut Element, value: &str) {
    let ppr = ensure_properties(p, "w:pPr");
    set_ordered_child(ppr, Element::new("w:jc").with_attr("w:val", value), PPR_ORDER);
}

pub fn set_cell_vertical_alignment(tc: &mut Element, value: &str) {
    let tcpr = ensure_properties(tc, "w:tcPr");
    set_ordered_child(tcpr, Element::new("w:vAlign").with_attr("w:val", value), TCPR_ORDER);
}

pub fn rows(table: &Element) -> impl Iterator<Item = &Element> {
    table.elements().filter(|el| el.is(ROW))
}

pub fn cells(row: &Element) -> impl Iterator<Item = &Element> {
    row.elements().filter(|el| el.is(CELL))
}

pub fn cells_mut(row: &mut Element) -> impl Iterator<Item = &mut Element> {
    row.elements_mut().filter(|el| el.is(CELL))
}

/// Text of a cell, paragraphs joined by line feeds.
pub fn cell_text(tc: &Element) -> String {
    tc.elements()
        .filter(|el| el.is(PARAGRAPH))
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace a cell's content with one paragraph holding `text`. The first
/// paragraph's properties and first run's formatting survive.
pub fn set_cell_text(tc: &mut Element, text: &str, size_pt: Option<u32>) {
    let first_paragraph = tc.child(PARAGRAPH).cloned();
    let rpr = first_paragraph.as_ref().and_then(first_run_properties);
    let ppr = first_paragraph.as_ref().and_then(|p| p.child("w:pPr").cloned());

    tc.children
        .retain(|node| matches!(node, Node::Element(el) if el.is("w:tcPr")));

    let mut p = new_paragraph();
    if let Some(ppr) = ppr {
        p.push(ppr);
    }
    if !text.is_empty() {
        p.push(new_run(text, rpr.as_ref(), false, size_pt));
    }
    tc.push(p);
}

fn new_cell(paragraphs: Vec<Element>) -> Element {
    let mut tc = Element::new(CELL).with_child(
        Element::new("w:tcPr").with_child(
            Element::new("w:tcW")
                .with_attr("w:w", "0")
                .with_attr("w:type", "auto"),
        ),
    );
    if paragraphs.is_empty() {
        tc.push(new_paragraph());
    }
    for p in paragraphs {
        tc.push(p);
    }
    tc
}

/// Borderless auto-width table; each cell is a list of paragraphs.
pub fn new_table(columns: usize, rows: Vec<Vec<Vec<Element>>>) -> Element {
    let mut grid = Element::new("w:tblGrid");
    for _ in 0..columns {
        grid.push(Element::new("w:gridCol"));
    }

    let mut table = Element::new(TABLE)
        .with_child(
            Element::new("w:tblPr")
                .with_child(
                    Element::new("w:tblW")
                        .with_attr("w:w", "0")
                        .with_attr("w:type", "auto"),
                )
                .with_child(Element::new("w:tblLayout").with_attr("w:type", "autofit")),
        )
        .with_child(grid);

    for row in rows {
        let mut tr = Element::new(ROW);
        for index in 0..columns {
            let paragraphs = row.get(index).cloned().unwrap_or_default();
            tr.push(new_cell(paragraphs));
        }
        table.push(tr);
    }
    table
}

/// A signature cell: the line followed by one paragraph per label.
pub fn signature_cell(lines: &[String]) -> Vec<Element> {
    let mut paragraphs = vec![paragraph_with_text(SIGNATURE_LINE)];
    paragraphs.extend(lines.iter().map(|line| paragraph_with_text(line)));
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with_text(text: &str) -> Element {
        Element::new(RUN).with_child(text_element(text))
    }

    #[test]
    fn paragraph_text_concatenates_runs() {
        let p = Element::new(PARAGRAPH)
            .with_child(run_with_text("{nome"))
            .with_child(run_with_text("_prop}"));
        assert_eq!(paragraph_text(&p), "{nome_prop}");
    }

    #[test]
    fn new_run_maps_line_feeds_and_tabs() {
        let run = new_run("a\nb\tc", None, false, None);
        let names: Vec<&str> = run.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["w:t", "w:br", "w:t", "w:tab", "w:t"]);
    }

    #[test]
    fn bold_is_inserted_after_fonts_and_before_size() {
        let base = Element::new("w:rPr")
            .with_child(Element::new("w:rFonts").with_attr("w:ascii", "Nunito"))
            .with_child(Element::new("w:sz").with_attr("w:val", "22"));
        let run = new_run("x", Some(&base), true, None);
        let rpr = run.child("w:rPr").unwrap();
        let names: Vec<&str> = rpr.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["w:rFonts", "w:b", "w:bCs", "w:sz"]);
    }

    #[test]
    fn set_paragraph_text_keeps_first_run_formatting() {
        let mut p = Element::new(PARAGRAPH)
            .with_child(Element::new("w:pPr").with_child(Element::new("w:jc").with_attr("w:val", "both")))
            .with_child(
                Element::new(RUN)
                    .with_child(Element::new("w:rPr").with_child(Element::new("w:i")))
                    .with_child(text_element("old")),
            )
            .with_child(run_with_text(" text"));

        set_paragraph_text(&mut p, "new");

        assert_eq!(paragraph_text(&p), "new");
        assert!(p.child("w:pPr").is_some());
        let run = p.child(RUN).unwrap();
        assert!(run.child("w:rPr").unwrap().child("w:i").is_some());
        assert_eq!(p.elements().filter(|e| e.is(RUN)).count(), 1);
    }

    #[test]
    fn set_cell_text_applies_font_size() {
        let mut tc = Element::new(CELL)
            .with_child(Element::new("w:tcPr"))
            .with_child(Element::new(PARAGRAPH).with_child(run_with_text("tipo")));
        set_cell_text(&mut tc, "Sinal", Some(9));

        assert_eq!(cell_text(&tc), "Sinal");
        let sz = tc.find("w:sz").unwrap();
        assert_eq!(sz.attr("w:val"), Some("18"));
        assert!(tc.child("w:tcPr").is_some());
    }

    #[test]
    fn new_table_pads_missing_cells_with_empty_paragraphs() {
        let table = new_table(2, vec![vec![signature_cell(&["Nome: Ana".to_string()])]]);
        let row = rows(&table).next().unwrap();
        let all: Vec<&Element> = cells(row).collect();
        assert_eq!(all.len(), 2);
        assert!(cell_text(all[0]).contains("Nome: Ana"));
        assert!(all[1].child(PARAGRAPH).is_some());
    }
}
