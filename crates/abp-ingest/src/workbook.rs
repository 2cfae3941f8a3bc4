//! XLSX workbook reading.
//!
//! Parses the OOXML container directly so that cell structure survives:
//! shared strings keep their rich-text runs and `<rPr>` styling, formula
//! cells keep their `<f>` element, and cells referenced by the worksheet's
//! `<hyperlinks>` section are tagged as hyperlink wrappers. Each cell is
//! classified once, here, into a [`RawCell`] variant.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::cell::{RawCell, RichTextRun, RunStyle};

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("failed to open workbook: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a readable workbook: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("malformed workbook XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("workbook has no worksheets")]
    NoWorksheet,
}

/// The first worksheet of an uploaded workbook, with cells indexed by
/// 1-based (row, column).
#[derive(Debug, Default)]
pub struct Worksheet {
    cells: HashMap<(u32, u32), RawCell>,
    max_row: u32,
}

impl Worksheet {
    /// Last populated row number (1-based); 0 for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    /// Cell at 1-based (row, column); absent cells read as [`RawCell::Empty`].
    pub fn cell(&self, row: u32, col: u32) -> RawCell {
        self.cells
            .get(&(row, col))
            .cloned()
            .unwrap_or(RawCell::Empty)
    }
}

/// Open the workbook at `path` and parse its first worksheet.
pub fn read_first_worksheet(path: &Path) -> Result<Worksheet, WorkbookError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    // Some producers omit workbook relationships; fall back to the
    // conventional first sheet part.
    let sheet_path = match first_sheet_path(&mut archive) {
        Ok(path) => path,
        Err(e @ (WorkbookError::NoWorksheet | WorkbookError::Zip(_))) => {
            if archive.by_name("xl/worksheets/sheet1.xml").is_err() {
                return Err(e);
            }
            "xl/worksheets/sheet1.xml".to_string()
        }
        Err(e) => return Err(e),
    };
    let shared_strings = parse_shared_strings(&mut archive)?;

    let mut content = Vec::new();
    archive.by_name(&sheet_path)?.read_to_end(&mut content)?;
    parse_worksheet(&content, &shared_strings)
}

/// String table entry: either plain text or a list of rich-text runs.
enum SharedString {
    Plain(String),
    Rich(Vec<RichTextRun>),
}

fn get_attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    for attr in element.attributes().flatten() {
        if attr.key.local_name().as_ref() == name {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Boolean style element: presence means true unless val="0"/"false".
fn boolean_element(element: &BytesStart<'_>) -> bool {
    match get_attribute(element, b"val") {
        Some(val) => !matches!(val.as_str(), "0" | "false"),
        None => true,
    }
}

/// Parse a cell reference like "C5" into 1-based (row, column).
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;
    for c in reference.chars() {
        if c.is_ascii_uppercase() && !saw_row {
            col = col.saturating_mul(26).saturating_add(c as u32 - 'A' as u32 + 1);
            saw_col = true;
        } else if c.is_ascii_digit() {
            row = row.saturating_mul(10).saturating_add(c as u32 - '0' as u32);
            saw_row = true;
        } else {
            return None;
        }
    }
    (saw_col && saw_row && row > 0).then_some((row, col))
}

/// Read text content until the named end tag, concatenating text and CDATA.
fn read_text_until<R: BufRead>(xml: &mut Reader<R>, end: &[u8]) -> Result<String, WorkbookError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => {
                if let Ok(t) = std::str::from_utf8(e.as_ref()) {
                    text.push_str(t);
                }
            }
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

/// Parse run properties (`<rPr>`) into the styling attributes the sanitizer
/// cares about.
fn parse_run_properties<R: BufRead>(xml: &mut Reader<R>) -> Result<RunStyle, WorkbookError> {
    let mut buf = Vec::new();
    let mut style = RunStyle::default();
    loop {
        let event = xml.read_event_into(&mut buf)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"b" => style.bold = Some(boolean_element(e)),
                    b"i" => style.italic = Some(boolean_element(e)),
                    b"u" => style.underline = Some(boolean_element(e)),
                    b"strike" => style.strike = Some(boolean_element(e)),
                    b"color" => {
                        style.color = get_attribute(e, b"rgb")
                            .or_else(|| get_attribute(e, b"theme"))
                            .or_else(|| get_attribute(e, b"indexed"))
                            .or_else(|| Some(String::new()));
                    }
                    b"sz" => {
                        style.size = get_attribute(e, b"val").and_then(|v| v.parse().ok());
                    }
                    b"rFont" => style.name = get_attribute(e, b"val"),
                    b"family" => style.family = get_attribute(e, b"val"),
                    b"scheme" => style.scheme = get_attribute(e, b"val"),
                    other => {
                        // Skip unknown nested content so we stay aligned.
                        if !is_empty {
                            let owned = other.to_vec();
                            read_text_until(xml, &owned)?;
                        }
                    }
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"rPr" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(style)
}

/// Parse one rich text run (`<r>` element).
fn parse_rich_text_run<R: BufRead>(xml: &mut Reader<R>) -> Result<RichTextRun, WorkbookError> {
    let mut buf = Vec::new();
    let mut run = RichTextRun::default();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"rPr" => run.style = Some(parse_run_properties(xml)?),
                b"t" => run.text = read_text_until(xml, b"t")?,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"rPr" => run.style = Some(RunStyle::default()),
                b"t" => run.text = String::new(),
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(run)
}

/// Parse a string item (`<si>` in the shared string table, or an inline
/// `<is>`): plain `<t>` content, or a list of `<r>` runs.
fn parse_string_item<R: BufRead>(
    xml: &mut Reader<R>,
    end: &[u8],
) -> Result<SharedString, WorkbookError> {
    let mut buf = Vec::new();
    let mut plain: Option<String> = None;
    let mut runs: Vec<RichTextRun> = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => plain = Some(read_text_until(xml, b"t")?),
                b"r" => runs.push(parse_rich_text_run(xml)?),
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"t" {
                    plain = Some(String::new());
                }
            }
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if runs.is_empty() {
        Ok(SharedString::Plain(plain.unwrap_or_default()))
    } else {
        Ok(SharedString::Rich(runs))
    }
}

fn parse_shared_strings<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<SharedString>, WorkbookError> {
    let mut content = Vec::new();
    match archive.by_name("xl/sharedStrings.xml") {
        Ok(mut part) => {
            part.read_to_end(&mut content)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    }

    let mut xml = Reader::from_reader(BufReader::new(content.as_slice()));
    xml.trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                strings.push(parse_string_item(&mut xml, b"si")?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                strings.push(SharedString::Plain(String::new()));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Locate the first worksheet part by walking workbook.xml (first `<sheet>`
/// relationship id) and the workbook relationships file.
fn first_sheet_path<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<String, WorkbookError> {
    let mut workbook_xml = Vec::new();
    archive
        .by_name("xl/workbook.xml")?
        .read_to_end(&mut workbook_xml)?;

    let mut xml = Reader::from_reader(BufReader::new(workbook_xml.as_slice()));
    xml.trim_text(true);
    let mut buf = Vec::new();
    let mut first_rel_id: Option<String> = None;
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                first_rel_id = get_attribute(&e, b"id");
                break;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    let rel_id = first_rel_id.ok_or(WorkbookError::NoWorksheet)?;

    let mut rels_xml = Vec::new();
    archive
        .by_name("xl/_rels/workbook.xml.rels")?
        .read_to_end(&mut rels_xml)?;

    let mut xml = Reader::from_reader(BufReader::new(rels_xml.as_slice()));
    xml.trim_text(true);
    buf.clear();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if get_attribute(&e, b"Id").as_deref() == Some(rel_id.as_str()) {
                    if let Some(target) = get_attribute(&e, b"Target") {
                        let target = target.trim_start_matches('/');
                        return Ok(if target.starts_with("xl/") {
                            target.to_string()
                        } else {
                            format!("xl/{}", target)
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Err(WorkbookError::NoWorksheet)
}

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone)]
enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    Default,
}

fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        b"e" => CellTypeTag::Error,
        b"str" => CellTypeTag::Str,
        b"inlineStr" => CellTypeTag::Inline,
        _ => CellTypeTag::Default,
    }
}

fn classify_cell(
    type_tag: CellTypeTag,
    value: Option<String>,
    inline: Option<SharedString>,
    formula: Option<String>,
    shared_strings: &[SharedString],
) -> RawCell {
    // A formula cell is a formula cell regardless of any cached value.
    if let Some(f) = formula {
        return RawCell::Formula(f);
    }
    match type_tag {
        CellTypeTag::Shared => {
            let index = value.and_then(|v| v.parse::<usize>().ok());
            match index.and_then(|i| shared_strings.get(i)) {
                Some(SharedString::Plain(s)) => RawCell::Text(s.clone()),
                Some(SharedString::Rich(runs)) => RawCell::RichText(runs.clone()),
                None => RawCell::Unsupported,
            }
        }
        CellTypeTag::Inline => match inline {
            Some(SharedString::Plain(s)) => RawCell::Text(s),
            Some(SharedString::Rich(runs)) => RawCell::RichText(runs),
            None => RawCell::Empty,
        },
        CellTypeTag::Str => RawCell::Text(value.unwrap_or_default()),
        CellTypeTag::Bool => match value.as_deref() {
            Some("1") => RawCell::Text("TRUE".to_string()),
            _ => RawCell::Text("FALSE".to_string()),
        },
        CellTypeTag::Error => RawCell::Unsupported,
        CellTypeTag::Default => match value {
            None => RawCell::Empty,
            Some(v) => match v.parse::<f64>() {
                Ok(n) => RawCell::Number(n),
                Err(_) => RawCell::Text(v),
            },
        },
    }
}

fn parse_worksheet(
    content: &[u8],
    shared_strings: &[SharedString],
) -> Result<Worksheet, WorkbookError> {
    let mut xml = Reader::from_reader(BufReader::new(content));
    xml.trim_text(false);

    let mut sheet = Worksheet::default();
    let mut hyperlink_refs: HashSet<(u32, u32)> = HashSet::new();

    let mut buf = Vec::new();
    let mut cell_buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let position = get_attribute(&e, b"r").and_then(|r| parse_cell_ref(&r));
                let type_tag = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"t")
                    .map(|a| parse_cell_type_tag(&a.value))
                    .unwrap_or(CellTypeTag::Default);

                // Child elements of <c>: formula, value, inline string.
                let mut formula: Option<String> = None;
                let mut value: Option<String> = None;
                let mut inline: Option<SharedString> = None;
                loop {
                    cell_buf.clear();
                    match xml.read_event_into(&mut cell_buf)? {
                        Event::Start(inner) => match inner.local_name().as_ref() {
                            b"f" => formula = Some(read_text_until(&mut xml, b"f")?),
                            b"v" => value = Some(read_text_until(&mut xml, b"v")?),
                            b"is" => inline = Some(parse_string_item(&mut xml, b"is")?),
                            _ => {}
                        },
                        Event::Empty(inner) => {
                            // Shared formula reference with no expression text.
                            if inner.local_name().as_ref() == b"f" {
                                formula = Some(String::new());
                            }
                        }
                        Event::End(inner) if inner.local_name().as_ref() == b"c" => break,
                        Event::Eof => break,
                        _ => {}
                    }
                }

                if let Some((row, col)) = position {
                    let cell = classify_cell(type_tag, value, inline, formula, shared_strings);
                    if !matches!(cell, RawCell::Empty) {
                        sheet.max_row = sheet.max_row.max(row);
                        sheet.cells.insert((row, col), cell);
                    }
                }
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"hyperlink" => {
                if let Some(position) = get_attribute(&e, b"ref").and_then(|r| parse_cell_ref(&r))
                {
                    hyperlink_refs.insert(position);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Cells referenced from <hyperlinks> become hyperlink wrappers around
    // their display text. Formula and rich-text classifications win.
    for position in hyperlink_refs {
        if let Some(existing) = sheet.cells.get(&position) {
            let text = match existing {
                RawCell::Text(s) => s.clone(),
                RawCell::Number(n) => n.to_string(),
                _ => continue,
            };
            sheet.cells.insert(position, RawCell::Hyperlink { text });
        }
    }

    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_from_xml(xml: &str, shared: &[SharedString]) -> Worksheet {
        parse_worksheet(xml.as_bytes(), shared).unwrap()
    }

    #[test]
    fn parse_cell_ref_basic() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("C5"), Some((5, 3)));
        assert_eq!(parse_cell_ref("AA10"), Some((10, 27)));
        assert_eq!(parse_cell_ref(""), None);
        assert_eq!(parse_cell_ref("5A"), None);
    }

    #[test]
    fn numeric_and_inline_cells() {
        let xml = r#"<worksheet><sheetData>
            <row r="1">
              <c r="A1"><v>42</v></c>
              <c r="B1" t="inlineStr"><is><t>hello</t></is></c>
              <c r="C1" t="str"><v>calculated</v></c>
            </row>
        </sheetData></worksheet>"#;
        let sheet = sheet_from_xml(xml, &[]);
        assert_eq!(sheet.cell(1, 1), RawCell::Number(42.0));
        assert_eq!(sheet.cell(1, 2), RawCell::Text("hello".to_string()));
        assert_eq!(sheet.cell(1, 3), RawCell::Text("calculated".to_string()));
        assert_eq!(sheet.cell(2, 1), RawCell::Empty);
        assert_eq!(sheet.max_row(), 1);
    }

    #[test]
    fn shared_string_cells_resolve_plain_and_rich() {
        let shared = vec![
            SharedString::Plain("plain".to_string()),
            SharedString::Rich(vec![RichTextRun {
                text: "styled".to_string(),
                style: Some(RunStyle {
                    bold: Some(true),
                    ..Default::default()
                }),
            }]),
        ];
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1" t="s"><v>0</v></c>
            <c r="B1" t="s"><v>1</v></c>
            <c r="C1" t="s"><v>9</v></c>
        </row></sheetData></worksheet>"#;
        let sheet = sheet_from_xml(xml, &shared);
        assert_eq!(sheet.cell(1, 1), RawCell::Text("plain".to_string()));
        assert!(matches!(sheet.cell(1, 2), RawCell::RichText(_)));
        // Out-of-range shared string index is not silently coerced.
        assert_eq!(sheet.cell(1, 3), RawCell::Unsupported);
    }

    #[test]
    fn formula_cell_wins_over_cached_value() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1"><f>SUM(B1:B2)</f><v>10</v></c>
        </row></sheetData></worksheet>"#;
        let sheet = sheet_from_xml(xml, &[]);
        assert_eq!(sheet.cell(1, 1), RawCell::Formula("SUM(B1:B2)".to_string()));
    }

    #[test]
    fn shared_formula_without_expression_still_counts() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1"><f t="shared" si="0"/><v>10</v></c>
        </row></sheetData></worksheet>"#;
        let sheet = sheet_from_xml(xml, &[]);
        assert!(matches!(sheet.cell(1, 1), RawCell::Formula(_)));
    }

    #[test]
    fn boolean_and_error_cells() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1" t="b"><v>1</v></c>
            <c r="B1" t="e"><v>#DIV/0!</v></c>
        </row></sheetData></worksheet>"#;
        let sheet = sheet_from_xml(xml, &[]);
        assert_eq!(sheet.cell(1, 1), RawCell::Text("TRUE".to_string()));
        assert_eq!(sheet.cell(1, 2), RawCell::Unsupported);
    }

    #[test]
    fn hyperlink_section_wraps_cell_text() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1" t="str"><v>Example</v></c>
        </row></sheetData>
        <hyperlinks><hyperlink ref="A1" r:id="rId1"/></hyperlinks>
        </worksheet>"#;
        let sheet = sheet_from_xml(xml, &[]);
        assert_eq!(
            sheet.cell(1, 1),
            RawCell::Hyperlink {
                text: "Example".to_string()
            }
        );
    }

    #[test]
    fn rich_run_styling_attributes_parsed() {
        let shared = r#"<sst>
            <si><r><rPr><b/><sz val="14"/></rPr><t>Bold</t></r><r><t xml:space="preserve"> Normal</t></r></si>
            <si><t>Plain</t></si>
        </sst>"#;
        let mut xml = Reader::from_reader(BufReader::new(shared.as_bytes()));
        xml.trim_text(false);
        let mut buf = Vec::new();
        let mut strings = Vec::new();
        loop {
            match xml.read_event_into(&mut buf).unwrap() {
                Event::Start(e) if e.local_name().as_ref() == b"si" => {
                    strings.push(parse_string_item(&mut xml, b"si").unwrap());
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        assert_eq!(strings.len(), 2);
        match &strings[0] {
            SharedString::Rich(runs) => {
                assert_eq!(runs.len(), 2);
                assert_eq!(runs[0].text, "Bold");
                let style = runs[0].style.as_ref().unwrap();
                assert_eq!(style.bold, Some(true));
                assert_eq!(style.size, Some(14.0));
                assert!(style.is_styled());
                assert_eq!(runs[1].text, " Normal");
                assert!(runs[1].style.is_none());
            }
            SharedString::Plain(_) => panic!("expected rich text"),
        }
        match &strings[1] {
            SharedString::Plain(text) => assert_eq!(text, "Plain"),
            SharedString::Rich(_) => panic!("expected plain text"),
        }
    }
}
