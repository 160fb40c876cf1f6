// SPDX-License-Identifier: AGPL-3.0-or-later
//! Plain text to PDF converter
//!
//! Emits a small PDF 1.4 file: one Helvetica font, WinAnsi encoding,
//! word-wrapped lines laid out top to bottom across as many pages as needed.

use crate::config::PdfConfig;
use crate::format::FormatTag;
use crate::traits::{ensure_readable, Converter, Result};
use std::fmt::Write as _;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;
/// Baseline-to-baseline distance as a multiple of the font size
const LINE_SPACING: f32 = 1.2;
const TAB_WIDTH: usize = 4;

/// Lays out plain text onto PDF pages
pub struct TextToPdfConverter {
    config: PdfConfig,
}

impl TextToPdfConverter {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Characters that fit on one line
    fn line_capacity(&self) -> usize {
        let usable = self.config.page_width - 2.0 * self.config.margin;
        ((usable / (self.config.font_size * AVG_GLYPH_WIDTH)).floor() as usize).max(1)
    }

    fn leading(&self) -> f32 {
        self.config.font_size * LINE_SPACING
    }

    /// Lines that fit on one page
    fn page_capacity(&self) -> usize {
        let usable = self.config.page_height - 2.0 * self.config.margin;
        ((usable / self.leading()).floor() as usize).max(1)
    }

    /// Render `text` into PDF bytes
    pub fn render(&self, text: &str) -> Result<Vec<u8>> {
        self.config.validate()?;

        let capacity = self.line_capacity();
        let lines: Vec<String> = text
            .lines()
            .flat_map(|line| wrap_line(&line.replace('\t', &" ".repeat(TAB_WIDTH)), capacity))
            .collect();

        let mut pages: Vec<&[String]> = lines.chunks(self.page_capacity()).collect();
        if pages.is_empty() {
            pages.push(&[]);
        }

        let streams: Vec<Vec<u8>> = pages.iter().map(|page| self.page_stream(page)).collect();
        Ok(assemble(&self.config, &streams))
    }

    /// Content stream drawing one page of lines
    fn page_stream(&self, lines: &[String]) -> Vec<u8> {
        let top = self.config.page_height - self.config.margin - self.config.font_size;
        let mut stream = Vec::new();
        let mut header = String::new();
        // Writing to a String never fails
        let _ = write!(
            header,
            "BT\n/F1 {} Tf\n{} TL\n{} {} Td\n",
            self.config.font_size,
            self.leading(),
            self.config.margin,
            top
        );
        stream.extend_from_slice(header.as_bytes());
        for line in lines {
            stream.push(b'(');
            stream.extend_from_slice(&encode_text(line));
            stream.extend_from_slice(b") Tj T*\n");
        }
        stream.extend_from_slice(b"ET\n");
        stream
    }
}

impl Default for TextToPdfConverter {
    fn default() -> Self {
        Self::new(&PdfConfig::default())
    }
}

impl Converter for TextToPdfConverter {
    fn name(&self) -> &str {
        "Text to PDF Converter"
    }

    fn supports(&self, from: FormatTag, to: FormatTag) -> bool {
        from == FormatTag::Text && to == FormatTag::Pdf
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        ensure_readable(input)?;
        let bytes = std::fs::read(input)?;
        let pdf = self.render(&String::from_utf8_lossy(&bytes))?;
        std::fs::write(output, pdf)?;
        Ok(())
    }
}

/// Break one source line into lines of at most `capacity` characters,
/// preferring word boundaries.
fn wrap_line(line: &str, capacity: usize) -> Vec<String> {
    let mut wrapped = Vec::new();
    let mut current = String::new();
    let mut width = 0;

    for segment in line.split_word_bounds() {
        let len = segment.chars().count();
        if width + len <= capacity {
            current.push_str(segment);
            width += len;
            continue;
        }

        if width > 0 {
            wrapped.push(current.trim_end().to_string());
            current.clear();
            width = 0;
        }
        if segment.trim().is_empty() {
            continue;
        }

        // A single word longer than the line is hard-split
        let chars: Vec<char> = segment.chars().collect();
        let mut chunks = chars.chunks(capacity).peekable();
        while let Some(chunk) = chunks.next() {
            if chunks.peek().is_some() {
                wrapped.push(chunk.iter().collect());
            } else {
                current = chunk.iter().collect();
                width = chunk.len();
            }
        }
    }

    if width > 0 || wrapped.is_empty() {
        wrapped.push(current.trim_end().to_string());
    }
    wrapped
}

/// WinAnsi bytes for a PDF literal string, escaped
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            ' '..='~' => out.push(c as u8),
            '\u{a0}'..='\u{ff}' => {
                out.extend_from_slice(format!("\\{:03o}", c as u32).as_bytes());
            }
            _ => out.push(b'?'),
        }
    }
    out
}

/// Lay out the object graph and cross-reference table
fn assemble(config: &PdfConfig, streams: &[Vec<u8>]) -> Vec<u8> {
    // 1 catalog, 2 page tree, 3 font, then a (page, contents) pair per page
    let page_id = |i: usize| 4 + 2 * i;
    let kids: Vec<String> = (0..streams.len()).map(|i| format!("{} 0 R", page_id(i))).collect();

    let mut objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            streams.len()
        )
        .into_bytes(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    ];
    for (i, stream) in streams.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                config.page_width,
                config.page_height,
                page_id(i) + 1
            )
            .into_bytes(),
        );
        let mut body = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        body.extend_from_slice(stream);
        body.extend_from_slice(b"endstream");
        objects.push(body);
    }

    let mut pdf = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        pdf.extend_from_slice(object);
        pdf.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(xref, "{offset:010} 00000 n ");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    );
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}
