mod layout;

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Local, Timelike};
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::config::PageGeometry;
use crate::error::Error;
use crate::fonts::{Face, FontEntry, register_font};
use crate::model::{ContentBlock, ReportImage};

use layout::{Alignment, Span, TextLine, build_lines, build_text_block, render_line};

const HEADER_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 11.0;
const CAPTION_SIZE: f32 = 9.0;
const NOTICE_SIZE: f32 = 10.0;
const FOOTER_SIZE: f32 = 8.0;

const LINE_FACTOR: f32 = 1.2;
const ASCENDER_RATIO: f32 = 0.75;
const BOX_PADDING: f32 = 8.0;

const CREATOR: &str = concat!("sow-report ", env!("CARGO_PKG_VERSION"));

/// Metadata written to the document information dictionary.
pub struct DocumentMeta<'a> {
    pub title: &'a str,
    pub created: DateTime<Local>,
}

/// Tracks the content stream being filled and the vertical cursor on it.
struct PageCursor {
    geometry: PageGeometry,
    pages: Vec<Content>,
    current: Content,
    slot_top: f32,
    pending_space: f32,
}

impl PageCursor {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: Content::new(),
            slot_top: geometry.page_height - geometry.margin,
            pending_space: 0.0,
        }
    }

    fn content_top(&self) -> f32 {
        self.geometry.page_height - self.geometry.margin
    }

    fn content_bottom(&self) -> f32 {
        self.geometry.margin
    }

    fn at_top(&self) -> bool {
        (self.slot_top - self.content_top()).abs() < 1.0
    }

    fn new_page(&mut self) {
        self.pages
            .push(std::mem::replace(&mut self.current, Content::new()));
        self.slot_top = self.content_top();
        self.pending_space = 0.0;
    }

    /// Explicit break; a no-op on a page that has nothing on it yet.
    fn page_break(&mut self) {
        if !self.at_top() {
            self.new_page();
        }
    }

    /// Make room for `height` points, collapsing `space_before` with the
    /// previous block's trailing space. Returns the top y of the slot.
    fn reserve(&mut self, height: f32, space_before: f32) -> f32 {
        let mut gap = if self.at_top() {
            0.0
        } else {
            self.pending_space.max(space_before)
        };
        if self.slot_top - gap - height < self.content_bottom() && !self.at_top() {
            self.new_page();
            gap = 0.0;
        }
        self.slot_top -= gap;
        self.pending_space = 0.0;
        let top = self.slot_top;
        self.slot_top -= height;
        top
    }

    fn finish(mut self) -> Vec<Content> {
        self.pages.push(self.current);
        self.pages
    }
}

struct Renderer<'a> {
    fonts: &'a HashMap<Face, FontEntry>,
    cursor: PageCursor,
    text_width: f32,
    margin_left: f32,
}

impl Renderer<'_> {
    fn lines(
        &mut self,
        lines: &[TextLine],
        font_size: f32,
        alignment: Alignment,
        space_before: f32,
        space_after: f32,
    ) {
        let line_h = font_size * LINE_FACTOR;
        for (i, line) in lines.iter().enumerate() {
            let before = if i == 0 { space_before } else { 0.0 };
            let top = self.cursor.reserve(line_h, before);
            let baseline = top - font_size * ASCENDER_RATIO;
            render_line(
                &mut self.cursor.current,
                line,
                alignment,
                self.margin_left,
                self.text_width,
                baseline,
            );
        }
        self.cursor.pending_space = space_after;
    }

    fn text(&mut self, text: &str, face: Face, font_size: f32, space_before: f32, space_after: f32) {
        let lines = build_text_block(text, face, font_size, self.fonts, self.text_width);
        self.lines(&lines, font_size, Alignment::Left, space_before, space_after);
    }

    fn header(&mut self, generated_at: &str, support_line: &str) {
        self.cursor.current.set_fill_gray(0.35);
        let stamp = format!("Generated {generated_at}");
        self.text(&stamp, Face::Regular, HEADER_SIZE, 0.0, 0.0);
        self.text(support_line, Face::Regular, HEADER_SIZE, 0.0, 0.0);
        self.cursor.current.set_fill_gray(0.0);

        let rule_y = self.cursor.reserve(4.0, 2.0) - 2.0;
        self.cursor
            .current
            .set_stroke_gray(0.6)
            .set_line_width(0.5)
            .move_to(self.margin_left, rule_y)
            .line_to(self.margin_left + self.text_width, rule_y)
            .stroke();
        self.cursor.pending_space = 12.0;
    }

    fn contact_line(&mut self, label: &str, value: &str) {
        let label = format!("{label}:");
        let value = format!(" {value}");
        let lines = build_lines(
            &[
                Span::new(Face::Bold, BODY_SIZE, &label),
                Span::new(Face::Regular, BODY_SIZE, &value),
            ],
            self.fonts,
            self.text_width,
        );
        self.lines(&lines, BODY_SIZE, Alignment::Left, 3.0, 3.0);
    }

    fn image(&mut self, img: &ReportImage, pdf_name: &str) {
        let top = self.cursor.reserve(img.display_height, 10.0);
        let x = self.margin_left + (self.text_width - img.display_width).max(0.0) / 2.0;
        let y_bottom = top - img.display_height;
        let content = &mut self.cursor.current;
        content.save_state();
        content.transform([img.display_width, 0.0, 0.0, img.display_height, x, y_bottom]);
        content.x_object(Name(pdf_name.as_bytes()));
        content.restore_state();

        let caption = build_text_block(
            &img.caption,
            Face::Oblique,
            CAPTION_SIZE,
            self.fonts,
            self.text_width,
        );
        self.lines(&caption, CAPTION_SIZE, Alignment::Center, 4.0, 14.0);
    }

    /// Text lines inside a filled, outlined box.
    fn boxed(&mut self, lines: &[(Vec<TextLine>, f32)], fill: [f32; 3], space_after: f32) {
        let inner_h: f32 = lines
            .iter()
            .map(|(l, size)| l.len() as f32 * size * LINE_FACTOR)
            .sum();
        let box_h = inner_h + 2.0 * BOX_PADDING;
        let top = self.cursor.reserve(box_h, 10.0);

        let content = &mut self.cursor.current;
        content.save_state();
        content.set_fill_rgb(fill[0], fill[1], fill[2]);
        content.set_stroke_gray(0.55);
        content.set_line_width(0.75);
        content.rect(self.margin_left, top - box_h, self.text_width, box_h);
        content.fill_nonzero_and_stroke();
        content.restore_state();

        let inner_x = self.margin_left + BOX_PADDING;
        let inner_w = self.text_width - 2.0 * BOX_PADDING;
        let mut y = top - BOX_PADDING;
        for (block_lines, size) in lines {
            for line in block_lines {
                let baseline = y - size * ASCENDER_RATIO;
                render_line(content, line, Alignment::Left, inner_x, inner_w, baseline);
                y -= size * LINE_FACTOR;
            }
        }
        self.cursor.pending_space = space_after;
    }

    fn document_reference(&mut self, filename: &str, caption: &str) {
        let inner_w = self.text_width - 2.0 * BOX_PADDING;
        let label = format!("Reference document: {filename}");
        let mut parts = vec![(
            build_text_block(&label, Face::Bold, NOTICE_SIZE, self.fonts, inner_w),
            NOTICE_SIZE,
        )];
        if caption != filename {
            parts.push((
                build_text_block(caption, Face::Oblique, CAPTION_SIZE, self.fonts, inner_w),
                CAPTION_SIZE,
            ));
        }
        self.boxed(&parts, [0.94, 0.94, 0.94], 14.0);
    }

    fn placeholder(&mut self, filename: &str, notice: &str) {
        let inner_w = self.text_width - 2.0 * BOX_PADDING;
        let text = format!("{notice}: {filename}");
        let parts = vec![(
            build_text_block(&text, Face::Regular, NOTICE_SIZE, self.fonts, inner_w),
            NOTICE_SIZE,
        )];
        self.boxed(&parts, [0.99, 0.9, 0.9], 14.0);
    }
}

fn check_image(img: &ReportImage) -> Result<(), Error> {
    let pixels = img.pixel_width as usize * img.pixel_height as usize;
    if pixels == 0 || img.rgb.len() != pixels * 3 {
        return Err(Error::Render(format!(
            "image '{}' has {} bytes of RGB data for {}x{} pixels",
            img.caption,
            img.rgb.len(),
            img.pixel_width,
            img.pixel_height
        )));
    }
    if img.alpha.as_ref().is_some_and(|a| a.len() != pixels) {
        return Err(Error::Render(format!(
            "image '{}' has a mismatched alpha channel",
            img.caption
        )));
    }
    if !(img.display_width.is_finite() && img.display_height.is_finite())
        || img.display_width <= 0.0
        || img.display_height <= 0.0
    {
        return Err(Error::Render(format!(
            "image '{}' has invalid display size {}x{}",
            img.caption, img.display_width, img.display_height
        )));
    }
    Ok(())
}

fn embed_image(img: &ReportImage, pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref) -> Ref {
    let xobj_ref = alloc();
    let (w, h) = (img.pixel_width as i32, img.pixel_height as i32);

    let smask_ref = img.alpha.as_ref().map(|alpha| {
        let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(alpha, 6);
        let mask_ref = alloc();
        let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(w);
        mask.height(h);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask_ref
    });

    let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&img.rgb, 6);
    let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
    xobj.filter(Filter::FlateDecode);
    xobj.width(w);
    xobj.height(h);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask_ref {
        xobj.s_mask(mask_ref);
    }
    xobj_ref
}

fn pdf_date(t: &DateTime<Local>) -> Date {
    Date::new(t.year().clamp(0, 9999) as u16)
        .month(t.month() as u8)
        .day(t.day() as u8)
        .hour(t.hour() as u8)
        .minute(t.minute() as u8)
        .second(t.second() as u8)
}

/// Lay out `blocks` in order onto pages and serialize the PDF.
pub fn render(
    blocks: &[ContentBlock],
    geometry: &PageGeometry,
    meta: &DocumentMeta,
) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let (text_width, text_height) = geometry.usable_area();
    if !(text_width > 0.0 && text_height > 0.0) {
        return Err(Error::Render(format!(
            "page {}x{} with margin {} leaves no usable area",
            geometry.page_width, geometry.page_height, geometry.margin
        )));
    }

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    // Phase 1: fonts
    let fonts: HashMap<Face, FontEntry> = Face::ALL
        .into_iter()
        .map(|face| (face, register_font(&mut pdf, face, &mut alloc)))
        .collect();

    // Phase 1b: embed images, keyed by block index
    let mut image_pdf_names: HashMap<usize, String> = HashMap::new();
    let mut image_xobjects: Vec<(String, Ref)> = Vec::new();
    for (idx, block) in blocks.iter().enumerate() {
        if let ContentBlock::Image(img) = block {
            check_image(img)?;
            let xobj_ref = embed_image(img, &mut pdf, &mut alloc);
            let name = format!("Im{}", image_xobjects.len() + 1);
            image_xobjects.push((name.clone(), xobj_ref));
            image_pdf_names.insert(idx, name);
        }
    }
    let t_images = t0.elapsed();

    // Phase 2: layout
    let mut r = Renderer {
        fonts: &fonts,
        cursor: PageCursor::new(*geometry),
        text_width,
        margin_left: geometry.margin,
    };
    for (idx, block) in blocks.iter().enumerate() {
        match block {
            ContentBlock::Header {
                generated_at,
                support_line,
            } => r.header(generated_at, support_line),
            ContentBlock::Title(title) => r.text(title, Face::Bold, TITLE_SIZE, 0.0, 14.0),
            ContentBlock::Heading(text) => r.text(text, Face::Bold, HEADING_SIZE, 14.0, 6.0),
            ContentBlock::Body(text) => r.text(text, Face::Regular, BODY_SIZE, 0.0, 8.0),
            ContentBlock::ContactLine { label, value } => r.contact_line(label, value),
            ContentBlock::Image(img) => {
                let name = image_pdf_names
                    .get(&idx)
                    .ok_or_else(|| Error::Render(format!("image block {idx} was not embedded")))?;
                r.image(img, name);
            }
            ContentBlock::DocumentReference { filename, caption } => {
                r.document_reference(filename, caption)
            }
            ContentBlock::Placeholder { filename, notice } => r.placeholder(filename, notice),
            ContentBlock::PageBreak => r.cursor.page_break(),
        }
    }
    let mut all_contents = r.cursor.finish();
    let t_layout = t0.elapsed();

    // Phase 2b: footers, now that the page count is known
    let n = all_contents.len();
    for (i, content) in all_contents.iter_mut().enumerate() {
        let label = format!("Page {} of {}", i + 1, n);
        let lines = build_lines(
            &[Span::new(Face::Regular, FOOTER_SIZE, &label)],
            &fonts,
            text_width,
        );
        let Some(line) = lines.first() else { continue };
        content.set_fill_gray(0.35);
        render_line(content, line, Alignment::Center, geometry.margin, text_width, geometry.margin / 2.0);
        content.set_fill_gray(0.0);
    }

    // Phase 3: allocate page and content IDs now that page count is known
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, c) in all_contents.into_iter().enumerate() {
        let raw = c.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    let mut font_pairs: Vec<(&str, Ref)> = fonts
        .values()
        .map(|entry| (entry.face.pdf_name(), entry.font_ref))
        .collect();
    font_pairs.sort_by_key(|(name, _)| *name);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, geometry.page_width, geometry.page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for (name, font_ref) in &font_pairs {
                font_dict.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    pdf.document_info(info_id)
        .title(TextStr(meta.title))
        .creator(TextStr(CREATOR))
        .producer(TextStr(CREATOR))
        .creation_date(pdf_date(&meta.created));

    let bytes = pdf.finish();
    log::info!(
        "Render phases: images={:.1}ms, layout={:.1}ms, assembly={:.1}ms ({} pages, {} images)",
        t_images.as_secs_f64() * 1000.0,
        (t_layout - t_images).as_secs_f64() * 1000.0,
        (t0.elapsed() - t_layout).as_secs_f64() * 1000.0,
        n,
        image_xobjects.len(),
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta() -> DocumentMeta<'static> {
        DocumentMeta {
            title: "Test report",
            created: Local.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
        }
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn page_count(pdf: &[u8]) -> usize {
        count(pdf, b"/Type /Page") - count(pdf, b"/Type /Pages")
    }

    fn image(w: u32, h: u32, display: (f32, f32)) -> ReportImage {
        ReportImage {
            rgb: vec![128; (w * h * 3) as usize],
            alpha: None,
            pixel_width: w,
            pixel_height: h,
            display_width: display.0,
            display_height: display.1,
            caption: "panel.png".into(),
        }
    }

    #[test]
    fn single_block_renders_one_page() {
        let blocks = vec![ContentBlock::Title("Hello".into())];
        let pdf = render(&blocks, &PageGeometry::default(), &meta()).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn page_breaks_start_new_pages_but_not_twice() {
        let blocks = vec![
            ContentBlock::Title("Hello".into()),
            ContentBlock::PageBreak,
            ContentBlock::PageBreak,
            ContentBlock::Heading("CUSTOMER INFORMATION".into()),
            ContentBlock::PageBreak,
            ContentBlock::Heading("REFERENCE IMAGES".into()),
        ];
        let pdf = render(&blocks, &PageGeometry::default(), &meta()).unwrap();
        assert_eq!(page_count(&pdf), 3);
    }

    #[test]
    fn leading_page_break_does_not_leave_blank_page() {
        let blocks = vec![ContentBlock::PageBreak, ContentBlock::Body("x".into())];
        let pdf = render(&blocks, &PageGeometry::default(), &meta()).unwrap();
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn long_body_flows_onto_more_pages() {
        let body = "line of service text\n".repeat(120);
        let blocks = vec![ContentBlock::Body(body)];
        let pdf = render(&blocks, &PageGeometry::default(), &meta()).unwrap();
        assert!(page_count(&pdf) >= 3);
    }

    #[test]
    fn full_height_images_take_a_page_each() {
        let blocks = vec![
            ContentBlock::Heading("REFERENCE IMAGES".into()),
            ContentBlock::Image(image(4, 6, (432.0, 648.0))),
            ContentBlock::Image(image(4, 6, (432.0, 648.0))),
        ];
        let pdf = render(&blocks, &PageGeometry::default(), &meta()).unwrap();
        // heading page, then image/caption spill for each image
        assert!(page_count(&pdf) >= 3);
        assert_eq!(count(&pdf, b"/Subtype /Image"), 2);
    }

    #[test]
    fn alpha_channel_adds_soft_mask() {
        let mut img = image(2, 2, (100.0, 100.0));
        img.alpha = Some(vec![0, 255, 255, 128]);
        let pdf = render(&[ContentBlock::Image(img)], &PageGeometry::default(), &meta()).unwrap();
        assert_eq!(count(&pdf, b"/Subtype /Image"), 2);
        assert_eq!(count(&pdf, b"/SMask"), 1);
    }

    #[test]
    fn mismatched_pixel_data_is_a_render_error() {
        let mut img = image(4, 4, (100.0, 100.0));
        img.rgb.truncate(10);
        let err = render(&[ContentBlock::Image(img)], &PageGeometry::default(), &meta()).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn geometry_without_usable_area_is_a_render_error() {
        let geometry = PageGeometry {
            page_width: 100.0,
            page_height: 100.0,
            margin: 72.0,
        };
        let err = render(&[ContentBlock::Body("x".into())], &geometry, &meta()).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn media_box_follows_geometry() {
        let geometry = PageGeometry {
            page_width: 595.0,
            page_height: 842.0,
            margin: 72.0,
        };
        let pdf = render(&[ContentBlock::Body("x".into())], &geometry, &meta()).unwrap();
        assert_eq!(count(&pdf, b"/MediaBox [0 0 595 842]"), 1);
    }

    #[test]
    fn document_info_carries_title() {
        let pdf = render(&[ContentBlock::Body("x".into())], &PageGeometry::default(), &meta()).unwrap();
        assert_eq!(count(&pdf, b"/Title (Test report)"), 1);
    }
}
