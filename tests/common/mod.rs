//! Fixtures shared by the integration tests
//!
//! Templates and PDFs are generated on the fly so the tests need neither
//! binary fixtures nor an office suite.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use pdf_reports::config::ReportConfig;
use pdf_reports::convert::{pdf_output_path, PdfConverter};
use pdf_reports::deck::package::Package;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const CHART_SLOT_A: &str = "Marcador de posición de imagen 6";
pub const CHART_SLOT_B: &str = "Marcador de posición de imagen 9";

/// Write a PDF with `pages` empty A4 landscape pages
///
/// The MediaBox sits on the page tree root, so pages inherit it.
pub fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 842.into(), 595.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("Failed to write test PDF");
}

/// A shape on a generated template slide
pub enum Shape<'a> {
    /// Text box holding `text`
    Text(&'a str, &'a str),
    /// Picture placeholder with its own frame
    Slot(&'a str, (i64, i64, i64, i64)),
    /// Picture placeholder positioned by the layout
    LayoutSlot(&'a str),
}

fn shape_xml(id: usize, shape: &Shape<'_>) -> String {
    match shape {
        Shape::Text(name, text) => format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="1000" cy="100"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="es-AR" sz="1800"/><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
        ),
        Shape::Slot(name, (x, y, cx, cy)) => format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr><p:ph type="pic" idx="{id}"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm></p:spPr></p:sp>"#
        ),
        Shape::LayoutSlot(name) => format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr><p:ph type="pic" idx="99"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#
        ),
    }
}

/// Write a one-slide PPTX package with the given shapes
pub fn write_template(path: &Path, shapes: &[Shape<'_>]) {
    const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    let shapes_xml: String = shapes
        .iter()
        .enumerate()
        .map(|(i, shape)| shape_xml(i + 2, shape))
        .collect();
    let slide = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes_xml}</p:spTree></p:cSld></p:sld>"#
    );
    let layout = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {NS}><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Imagen"/><p:cNvSpPr/><p:nvPr><p:ph type="pic" idx="99"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="8000000" y="200000"/><a:ext cx="1600000" cy="800000"/></a:xfrm></p:spPr></p:sp></p:spTree></p:cSld></p:sldLayout>"#
    );
    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#
    );

    let mut package = Package::default();
    package.set_part(
        "[Content_Types].xml",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/></Types>"#.to_vec(),
    );
    package.set_part(
        "_rels/.rels",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#.to_vec(),
    );
    package.set_part("ppt/presentation.xml", presentation.into_bytes());
    package.set_part(
        "ppt/_rels/presentation.xml.rels",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/></Relationships>"#.to_vec(),
    );
    package.set_part("ppt/slides/slide1.xml", slide.into_bytes());
    package.set_part(
        "ppt/slides/_rels/slide1.xml.rels",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#.to_vec(),
    );
    package.set_part("ppt/slideLayouts/slideLayout1.xml", layout.into_bytes());
    package.save(path).expect("Failed to write test template");
}

/// Data directory with cover, closing and both content templates
pub fn data_dir_with_templates(root: &Path) -> ReportConfig {
    let mut config = ReportConfig {
        data_dir: root.to_path_buf(),
        ..ReportConfig::default()
    };
    config.charts.font = root.join("missing-font.ttf");
    config.converter.profile_root = root.to_path_buf();

    let templates = config.templates_dir();
    std::fs::create_dir_all(&templates).expect("Failed to create templates dir");
    std::fs::create_dir_all(config.charts_dir()).expect("Failed to create charts dir");

    write_template(
        &templates.join(&config.templates.cover),
        &[
            Shape::Text("Titulo", "{{ph_titulo}}"),
            Shape::Text("Subtitulo", "{{ph_subtitle}}"),
            Shape::Text("Fecha", " {{ph_fecha}} "),
            Shape::Text("Pie izquierdo", "{{ph_pie_l}}"),
            Shape::Text("Pie derecho", "{{ph_pie_r}}"),
            Shape::LayoutSlot("Logo"),
        ],
    );
    write_template(
        &templates.join(&config.templates.closing),
        &[
            Shape::Text("Titulo", "{{ph_titulo}}"),
            Shape::Text("Pie izquierdo", "{{ph_pie_l}}"),
            Shape::Text("Pie derecho", "{{ph_pie_r}}"),
            Shape::LayoutSlot("Logo"),
        ],
    );

    let content = [
        Shape::Text("Titulo", "{{ph_titulo}}"),
        Shape::Text("Resumen", "{{ph_resumen}}"),
        Shape::Text("Sugerencia", "{{ph_sugerencia}}"),
        Shape::Text("Version", "{{ph_sugerencia_ver}}"),
        Shape::Text("Kpis", "{{ph_kpis}}"),
        Shape::Text("Pie izquierdo", "{{ph_pie_l}}"),
        Shape::Text("Pie derecho", "{{ph_pie_r}}"),
        Shape::Slot(CHART_SLOT_B, (0, 1_000_000, 5_000_000, 3_000_000)),
        Shape::Slot(CHART_SLOT_A, (5_000_000, 1_000_000, 5_000_000, 3_000_000)),
        Shape::LayoutSlot("Logo"),
    ];
    write_template(&templates.join("plantilla_contenido.pptx"), &content);
    write_template(&templates.join("plantilla_contenido_no_kpis.pptx"), &content);

    config
}

/// Converter that writes a one-page PDF and remembers what it converted
#[derive(Clone, Default)]
pub struct FakeConverter {
    pub calls: Rc<RefCell<Vec<PathBuf>>>,
}

impl FakeConverter {
    pub fn converted_names(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }
}

impl PdfConverter for FakeConverter {
    fn convert(&self, source: &Path, out_dir: &Path) -> pdf_reports::Result<PathBuf> {
        std::fs::create_dir_all(out_dir)?;
        let pdf = pdf_output_path(source, out_dir);
        write_pdf(&pdf, 1);
        self.calls.borrow_mut().push(source.to_path_buf());
        Ok(pdf)
    }
}

/// A small opaque PNG, base64 encoded
pub fn logo_base64(width: u32, height: u32) -> String {
    use base64::Engine;
    let image = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([0, 80, 160, 255]),
    ));
    let mut png = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .expect("Failed to encode test logo");
    base64::engine::general_purpose::STANDARD.encode(png)
}
