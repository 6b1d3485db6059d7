//! Slide template editing
//!
//! A template is a `.pptx` package whose first slide carries text shapes
//! such as `{{ph_titulo}}` and picture placeholders. A [`Deck`] loads that
//! slide, fills it and writes a new package.

pub mod package;
pub mod slide;
pub mod xml;

use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::layout::{fit_width, fit_within, Frame};
use crate::picture::Picture;

use package::{rels_path, resolve_target, Package};
use xml::{Element, Node};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const FALLBACK_SLIDE_PART: &str = "ppt/slides/slide1.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const OFFICE_REL_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const DRAWING_NAMESPACE: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// The first slide of a template package, loaded for editing
#[derive(Debug, Clone)]
pub struct Deck {
    package: Package,
    slide_part: String,
    slide: Element,
    rels: Element,
    layout: Option<Element>,
}

impl Deck {
    pub fn open(path: &Path) -> Result<Self> {
        let package = Package::open(path)?;
        Self::from_package(package).map_err(|e| match e {
            Error::Template(detail) => Error::Template(format!("{}: {}", path.display(), detail)),
            other => other,
        })
    }

    pub fn from_package(package: Package) -> Result<Self> {
        let slide_part = first_slide_part(&package)?;
        let slide_bytes = package
            .part(&slide_part)
            .ok_or_else(|| Error::Template(format!("missing slide part {}", slide_part)))?;
        let slide = xml::parse(slide_bytes)?;

        let rels = match package.part(&rels_path(&slide_part)) {
            Some(bytes) => xml::parse(bytes)?,
            None => Element::new("Relationships").with_attr("xmlns", RELS_NAMESPACE),
        };

        let layout = match relationship_target(&rels, &slide_part, |kind| kind.ends_with("/slideLayout")) {
            Some(layout_part) => package.part(&layout_part).map(xml::parse).transpose()?,
            None => None,
        };

        debug!("Loaded template slide {}", slide_part);
        Ok(Self {
            package,
            slide_part,
            slide,
            rels,
            layout,
        })
    }

    /// Names of the top-level shapes, in z-order
    pub fn shape_names(&self) -> Vec<String> {
        self.shapes()
            .filter_map(|shape| slide::shape_name(shape).map(str::to_string))
            .collect()
    }

    /// Text of every top-level shape that has a text body
    pub fn texts(&self) -> Vec<String> {
        self.shapes().filter_map(slide::shape_text).collect()
    }

    fn shapes(&self) -> impl Iterator<Item = &Element> {
        slide::shape_tree(&self.slide)
            .into_iter()
            .flat_map(|tree| tree.elements())
    }

    /// Fill text shapes whose whole (trimmed) text is one of the keys
    ///
    /// Returns how many shapes were changed.
    pub fn replace_placeholders(&mut self, replacements: &[(&str, String)]) -> usize {
        let Some(tree) = slide::shape_tree_mut(&mut self.slide) else {
            return 0;
        };

        let mut replaced = 0;
        for shape in tree.elements_mut() {
            let Some(text) = slide::shape_text(shape) else { continue };
            let key = text.trim();
            if let Some((key, value)) = replacements.iter().find(|(k, _)| *k == key) {
                debug!("Replacing {}", key);
                if slide::set_shape_text(shape, &slide::normalize_text(value)) {
                    replaced += 1;
                }
            }
        }
        replaced
    }

    /// Put chart images into the named placeholders, in name order
    ///
    /// Each chart spans the placeholder width and is centred vertically.
    /// Returns how many charts were placed.
    pub fn insert_charts(&mut self, placeholder_names: &[String], charts: &[Picture]) -> Result<usize> {
        let mut targets: Vec<(String, usize)> = self
            .shapes()
            .enumerate()
            .filter_map(|(position, shape)| {
                let name = slide::shape_name(shape)?;
                placeholder_names
                    .iter()
                    .any(|n| n == name)
                    .then(|| (name.to_string(), position))
            })
            .collect();
        targets.sort_by(|a, b| a.0.cmp(&b.0));

        if charts.len() > targets.len() {
            warn!(
                "{} charts but only {} chart placeholders; extra charts dropped",
                charts.len(),
                targets.len()
            );
        }

        let mut placed = 0;
        for ((name, position), chart) in targets.iter().zip(charts) {
            let Some(area) = self.shape_frame(*position) else {
                warn!("Chart placeholder '{}' has no position, skipped", name);
                continue;
            };
            let frame = fit_width(&area, chart.width, chart.height);
            self.replace_with_picture(*position, chart, &frame)?;
            placed += 1;
        }
        Ok(placed)
    }

    /// Put the logo into the first picture placeholder not listed in `excluded`
    ///
    /// Returns false when the slide has no such placeholder.
    pub fn insert_logo(&mut self, logo: &Picture, excluded: &[String]) -> Result<bool> {
        let target = self.shapes().position(|shape| {
            let is_picture = slide::placeholder(shape)
                .map(|ph| ph.kind == slide::PICTURE_PLACEHOLDER)
                .unwrap_or(false);
            let name = slide::shape_name(shape).unwrap_or_default();
            is_picture && !excluded.iter().any(|n| n == name)
        });

        let Some(position) = target else {
            debug!("Template has no picture placeholder for the logo");
            return Ok(false);
        };
        let Some(area) = self.shape_frame(position) else {
            warn!("Logo placeholder has no position, logo skipped");
            return Ok(false);
        };

        let frame = fit_within(&area, logo.width, logo.height);
        self.replace_with_picture(position, logo, &frame)?;
        Ok(true)
    }

    /// Frame of a top-level shape, inherited from the layout when not set
    fn shape_frame(&self, position: usize) -> Option<Frame> {
        let shape = self.shapes().nth(position)?;
        slide::frame(shape).or_else(|| {
            let ph = slide::placeholder(shape)?;
            slide::inherited_frame(self.layout.as_ref()?, &ph)
        })
    }

    fn replace_with_picture(&mut self, position: usize, picture: &Picture, frame: &Frame) -> Result<()> {
        let rel_id = self.add_image(picture)?;
        let id = slide::max_shape_id(&self.slide) + 1;
        let shape = slide::picture_shape(id, &format!("Picture {}", id), &rel_id, frame);

        ensure_namespace(&mut self.slide, "xmlns:a", DRAWING_NAMESPACE);
        ensure_namespace(&mut self.slide, "xmlns:r", OFFICE_REL_NAMESPACE);

        let tree = slide::shape_tree_mut(&mut self.slide)
            .ok_or_else(|| Error::Template("slide has no shape tree".to_string()))?;
        let slot = tree
            .elements_mut()
            .nth(position)
            .ok_or_else(|| Error::Template(format!("no shape at position {}", position)))?;
        *slot = shape;
        Ok(())
    }

    /// Store an image as a media part and return its relationship id
    fn add_image(&mut self, picture: &Picture) -> Result<String> {
        let media_name = (1..)
            .map(|n| format!("ppt/media/image{}.png", n))
            .find(|name| !self.package.has_part(name))
            .ok_or_else(|| Error::Template("no free media name".to_string()))?;
        self.package.set_part(&media_name, picture.png.clone());

        let next = self
            .rels
            .elements()
            .filter_map(|rel| rel.attr("Id")?.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let rel_id = format!("rId{}", next);

        let target = media_name
            .strip_prefix("ppt/")
            .map(|relative| format!("../{}", relative))
            .unwrap_or_else(|| format!("/{}", media_name));
        self.rels.children.push(Node::Element(
            Element::new("Relationship")
                .with_attr("Id", rel_id.as_str())
                .with_attr("Type", IMAGE_REL_TYPE)
                .with_attr("Target", target),
        ));

        self.ensure_png_content_type()?;
        Ok(rel_id)
    }

    fn ensure_png_content_type(&mut self) -> Result<()> {
        let Some(bytes) = self.package.part(CONTENT_TYPES_PART) else {
            return Err(Error::Template("package has no content types".to_string()));
        };
        let mut types = xml::parse(bytes)?;
        let registered = types.elements().any(|e| {
            e.name == "Default"
                && e.attr("Extension")
                    .map(|ext| ext.eq_ignore_ascii_case("png"))
                    .unwrap_or(false)
        });
        if !registered {
            types.children.insert(
                0,
                Node::Element(
                    Element::new("Default")
                        .with_attr("Extension", "png")
                        .with_attr("ContentType", "image/png"),
                ),
            );
            self.package.set_part(CONTENT_TYPES_PART, xml::to_bytes(&types)?);
        }
        Ok(())
    }

    /// Write the edited package
    pub fn save(mut self, path: &Path) -> Result<()> {
        self.package.set_part(&self.slide_part, xml::to_bytes(&self.slide)?);
        self.package.set_part(&rels_path(&self.slide_part), xml::to_bytes(&self.rels)?);
        self.package.save(path)?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}

fn ensure_namespace(root: &mut Element, key: &str, uri: &str) {
    if root.attr(key).is_none() {
        root.set_attr(key, uri);
    }
}

/// Target part of the first relationship whose type matches
fn relationship_target(rels: &Element, owner: &str, matches: impl Fn(&str) -> bool) -> Option<String> {
    rels.elements()
        .find(|rel| rel.attr("Type").map(&matches).unwrap_or(false))
        .and_then(|rel| rel.attr("Target"))
        .map(|target| resolve_target(owner, target))
}

/// First slide in presentation order, else the conventional first slide part
fn first_slide_part(package: &Package) -> Result<String> {
    if let Some(part) = listed_first_slide(package)? {
        if package.has_part(&part) {
            return Ok(part);
        }
    }
    if package.has_part(FALLBACK_SLIDE_PART) {
        return Ok(FALLBACK_SLIDE_PART.to_string());
    }
    Err(Error::Template("template has no slides".to_string()))
}

fn listed_first_slide(package: &Package) -> Result<Option<String>> {
    let (Some(presentation), Some(rels)) = (
        package.part(PRESENTATION_PART),
        package.part(&rels_path(PRESENTATION_PART)),
    ) else {
        return Ok(None);
    };

    let presentation = xml::parse(presentation)?;
    let rels = xml::parse(rels)?;

    let Some(rel_id) = presentation
        .child("p:sldIdLst")
        .and_then(|list| list.child("p:sldId"))
        .and_then(|first| first.attr("r:id"))
    else {
        return Ok(None);
    };

    let target = rels
        .elements()
        .find(|rel| rel.attr("Id") == Some(rel_id))
        .and_then(|rel| rel.attr("Target"))
        .map(|target| resolve_target(PRESENTATION_PART, target));
    Ok(target)
}
