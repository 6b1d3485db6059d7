//! Shapes on a slide: names, placeholders, positions and text

use crate::layout::Frame;

use super::xml::{Element, Node};

/// Placeholder type used for picture placeholders
pub const PICTURE_PLACEHOLDER: &str = "pic";

/// `p:ph` attributes of a placeholder shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// `type` attribute; absent means a generic object placeholder
    pub kind: String,
    pub idx: Option<String>,
}

/// The `p:spTree` of a slide or layout
pub fn shape_tree(root: &Element) -> Option<&Element> {
    root.find(&["p:cSld", "p:spTree"])
}

pub fn shape_tree_mut(root: &mut Element) -> Option<&mut Element> {
    root.find_mut(&["p:cSld", "p:spTree"])
}

/// The `p:nvSpPr` / `p:nvPicPr` / ... block of a shape
fn non_visual(shape: &Element) -> Option<&Element> {
    shape.elements().find(|e| e.name.starts_with("p:nv"))
}

pub fn shape_name(shape: &Element) -> Option<&str> {
    non_visual(shape)?.child("p:cNvPr")?.attr("name")
}

pub fn placeholder(shape: &Element) -> Option<Placeholder> {
    let ph = non_visual(shape)?.find(&["p:nvPr", "p:ph"])?;
    Some(Placeholder {
        kind: ph.attr("type").unwrap_or("obj").to_string(),
        idx: ph.attr("idx").map(str::to_string),
    })
}

/// Position and size declared on the shape itself
pub fn frame(shape: &Element) -> Option<Frame> {
    let xfrm = shape
        .find(&["p:spPr", "a:xfrm"])
        .or_else(|| shape.child("p:xfrm"))?;
    let off = xfrm.child("a:off")?;
    let ext = xfrm.child("a:ext")?;
    let number = |e: &Element, key: &str| e.attr(key).and_then(|v| v.parse::<i64>().ok());

    Some(Frame::new(
        number(off, "x")?,
        number(off, "y")?,
        number(ext, "cx")?,
        number(ext, "cy")?,
    ))
}

/// Frame of the layout placeholder a slide placeholder inherits from
///
/// Matches on `idx` first, then on the placeholder type.
pub fn inherited_frame(layout: &Element, ph: &Placeholder) -> Option<Frame> {
    let tree = shape_tree(layout)?;
    let candidates: Vec<(Placeholder, Frame)> = tree
        .elements()
        .filter_map(|shape| Some((placeholder(shape)?, frame(shape)?)))
        .collect();

    let by_idx = ph.idx.as_ref().and_then(|idx| {
        candidates
            .iter()
            .find(|(candidate, _)| candidate.idx.as_ref() == Some(idx))
    });
    by_idx
        .or_else(|| candidates.iter().find(|(candidate, _)| candidate.kind == ph.kind))
        .map(|(_, frame)| *frame)
}

/// Shape text with one line per paragraph; `None` for shapes without a text body
pub fn shape_text(shape: &Element) -> Option<String> {
    let body = shape.child("p:txBody")?;
    let paragraphs: Vec<String> = body
        .elements()
        .filter(|e| e.name == "a:p")
        .map(paragraph_text)
        .collect();
    Some(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Element) -> String {
    let mut text = String::new();
    for child in paragraph.elements() {
        match child.name.as_str() {
            "a:r" | "a:fld" => {
                if let Some(t) = child.child("a:t") {
                    text.push_str(&t.text());
                }
            }
            "a:br" => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// Replace the text of a shape, one paragraph per line
///
/// Body properties, list styles, the first paragraph's properties and the
/// first run's properties are carried over to every new paragraph.
pub fn set_shape_text(shape: &mut Element, text: &str) -> bool {
    let Some(body) = shape.child_mut("p:txBody") else {
        return false;
    };

    let first_paragraph = body.elements().find(|e| e.name == "a:p").cloned();
    let paragraph_props = first_paragraph.as_ref().and_then(|p| p.child("a:pPr")).cloned();
    let end_props = first_paragraph.as_ref().and_then(|p| p.child("a:endParaRPr")).cloned();
    let run_props = first_paragraph
        .as_ref()
        .and_then(|p| p.elements().find(|e| e.name == "a:r"))
        .and_then(|run| run.child("a:rPr"))
        .cloned()
        .or_else(|| {
            end_props.clone().map(|mut props| {
                props.name = "a:rPr".to_string();
                props
            })
        });

    body.children.retain(|node| match node {
        Node::Element(e) => e.name != "a:p",
        _ => false,
    });

    for line in text.split('\n') {
        let mut paragraph = Element::new("a:p");
        if let Some(props) = &paragraph_props {
            paragraph = paragraph.with_child(props.clone());
        }
        if !line.is_empty() {
            let mut run = Element::new("a:r");
            if let Some(props) = &run_props {
                run = run.with_child(props.clone());
            }
            run = run.with_child(Element::new("a:t").with_text(line));
            paragraph = paragraph.with_child(run);
        }
        if let Some(props) = &end_props {
            paragraph = paragraph.with_child(props.clone());
        }
        body.children.push(Node::Element(paragraph));
    }
    true
}

/// A picture shape showing the image behind relationship `rel_id`
pub fn picture_shape(id: u32, name: &str, rel_id: &str, frame: &Frame) -> Element {
    let non_visual = Element::new("p:nvPicPr")
        .with_child(
            Element::new("p:cNvPr")
                .with_attr("id", id.to_string())
                .with_attr("name", name),
        )
        .with_child(
            Element::new("p:cNvPicPr")
                .with_child(Element::new("a:picLocks").with_attr("noChangeAspect", "1")),
        )
        .with_child(Element::new("p:nvPr"));

    let blip_fill = Element::new("p:blipFill")
        .with_child(Element::new("a:blip").with_attr("r:embed", rel_id))
        .with_child(Element::new("a:stretch").with_child(Element::new("a:fillRect")));

    let shape_props = Element::new("p:spPr")
        .with_child(
            Element::new("a:xfrm")
                .with_child(
                    Element::new("a:off")
                        .with_attr("x", frame.left.0.to_string())
                        .with_attr("y", frame.top.0.to_string()),
                )
                .with_child(
                    Element::new("a:ext")
                        .with_attr("cx", frame.width.0.to_string())
                        .with_attr("cy", frame.height.0.to_string()),
                ),
        )
        .with_child(
            Element::new("a:prstGeom")
                .with_attr("prst", "rect")
                .with_child(Element::new("a:avLst")),
        );

    Element::new("p:pic")
        .with_child(non_visual)
        .with_child(blip_fill)
        .with_child(shape_props)
}

/// Highest shape id used anywhere in the tree
pub fn max_shape_id(root: &Element) -> u32 {
    let mut props = Vec::new();
    root.descendants("p:cNvPr", &mut props);
    props
        .iter()
        .filter_map(|e| e.attr("id")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// Turn literal `\n` escapes into line breaks
pub fn normalize_text(value: &str) -> String {
    value.replace("\\n", "\n").replace("\\\n", "\n")
}
