// Barline and ending writing for MusicXML export

use crate::models::{Barline, Measure, SpannerKind};

use super::builder::{NodeId, XmlDocument};
use super::helpers::normalize_ending_numbers;
use super::part::PartContext;

/// `<ending>` carried by a left or right barline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ending {
    pub kind: &'static str,
    pub number: String,
    /// Display text, only on the start
    pub text: Option<String>,
}

/// Endings that start on `measure` (left) and stop on it (right)
pub fn endings_for(ctx: &PartContext, measure: &Measure) -> (Vec<Ending>, Vec<Ending>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (membership, spanner) in ctx
        .spanners
        .select(measure.id, |k| matches!(k, SpannerKind::RepeatBracket { .. }))
    {
        let SpannerKind::RepeatBracket { number, open_end } = &spanner.kind else {
            continue;
        };
        let (number, text) = normalize_ending_numbers(number);
        if membership.is_first {
            left.push(Ending { kind: "start", number: number.clone(), text: Some(text) });
        }
        if membership.is_last {
            let kind = if *open_end { "discontinue" } else { "stop" };
            right.push(Ending { kind, number, text: None });
        }
    }
    (left, right)
}

/// Write a barline at `location` when there is a barline or an ending to show
pub fn write_barline(
    doc: &mut XmlDocument,
    measure: NodeId,
    location: &str,
    barline: Option<&Barline>,
    endings: &[Ending],
) {
    if barline.is_none() && endings.is_empty() {
        return;
    }
    let node = doc.element(measure, "barline");
    doc.set_attr(node, "location", location);

    if let Some(barline) = barline {
        doc.text_element(node, "bar-style", barline.style.xml_name());
        if barline.fermata {
            doc.element(node, "fermata");
        }
    }
    for ending in endings {
        let ending_node = doc.empty_element(node, "ending", &[("number", ending.number.as_str()), ("type", ending.kind)]);
        if let Some(text) = &ending.text {
            doc.set_text(ending_node, text);
        }
    }
    if let Some(repeat) = barline.and_then(|b| b.repeat) {
        let repeat_node = doc.empty_element(node, "repeat", &[("direction", repeat.direction.xml_name())]);
        if let Some(times) = repeat.times {
            doc.set_attr(repeat_node, "times", &times.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_order() {
        let mut doc = XmlDocument::with_root("measure");
        let measure = doc.root().unwrap();
        let mut barline = Barline::repeat_backward(Some(2));
        barline.fermata = true;
        let endings = vec![Ending { kind: "stop", number: "1".into(), text: None }];
        write_barline(&mut doc, measure, "right", Some(&barline), &endings);

        let node = doc.find_child(measure, "barline").unwrap();
        let tags: Vec<_> = doc.children(node).iter().map(|&c| doc.tag(c).unwrap()).collect();
        assert_eq!(tags, vec!["bar-style", "fermata", "ending", "repeat"]);
        let repeat = doc.find_child(node, "repeat").unwrap();
        assert_eq!(doc.attr(repeat, "times"), Some("2"));
    }

    #[test]
    fn test_nothing_to_write() {
        let mut doc = XmlDocument::with_root("measure");
        let measure = doc.root().unwrap();
        write_barline(&mut doc, measure, "left", None, &[]);
        assert!(doc.children(measure).is_empty());
    }

    #[test]
    fn test_ending_only_barline() {
        let mut doc = XmlDocument::with_root("measure");
        let measure = doc.root().unwrap();
        let endings = vec![Ending { kind: "start", number: "1,2".into(), text: Some("1., 2.".into()) }];
        write_barline(&mut doc, measure, "left", None, &endings);
        let xml = doc.to_xml_string(0).unwrap();
        assert!(xml.contains(r#"<barline location="left"><ending number="1,2" type="start">1., 2.</ending></barline>"#));
    }
}
