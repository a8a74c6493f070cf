//! XML utility functions
//!
//! Reads the GDAL metadata document stored in TIFF tag 42112, which carries
//! band descriptions and other per-band items.

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One `<Item>` of a GDAL metadata document
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataItem {
    pub name: String,
    /// Zero-based band index, absent for dataset-level items
    pub sample: Option<usize>,
    pub role: Option<String>,
    pub value: String,
}

/// Parses every `<Item>` element of a GDAL metadata document
///
/// Malformed documents yield the items read before the error.
pub fn parse_gdal_metadata(xml: &str) -> Vec<MetadataItem> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<MetadataItem> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"Item" => {
                current = Some(item_from_attributes(&e));
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"Item" => {
                items.push(item_from_attributes(&e));
            }
            Ok(Event::Text(t)) => {
                if let Some(item) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => item.value.push_str(&text),
                        Err(e) => warn!("Invalid text in GDAL metadata: {}", e),
                    }
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"Item" => {
                if let Some(item) = current.take() {
                    items.push(item);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Malformed GDAL metadata at position {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
    }

    items
}

fn item_from_attributes(element: &BytesStart) -> MetadataItem {
    let mut item = MetadataItem {
        name: String::new(),
        sample: None,
        role: None,
        value: String::new(),
    };

    for attr in element.attributes().flatten() {
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };
        match attr.key.as_ref() {
            b"name" => item.name = value,
            b"sample" => item.sample = value.parse().ok(),
            b"role" => item.role = Some(value),
            _ => {}
        }
    }
    item
}

/// Band descriptions from a GDAL metadata document
///
/// # Arguments
/// * `xml` - The metadata document
/// * `band_count` - Number of bands in the image
///
/// # Returns
/// One entry per band; empty where the band has no description
pub fn band_descriptions(xml: &str, band_count: usize) -> Vec<String> {
    let mut names = vec![String::new(); band_count];
    for item in parse_gdal_metadata(xml) {
        let is_description = item.role.as_deref() == Some("description") || item.name == "DESCRIPTION";
        if let (true, Some(sample)) = (is_description, item.sample) {
            if let Some(slot) = names.get_mut(sample) {
                *slot = item.value;
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"<GDALMetadata>
  <Item name="AREA_OR_POINT">Area</Item>
  <Item name="DESCRIPTION" sample="0" role="description">Red &amp; more</Item>
  <Item name="DESCRIPTION" sample="2" role="description">NIR</Item>
  <Item name="OFFSET" sample="0" role="offset" />
</GDALMetadata>"#;

    #[test]
    fn test_parse_items() {
        let items = parse_gdal_metadata(METADATA);
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].name, "AREA_OR_POINT");
        assert_eq!(items[0].value, "Area");
        assert_eq!(items[0].sample, None);
        assert_eq!(items[3].role.as_deref(), Some("offset"));
    }

    #[test]
    fn test_band_descriptions() {
        let names = band_descriptions(METADATA, 3);
        assert_eq!(names, vec!["Red & more".to_string(), String::new(), "NIR".to_string()]);
    }

    #[test]
    fn test_malformed_keeps_earlier_items() {
        let names = band_descriptions(r#"<GDALMetadata><Item name="DESCRIPTION" sample="0" role="description">B1</Item><Item"#, 1);
        assert_eq!(names, vec!["B1".to_string()]);
    }
}
