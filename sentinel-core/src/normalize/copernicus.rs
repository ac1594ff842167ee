use chrono::{DateTime, Utc};
use roxmltree::{Document, Node, ParsingOptions};
use sentinel_model::{Coordinates, HazardEvent, HazardId, SEVERITY_HIGH};
use tracing::debug;

use super::fields::timestamp_or_ingested;
use super::{NormalizeError, NormalizedBatch};
use crate::feeds::FeedSource;

pub const ID_PREFIX: &str = "copernicus";

/// Accepts RSS 2.0 (`rss/channel/item`), Atom (`feed/entry`) and RSS 1.0
/// (`rdf:RDF/item`, items beside the channel rather than inside it).
pub fn parse(body: &str, ingested_at: DateTime<Utc>) -> Result<NormalizedBatch, NormalizeError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(body, options)?;
    let root = document.root_element();
    if !matches!(root.tag_name().name(), "rss" | "feed" | "RDF") {
        return Err(NormalizeError::Shape(format!(
            "unexpected feed root <{}>",
            root.tag_name().name()
        )));
    }

    let channel = child(root, "channel").unwrap_or(root);
    let mut items: Vec<Node<'_, '_>> = channel.children().filter(is_entry).collect();
    if items.is_empty() {
        items = root.children().filter(is_entry).collect();
    }

    let mut batch = NormalizedBatch::default();
    for item in items {
        batch.accept(map_item(item, ingested_at));
    }
    Ok(batch)
}

fn map_item(item: Node<'_, '_>, ingested_at: DateTime<Utc>) -> Option<HazardEvent> {
    let title = child_text(item, "title").unwrap_or_default();
    // `georss:point` and a bare `point` share the local name.
    let Some(position) = child_text(item, "point")
        .as_deref()
        .and_then(Coordinates::parse_georss)
    else {
        debug!(source = "copernicus", title = %title, "dropping activation without a point");
        return None;
    };
    let published = child_text(item, "pubDate").or_else(|| child_text(item, "updated"));

    Some(HazardEvent::new(
        HazardId::from_title(ID_PREFIX, &title),
        "Emergency",
        title,
        position,
        SEVERITY_HIGH,
        FeedSource::Copernicus.provider_name(),
        timestamp_or_ingested(published.as_deref(), ingested_at),
    ))
}

fn is_entry(node: &Node<'_, '_>) -> bool {
    node.is_element() && matches!(node.tag_name().name(), "item" | "entry")
}

fn child<'a, 'input>(node: Node<'a, 'input>, local_name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
}

/// Concatenated text (CDATA included) of the first child named `local_name`.
fn child_text(node: Node<'_, '_>, local_name: &str) -> Option<String> {
    let element = child(node, local_name)?;
    let text: String = element
        .descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
