//! Object dispatch: rendered manifests to identified objects
//!
//! Every [`RenderedManifest`] may hold several YAML documents separated by
//! `---` lines. Each non-blank document becomes one [`DispatchedObject`], in
//! stream order. The first error (upstream render failure or parse failure)
//! ends the stream.

use serde_json::Value as JsonValue;
use tidemark_core::{Document, Gvk, RenderedManifest, type_name};

use crate::error::{KubeError, Result};

/// One parsed object and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedObject {
    /// Template the object was rendered from
    pub source: String,
    /// Position of the document inside its manifest (0-based)
    pub index: usize,
    pub document: Document,
    pub gvk: Gvk,
}

/// Pull-based dispatcher over a lazy manifest sequence
pub struct ObjectDispatcher<I> {
    manifests: I,
    pending: Option<PendingManifest>,
    done: bool,
}

struct PendingManifest {
    source: String,
    documents: std::vec::IntoIter<(usize, String)>,
}

impl PendingManifest {
    fn new(manifest: RenderedManifest) -> Self {
        let documents: Vec<(usize, String)> = split_documents(&manifest.content)
            .into_iter()
            .enumerate()
            .collect();

        Self {
            source: manifest.source,
            documents: documents.into_iter(),
        }
    }
}

impl<I> ObjectDispatcher<I> {
    pub fn new(manifests: I) -> Self {
        Self {
            manifests,
            pending: None,
            done: false,
        }
    }
}

impl<I, E> Iterator for ObjectDispatcher<I>
where
    I: Iterator<Item = std::result::Result<RenderedManifest, E>>,
    KubeError: From<E>,
{
    type Item = Result<DispatchedObject>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some(pending) = &mut self.pending {
                if let Some((index, text)) = pending.documents.next() {
                    match parse_document(&pending.source, index, &text) {
                        Ok(Some(object)) => return Some(Ok(object)),
                        Ok(None) => continue,
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
                self.pending = None;
            }

            match self.manifests.next() {
                Some(Ok(manifest)) => self.pending = Some(PendingManifest::new(manifest)),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

impl<I, E> std::iter::FusedIterator for ObjectDispatcher<I>
where
    I: Iterator<Item = std::result::Result<RenderedManifest, E>>,
    KubeError: From<E>,
{
}

/// Dispatcher over manifests that are already in memory
pub fn from_manifests(
    manifests: Vec<RenderedManifest>,
) -> ObjectDispatcher<impl Iterator<Item = Result<RenderedManifest>>> {
    ObjectDispatcher::new(manifests.into_iter().map(Ok))
}

/// Invoke `on_object` once per non-empty document, in order.
///
/// Dispatch errors are converted into `E`; errors returned by `on_object` stop
/// the loop and are returned as they are.
pub fn dispatch<I, U, E, F>(manifests: I, mut on_object: F) -> std::result::Result<(), E>
where
    I: IntoIterator<Item = std::result::Result<RenderedManifest, U>>,
    KubeError: From<U>,
    E: From<KubeError>,
    F: FnMut(&str, Document) -> std::result::Result<(), E>,
{
    for object in ObjectDispatcher::new(manifests.into_iter()) {
        let object = object?;
        tracing::debug!(source = %object.source, index = object.index, gvk = %object.gvk, "dispatching object");
        on_object(&object.source, object.document)?;
    }
    Ok(())
}

/// Split a manifest at `---` separator lines
pub fn split_documents(content: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if is_separator(line) {
            documents.push(std::mem::take(&mut current));
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    documents.push(current);

    documents
}

fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line == "---" || line.starts_with("--- #")
}

/// Blank documents hold nothing but whitespace and comments
fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

fn parse_document(source: &str, index: usize, text: &str) -> Result<Option<DispatchedObject>> {
    if is_blank(text) {
        return Ok(None);
    }

    let parse_error = |message: String| KubeError::Parse {
        source_name: source.to_string(),
        index,
        message,
    };

    let value: JsonValue = serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?;

    match &value {
        JsonValue::Null => return Ok(None),
        JsonValue::Object(_) => {}
        other => {
            return Err(parse_error(format!(
                "expected a mapping but found a {}",
                type_name(other)
            )));
        }
    }

    let document = Document::from(value);
    let api_version = required_str(&document, "apiVersion").map_err(&parse_error)?;
    let kind = required_str(&document, "kind").map_err(&parse_error)?;
    let gvk = Gvk::from_api_version(api_version, kind);

    Ok(Some(DispatchedObject {
        source: source.to_string(),
        index,
        document,
        gvk,
    }))
}

fn required_str<'a>(document: &'a Document, field: &str) -> std::result::Result<&'a str, String> {
    match document.get_path(&[field]) {
        Some(JsonValue::String(s)) if !s.is_empty() => Ok(s.as_str()),
        Some(JsonValue::String(_)) => Err(format!("'{field}' is empty")),
        Some(other) => Err(format!("'{field}' must be a string, it is a {}", type_name(other))),
        None => Err(format!("missing '{field}'")),
    }
}
