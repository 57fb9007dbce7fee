use crate::{EditorSession, JsonAdapter, SessionConfig};

/// Open a session over a scenario document held in memory.
///
/// # Example
///
/// ```rust
/// # use scenedit::doc_examples::open_document;
/// # use scenedit::{Action, PropertyValue};
/// let doc = br#"{
///   "tables": {"trees": {"T1": {"Name": "T1", "height": 8.0}}},
///   "geojsons": {"trees": {"type": "FeatureCollection", "features": [
///     {"type": "Feature", "properties": {"Name": "T1", "height": 8.0}, "geometry": null}
///   ]}}
/// }"#;
/// let (mut backend, mut session) = open_document(doc)?;
/// session.dispatch(Action::update("trees", ["T1"], [("height", 9.5)]))?;
/// assert_eq!(
///     session.store().value("trees", "T1", "height"),
///     Some(&PropertyValue::Number(9.5))
/// );
/// session.save(&mut backend)?;
/// assert!(!session.has_pending_changes());
/// # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
/// ```
pub fn open_document(
    bytes: &[u8],
) -> Result<(JsonAdapter, EditorSession), Box<dyn std::error::Error + Send + Sync>> {
    let mut backend = JsonAdapter::open_bytes(bytes.to_vec())?;
    let session = EditorSession::open(&mut backend, SessionConfig::default())?;
    Ok((backend, session))
}
