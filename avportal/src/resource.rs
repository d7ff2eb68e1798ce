//! AV Portal resource value object
//!
//! A [`Resource`] wraps one raw `doc` entry from the AV Portal search
//! envelope. The service returns deeply nested, loosely shaped JSON (locale
//! maps with varying keys, optional nested objects), so the raw payload is
//! kept as a generic JSON map and all type-narrowing lives in the accessors:
//! a missing key, a wrong shape or an empty map is a regular `None`/empty
//! outcome, never an error.
//!
//! The only construction requirement is the `ref` field; everything else is
//! optional.

use crate::error::{Error, Result};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::fmt;

/// Maximum title length, bound by typical short-text storage downstream
const MAX_TITLE_LENGTH: usize = 255;

/// Language code tried first for video thumbnails (international version)
const INTERNATIONAL_LANGCODE: &str = "INT";

/// Fallback language for titles and thumbnails
const FALLBACK_LANGCODE: &str = "EN";

/// Photo/reportage thumbnail resolutions, in preference order: the medium
/// rendition is the intended thumbnail size, with low and high as fallbacks.
const THUMBNAIL_RESOLUTIONS: [&str; 3] = ["MED", "LOW", "HIGH"];

/// The closed set of asset types served by the AV Portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    Video,
    Photo,
    Reportage,
}

impl AssetType {
    /// All supported asset types
    pub const ALL: [AssetType; 3] = [AssetType::Video, AssetType::Photo, AssetType::Reportage];

    /// The wire representation of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Video => "VIDEO",
            AssetType::Photo => "PHOTO",
            AssetType::Reportage => "REPORTAGE",
        }
    }

    /// Case-insensitive parse of a wire value
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "VIDEO" => Some(AssetType::Video),
            "PHOTO" => Some(AssetType::Photo),
            "REPORTAGE" => Some(AssetType::Reportage),
            _ => None,
        }
    }

    /// The allowed set as a comma-separated list ("VIDEO,PHOTO,REPORTAGE")
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(AssetType::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidAssetType {
            requested: s.to_string(),
            allowed: AssetType::allowed_list(),
        })
    }
}

/// Immutable wrapper around one AV Portal record (video, photo or reportage)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    data: Map<String, Value>,
}

impl Resource {
    /// Wraps a raw record, failing when the `ref` identifier is missing.
    pub fn new(data: Map<String, Value>) -> Result<Self> {
        match data.get("ref") {
            Some(Value::String(reference)) if !reference.is_empty() => Ok(Self { data }),
            _ => Err(Error::InvalidResource),
        }
    }

    /// Wraps a raw JSON value; anything but an object with a `ref` is invalid.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Self::new(data),
            _ => Err(Error::InvalidResource),
        }
    }

    /// The opaque resource reference (e.g. `I-162747`, `P-038924/00-15`)
    pub fn reference(&self) -> &str {
        self.data
            .get("ref")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The raw `type` field as sent by the service, if any
    pub fn type_str(&self) -> Option<&str> {
        self.data.get("type").and_then(Value::as_str)
    }

    /// The parsed asset type, `None` when absent or unknown
    pub fn asset_type(&self) -> Option<AssetType> {
        self.type_str().and_then(AssetType::parse)
    }

    /// The full-size photo path (`media_json.HIGH.PATH`), or `""`
    pub fn photo_uri(&self) -> String {
        self.data
            .get("media_json")
            .and_then(|media| media.get("HIGH"))
            .and_then(|high| high.get("PATH"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Resolves the resource title for a language.
    ///
    /// Fallback chain: requested langcode, then `EN`, then the first entry of
    /// `titles_json` in payload order. Entries that are not scalar strings or
    /// numbers (null, booleans, nested structures) are dropped silently. The
    /// result has HTML entities decoded, tags stripped, and is truncated to
    /// 255 characters at a word boundary with a trailing ellipsis.
    pub fn title(&self, langcode: &str) -> Option<String> {
        let titles = self.data.get("titles_json")?.as_object()?;

        let titles: Vec<(&String, String)> = titles
            .iter()
            .filter_map(|(code, value)| scalar_text(value).map(|text| (code, text)))
            .collect();
        if titles.is_empty() {
            return None;
        }

        let picked = titles
            .iter()
            .find(|(code, _)| code.as_str() == langcode)
            .or_else(|| {
                titles
                    .iter()
                    .find(|(code, _)| code.as_str() == FALLBACK_LANGCODE)
            })
            .unwrap_or(&titles[0]);

        let cleaned = strip_tags(&decode_entities(&picked.1));
        Some(truncate_at_word_boundary(&cleaned, MAX_TITLE_LENGTH))
    }

    /// Resolves the thumbnail URL for this resource, if any.
    ///
    /// Dispatches on the asset type: videos go through the per-language media
    /// map, photos and reportages through the resolution map. The site
    /// default language only matters for videos.
    pub fn thumbnail_url(&self, site_langcode: &str) -> Option<String> {
        let media = self.data.get("media_json")?.as_object()?;

        match self.asset_type()? {
            AssetType::Video => self.video_thumbnail_url(media, site_langcode),
            AssetType::Photo | AssetType::Reportage => photo_thumbnail_url(media),
        }
    }

    /// The raw backing record, for fields without a typed accessor
    /// (`summary_json`, `duration`, `shootstartdate`, ...)
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Video thumbnails live under the first aspect-ratio entry, keyed by
    /// language. Tried in order: INT, the uppercased site language, EN, then
    /// the languages the resource itself declares, de-duplicated.
    fn video_thumbnail_url(
        &self,
        media: &Map<String, Value>,
        site_langcode: &str,
    ) -> Option<String> {
        let first_aspect_ratio = media.values().next()?.as_object()?;

        let mut langcodes: IndexSet<String> = IndexSet::new();
        langcodes.insert(INTERNATIONAL_LANGCODE.to_string());
        langcodes.insert(site_langcode.to_uppercase());
        langcodes.insert(FALLBACK_LANGCODE.to_string());
        if let Some(languages) = self.data.get("languages").and_then(Value::as_array) {
            for language in languages.iter().filter_map(Value::as_str) {
                if !language.is_empty() {
                    langcodes.insert(language.to_string());
                }
            }
        }

        for langcode in &langcodes {
            if let Some(thumb) = first_aspect_ratio
                .get(langcode)
                .and_then(|entry| entry.get("THUMB"))
                .and_then(Value::as_str)
            {
                return url_path(thumb);
            }
        }

        None
    }
}

/// Photo thumbnails are picked by resolution preference, first PATH wins.
fn photo_thumbnail_url(media: &Map<String, Value>) -> Option<String> {
    for resolution in THUMBNAIL_RESOLUTIONS {
        if let Some(path) = media
            .get(resolution)
            .and_then(|entry| entry.get("PATH"))
            .and_then(Value::as_str)
        {
            return Some(path.to_string());
        }
    }
    None
}

/// Scalar titles are kept as-is; numbers are stringified; booleans, nulls and
/// nested structures are dropped.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Everything before the query string or fragment, `None` when empty.
fn url_path(url: &str) -> Option<String> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Decodes well-formed HTML entities, leaving bare ampersands and malformed
/// sequences untouched (the service mixes encoded markup with plain text).
fn decode_entities(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let candidate_end = tail[1..].find(';').map(|i| i + 1);

        match candidate_end {
            Some(end) if end > 1 && tail[1..end].bytes().all(is_entity_byte) => {
                let candidate = &tail[..=end];
                match htmlescape::decode_html(candidate) {
                    Ok(decoded) => {
                        output.push_str(&decoded);
                        rest = &tail[end + 1..];
                    }
                    Err(_) => {
                        output.push('&');
                        rest = &tail[1..];
                    }
                }
            }
            _ => {
                output.push('&');
                rest = &tail[1..];
            }
        }
    }

    output.push_str(rest);
    output
}

fn is_entity_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'#'
}

/// Removes `<...>` tag sequences; an unterminated tag swallows the rest.
fn strip_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_tag = false;

    for character in input.chars() {
        match character {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => output.push(c),
            _ => {}
        }
    }

    output
}

/// Truncates to at most `max_chars` characters without cutting a word,
/// appending an ellipsis when truncation happened.
fn truncate_at_word_boundary(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    // Reserve one character for the ellipsis, then drop the trailing partial
    // word together with the whitespace run before it.
    let budget = max_chars - 1;
    let prefix: String = input.chars().take(budget + 1).collect();
    let last_whitespace = prefix
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(index, _)| index)
        .last();

    let mut truncated = match last_whitespace {
        Some(index) => prefix[..index].trim_end().to_string(),
        None => prefix.chars().take(budget).collect(),
    };
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(value: Value) -> Resource {
        Resource::from_value(value).unwrap()
    }

    #[test]
    fn test_construction_requires_ref() {
        assert!(matches!(
            Resource::from_value(json!({"type": "VIDEO"})),
            Err(Error::InvalidResource)
        ));
        assert!(matches!(
            Resource::from_value(json!("not an object")),
            Err(Error::InvalidResource)
        ));
        assert!(matches!(
            Resource::from_value(json!({"ref": ""})),
            Err(Error::InvalidResource)
        ));

        let resource = resource(json!({"ref": "I-162747"}));
        assert_eq!(resource.reference(), "I-162747");
    }

    #[test]
    fn test_asset_type_parsing() {
        assert_eq!(AssetType::parse("video"), Some(AssetType::Video));
        assert_eq!(AssetType::parse("PHOTO"), Some(AssetType::Photo));
        assert_eq!(AssetType::parse("Reportage"), Some(AssetType::Reportage));
        assert_eq!(AssetType::parse("VIDEOSHOT"), None);
        assert_eq!(AssetType::allowed_list(), "VIDEO,PHOTO,REPORTAGE");

        let resource = resource(json!({"ref": "I-1", "type": "VIDEO"}));
        assert_eq!(resource.type_str(), Some("VIDEO"));
        assert_eq!(resource.asset_type(), Some(AssetType::Video));
    }

    #[test]
    fn test_title_missing_or_malformed_titles_json() {
        assert_eq!(resource(json!({"ref": "P-1"})).title("EN"), None);
        assert_eq!(
            resource(json!({"ref": "P-1", "titles_json": "invalid title"})).title("EN"),
            None
        );
        assert_eq!(
            resource(json!({"ref": "P-1", "titles_json": {}})).title("EN"),
            None
        );
        assert_eq!(
            resource(json!({"ref": "P-1", "titles_json": {"FR": null, "EN": null}})).title("FR"),
            None
        );
    }

    #[test]
    fn test_title_drops_non_scalar_entries() {
        // Booleans and nested values are not titles.
        assert_eq!(
            resource(json!({"ref": "P-1", "titles_json": {"IT": false}})).title("IT"),
            None
        );
        assert_eq!(
            resource(json!({"ref": "P-1", "titles_json": {"EN": ["English title."]}})).title("EN"),
            None
        );
        // A "0" string is a perfectly valid title.
        assert_eq!(
            resource(json!({"ref": "P-1", "titles_json": {"IT": "0"}})).title("IT"),
            Some("0".to_string())
        );
        // Numbers are stringified.
        assert_eq!(
            resource(json!({"ref": "P-1", "titles_json": {"IT": 42}})).title("IT"),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_title_language_fallback_chain() {
        // Requested language present.
        let data = json!({"ref": "P-1", "titles_json": {"EN": "English title.", "FR": "French title."}});
        assert_eq!(resource(data).title("FR"), Some("French title.".to_string()));

        // Requested language missing, EN fallback.
        let data = json!({"ref": "P-1", "titles_json": {"IT": "Italian title.", "EN": "English title."}});
        assert_eq!(resource(data).title("FR"), Some("English title.".to_string()));

        // Neither requested nor EN: first entry in payload order.
        let data = json!({"ref": "P-1", "titles_json": {"IT": "Italian title.", "DE": "German title."}});
        assert_eq!(resource(data).title("FR"), Some("Italian title.".to_string()));

        let data = json!({"ref": "P-1", "titles_json": {"DE": "German title.", "IT": "Italian title."}});
        assert_eq!(resource(data).title("FR"), Some("German title.".to_string()));

        // Default language is EN.
        let data = json!({"ref": "P-1", "titles_json": {"FR": "French title.", "EN": "English title."}});
        assert_eq!(resource(data).title("EN"), Some("English title.".to_string()));

        let data = json!({"ref": "P-1", "titles_json": {"FR": "French title.", "IT": "Italian title."}});
        assert_eq!(resource(data).title("EN"), Some("French title.".to_string()));
    }

    #[test]
    fn test_title_decodes_entities_and_strips_markup() {
        let data = json!({"ref": "P-1", "titles_json": {
            "FR": "French title <br />&lt;strong&gt;with&lt;/strong&gt; markup, encoded &#39;characters&#39; &amp; letters čö&įię."
        }});
        assert_eq!(
            resource(data).title("FR"),
            Some("French title with markup, encoded 'characters' & letters čö&įię.".to_string())
        );
    }

    #[test]
    fn test_title_truncated_at_word_boundary() {
        let data = json!({"ref": "P-047441/00-05", "titles_json": {
            "FR": "Conférence de presse de Margrethe Vestager, vice-présidente exécutive de la Commission européenne, sur un cas de pratique anti-concurrentielle :<br /> la Commission a infligé des amendes à Teva et à Cephalon pour avoir retardé l&#39;entrée sur le marché d&#39;un médicament générique moins cher"
        }});
        let title = resource(data).title("EN").unwrap();
        assert_eq!(
            title,
            "Conférence de presse de Margrethe Vestager, vice-présidente exécutive de la Commission européenne, sur un cas de pratique anti-concurrentielle : la Commission a infligé des amendes à Teva et à Cephalon pour avoir retardé l'entrée sur le marché d'un…"
        );
        assert!(title.chars().count() <= 255);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn test_title_of_exactly_255_characters_is_untouched() {
        let data = json!({"ref": "P-047441/00-05", "titles_json": {
            "FR": "Conférence de presse de Margrethe Vestager, vice-présidente exécutive de la Commission européenne, sur un cas de pratique anti-concurrentielle :<br /> la Commission a infligé des amendes à Teva et à Cephalon pour avoir retardé l&#39;entrée sur le marché d&#39;un to255"
        }});
        let title = resource(data).title("EN").unwrap();
        assert!(!title.ends_with('…'));
        assert!(title.ends_with("to255"));
    }

    fn photo_data(media_json: Value) -> Value {
        json!({"ref": "P-038924/00-15", "type": "PHOTO", "media_json": media_json})
    }

    #[test]
    fn test_photo_thumbnail_resolution_order() {
        let all = json!({
            "MED": {"PIXH": 426, "PIXL": 640, "PATH": "medium.jpg"},
            "HIGH": {"PIXH": 3455, "PIXL": 5183, "PATH": "high.jpg"},
            "LOW": {"PIXH": 133, "PIXL": 200, "PATH": "low.jpg"},
        });

        // Medium wins when all resolutions are present.
        assert_eq!(
            resource(photo_data(all.clone())).thumbnail_url("EN"),
            Some("medium.jpg".to_string())
        );

        let mut without_med = all.clone();
        without_med.as_object_mut().unwrap().remove("MED");
        assert_eq!(
            resource(photo_data(without_med.clone())).thumbnail_url("EN"),
            Some("low.jpg".to_string())
        );

        without_med.as_object_mut().unwrap().remove("LOW");
        assert_eq!(
            resource(photo_data(without_med.clone())).thumbnail_url("EN"),
            Some("high.jpg".to_string())
        );

        without_med.as_object_mut().unwrap().remove("HIGH");
        assert_eq!(resource(photo_data(without_med)).thumbnail_url("EN"), None);
    }

    #[test]
    fn test_reportage_uses_photo_resolution_order() {
        let data = json!({"ref": "P-1", "type": "REPORTAGE", "media_json": {
            "LOW": {"PATH": "low.jpg"},
            "HIGH": {"PATH": "high.jpg"},
        }});
        assert_eq!(resource(data).thumbnail_url("EN"), Some("low.jpg".to_string()));
    }

    #[test]
    fn test_video_thumbnail_language_preference() {
        let data = json!({"ref": "I-1", "type": "VIDEO", "media_json": {
            "16:9": {
                "EN": {"THUMB": "http://example.com/en.jpg?size=med"},
                "INT": {"THUMB": "http://example.com/int.jpg?size=med"},
            }
        }});
        // INT wins over EN, and the query string is stripped.
        assert_eq!(
            resource(data).thumbnail_url("FR"),
            Some("http://example.com/int.jpg".to_string())
        );

        // Site default language is tried before EN.
        let data = json!({"ref": "I-1", "type": "VIDEO", "media_json": {
            "16:9": {
                "EN": {"THUMB": "http://example.com/en.jpg"},
                "FR": {"THUMB": "http://example.com/fr.jpg"},
            }
        }});
        assert_eq!(
            resource(data).thumbnail_url("fr"),
            Some("http://example.com/fr.jpg".to_string())
        );

        // Resource-declared languages are the last resort.
        let data = json!({"ref": "I-1", "type": "VIDEO",
            "languages": ["DE"],
            "media_json": {"16:9": {"DE": {"THUMB": "http://example.com/de.jpg"}}}});
        assert_eq!(
            resource(data).thumbnail_url("EN"),
            Some("http://example.com/de.jpg".to_string())
        );
    }

    #[test]
    fn test_thumbnail_url_tolerates_missing_media() {
        assert_eq!(resource(json!({"ref": "I-1", "type": "VIDEO"})).thumbnail_url("EN"), None);
        assert_eq!(
            resource(json!({"ref": "I-1", "type": "VIDEO", "media_json": "oops"})).thumbnail_url("EN"),
            None
        );
        // Unknown type: no dispatch target.
        assert_eq!(
            resource(json!({"ref": "X-1", "type": "AUDIO", "media_json": {}})).thumbnail_url("EN"),
            None
        );
    }

    #[test]
    fn test_photo_uri() {
        let data = json!({"ref": "P-1", "type": "PHOTO", "media_json": {
            "HIGH": {"PATH": "store/photo/high.jpg"}
        }});
        assert_eq!(resource(data).photo_uri(), "store/photo/high.jpg");
        assert_eq!(resource(json!({"ref": "P-1"})).photo_uri(), "");
    }

    #[test]
    fn test_data_passthrough() {
        let resource = resource(json!({"ref": "I-1", "duration": 120, "summary_json": {"EN": "s"}}));
        assert_eq!(resource.data().get("duration"), Some(&json!(120)));
        assert_eq!(
            resource.data().get("summary_json").and_then(|s| s.get("EN")),
            Some(&json!("s"))
        );
    }
}
