//! Annotation wire model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One annotation as returned by the API.
///
/// Only the fields the bridge reads or writes are modelled; everything else in
/// the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(default, rename = "target", skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<Target>,
    /// Ancestor ids, thread root first, immediate parent last.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl Annotation {
    /// Body for creating a group-visible reply.
    pub fn reply_template(
        text: impl Into<String>,
        group: impl Into<String>,
        references: Vec<String>,
        uri: impl Into<String>,
    ) -> Self {
        let group = group.into();
        Self {
            uri: uri.into(),
            text: text.into(),
            permissions: Some(Permissions {
                read: vec![format!("group:{}", group)],
                ..Permissions::default()
            }),
            group,
            references,
            ..Self::default()
        }
    }

    /// Id of the annotation this one replies to, if any.
    pub fn parent_id(&self) -> Option<&str> {
        self.references.last().map(String::as_str)
    }

    /// Quoted text of the first target, if it has a text-quote selector.
    pub fn quote(&self) -> Option<&str> {
        self.targets
            .first()
            .and_then(|t| t.selectors.text_quote.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
}

/// The part of a document an annotation is anchored to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub source: String,
    #[serde(default, rename = "selector")]
    pub selectors: Selectors,
}

/// Decoded selector list. Only the text quote matters to the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    /// `exact` of the first `TextQuoteSelector`.
    pub text_quote: Option<String>,
}

const TEXT_QUOTE_SELECTOR: &str = "TextQuoteSelector";

#[derive(Serialize, Deserialize)]
struct RawSelector {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exact: Option<String>,
}

impl<'de> Deserialize<'de> for Selectors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Vec<RawSelector> = Deserialize::deserialize(deserializer)?;
        let text_quote = raw
            .into_iter()
            .find(|s| s.kind == TEXT_QUOTE_SELECTOR)
            .and_then(|s| s.exact);
        Ok(Self { text_quote })
    }
}

impl Serialize for Selectors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw: Vec<RawSelector> = self
            .text_quote
            .iter()
            .map(|exact| RawSelector {
                kind: TEXT_QUOTE_SELECTOR.to_string(),
                exact: Some(exact.clone()),
            })
            .collect();
        raw.serialize(serializer)
    }
}

/// API timestamp format: RFC 3339 with microseconds and a numeric offset,
/// e.g. `2022-09-01T00:00:00.000000+00:00`.
pub mod timestamp {
    use chrono::{DateTime, Utc};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

    /// Render a timestamp the way the API expects it in `search_after`.
    pub fn format(t: &DateTime<Utc>) -> String {
        t.format(FORMAT).to_string()
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
    }

    /// `#[serde(with)]` adapter for optional timestamps.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(t) => serializer.serialize_str(&super::format(t)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SEARCH_ROW: &str = r#"{
        "id": "a2",
        "created": "2022-09-01T10:00:00.000000+00:00",
        "updated": "2022-09-01T12:30:05.250000+02:00",
        "user": "acct:alice@hypothes.is",
        "uri": "https://example.com/paper",
        "text": "Good point",
        "group": "g1",
        "permissions": {"read": ["group:g1"], "admin": ["acct:alice@hypothes.is"]},
        "target": [{
            "source": "https://example.com/paper",
            "selector": [
                {"type": "RangeSelector", "startContainer": "/p[1]"},
                {"type": "TextQuoteSelector", "exact": "the quoted bit", "prefix": "x"},
                {"type": "TextQuoteSelector", "exact": "second quote"}
            ]
        }],
        "references": ["a0", "a1"],
        "tags": []
    }"#;

    #[test]
    fn decodes_search_row() {
        let annot: Annotation = serde_json::from_str(SEARCH_ROW).unwrap();
        assert_eq!(annot.id, "a2");
        assert_eq!(
            annot.updated,
            Some(
                Utc.with_ymd_and_hms(2022, 9, 1, 10, 30, 5).unwrap()
                    + chrono::Duration::milliseconds(250)
            )
        );
        assert_eq!(annot.quote(), Some("the quoted bit"));
        assert_eq!(annot.parent_id(), Some("a1"));
        assert_eq!(annot.permissions.unwrap().read, vec!["group:g1"]);
    }

    #[test]
    fn missing_fields_default() {
        let annot: Annotation = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(annot.updated.is_none());
        assert!(annot.quote().is_none());
        assert!(annot.parent_id().is_none());
    }

    #[test]
    fn target_without_text_quote() {
        let annot: Annotation = serde_json::from_str(
            r#"{"id": "x", "target": [{"source": "s", "selector": [{"type": "FragmentSelector"}]}]}"#,
        )
        .unwrap();
        assert!(annot.quote().is_none());
    }

    #[test]
    fn untyped_selector_is_skipped() {
        let annot: Annotation = serde_json::from_str(
            r#"{"id": "x", "target": [{"source": "s", "selector": [
                {"exact": "q"},
                {"type": "TextQuoteSelector", "exact": "q2"}
            ]}]}"#,
        )
        .unwrap();
        assert_eq!(annot.quote(), Some("q2"));
    }

    #[test]
    fn reply_template_body() {
        let body = serde_json::to_value(Annotation::reply_template(
            "Bob wrote \"hi\"",
            "g1",
            vec!["a0".to_string()],
            "https://example.com/paper",
        ))
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "uri": "https://example.com/paper",
                "text": "Bob wrote \"hi\"",
                "group": "g1",
                "permissions": {"read": ["group:g1"]},
                "references": ["a0"]
            })
        );
    }

    #[test]
    fn timestamp_format_has_micros_and_offset() {
        let t = Utc.with_ymd_and_hms(2022, 9, 1, 0, 0, 0).unwrap();
        assert_eq!(timestamp::format(&t), "2022-09-01T00:00:00.000000+00:00");
        assert_eq!(timestamp::parse(&timestamp::format(&t)).unwrap(), t);
    }
}
