use serde::Deserialize;
use std::collections::HashMap;

pub const EMPTY_VALUE: &str = "—";

/// A related post (school, sponsor) after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostRef {
    pub id: u64,
    pub title: String,
}

/// Raw custom field as exported by the CMS. A relationship can arrive as a
/// post object, a list of them, a bare post id, or nothing at all; empty
/// fields are exported as `false` or `null`. Shapes we don't understand land
/// in `Other` and resolve to nothing.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    Post {
        #[serde(alias = "ID")]
        id: u64,
        #[serde(alias = "post_title", alias = "name", default)]
        title: String,
    },
    List(Vec<FieldValue>),
    Number(f64),
    Text(String),
    Flag(bool),
    #[default]
    Missing,
    Other(serde_json::Value),
}

impl FieldValue {
    pub fn text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Number(n) => format_plain_number(*n),
            FieldValue::Post { title, .. } => title.clone(),
            FieldValue::List(items) => items.first().map(FieldValue::text).unwrap_or_default(),
            FieldValue::Flag(_) | FieldValue::Missing | FieldValue::Other(_) => String::new(),
        }
    }

    pub fn number(&self) -> f64 {
        match self {
            FieldValue::Number(n) if n.is_finite() => *n,
            FieldValue::Text(s) => parse_number(s),
            _ => 0.0,
        }
    }

    pub fn resolve_post(&self, titles: &HashMap<u64, String>) -> Option<PostRef> {
        match self {
            FieldValue::Post { id, title } => {
                let title = if title.is_empty() {
                    titles.get(id).cloned().unwrap_or_default()
                } else {
                    title.clone()
                };
                Some(PostRef { id: *id, title })
            }
            FieldValue::List(items) => items.first().and_then(|f| f.resolve_post(titles)),
            FieldValue::Number(n) if *n > 0.0 && n.fract() == 0.0 => Some(Self::by_id(*n as u64, titles)),
            FieldValue::Text(s) => s.trim().parse::<u64>().ok().filter(|id| *id > 0).map(|id| Self::by_id(id, titles)),
            _ => None,
        }
    }

    /// Every element of a multi-value relationship. A single value counts as one.
    pub fn resolve_posts(&self, titles: &HashMap<u64, String>) -> Vec<PostRef> {
        match self {
            FieldValue::List(items) => items.iter().filter_map(|f| f.resolve_post(titles)).collect(),
            other => other.resolve_post(titles).into_iter().collect(),
        }
    }

    fn by_id(id: u64, titles: &HashMap<u64, String>) -> PostRef {
        PostRef {
            id,
            title: titles.get(&id).cloned().unwrap_or_default(),
        }
    }
}

pub fn text_of(field: &Option<FieldValue>) -> String {
    field.as_ref().map(FieldValue::text).unwrap_or_default()
}

/// First non-zero number of a fallback chain, 0 when all are empty.
pub fn first_number(chain: &[&Option<FieldValue>]) -> f64 {
    chain
        .iter()
        .filter_map(|f| f.as_ref())
        .map(FieldValue::number)
        .find(|n| *n != 0.0)
        .unwrap_or(0.0)
}

/// Lenient number parsing for exported values such as "$1,500,000".
pub fn parse_number(s: &str) -> f64 {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '_' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Money shorthand used across the site: $1.5M, $500K, $2.8B.
pub fn format_value(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return EMPTY_VALUE.to_string();
    }
    if value >= 1_000_000_000.0 {
        format!("${:.1}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${}K", group_thousands((value / 1_000.0).round() as u64))
    } else {
        // Negative amounts keep the sign after the currency symbol: $-5,000
        let sign = if value < 0.0 { "-" } else { "" };
        format!("${sign}{}", group_thousands(value.abs().round() as u64))
    }
}

pub fn player_info(class_year: &str, height: &str, weight: &str) -> String {
    let weight = if weight.is_empty() {
        String::new()
    } else {
        format!("{weight} lbs")
    };
    [class_year, height, weight.as_str()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" · ")
}

pub fn initials(name: &str) -> String {
    name.chars().take(2).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles() -> HashMap<u64, String> {
        HashMap::from([(12, "Alabama".to_string()), (40, "Nike".to_string())])
    }

    #[test]
    fn resolves_every_relationship_shape() {
        let titles = titles();
        let object: FieldValue =
            serde_json::from_str(r#"{"ID": 12, "post_title": "Alabama"}"#).unwrap();
        let list: FieldValue = serde_json::from_str(r#"[{"id": 12, "title": "Alabama"}]"#).unwrap();
        let id: FieldValue = serde_json::from_str("12").unwrap();
        let id_text: FieldValue = serde_json::from_str(r#""12""#).unwrap();
        let empty: FieldValue = serde_json::from_str("false").unwrap();
        let null: FieldValue = serde_json::from_str("null").unwrap();

        let expected = Some(PostRef {
            id: 12,
            title: "Alabama".to_string(),
        });
        assert_eq!(object.resolve_post(&titles), expected);
        assert_eq!(list.resolve_post(&titles), expected);
        assert_eq!(id.resolve_post(&titles), expected);
        assert_eq!(id_text.resolve_post(&titles), expected);
        assert_eq!(empty.resolve_post(&titles), None);
        assert_eq!(null.resolve_post(&titles), None);
        assert_eq!(FieldValue::Text("Alabama".into()).resolve_post(&titles), None);
    }

    #[test]
    fn resolves_multi_value_relationships() {
        let sponsors: FieldValue = serde_json::from_str(r#"[40, {"ID": 41, "post_title": "Beats"}, false]"#).unwrap();
        let resolved = sponsors.resolve_posts(&titles());
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].title, "Nike");
        assert_eq!(resolved[1].title, "Beats");
    }

    #[test]
    fn unknown_shapes_resolve_to_nothing() {
        let titles = titles();
        let untitled: FieldValue = serde_json::from_str(r#"{"post_title": "Texas"}"#).unwrap();
        assert!(matches!(untitled, FieldValue::Other(_)));
        assert_eq!(untitled.resolve_post(&titles), None);
        assert_eq!(untitled.text(), "");
        assert_eq!(untitled.number(), 0.0);

        let sponsors: FieldValue =
            serde_json::from_str(r#"[{"name": "Beats"}, 40, {"nested": [1, 2]}]"#).unwrap();
        let resolved = sponsors.resolve_posts(&titles);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].title, "Nike");
    }

    #[test]
    fn text_and_number_default_to_empty() {
        assert_eq!(FieldValue::Missing.text(), "");
        assert_eq!(FieldValue::Flag(false).number(), 0.0);
        assert_eq!(FieldValue::Number(210.0).text(), "210");
        assert_eq!(FieldValue::Text("$1,500,000".into()).number(), 1_500_000.0);
        assert_eq!(text_of(&None), "");
    }

    #[test]
    fn nil_valuation_falls_back_to_valuation() {
        let nil = Some(FieldValue::Flag(false));
        let valuation = Some(FieldValue::Number(750_000.0));
        assert_eq!(first_number(&[&nil, &valuation]), 750_000.0);
        assert_eq!(first_number(&[&None, &None]), 0.0);
    }

    #[test]
    fn formats_money() {
        assert_eq!(format_value(0.0), "—");
        assert_eq!(format_value(950.0), "$950");
        assert_eq!(format_value(500_000.0), "$500K");
        assert_eq!(format_value(1_500_000.0), "$1.5M");
        assert_eq!(format_value(2_800_000_000.0), "$2.8B");
        assert_eq!(format_value(999_999_999.0), "$1000.0M");
        assert_eq!(format_value(-5_000.0), "$-5,000");
    }

    #[test]
    fn builds_player_info_and_initials() {
        assert_eq!(player_info("Junior", "6'2\"", "210"), "Junior · 6'2\" · 210 lbs");
        assert_eq!(player_info("", "", "195"), "195 lbs");
        assert_eq!(player_info("", "", ""), "");
        assert_eq!(initials("Arch Manning"), "Ar");
        assert_eq!(initials("J"), "J");
    }
}
