use std::collections::HashMap;
use std::fmt;

pub const FILTER_POSITION: &str = "position";
pub const FILTER_SCHOOL: &str = "school";
pub const FILTER_KEYS: [&str; 2] = [FILTER_POSITION, FILTER_SCHOOL];

pub const SORT_RANK: &str = "rank";
pub const SORT_NAME: &str = "name";
pub const SORT_NIL: &str = "nil";

/// Sort fields of the athlete table, in header order.
pub fn athlete_sort_fields() -> Vec<SortField> {
    vec![
        SortField::new(SORT_RANK, SortKind::Numeric),
        SortField::new(SORT_NAME, SortKind::Text),
        SortField::new(SORT_NIL, SortKind::Numeric),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Text(String),
    Number(f64),
}

impl SortValue {
    pub fn as_number(&self) -> f64 {
        match self {
            SortValue::Number(n) if n.is_finite() => *n,
            SortValue::Number(_) => 0.0,
            SortValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            SortValue::Text(s) => s.to_lowercase(),
            SortValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        SortValue::Text(value.to_string())
    }
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        SortValue::Text(value)
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        SortValue::Number(value)
    }
}

impl From<usize> for SortValue {
    fn from(value: usize) -> Self {
        SortValue::Number(value as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Text,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub kind: SortKind,
}

impl SortField {
    pub fn new(name: &str, kind: SortKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// One displayable entity. Values are plain strings or numbers by the time a
/// row exists; shape normalization happens in `fields`.
#[derive(Debug, Clone)]
pub struct Row {
    id: RowId,
    search_parts: Vec<String>,
    searchable_text: String,
    attributes: HashMap<String, String>,
    sort_values: HashMap<String, SortValue>,
}

impl Row {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            search_parts: Vec::new(),
            searchable_text: String::new(),
            attributes: HashMap::new(),
            sort_values: HashMap::new(),
        }
    }

    pub fn with_search_part(mut self, part: &str) -> Self {
        self.search_parts.push(part.to_lowercase());
        self.searchable_text = self.search_parts.join(" ");
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes
            .insert(key.to_string(), value.trim().to_lowercase());
        self
    }

    pub fn with_sort_value(mut self, key: &str, value: impl Into<SortValue>) -> Self {
        self.sort_values.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn searchable_text(&self) -> &str {
        &self.searchable_text
    }

    pub fn attribute(&self, key: &str) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn sort_value(&self, key: &str) -> Option<&SortValue> {
        self.sort_values.get(key)
    }

    pub fn sort_number(&self, key: &str) -> f64 {
        self.sort_value(key).map(SortValue::as_number).unwrap_or(0.0)
    }

    pub fn sort_text(&self, key: &str) -> String {
        self.sort_value(key)
            .map(SortValue::as_text)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn searchable_text_is_lowercased_join() {
        let row = Row::new(RowId(1))
            .with_search_part("Bobby Jones")
            .with_search_part("QB")
            .with_search_part("Alabama");
        assert_eq!(row.searchable_text(), "bobby jones qb alabama");
    }

    #[test]
    fn missing_values_default_to_empty_and_zero() {
        let row = Row::new(RowId(7)).with_sort_value(SORT_NIL, "not a number");
        assert_eq!(row.attribute(FILTER_SCHOOL), "");
        assert_eq!(row.sort_number(SORT_NIL), 0.0);
        assert_eq!(row.sort_number(SORT_RANK), 0.0);
        assert_eq!(row.sort_text(SORT_NAME), "");
    }

    #[test]
    fn numeric_text_parses() {
        assert_eq!(SortValue::from(" 1500000 ").as_number(), 1_500_000.0);
        assert_eq!(SortValue::Number(f64::NAN).as_number(), 0.0);
        assert_eq!(SortValue::from("Mixed Case").as_text(), "mixed case");
    }
}
