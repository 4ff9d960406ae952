use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Flat mapping of namespaced metadata keys (`XMP-xmp:Rating`, `EXIF:Artist`, ...)
/// to their values for one file.
pub type MetadataMap = BTreeMap<String, MetaValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

/// A metadata value as it arrives from a reader. The same logical field can be a
/// scalar in one file, a list in another and a structure in a third.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Scalar(Scalar),
    List(Vec<MetaValue>),
    Structure(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn text(value: impl Into<String>) -> Self {
        MetaValue::Scalar(Scalar::Text(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        MetaValue::Scalar(Scalar::Integer(value))
    }

    pub fn float(value: f64) -> Self {
        MetaValue::Scalar(Scalar::Float(value))
    }

    pub fn list_of_text<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetaValue::List(values.into_iter().map(MetaValue::text).collect())
    }

    /// Convert a JSON value into a `MetaValue`. `null` (and nulls nested inside
    /// arrays or objects) is treated as absent.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(MetaValue::Scalar(Scalar::Bool(b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(MetaValue::integer(i)),
                None => n.as_f64().map(MetaValue::float),
            },
            Value::String(s) => Some(MetaValue::text(s)),
            Value::Array(items) => Some(MetaValue::List(
                items.into_iter().filter_map(MetaValue::from_json).collect(),
            )),
            Value::Object(fields) => Some(MetaValue::Structure(
                fields
                    .into_iter()
                    .filter_map(|(k, v)| MetaValue::from_json(v).map(|v| (k, v)))
                    .collect(),
            )),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            MetaValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MetaValue]> {
        match self {
            MetaValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&BTreeMap<String, MetaValue>> {
        match self {
            MetaValue::Structure(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, MetaValue::Scalar(_))
    }

    /// Lenient integer reading used for rating fields. Floats are truncated and
    /// text is parsed after trimming; anything else is `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Scalar(Scalar::Integer(i)) => Some(*i),
            MetaValue::Scalar(Scalar::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
            MetaValue::Scalar(Scalar::Text(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Whether the value counts as present: blank text and empty
    /// lists/structures do not.
    pub fn is_present(&self) -> bool {
        match self {
            MetaValue::Scalar(Scalar::Text(s)) => !s.trim().is_empty(),
            MetaValue::Scalar(_) => true,
            MetaValue::List(items) => !items.is_empty(),
            MetaValue::Structure(fields) => !fields.is_empty(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(v) => f.write_str(&format_float(*v)),
            Scalar::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
        }
    }
}

/// Renders the value the way it lands in a CSV cell: scalars as-is, lists of
/// scalars joined with `"; "`, anything nested as JSON.
impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Scalar(s) => s.fmt(f),
            MetaValue::List(items) if items.iter().all(MetaValue::is_scalar) => {
                let joined: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                f.write_str(&joined.join("; "))
            }
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// Whole floats keep one decimal place ("3.0") so a size of exactly one MB
/// still reads as a decimal quantity.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_drops_nulls() {
        let value = MetaValue::from_json(json!({
            "City": "Nashville",
            "Sublocation": null,
            "Tags": ["a", null, "b"],
        }))
        .unwrap();
        let fields = value.as_structure().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["Tags"], MetaValue::list_of_text(["a", "b"]));
        assert!(MetaValue::from_json(json!(null)).is_none());
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(MetaValue::from_json(json!(5)), Some(MetaValue::integer(5)));
        assert_eq!(MetaValue::from_json(json!(2.5)), Some(MetaValue::float(2.5)));
    }

    #[test]
    fn test_as_int_is_lenient() {
        assert_eq!(MetaValue::text(" 4 ").as_int(), Some(4));
        assert_eq!(MetaValue::float(3.9).as_int(), Some(3));
        assert_eq!(MetaValue::text("four").as_int(), None);
        assert_eq!(MetaValue::list_of_text(["1"]).as_int(), None);
    }

    #[test]
    fn test_is_present() {
        assert!(!MetaValue::text("   ").is_present());
        assert!(!MetaValue::List(vec![]).is_present());
        assert!(!MetaValue::Structure(BTreeMap::new()).is_present());
        assert!(MetaValue::integer(0).is_present());
        assert!(MetaValue::text("x").is_present());
    }

    #[test]
    fn test_display_cells() {
        assert_eq!(MetaValue::list_of_text(["a", "b"]).to_string(), "a; b");
        assert_eq!(MetaValue::float(3.0).to_string(), "3.0");
        assert_eq!(MetaValue::float(3.217).to_string(), "3.217");
        assert_eq!(MetaValue::Scalar(Scalar::Bool(true)).to_string(), "True");
        assert_eq!(MetaValue::Scalar(Scalar::Bool(false)).to_string(), "False");

        let mut fields = BTreeMap::new();
        fields.insert("City".to_string(), MetaValue::text("Paris"));
        let nested = MetaValue::List(vec![MetaValue::Structure(fields)]);
        assert_eq!(nested.to_string(), r#"[{"City":"Paris"}]"#);
    }
}
