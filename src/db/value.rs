use std::borrow::Cow;
use std::sync::Arc;

use rust_decimal::Decimal;

/// Scalar value of one result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    /// Single-precision column, kept narrow so it prints as stored.
    Float32(f32),
    Float(f64),
    Decimal(Decimal),
    Text(String),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::UInt(_) | Self::Float32(_) | Self::Float(_) | Self::Decimal(_)
        )
    }

    /// Text form written to output files. Null renders as an empty string;
    /// floats keep a fractional part (`1.0`, not `1`).
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Int(v) => Cow::Owned(v.to_string()),
            Self::UInt(v) => Cow::Owned(v.to_string()),
            Self::Float32(v) => Cow::Owned(format!("{:?}", v)),
            Self::Float(v) => Cow::Owned(format!("{:?}", v)),
            Self::Decimal(v) => Cow::Owned(v.to_string()),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

/// One result tuple. Columns are shared by every row of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_and_numeric_classification() {
        assert_eq!(Value::Int(1).render(), "1");
        assert_eq!(Value::Float(1.5).render(), "1.5");
        assert_eq!(Value::Decimal(Decimal::new(1250, 2)).render(), "12.50");
        assert_eq!(Value::Null.render(), "");
        assert!(Value::UInt(3).is_numeric());
        assert!(Value::Float32(0.5).is_numeric());
        assert!(!Value::Text("1".into()).is_numeric());
        assert!(!Value::Null.is_numeric());
    }

    #[test]
    fn floats_print_without_widening_noise() {
        assert_eq!(Value::Float32(0.1).render(), "0.1");
        assert_eq!(Value::Float32(2.0).render(), "2.0");
        assert_eq!(Value::Float(1.0).render(), "1.0");
        assert_eq!(Value::Float(0.1).render(), "0.1");
    }

    #[test]
    fn row_lookup_by_column() {
        let cols: Arc<[String]> = vec!["ID".to_string(), "Name".to_string()].into();
        let row = Row::new(cols, vec![Value::Int(7), Value::Text("x".into())]);
        assert_eq!(row.get("Name"), Some(&Value::Text("x".into())));
        assert_eq!(row.get("name"), None);
        assert_eq!(row.values().len(), 2);
    }
}
