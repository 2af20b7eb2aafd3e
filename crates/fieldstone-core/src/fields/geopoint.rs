use crate::{
    document::Document,
    error::EngineError,
    fields::{FieldContext, FieldKind},
    schema::ValueKind,
    value::Value,
};
use std::sync::Arc;

///
/// GeoPointKind
///
/// Stored as `[lng, lat]` (the order document stores index spatially);
/// text input arrives as `"lat, lng"` and `get_data` hands the pair
/// back in input order. Not filterable.
///

#[derive(Clone, Debug)]
pub struct GeoPointKind {
    path: String,
}

impl GeoPointKind {
    pub(crate) fn build(ctx: &FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError> {
        Ok(Arc::new(Self {
            path: ctx.path.to_string(),
        }))
    }

    /// Parse offered input into stored `[lng, lat]` order.
    fn parse(data: &Value) -> Option<(f64, f64)> {
        let (lat, lng) = match data {
            Value::Text(s) => {
                let mut parts = s.split(',').map(str::trim);
                let lat = parts.next()?.parse::<f64>().ok()?;
                let lng = parts.next()?.parse::<f64>().ok()?;
                if parts.next().is_some() {
                    return None;
                }
                (lat, lng)
            }
            // list input is already in stored [lng, lat] order
            Value::List(items) if items.len() == 2 => {
                let lng = Self::member(&items[0])?;
                let lat = Self::member(&items[1])?;
                (lat, lng)
            }
            _ => return None,
        };

        ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)).then_some((lng, lat))
    }

    #[expect(clippy::cast_precision_loss)]
    fn member(v: &Value) -> Option<f64> {
        match v {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl FieldKind for GeoPointKind {
    fn type_id(&self) -> &'static str {
        "geopoint"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::List
    }

    fn validate_input(&self, data: &Value) -> bool {
        match data {
            Value::Null => true,
            Value::Text(s) if s.trim().is_empty() => true,
            other => Self::parse(other).is_some(),
        }
    }

    fn update_item(&self, item: &mut Document, data: &Value) {
        match Self::parse(data) {
            Some((lng, lat)) => item.set(
                &self.path,
                Value::List(vec![Value::Float(lng), Value::Float(lat)]),
            ),
            None => item.set(&self.path, Value::Null),
        }
    }

    fn format(&self, item: &Document) -> String {
        match self.get_data(item) {
            Value::List(pair) => pair
                .iter()
                .map(|v| v.display_with(", "))
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        }
    }

    /// Reshape stored `[lng, lat]` back into input `[lat, lng]` order.
    fn get_data(&self, item: &Document) -> Value {
        match item.get(&self.path).as_list() {
            Some([lng, lat]) => Value::List(vec![lat.clone(), lng.clone()]),
            _ => Value::Null,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldOptions;

    fn kind() -> Arc<dyn FieldKind> {
        let options = FieldOptions::new();
        let ctx = FieldContext {
            list_key: "Place",
            path: "location",
            options: &options,
        };
        GeoPointKind::build(&ctx).unwrap()
    }

    #[test]
    fn text_input_swaps_to_stored_lng_lat() {
        let kind = kind();
        let mut doc = Document::new();
        kind.update_item(&mut doc, &Value::Text("51.5, -0.12".into()));
        assert_eq!(
            doc.get("location"),
            &Value::List(vec![Value::Float(-0.12), Value::Float(51.5)])
        );
    }

    #[test]
    fn get_data_reshapes_to_input_order() {
        let kind = kind();
        let mut doc = Document::new();
        kind.update_item(&mut doc, &Value::Text("51.5, -0.12".into()));
        assert_eq!(
            kind.get_data(&doc),
            Value::List(vec![Value::Float(51.5), Value::Float(-0.12)])
        );
        assert_eq!(kind.format(&doc), "51.5, -0.12");
    }

    #[test]
    fn out_of_range_coordinates_rejected() {
        let kind = kind();
        assert!(!kind.validate_input(&Value::Text("91.0, 0.0".into())));
        assert!(!kind.validate_input(&Value::Text("0.0, 181.0".into())));
        assert!(kind.validate_input(&Value::Text("-90.0, 180.0".into())));
    }

    #[test]
    fn not_filterable() {
        let kind = kind();
        assert!(kind.filter(&crate::filter::FilterSpec::default()).is_none());
    }
}
