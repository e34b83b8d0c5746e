//! Conversion between metadata values and their string representations.

use std::collections::HashMap;

use crate::error::TranslationError;
use crate::events::{ObjectValue, QName};

/// Translates the values of one data type.
pub trait ObjectTranslator: Send + Sync {
    fn data_type(&self) -> QName;

    fn representation_to_object(&self, representation: &str) -> Result<ObjectValue, TranslationError>;

    fn object_to_representation(&self, object: &ObjectValue) -> Result<String, TranslationError>;
}

fn invalid(data_type: &str, message: impl Into<String>) -> TranslationError {
    TranslationError::InvalidSourceData {
        data_type: data_type.to_string(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringTranslator;

impl ObjectTranslator for StringTranslator {
    fn data_type(&self) -> QName {
        QName::xsd("string")
    }

    fn representation_to_object(&self, representation: &str) -> Result<ObjectValue, TranslationError> {
        Ok(ObjectValue::String(representation.to_string()))
    }

    fn object_to_representation(&self, object: &ObjectValue) -> Result<String, TranslationError> {
        Ok(object.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanTranslator;

impl ObjectTranslator for BooleanTranslator {
    fn data_type(&self) -> QName {
        QName::xsd("boolean")
    }

    fn representation_to_object(&self, representation: &str) -> Result<ObjectValue, TranslationError> {
        match representation.trim() {
            "true" | "1" => Ok(ObjectValue::Boolean(true)),
            "false" | "0" => Ok(ObjectValue::Boolean(false)),
            other => Err(invalid("xsd:boolean", format!("\"{}\" is not a boolean", other))),
        }
    }

    fn object_to_representation(&self, object: &ObjectValue) -> Result<String, TranslationError> {
        match object {
            ObjectValue::Boolean(value) => Ok(value.to_string()),
            other => Err(invalid("xsd:boolean", format!("{:?} is not a boolean", other))),
        }
    }
}

/// Translator for the integer types. `local_part` is the XSD type name.
#[derive(Debug, Clone, Copy)]
pub struct IntegerTranslator {
    local_part: &'static str,
}

impl IntegerTranslator {
    pub fn new(local_part: &'static str) -> Self {
        Self { local_part }
    }
}

impl Default for IntegerTranslator {
    fn default() -> Self {
        Self::new("integer")
    }
}

impl ObjectTranslator for IntegerTranslator {
    fn data_type(&self) -> QName {
        QName::xsd(self.local_part)
    }

    fn representation_to_object(&self, representation: &str) -> Result<ObjectValue, TranslationError> {
        let trimmed = representation.trim();
        let value = trimmed
            .strip_prefix('+')
            .unwrap_or(trimmed)
            .parse::<i64>()
            .map_err(|err| invalid(&format!("xsd:{}", self.local_part), err.to_string()))?;
        if self.local_part == "int" && i32::try_from(value).is_err() {
            return Err(invalid("xsd:int", format!("{} is out of range", value)));
        }
        Ok(ObjectValue::Integer(value))
    }

    fn object_to_representation(&self, object: &ObjectValue) -> Result<String, TranslationError> {
        match object {
            ObjectValue::Integer(value) => Ok(value.to_string()),
            other => Err(invalid(
                &format!("xsd:{}", self.local_part),
                format!("{:?} is not an integer", other),
            )),
        }
    }
}

/// Translator for `xsd:double` and `xsd:decimal`.
#[derive(Debug, Clone, Copy)]
pub struct DoubleTranslator {
    local_part: &'static str,
}

impl DoubleTranslator {
    pub fn new(local_part: &'static str) -> Self {
        Self { local_part }
    }
}

impl Default for DoubleTranslator {
    fn default() -> Self {
        Self::new("double")
    }
}

impl ObjectTranslator for DoubleTranslator {
    fn data_type(&self) -> QName {
        QName::xsd(self.local_part)
    }

    fn representation_to_object(&self, representation: &str) -> Result<ObjectValue, TranslationError> {
        let value = match representation.trim() {
            "INF" => f64::INFINITY,
            "-INF" => f64::NEG_INFINITY,
            "NaN" => f64::NAN,
            other => other
                .parse::<f64>()
                .map_err(|err| invalid(&format!("xsd:{}", self.local_part), err.to_string()))?,
        };
        Ok(ObjectValue::Double(value))
    }

    fn object_to_representation(&self, object: &ObjectValue) -> Result<String, TranslationError> {
        match object {
            ObjectValue::Double(value) if value.is_infinite() => {
                Ok(if *value > 0.0 { "INF" } else { "-INF" }.to_string())
            }
            ObjectValue::Double(value) if value.is_nan() => Ok("NaN".to_string()),
            ObjectValue::Double(value) => Ok(value.to_string()),
            ObjectValue::Integer(value) => Ok(value.to_string()),
            other => Err(invalid(
                &format!("xsd:{}", self.local_part),
                format!("{:?} is not a number", other),
            )),
        }
    }
}

/// Whitespace separated lists. Elements are kept as strings unless they parse as
/// numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListTranslator;

impl ObjectTranslator for ListTranslator {
    fn data_type(&self) -> QName {
        QName::xsd("list")
    }

    fn representation_to_object(&self, representation: &str) -> Result<ObjectValue, TranslationError> {
        Ok(ObjectValue::List(
            representation
                .split_whitespace()
                .map(|item| {
                    if let Ok(value) = item.parse::<i64>() {
                        ObjectValue::Integer(value)
                    } else if let Ok(value) = item.parse::<f64>() {
                        ObjectValue::Double(value)
                    } else {
                        ObjectValue::String(item.to_string())
                    }
                })
                .collect(),
        ))
    }

    fn object_to_representation(&self, object: &ObjectValue) -> Result<String, TranslationError> {
        match object {
            ObjectValue::List(items) => {
                if items.iter().any(|item| matches!(item, ObjectValue::List(_))) {
                    return Err(TranslationError::UnsupportedOperation(
                        "Nested lists have no string representation".to_string(),
                    ));
                }
                Ok(object.to_string())
            }
            other => Err(invalid("xsd:list", format!("{:?} is not a list", other))),
        }
    }
}

/// Registry of translators by data type.
#[derive(Default)]
pub struct ObjectTranslatorFactory {
    translators: HashMap<QName, Box<dyn ObjectTranslator>>,
}

impl ObjectTranslatorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with translators for the XSD types `string`, `boolean`,
    /// `integer`, `long`, `int`, `double`, `decimal` and the list type.
    pub fn with_xsd_defaults() -> Self {
        let mut factory = Self::new();
        factory.add(Box::new(StringTranslator));
        factory.add(Box::new(BooleanTranslator));
        factory.add(Box::new(IntegerTranslator::new("integer")));
        factory.add(Box::new(IntegerTranslator::new("long")));
        factory.add(Box::new(IntegerTranslator::new("int")));
        factory.add(Box::new(DoubleTranslator::new("double")));
        factory.add(Box::new(DoubleTranslator::new("decimal")));
        factory.add(Box::new(ListTranslator));
        factory
    }

    /// Registers a translator, replacing one for the same data type.
    pub fn add(&mut self, translator: Box<dyn ObjectTranslator>) {
        self.translators.insert(translator.data_type(), translator);
    }

    pub fn get(&self, data_type: &QName) -> Option<&dyn ObjectTranslator> {
        self.translators.get(data_type).map(|translator| translator.as_ref())
    }

    /// Translates `representation` with the translator for `data_type`, or keeps it
    /// as a string if no translator is registered.
    pub fn translate(
        &self,
        data_type: &QName,
        representation: &str,
    ) -> Result<ObjectValue, TranslationError> {
        match self.get(data_type) {
            Some(translator) => translator.representation_to_object(representation),
            None => Ok(ObjectValue::String(representation.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_translators() {
        let factory = ObjectTranslatorFactory::with_xsd_defaults();
        assert_eq!(
            factory.translate(&QName::xsd("integer"), "+42").unwrap(),
            ObjectValue::Integer(42)
        );
        assert_eq!(
            factory.translate(&QName::xsd("double"), "0.25").unwrap(),
            ObjectValue::Double(0.25)
        );
        assert_eq!(
            factory.translate(&QName::xsd("boolean"), "1").unwrap(),
            ObjectValue::Boolean(true)
        );
        assert_eq!(
            factory
                .translate(&QName::new("http://example.org/", "custom"), "x")
                .unwrap(),
            ObjectValue::String("x".into())
        );
    }

    #[test]
    fn test_invalid_source_data() {
        let factory = ObjectTranslatorFactory::with_xsd_defaults();
        assert!(matches!(
            factory.translate(&QName::xsd("integer"), "abc"),
            Err(TranslationError::InvalidSourceData { .. })
        ));
        assert!(factory.translate(&QName::xsd("int"), "3000000000").is_err());
        assert!(factory.translate(&QName::xsd("long"), "3000000000").is_ok());
    }

    #[test]
    fn test_double_special_values() {
        let translator = DoubleTranslator::default();
        assert_eq!(
            translator
                .object_to_representation(&ObjectValue::Double(f64::NEG_INFINITY))
                .unwrap(),
            "-INF"
        );
        assert!(matches!(
            translator.representation_to_object("INF").unwrap(),
            ObjectValue::Double(v) if v.is_infinite()
        ));
    }

    #[test]
    fn test_list_translation() {
        let translator = ListTranslator;
        let value = translator.representation_to_object("1 2.5 x").unwrap();
        assert_eq!(
            value,
            ObjectValue::List(vec![
                ObjectValue::Integer(1),
                ObjectValue::Double(2.5),
                ObjectValue::String("x".into())
            ])
        );
        assert_eq!(translator.object_to_representation(&value).unwrap(), "1 2.5 x");
        let nested = ObjectValue::List(vec![ObjectValue::List(Vec::new())]);
        assert!(matches!(
            translator.object_to_representation(&nested),
            Err(TranslationError::UnsupportedOperation(_))
        ));
    }
}
