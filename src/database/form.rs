use std::collections::HashMap;

use serde_json::Value;

use super::error::TypeError;

pub const REQUIRED: &str = "Обязательное поле.";
pub const NOT_NULL: &str = "Это поле не может быть пустым.";
pub const NOT_A_STRING: &str = "Ожидалась строка.";
pub const NOT_AN_INTEGER: &str = "Требуется целочисленное значение.";
pub const NOT_A_LIST: &str = "Ожидался список со значениями.";
pub const NOT_AN_OBJECT: &str = "Ожидался словарь со значениями.";

pub type FormData = HashMap<String, Value>;

/// Raw JSON request body, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(Value::Null) => Err(TypeError::new(NOT_NULL)),
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new(NOT_A_STRING)),
            },
            None => Err(TypeError::new(REQUIRED)),
        }
    }

    /// Accepts JSON numbers and numeric strings, same as form-encoded clients send them.
    pub fn get_integer(&self, key: &str) -> Result<i32, TypeError> {
        match self.inner.get(key) {
            Some(Value::Null) => Err(TypeError::new(NOT_NULL)),
            Some(value) => value_as_integer(value),
            None => Err(TypeError::new(REQUIRED)),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<Vec<Value>, TypeError> {
        match self.inner.get(key) {
            Some(Value::Null) => Err(TypeError::new(NOT_NULL)),
            Some(Value::Array(values)) => Ok(values.to_owned()),
            Some(_) => Err(TypeError::new(NOT_A_LIST)),
            None => Err(TypeError::new(REQUIRED)),
        }
    }
}

pub fn value_as_integer(value: &Value) -> Result<i32, TypeError> {
    let number = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    number
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| TypeError::new(NOT_AN_INTEGER))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn form(value: Value) -> Form {
        Form::from_data(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn reads_strings() {
        let form = form(json!({"name": "Tea", "text": 5, "image": null}));

        assert_eq!(form.get_str("name").unwrap(), "Tea");
        assert_eq!(form.get_str("text").unwrap_err().info(), NOT_A_STRING);
        assert_eq!(form.get_str("image").unwrap_err().info(), NOT_NULL);
        assert_eq!(form.get_str("missing").unwrap_err().info(), REQUIRED);
    }

    #[test]
    fn reads_integers_from_numbers_and_strings() {
        let form = form(json!({"a": 5, "b": "12", "c": 1.5, "d": "x", "e": 10_000_000_000i64}));

        assert_eq!(form.get_integer("a").unwrap(), 5);
        assert_eq!(form.get_integer("b").unwrap(), 12);
        assert_eq!(form.get_integer("c").unwrap_err().info(), NOT_AN_INTEGER);
        assert_eq!(form.get_integer("d").unwrap_err().info(), NOT_AN_INTEGER);
        assert_eq!(form.get_integer("e").unwrap_err().info(), NOT_AN_INTEGER);
    }

    #[test]
    fn reads_lists() {
        let form = form(json!({"tags": [1, 2], "ingredients": {"id": 1}}));

        assert_eq!(form.get_list("tags").unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(form.get_list("ingredients").unwrap_err().info(), NOT_A_LIST);
        assert!(form.contains("tags"));
        assert!(!form.contains("name"));
    }
}
