use super::{append_query_param, QueryModifier};
use crate::core::InvalidArgument;
use serde_json::Value;
use url::Url;

/// Any number of filters can be applied to a query, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    EqualTo(EqualTo),
    StartAt(StartAt),
    StartAfter(StartAfter),
    EndAt(EndAt),
    EndBefore(EndBefore),
    LimitToFirst(LimitToFirst),
    LimitToLast(LimitToLast),
    Shallow(Shallow),
}

impl QueryModifier for Filter {
    fn modify_uri(&self, uri: Url) -> Url {
        match self {
            Self::EqualTo(filter) => filter.modify_uri(uri),
            Self::StartAt(filter) => filter.modify_uri(uri),
            Self::StartAfter(filter) => filter.modify_uri(uri),
            Self::EndAt(filter) => filter.modify_uri(uri),
            Self::EndBefore(filter) => filter.modify_uri(uri),
            Self::LimitToFirst(filter) => filter.modify_uri(uri),
            Self::LimitToLast(filter) => filter.modify_uri(uri),
            Self::Shallow(filter) => filter.modify_uri(uri),
        }
    }

    fn modify_value(&self, value: Value) -> Value {
        match self {
            Self::LimitToFirst(filter) => filter.modify_value(value),
            Self::LimitToLast(filter) => filter.modify_value(value),
            _ => value,
        }
    }
}

// Filters comparing against a single JSON primitive. The value travels
// JSON-encoded, so strings keep their quotes.
macro_rules! scalar_filter {
    ($(#[$meta:meta])* $name:ident, $param:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            value: Value,
        }

        impl $name {
            pub fn new(value: impl Into<Value>) -> Result<Self, InvalidArgument> {
                Ok(Self {
                    value: scalar(value.into(), $param)?,
                })
            }

            pub fn value(&self) -> &Value {
                &self.value
            }
        }

        impl QueryModifier for $name {
            fn modify_uri(&self, uri: Url) -> Url {
                append_query_param(uri, $param, &self.value.to_string())
            }
        }
    };
}

scalar_filter!(
    /// Children whose ordered value equals the given one.
    EqualTo,
    "equalTo"
);
scalar_filter!(StartAt, "startAt");
scalar_filter!(StartAfter, "startAfter");
scalar_filter!(EndAt, "endAt");
scalar_filter!(EndBefore, "endBefore");

fn scalar(value: Value, param: &str) -> Result<Value, InvalidArgument> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(value),
        Value::Array(_) | Value::Object(_) => Err(InvalidArgument::new(format!(
            "Only scalar values are allowed for \"{}\" queries.",
            param
        ))),
    }
}

fn positive_limit(limit: u32, param: &str) -> Result<u32, InvalidArgument> {
    if limit < 1 {
        return Err(InvalidArgument::new(format!(
            "The \"{}\" limit must be at least 1, {} given.",
            param, limit
        )));
    }

    Ok(limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitToFirst {
    limit: u32,
}

impl LimitToFirst {
    pub fn new(limit: u32) -> Result<Self, InvalidArgument> {
        Ok(Self {
            limit: positive_limit(limit, "limitToFirst")?,
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl QueryModifier for LimitToFirst {
    fn modify_uri(&self, uri: Url) -> Url {
        append_query_param(uri, "limitToFirst", &self.limit.to_string())
    }

    fn modify_value(&self, value: Value) -> Value {
        let limit = self.limit as usize;

        match value {
            Value::Object(map) => Value::Object(map.into_iter().take(limit).collect()),
            Value::Array(items) => Value::Array(items.into_iter().take(limit).collect()),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitToLast {
    limit: u32,
}

impl LimitToLast {
    pub fn new(limit: u32) -> Result<Self, InvalidArgument> {
        Ok(Self {
            limit: positive_limit(limit, "limitToLast")?,
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl QueryModifier for LimitToLast {
    fn modify_uri(&self, uri: Url) -> Url {
        append_query_param(uri, "limitToLast", &self.limit.to_string())
    }

    fn modify_value(&self, value: Value) -> Value {
        let limit = self.limit as usize;

        match value {
            Value::Object(map) => {
                let skip = map.len().saturating_sub(limit);
                Value::Object(map.into_iter().skip(skip).collect())
            }
            Value::Array(items) => {
                let skip = items.len().saturating_sub(limit);
                Value::Array(items.into_iter().skip(skip).collect())
            }
            other => other,
        }
    }
}

/// See <https://firebase.google.com/docs/reference/rest/database/#section-param-shallow>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shallow;

impl QueryModifier for Shallow {
    fn modify_uri(&self, uri: Url) -> Url {
        append_query_param(uri, "shallow", "true")
    }
}
