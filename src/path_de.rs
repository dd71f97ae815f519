use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Deserialization failure with the JSON path where it happened.
#[derive(Error, Debug)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl PathError {
    fn from_track(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        Self { path, message: err.into_inner().to_string() }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(PathError::from_track)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(PathError::from_track)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, PathError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(PathError::from_track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        inner: Vec<Inner>,
    }

    #[derive(Debug, Deserialize)]
    struct Inner {
        #[allow(dead_code)]
        n: u32,
    }

    #[test]
    fn error_names_the_failing_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner": [{"n": 1}, {"n": "x"}]}"#).unwrap_err();
        assert_eq!(err.path, "inner[1].n");
    }

    #[test]
    fn value_input_is_tracked_too() {
        let err = from_value_with_path::<Outer>(serde_json::json!({"inner": [{"n": -1}]})).unwrap_err();
        assert_eq!(err.path, "inner[0].n");
    }
}
