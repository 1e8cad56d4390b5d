use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a decoded JSON document.
///
/// Renders as `main.temp`, `list[1].dt` or `[0].lat`; the document root renders as `$`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(Vec<Segment>);

impl JsonPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.to_owned()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("$");
        }

        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }

        Ok(())
    }
}

/// First schema violation found in a payload.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid payload at `{path}`: {reason}")]
pub struct ValidationError {
    pub path: JsonPath,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: &JsonPath, reason: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for ValidationError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        use serde_path_to_error::Segment as Step;

        let mut path = JsonPath::root();
        for step in err.path().iter() {
            path = match step {
                Step::Seq { index } => path.index(*index),
                Step::Map { key } => path.key(key),
                Step::Enum { .. } | Step::Unknown => path,
            };
        }

        // serde reports a missing field against the object that lacks it.
        let reason = err.inner().to_string();
        match reason
            .strip_prefix("missing field `")
            .and_then(|rest| rest.strip_suffix('`'))
        {
            Some(field) => Self::new(&path.key(field), "required field is missing"),
            None => Self { path, reason },
        }
    }
}

/// Failure of a single fetch-and-validate operation.
///
/// `Network`, `Decode` and `Validation` are all terminal for the request and are reported
/// the same way by resolvers. `Cancelled` is never reported.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network request failed: {0}")]
    Network(String),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("request was cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}
