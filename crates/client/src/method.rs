//! HTTP verbs accepted by the upstream adapter.

use crate::error::ClientError;
use std::fmt;
use std::str::FromStr;

/// The closed set of verbs the adapter will send upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// All supported verbs, in display order.
    pub const ALL: [HttpMethod; 4] = [Self::Get, Self::Post, Self::Put, Self::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ClientError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(ClientError::InvalidMethod(s.to_string())),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!(" PUT ".parse::<HttpMethod>().unwrap(), HttpMethod::Put);
        assert_eq!("delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
    }

    #[test]
    fn test_parse_rejects_other_verbs() {
        for verb in ["PATCH", "HEAD", "OPTIONS", "TRACE", ""] {
            match verb.parse::<HttpMethod>() {
                Err(ClientError::InvalidMethod(got)) => assert_eq!(got, verb),
                other => panic!("expected InvalidMethod for {verb:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_display_round_trips_names() {
        let names: Vec<String> = HttpMethod::ALL.iter().map(|m| m.to_string()).collect();
        assert_eq!(names, vec!["GET", "POST", "PUT", "DELETE"]);
        assert_eq!(reqwest::Method::from(HttpMethod::Delete), reqwest::Method::DELETE);
    }
}
