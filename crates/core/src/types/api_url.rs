//! Backend API base URL.

use core::fmt;

use url::Url;

/// Errors that can occur when parsing an [`ApiBaseUrl`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiBaseUrlError {
    /// The input string is empty (or only slashes and whitespace).
    #[error("API base URL cannot be empty")]
    Empty,
    /// The input is not an absolute URL.
    #[error("API base URL is not a valid URL: {0}")]
    Invalid(String),
    /// The URL uses a scheme other than http or https.
    #[error("API base URL must use http or https (got {0})")]
    UnsupportedScheme(String),
}

/// The canonical base URL of the backend API.
///
/// Every upstream call is built from this value, so it is normalized once at
/// construction instead of at each call site.
///
/// ## Normalization
///
/// - Surrounding whitespace and all trailing slashes are removed
/// - A single `/api` suffix is appended unless the path already ends in `/api`
///
/// ## Examples
///
/// ```
/// use warizmy_core::ApiBaseUrl;
///
/// let url = ApiBaseUrl::parse("http://localhost:8000").unwrap();
/// assert_eq!(url.as_str(), "http://localhost:8000/api");
///
/// let url = ApiBaseUrl::parse("https://backend.example.com/api///").unwrap();
/// assert_eq!(url.as_str(), "https://backend.example.com/api");
/// assert_eq!(url.endpoint("/auth/me"), "https://backend.example.com/api/auth/me");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiBaseUrl(String);

impl ApiBaseUrl {
    /// Base URL used when no backend location is configured.
    pub const DEFAULT: &'static str = "http://localhost:8000/api";

    /// Parse and normalize an `ApiBaseUrl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty after trimming whitespace and trailing slashes
    /// - Is not an absolute URL
    /// - Uses a scheme other than `http` or `https`
    pub fn parse(raw: &str) -> Result<Self, ApiBaseUrlError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ApiBaseUrlError::Empty);
        }

        let url = Url::parse(trimmed).map_err(|e| ApiBaseUrlError::Invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiBaseUrlError::UnsupportedScheme(url.scheme().to_owned()));
        }

        if trimmed.ends_with("/api") {
            Ok(Self(trimmed.to_owned()))
        } else {
            Ok(Self(format!("{trimmed}/api")))
        }
    }

    /// Returns the normalized base URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the full URL of an endpoint below the API root.
    ///
    /// Leading slashes on `path` are ignored, so `"auth/me"` and `"/auth/me"`
    /// produce the same URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

impl Default for ApiBaseUrl {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for ApiBaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ApiBaseUrl {
    type Err = ApiBaseUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ApiBaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
