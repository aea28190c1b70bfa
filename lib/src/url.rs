use std::fmt;
use std::ops::Deref;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// An owned URL or URL path. No validation is performed.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct UrlBuf(String);

impl UrlBuf {
    pub fn new() -> UrlBuf {
        UrlBuf(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ```rust
    /// use warbler::url::UrlBuf;
    ///
    /// assert_eq!(UrlBuf::from("https://example.com/a").scheme(), Some("https"));
    /// assert_eq!(UrlBuf::from("/a/b").scheme(), None);
    /// assert_eq!(UrlBuf::from("a/b:c").scheme(), None);
    /// ```
    pub fn scheme(&self) -> Option<&str> {
        let bytes = self.0.as_bytes();
        match memchr::memchr3(b':', b'?', b'/', bytes) {
            Some(i) if bytes[i] == b':' => match memchr::memrchr(b'#', &bytes[..i]) {
                Some(_) => None,
                None => Some(&self.0[..i]),
            },
            _ => None,
        }
    }

    /// Appends `url` with exactly one `/` between the two. An absolute `url`
    /// replaces `self`.
    ///
    /// ```rust
    /// use warbler::url::UrlBuf;
    ///
    /// let mut url = UrlBuf::from("https://example.com");
    /// url.append("blog/post.html");
    /// assert_eq!(url.as_str(), "https://example.com/blog/post.html");
    ///
    /// let mut url = UrlBuf::from("https://example.com/");
    /// url.append("/product/");
    /// assert_eq!(url.as_str(), "https://example.com/product/");
    ///
    /// url.append("https://other.org/x");
    /// assert_eq!(url.as_str(), "https://other.org/x");
    ///
    /// let mut url = UrlBuf::from("https://example.com");
    /// url.append("");
    /// assert_eq!(url.as_str(), "https://example.com/");
    /// ```
    pub fn append<T: AsRef<str>>(&mut self, url: T) -> &mut Self {
        let url = url.as_ref();
        if UrlBuf::from(url).scheme().is_some() {
            *self = UrlBuf::from(url);
            return self;
        }

        self.push(url)
    }

    /// Appends `path` with exactly one `/` between the two. Unlike
    /// [`append`](Self::append), `path` is never taken as a URL, so a segment
    /// containing `:` stays a path.
    ///
    /// ```rust
    /// use warbler::url::UrlBuf;
    ///
    /// let mut url = UrlBuf::from("https://example.com");
    /// url.push("notes:today.html");
    /// assert_eq!(url.as_str(), "https://example.com/notes:today.html");
    ///
    /// let mut url = UrlBuf::from("https://example.com/");
    /// url.push("/mailto:x.html");
    /// assert_eq!(url.as_str(), "https://example.com/mailto:x.html");
    /// ```
    pub fn push<T: AsRef<str>>(&mut self, path: T) -> &mut Self {
        let path = path.as_ref();
        match (self.0.ends_with('/'), path.starts_with('/')) {
            (true, true) => self.0.push_str(&path[1..]),
            (true, false) | (false, true) => self.0.push_str(path),
            (false, false) => {
                self.0.push('/');
                self.0.push_str(path);
            }
        }

        self
    }

    /// Removes trailing `/` characters.
    pub fn trim_end_slashes(&mut self) -> &mut Self {
        let len = self.0.trim_end_matches('/').len();
        self.0.truncate(len);
        self
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for UrlBuf {
    fn from(value: String) -> Self {
        UrlBuf(value)
    }
}

impl From<&str> for UrlBuf {
    fn from(value: &str) -> Self {
        UrlBuf(value.to_string())
    }
}

/// Joins the normal components of a relative path with `/`.
///
/// ```rust
/// use std::path::Path;
/// use warbler::url::UrlBuf;
///
/// let url = UrlBuf::from(Path::new("./blog/../notes/today.html"));
/// assert_eq!(url.as_str(), "notes/today.html");
/// ```
impl From<&Path> for UrlBuf {
    fn from(value: &Path) -> Self {
        let mut parts: Vec<String> = vec![];
        for component in value.components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => continue,
                Component::ParentDir => { parts.pop(); },
                Component::Normal(v) => parts.push(v.to_string_lossy().into_owned()),
            }
        }

        UrlBuf(parts.join("/"))
    }
}

impl Deref for UrlBuf {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for UrlBuf {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<UrlBuf> for String {
    fn from(value: UrlBuf) -> Self {
        value.0
    }
}

impl fmt::Display for UrlBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
