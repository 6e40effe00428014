//! Image Transform URLs
//!
//! The image CDN applies transforms described in the `tr` query parameter of
//! an asset URL, e.g. `https://ik.imagekit.io/demo/a.jpg?tr=e-bgremove`.
//! Existing transforms are always dropped before new ones are appended so
//! they never stack.

use pixel_core::geometry::{Direction, Size};
use std::fmt;

/// Host of the default transform CDN
pub const DEFAULT_TRANSFORM_HOST: &str = "ik.imagekit.io";

/// Background removal transform
pub const BACKGROUND_REMOVAL: &str = "e-bgremove";

/// Transforms that leave the image with a removed or replaced background
pub const BACKGROUND_EFFECTS: [&str; 3] = ["e-bgremove", "e-removedotbg", "e-changebg"];

/// Asset URL without its query string
#[must_use]
pub fn base_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Host part of an absolute URL
#[must_use]
pub fn host_of(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// Check if an image already had its background removed or replaced
#[must_use]
pub fn has_background_removal(url: &str) -> bool {
    BACKGROUND_EFFECTS.iter().any(|effect| url.contains(effect))
}

/// A transform URL under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformUrl {
    base: String,
    tokens: Vec<String>,
}

impl TransformUrl {
    /// Start from an asset URL, discarding any existing query
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            base: base_url(url).to_string(),
            tokens: Vec::new(),
        }
    }

    /// Append a transform token
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// Transform tokens in order
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Asset URL without query
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }
}

impl fmt::Display for TransformUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tokens.is_empty() {
            return f.write_str(&self.base);
        }
        write!(f, "{}?tr={}", self.base, self.tokens.join(","))
    }
}

/// Builds transform URLs for one CDN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformer {
    host: String,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSFORM_HOST)
    }
}

impl Transformer {
    /// Create a transformer for the given CDN host
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// CDN host
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check if the CDN serves this URL
    #[must_use]
    pub fn serves(&self, url: &str) -> bool {
        host_of(url).is_some_and(|host| {
            host.eq_ignore_ascii_case(&self.host)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", self.host.to_ascii_lowercase()))
        })
    }

    /// Background removal URL.
    ///
    /// URLs the CDN does not serve come back unchanged.
    #[must_use]
    pub fn remove_background(&self, url: &str) -> String {
        if !self.serves(url) {
            return url.to_string();
        }
        TransformUrl::new(url).token(BACKGROUND_REMOVAL).to_string()
    }

    /// Generative fill URL padding the image to `size`
    #[must_use]
    pub fn generative_fill(&self, url: &str, size: Size, direction: Option<Direction>) -> String {
        let mut transform = TransformUrl::new(url)
            .token("bg-genfill")
            .token(format!("w-{}", size.width))
            .token(format!("h-{}", size.height))
            .token("cm-pad_resize");
        if let Some(direction) = direction {
            transform = transform.token(direction.focus_token());
        }
        transform.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO: &str = "https://ik.imagekit.io/demo/photo.jpg";

    #[test]
    fn test_base_url_strips_query() {
        assert_eq!(base_url("https://cdn/a.png?tr=w-100"), "https://cdn/a.png");
        assert_eq!(base_url("https://cdn/a.png"), "https://cdn/a.png");
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of(PHOTO), Some("ik.imagekit.io"));
        assert_eq!(host_of("http://user@localhost:3000/x"), Some("localhost"));
        assert_eq!(host_of("/relative/path.png"), None);
    }

    #[test]
    fn test_remove_background() {
        let transformer = Transformer::default();
        assert_eq!(
            transformer.remove_background(&format!("{PHOTO}?tr=w-300")),
            format!("{PHOTO}?tr=e-bgremove")
        );

        let foreign = "https://images.unsplash.com/photo-1?ixid=abc";
        assert_eq!(transformer.remove_background(foreign), foreign);
    }

    #[test]
    fn test_serves_ignores_lookalike_paths() {
        let transformer = Transformer::default();
        assert!(!transformer.serves("https://evil.example/ik.imagekit.io/a.png"));
        assert!(transformer.serves("https://IK.imagekit.io/a.png"));
    }

    #[test]
    fn test_generative_fill_tokens() {
        let transformer = Transformer::default();
        let url = transformer.generative_fill(
            &format!("{PHOTO}?tr=e-bgremove"),
            Size::new(1200, 600),
            Some(Direction::Left),
        );
        assert_eq!(
            url,
            format!("{PHOTO}?tr=bg-genfill,w-1200,h-600,cm-pad_resize,fo-right")
        );

        let url = transformer.generative_fill(PHOTO, Size::new(10, 20), None);
        assert!(url.ends_with("cm-pad_resize"));
    }

    #[test]
    fn test_background_removal_detection() {
        assert!(has_background_removal(&format!("{PHOTO}?tr=e-bgremove")));
        assert!(has_background_removal(&format!("{PHOTO}?tr=e-changebg-prompt-beach")));
        assert!(has_background_removal(&format!("{PHOTO}?tr=e-removedotbg")));
        assert!(!has_background_removal(PHOTO));
    }

    #[test]
    fn test_empty_transform_is_base() {
        assert_eq!(TransformUrl::new(&format!("{PHOTO}?a=b")).to_string(), PHOTO);
    }
}
