//! Turns article image references into something a client can display.
//!
//! Remote URLs pass through (with a fix-up for paper images published
//! without their `/papers/` segment). Local filesystem paths are mapped onto
//! a public prefix when one is configured, otherwise replaced by a
//! placeholder that carries the file name.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use url::form_urlencoded;

pub const PLACEHOLDER_HOST: &str = "https://via.placeholder.com";
pub const DEFAULT_WIDTH: u32 = 400;
pub const DEFAULT_HEIGHT: u32 = 200;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];
const MAX_DISPLAY_NAME: usize = 20;

// Dark backgrounds: grey, blue, green, purple, orange, red.
const PALETTE: &[&str] = &[
    "4A5568", "2D3748", "1A202C", "3182CE", "2B6CB0", "2C5282", "38A169", "2F855A", "276749",
    "9F7AEA", "805AD5", "6B46C1", "ED8936", "DD6B20", "C05621", "E53E3E", "C53030", "9B2C2C",
];

lazy_static! {
    static ref WINDOWS_ROOT: Regex = Regex::new(r"^[A-Za-z]:\\").unwrap();
    static ref SUBFOLDER_IMAGES: Regex = Regex::new(r"^https?://[^/]+/([^/]+)/images/").unwrap();
}

/// Resolves image references against an explicit public prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageResolver {
    public_prefix: Option<String>,
}

impl ImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A blank prefix is treated as unset; a missing trailing `/` is added.
    pub fn with_public_prefix(prefix: Option<&str>) -> Self {
        let public_prefix = prefix
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| if p.ends_with('/') { p.to_string() } else { format!("{}/", p) });
        Self { public_prefix }
    }

    pub fn public_prefix(&self) -> Option<&str> {
        self.public_prefix.as_deref()
    }

    pub fn is_local_path(path: &str) -> bool {
        WINDOWS_ROOT.is_match(path)
            || (path.starts_with('/') && !path.starts_with("//"))
            || path.starts_with("./")
            || path.starts_with("../")
    }

    pub fn extract_filename(path: &str) -> &str {
        path.rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("file")
    }

    /// Maps a local path under the public prefix, or `None` without one.
    pub fn try_map_to_public_url(&self, path: &str) -> Option<String> {
        let prefix = self.public_prefix.as_deref()?;
        let relative = strip_root_marker(path).replace('\\', "/");
        let relative = relative.trim_start_matches('/');
        Some(format!("{}{}", prefix, relative))
    }

    /// Inserts the `/papers/` segment into `scheme://host/<sub>/images/...`
    /// URLs that lack it.
    pub fn correct_subfolder_path(url: &str) -> String {
        if url.contains("/papers/") {
            return url.to_string();
        }
        match SUBFOLDER_IMAGES.captures(url).and_then(|c| c.get(1)) {
            Some(sub) => {
                let needle = format!("/{}/images/", sub.as_str());
                let corrected = url.replacen(&needle, &format!("/papers{}", needle), 1);
                debug!("🖼️ Corrected subfolder path: {} -> {}", url, corrected);
                corrected
            }
            None => url.to_string(),
        }
    }

    pub fn no_image_url(width: u32, height: u32) -> String {
        format!("{}/{}x{}?text=No+Image", PLACEHOLDER_HOST, width, height)
    }

    pub fn fallback_url() -> String {
        format!(
            "{}/{}x{}?text=Image+Not+Found",
            PLACEHOLDER_HOST, DEFAULT_WIDTH, DEFAULT_HEIGHT
        )
    }

    pub fn process(&self, path: Option<&str>, width: u32, height: u32) -> String {
        let path = match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => path,
            None => return Self::no_image_url(width, height),
        };

        if !Self::is_local_path(path) {
            return Self::correct_subfolder_path(path);
        }

        if let Some(public_url) = self.try_map_to_public_url(path) {
            let corrected = Self::correct_subfolder_path(&public_url);
            debug!("🖼️ Mapped local path: {} -> {}", path, corrected);
            return corrected;
        }

        debug!("🖼️ Using placeholder for local path: {}", path);
        local_placeholder(path, width, height)
    }

    pub fn process_default(&self, path: Option<&str>) -> String {
        self.process(path, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

fn strip_root_marker(path: &str) -> &str {
    if WINDOWS_ROOT.is_match(path) {
        return &path[3..];
    }
    let mut rest = path;
    loop {
        if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.trim_start_matches('/')
}

fn local_placeholder(path: &str, width: u32, height: u32) -> String {
    let filename = ImageResolver::extract_filename(path);
    let extension = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    let is_image = IMAGE_EXTENSIONS.contains(&extension.as_str());
    let color = palette_color(filename);

    if width < 60 || height < 60 {
        return format!(
            "{}/{}x{}/{}/FFFFFF?text=IMG",
            PLACEHOLDER_HOST, width, height, color
        );
    }
    if width < 150 || height < 150 {
        let text = if is_image { "Image" } else { "File" };
        return format!(
            "{}/{}x{}/{}/FFFFFF?text={}",
            PLACEHOLDER_HOST, width, height, color, text
        );
    }

    let label = if is_image { "Local+Image" } else { "Local+File" };
    let display_name: String = if filename.chars().count() > MAX_DISPLAY_NAME {
        let head: String = filename.chars().take(MAX_DISPLAY_NAME - 3).collect();
        format!("{}...", head)
    } else {
        filename.to_string()
    };
    let encoded: String = form_urlencoded::byte_serialize(display_name.as_bytes()).collect();
    format!(
        "{}/{}x{}/{}/FFFFFF?text={}:+{}",
        PLACEHOLDER_HOST, width, height, color, label, encoded
    )
}

fn palette_color(seed: &str) -> &'static str {
    let sum = seed.bytes().fold(0usize, |acc, b| acc.wrapping_add(b as usize));
    PALETTE[sum % PALETTE.len()]
}
