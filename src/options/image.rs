//! Global options understood by `wkhtmltoimage`
//!
//! Field order is the emission order of [`ImageOptions::args`]. Keep new
//! fields grouped with their neighbours in `args` as well.

use serde::{Deserialize, Serialize};

use super::{ArgValue, Opt, FLAG_PREFIX};

type KeyValues = Vec<(String, String)>;

/// The full set of wkhtmltoimage settings that apply to one invocation.
///
/// # Examples
///
/// ```
/// let mut opts = wkimage::ImageOptions::default();
/// opts.format.set("png".to_string());
/// opts.width.set(800);
/// assert_eq!(opts.args(), vec!["--format", "png", "--width", "800"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    // Geometry and output encoding
    /// Height of the crop rectangle
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub crop_h: Opt<u32>,
    /// Width of the crop rectangle
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub crop_w: Opt<u32>,
    /// X offset of the crop rectangle
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub crop_x: Opt<u32>,
    /// Y offset of the crop rectangle
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub crop_y: Opt<u32>,
    /// Output file format (png, jpg, bmp, svg)
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub format: Opt<String>,
    /// Screen height, used as the page height when cropping is off
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub height: Opt<u32>,
    /// Screen width, the minimum page width
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub width: Opt<u32>,
    /// Compression quality, 0 to 100
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub quality: Opt<u32>,
    /// Make the background transparent (png only)
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub transparent: Opt<bool>,
    /// Zoom factor applied to the page
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub zoom: Opt<f64>,
    /// Use the exact width instead of growing it to fit the content
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub disable_smart_width: Opt<bool>,

    // Page loading
    /// Web cache directory
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub cache_dir: Opt<String>,
    /// SVG used to render checked checkboxes
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub checkbox_checked_svg: Opt<String>,
    /// SVG used to render unchecked checkboxes
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub checkbox_svg: Opt<String>,
    /// SVG used to render checked radio buttons
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub radiobutton_checked_svg: Opt<String>,
    /// SVG used to render unchecked radio buttons
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub radiobutton_svg: Opt<String>,
    /// Cookies sent with every request, as name/value pairs
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub cookie: Opt<KeyValues>,
    /// Read and write cookies from and to this file
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub cookie_jar: Opt<String>,
    /// Extra HTTP headers, as name/value pairs
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub custom_header: Opt<KeyValues>,
    /// Send the custom headers for every resource, not just the main page
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub custom_header_propagation: Opt<bool>,
    /// Send the custom headers with the main page only
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub no_custom_header_propagation: Opt<bool>,
    /// Show javascript debugging output
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub debug_javascript: Opt<bool>,
    /// Hide javascript debugging output
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub no_debug_javascript: Opt<bool>,
    /// Default text encoding of the input
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub encoding: Opt<String>,
    /// Load or print images
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub images: Opt<bool>,
    /// Do not load or print images
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub no_images: Opt<bool>,
    /// Do not run javascript in the page
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub disable_javascript: Opt<bool>,
    /// Run javascript in the page
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub enable_javascript: Opt<bool>,
    /// Milliseconds to wait for javascript to finish
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub javascript_delay: Opt<u32>,
    /// abort, ignore or skip
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub load_error_handling: Opt<String>,
    /// abort, ignore or skip
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub load_media_error_handling: Opt<String>,
    /// Forbid converted files from reading other local files
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub disable_local_file_access: Opt<bool>,
    /// Allow converted files to read other local files
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub enable_local_file_access: Opt<bool>,
    /// Directories allowed for local file access
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub allow: Opt<Vec<String>>,
    /// Smallest font size in points
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub minimum_font_size: Opt<u32>,
    /// HTTP authentication username
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub username: Opt<String>,
    /// HTTP authentication password
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub password: Opt<String>,
    /// Form fields to post, as name/value pairs
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub post: Opt<KeyValues>,
    /// Files to post, as field name/path pairs
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub post_file: Opt<KeyValues>,
    /// HTTP proxy, as `[protocol://][user[:password]@]host[:port]`
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub proxy: Opt<String>,
    /// Scripts run after the page is loaded, in order
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub run_script: Opt<Vec<String>>,
    /// Stop scripts that run too long
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub stop_slow_scripts: Opt<bool>,
    /// Let long-running scripts finish
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub no_stop_slow_scripts: Opt<bool>,
    /// Style sheet applied to every page
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub user_style_sheet: Opt<String>,
    /// Wait until window.status equals this before rendering
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub window_status: Opt<String>,

    // General
    /// none, error, warn or info
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub log_level: Opt<String>,
    /// Suppress progress output on stderr
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub quiet: Opt<bool>,

    /// Raw tokens appended verbatim after every declared option, for flags
    /// this schema does not model
    #[serde(skip_serializing_if = "Opt::is_unset")]
    pub custom_args: Opt<Vec<String>>,
}

/// Tokens contributed by one option
struct Segment {
    tokens: Vec<String>,
    /// Flag a declared list option emits once per entry
    repeats: Option<String>,
}

#[derive(Default)]
struct Segments(Vec<Segment>);

impl Segments {
    fn single<T: ArgValue>(&mut self, opt: &Opt<T>, flag: &str) {
        self.push(opt, flag, None);
    }

    fn list<T>(&mut self, opt: &Opt<Vec<T>>, flag: &str)
    where
        Vec<T>: ArgValue,
    {
        self.push(opt, flag, Some(format!("{}{}", FLAG_PREFIX, flag)));
    }

    fn push<T: ArgValue>(&mut self, opt: &Opt<T>, flag: &str, repeats: Option<String>) {
        let mut tokens = Vec::new();
        opt.push_args(flag, &mut tokens);
        if !tokens.is_empty() {
            self.0.push(Segment { tokens, repeats });
        }
    }
}

impl ImageOptions {
    /// Serialize every set option, in declaration order
    pub fn args(&self) -> Vec<String> {
        self.segments().into_iter().flat_map(|seg| seg.tokens).collect()
    }

    fn segments(&self) -> Vec<Segment> {
        let mut s = Segments::default();

        s.single(&self.crop_h, "crop-h");
        s.single(&self.crop_w, "crop-w");
        s.single(&self.crop_x, "crop-x");
        s.single(&self.crop_y, "crop-y");
        s.single(&self.format, "format");
        s.single(&self.height, "height");
        s.single(&self.width, "width");
        s.single(&self.quality, "quality");
        s.single(&self.transparent, "transparent");
        s.single(&self.zoom, "zoom");
        s.single(&self.disable_smart_width, "disable-smart-width");

        s.single(&self.cache_dir, "cache-dir");
        s.single(&self.checkbox_checked_svg, "checkbox-checked-svg");
        s.single(&self.checkbox_svg, "checkbox-svg");
        s.single(&self.radiobutton_checked_svg, "radiobutton-checked-svg");
        s.single(&self.radiobutton_svg, "radiobutton-svg");
        s.list(&self.cookie, "cookie");
        s.single(&self.cookie_jar, "cookie-jar");
        s.list(&self.custom_header, "custom-header");
        s.single(&self.custom_header_propagation, "custom-header-propagation");
        s.single(&self.no_custom_header_propagation, "no-custom-header-propagation");
        s.single(&self.debug_javascript, "debug-javascript");
        s.single(&self.no_debug_javascript, "no-debug-javascript");
        s.single(&self.encoding, "encoding");
        s.single(&self.images, "images");
        s.single(&self.no_images, "no-images");
        s.single(&self.disable_javascript, "disable-javascript");
        s.single(&self.enable_javascript, "enable-javascript");
        s.single(&self.javascript_delay, "javascript-delay");
        s.single(&self.load_error_handling, "load-error-handling");
        s.single(&self.load_media_error_handling, "load-media-error-handling");
        s.single(&self.disable_local_file_access, "disable-local-file-access");
        s.single(&self.enable_local_file_access, "enable-local-file-access");
        s.list(&self.allow, "allow");
        s.single(&self.minimum_font_size, "minimum-font-size");
        s.single(&self.username, "username");
        s.single(&self.password, "password");
        s.list(&self.post, "post");
        s.list(&self.post_file, "post-file");
        s.single(&self.proxy, "proxy");
        s.list(&self.run_script, "run-script");
        s.single(&self.stop_slow_scripts, "stop-slow-scripts");
        s.single(&self.no_stop_slow_scripts, "no-stop-slow-scripts");
        s.single(&self.user_style_sheet, "user-style-sheet");
        s.single(&self.window_status, "window-status");

        s.single(&self.log_level, "log-level");
        s.single(&self.quiet, "quiet");

        if let Some(raw) = self.custom_args.value() {
            s.0.push(Segment { tokens: raw.clone(), repeats: None });
        }
        s.0
    }

    /// Find the first flag token that appears twice.
    ///
    /// A list option may repeat its own flag across its entries; the same
    /// flag coming from anywhere else is a duplicate. Any token starting with
    /// `--` counts as a flag, so a value such as `--foo` passed to a string
    /// option can collide with a real flag.
    pub fn first_duplicate_flag(&self) -> Option<String> {
        let mut seen: Vec<String> = Vec::new();
        for seg in self.segments() {
            let mut local: Vec<String> = Vec::new();
            for tok in seg.tokens.into_iter().filter(|t| t.starts_with(FLAG_PREFIX)) {
                if local.contains(&tok) {
                    if seg.repeats.as_deref() == Some(tok.as_str()) {
                        continue;
                    }
                    return Some(tok);
                }
                if seen.contains(&tok) {
                    return Some(tok);
                }
                local.push(tok);
            }
            seen.extend(local);
        }
        None
    }
}
