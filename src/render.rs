//! Output rendering for the chat loop.
//!
//! The responder only produces text fragments; everything that reaches the terminal goes
//! through a [`Renderer`].  [`PlainTextRenderer`] writes ANSI-styled text, and
//! [`HeadingPolicy`] decides per fragment whether a line is a markdown heading.

use std::io::{self, Write};

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for white text (assistant body).
const ANSI_WHITE: &str = "\x1b[37m";

/// ANSI escape code for magenta text (markdown headings).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// ANSI escape code for green text (the prompt and echoed queries).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for yellow text (warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (errors).
const ANSI_RED: &str = "\x1b[31m";

/// Display style of a piece of text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Style {
    /// Regular assistant output.
    Body,
    /// A markdown heading line in assistant output.
    Heading,
    /// The prompt and echoed user input.
    Prompt,
    /// Non-fatal problems, such as a truncated reply.
    Warning,
    /// Errors.
    Error,
}

impl Style {
    fn ansi(self) -> &'static str {
        match self {
            Style::Body => ANSI_WHITE,
            Style::Heading => ANSI_MAGENTA,
            Style::Prompt => ANSI_GREEN,
            Style::Warning => ANSI_YELLOW,
            Style::Error => ANSI_RED,
        }
    }
}

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Write text in the given style.
    fn write(&mut self, text: &str, style: Style);

    /// End the current line.
    fn newline(&mut self);

    /// Return the terminal to its default style.
    fn reset_style(&mut self);

    /// Print an error message on its own line, distinct from assistant output.
    fn print_error(&mut self, error: &str);

    /// Print a warning on its own line.
    fn print_warning(&mut self, warning: &str);
}

/// Chooses the style of each streamed fragment.
///
/// A fragment that starts a fresh line with `#` switches to [`Style::Heading`].  The heading
/// style holds until a fragment ends with a line break; that fragment is still part of the
/// heading and the next one starts in [`Style::Body`].
#[derive(Debug, Clone)]
pub struct HeadingPolicy {
    at_line_start: bool,
    style: Style,
}

impl HeadingPolicy {
    /// A policy positioned at the start of a line, in body style.
    pub fn new() -> Self {
        Self {
            at_line_start: true,
            style: Style::Body,
        }
    }

    /// Returns the style for `fragment` and advances past it.
    pub fn style_for(&mut self, fragment: &str) -> Style {
        if self.at_line_start && fragment.starts_with('#') {
            self.style = Style::Heading;
        }
        let style = self.style;
        self.at_line_start = fragment.ends_with('\n');
        if self.at_line_start {
            self.style = Style::Body;
        }
        style
    }
}

impl Default for HeadingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped styling for one rendered reply.
///
/// Fragments written through the guard are styled by a [`HeadingPolicy`].  Dropping the guard
/// resets the terminal style, so an error or an interrupt part-way through a reply never
/// leaves the terminal colored.
pub struct StyleGuard<'a> {
    renderer: &'a mut dyn Renderer,
    policy: HeadingPolicy,
}

impl<'a> StyleGuard<'a> {
    /// Begin styled output on `renderer`.
    pub fn new(renderer: &'a mut dyn Renderer) -> Self {
        Self {
            renderer,
            policy: HeadingPolicy::new(),
        }
    }

    /// Write one fragment in the style the policy picks for it.
    pub fn fragment(&mut self, text: &str) {
        let style = self.policy.style_for(text);
        self.renderer.write(text, style);
    }

    /// Access the underlying renderer, e.g. to report an error mid-reply.
    pub fn renderer(&mut self) -> &mut dyn Renderer {
        &mut *self.renderer
    }
}

impl Drop for StyleGuard<'_> {
    fn drop(&mut self) {
        self.renderer.reset_style();
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// Output goes to stdout; errors and warnings go to stderr.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    use_color: bool,
    current: Option<Style>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), use_color)
    }

    /// Creates a renderer over arbitrary writers.
    pub fn with_writers(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        use_color: bool,
    ) -> Self {
        Self {
            out,
            err,
            use_color,
            current: None,
        }
    }

    fn print_line(&mut self, prefix: &str, text: &str, style: Style) {
        self.reset_style();
        let _ = writeln!(self.out);
        let _ = self.out.flush();
        if self.use_color {
            let _ = writeln!(self.err, "{}{prefix}{text}{ANSI_RESET}", style.ansi());
        } else {
            let _ = writeln!(self.err, "{prefix}{text}");
        }
        let _ = self.err.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn write(&mut self, text: &str, style: Style) {
        if self.use_color && self.current != Some(style) {
            let _ = write!(self.out, "{}", style.ansi());
            self.current = Some(style);
        }
        let _ = write!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn newline(&mut self) {
        self.reset_style();
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }

    fn reset_style(&mut self) {
        if self.current.take().is_some() {
            let _ = write!(self.out, "{ANSI_RESET}");
            let _ = self.out.flush();
        }
    }

    fn print_error(&mut self, error: &str) {
        self.print_line("Error: ", error, Style::Error);
    }

    fn print_warning(&mut self, warning: &str) {
        self.print_line("Warning: ", warning, Style::Warning);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::SharedBuffer;
    use super::*;

    fn renderer(use_color: bool) -> (PlainTextRenderer, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let renderer =
            PlainTextRenderer::with_writers(Box::new(out.clone()), Box::new(err.clone()), use_color);
        (renderer, out, err)
    }

    #[test]
    fn heading_until_line_break() {
        let mut policy = HeadingPolicy::new();
        assert_eq!(policy.style_for("# Ti"), Style::Heading);
        assert_eq!(policy.style_for("tle"), Style::Heading);
        assert_eq!(policy.style_for("\n"), Style::Heading);
        assert_eq!(policy.style_for("Body text"), Style::Body);
    }

    #[test]
    fn hash_mid_line_is_not_a_heading() {
        let mut policy = HeadingPolicy::new();
        assert_eq!(policy.style_for("Use"), Style::Body);
        assert_eq!(policy.style_for("#include"), Style::Body);
        assert_eq!(policy.style_for(" here\n"), Style::Body);
        assert_eq!(policy.style_for("## Next"), Style::Heading);
    }

    #[test]
    fn single_fragment_heading_line() {
        let mut policy = HeadingPolicy::new();
        assert_eq!(policy.style_for("# Title\n"), Style::Heading);
        assert_eq!(policy.style_for("text"), Style::Body);
    }

    #[test]
    fn plain_output_has_no_escapes() {
        let (mut renderer, out, _) = renderer(false);
        renderer.write("Hi", Style::Body);
        renderer.write(" there!", Style::Heading);
        renderer.newline();
        assert_eq!(out.contents(), "Hi there!\n");
    }

    #[test]
    fn color_switches_only_on_change() {
        let (mut renderer, out, _) = renderer(true);
        renderer.write("a", Style::Body);
        renderer.write("b", Style::Body);
        renderer.write("c", Style::Heading);
        renderer.reset_style();
        assert_eq!(
            out.contents(),
            format!("{ANSI_WHITE}ab{ANSI_MAGENTA}c{ANSI_RESET}")
        );
    }

    #[test]
    fn guard_resets_style_on_drop() {
        let (mut renderer, out, _) = renderer(true);
        {
            let mut guard = StyleGuard::new(&mut renderer);
            guard.fragment("# Head");
        }
        assert_eq!(
            out.contents(),
            format!("{ANSI_MAGENTA}# Head{ANSI_RESET}")
        );
    }

    #[test]
    fn errors_go_to_stderr() {
        let (mut renderer, out, err) = renderer(false);
        renderer.write("partial", Style::Body);
        renderer.print_error("connection reset");
        assert_eq!(out.contents(), "partial\n");
        assert_eq!(err.contents(), "Error: connection reset\n");
    }

    #[test]
    fn colored_warning() {
        let (mut renderer, _, err) = renderer(true);
        renderer.print_warning("reply truncated");
        assert_eq!(
            err.contents(),
            format!("{ANSI_YELLOW}Warning: reply truncated{ANSI_RESET}\n")
        );
    }
}
