//! Styled text runs and their HTML rendering.

/// A stretch of text set in one style.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn is_styled(&self) -> bool {
        self.bold || self.italic
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn same_style(&self, other: &TextRun) -> bool {
        self.bold == other.bold && self.italic == other.italic
    }

    /// `<b>`/`<i>` markup around the escaped text. Blank runs stay bare.
    pub fn to_html(&self) -> String {
        let mut html = escape_html(&self.text);
        if self.is_blank() {
            return html;
        }
        if self.bold {
            html = format!("<b>{html}</b>");
        }
        if self.italic {
            html = format!("<i>{html}</i>");
        }
        html
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn runs_to_html(runs: &[TextRun]) -> String {
    runs.iter().map(TextRun::to_html).collect()
}

pub fn runs_text(runs: &[TextRun]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Append `c` in the style of `like`, extending the last run when the
/// styles agree.
pub fn push_styled(runs: &mut Vec<TextRun>, c: char, like: &TextRun) {
    match runs.last_mut() {
        Some(last) if last.same_style(like) => last.text.push(c),
        _ => runs.push(TextRun {
            text: c.to_string(),
            bold: like.bold,
            italic: like.italic,
        }),
    }
}

/// Append a single space before text styled like `next`. The space keeps
/// the style only when it sits inside one style; between two styles it is
/// plain.
pub fn push_space(runs: &mut Vec<TextRun>, next: &TextRun) {
    let inside = runs.last().is_some_and(|last| last.same_style(next));
    if inside {
        push_styled(runs, ' ', next);
    } else {
        push_styled(runs, ' ', &TextRun::default());
    }
}

/// Collapse whitespace across runs the way `split_whitespace().join(" ")`
/// collapses text, merging neighbours of the same style. Blank runs vanish.
pub fn tidy_runs(runs: impl IntoIterator<Item = TextRun>) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::new();
    let mut pending_space = false;
    for run in runs {
        for c in run.text.chars() {
            if c.is_whitespace() {
                pending_space = !out.is_empty();
                continue;
            }
            if pending_space {
                push_space(&mut out, &run);
                pending_space = false;
            }
            push_styled(&mut out, c, &run);
        }
    }
    out
}

/// The runs from byte `offset` of their joined text onwards.
pub fn runs_from(runs: &[TextRun], offset: usize) -> Vec<TextRun> {
    let mut skip = offset;
    let mut out = Vec::new();
    for run in runs {
        if skip >= run.text.len() {
            skip -= run.text.len();
            continue;
        }
        out.push(TextRun {
            text: run.text.get(skip..).unwrap_or_default().to_string(),
            bold: run.bold,
            italic: run.italic,
        });
        skip = 0;
    }
    out
}

/// Cut the runs so their joined text is `len` bytes long.
pub fn truncate_runs(runs: &mut Vec<TextRun>, len: usize) {
    let mut kept = 0;
    let mut keep_runs = 0;
    for run in runs.iter_mut() {
        if kept >= len {
            break;
        }
        let room = len - kept;
        if run.text.len() > room {
            run.text.truncate(room);
        }
        kept += run.text.len();
        keep_runs += 1;
    }
    runs.truncate(keep_runs);
    runs.retain(|r| !r.text.is_empty());
}
