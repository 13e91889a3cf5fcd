//! Rule-driven line classification.
//!
//! Entry boundaries are recovered from typographic cues that survive text
//! extraction. The printed volumes set headwords in bold, flush with the
//! column edge, and indent every continuation line; transcriptions fall back
//! on a leading marker glyph or a headword in capitals. Each cue is a
//! [`LineRule`]; the segmenter only ever sees the resulting [`LineClass`], so
//! the cues can be tuned per scan without touching segmentation.

use once_cell::sync::Lazy;
use regex::Regex;
use schedario_core::NormalizedLine;

use crate::config::ParsingConfig;

/// How much a matching rule says about a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueStrength {
    /// The line starts a new entry.
    Strong,
    /// The line may start a new entry; the segmenter's tie-break decides.
    Weak,
}

#[derive(Debug, Clone)]
enum Cue {
    /// The line opens with a bold run.
    Emphasis,
    /// The line starts within this distance of its column's left edge.
    FlushLeft(f32),
    /// The line text matches a pattern.
    Pattern(Regex),
}

/// One headword cue.
#[derive(Debug, Clone)]
pub struct LineRule {
    name: String,
    cue: Cue,
    strength: CueStrength,
}

impl LineRule {
    pub fn emphasis(strength: CueStrength) -> Self {
        Self {
            name: "emphasis".to_string(),
            cue: Cue::Emphasis,
            strength,
        }
    }

    pub fn flush_left(tolerance: f32, strength: CueStrength) -> Self {
        Self {
            name: "flush-left".to_string(),
            cue: Cue::FlushLeft(tolerance),
            strength,
        }
    }

    pub fn pattern(name: &str, regex: Regex, strength: CueStrength) -> Self {
        Self {
            name: name.to_string(),
            cue: Cue::Pattern(regex),
            strength,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strength(&self) -> CueStrength {
        self.strength
    }

    pub fn matches(&self, line: &NormalizedLine) -> bool {
        match &self.cue {
            Cue::Emphasis => line.emphasized,
            Cue::FlushLeft(tolerance) => line.indent.is_some_and(|i| i <= *tolerance),
            Cue::Pattern(re) => re.is_match(&line.text),
        }
    }
}

/// Text patterns of the built-in rule set.
static PATTERN_RULES: Lazy<Vec<LineRule>> = Lazy::new(|| {
    // Letters of a capitalised headword, including apostrophes and hyphens
    // ("’A", "SCIÙ-SCIÙ").
    let caps = r"[\p{Lu}’'][\p{Lu}’'\-]*";
    vec![
        // Leading typesetting marker: "■ acqua: ..."
        LineRule::pattern(
            "marker",
            Regex::new(r"^\s*[■●◆♦•*]\s*\S").unwrap(),
            CueStrength::Strong,
        ),
        // Big section letter on its own line: "B"
        LineRule::pattern(
            "section-letter",
            Regex::new(r"^\s*\p{Lu}\s*$").unwrap(),
            CueStrength::Strong,
        ),
        // "ACQUA: water." / "AB HOC E AB HAC: ..." / "HADDA= ..."
        LineRule::pattern(
            "caps-colon",
            Regex::new(&format!(r"^{caps}(?:\s+{caps})*\s*[:=]")).unwrap(),
            CueStrength::Strong,
        ),
        // "FELARIÉLLO v. filariéllo."
        LineRule::pattern(
            "caps-alias",
            Regex::new(&format!(r"^{caps}(?:\s+{caps})*,?\s+[vV]\s*\.\s")).unwrap(),
            CueStrength::Strong,
        ),
        // "Salata: ..." could be a headword that lost its capitals to OCR, or
        // a sentence inside a definition.
        LineRule::pattern(
            "capitalized-colon",
            Regex::new(r"^\p{Lu}\p{Ll}[\p{L}’'\-]*\s*:").unwrap(),
            CueStrength::Weak,
        ),
    ]
});

/// Built-in rules, tuned on the two printed volumes: the layout cues first,
/// then the text patterns.
pub(crate) fn default_rules(indent_tolerance: f32) -> Vec<LineRule> {
    let mut rules = vec![
        LineRule::emphasis(CueStrength::Strong),
        LineRule::flush_left(indent_tolerance, CueStrength::Strong),
    ];
    rules.extend(PATTERN_RULES.iter().cloned());
    rules
}

/// Outcome of classifying a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Headword,
    /// Only weak cues matched.
    Ambiguous,
    Continuation,
}

/// Applies a rule set to lines. Pure: the same line always gets the same class.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    rules: Vec<LineRule>,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::from_config(&ParsingConfig::default())
    }
}

impl LineClassifier {
    pub fn new(rules: Vec<LineRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &ParsingConfig) -> Self {
        Self::new(
            config
                .headword_rules
                .resolve(&default_rules(config.indent_tolerance)),
        )
    }

    pub fn rules(&self) -> &[LineRule] {
        &self.rules
    }

    pub fn classify(&self, line: &NormalizedLine) -> LineClass {
        let mut weak = false;
        for rule in &self.rules {
            if rule.matches(line) {
                match rule.strength {
                    CueStrength::Strong => return LineClass::Headword,
                    CueStrength::Weak => weak = true,
                }
            }
        }
        if weak {
            LineClass::Ambiguous
        } else {
            LineClass::Continuation
        }
    }

    /// Name of the first rule that matches, for debugging output.
    pub fn matching_rule(&self, line: &NormalizedLine) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.matches(line))
            .map(|r| r.name.as_str())
    }
}

/// Classify a line with the built-in rule set.
pub fn classify(line: &NormalizedLine) -> LineClass {
    static DEFAULT: Lazy<LineClassifier> = Lazy::new(LineClassifier::default);
    DEFAULT.classify(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSpec;
    use crate::ParsingConfigBuilder;
    use schedario_core::VolumeId;

    fn line(text: &str) -> NormalizedLine {
        NormalizedLine::new(VolumeId(1), 1, text)
    }

    #[test]
    fn test_caps_headword() {
        assert_eq!(classify(&line("ACQUA: water.")), LineClass::Headword);
        assert_eq!(classify(&line("AB HOC E AB HAC: locuzione.")), LineClass::Headword);
        assert_eq!(classify(&line("’A: art. la.")), LineClass::Headword);
        assert_eq!(classify(&line("HADDA= deve.")), LineClass::Headword);
    }

    #[test]
    fn test_lowercase_is_continuation() {
        assert_eq!(classify(&line("salata: salty.")), LineClass::Continuation);
        assert_eq!(classify(&line("accordo segreto.")), LineClass::Continuation);
    }

    #[test]
    fn test_emphasis_cue() {
        let bold = line("abbaccamiento: m.").emphasized();
        assert_eq!(classify(&bold), LineClass::Headword);
    }

    #[test]
    fn test_flush_left_cue() {
        let flush = line("abbaccarse: intr. pron. colludere,").with_indent(0.0);
        assert_eq!(classify(&flush), LineClass::Headword);
        assert_eq!(LineClassifier::default().matching_rule(&flush), Some("flush-left"));

        let indented = line("accordarsi.").with_indent(0.005);
        assert_eq!(classify(&indented), LineClass::Continuation);
        // Without layout the cue says nothing.
        assert_eq!(classify(&line("abbaccarse: intr.")), LineClass::Continuation);
    }

    #[test]
    fn test_marker_and_section_letter() {
        assert_eq!(classify(&line("■ acqua: water.")), LineClass::Headword);
        assert_eq!(classify(&line("B")), LineClass::Headword);
    }

    #[test]
    fn test_inline_alias_caps() {
        assert_eq!(classify(&line("FELARIÉLLO v. filariéllo.")), LineClass::Headword);
    }

    #[test]
    fn test_capitalized_colon_is_ambiguous() {
        assert_eq!(classify(&line("Salata: salty.")), LineClass::Ambiguous);
    }

    #[test]
    fn test_custom_rule_set() {
        let config = ParsingConfigBuilder::new()
            .set_headword_rules(vec![RuleSpec::Pattern {
                name: "section".to_string(),
                pattern: r"^§\s*\w".to_string(),
                strength: CueStrength::Strong,
            }])
            .build()
            .unwrap();
        let classifier = LineClassifier::from_config(&config);
        assert_eq!(classifier.rules().len(), 1);
        assert_eq!(classifier.classify(&line("§ acqua")), LineClass::Headword);
        // Built-in rules are gone.
        assert_eq!(classifier.classify(&line("ACQUA: water.")), LineClass::Continuation);
        assert_eq!(classifier.matching_rule(&line("§ acqua")), Some("section"));
    }
}
