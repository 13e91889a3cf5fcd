//! Grammatical qualifiers opening a definition (`m.`, `agg.`, `dim. di`).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use schedario_core::TextRun;

/// Abbreviations as printed in the volumes' key, written without their
/// final dot. Where the key lists several readings only the first is kept;
/// `avv` is resolved against the headword in [`QualifierTable::expand`].
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("abbr", "abbreviazione"),
    ("accr", "accrescitivo"),
    ("af", "aferesi"),
    ("agg", "aggettivo"),
    ("alt", "alterazione"),
    ("ant", "antico"),
    ("ap", "apocope"),
    ("artt", "preposizione articolata"),
    ("aus", "verbo ausiliare"),
    ("avv", "avverbio"),
    ("c", "complemento"),
    ("card", "aggettivo numerale cardinale"),
    ("cond", "condizionale"),
    ("cong", "congiunzione"),
    ("congiunt", "congiuntivo"),
    ("contr", "contrazione"),
    ("corr", "correttamente"),
    ("det", "articolo determinativo"),
    ("dim", "diminuitivo"),
    ("distr", "aggettivo numerale distributivo"),
    ("ecc", "eccetera"),
    ("eccl", "ecclesiastico"),
    ("el", "elisione"),
    ("ep", "epentesi"),
    ("es", "esempio"),
    ("escl", "esclamazione"),
    ("f", "sostantivo femminile"),
    ("fig", "figuratamente"),
    ("fr", "francese"),
    ("fraz", "aggettivo numerale frazionario"),
    ("freq", "frequente"),
    ("fut", "futuro"),
    ("ger", "gerundio"),
    ("giapp", "giapponese"),
    ("gr", "greco"),
    ("impf", "imperfetto"),
    ("impt", "imperativo"),
    ("imprt", "imperativo"),
    ("ind", "indicativo"),
    ("indef", "aggettivo e/o pronome indefinito"),
    ("indet", "articolo indeterminativo"),
    ("inf", "infantile"),
    ("ingl", "inglese"),
    ("int", "interiezione"),
    ("inter", "interiezione"),
    ("interr", "aggettivo e/o pronome interrogativo"),
    ("intr", "verbo intransitivo"),
    ("ir", "ironico"),
    ("it", "italianizzazione"),
    ("l", "lettura"),
    ("lat", "latino"),
    ("m", "sostantivo maschile"),
    ("nap", "napoletano-e"),
    ("neg", "negazione"),
    ("neol", "neologismo"),
    ("onom", "onomatopea"),
    ("ord", "aggettivo numerale ordinale"),
    ("p", "passato"),
    ("part", "participio"),
    ("pl", "plurale"),
    ("poss", "aggettivo e/o pronome possessivo"),
    ("pr", "proverbio"),
    ("prep", "preposizione"),
    ("pres", "presente"),
    ("pron", "pronome"),
    ("prop", "nome proprio"),
    ("prov", "provenzale"),
    ("raff", "rafforzativo"),
    ("rem", "passato remoto"),
    ("rifl", "verbo riflessivo"),
    ("s", "singolare"),
    ("sec", "secolo"),
    ("sinc", "sincope"),
    ("sinon", "sinonimo"),
    ("sp", "spagnolo"),
    ("spr", "spregiativo"),
    ("sup", "superlativo"),
    ("ted", "tedesco"),
    ("tr", "verbo transitivo"),
    ("tronc", "troncamento"),
    ("v", "vedere"),
    ("vezz", "vezzeggiativo"),
    ("voc", "vocativo"),
    // Combinations used in the body but missing from the key.
    ("n. pr", "nome proprio"),
    ("intr. pron", "verbo intransitivo pronominale"),
    ("intr. pr", "verbo intransitivo pronominale"),
    ("rifl. intr", "verbo intransitivo riflessivo"),
    ("intr. rifl", "verbo intransitivo riflessivo"),
    ("m. pl", "sostantivo maschile plurale"),
    ("m. inv", "sostantivo maschile invariabile"),
    ("pl. m", "sostantivo maschile plurale"),
    ("f. pl", "sostantivo femminile plurale"),
    ("pl. f", "sostantivo femminile plurale"),
    ("agg. f", "aggettivo femminile"),
    ("det. pl", "articolo determinativo plurale"),
    ("f. s. e pl", "sostantivo femminile singolare e plurale"),
    ("f. e agg", "sostantivo femminile e aggettivo"),
    ("m. e f", "sostantivo maschile e femminile"),
    ("pl. m. e f", "sostantivo plurale maschile e femminile"),
    ("m. e agg", "sostantivo maschile e aggettivo"),
    ("agg. e m", "sostantivo maschile e aggettivo"),
    ("m. e f. e agg", "sostantivo maschile e femminile e aggettivo"),
    ("m.-f. e agg", "sostantivo maschile e femminile e aggettivo"),
    ("m. e agg. e part", "sostantivo maschile e aggettivo e participio"),
    ("prep. e avv", "preposizione e avverbio"),
    ("agg. e part", "aggettivo e participio"),
    ("tr. e intr", "verbo transitivo e intransitivo"),
    ("tronc. e voc", "troncamento e vocativo"),
];

/// Qualifiers spelled out in full, so not followed by a dot.
const WORD_QUALIFIERS: &[(&str, &str)] = &[
    ("aferesi", "aferesi"),
    ("deformazione", "deformazione"),
    ("assimilazione", "assimilazione"),
    ("antica forma", "antica forma"),
    ("escl. d’impazienza", "esclamazione d’impazienza"),
    ("da", "da"),
];

/// Marks a derivative of the word that follows, without a qualifier.
const DERIVATIVE_OF: &str = "da";

/// An italic run this long is prose, not a qualifier.
const MAX_QUALIFIER_CHARS: usize = 20;

static DEFAULT_TABLE: Lazy<QualifierTable> = Lazy::new(|| QualifierTable::with_extra(&[]).unwrap());

/// `"intr. pron"` → `intr\.\s*pron`: spacing inside a combined
/// abbreviation varies from page to page.
fn key_pattern(key: &str) -> String {
    key.split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s*")
        .replace(r"\.", r"\.\s*")
}

fn alternation(keys: &mut Vec<&str>) -> String {
    // Longest first, so "m. pl" wins over "m".
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    keys.dedup();
    keys.iter()
        .map(|k| key_pattern(k))
        .collect::<Vec<_>>()
        .join("|")
}

/// What a leading qualifier says about an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Qualifier {
    /// Expanded qualifier, e.g. "sostantivo maschile".
    pub expansion: Option<String>,
    /// Base word when the definition is just "dim. di casa.".
    pub derived_from: Option<String>,
}

/// Abbreviation → expansion lookup with a compiled matcher.
#[derive(Debug, Clone)]
pub struct QualifierTable {
    matcher: Regex,
    /// A whole italic run holding one key, optionally followed by `di`.
    exact: Regex,
    expansions: HashMap<String, String>,
}

impl Default for QualifierTable {
    fn default() -> Self {
        DEFAULT_TABLE.clone()
    }
}

impl QualifierTable {
    /// The built-in table plus `extra` abbreviations (given with or without
    /// their final dot).
    pub fn with_extra(extra: &[(String, String)]) -> Result<Self, regex::Error> {
        let mut expansions: HashMap<String, String> = HashMap::new();
        let mut dotted: Vec<&str> = Vec::new();
        for (key, expansion) in ABBREVIATIONS {
            expansions.insert(key.to_string(), expansion.to_string());
            dotted.push(key);
        }
        for (key, expansion) in extra {
            let key = key.trim().trim_end_matches('.');
            expansions.insert(key.to_string(), expansion.clone());
            dotted.push(key);
        }
        let mut words: Vec<&str> = Vec::new();
        for (key, expansion) in WORD_QUALIFIERS {
            expansions.insert(key.to_string(), expansion.to_string());
            words.push(key);
        }

        let pattern = format!(
            r"^(?:(?P<word>{})\b(?P<di3>\s+di\b)?|(?P<abbr>{})(?:\s*\.(?P<di1>\s*di\b)?|\s+(?P<di2>di)\b))",
            alternation(&mut words),
            alternation(&mut dotted),
        );
        let mut all: Vec<&str> = words.iter().chain(dotted.iter()).copied().collect();
        let exact = format!(
            r"^(?P<key>{})(?P<di>\s*\.\s*di|\s+di)?$",
            alternation(&mut all)
        );
        Ok(Self {
            matcher: Regex::new(&pattern)?,
            exact: Regex::new(&exact)?,
            expansions,
        })
    }

    /// Expansion of one abbreviation. `avv` reads "locuzione avverbiale"
    /// for multi-word headwords.
    pub fn expand(&self, abbreviation: &str, headword: &str) -> Option<String> {
        let key = abbreviation.split_whitespace().collect::<Vec<_>>().join(" ");
        if key == "avv" && headword.contains(' ') {
            return Some("locuzione avverbiale".to_string());
        }
        self.expansions
            .get(&key)
            .or_else(|| self.expansions.get(&key.replace(". ", ".")))
            .cloned()
    }

    /// Read the qualifier opening `definition`, if there is one.
    ///
    /// Without typography a leading "da" cannot be told apart from the
    /// preposition, so it never reads as a derivative here; see
    /// [`QualifierTable::parse_styled`].
    pub fn parse(&self, definition: &str, headword: &str) -> Option<Qualifier> {
        let caps = self.matcher.captures(definition.trim_start())?;
        let (key, derivative) = match (caps.name("abbr"), caps.name("word")) {
            (Some(abbr), _) => (abbr.as_str(), caps.name("di1").or(caps.name("di2")).is_some()),
            (None, Some(word)) => (word.as_str(), caps.name("di3").is_some()),
            (None, None) => return None,
        };
        let rest = &definition.trim_start()[caps.get(0)?.end()..];

        if key == DERIVATIVE_OF {
            return None;
        }

        Some(Qualifier {
            expansion: self.expand(&key_spacing(key), headword),
            derived_from: if derivative { bare_word(rest) } else { None },
        })
    }

    /// Read the qualifier of a styled definition.
    ///
    /// The qualifier is the opening italic run. A derivative ("dim. di",
    /// "da") names its base word as the only other run with letters in it,
    /// set in bold.
    pub fn parse_styled(&self, runs: &[TextRun], headword: &str) -> Option<Qualifier> {
        let mut visible = runs.iter().filter(|r| !r.is_blank());
        let first = visible.next()?;
        let label = first.text.trim();
        if !first.italic || label.chars().count() >= MAX_QUALIFIER_CHARS {
            return None;
        }
        let caps = self.exact.captures(label.trim_matches([' ', '.']))?;
        let key = caps.name("key")?.as_str();
        let derivative = key == DERIVATIVE_OF || caps.name("di").is_some();

        let mut worded = visible.filter(|r| has_letter(&r.text));
        let base = match (worded.next(), worded.next()) {
            (Some(run), None) if derivative && run.bold => bare_word(&run.text),
            _ => None,
        };

        if key == DERIVATIVE_OF {
            return base.map(|b| Qualifier {
                expansion: None,
                derived_from: Some(b),
            });
        }
        Some(Qualifier {
            expansion: self.expand(&key_spacing(key), headword),
            derived_from: base,
        })
    }
}

/// Canonical spacing of a matched key: `"intr.pron"` → `"intr. pron"`.
fn key_spacing(matched: &str) -> String {
    static DOT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s*(\w)").unwrap());
    let collapsed = matched.split_whitespace().collect::<Vec<_>>().join(" ");
    DOT_WORD.replace_all(&collapsed, ". $1").into_owned()
}

fn has_letter(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

/// The text is a single word, optionally closed by a dot: `" casa."`.
fn bare_word(text: &str) -> Option<String> {
    static BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([\p{L}’'\-]+)\s*\.?\s*$").unwrap());
    BARE.captures(text).map(|c| c[1].to_lowercase())
}

/// Shorthand for [`QualifierTable::parse`] with the built-in table.
pub fn parse_qualifier(definition: &str, headword: &str) -> Option<Qualifier> {
    DEFAULT_TABLE.parse(definition, headword)
}
