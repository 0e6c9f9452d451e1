//! Engine configuration.
//!
//! [`EngineConfig`] is the full, effective configuration. Collaborators push
//! changes as a [`ConfigUpdate`], where every field is optional and only the
//! fields present are merged. Both use camelCase field names so a stored
//! settings blob can be applied as is.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Which digits the numeral pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumeralScript {
    /// 〇一二三四五六七八九
    #[default]
    Chinese,
    /// ０１２３４５６７８９
    FullWidth,
    /// ٠١٢٣٤٥٦٧٨٩
    ArabicIndic,
    /// ०१२३४५६७८९
    Devanagari,
}

impl NumeralScript {
    pub fn digits(self) -> [char; 10] {
        match self {
            NumeralScript::Chinese => ['〇', '一', '二', '三', '四', '五', '六', '七', '八', '九'],
            NumeralScript::FullWidth => ['０', '１', '２', '３', '４', '５', '６', '７', '８', '９'],
            NumeralScript::ArabicIndic => ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'],
            NumeralScript::Devanagari => ['०', '१', '२', '३', '४', '५', '६', '७', '८', '९'],
        }
    }
}

/// A caller-supplied expression that replaces automaton matching for one term.
///
/// Flags use the familiar single-letter form. `g` and `y` are accepted but
/// have no effect: override search is always global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOverride")]
pub struct PatternOverride {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flags: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOverride {
    Pattern(String),
    Full {
        pattern: String,
        #[serde(default)]
        flags: String,
    },
}

impl From<RawOverride> for PatternOverride {
    fn from(raw: RawOverride) -> Self {
        match raw {
            RawOverride::Pattern(pattern) => PatternOverride::new(pattern),
            RawOverride::Full { pattern, flags } => PatternOverride { pattern, flags },
        }
    }
}

impl PatternOverride {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: String::new(),
        }
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    /// Compile for `term`. The term only appears in error messages.
    pub fn compile(&self, term: &str) -> Result<Regex> {
        let mut builder = RegexBuilder::new(&self.pattern);
        for flag in self.flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'u' => {
                    builder.unicode(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                'g' | 'y' => {}
                other => {
                    return Err(EngineError::UnknownFlag {
                        term: term.to_string(),
                        flag: other,
                    });
                }
            }
        }
        builder.build().map_err(|source| EngineError::InvalidPattern {
            term: term.to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub case_sensitive: bool,
    pub match_whole_word: bool,
    pub numbers_replacement: bool,
    pub numeral_script: NumeralScript,
    pub pattern_overrides: BTreeMap<String, PatternOverride>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            match_whole_word: true,
            numbers_replacement: false,
            numeral_script: NumeralScript::default(),
            pattern_overrides: BTreeMap::new(),
        }
    }
}

/// What a merge touched, so the engine only redoes the work it has to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigChanges {
    /// Case folding changed; the blacklist must be renormalized.
    pub case_sensitivity: bool,
    /// Anything the compiled rules depend on changed.
    pub rules: bool,
    pub overrides: bool,
}

impl EngineConfig {
    /// Merge the fields present in `update`. Pattern overrides are replaced
    /// as a whole, not merged key by key.
    pub fn merge(&mut self, update: ConfigUpdate) -> ConfigChanges {
        let mut changes = ConfigChanges::default();

        if let Some(case_sensitive) = update.case_sensitive {
            if case_sensitive != self.case_sensitive {
                self.case_sensitive = case_sensitive;
                changes.case_sensitivity = true;
                changes.rules = true;
            }
        }
        if let Some(match_whole_word) = update.match_whole_word {
            if match_whole_word != self.match_whole_word {
                self.match_whole_word = match_whole_word;
                changes.rules = true;
            }
        }
        if let Some(numbers_replacement) = update.numbers_replacement {
            self.numbers_replacement = numbers_replacement;
        }
        if let Some(numeral_script) = update.numeral_script {
            self.numeral_script = numeral_script;
        }
        if let Some(pattern_overrides) = update.pattern_overrides {
            if pattern_overrides != self.pattern_overrides {
                self.pattern_overrides = pattern_overrides;
                changes.overrides = true;
                changes.rules = true;
            }
        }

        changes
    }
}

/// Partial configuration. Absent fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_whole_word: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numbers_replacement: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeral_script: Option<NumeralScript>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_overrides: Option<BTreeMap<String, PatternOverride>>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = Some(value);
        self
    }

    pub fn match_whole_word(mut self, value: bool) -> Self {
        self.match_whole_word = Some(value);
        self
    }

    pub fn numbers_replacement(mut self, value: bool) -> Self {
        self.numbers_replacement = Some(value);
        self
    }

    pub fn numeral_script(mut self, value: NumeralScript) -> Self {
        self.numeral_script = Some(value);
        self
    }

    pub fn pattern_override(mut self, term: impl Into<String>, pattern: PatternOverride) -> Self {
        self.pattern_overrides
            .get_or_insert_with(BTreeMap::new)
            .insert(term.into(), pattern);
        self
    }
}
