//! Layered fuzzy matching of a query against one item.
//!
//! Each field is tried from the strongest layer down and stops at the first
//! layer that matches:
//!
//! | layer       | default range |
//! |-------------|---------------|
//! | exact       | 1500          |
//! | prefix      | [1200, 1300)  |
//! | substring   | [900, 1000)   |
//! | description | [600, 700)    |
//! | subsequence | [200, 400)    |
//!
//! Fields are the display name, then the program name of the exec target, then
//! (optionally) the description. A later field only gets a say when it can beat
//! the layer already found. Description hits (exact, prefix or substring) are
//! squeezed into their own band, below any contiguous name match and above any
//! subsequence.

use serde::{Deserialize, Serialize};

use super::item::{normalize, Item};

/// Width of the prefix and substring score bands.
pub const SPREAD: u32 = 100;

/// How much a program-name match trails a display-name match of the same layer.
pub const EXEC_FIELD_PENALTY: u32 = 10;

/// Minimum distance between the top of one band and the bottom of the next.
///
/// Covers the largest allowed category bias (`SPREAD`) plus the program-name
/// penalty, so neither can move a match across a layer.
pub const BAND_GAP: u32 = SPREAD + EXEC_FIELD_PENALTY;

/// Top score of each layer. Defaults keep every band disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub exact: u32,
    pub prefix: u32,
    pub substring: u32,
    pub description: u32,
    pub subsequence: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            exact: 1500,
            prefix: 1300,
            substring: 1000,
            description: 700,
            subsequence: 400,
        }
    }
}

impl ScoreWeights {
    /// Check that the bands keep their order with room for bias and penalty.
    pub fn validate(&self) -> Result<(), String> {
        if self.subsequence < 2 {
            return Err(format!(
                "subsequence weight must be at least 2, got {}",
                self.subsequence
            ));
        }

        // (lower name, lower top, upper name, upper bottom)
        let bands = [
            ("subsequence", self.subsequence, "description", self.description),
            ("description", self.description, "substring", self.substring),
            ("substring", self.substring, "prefix", self.prefix),
        ];
        for (lower, top, upper, weight) in bands {
            if u64::from(weight) < u64::from(top) + u64::from(SPREAD + BAND_GAP) {
                return Err(format!(
                    "{upper} weight {weight} must exceed {lower} weight {top} by at least {}",
                    SPREAD + BAND_GAP
                ));
            }
        }

        if u64::from(self.exact) < u64::from(self.prefix) + u64::from(BAND_GAP) {
            return Err(format!(
                "exact weight {} must exceed prefix weight {} by at least {BAND_GAP}",
                self.exact, self.prefix
            ));
        }
        Ok(())
    }
}

/// Match layers, weakest first so that `Ord` follows strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Subsequence,
    Substring,
    Prefix,
    Exact,
}

impl Layer {
    fn stronger(self) -> Option<Layer> {
        match self {
            Layer::Subsequence => Some(Layer::Substring),
            Layer::Substring => Some(Layer::Prefix),
            Layer::Prefix => Some(Layer::Exact),
            Layer::Exact => None,
        }
    }
}

/// Which part of the item produced the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchedField {
    Name,
    Program,
    Description,
    /// Empty query: everything matches
    Browse,
}

/// A scored item, consumed by the ranker.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub item: &'a Item,
    pub score: u32,
    pub field: MatchedField,
    pub layer: Option<Layer>,
}

/// A query as typed plus its normalized form.
#[derive(Debug, Clone)]
pub struct Query {
    raw: String,
    normalized: String,
    chars: Vec<char>,
}

impl Query {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        let chars = normalized.chars().collect();
        Self {
            raw,
            normalized,
            chars,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldMatch {
    layer: Layer,
    score: u32,
    field: MatchedField,
}

/// Scores items against queries. Holds no mutable state.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    weights: ScoreWeights,
    match_descriptions: bool,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(ScoreWeights::default(), true)
    }
}

impl Matcher {
    pub fn new(weights: ScoreWeights, match_descriptions: bool) -> Self {
        Self {
            weights,
            match_descriptions,
        }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score one item, or `None` when no field matches.
    pub fn score<'a>(&self, query: &Query, item: &'a Item) -> Option<Match<'a>> {
        if query.is_empty() {
            return Some(Match {
                item,
                score: 0,
                field: MatchedField::Browse,
                layer: None,
            });
        }

        let mut best = self
            .score_layers(query, item.normalized_name(), Layer::Subsequence)
            .map(|(layer, score)| FieldMatch {
                layer,
                score,
                field: MatchedField::Name,
            });

        if let Some(program) = item.normalized_program() {
            let lowest = match best {
                Some(found) => found.layer.stronger(),
                None => Some(Layer::Subsequence),
            };
            if let Some(lowest) = lowest {
                if let Some((layer, score)) = self.score_layers(query, program, lowest) {
                    best = Some(FieldMatch {
                        layer,
                        score: score.saturating_sub(EXEC_FIELD_PENALTY),
                        field: MatchedField::Program,
                    });
                }
            }
        }

        // The description band sits above subsequence, so it can still improve
        // on a scattered name match
        let weak = best.map_or(true, |found| found.layer == Layer::Subsequence);
        if weak && self.match_descriptions {
            if let Some(description) = item.normalized_description() {
                if let Some((layer, score)) =
                    self.score_layers(query, description, Layer::Substring)
                {
                    best = Some(FieldMatch {
                        layer,
                        score: self.description_score(score),
                        field: MatchedField::Description,
                    });
                }
            }
        }

        best.map(|found| Match {
            item,
            score: found.score,
            field: found.field,
            layer: Some(found.layer),
        })
    }

    /// Map a contiguous-layer score into the description band.
    ///
    /// Keeps the exact > prefix > substring order inside the band.
    fn description_score(&self, score: u32) -> u32 {
        let low = self.weights.substring.saturating_sub(SPREAD);
        let range = self.weights.exact.saturating_sub(low) + 1;
        let offset = score.saturating_sub(low).min(range - 1);
        self.weights.description.saturating_sub(SPREAD) + offset * SPREAD / range
    }

    /// Try layers from exact down to `lowest`, returning the first hit.
    fn score_layers(&self, query: &Query, field: &str, lowest: Layer) -> Option<(Layer, u32)> {
        if field.is_empty() {
            return None;
        }

        let needle = query.normalized();
        let query_len = query.chars.len() as u32;

        if field == needle {
            return Some((Layer::Exact, self.weights.exact));
        }

        let field_chars: Vec<char> = field.chars().collect();
        let field_len = field_chars.len() as u32;
        if query_len >= field_len {
            return None;
        }

        if lowest <= Layer::Prefix && field.starts_with(needle) {
            let base = self.weights.prefix.saturating_sub(SPREAD);
            let score = base + SPREAD * query_len / field_len;
            return Some((Layer::Prefix, score));
        }

        if lowest <= Layer::Substring {
            if let Some(byte_pos) = field.find(needle) {
                let position = field[..byte_pos].chars().count() as u32;
                let base = self.weights.substring.saturating_sub(SPREAD);
                let score = base + SPREAD * (field_len - position) / field_len;
                return Some((Layer::Substring, score));
            }
        }

        if lowest <= Layer::Subsequence {
            let span = tightest_span(&field_chars, &query.chars)? as u32;
            let half = self.weights.subsequence / 2;
            return Some((Layer::Subsequence, half + half * query_len / span));
        }

        None
    }
}

/// Length of the shortest window of `field` containing `query` in order.
fn tightest_span(field: &[char], query: &[char]) -> Option<usize> {
    let (first, rest) = query.split_first()?;
    let mut best: Option<usize> = None;

    for start in 0..field.len() {
        if field[start] != *first {
            continue;
        }

        let mut cursor = start + 1;
        for wanted in rest {
            match field[cursor..].iter().position(|c| c == wanted) {
                Some(offset) => cursor += offset + 1,
                // Later starts have even less text left to search
                None => return best,
            }
        }

        let span = cursor - start;
        if best.map_or(true, |b| span < b) {
            best = Some(span);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::{Category, ExecTarget};

    fn app(name: &str, exec: &str) -> Item {
        Item::new(
            name.to_lowercase(),
            name,
            ExecTarget::Argv(vec![exec.to_string()]),
            Category::Application,
        )
    }

    fn score(query: &str, item: &Item) -> Option<(u32, MatchedField, Option<Layer>)> {
        Matcher::default()
            .score(&Query::new(query), item)
            .map(|m| (m.score, m.field, m.layer))
    }

    #[test]
    fn test_query_normalization() {
        let query = Query::new("  FireFox ");
        assert_eq!(query.raw(), "  FireFox ");
        assert_eq!(query.normalized(), "firefox");
        assert!(Query::new("   ").is_empty());
    }

    #[test]
    fn test_exact_match() {
        let item = Item::command("firefox");
        assert_eq!(
            score("Firefox", &item),
            Some((1500, MatchedField::Name, Some(Layer::Exact)))
        );
    }

    #[test]
    fn test_prefix_scales_with_coverage() {
        let item = Item::command("firefox");
        let (short, _, layer) = score("f", &item).unwrap();
        let (long, _, _) = score("firefo", &item).unwrap();

        assert_eq!(layer, Some(Layer::Prefix));
        assert!(short >= 1200 && short < 1300);
        assert!(long > short);
        assert!(long < 1300);
    }

    #[test]
    fn test_substring_prefers_earlier_occurrence() {
        let early = Item::command("xfoxxxxxxx");
        let late = Item::command("xxxxxxxfox");
        let (early_score, _, layer) = score("fox", &early).unwrap();
        let (late_score, _, _) = score("fox", &late).unwrap();

        assert_eq!(layer, Some(Layer::Substring));
        assert!(early_score > late_score);
        assert!(late_score >= 900 && early_score < 1000);
    }

    #[test]
    fn test_fox_is_substring_of_firefox() {
        let firefox = app("Firefox", "firefox");
        let (fox, field, layer) = score("fox", &firefox).unwrap();
        let (full, _, _) = score("firefox", &firefox).unwrap();

        assert_eq!(layer, Some(Layer::Substring));
        assert_eq!(field, MatchedField::Name);
        assert!(fox > 0);
        assert!(full > fox);
    }

    #[test]
    fn test_subsequence_compactness() {
        let tight = Item::command("gnome-terminal");
        let loose = Item::command("g-n-o-m-e-t");
        let (tight_score, _, layer) = score("gt", &tight).unwrap();
        let (loose_score, _, _) = score("gnt", &loose).unwrap();

        assert_eq!(layer, Some(Layer::Subsequence));
        assert!((200..400).contains(&tight_score));
        assert!((200..400).contains(&loose_score));

        let clustered = Item::command("abxc________");
        let spread = Item::command("a____b____c_");
        assert!(score("abc", &clustered).unwrap().0 > score("abc", &spread).unwrap().0);
    }

    #[test]
    fn test_tightest_window_is_used() {
        // Starting at the first 'a' gives a span of 10, the later 'a' gives 3
        let item = Item::command("a______abc");
        let (s, _, layer) = score("ac", &item).unwrap();
        assert_eq!(layer, Some(Layer::Subsequence));
        assert_eq!(s, 200 + 200 * 2 / 3);
    }

    #[test]
    fn test_not_a_subsequence_is_none() {
        let item = Item::command("firefox");
        assert_eq!(score("xyz", &item), None);
        assert_eq!(score("fxr", &item), None);
        assert_eq!(score("firefoxes", &item), None);
    }

    #[test]
    fn test_layer_ordering_for_same_field() {
        let item = Item::command("terminal");
        let exact = score("terminal", &item).unwrap().0;
        let prefix = score("termina", &item).unwrap().0;
        let substring = score("erminal", &item).unwrap().0;
        let subsequence = score("trminal", &item).unwrap().0;

        assert!(exact > prefix);
        assert!(prefix > substring);
        assert!(substring > subsequence);
    }

    #[test]
    fn test_program_name_match() {
        let code = app("Visual Studio Code", "/usr/bin/code");
        let (s, field, layer) = score("code", &code).unwrap();

        assert_eq!(field, MatchedField::Program);
        assert_eq!(layer, Some(Layer::Exact));
        assert_eq!(s, 1500 - EXEC_FIELD_PENALTY);
    }

    #[test]
    fn test_program_only_considered_for_stronger_layer() {
        // Name prefix-matches; program would only prefix-match as well
        let item = app("Gimp Image Editor", "gimp-2.10");
        let (_, field, layer) = score("gimp", &item).unwrap();
        assert_eq!(field, MatchedField::Name);
        assert_eq!(layer, Some(Layer::Prefix));
    }

    #[test]
    fn test_description_match_is_weaker() {
        let item = app("Files", "nautilus").with_description("Access and organize files");
        let (s, field, layer) = score("organize", &item).unwrap();

        assert_eq!(field, MatchedField::Description);
        assert_eq!(layer, Some(Layer::Substring));
        assert!((600..700).contains(&s));

        // Any contiguous name match still wins
        let organizer = Item::command("organizer-tool");
        let (name_score, _, _) = score("organize", &organizer).unwrap();
        assert!(name_score > s + SPREAD);
    }

    #[test]
    fn test_description_outranks_name_subsequence() {
        let files = app("Files", "nautilus").with_description("the organizer");
        let scattered = Item::command("o-rgan");

        let (described, field, _) = score("organ", &files).unwrap();
        let (subsequence, _, layer) = score("organ", &scattered).unwrap();

        assert_eq!(field, MatchedField::Description);
        assert_eq!(layer, Some(Layer::Subsequence));
        assert!(described > subsequence);
    }

    #[test]
    fn test_description_improves_on_name_subsequence() {
        // "term" is scattered through the name but contiguous in the description
        let item = app("The Easy Remote Manager", "erm").with_description("terminal sessions");
        let (s, field, layer) = score("term", &item).unwrap();

        assert_eq!(field, MatchedField::Description);
        assert_eq!(layer, Some(Layer::Prefix));
        assert!((600..700).contains(&s));
    }

    #[test]
    fn test_description_band_keeps_layer_order() {
        let matcher = Matcher::default();
        let exact = matcher.description_score(1500);
        let prefix = matcher.description_score(1299);
        let substring = matcher.description_score(900);

        assert!(exact > prefix && prefix > substring);
        assert_eq!(substring, 600);
        assert!(exact < 700);
    }

    #[test]
    fn test_description_disabled() {
        let item = app("Files", "nautilus").with_description("Access and organize files");
        let matcher = Matcher::new(ScoreWeights::default(), false);
        assert!(matcher.score(&Query::new("organize"), &item).is_none());
    }

    #[test]
    fn test_description_skips_subsequence() {
        let item = app("Files", "nautilus").with_description("Access and organize files");
        assert_eq!(score("azn", &item), None);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let item = Item::command("ls");
        assert_eq!(score("", &item), Some((0, MatchedField::Browse, None)));
    }

    #[test]
    fn test_unicode_fields() {
        let item = Item::command("éditeur-ünïcode");
        let (_, _, layer) = score("ÉDIT", &item).unwrap();
        assert_eq!(layer, Some(Layer::Prefix));
        assert_eq!(score("ëü", &item), None);
        let (s, _, layer) = score("éü", &item).unwrap();
        assert_eq!(layer, Some(Layer::Subsequence));
        assert!((200..400).contains(&s));
    }

    #[test]
    fn test_default_weights_validate() {
        assert!(ScoreWeights::default().validate().is_ok());
    }

    #[test]
    fn test_overlapping_weights_rejected() {
        let weights = ScoreWeights {
            substring: 650,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());

        let weights = ScoreWeights {
            exact: 1250,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());

        let weights = ScoreWeights {
            description: 350,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_touching_weights_rejected() {
        // Bands [200, 400) and [400, 500) touch, so a biased subsequence
        // would overtake an unbiased description
        let weights = ScoreWeights {
            description: 500,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());

        let weights = ScoreWeights {
            exact: 1300 + BAND_GAP - 1,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());

        let weights = ScoreWeights {
            description: 400 + SPREAD + BAND_GAP,
            substring: 400 + 2 * (SPREAD + BAND_GAP),
            prefix: 400 + 3 * (SPREAD + BAND_GAP),
            exact: 400 + 3 * (SPREAD + BAND_GAP) + BAND_GAP,
            subsequence: 400,
        };
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_huge_weights_do_not_overflow() {
        let weights = ScoreWeights {
            exact: u32::MAX,
            prefix: u32::MAX,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());
    }
}
