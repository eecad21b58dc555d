//! Splits message text into styled runs. Keyword and search matches are
//! marked per character and then coalesced, so overlapping ranges from the
//! two sets merge instead of competing.

use regex::Regex;

use crate::pattern::compile_case_insensitive;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Marks {
    pub keyword: bool,
    pub search: bool,
}

impl Marks {
    pub const PLAIN: Marks = Marks {
        keyword: false,
        search: false,
    };

    pub fn is_plain(self) -> bool {
        self == Self::PLAIN
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRun<'t> {
    pub text: &'t str,
    pub marks: Marks,
}

#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    keywords: Vec<Regex>,
    search: Option<Regex>,
}

impl Highlighter {
    pub fn new<S: AsRef<str>>(keywords: &[S], search: Option<&str>) -> Self {
        Self {
            keywords: keywords
                .iter()
                .filter_map(|keyword| compile_case_insensitive(keyword.as_ref()))
                .collect(),
            search: search.and_then(compile_case_insensitive),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.keywords.is_empty() && self.search.is_none()
    }

    pub fn highlight<'t>(&self, text: &'t str) -> Vec<HighlightRun<'t>> {
        if text.is_empty() {
            return Vec::new();
        }
        if self.is_noop() {
            return vec![HighlightRun {
                text,
                marks: Marks::PLAIN,
            }];
        }

        let starts: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        let mut marks = vec![Marks::PLAIN; starts.len()];

        for regex in &self.keywords {
            for found in regex.find_iter(text) {
                for mark in &mut marks[char_span(&starts, found.start(), found.end())] {
                    mark.keyword = true;
                }
            }
        }
        if let Some(regex) = &self.search {
            for found in regex.find_iter(text) {
                for mark in &mut marks[char_span(&starts, found.start(), found.end())] {
                    mark.search = true;
                }
            }
        }

        let mut runs = Vec::new();
        let mut run_start = 0;
        for index in 1..=marks.len() {
            if index < marks.len() && marks[index] == marks[run_start] {
                continue;
            }
            let begin = starts[run_start];
            let end = starts.get(index).copied().unwrap_or(text.len());
            runs.push(HighlightRun {
                text: &text[begin..end],
                marks: marks[run_start],
            });
            run_start = index;
        }
        runs
    }
}

/// Char indices covered by the byte range `[start, end)`.
fn char_span(starts: &[usize], start: usize, end: usize) -> std::ops::Range<usize> {
    starts.partition_point(|offset| *offset < start)..starts.partition_point(|offset| *offset < end)
}

pub fn concat_runs(runs: &[HighlightRun<'_>]) -> String {
    runs.iter().map(|run| run.text).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const K: Marks = Marks {
        keyword: true,
        search: false,
    };
    const S: Marks = Marks {
        keyword: false,
        search: true,
    };
    const KS: Marks = Marks {
        keyword: true,
        search: true,
    };

    fn shape<'t>(runs: &[HighlightRun<'t>]) -> Vec<(&'t str, Marks)> {
        runs.iter().map(|run| (run.text, run.marks)).collect()
    }

    #[test]
    fn overlapping_keyword_and_search_merge() {
        let highlighter = Highlighter::new(&["alpha"], Some("ha be"));
        let runs = highlighter.highlight("alpha beta");
        assert_eq!(
            shape(&runs),
            vec![
                ("alp", K),
                ("ha", KS),
                (" be", S),
                ("ta", Marks::PLAIN),
            ]
        );
    }

    #[test]
    fn overlapping_keywords_share_one_run() {
        let highlighter = Highlighter::new(&["fire", "ire eng"], None);
        let runs = highlighter.highlight("a fire engine");
        assert_eq!(
            shape(&runs),
            vec![("a ", Marks::PLAIN), ("fire eng", K), ("ine", Marks::PLAIN)]
        );
    }

    #[test]
    fn no_patterns_yields_single_plain_run() {
        let highlighter = Highlighter::new::<&str>(&[], None);
        assert_eq!(
            shape(&highlighter.highlight("quiet")),
            vec![("quiet", Marks::PLAIN)]
        );
        assert!(highlighter.highlight("").is_empty());
    }

    #[test]
    fn full_string_match_is_one_run() {
        let highlighter = Highlighter::new(&["BOX"], Some("box"));
        assert_eq!(shape(&highlighter.highlight("box")), vec![("box", KS)]);
    }

    #[test]
    fn multibyte_text_keeps_char_boundaries() {
        let highlighter = Highlighter::new(&["über"], Some("ß"));
        let runs = highlighter.highlight("Straße ÜBER alles");
        assert_eq!(
            shape(&runs),
            vec![
                ("Stra", Marks::PLAIN),
                ("ß", S),
                ("e ", Marks::PLAIN),
                ("ÜBER", K),
                (" alles", Marks::PLAIN),
            ]
        );
    }

    #[test]
    fn runs_reassemble_input_text() {
        let texts = [
            "",
            "alpha",
            "alpha beta alpha",
            "ALPHAalphaalpha",
            "nothing to see",
            "pit pit pit stop",
            "émoji 🚗 pit 🚗",
        ];
        let cases: [(&[&str], Option<&str>); 5] = [
            (&[], None),
            (&["alpha"], Some("pha a")),
            (&["pit", "it p", "a"], Some("t")),
            (&["🚗"], Some(" ")),
            (&["x*"], Some("(")),
        ];
        for text in texts {
            for (keywords, search) in cases {
                let runs = Highlighter::new(keywords, search).highlight(text);
                assert_eq!(concat_runs(&runs), text);
                for pair in runs.windows(2) {
                    assert!(pair[0].marks != pair[1].marks, "runs must be maximal");
                }
            }
        }
    }
}
