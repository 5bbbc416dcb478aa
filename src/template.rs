//! Minimal `$name` / `${name}` text templates.
//!
//! The tools fed by these templates are column- and whitespace-sensitive, so
//! the engine never touches anything outside a placeholder. `$$` produces a
//! literal dollar sign.

use crate::error::{StepError, StepResult};
use std::collections::BTreeMap;

pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template<'a> {
    text: &'a str,
}

impl<'a> Template<'a> {
    pub const fn new(text: &'a str) -> Self {
        Self { text }
    }

    #[cfg(test)]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Fill every placeholder. Unknown keys fail with `MissingParameter`,
    /// malformed placeholders with `InvalidPlaceholder`. Extra entries in
    /// `params` are ignored.
    pub fn substitute(&self, params: &Params) -> StepResult<String> {
        self.render(params, true)
    }

    /// Fill what can be filled and leave everything else as written.
    pub fn safe_substitute(&self, params: &Params) -> String {
        // Non-strict rendering has no failure path.
        self.render(params, false).unwrap_or_else(|_| self.text.to_string())
    }

    fn render(&self, params: &Params, strict: bool) -> StepResult<String> {
        let text = self.text;
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while let Some(offset) = text[i..].find('$') {
            let start = i + offset;
            out.push_str(&text[i..start]);

            match parse_placeholder(&text[start + 1..]) {
                Placeholder::Escaped => {
                    out.push('$');
                    i = start + 2;
                }
                Placeholder::Named { name, consumed } => {
                    match params.get(name) {
                        Some(value) => out.push_str(value),
                        None if strict => return Err(StepError::MissingParameter(name.into())),
                        None => out.push_str(&text[start..start + 1 + consumed]),
                    }
                    i = start + 1 + consumed;
                }
                Placeholder::Invalid => {
                    if strict {
                        return Err(StepError::InvalidPlaceholder { position: start });
                    }
                    out.push('$');
                    i = start + 1;
                }
            }
        }

        out.push_str(&text[i..]);
        Ok(out)
    }
}

enum Placeholder<'a> {
    Escaped,
    Named { name: &'a str, consumed: usize },
    Invalid,
}

/// `rest` is the text immediately after a `$`.
fn parse_placeholder(rest: &str) -> Placeholder<'_> {
    if rest.starts_with('$') {
        return Placeholder::Escaped;
    }
    if let Some(braced) = rest.strip_prefix('{') {
        return match braced.find('}') {
            Some(end) if identifier_len(&braced[..end]) == end && end > 0 => Placeholder::Named {
                name: &braced[..end],
                consumed: end + 2,
            },
            _ => Placeholder::Invalid,
        };
    }
    match identifier_len(rest) {
        0 => Placeholder::Invalid,
        len => Placeholder::Named {
            name: &rest[..len],
            consumed: len,
        },
    }
}

fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (idx, c) in s.char_indices() {
        let ok = c == '_' || c.is_ascii_alphabetic() || (idx > 0 && c.is_ascii_digit());
        if !ok {
            break;
        }
        len = idx + c.len_utf8();
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fills_bare_and_braced_placeholders() {
        let t = Template::new("at ${frame}.imh\nFW=$fwhm\n");
        let out = t
            .substitute(&params(&[("frame", "n21158"), ("fwhm", "3.01")]))
            .unwrap();
        assert_eq!(out, "at n21158.imh\nFW=3.01\n");
    }

    #[test]
    fn braces_allow_adjacent_text() {
        let t = Template::new("cd ${work_dir}${frame}\nedt${frame}.als2");
        let out = t
            .substitute(&params(&[("work_dir", "/data/"), ("frame", "n1")]))
            .unwrap();
        assert_eq!(out, "cd /data/n1\nedtn1.als2");
    }

    #[test]
    fn strict_reports_the_missing_key() {
        let t = Template::new("${frame}.ap\n$num_stars $mag_limit\n");
        let err = t
            .substitute(&params(&[("frame", "n1"), ("num_stars", "150")]))
            .unwrap_err();
        assert!(matches!(err, StepError::MissingParameter(ref k) if k == "mag_limit"));
    }

    #[test]
    fn extra_keys_are_ignored() {
        let t = Template::new("fi=$fwhm");
        let out = t
            .substitute(&params(&[("fwhm", "2.5"), ("frame", "unused")]))
            .unwrap();
        assert_eq!(out, "fi=2.5");
    }

    #[test]
    fn strict_rejects_positional_shell_parameters() {
        let t = Template::new("rm poly?$2.dat");
        let err = t.substitute(&Params::new()).unwrap_err();
        assert!(matches!(err, StepError::InvalidPlaceholder { position: 8 }));
    }

    #[test]
    fn safe_mode_leaves_unknowns_alone() {
        let t = Template::new("echo \"$apcorr\" ${frame} $2 $");
        let out = t.safe_substitute(&params(&[("frame", "n1")]));
        assert_eq!(out, "echo \"$apcorr\" n1 $2 $");
    }

    #[test]
    fn double_dollar_is_literal() {
        let t = Template::new("cost $$5 for $item");
        let out = t.substitute(&params(&[("item", "tea")])).unwrap();
        assert_eq!(out, "cost $5 for tea");
    }

    #[test]
    fn blank_lines_survive() {
        let t = Template::new("ph\n\n\n$frame.coo\n");
        let out = t.substitute(&params(&[("frame", "n1")])).unwrap();
        assert_eq!(out, "ph\n\n\nn1.coo\n");
    }
}
