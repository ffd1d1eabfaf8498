use std::borrow::Cow;

/// A fixed, ordered set of literal substitutions.
///
/// Pairs are applied one after another, each replacing every occurrence of its pattern in the
/// output of the previous one. The rule carries no state, so one instance can be shared by any
/// number of concurrent rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementRule {
    pairs: &'static [(&'static str, &'static str)],
}

/// Swaps the three case variants of `Yale` for the matching variants of `Fale`.
pub const YALE_TO_FALE: ReplacementRule = ReplacementRule {
    pairs: &[("YALE", "FALE"), ("Yale", "Fale"), ("yale", "fale")],
};

impl ReplacementRule {
    /// Applies every pair to `text`, borrowing the input when nothing matched.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut output = Cow::Borrowed(text);

        for &(pattern, replacement) in self.pairs {
            if output.contains(pattern) {
                output = Cow::Owned(output.replace(pattern, replacement));
            }
        }

        output
    }
}

impl Default for ReplacementRule {
    fn default() -> Self {
        YALE_TO_FALE
    }
}
