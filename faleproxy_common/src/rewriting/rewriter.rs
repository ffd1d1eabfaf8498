/// The outcome of rewriting a single document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewritten {
    /// The serialized document with every mutation applied
    pub content: String,
    /// The rewritten text of the document's title, empty when it has none
    pub title: String,
}

pub trait Rewriter {
    fn rewrite(&self, input: &[u8]) -> anyhow::Result<Rewritten>;
}
