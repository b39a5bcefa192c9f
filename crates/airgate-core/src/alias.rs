/// A logical model name backed by concrete model ids or wildcard patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAlias {
    pub id: String,
    pub enabled: bool,
    /// Ordered entries, each a literal model id or a pattern containing `*`
    pub models: Vec<String>,
    /// Provider family the alias is listed under
    pub family: Option<String>,
}
