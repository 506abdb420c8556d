#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    /// Upper bound on the number of operations in a candidate. Branches that would exceed it are
    /// abandoned. With `None`, termination is up to the catalog.
    pub node_limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { node_limit: None }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassOptions {
    pub elide_copies: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self { elide_copies: true }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EmitFormat {
    Text,
    Json,
}

impl Default for EmitFormat {
    fn default() -> Self {
        EmitFormat::Text
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub search: SearchOptions,
    pub passes: PassOptions,
}
