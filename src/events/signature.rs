/// Declared parameter names of an instrumented function or task.
///
/// Stands in for runtime introspection: the host declares the
/// positional-or-keyword parameter names (and the var-positional
/// catch-all, when the function has one) once, next to the function.
/// Keyword-only and var-keyword parameter kinds are unsupported.
#[derive(Debug, Clone)]
pub struct FnSignature {
    name: String,
    params: Vec<String>,
    vararg: Option<String>,
}

pub(crate) const DEFAULT_CATCHALL: &str = "args";

impl FnSignature {
    pub fn new(
        name: impl Into<String>,
        params: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            vararg: None,
        }
    }

    /// Name the var-positional catch-all; surplus positional arguments are
    /// recorded as `<name>_<index>`.
    pub fn with_vararg(mut self, name: impl Into<String>) -> Self {
        self.vararg = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn params(&self) -> &[String] {
        &self.params
    }

    pub(crate) fn vararg(&self) -> Option<&str> {
        self.vararg.as_deref()
    }
}
