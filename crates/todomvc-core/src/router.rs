use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub filter_by: Option<String>,
}

impl Route {
    // Only the single-segment `/:filterBy` pattern yields a parameter.
    pub fn from_fragment(fragment: &str) -> Self {
        let trimmed = fragment.trim();
        let path = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);

        if path.is_empty() {
            return Self::default();
        }

        if path.contains('/') {
            debug!(fragment = %fragment, "fragment does not match /:filterBy");
            return Self::default();
        }

        Self {
            filter_by: Some(path.to_string()),
        }
    }

    pub fn to_fragment(&self) -> String {
        match &self.filter_by {
            Some(param) => format!("#/{param}"),
            None => "#/".to_string(),
        }
    }
}
