use serde::Deserialize;

/// Body of the index form, also accepted as a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WrappedForm {
    #[serde(default)]
    pub goodreads_user_id: Option<String>,
}

impl WrappedForm {
    /// The submitted id, or `default_user_id` when absent or blank.
    pub fn user_id_or(&self, default_user_id: &str) -> String {
        self.goodreads_user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(default_user_id)
            .to_owned()
    }
}
