use crate::error::Result;
use crate::loader::LoadedTemplate;

/// Trait for loading generators from different sources.
pub trait TemplateLoader {
    /// Makes the generator available on the local filesystem.
    ///
    /// # Returns
    /// * `Result<LoadedTemplate>` - Generator root, alive as long as the value
    fn load(&self) -> Result<LoadedTemplate>;
}
