use crate::core::builder::BuildSteps;
use crate::core::error::Result;

/// Runs the construction steps of a [`BuildSteps`] implementation in order.
pub struct GrubConfigurator<B> {
    builder: B,
}

impl<B: BuildSteps> GrubConfigurator<B> {
    pub fn new(builder: B) -> Self {
        Self { builder }
    }

    /// Create, write the header, write every entry, finalize.
    ///
    /// Stops at the first failing step and returns its error as is.
    pub fn construct(&mut self) -> Result<()> {
        self.builder.create()?;
        self.builder.write_header()?;
        self.builder.write_entries()?;
        self.builder.finalize()
    }

    /// Give the builder back, e.g. to inspect its final state.
    pub fn into_inner(self) -> B {
        self.builder
    }
}
