//! Code generation options

use weave_program::PackageLayout;

/// Import path of the Go advice-context runtime
pub const DEFAULT_RUNTIME_IMPORT: &str = "golang.org/x/exp/aspectgo/aspect/rt";

/// Local name the runtime is imported under
pub const DEFAULT_RUNTIME_ALIAS: &str = "aspectrt";

/// Imports and names the generated code refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Advice-context runtime import path
    pub runtime_import: String,
    /// Local name of the runtime import
    pub runtime_alias: String,
    /// Import path of the package holding the advice types
    pub advice_import: String,
    /// Local name of the advice import
    pub advice_alias: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime_import: DEFAULT_RUNTIME_IMPORT.to_string(),
            runtime_alias: DEFAULT_RUNTIME_ALIAS.to_string(),
            advice_import: weave_pointcut::DEFAULT_ADVICE_PACKAGE.to_string(),
            advice_alias: weave_pointcut::DEFAULT_ADVICE_PACKAGE.to_string(),
        }
    }
}

impl CodegenOptions {
    /// Options for an advice package named `advice_package` living at the
    /// top of `layout`
    #[must_use]
    pub fn for_layout(layout: &PackageLayout, advice_package: &str) -> Self {
        Self {
            advice_import: layout.import_path_for(advice_package),
            advice_alias: advice_package.to_string(),
            ..Self::default()
        }
    }

    /// Builder: set the runtime import
    #[must_use]
    pub fn with_runtime(mut self, import: impl Into<String>, alias: impl Into<String>) -> Self {
        self.runtime_import = import.into();
        self.runtime_alias = alias.into();
        self
    }

    /// Builder: set the advice import
    #[must_use]
    pub fn with_advice(mut self, import: impl Into<String>, alias: impl Into<String>) -> Self {
        self.advice_import = import.into();
        self.advice_alias = alias.into();
        self
    }
}
