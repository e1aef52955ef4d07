//! Error message formatting with actionable suggestions.

use berth_core::BerthError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format a top-level error: message, cause chain, then a hint when one applies
    pub fn format_anyhow(&self, error: &anyhow::Error) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        for cause in error.chain().skip(1) {
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&cause.to_string());
            output.push('\n');
        }

        let suggestion = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<BerthError>())
            .and_then(BerthError::suggestion);
        if let Some(suggestion) = suggestion {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_format_includes_chain_and_hint() {
        let err: anyhow::Result<()> = Err(BerthError::ConfigValidation {
            field: "server.port".to_string(),
            reason: "0 is outside 1..=65535".to_string(),
        })
        .context("loading configuration");
        let text = ErrorFormatter::with_colors(ColorSupport::disabled()).format_anyhow(&err.unwrap_err());

        assert!(text.starts_with("error: loading configuration\n"));
        assert!(text.contains("caused by: Configuration field 'server.port' is invalid"));
        assert!(text.contains("help: Check the config file"));
    }

    #[test]
    fn test_format_plain_error() {
        let err = anyhow::anyhow!("binding 0.0.0.0:80");
        let text = ErrorFormatter::with_colors(ColorSupport::disabled()).format_anyhow(&err);
        assert_eq!(text, "error: binding 0.0.0.0:80\n");
    }
}
