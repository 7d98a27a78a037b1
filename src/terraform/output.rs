//! Decoding of Terraform output variables.

use serde::Deserialize;
use thiserror::Error;

use super::{Terraform, TerraformError};
use crate::exec::CommandRunner;

/// Errors raised while reading an output variable.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum OutputError {
    /// Raised when the `output` command cannot run or exits unsuccessfully.
    #[error("could not read output variable {name}: {source}")]
    Lookup {
        /// Variable name.
        name: String,
        /// Underlying invocation failure.
        #[source]
        source: TerraformError,
    },
    /// Raised when the response is not a recognised output document.
    #[error("could not decode output variable {name}: {message}")]
    Decode {
        /// Variable name.
        name: String,
        /// Decoder error message.
        message: String,
    },
}

/// Structured value of a Terraform output variable.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct OutputVariable {
    /// Whether Terraform marks the value as sensitive.
    #[serde(default)]
    pub sensitive: bool,
    /// Terraform's type description of the value.
    #[serde(rename = "type", default)]
    pub output_type: serde_json::Value,
    /// String values of the variable.
    #[serde(default)]
    pub value: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OutputDocument {
    Structured(OutputVariable),
    Bare(Vec<String>),
}

impl From<OutputDocument> for OutputVariable {
    fn from(document: OutputDocument) -> Self {
        match document {
            OutputDocument::Structured(variable) => variable,
            OutputDocument::Bare(value) => Self {
                value,
                ..Self::default()
            },
        }
    }
}

/// Reads output variables from a Terraform state directory.
#[derive(Debug)]
pub struct OutputVariableReader<'s, 'a, R> {
    terraform: &'s Terraform<'a, R>,
}

impl<'s, 'a, R: CommandRunner> OutputVariableReader<'s, 'a, R> {
    pub(super) const fn new(terraform: &'s Terraform<'a, R>) -> Self {
        Self { terraform }
    }

    /// Runs `output -json <name>` and decodes the response.
    ///
    /// Both the structured document and a bare JSON string array are
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Lookup`] when the tool fails and
    /// [`OutputError::Decode`] when the response cannot be decoded.
    pub fn read(&self, name: &str) -> Result<OutputVariable, OutputError> {
        let lookup = |source| OutputError::Lookup {
            name: name.to_owned(),
            source,
        };
        let output = self
            .terraform
            .run_quiet(&["output", "-json", name])
            .map_err(lookup)?;
        if !output.is_success() {
            return Err(lookup(TerraformError::Failed {
                subcommand: String::from("output"),
                status: output.status_text(),
                output: format!("{}{}", output.stdout, output.stderr),
            }));
        }
        let document: OutputDocument =
            serde_json::from_str(output.stdout.trim()).map_err(|err| OutputError::Decode {
                name: name.to_owned(),
                message: err.to_string(),
            })?;
        Ok(document.into())
    }

    /// Reads `name` and returns only its string values.
    ///
    /// # Errors
    ///
    /// Propagates [`OutputVariableReader::read`] failures.
    pub fn read_string_slice(&self, name: &str) -> Result<Vec<String>, OutputError> {
        Ok(self.read(name)?.value)
    }
}
