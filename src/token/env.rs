use super::{MacroError, MacroExpander};
use crate::host::Environment;

/// Expands `${NAME}`, `${NAME, arg=value}` and `$NAME` from the build environment.
///
/// Arguments after the first comma are accepted and ignored. Unknown names are an evaluation
/// error rather than being left in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvExpander;

impl MacroExpander for EnvExpander {
    fn expand(&self, template: &str, environment: &Environment) -> Result<Option<String>, MacroError> {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('$') {
            output.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            if let Some(body) = after.strip_prefix('{') {
                let end = body
                    .find('}')
                    .ok_or_else(|| MacroError::Evaluation(format!("Unterminated macro in '{template}'")))?;
                let name = body[..end].split(',').next().unwrap_or("").trim();
                output.push_str(lookup(environment, name)?);
                rest = &body[end + 1..];
            } else if after.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                output.push_str(lookup(environment, &after[..end])?);
                rest = &after[end..];
            } else {
                output.push('$');
                rest = after;
            }
        }
        output.push_str(rest);

        Ok(Some(output))
    }
}

fn lookup<'e>(environment: &'e Environment, name: &str) -> Result<&'e str, MacroError> {
    environment
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| MacroError::Evaluation(format!("Unrecognized macro '{name}'")))
}
