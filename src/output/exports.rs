use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Writes any report as JSON, pretty-printed on request.
pub fn export_json<T: Serialize + ?Sized>(
    value: &T,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_export_json_compact() {
        let mut buffer = Vec::new();

        export_json(&json!({"status": "SUCCESS"}), false, &mut buffer).unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), "{\"status\":\"SUCCESS\"}\n");
    }

    #[test]
    fn test_export_json_pretty() {
        let mut buffer = Vec::new();

        export_json(&json!({"status": "SUCCESS"}), true, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("\n  \"status\": \"SUCCESS\"\n"));
    }
}
