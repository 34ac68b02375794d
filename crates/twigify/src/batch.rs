//! Directory scan and parallel conversion of source templates.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use twigify_core::{ConvertOptions, Converter, DocumentKind};

use crate::error::{CliError, DocumentError};

/// Outcome of converting one source template.
#[derive(Debug)]
pub(crate) struct Converted {
    /// Source template path.
    pub source: PathBuf,
    /// File name of the generated template.
    pub target_name: String,
    /// Generated template text, or why it could not be produced.
    pub result: Result<String, DocumentError>,
}

/// List files in `input_dir` (non-recursive) carrying the source extension,
/// sorted by path.
pub(crate) fn scan(input_dir: &Path, options: &ConvertOptions) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| strip_extension(name, &options.source_extension).is_some());
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Output file name for a source file name: the source extension is replaced
/// by the target one.
pub(crate) fn target_name(file_name: &str, options: &ConvertOptions) -> String {
    let stem = strip_extension(file_name, &options.source_extension).unwrap_or(file_name);
    format!("{stem}.{}", options.target_extension)
}

/// `name` without `.extension`, if it ends with it and has a non-empty stem.
fn strip_extension<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    name.strip_suffix(extension)?
        .strip_suffix('.')
        .filter(|stem| !stem.is_empty())
}

/// Convert every file in parallel.
///
/// Results keep the order of `files`. Each document gets its own conversion
/// state, so one failing document does not affect the others.
pub(crate) fn convert_all(files: &[PathBuf], converter: &Converter) -> Vec<Converted> {
    files
        .par_iter()
        .map(|path| convert_one(path, converter))
        .collect()
}

fn convert_one(path: &Path, converter: &Converter) -> Converted {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let target_name = target_name(&file_name, converter.options());

    let result = std::fs::read_to_string(path)
        .map_err(DocumentError::from)
        .and_then(|source| {
            let kind = DocumentKind::detect(&source);
            tracing::debug!(file = %file_name, ?kind, "Converting template");
            converter.convert(&source, kind).map_err(DocumentError::from)
        });

    Converted {
        source: path.to_path_buf(),
        target_name,
        result,
    }
}

/// Write one generated template, creating the output directory if needed.
pub(crate) fn write_output(
    output_dir: &Path,
    target_name: &str,
    content: &str,
) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(target_name);
    std::fs::write(&path, content).map_err(|source| CliError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.mtt", "");
        write(dir.path(), "a.mtt", "");
        write(dir.path(), "notes.txt", "");
        write(dir.path(), ".mtt", "");
        std::fs::create_dir(dir.path().join("nested.mtt")).unwrap();

        let files = scan(dir.path(), &ConvertOptions::default()).unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("a.mtt"), dir.path().join("b.mtt")]
        );
    }

    #[test]
    fn test_scan_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(&dir.path().join("missing"), &ConvertOptions::default()).is_err());
    }

    #[test]
    fn test_target_name() {
        let options = ConvertOptions::default();
        assert_eq!(target_name("page.mtt", &options), "page.twig");
        assert_eq!(target_name("page.html.mtt", &options), "page.html.twig");

        let options = options
            .with_source_extension("tpl")
            .with_target_extension("html.twig");
        assert_eq!(target_name("page.tpl", &options), "page.html.twig");
    }

    #[test]
    fn test_convert_all_keeps_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.mtt", "<p>::if a::x::end::</p>");
        write(dir.path(), "b.mtt", "<p>::end::</p>");
        write(dir.path(), "c.mtt", "<macros><macro name=\"m()\">y</macro></macros>");

        let files = scan(dir.path(), &ConvertOptions::default()).unwrap();
        let converted = convert_all(&files, &Converter::default());

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].target_name, "a.twig");
        assert_eq!(
            converted[0].result.as_deref().unwrap(),
            "<p>{% if a %}x{% endif %}</p>"
        );
        assert!(matches!(
            converted[1].result,
            Err(DocumentError::Convert(_))
        ));
        assert_eq!(
            converted[2].result.as_deref().unwrap(),
            "{% macro m() %}y{% endmacro %}"
        );
    }

    #[test]
    fn test_write_output_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out").join("twig");

        let path = write_output(&output_dir, "a.twig", "x").unwrap();

        assert_eq!(path, output_dir.join("a.twig"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x");
    }
}
