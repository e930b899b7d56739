//! Markdown block rendering for exported files.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use anyhow::Result;

/// Built-in extension to fence-language table.
const BUILTIN_LANGUAGES: &[(&str, &str)] = &[
    (".py", "python"),
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".ts", "typescript"),
    (".css", "css"),
    (".html", "html"),
    (".htm", "html"),
    (".xml", "xml"),
    (".json", "json"),
    (".sh", "shell"),
    (".bat", "batch"),
    (".ps1", "powershell"),
    (".md", "markdown"),
    (".yaml", "yaml"),
    (".yml", "yaml"),
    (".txt", "text"),
    (".c", "c"),
    (".cpp", "cpp"),
    (".h", "c"),
    (".hpp", "cpp"),
    (".java", "java"),
    (".go", "go"),
    (".rs", "rust"),
    (".php", "php"),
    (".rb", "ruby"),
    (".swift", "swift"),
    (".kt", "kotlin"),
    (".scala", "scala"),
    (".dart", "dart"),
    (".lua", "lua"),
    (".pl", "perl"),
    (".r", "r"),
    (".sql", "sql"),
    (".cs", "csharp"),
    (".vb", "vbnet"),
    (".fs", "fsharp"),
];

/// Maps lower-cased file extensions (leading dot included) to fence tags.
#[derive(Debug, Clone)]
pub struct LanguageMap {
    tags: HashMap<String, String>,
}

impl LanguageMap {
    /// Map preloaded with the built-in extension table.
    pub fn new() -> Self {
        Self::from_entries(BUILTIN_LANGUAGES.iter().copied())
    }

    /// Map with caller-provided entries only. Keys are lower-cased.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let tags = entries
            .into_iter()
            .map(|(extension, tag)| (extension.into().to_lowercase(), tag.into()))
            .collect();
        Self { tags }
    }

    /// Fence tag for the file's extension; empty for unknown extensions.
    pub fn tag_for(&self, path: &Path) -> &str {
        self.lookup(path).unwrap_or("")
    }

    /// Whether the file's extension has an entry in the table.
    pub fn is_known(&self, path: &Path) -> bool {
        self.lookup(path).is_some()
    }

    fn lookup(&self, path: &Path) -> Option<&str> {
        let extension = path.extension()?;
        let key = format!(".{}", extension.to_string_lossy().to_lowercase());
        self.tags.get(&key).map(String::as_str)
    }
}

impl Default for LanguageMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders one exported file as a self-contained Markdown block.
pub struct BlockWriter {
    include_markers: bool,
    show_encoding: bool,
}

impl BlockWriter {
    pub fn new(include_markers: bool, show_encoding: bool) -> Self {
        Self {
            include_markers,
            show_encoding,
        }
    }

    /// Append one file's block: heading, optional encoding comment,
    /// optional start/end markers, and the fenced content.
    ///
    /// The fence always closes on its own line; a trailing newline is
    /// inserted when the content lacks one. For fixed inputs the block is
    /// byte-identical across runs.
    pub fn write_block<W: Write>(
        &self,
        writer: &mut W,
        display_path: &str,
        file_name: &str,
        language: &str,
        content: &str,
        encoding: Option<&str>,
    ) -> Result<()> {
        writeln!(writer, "### {}", display_path)?;
        if self.show_encoding {
            if let Some(encoding) = encoding {
                writeln!(writer, "<!-- 文件编码: {} -->", encoding)?;
            }
        }
        if self.include_markers {
            writeln!(writer, "<!-- [START OF FILE: {}] -->", file_name)?;
        }
        writeln!(writer, "```{}", language)?;
        writer.write_all(content.as_bytes())?;
        if !content.ends_with('\n') {
            writer.write_all(b"\n")?;
        }
        writer.write_all(b"```\n\n")?;
        if self.include_markers {
            writeln!(writer, "<!-- [END OF FILE: {}] -->", file_name)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}
